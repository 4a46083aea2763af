// Error types for the promotions subsystem
// Covers coupon/discount evaluation, instruction parsing and coin operations

use thiserror::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Main error type for promotion evaluation and coin operations
///
/// Evaluator failures are terminal for the calling request: no retry,
/// no partial success. The HTTP layer maps each variant to a status.
#[derive(Debug, Error)]
pub enum PromotionError {
    /// Code or entity does not exist, or is inactive
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validity window has not opened yet (eligibility-filter path only;
    /// the validators collapse this case into Expired)
    #[error("Promotion has not started yet")]
    NotStarted,

    /// Outside the validity window
    #[error("Promotion has expired or is not yet valid")]
    Expired,

    /// Global or per-user usage cap hit
    #[error("Usage limit of {limit} reached")]
    LimitReached { limit: i64 },

    /// Order total under the required minimum purchase
    #[error("Order total {order_total} is below the minimum of {minimum}")]
    BelowMinimum {
        minimum: rust_decimal::Decimal,
        order_total: rust_decimal::Decimal,
    },

    /// Redemption requested beyond the available balance
    #[error("Insufficient coins: requested {requested}, available {available}")]
    InsufficientCoins { requested: i64, available: i64 },

    /// Non-positive amounts or missing required fields
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Errors parsing JSONB payloads (rule metadata, specifications)
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for promotion operations
pub type PromotionResult<T> = Result<T, PromotionError>;

impl From<validator::ValidationErrors> for PromotionError {
    fn from(err: validator::ValidationErrors) -> Self {
        PromotionError::InvalidInput(err.to_string())
    }
}

impl IntoResponse for PromotionError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            PromotionError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            PromotionError::NotStarted => (StatusCode::BAD_REQUEST, "Promotion not started"),
            PromotionError::Expired => (StatusCode::BAD_REQUEST, "Promotion expired"),
            PromotionError::LimitReached { .. } => (StatusCode::BAD_REQUEST, "Usage limit reached"),
            PromotionError::BelowMinimum { .. } => {
                (StatusCode::BAD_REQUEST, "Below minimum purchase")
            }
            PromotionError::InsufficientCoins { .. } => {
                (StatusCode::BAD_REQUEST, "Insufficient coins")
            }
            PromotionError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input"),
            PromotionError::DatabaseError(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            PromotionError::JsonError(_) => (StatusCode::BAD_REQUEST, "JSON parsing error"),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_error_display() {
        let error = PromotionError::NotFound("coupon SAVE10".to_string());
        assert_eq!(error.to_string(), "Not found: coupon SAVE10");

        let error = PromotionError::LimitReached { limit: 3 };
        assert_eq!(error.to_string(), "Usage limit of 3 reached");

        let error = PromotionError::InsufficientCoins {
            requested: 100,
            available: 20,
        };
        assert_eq!(
            error.to_string(),
            "Insufficient coins: requested 100, available 20"
        );
    }

    #[test]
    fn test_below_minimum_display() {
        let error = PromotionError::BelowMinimum {
            minimum: Decimal::from(500),
            order_total: Decimal::from(200),
        };
        assert_eq!(
            error.to_string(),
            "Order total 200 is below the minimum of 500"
        );
    }

    #[test]
    fn test_error_from_sqlx() {
        let sqlx_error = sqlx::Error::RowNotFound;
        let err: PromotionError = sqlx_error.into();
        assert!(matches!(err, PromotionError::DatabaseError(_)));
    }
}
