use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::promotions::PromotionError;

/// Error types for return operations
#[derive(Debug, thiserror::Error)]
pub enum ReturnError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Return request not found")]
    NotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Order is not returnable: {0}")]
    NotReturnable(String),

    #[error("A return has already been requested for this order")]
    AlreadyRequested,

    #[error("Return request has already been resolved")]
    AlreadyResolved,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Promotion(#[from] PromotionError),
}

impl From<sqlx::Error> for ReturnError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ReturnError::AlreadyRequested;
            }
        }
        ReturnError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for ReturnError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ReturnError::DatabaseError(msg) => {
                tracing::error!("Database error in returns: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ReturnError::NotFound => {
                (StatusCode::NOT_FOUND, "Return request not found".to_string())
            }
            ReturnError::OrderNotFound => (StatusCode::NOT_FOUND, "Order not found".to_string()),
            ReturnError::NotReturnable(msg) => (StatusCode::BAD_REQUEST, msg),
            ReturnError::AlreadyRequested => (
                StatusCode::CONFLICT,
                "A return has already been requested for this order".to_string(),
            ),
            ReturnError::AlreadyResolved => (
                StatusCode::CONFLICT,
                "Return request has already been resolved".to_string(),
            ),
            ReturnError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ReturnError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ReturnError::Promotion(inner) => return inner.into_response(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
