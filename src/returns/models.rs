use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle of a return request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Requested,
    Approved,
    Rejected,
}

impl std::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnStatus::Requested => write!(f, "requested"),
            ReturnStatus::Approved => write!(f, "approved"),
            ReturnStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Domain model representing a return request in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReturnRequest {
    pub id: i32,
    pub order_id: Uuid,
    pub user_id: i32,
    pub reason: String,
    pub status: ReturnStatus,
    pub refund_amount: Option<Decimal>,
    pub coins_refunded: i64,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Request DTO for opening a return
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReturnRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1, max = 1000, message = "Reason must be 1-1000 characters"))]
    pub reason: String,
}

/// Request DTO for resolving a return (admin)
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveReturnRequest {
    pub status: ReturnStatus,
}

/// Response DTO for API responses
#[derive(Debug, Serialize)]
pub struct ReturnResponse {
    pub id: i32,
    pub order_id: Uuid,
    pub user_id: i32,
    pub reason: String,
    pub status: ReturnStatus,
    pub refund_amount: Option<Decimal>,
    pub coins_refunded: i64,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<ReturnRequest> for ReturnResponse {
    fn from(request: ReturnRequest) -> Self {
        Self {
            id: request.id,
            order_id: request.order_id,
            user_id: request.user_id,
            reason: request.reason,
            status: request.status,
            refund_amount: request.refund_amount,
            coins_refunded: request.coins_refunded,
            created_at: request.created_at,
            resolved_at: request.resolved_at,
        }
    }
}
