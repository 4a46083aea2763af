use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::returns::error::ReturnError;
use crate::returns::models::{ReturnRequest, ReturnStatus};

const RETURN_COLUMNS: &str =
    "id, order_id, user_id, reason, status, refund_amount, coins_refunded, created_at, resolved_at";

/// Repository for return request operations
#[derive(Clone)]
pub struct ReturnsRepository {
    pool: PgPool,
}

impl ReturnsRepository {
    /// Create a new ReturnsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a return request; the unique index on order_id surfaces a
    /// duplicate as AlreadyRequested via the error conversion
    pub async fn create(
        &self,
        order_id: Uuid,
        user_id: i32,
        reason: &str,
    ) -> Result<ReturnRequest, ReturnError> {
        let query = format!(
            "INSERT INTO return_requests (order_id, user_id, reason) \
             VALUES ($1, $2, $3) RETURNING {}",
            RETURN_COLUMNS
        );
        let request = sqlx::query_as::<_, ReturnRequest>(&query)
            .bind(order_id)
            .bind(user_id)
            .bind(reason)
            .fetch_one(&self.pool)
            .await?;

        Ok(request)
    }

    /// Find a return request by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<ReturnRequest>, ReturnError> {
        let query = format!("SELECT {} FROM return_requests WHERE id = $1", RETURN_COLUMNS);
        let request = sqlx::query_as::<_, ReturnRequest>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    /// All return requests for a user, newest first
    pub async fn find_by_user_id(&self, user_id: i32) -> Result<Vec<ReturnRequest>, ReturnError> {
        let query = format!(
            "SELECT {} FROM return_requests WHERE user_id = $1 ORDER BY created_at DESC",
            RETURN_COLUMNS
        );
        let requests = sqlx::query_as::<_, ReturnRequest>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(requests)
    }

    /// All return requests, optionally filtered by status (admin view)
    pub async fn find_all(
        &self,
        status: Option<ReturnStatus>,
    ) -> Result<Vec<ReturnRequest>, ReturnError> {
        let requests = match status {
            Some(status_filter) => {
                let query = format!(
                    "SELECT {} FROM return_requests WHERE status = $1 ORDER BY created_at DESC",
                    RETURN_COLUMNS
                );
                sqlx::query_as::<_, ReturnRequest>(&query)
                    .bind(status_filter)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {} FROM return_requests ORDER BY created_at DESC",
                    RETURN_COLUMNS
                );
                sqlx::query_as::<_, ReturnRequest>(&query)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(requests)
    }

    /// Mark a return resolved with its refund figures
    pub async fn resolve(
        &self,
        id: i32,
        status: ReturnStatus,
        refund_amount: Option<Decimal>,
        coins_refunded: i64,
    ) -> Result<ReturnRequest, ReturnError> {
        let query = format!(
            "UPDATE return_requests \
             SET status = $1, refund_amount = $2, coins_refunded = $3, resolved_at = NOW() \
             WHERE id = $4 RETURNING {}",
            RETURN_COLUMNS
        );
        let request = sqlx::query_as::<_, ReturnRequest>(&query)
            .bind(status)
            .bind(refund_amount)
            .bind(coins_refunded)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ReturnError::NotFound)?;

        Ok(request)
    }
}
