// Promotion audit trail
//
// Records coupon/discount applications and coin events for compliance
// and debugging. Failures are logged and swallowed so the audit trail
// can never block a checkout.

use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

pub struct AuditLogger {
    pool: PgPool,
}

impl AuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Log a coupon application against an order
    pub async fn log_coupon_application(
        &self,
        order_id: Option<Uuid>,
        coupon_code: &str,
        rule_data: JsonValue,
        effect: &str,
    ) {
        if let Err(e) = self
            .insert_record(order_id, "coupon", Some(coupon_code), rule_data, effect)
            .await
        {
            tracing::warn!("Failed to log coupon application: {}", e);
        }
    }

    /// Log a store-wide discount application against an order
    pub async fn log_discount_application(
        &self,
        order_id: Option<Uuid>,
        discount_code: &str,
        rule_data: JsonValue,
        effect: &str,
    ) {
        if let Err(e) = self
            .insert_record(order_id, "discount", Some(discount_code), rule_data, effect)
            .await
        {
            tracing::warn!("Failed to log discount application: {}", e);
        }
    }

    /// Log a coin earning/redemption/refund event
    pub async fn log_coin_event(
        &self,
        order_id: Option<Uuid>,
        rule_data: JsonValue,
        effect: &str,
    ) {
        if let Err(e) = self
            .insert_record(order_id, "coins", None, rule_data, effect)
            .await
        {
            tracing::warn!("Failed to log coin event: {}", e);
        }
    }

    async fn insert_record(
        &self,
        order_id: Option<Uuid>,
        rule_type: &str,
        reference: Option<&str>,
        rule_data: JsonValue,
        effect: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO promotion_audit (order_id, rule_type, reference, rule_data, effect) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(order_id)
        .bind(rule_type)
        .bind(reference)
        .bind(rule_data)
        .bind(effect)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
