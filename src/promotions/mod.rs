// Promotions Subsystem
//
// Rule evaluation for the storefront's money-off machinery:
// - Coupon codes: eligibility filtering and validation with usage caps
// - Store-wide discounts: percentage/fixed/instruction-based promotions
// - Instruction parser: restricted natural-language promotional rules
// - Coin program: earning on qualifying orders, redemption for discounts
//
// The evaluators themselves are pure; this module wires them to the
// configuration store, the redemption ledger, the audit trail and the
// performance metrics.

pub mod audit;
pub mod coins;
pub mod config_store;
pub mod coupon;
pub mod discount;
pub mod error;
pub mod handlers;
pub mod instruction;
pub mod ledger;
pub mod metrics;
pub mod types;

// Re-export commonly used types for convenience
pub use audit::AuditLogger;
pub use coins::{CoinTransaction, EarningRule, RedemptionQuote, RedemptionRule};
pub use config_store::{CoinRules, CouponDraft, DiscountDraft, PromotionStore};
pub use coupon::{Coupon, CouponQuote, CouponSummary, EligibilityContext, UsageSnapshot};
pub use discount::{Discount, DiscountQuote, DiscountSummary};
pub use error::{PromotionError, PromotionResult};
pub use instruction::CartItem;
pub use ledger::PromotionLedger;
pub use metrics::PromotionMetrics;
pub use types::{
    CoinTransactionKind, CouponKind, DiscountKind, PromotionStatus, UserUsageLimit,
};

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Promotions Engine
///
/// Coordinates the evaluators against live configuration and owns the
/// redemption-time side effects (counters, ledgers, audit records).
pub struct PromotionsEngine {
    store: Arc<PromotionStore>,
    ledger: PromotionLedger,
    audit: AuditLogger,
    metrics: Arc<PromotionMetrics>,
}

impl PromotionsEngine {
    pub fn new(pool: PgPool) -> Self {
        let metrics = Arc::new(PromotionMetrics::new());
        let store = Arc::new(PromotionStore::with_metrics(pool.clone(), metrics.clone()));
        Self {
            store,
            ledger: PromotionLedger::new(pool.clone()),
            audit: AuditLogger::new(pool),
            metrics,
        }
    }

    pub fn metrics(&self) -> &PromotionMetrics {
        &self.metrics
    }

    /// Configuration store, for the admin surface
    pub fn store(&self) -> &PromotionStore {
        &self.store
    }

    /// Pre-load all promotion configuration on startup
    pub async fn warm_cache(&self) -> PromotionResult<()> {
        tracing::info!("Warming promotions cache...");
        let _ = self.store.get_coupons().await?;
        let _ = self.store.get_discounts().await?;
        let _ = self.store.get_coin_rules().await?;
        tracing::info!("Promotions cache warmed successfully");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Coupons
    // ------------------------------------------------------------------

    /// Coupons the caller may currently use
    pub async fn available_coupons(
        &self,
        user_id: Option<i32>,
        order_total: Option<Decimal>,
    ) -> PromotionResult<Vec<CouponSummary>> {
        let _timer = self.metrics.start_coupon_evaluation();

        let coupons = self.store.get_coupons().await?;

        let mut usage = UsageSnapshot::new();
        if let Some(user_id) = user_id {
            for (coupon_id, count) in self.store.usage_counts_for_user(user_id).await? {
                usage.record(coupon_id, count);
            }
        }

        let ctx = EligibilityContext {
            user_id,
            order_total,
        };
        Ok(coupon::filter_available(
            &coupons,
            &ctx,
            &usage,
            Utc::now().date_naive(),
        ))
    }

    /// Validate a coupon code against the order context
    pub async fn validate_coupon(
        &self,
        code: &str,
        user_id: Option<i32>,
        order_total: Option<Decimal>,
    ) -> PromotionResult<CouponQuote> {
        let _timer = self.metrics.start_coupon_evaluation();

        let coupon = self
            .store
            .find_active_coupon(code)
            .await?
            .ok_or_else(|| PromotionError::NotFound(format!("Coupon '{}' not found", code)))?;

        let per_user_count = match user_id {
            Some(user_id) => self.store.coupon_usage_count(coupon.id, user_id).await?,
            None => 0,
        };

        let ctx = coupon::ValidationContext {
            user_id,
            order_total,
            per_user_count,
        };
        coupon::validate(&coupon, &ctx, Utc::now())
    }

    /// Redeem a validated coupon against an order (atomic counter bump +
    /// usage row), then audit the application.
    pub async fn redeem_coupon(
        &self,
        quote: &CouponQuote,
        user_id: Option<i32>,
        order_id: Uuid,
    ) -> PromotionResult<()> {
        self.ledger
            .redeem_coupon(quote.coupon.id, user_id, Some(order_id))
            .await?;

        self.audit
            .log_coupon_application(
                Some(order_id),
                &quote.coupon.code,
                json!({
                    "coupon_id": quote.coupon.id,
                    "kind": quote.coupon.kind,
                    "calculated_discount": quote.calculated_discount,
                }),
                &format!("Applied coupon {}", quote.coupon.code),
            )
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Discounts
    // ------------------------------------------------------------------

    /// Store-wide discounts currently open to everyone
    pub async fn available_discounts(
        &self,
        order_total: Option<Decimal>,
    ) -> PromotionResult<Vec<DiscountSummary>> {
        let _timer = self.metrics.start_discount_evaluation();

        let discounts = self.store.get_discounts().await?;
        Ok(discount::filter_available(
            &discounts,
            order_total,
            Utc::now().date_naive(),
        ))
    }

    /// Validate a discount code against the order context
    pub async fn validate_discount(
        &self,
        code: &str,
        order_total: Decimal,
        cart_items: &[CartItem],
    ) -> PromotionResult<DiscountQuote> {
        let _timer = self.metrics.start_discount_evaluation();

        let discount = self
            .store
            .find_active_discount(code)
            .await?
            .ok_or_else(|| PromotionError::NotFound(format!("Discount '{}' not found", code)))?;

        if discount.kind == DiscountKind::Custom {
            self.metrics.record_instruction_parse();
        }

        discount::validate(&discount, order_total, cart_items, Utc::now())
    }

    /// Redeem a validated discount against an order, then audit it.
    pub async fn redeem_discount(
        &self,
        quote: &DiscountQuote,
        order_id: Uuid,
    ) -> PromotionResult<()> {
        self.ledger.redeem_discount(quote.discount.id).await?;

        self.audit
            .log_discount_application(
                Some(order_id),
                &quote.discount.code,
                json!({
                    "discount_id": quote.discount.id,
                    "kind": quote.discount.kind,
                    "calculated_discount": quote.calculated_discount,
                }),
                &format!("Applied discount {}", quote.discount.code),
            )
            .await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Coins
    // ------------------------------------------------------------------

    pub async fn coin_rules(&self) -> PromotionResult<CoinRules> {
        self.store.get_coin_rules().await
    }

    pub async fn coin_balance(&self, user_id: i32) -> PromotionResult<i64> {
        self.ledger.balance(user_id).await
    }

    pub async fn coin_transactions(
        &self,
        user_id: i32,
        limit: i64,
    ) -> PromotionResult<Vec<CoinTransaction>> {
        self.ledger.transactions(user_id, limit).await
    }

    /// Quote the discount a redemption would yield, without side effects
    pub async fn coin_quote(
        &self,
        user_id: i32,
        coins_to_redeem: i64,
        subtotal: Decimal,
    ) -> PromotionResult<RedemptionQuote> {
        let _timer = self.metrics.start_coin_calculation();

        let rules = self.store.get_coin_rules().await?;
        let balance = self.ledger.balance(user_id).await?;
        coins::redemption_quote(coins_to_redeem, subtotal, balance, &rules.redemption)
    }

    /// Debit a quoted redemption and audit it. Returns the new balance.
    pub async fn redeem_coins(
        &self,
        user_id: i32,
        quote: &RedemptionQuote,
        order_id: Uuid,
    ) -> PromotionResult<i64> {
        let new_balance = self
            .ledger
            .spend_coins(
                user_id,
                quote.coins_spent,
                Some(order_id),
                "Coins redeemed at checkout",
            )
            .await?;

        self.audit
            .log_coin_event(
                Some(order_id),
                json!({
                    "user_id": user_id,
                    "coins_spent": quote.coins_spent,
                    "discount_amount": quote.discount_amount,
                    "discount_percent": quote.discount_percent,
                    "new_balance": new_balance,
                }),
                &format!("Redeemed {} coins", quote.coins_spent),
            )
            .await;

        Ok(new_balance)
    }

    /// Credit coins for a paid order when it qualifies. Returns the
    /// number of coins awarded (zero below the earning threshold).
    pub async fn award_order_coins(
        &self,
        user_id: i32,
        paid_total: Decimal,
        order_id: Uuid,
    ) -> PromotionResult<i64> {
        let _timer = self.metrics.start_coin_calculation();

        let rules = self.store.get_coin_rules().await?;
        let earned = coins::coins_earned(paid_total, &rules.earning);
        if earned == 0 {
            return Ok(0);
        }

        let new_balance = self
            .ledger
            .credit_coins(
                user_id,
                earned,
                CoinTransactionKind::Earned,
                Some(order_id),
                "Coins earned on qualifying order",
            )
            .await?;

        self.audit
            .log_coin_event(
                Some(order_id),
                json!({
                    "user_id": user_id,
                    "paid_total": paid_total,
                    "coins_earned": earned,
                    "new_balance": new_balance,
                }),
                &format!("Earned {} coins", earned),
            )
            .await;

        Ok(earned)
    }

    /// Unwind an order's coin activity for an approved return: coins
    /// spent come back as `refunded`, coins earned are clawed back as
    /// `expired` (clamped at zero balance). Returns (refunded, clawed).
    pub async fn refund_order_coins(
        &self,
        user_id: i32,
        order_id: Uuid,
    ) -> PromotionResult<(i64, i64)> {
        let spent = self
            .ledger
            .coins_on_order(user_id, order_id, CoinTransactionKind::Spent)
            .await?;
        let earned = self
            .ledger
            .coins_on_order(user_id, order_id, CoinTransactionKind::Earned)
            .await?;

        let mut refunded = 0;
        if spent > 0 {
            self.ledger
                .credit_coins(
                    user_id,
                    spent,
                    CoinTransactionKind::Refunded,
                    Some(order_id),
                    "Coins refunded for returned order",
                )
                .await?;
            refunded = spent;
        }

        let clawed = self
            .ledger
            .expire_coins(
                user_id,
                earned,
                Some(order_id),
                "Coins reclaimed for returned order",
            )
            .await?;

        if refunded > 0 || clawed > 0 {
            self.audit
                .log_coin_event(
                    Some(order_id),
                    json!({
                        "user_id": user_id,
                        "coins_refunded": refunded,
                        "coins_reclaimed": clawed,
                    }),
                    &format!("Return unwound: +{} / -{} coins", refunded, clawed),
                )
                .await;
        }

        Ok((refunded, clawed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_component_types() {
        // All component types are accessible; instantiation needs a pool
        let _store: Option<PromotionStore> = None;
        let _ledger: Option<PromotionLedger> = None;
        let _audit: Option<AuditLogger> = None;
        let _metrics: Option<PromotionMetrics> = None;
    }

    #[test]
    fn test_evaluator_result_types() {
        let _coupon_quote: Option<CouponQuote> = None;
        let _discount_quote: Option<DiscountQuote> = None;
        let _redemption_quote: Option<RedemptionQuote> = None;
    }
}
