// Promotion configuration store
//
// Loads coupons, discounts and coin rules from PostgreSQL behind a
// time-based cache (60-second TTL). Storefront listings read through
// the cache; code lookups for validation always hit the database so a
// just-deactivated code cannot be redeemed from stale data. Admin
// mutations write through and invalidate.

use crate::promotions::{
    coins::{EarningRule, RedemptionRule},
    coupon::Coupon,
    discount::Discount,
    error::{PromotionError, PromotionResult},
    types::{CouponKind, DiscountKind, PromotionStatus, UserUsageLimit},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Time-to-live for cached configuration (60 seconds)
const CACHE_TTL: Duration = Duration::from_secs(60);

const COUPON_COLUMNS: &str = "id, code, kind, discount, min_purchase, max_discount, valid_from, \
     valid_until, usage_limit, user_usage_limit, used, status, description, created_at, updated_at";

const DISCOUNT_COLUMNS: &str = "id, code, name, kind, value, min_order, max_discount, usage_limit, \
     used, start_date, end_date, status, instruction, created_at, updated_at";

/// Both singleton coin rules
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CoinRules {
    pub earning: EarningRule,
    pub redemption: RedemptionRule,
}

impl Default for CoinRules {
    fn default() -> Self {
        Self {
            earning: EarningRule::default(),
            redemption: RedemptionRule::default(),
        }
    }
}

#[derive(Debug, FromRow)]
struct CoinRuleRow {
    rule_key: String,
    threshold: Option<Decimal>,
    coins: Option<i64>,
    coins_per_unit: Option<i64>,
    discount_percent: Option<Decimal>,
}

/// Fields for creating or replacing a coupon
#[derive(Debug, Clone)]
pub struct CouponDraft {
    pub code: String,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    pub user_usage_limit: UserUsageLimit,
    pub status: PromotionStatus,
    pub description: String,
}

/// Fields for creating or replacing a discount
#[derive(Debug, Clone)]
pub struct DiscountDraft {
    pub code: String,
    pub name: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_order: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: PromotionStatus,
    pub instruction: Option<String>,
}

/// In-memory cache of promotion configuration
#[derive(Debug)]
struct ConfigCache {
    coupons: Vec<Coupon>,
    discounts: Vec<Discount>,
    coin_rules: Option<CoinRules>,
    last_updated: HashMap<&'static str, Instant>,
}

impl ConfigCache {
    fn new() -> Self {
        Self {
            coupons: Vec::new(),
            discounts: Vec::new(),
            coin_rules: None,
            last_updated: HashMap::new(),
        }
    }

    fn is_stale(&self, key: &'static str, ttl: Duration) -> bool {
        match self.last_updated.get(key) {
            Some(last_update) => last_update.elapsed() > ttl,
            None => true,
        }
    }

    fn mark_updated(&mut self, key: &'static str) {
        self.last_updated.insert(key, Instant::now());
    }

    fn invalidate(&mut self) {
        self.last_updated.clear();
    }
}

/// Promotion configuration store with a TTL cache over PostgreSQL
pub struct PromotionStore {
    pool: PgPool,
    cache: Arc<RwLock<ConfigCache>>,
    cache_ttl: Duration,
    metrics: Option<Arc<crate::promotions::metrics::PromotionMetrics>>,
}

impl PromotionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(ConfigCache::new())),
            cache_ttl: CACHE_TTL,
            metrics: None,
        }
    }

    pub fn with_metrics(
        pool: PgPool,
        metrics: Arc<crate::promotions::metrics::PromotionMetrics>,
    ) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(ConfigCache::new())),
            cache_ttl: CACHE_TTL,
            metrics: Some(metrics),
        }
    }

    fn record_cache_hit(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_hit();
        }
    }

    fn record_cache_miss(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_miss();
        }
    }

    // ------------------------------------------------------------------
    // Cached reads
    // ------------------------------------------------------------------

    /// All coupons, through the cache
    pub async fn get_coupons(&self) -> PromotionResult<Vec<Coupon>> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale("coupons", self.cache_ttl) {
                self.record_cache_hit();
                return Ok(cache.coupons.clone());
            }
        }
        self.record_cache_miss();

        let coupons = self.load_coupons().await?;
        let mut cache = self.cache.write().await;
        cache.coupons = coupons.clone();
        cache.mark_updated("coupons");
        Ok(coupons)
    }

    /// All discounts, through the cache
    pub async fn get_discounts(&self) -> PromotionResult<Vec<Discount>> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale("discounts", self.cache_ttl) {
                self.record_cache_hit();
                return Ok(cache.discounts.clone());
            }
        }
        self.record_cache_miss();

        let discounts = self.load_discounts().await?;
        let mut cache = self.cache.write().await;
        cache.discounts = discounts.clone();
        cache.mark_updated("discounts");
        Ok(discounts)
    }

    /// Coin rules, through the cache; defaults when unconfigured
    pub async fn get_coin_rules(&self) -> PromotionResult<CoinRules> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale("coin_rules", self.cache_ttl) {
                if let Some(ref rules) = cache.coin_rules {
                    self.record_cache_hit();
                    return Ok(rules.clone());
                }
            }
        }
        self.record_cache_miss();

        let rules = self.load_coin_rules().await?;
        let mut cache = self.cache.write().await;
        cache.coin_rules = Some(rules.clone());
        cache.mark_updated("coin_rules");
        Ok(rules)
    }

    // ------------------------------------------------------------------
    // Direct reads (validation paths bypass the cache)
    // ------------------------------------------------------------------

    /// Active coupon by case-insensitive code
    pub async fn find_active_coupon(&self, code: &str) -> PromotionResult<Option<Coupon>> {
        let query = format!(
            "SELECT {} FROM coupons WHERE UPPER(code) = UPPER($1) AND status = 'active'",
            COUPON_COLUMNS
        );
        let coupon = sqlx::query_as::<_, Coupon>(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }

    /// Active discount by case-insensitive code
    pub async fn find_active_discount(&self, code: &str) -> PromotionResult<Option<Discount>> {
        let query = format!(
            "SELECT {} FROM discounts WHERE UPPER(code) = UPPER($1) AND status = 'active'",
            DISCOUNT_COLUMNS
        );
        let discount = sqlx::query_as::<_, Discount>(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(discount)
    }

    /// Redemption count for one coupon by one user
    pub async fn coupon_usage_count(
        &self,
        coupon_id: i32,
        user_id: i32,
    ) -> PromotionResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM coupon_usage WHERE coupon_id = $1 AND user_id = $2",
        )
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Per-coupon redemption counts for a user, for the eligibility filter
    pub async fn usage_counts_for_user(
        &self,
        user_id: i32,
    ) -> PromotionResult<HashMap<i32, i64>> {
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            "SELECT coupon_id, COUNT(*) FROM coupon_usage WHERE user_id = $1 GROUP BY coupon_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    // ------------------------------------------------------------------
    // Loads
    // ------------------------------------------------------------------

    async fn load_coupons(&self) -> PromotionResult<Vec<Coupon>> {
        let query = format!("SELECT {} FROM coupons ORDER BY id", COUPON_COLUMNS);
        let coupons = sqlx::query_as::<_, Coupon>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(coupons)
    }

    async fn load_discounts(&self) -> PromotionResult<Vec<Discount>> {
        let query = format!("SELECT {} FROM discounts ORDER BY id", DISCOUNT_COLUMNS);
        let discounts = sqlx::query_as::<_, Discount>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(discounts)
    }

    async fn load_coin_rules(&self) -> PromotionResult<CoinRules> {
        let rows = sqlx::query_as::<_, CoinRuleRow>(
            "SELECT rule_key, threshold, coins, coins_per_unit, discount_percent FROM coin_rules",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut rules = CoinRules::default();
        for row in rows {
            match row.rule_key.as_str() {
                "earning" => {
                    if let Some(threshold) = row.threshold {
                        rules.earning.threshold = threshold;
                    }
                    if let Some(coins) = row.coins {
                        rules.earning.coins = coins;
                    }
                }
                "redemption" => {
                    if let Some(coins_per_unit) = row.coins_per_unit {
                        rules.redemption.coins_per_unit = coins_per_unit;
                    }
                    if let Some(discount_percent) = row.discount_percent {
                        rules.redemption.discount_percent = discount_percent;
                    }
                }
                other => {
                    tracing::warn!("Ignoring unknown coin rule key: {}", other);
                }
            }
        }
        Ok(rules)
    }

    // ------------------------------------------------------------------
    // Admin mutations (write through, invalidate cache)
    // ------------------------------------------------------------------

    pub async fn create_coupon(&self, draft: &CouponDraft) -> PromotionResult<Coupon> {
        let query = format!(
            "INSERT INTO coupons (code, kind, discount, min_purchase, max_discount, valid_from, \
             valid_until, usage_limit, user_usage_limit, status, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            COUPON_COLUMNS
        );
        let coupon = sqlx::query_as::<_, Coupon>(&query)
            .bind(&draft.code)
            .bind(draft.kind)
            .bind(draft.discount)
            .bind(draft.min_purchase)
            .bind(draft.max_discount)
            .bind(draft.valid_from)
            .bind(draft.valid_until)
            .bind(draft.usage_limit)
            .bind(draft.user_usage_limit)
            .bind(draft.status)
            .bind(&draft.description)
            .fetch_one(&self.pool)
            .await?;

        self.cache.write().await.invalidate();
        Ok(coupon)
    }

    pub async fn update_coupon(&self, id: i32, draft: &CouponDraft) -> PromotionResult<Coupon> {
        let query = format!(
            "UPDATE coupons SET code = $1, kind = $2, discount = $3, min_purchase = $4, \
             max_discount = $5, valid_from = $6, valid_until = $7, usage_limit = $8, \
             user_usage_limit = $9, status = $10, description = $11, updated_at = NOW() \
             WHERE id = $12 RETURNING {}",
            COUPON_COLUMNS
        );
        let coupon = sqlx::query_as::<_, Coupon>(&query)
            .bind(&draft.code)
            .bind(draft.kind)
            .bind(draft.discount)
            .bind(draft.min_purchase)
            .bind(draft.max_discount)
            .bind(draft.valid_from)
            .bind(draft.valid_until)
            .bind(draft.usage_limit)
            .bind(draft.user_usage_limit)
            .bind(draft.status)
            .bind(&draft.description)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PromotionError::NotFound(format!("Coupon {}", id)))?;

        self.cache.write().await.invalidate();
        Ok(coupon)
    }

    pub async fn delete_coupon(&self, id: i32) -> PromotionResult<()> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PromotionError::NotFound(format!("Coupon {}", id)));
        }
        self.cache.write().await.invalidate();
        Ok(())
    }

    pub async fn create_discount(&self, draft: &DiscountDraft) -> PromotionResult<Discount> {
        let query = format!(
            "INSERT INTO discounts (code, name, kind, value, min_order, max_discount, \
             usage_limit, start_date, end_date, status, instruction) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            DISCOUNT_COLUMNS
        );
        let discount = sqlx::query_as::<_, Discount>(&query)
            .bind(&draft.code)
            .bind(&draft.name)
            .bind(draft.kind)
            .bind(draft.value)
            .bind(draft.min_order)
            .bind(draft.max_discount)
            .bind(draft.usage_limit)
            .bind(draft.start_date)
            .bind(draft.end_date)
            .bind(draft.status)
            .bind(&draft.instruction)
            .fetch_one(&self.pool)
            .await?;

        self.cache.write().await.invalidate();
        Ok(discount)
    }

    pub async fn update_discount(&self, id: i32, draft: &DiscountDraft) -> PromotionResult<Discount> {
        let query = format!(
            "UPDATE discounts SET code = $1, name = $2, kind = $3, value = $4, min_order = $5, \
             max_discount = $6, usage_limit = $7, start_date = $8, end_date = $9, status = $10, \
             instruction = $11, updated_at = NOW() WHERE id = $12 RETURNING {}",
            DISCOUNT_COLUMNS
        );
        let discount = sqlx::query_as::<_, Discount>(&query)
            .bind(&draft.code)
            .bind(&draft.name)
            .bind(draft.kind)
            .bind(draft.value)
            .bind(draft.min_order)
            .bind(draft.max_discount)
            .bind(draft.usage_limit)
            .bind(draft.start_date)
            .bind(draft.end_date)
            .bind(draft.status)
            .bind(&draft.instruction)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PromotionError::NotFound(format!("Discount {}", id)))?;

        self.cache.write().await.invalidate();
        Ok(discount)
    }

    pub async fn delete_discount(&self, id: i32) -> PromotionResult<()> {
        let result = sqlx::query("DELETE FROM discounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(PromotionError::NotFound(format!("Discount {}", id)));
        }
        self.cache.write().await.invalidate();
        Ok(())
    }

    /// Upsert both singleton coin rules
    pub async fn update_coin_rules(&self, rules: &CoinRules) -> PromotionResult<CoinRules> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO coin_rules (rule_key, threshold, coins) VALUES ('earning', $1, $2) \
             ON CONFLICT (rule_key) DO UPDATE SET threshold = $1, coins = $2, updated_at = NOW()",
        )
        .bind(rules.earning.threshold)
        .bind(rules.earning.coins)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO coin_rules (rule_key, coins_per_unit, discount_percent) \
             VALUES ('redemption', $1, $2) \
             ON CONFLICT (rule_key) DO UPDATE SET coins_per_unit = $1, discount_percent = $2, \
             updated_at = NOW()",
        )
        .bind(rules.redemption.coins_per_unit)
        .bind(rules.redemption.discount_percent)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.cache.write().await.invalidate();
        Ok(rules.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cache_staleness() {
        let mut cache = ConfigCache::new();
        assert!(cache.is_stale("coupons", Duration::from_secs(60)));

        cache.mark_updated("coupons");
        assert!(!cache.is_stale("coupons", Duration::from_secs(60)));
        assert!(cache.is_stale("discounts", Duration::from_secs(60)));

        cache.invalidate();
        assert!(cache.is_stale("coupons", Duration::from_secs(60)));
    }

    #[test]
    fn test_coin_rules_defaults() {
        let rules = CoinRules::default();
        assert_eq!(rules.earning.threshold, dec!(5000));
        assert_eq!(rules.earning.coins, 10);
        assert_eq!(rules.redemption.coins_per_unit, 50);
        assert_eq!(rules.redemption.discount_percent, dec!(5));
    }
}
