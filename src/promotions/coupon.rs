// Coupon eligibility filter and validator
//
// Pure rule evaluators over coupon rows and a per-user usage snapshot.
// The caller supplies the clock: the eligibility filter compares calendar
// dates only, while the validator compares full timestamps. The two
// granularities are intentionally different and covered by tests.

use crate::promotions::{
    error::{PromotionError, PromotionResult},
    types::{CouponKind, PromotionStatus, UserUsageLimit},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};

/// Coupon row as stored
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    pub user_usage_limit: UserUsageLimit,
    pub used: i64,
    pub status: PromotionStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storefront projection of a coupon; internal counters excluded
#[derive(Debug, Clone, Serialize)]
pub struct CouponSummary {
    pub id: i32,
    pub code: String,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub max_discount: Option<Decimal>,
    pub description: String,
    pub min_purchase: Option<Decimal>,
    pub valid_until: DateTime<Utc>,
}

impl From<&Coupon> for CouponSummary {
    fn from(coupon: &Coupon) -> Self {
        Self {
            id: coupon.id,
            code: coupon.code.clone(),
            kind: coupon.kind,
            discount: coupon.discount,
            max_discount: coupon.max_discount,
            description: coupon.description.clone(),
            min_purchase: coupon.min_purchase,
            valid_until: coupon.valid_until,
        }
    }
}

/// Caller-supplied order/user context for eligibility checks
#[derive(Debug, Clone, Default)]
pub struct EligibilityContext {
    pub user_id: Option<i32>,
    pub order_total: Option<Decimal>,
}

/// Snapshot of a user's redemption history, keyed by coupon id
///
/// Empty for anonymous callers; the per-user rules only apply when a
/// user id is present in the context.
#[derive(Debug, Clone, Default)]
pub struct UsageSnapshot {
    redeemed: HashSet<i32>,
    counts: HashMap<i32, i64>,
}

impl UsageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` prior redemptions of `coupon_id` by this user
    pub fn record(&mut self, coupon_id: i32, count: i64) {
        if count > 0 {
            self.redeemed.insert(coupon_id);
        }
        self.counts.insert(coupon_id, count);
    }

    pub fn has_redeemed(&self, coupon_id: i32) -> bool {
        self.redeemed.contains(&coupon_id)
    }

    pub fn count_for(&self, coupon_id: i32) -> i64 {
        self.counts.get(&coupon_id).copied().unwrap_or(0)
    }
}

/// Successful validation outcome: the coupon plus the computed amount
#[derive(Debug, Clone, Serialize)]
pub struct CouponQuote {
    #[serde(flatten)]
    pub coupon: CouponSummary,
    pub calculated_discount: Decimal,
}

/// Filter a coupon set down to the ones the caller may currently use.
///
/// Rules are applied in order; the first failing rule rejects the
/// coupon. Date comparison here ignores time of day.
pub fn filter_available(
    coupons: &[Coupon],
    ctx: &EligibilityContext,
    usage: &UsageSnapshot,
    today: NaiveDate,
) -> Vec<CouponSummary> {
    coupons
        .iter()
        .filter(|coupon| is_available(coupon, ctx, usage, today))
        .map(CouponSummary::from)
        .collect()
}

fn is_available(
    coupon: &Coupon,
    ctx: &EligibilityContext,
    usage: &UsageSnapshot,
    today: NaiveDate,
) -> bool {
    if coupon.status != PromotionStatus::Active {
        return false;
    }

    // Calendar-date window: a coupon starting later today is already listed
    if today < coupon.valid_from.date_naive() {
        return false;
    }
    if today > coupon.valid_until.date_naive() {
        return false;
    }

    if ctx.user_id.is_some() {
        if coupon.user_usage_limit == UserUsageLimit::Once && usage.has_redeemed(coupon.id) {
            return false;
        }
        if let Some(limit) = coupon.usage_limit {
            if usage.count_for(coupon.id) >= limit {
                return false;
            }
        }
    }

    if let Some(limit) = coupon.usage_limit {
        if coupon.used >= limit {
            return false;
        }
    }

    if let (Some(order_total), Some(min_purchase)) = (ctx.order_total, coupon.min_purchase) {
        if order_total < min_purchase {
            return false;
        }
    }

    true
}

/// Caller-supplied context for validating a single coupon code
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub user_id: Option<i32>,
    pub order_total: Option<Decimal>,
    /// Prior redemptions of this coupon by this user
    pub per_user_count: i64,
}

/// Validate one coupon against the order context and compute its discount.
///
/// Unlike the eligibility filter this compares full timestamps, and a
/// not-yet-started coupon reports Expired rather than NotStarted.
pub fn validate(
    coupon: &Coupon,
    ctx: &ValidationContext,
    now: DateTime<Utc>,
) -> PromotionResult<CouponQuote> {
    if coupon.status != PromotionStatus::Active {
        return Err(PromotionError::NotFound(format!(
            "Coupon '{}' not found",
            coupon.code
        )));
    }

    if now < coupon.valid_from || now > coupon.valid_until {
        return Err(PromotionError::Expired);
    }

    if ctx.user_id.is_some() {
        if coupon.user_usage_limit == UserUsageLimit::Once && ctx.per_user_count > 0 {
            return Err(PromotionError::LimitReached { limit: 1 });
        }
        if let Some(limit) = coupon.usage_limit {
            if ctx.per_user_count >= limit {
                return Err(PromotionError::LimitReached { limit });
            }
        }
    }

    if let (Some(order_total), Some(min_purchase)) = (ctx.order_total, coupon.min_purchase) {
        if order_total < min_purchase {
            return Err(PromotionError::BelowMinimum {
                minimum: min_purchase,
                order_total,
            });
        }
    }

    let calculated_discount = calculate_discount(coupon, ctx.order_total.unwrap_or(Decimal::ZERO));

    Ok(CouponQuote {
        coupon: CouponSummary::from(coupon),
        calculated_discount,
    })
}

/// Discount amount for a validated coupon.
///
/// Fixed coupons are deliberately NOT clamped to the order total; the
/// store-wide discount validator clamps, this path does not.
fn calculate_discount(coupon: &Coupon, order_total: Decimal) -> Decimal {
    match coupon.kind {
        CouponKind::Percentage => {
            let amount = order_total * coupon.discount / Decimal::from(100);
            match coupon.max_discount {
                Some(cap) => amount.min(cap),
                None => amount,
            }
        }
        CouponKind::Fixed => coupon.discount,
        CouponKind::FreeShipping => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn base_coupon() -> Coupon {
        let now = Utc::now();
        Coupon {
            id: 1,
            code: "SAVE20".to_string(),
            kind: CouponKind::Percentage,
            discount: dec!(20),
            min_purchase: None,
            max_discount: None,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            usage_limit: None,
            user_usage_limit: UserUsageLimit::Multiple,
            used: 0,
            status: PromotionStatus::Active,
            description: "20% off".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn test_filter_accepts_active_coupon() {
        let coupons = vec![base_coupon()];
        let result = filter_available(
            &coupons,
            &EligibilityContext::default(),
            &UsageSnapshot::new(),
            today(),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].code, "SAVE20");
    }

    #[test]
    fn test_filter_rejects_inactive() {
        let mut coupon = base_coupon();
        coupon.status = PromotionStatus::Inactive;
        let result = filter_available(
            &[coupon],
            &EligibilityContext::default(),
            &UsageSnapshot::new(),
            today(),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_filter_rejects_outside_date_window() {
        let mut not_started = base_coupon();
        not_started.valid_from = Utc::now() + Duration::days(2);

        let mut expired = base_coupon();
        expired.id = 2;
        expired.valid_until = Utc::now() - Duration::days(2);

        let result = filter_available(
            &[not_started, expired],
            &EligibilityContext::default(),
            &UsageSnapshot::new(),
            today(),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_filter_single_use_rejected_after_redemption() {
        let mut coupon = base_coupon();
        coupon.user_usage_limit = UserUsageLimit::Once;

        let mut usage = UsageSnapshot::new();
        usage.record(coupon.id, 1);

        let ctx = EligibilityContext {
            user_id: Some(7),
            order_total: None,
        };
        assert!(filter_available(&[coupon.clone()], &ctx, &usage, today()).is_empty());

        // Anonymous callers are not subject to the per-user rule
        let anon = EligibilityContext::default();
        assert_eq!(filter_available(&[coupon], &anon, &usage, today()).len(), 1);
    }

    #[test]
    fn test_filter_per_user_cap() {
        let mut coupon = base_coupon();
        coupon.usage_limit = Some(3);

        let mut usage = UsageSnapshot::new();
        usage.record(coupon.id, 3);

        let ctx = EligibilityContext {
            user_id: Some(7),
            order_total: None,
        };
        assert!(filter_available(&[coupon], &ctx, &usage, today()).is_empty());
    }

    #[test]
    fn test_filter_global_cap() {
        let mut coupon = base_coupon();
        coupon.usage_limit = Some(100);
        coupon.used = 100;

        let result = filter_available(
            &[coupon],
            &EligibilityContext::default(),
            &UsageSnapshot::new(),
            today(),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_filter_below_minimum_purchase() {
        let mut coupon = base_coupon();
        coupon.min_purchase = Some(dec!(500));

        let ctx = EligibilityContext {
            user_id: None,
            order_total: Some(dec!(200)),
        };
        assert!(filter_available(&[coupon.clone()], &ctx, &UsageSnapshot::new(), today()).is_empty());

        // Without an order total the minimum-purchase rule is skipped
        let no_total = EligibilityContext::default();
        assert_eq!(
            filter_available(&[coupon], &no_total, &UsageSnapshot::new(), today()).len(),
            1
        );
    }

    #[test]
    fn test_filter_is_idempotent() {
        let coupons = vec![base_coupon()];
        let ctx = EligibilityContext {
            user_id: Some(1),
            order_total: Some(dec!(1000)),
        };
        let usage = UsageSnapshot::new();

        let first = filter_available(&coupons, &ctx, &usage, today());
        let second = filter_available(&coupons, &ctx, &usage, today());
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn test_summary_excludes_counters() {
        let mut coupon = base_coupon();
        coupon.used = 42;
        let summary = CouponSummary::from(&coupon);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("used").is_none());
        assert!(json.get("usage_limit").is_none());
    }

    #[test]
    fn test_validate_percentage_capped() {
        let mut coupon = base_coupon();
        coupon.max_discount = Some(dec!(100));

        let ctx = ValidationContext {
            order_total: Some(dec!(1000)),
            ..Default::default()
        };
        let quote = validate(&coupon, &ctx, Utc::now()).unwrap();
        // 20% of 1000 would be 200; the cap wins
        assert_eq!(quote.calculated_discount, dec!(100));
    }

    #[test]
    fn test_validate_percentage_uncapped() {
        let coupon = base_coupon();
        let ctx = ValidationContext {
            order_total: Some(dec!(500)),
            ..Default::default()
        };
        let quote = validate(&coupon, &ctx, Utc::now()).unwrap();
        assert_eq!(quote.calculated_discount, dec!(100));
    }

    #[test]
    fn test_validate_fixed_not_clamped_to_order_total() {
        let mut coupon = base_coupon();
        coupon.kind = CouponKind::Fixed;
        coupon.discount = dec!(75);

        let ctx = ValidationContext {
            order_total: Some(dec!(50)),
            ..Default::default()
        };
        let quote = validate(&coupon, &ctx, Utc::now()).unwrap();
        // Exceeds the order total; this path does not clamp
        assert_eq!(quote.calculated_discount, dec!(75));
    }

    #[test]
    fn test_validate_free_shipping_yields_zero() {
        let mut coupon = base_coupon();
        coupon.kind = CouponKind::FreeShipping;

        let ctx = ValidationContext {
            order_total: Some(dec!(800)),
            ..Default::default()
        };
        let quote = validate(&coupon, &ctx, Utc::now()).unwrap();
        assert_eq!(quote.calculated_discount, Decimal::ZERO);
    }

    #[test]
    fn test_validate_expired_and_not_started_both_report_expired() {
        let mut expired = base_coupon();
        expired.valid_until = Utc::now() - Duration::hours(1);
        let result = validate(&expired, &ValidationContext::default(), Utc::now());
        assert!(matches!(result, Err(PromotionError::Expired)));

        let mut not_started = base_coupon();
        not_started.valid_from = Utc::now() + Duration::hours(1);
        not_started.valid_until = Utc::now() + Duration::days(30);
        let result = validate(&not_started, &ValidationContext::default(), Utc::now());
        assert!(matches!(result, Err(PromotionError::Expired)));
    }

    #[test]
    fn test_validate_per_user_limit_reached() {
        let mut coupon = base_coupon();
        coupon.usage_limit = Some(2);

        let ctx = ValidationContext {
            user_id: Some(7),
            order_total: Some(dec!(100)),
            per_user_count: 2,
        };
        let result = validate(&coupon, &ctx, Utc::now());
        assert!(matches!(
            result,
            Err(PromotionError::LimitReached { limit: 2 })
        ));
    }

    #[test]
    fn test_validate_single_use_rejected_after_redemption() {
        let mut coupon = base_coupon();
        coupon.user_usage_limit = UserUsageLimit::Once;

        let ctx = ValidationContext {
            user_id: Some(7),
            order_total: Some(dec!(100)),
            per_user_count: 1,
        };
        let result = validate(&coupon, &ctx, Utc::now());
        assert!(matches!(
            result,
            Err(PromotionError::LimitReached { limit: 1 })
        ));

        // Anonymous validation skips the per-user rules
        let anon = ValidationContext {
            order_total: Some(dec!(100)),
            ..Default::default()
        };
        assert!(validate(&coupon, &anon, Utc::now()).is_ok());
    }

    #[test]
    fn test_validate_below_minimum() {
        let mut coupon = base_coupon();
        coupon.min_purchase = Some(dec!(500));

        let ctx = ValidationContext {
            order_total: Some(dec!(499)),
            ..Default::default()
        };
        let result = validate(&coupon, &ctx, Utc::now());
        assert!(matches!(result, Err(PromotionError::BelowMinimum { .. })));
    }

    #[test]
    fn test_validate_inactive_reports_not_found() {
        let mut coupon = base_coupon();
        coupon.status = PromotionStatus::Inactive;
        let result = validate(&coupon, &ValidationContext::default(), Utc::now());
        assert!(matches!(result, Err(PromotionError::NotFound(_))));
    }

    // The filter compares calendar dates while the validator compares
    // timestamps. A coupon whose window opens later today is therefore
    // listed as available but fails validation. Kept deliberately; see
    // DESIGN.md before unifying.
    #[test]
    fn test_date_granularity_discrepancy_between_filter_and_validator() {
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 8, 0, 0).unwrap();
        let mut coupon = base_coupon();
        coupon.valid_from = Utc.with_ymd_and_hms(2026, 6, 15, 18, 0, 0).unwrap();
        coupon.valid_until = Utc.with_ymd_and_hms(2026, 7, 15, 0, 0, 0).unwrap();

        let listed = filter_available(
            &[coupon.clone()],
            &EligibilityContext::default(),
            &UsageSnapshot::new(),
            now.date_naive(),
        );
        assert_eq!(listed.len(), 1);

        let result = validate(&coupon, &ValidationContext::default(), now);
        assert!(matches!(result, Err(PromotionError::Expired)));
    }
}
