// HTTP handlers for the promotions surface
//
// Storefront endpoints list available promotions and validate codes;
// admin endpoints manage coupons, discounts and the coin rules.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::promotions::{
    CartItem, CoinRules, CoinTransaction, Coupon, CouponDraft, CouponKind, CouponQuote, Discount,
    DiscountDraft, DiscountKind, DiscountQuote, EarningRule, PromotionError, PromotionStatus,
    RedemptionQuote, RedemptionRule, UserUsageLimit,
};

// ----------------------------------------------------------------------
// Storefront DTOs
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AvailablePromotionsQuery {
    pub order_total: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, message = "Coupon code is required"))]
    pub code: String,
    pub order_total: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    pub discount: CouponQuote,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateDiscountRequest {
    #[validate(length(min = 1, message = "Discount code is required"))]
    pub code: String,
    #[validate(custom = "crate::validation::validate_positive_amount")]
    pub order_total: Decimal,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
pub struct ValidateDiscountResponse {
    pub valid: bool,
    pub discount: DiscountQuote,
}

#[derive(Debug, Serialize)]
pub struct CoinBalanceResponse {
    pub coins: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CoinQuoteRequest {
    pub coins_to_redeem: i64,
    #[validate(custom = "crate::validation::validate_positive_amount")]
    pub subtotal: Decimal,
}

// ----------------------------------------------------------------------
// Storefront handlers
// ----------------------------------------------------------------------

/// Handler for GET /api/coupons/available
/// Coupons the caller (authenticated or anonymous) can use right now
pub async fn available_coupons_handler(
    State(state): State<crate::AppState>,
    user: Option<AuthenticatedUser>,
    Query(query): Query<AvailablePromotionsQuery>,
) -> Result<Json<Vec<crate::promotions::CouponSummary>>, PromotionError> {
    let user_id = user.map(|u| u.user_id);
    let coupons = state
        .promotions
        .available_coupons(user_id, query.order_total)
        .await?;
    Ok(Json(coupons))
}

/// Handler for POST /api/coupons/validate
pub async fn validate_coupon_handler(
    State(state): State<crate::AppState>,
    user: Option<AuthenticatedUser>,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<ValidateCouponResponse>, PromotionError> {
    request.validate()?;

    let user_id = user.map(|u| u.user_id);
    let quote = state
        .promotions
        .validate_coupon(&request.code, user_id, request.order_total)
        .await?;

    Ok(Json(ValidateCouponResponse {
        valid: true,
        discount: quote,
    }))
}

/// Handler for GET /api/discounts/available
pub async fn available_discounts_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<AvailablePromotionsQuery>,
) -> Result<Json<Vec<crate::promotions::DiscountSummary>>, PromotionError> {
    let discounts = state
        .promotions
        .available_discounts(query.order_total)
        .await?;
    Ok(Json(discounts))
}

/// Handler for POST /api/discounts/validate
pub async fn validate_discount_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<ValidateDiscountRequest>,
) -> Result<Json<ValidateDiscountResponse>, PromotionError> {
    request.validate()?;

    let quote = state
        .promotions
        .validate_discount(&request.code, request.order_total, &request.items)
        .await?;

    Ok(Json(ValidateDiscountResponse {
        valid: true,
        discount: quote,
    }))
}

/// Handler for GET /api/coins
pub async fn coin_balance_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CoinBalanceResponse>, PromotionError> {
    let coins = state.promotions.coin_balance(user.user_id).await?;
    Ok(Json(CoinBalanceResponse { coins }))
}

/// Handler for GET /api/coins/transactions
pub async fn coin_transactions_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<CoinTransaction>>, PromotionError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let transactions = state
        .promotions
        .coin_transactions(user.user_id, limit)
        .await?;
    Ok(Json(transactions))
}

/// Handler for POST /api/coins/quote
/// Quotes a redemption without touching the balance
pub async fn coin_quote_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CoinQuoteRequest>,
) -> Result<Json<RedemptionQuote>, PromotionError> {
    request.validate()?;

    let quote = state
        .promotions
        .coin_quote(user.user_id, request.coins_to_redeem, request.subtotal)
        .await?;
    Ok(Json(quote))
}

// ----------------------------------------------------------------------
// Admin DTOs
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequest {
    #[validate(custom = "crate::validation::validate_promo_code")]
    pub code: String,
    pub kind: CouponKind,
    #[validate(custom = "crate::validation::validate_non_negative_amount")]
    pub discount: Decimal,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    #[serde(default = "default_user_usage_limit")]
    pub user_usage_limit: UserUsageLimit,
    #[serde(default = "default_status")]
    pub status: PromotionStatus,
    #[serde(default)]
    pub description: String,
}

fn default_user_usage_limit() -> UserUsageLimit {
    UserUsageLimit::Multiple
}

fn default_status() -> PromotionStatus {
    PromotionStatus::Active
}

impl CouponRequest {
    fn into_draft(self) -> CouponDraft {
        CouponDraft {
            code: self.code,
            kind: self.kind,
            discount: self.discount,
            min_purchase: self.min_purchase,
            max_discount: self.max_discount,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            usage_limit: self.usage_limit,
            user_usage_limit: self.user_usage_limit,
            status: self.status,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct DiscountRequest {
    #[validate(custom = "crate::validation::validate_promo_code")]
    pub code: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub kind: DiscountKind,
    #[validate(custom = "crate::validation::validate_non_negative_amount")]
    pub value: Decimal,
    pub min_order: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_status")]
    pub status: PromotionStatus,
    pub instruction: Option<String>,
}

impl DiscountRequest {
    fn into_draft(self) -> DiscountDraft {
        DiscountDraft {
            code: self.code,
            name: self.name,
            kind: self.kind,
            value: self.value,
            min_order: self.min_order,
            max_discount: self.max_discount,
            usage_limit: self.usage_limit,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            instruction: self.instruction,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CoinRulesRequest {
    #[validate(custom = "crate::validation::validate_positive_amount")]
    pub earning_threshold: Decimal,
    #[validate(range(min = 1, message = "Earned coins must be at least 1"))]
    pub earning_coins: i64,
    #[validate(range(min = 1, message = "Coins per unit must be at least 1"))]
    pub redemption_coins_per_unit: i64,
    #[validate(custom = "crate::validation::validate_percent")]
    pub redemption_discount_percent: Decimal,
}

// ----------------------------------------------------------------------
// Admin handlers
// ----------------------------------------------------------------------

/// Handler for GET /api/admin/coupons
pub async fn list_coupons_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<Coupon>>, PromotionError> {
    let coupons = state.promotions.store().get_coupons().await?;
    Ok(Json(coupons))
}

/// Handler for POST /api/admin/coupons
pub async fn create_coupon_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<CouponRequest>,
) -> Result<(StatusCode, Json<Coupon>), PromotionError> {
    request.validate()?;
    if request.valid_until < request.valid_from {
        return Err(PromotionError::InvalidInput(
            "valid_until must not precede valid_from".to_string(),
        ));
    }

    let coupon = state
        .promotions
        .store()
        .create_coupon(&request.into_draft())
        .await?;
    tracing::info!("Created coupon {} ({})", coupon.code, coupon.id);
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// Handler for PUT /api/admin/coupons/:id
pub async fn update_coupon_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<CouponRequest>,
) -> Result<Json<Coupon>, PromotionError> {
    request.validate()?;

    let coupon = state
        .promotions
        .store()
        .update_coupon(id, &request.into_draft())
        .await?;
    tracing::info!("Updated coupon {}", id);
    Ok(Json(coupon))
}

/// Handler for DELETE /api/admin/coupons/:id
pub async fn delete_coupon_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, PromotionError> {
    state.promotions.store().delete_coupon(id).await?;
    tracing::info!("Deleted coupon {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/admin/discounts
pub async fn list_discounts_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<Discount>>, PromotionError> {
    let discounts = state.promotions.store().get_discounts().await?;
    Ok(Json(discounts))
}

/// Handler for POST /api/admin/discounts
pub async fn create_discount_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<DiscountRequest>,
) -> Result<(StatusCode, Json<Discount>), PromotionError> {
    request.validate()?;
    if request.end_date < request.start_date {
        return Err(PromotionError::InvalidInput(
            "end_date must not precede start_date".to_string(),
        ));
    }
    if request.kind == DiscountKind::Custom && request.instruction.is_none() {
        return Err(PromotionError::InvalidInput(
            "custom discounts require an instruction".to_string(),
        ));
    }

    let discount = state
        .promotions
        .store()
        .create_discount(&request.into_draft())
        .await?;
    tracing::info!("Created discount {} ({})", discount.code, discount.id);
    Ok((StatusCode::CREATED, Json(discount)))
}

/// Handler for PUT /api/admin/discounts/:id
pub async fn update_discount_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<DiscountRequest>,
) -> Result<Json<Discount>, PromotionError> {
    request.validate()?;

    let discount = state
        .promotions
        .store()
        .update_discount(id, &request.into_draft())
        .await?;
    tracing::info!("Updated discount {}", id);
    Ok(Json(discount))
}

/// Handler for DELETE /api/admin/discounts/:id
pub async fn delete_discount_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, PromotionError> {
    state.promotions.store().delete_discount(id).await?;
    tracing::info!("Deleted discount {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/admin/coin-rules
pub async fn get_coin_rules_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<CoinRules>, PromotionError> {
    let rules = state.promotions.coin_rules().await?;
    Ok(Json(rules))
}

/// Handler for PUT /api/admin/coin-rules
pub async fn update_coin_rules_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<CoinRulesRequest>,
) -> Result<Json<CoinRules>, PromotionError> {
    request.validate()?;

    let rules = CoinRules {
        earning: EarningRule {
            threshold: request.earning_threshold,
            coins: request.earning_coins,
        },
        redemption: RedemptionRule {
            coins_per_unit: request.redemption_coins_per_unit,
            discount_percent: request.redemption_discount_percent,
        },
    };
    let updated = state.promotions.store().update_coin_rules(&rules).await?;
    tracing::info!("Updated coin rules");
    Ok(Json(updated))
}

/// Handler for GET /api/admin/promotions/metrics
pub async fn promotion_metrics_handler(
    State(state): State<crate::AppState>,
) -> Json<crate::promotions::metrics::MetricsSnapshot> {
    Json(state.promotions.metrics().snapshot())
}
