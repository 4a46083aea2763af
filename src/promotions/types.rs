// Domain type definitions for the promotions subsystem
// Shared across the coupon, discount and coin engines

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by coupons and discounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    Active,
    Inactive,
}

impl fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromotionStatus::Active => write!(f, "active"),
            PromotionStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for PromotionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PromotionStatus::Active),
            "inactive" => Ok(PromotionStatus::Inactive),
            _ => Err(format!("Invalid promotion status: {}", s)),
        }
    }
}

/// How a coupon's discount value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `discount` is a percentage of the order total, optionally capped
    Percentage,

    /// `discount` is a flat amount off
    Fixed,

    /// Waives the shipping fee; contributes nothing to the item discount
    FreeShipping,
}

impl fmt::Display for CouponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponKind::Percentage => write!(f, "percentage"),
            CouponKind::Fixed => write!(f, "fixed"),
            CouponKind::FreeShipping => write!(f, "free_shipping"),
        }
    }
}

/// How a store-wide discount's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the order total, optionally capped
    Percentage,

    /// `value` is a flat amount off, never more than the order total
    Fixed,

    /// Amount is derived from the free-text `instruction` field
    Custom,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountKind::Percentage => write!(f, "percentage"),
            DiscountKind::Fixed => write!(f, "fixed"),
            DiscountKind::Custom => write!(f, "custom"),
        }
    }
}

/// Per-user redemption policy for coupons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserUsageLimit {
    /// Each user may redeem the coupon at most once
    Once,

    /// No per-user restriction beyond the global cap
    Multiple,
}

impl fmt::Display for UserUsageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserUsageLimit::Once => write!(f, "once"),
            UserUsageLimit::Multiple => write!(f, "multiple"),
        }
    }
}

/// Direction of a coin ledger entry; amounts are always positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CoinTransactionKind {
    Earned,
    Spent,
    Expired,
    Refunded,
}

impl fmt::Display for CoinTransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinTransactionKind::Earned => write!(f, "earned"),
            CoinTransactionKind::Spent => write!(f, "spent"),
            CoinTransactionKind::Expired => write!(f, "expired"),
            CoinTransactionKind::Refunded => write!(f, "refunded"),
        }
    }
}

impl CoinTransactionKind {
    /// Whether this entry increases the balance
    pub fn is_credit(&self) -> bool {
        matches!(self, CoinTransactionKind::Earned | CoinTransactionKind::Refunded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_and_parse() {
        use std::str::FromStr;

        assert_eq!(PromotionStatus::Active.to_string(), "active");
        assert_eq!(
            PromotionStatus::from_str("inactive").unwrap(),
            PromotionStatus::Inactive
        );
        assert!(PromotionStatus::from_str("archived").is_err());
    }

    #[test]
    fn test_coupon_kind_serialization() {
        let json = serde_json::to_string(&CouponKind::FreeShipping).unwrap();
        assert_eq!(json, "\"free_shipping\"");

        let kind: CouponKind = serde_json::from_str("\"percentage\"").unwrap();
        assert_eq!(kind, CouponKind::Percentage);
    }

    #[test]
    fn test_discount_kind_display() {
        assert_eq!(DiscountKind::Percentage.to_string(), "percentage");
        assert_eq!(DiscountKind::Fixed.to_string(), "fixed");
        assert_eq!(DiscountKind::Custom.to_string(), "custom");
    }

    #[test]
    fn test_coin_kind_direction() {
        assert!(CoinTransactionKind::Earned.is_credit());
        assert!(CoinTransactionKind::Refunded.is_credit());
        assert!(!CoinTransactionKind::Spent.is_credit());
        assert!(!CoinTransactionKind::Expired.is_credit());
    }

    #[test]
    fn test_user_usage_limit_serialization() {
        let json = serde_json::to_string(&UserUsageLimit::Once).unwrap();
        assert_eq!(json, "\"once\"");

        let limit: UserUsageLimit = serde_json::from_str("\"multiple\"").unwrap();
        assert_eq!(limit, UserUsageLimit::Multiple);
    }
}
