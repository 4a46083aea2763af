// Coin program arithmetic
//
// Pure earning and redemption math over the two singleton rules. All
// balance mutation lives in the ledger; nothing here touches storage.

use crate::promotions::error::{PromotionError, PromotionResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Coins credited when an order's paid total reaches the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningRule {
    pub threshold: Decimal,
    pub coins: i64,
}

impl Default for EarningRule {
    fn default() -> Self {
        Self {
            threshold: Decimal::from(5000),
            coins: 10,
        }
    }
}

/// Discount granted per block of redeemed coins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionRule {
    pub coins_per_unit: i64,
    pub discount_percent: Decimal,
}

impl Default for RedemptionRule {
    fn default() -> Self {
        Self {
            coins_per_unit: 50,
            discount_percent: Decimal::from(5),
        }
    }
}

/// Outcome of a redemption calculation
#[derive(Debug, Clone, Serialize)]
pub struct RedemptionQuote {
    pub discount_amount: Decimal,
    pub discount_percent: Decimal,
    pub coins_spent: i64,
    /// Leftover coins that bought no discount unit; informational only,
    /// they are still debited with the rest
    pub coins_remaining: i64,
}

/// Coin ledger entry as stored
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoinTransaction {
    pub id: i64,
    pub user_id: i32,
    pub kind: crate::promotions::types::CoinTransactionKind,
    pub amount: i64,
    pub balance_after: i64,
    pub description: String,
    pub order_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Quote the discount a coin redemption yields against a subtotal.
///
/// Whole units only: `coins_to_redeem` buys `coins_to_redeem /
/// coins_per_unit` units of `discount_percent` each, and the remainder
/// is reported back unspent-in-effect.
pub fn redemption_quote(
    coins_to_redeem: i64,
    subtotal: Decimal,
    balance: i64,
    rule: &RedemptionRule,
) -> PromotionResult<RedemptionQuote> {
    if coins_to_redeem <= 0 {
        return Err(PromotionError::InvalidInput(
            "coins_to_redeem must be positive".to_string(),
        ));
    }
    if subtotal <= Decimal::ZERO {
        return Err(PromotionError::InvalidInput(
            "subtotal must be positive".to_string(),
        ));
    }
    if balance < coins_to_redeem {
        return Err(PromotionError::InsufficientCoins {
            requested: coins_to_redeem,
            available: balance,
        });
    }

    let units = coins_to_redeem / rule.coins_per_unit;
    let discount_percent = rule.discount_percent * Decimal::from(units);
    let discount_amount = (subtotal * discount_percent / Decimal::from(100)).round_dp(2);
    let coins_remaining = coins_to_redeem % rule.coins_per_unit;

    Ok(RedemptionQuote {
        discount_amount,
        discount_percent,
        coins_spent: coins_to_redeem,
        coins_remaining,
    })
}

/// Coins an order earns once paid; zero below the threshold.
pub fn coins_earned(paid_total: Decimal, rule: &EarningRule) -> i64 {
    if paid_total >= rule.threshold {
        rule.coins
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_redemption_scenario() {
        // balance 120, redeem 100 with rule {50 coins, 5%} against 2000
        let rule = RedemptionRule {
            coins_per_unit: 50,
            discount_percent: dec!(5),
        };
        let quote = redemption_quote(100, dec!(2000), 120, &rule).unwrap();
        assert_eq!(quote.discount_percent, dec!(10));
        assert_eq!(quote.discount_amount, dec!(200.00));
        assert_eq!(quote.coins_remaining, 0);
    }

    #[test]
    fn test_redemption_leftover_coins() {
        let rule = RedemptionRule::default();
        let quote = redemption_quote(120, dec!(1000), 500, &rule).unwrap();
        // 120 coins buy 2 units of 5%; 20 coins left over
        assert_eq!(quote.discount_percent, dec!(10));
        assert_eq!(quote.discount_amount, dec!(100.00));
        assert_eq!(quote.coins_remaining, 20);
    }

    #[test]
    fn test_redemption_below_one_unit() {
        let rule = RedemptionRule::default();
        let quote = redemption_quote(30, dec!(1000), 100, &rule).unwrap();
        assert_eq!(quote.discount_amount, Decimal::ZERO);
        assert_eq!(quote.discount_percent, Decimal::ZERO);
        assert_eq!(quote.coins_remaining, 30);
    }

    #[test]
    fn test_redemption_rounds_to_paise() {
        let rule = RedemptionRule::default();
        let quote = redemption_quote(50, dec!(333.33), 100, &rule).unwrap();
        // 5% of 333.33 = 16.6665, rounded to 2 decimals
        assert_eq!(quote.discount_amount, dec!(16.67));
    }

    #[test]
    fn test_insufficient_coins() {
        let rule = RedemptionRule::default();
        let result = redemption_quote(100, dec!(500), 40, &rule);
        assert!(matches!(
            result,
            Err(PromotionError::InsufficientCoins {
                requested: 100,
                available: 40
            })
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        let rule = RedemptionRule::default();
        assert!(matches!(
            redemption_quote(0, dec!(500), 100, &rule),
            Err(PromotionError::InvalidInput(_))
        ));
        assert!(matches!(
            redemption_quote(-5, dec!(500), 100, &rule),
            Err(PromotionError::InvalidInput(_))
        ));
        assert!(matches!(
            redemption_quote(50, Decimal::ZERO, 100, &rule),
            Err(PromotionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_earning_threshold() {
        let rule = EarningRule::default();
        assert_eq!(coins_earned(dec!(5000), &rule), 10);
        assert_eq!(coins_earned(dec!(7500), &rule), 10);
        assert_eq!(coins_earned(dec!(4999.99), &rule), 0);
    }

    #[test]
    fn test_default_rules() {
        let earning = EarningRule::default();
        assert_eq!(earning.threshold, dec!(5000));
        assert_eq!(earning.coins, 10);

        let redemption = RedemptionRule::default();
        assert_eq!(redemption.coins_per_unit, 50);
        assert_eq!(redemption.discount_percent, dec!(5));
    }

    proptest! {
        // coins_remaining = coins - units * coins_per_unit, and
        // 0 <= coins_remaining < coins_per_unit
        #[test]
        fn prop_redemption_round_trip(
            coins in 1i64..=10_000,
            subtotal_paise in 100u32..=10_000_000u32,
        ) {
            let rule = RedemptionRule::default();
            let subtotal = Decimal::from(subtotal_paise) / Decimal::from(100);
            let quote = redemption_quote(coins, subtotal, coins, &rule).unwrap();

            let units = coins / rule.coins_per_unit;
            prop_assert_eq!(
                quote.coins_remaining,
                coins - units * rule.coins_per_unit
            );
            prop_assert!(quote.coins_remaining >= 0);
            prop_assert!(quote.coins_remaining < rule.coins_per_unit);
        }

        #[test]
        fn prop_discount_never_negative(
            coins in 1i64..=10_000,
            subtotal_paise in 100u32..=10_000_000u32,
        ) {
            let rule = RedemptionRule::default();
            let subtotal = Decimal::from(subtotal_paise) / Decimal::from(100);
            let quote = redemption_quote(coins, subtotal, coins, &rule).unwrap();
            prop_assert!(quote.discount_amount >= Decimal::ZERO);
        }
    }
}
