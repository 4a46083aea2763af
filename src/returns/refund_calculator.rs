use rust_decimal::Decimal;

use crate::orders::Order;

/// What an approved return gives back and takes away
#[derive(Debug, Clone, PartialEq)]
pub struct RefundBreakdown {
    /// Money returned to the customer: the amount actually charged
    pub refund_amount: Decimal,
    /// Coins spent on the order, credited back
    pub coins_to_refund: i64,
    /// Coins the order earned, reclaimed (the ledger clamps this so the
    /// balance never goes negative)
    pub coins_to_reclaim: i64,
}

/// Service for computing refund figures for approved returns
pub struct RefundCalculator;

impl RefundCalculator {
    /// Derive the refund breakdown for an order
    ///
    /// The monetary refund is the charged total, not the pre-discount
    /// subtotal; discounts were never paid so they are never refunded.
    pub fn breakdown(order: &Order, coins_spent: i64, coins_earned: i64) -> RefundBreakdown {
        RefundBreakdown {
            refund_amount: order.total_price,
            coins_to_refund: coins_spent.max(0),
            coins_to_reclaim: coins_earned.max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{OrderStatus, PaymentStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn order(subtotal: Decimal, discount: Decimal, coin_discount: Decimal) -> Order {
        let total = (subtotal - discount - coin_discount).max(Decimal::ZERO);
        Order {
            id: Uuid::new_v4(),
            user_id: 1,
            status: OrderStatus::Delivered,
            payment_status: PaymentStatus::Paid,
            subtotal,
            discount_amount: discount,
            coin_discount,
            coins_redeemed: 0,
            coupon_code: None,
            discount_code: None,
            total_price: total,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_refund_is_charged_amount_not_subtotal() {
        let order = order(dec!(1000), dec!(100), dec!(50));
        let breakdown = RefundCalculator::breakdown(&order, 0, 0);
        assert_eq!(breakdown.refund_amount, dec!(850));
    }

    #[test]
    fn test_coin_figures_pass_through() {
        let order = order(dec!(6000), dec!(0), dec!(0));
        let breakdown = RefundCalculator::breakdown(&order, 100, 10);
        assert_eq!(breakdown.coins_to_refund, 100);
        assert_eq!(breakdown.coins_to_reclaim, 10);
    }

    #[test]
    fn test_negative_ledger_sums_are_clamped() {
        let order = order(dec!(500), dec!(0), dec!(0));
        let breakdown = RefundCalculator::breakdown(&order, -5, -3);
        assert_eq!(breakdown.coins_to_refund, 0);
        assert_eq!(breakdown.coins_to_reclaim, 0);
    }

    #[test]
    fn test_fully_discounted_order_refunds_zero() {
        let order = order(dec!(50), dec!(75), dec!(0));
        let breakdown = RefundCalculator::breakdown(&order, 0, 0);
        assert_eq!(breakdown.refund_amount, Decimal::ZERO);
    }
}
