use rust_decimal::Decimal;

/// Service for calculating order prices and subtotals
pub struct PriceCalculator;

impl PriceCalculator {
    /// Calculate subtotal for an order item
    ///
    /// # Arguments
    /// * `quantity` - Number of items ordered
    /// * `price_snapshot` - Price per item at time of order
    pub fn calculate_subtotal(quantity: i32, price_snapshot: Decimal) -> Decimal {
        Decimal::from(quantity) * price_snapshot
    }

    /// Calculate total price for an order (sum of all subtotals)
    pub fn calculate_total(subtotals: &[Decimal]) -> Decimal {
        subtotals.iter().sum()
    }

    /// Amount actually charged after the code discount and the coin
    /// discount, floored at zero
    pub fn apply_discounts(
        subtotal: Decimal,
        discount_amount: Decimal,
        coin_discount: Decimal,
    ) -> Decimal {
        (subtotal - discount_amount - coin_discount).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_calculate_subtotal_basic() {
        let subtotal = PriceCalculator::calculate_subtotal(2, dec!(450.00));
        assert_eq!(subtotal, dec!(900.00));
    }

    #[test]
    fn test_calculate_subtotal_single_item() {
        let subtotal = PriceCalculator::calculate_subtotal(1, dec!(375.50));
        assert_eq!(subtotal, dec!(375.50));
    }

    #[test]
    fn test_calculate_total_multiple_items() {
        let subtotals = vec![dec!(1000.00), dec!(550.00), dec!(325.25)];
        let total = PriceCalculator::calculate_total(&subtotals);
        assert_eq!(total, dec!(1875.25));
    }

    #[test]
    fn test_calculate_total_empty() {
        let subtotals: Vec<Decimal> = vec![];
        assert_eq!(PriceCalculator::calculate_total(&subtotals), dec!(0));
    }

    #[test]
    fn test_apply_discounts() {
        let total = PriceCalculator::apply_discounts(dec!(1000), dec!(100), dec!(50));
        assert_eq!(total, dec!(850));
    }

    #[test]
    fn test_apply_discounts_floors_at_zero() {
        // A fixed coupon larger than the order must not charge negative
        let total = PriceCalculator::apply_discounts(dec!(50), dec!(75), dec!(0));
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_decimal_precision() {
        let subtotal = PriceCalculator::calculate_subtotal(3, dec!(433.33));
        assert_eq!(subtotal, dec!(1299.99));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// subtotal = quantity * price for all valid inputs
    #[test]
    fn prop_subtotal_calculation_invariant() {
        proptest!(|(
            quantity in 1i32..=1000,
            price_paise in 1u32..=1_000_000u32
        )| {
            let price = Decimal::from(price_paise) / Decimal::from(100);
            let subtotal = PriceCalculator::calculate_subtotal(quantity, price);
            prop_assert_eq!(subtotal, Decimal::from(quantity) * price);
        });
    }

    /// total = sum of subtotals for all valid inputs
    #[test]
    fn prop_total_calculation_invariant() {
        proptest!(|(
            subtotals_paise in prop::collection::vec(1u32..=10_000_000u32, 1..=20)
        )| {
            let subtotals: Vec<Decimal> = subtotals_paise
                .iter()
                .map(|&paise| Decimal::from(paise) / Decimal::from(100))
                .collect();

            let total = PriceCalculator::calculate_total(&subtotals);
            let expected: Decimal = subtotals.iter().sum();
            prop_assert_eq!(total, expected);
        });
    }

    /// Charged amounts never go negative, whatever the discounts
    #[test]
    fn prop_charged_amount_non_negative() {
        proptest!(|(
            subtotal_paise in 0u32..=10_000_000u32,
            discount_paise in 0u32..=20_000_000u32,
            coin_paise in 0u32..=20_000_000u32
        )| {
            let total = PriceCalculator::apply_discounts(
                Decimal::from(subtotal_paise) / Decimal::from(100),
                Decimal::from(discount_paise) / Decimal::from(100),
                Decimal::from(coin_paise) / Decimal::from(100),
            );
            prop_assert!(total >= Decimal::ZERO);
        });
    }

    /// Order of subtotals does not affect the total
    #[test]
    fn prop_total_is_commutative() {
        proptest!(|(
            subtotals_paise in prop::collection::vec(1u32..=1_000_000u32, 2..=10)
        )| {
            let subtotals: Vec<Decimal> = subtotals_paise
                .iter()
                .map(|&paise| Decimal::from(paise) / Decimal::from(100))
                .collect();

            let total1 = PriceCalculator::calculate_total(&subtotals);

            let mut reversed = subtotals.clone();
            reversed.reverse();
            let total2 = PriceCalculator::calculate_total(&reversed);

            prop_assert_eq!(total1, total2);
        });
    }
}
