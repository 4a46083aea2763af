// Promotional instruction parser
//
// Interprets a restricted natural-language instruction ("Buy 2 Get 1
// Free", "10% off", "₹50 off") into a discount amount for the given
// cart. Patterns live in an ordered table; the first match wins and an
// unmatched instruction yields zero rather than an error.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Cart line item as seen by the promotion evaluators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub price: Decimal,
    pub quantity: u32,
}

struct InstructionRule {
    pattern: Regex,
    apply: fn(&Captures, &[CartItem], Decimal) -> Decimal,
}

// Evaluated top to bottom. New instruction forms are added here; the
// dispatch below never changes.
static RULES: Lazy<Vec<InstructionRule>> = Lazy::new(|| {
    vec![
        InstructionRule {
            pattern: Regex::new(r"(?i)buy (\d+) get (\d+) free").unwrap(),
            apply: buy_x_get_y_free,
        },
        InstructionRule {
            pattern: Regex::new(r"(?i)(\d+(\.\d+)?)\s*%\s*(off|discount)").unwrap(),
            apply: percentage_off,
        },
        InstructionRule {
            pattern: Regex::new(r"(?i)₹?\s*(\d+(\.\d+)?)\s*(off|discount)").unwrap(),
            apply: fixed_amount_off,
        },
    ]
});

/// Compute the discount an instruction yields for this cart.
///
/// Returns zero for an empty cart or an instruction no pattern matches.
pub fn parse(instruction: &str, cart_items: &[CartItem], order_total: Decimal) -> Decimal {
    if cart_items.is_empty() {
        return Decimal::ZERO;
    }

    for rule in RULES.iter() {
        if let Some(caps) = rule.pattern.captures(instruction) {
            let amount = (rule.apply)(&caps, cart_items, order_total);
            return amount.max(Decimal::ZERO);
        }
    }

    Decimal::ZERO
}

fn capture_decimal(caps: &Captures, index: usize) -> Decimal {
    caps.get(index)
        .and_then(|m| Decimal::from_str(m.as_str()).ok())
        .unwrap_or(Decimal::ZERO)
}

fn capture_u32(caps: &Captures, index: usize) -> u32 {
    caps.get(index)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0)
}

/// "Buy X Get Y Free": once the cart holds at least X+Y units, exactly Y
/// units go free, cheapest first. The count does not scale with further
/// multiples of the bundle; see DESIGN.md before changing that.
fn buy_x_get_y_free(caps: &Captures, cart_items: &[CartItem], _order_total: Decimal) -> Decimal {
    let buy = capture_u32(caps, 1);
    let free = capture_u32(caps, 2);
    if free == 0 {
        return Decimal::ZERO;
    }

    let min_items = buy + free;
    let total_quantity: u32 = cart_items.iter().map(|item| item.quantity).sum();
    if total_quantity < min_items {
        return Decimal::ZERO;
    }

    let mut sorted: Vec<&CartItem> = cart_items.iter().collect();
    sorted.sort_by(|a, b| a.price.cmp(&b.price));

    let mut free_slots = free;
    let mut discount = Decimal::ZERO;
    for item in sorted {
        if free_slots == 0 {
            break;
        }
        let free_from_this_item = free_slots.min(item.quantity);
        discount += item.price * Decimal::from(free_from_this_item);
        free_slots -= free_from_this_item;
    }

    discount
}

fn percentage_off(caps: &Captures, _cart_items: &[CartItem], order_total: Decimal) -> Decimal {
    let percent = capture_decimal(caps, 1);
    order_total * percent / Decimal::from(100)
}

fn fixed_amount_off(caps: &Captures, _cart_items: &[CartItem], order_total: Decimal) -> Decimal {
    let amount = capture_decimal(caps, 1);
    amount.min(order_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(price: Decimal, quantity: u32) -> CartItem {
        CartItem { price, quantity }
    }

    #[test]
    fn test_buy_two_get_one_free() {
        let cart = vec![item(dec!(100), 3)];
        let discount = parse("Buy 2 Get 1 Free", &cart, dec!(300));
        assert_eq!(discount, dec!(100));
    }

    #[test]
    fn test_buy_x_get_y_below_threshold() {
        let cart = vec![item(dec!(100), 2)];
        let discount = parse("Buy 2 Get 1 Free", &cart, dec!(200));
        assert_eq!(discount, Decimal::ZERO);
    }

    #[test]
    fn test_buy_x_get_y_cheapest_units_go_free() {
        let cart = vec![item(dec!(200), 2), item(dec!(50), 2)];
        let discount = parse("buy 2 get 2 free", &cart, dec!(500));
        // Both free units come from the 50-priced line
        assert_eq!(discount, dec!(100));
    }

    #[test]
    fn test_buy_x_get_y_free_spans_lines() {
        let cart = vec![item(dec!(30), 1), item(dec!(80), 2), item(dec!(500), 1)];
        let discount = parse("Buy 2 Get 2 Free", &cart, dec!(690));
        // Cheapest two units: 30 + 80
        assert_eq!(discount, dec!(110));
    }

    // The observed behavior: exactly Y units go free once the threshold
    // is met, regardless of how many bundle multiples the cart holds.
    #[test]
    fn test_buy_x_get_y_does_not_scale_with_multiples() {
        let cart = vec![item(dec!(100), 6)];
        let discount = parse("Buy 2 Get 1 Free", &cart, dec!(600));
        assert_eq!(discount, dec!(100));
    }

    #[test]
    fn test_percentage_off() {
        let cart = vec![item(dec!(100), 5)];
        let discount = parse("10% off", &cart, dec!(500));
        assert_eq!(discount, dec!(50));
    }

    #[test]
    fn test_fractional_percentage() {
        let cart = vec![item(dec!(100), 1)];
        let discount = parse("12.5 % discount", &cart, dec!(400));
        assert_eq!(discount, dec!(50.000));
    }

    #[test]
    fn test_fixed_amount_clamped_to_order_total() {
        let cart = vec![item(dec!(50), 1)];
        let discount = parse("₹75 off", &cart, dec!(50));
        assert_eq!(discount, dec!(50));
    }

    #[test]
    fn test_fixed_amount_without_currency_symbol() {
        let cart = vec![item(dec!(100), 3)];
        let discount = parse("Flat 200 off", &cart, dec!(300));
        assert_eq!(discount, dec!(200));
    }

    #[test]
    fn test_case_insensitive_matching() {
        let cart = vec![item(dec!(40), 2)];
        let discount = parse("BUY 1 GET 1 FREE", &cart, dec!(80));
        assert_eq!(discount, dec!(40));
    }

    #[test]
    fn test_unmatched_instruction_yields_zero() {
        let cart = vec![item(dec!(100), 1)];
        let discount = parse("free gift with every order", &cart, dec!(100));
        assert_eq!(discount, Decimal::ZERO);
    }

    #[test]
    fn test_empty_cart_yields_zero() {
        let discount = parse("10% off", &[], dec!(500));
        assert_eq!(discount, Decimal::ZERO);
    }

    #[test]
    fn test_bundle_priority_over_percentage() {
        // An instruction mentioning both forms resolves to the first
        // pattern in the table
        let cart = vec![item(dec!(100), 4)];
        let discount = parse("Buy 3 get 1 free, up to 50% off", &cart, dec!(400));
        assert_eq!(discount, dec!(100));
    }
}
