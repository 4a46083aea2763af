// Validation utilities module
// Provides custom validation functions for domain-specific rules

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

static PROMO_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,32}$").unwrap());

/// Validates that a promo code is 3-32 characters of letters, digits,
/// dashes or underscores
pub fn validate_promo_code(code: &str) -> Result<(), ValidationError> {
    if PROMO_CODE.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_promo_code"))
    }
}

/// Validates that an amount is strictly positive
pub fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("amount_must_be_positive"))
    }
}

/// Validates that an amount is not negative
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount >= Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("amount_must_not_be_negative"))
    }
}

/// Validates that a percentage lies in (0, 100]
pub fn validate_percent(percent: &Decimal) -> Result<(), ValidationError> {
    if *percent > Decimal::ZERO && *percent <= Decimal::from(100) {
        Ok(())
    } else {
        Err(ValidationError::new("percent_out_of_range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_promo_code_shapes() {
        assert!(validate_promo_code("SAVE20").is_ok());
        assert!(validate_promo_code("festive-2026").is_ok());
        assert!(validate_promo_code("AB").is_err());
        assert!(validate_promo_code("has spaces").is_err());
        assert!(validate_promo_code("").is_err());
    }

    #[test]
    fn test_amount_validators() {
        assert!(validate_positive_amount(&dec!(0.01)).is_ok());
        assert!(validate_positive_amount(&Decimal::ZERO).is_err());
        assert!(validate_non_negative_amount(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative_amount(&dec!(-1)).is_err());
    }

    #[test]
    fn test_percent_range() {
        assert!(validate_percent(&dec!(5)).is_ok());
        assert!(validate_percent(&dec!(100)).is_ok());
        assert!(validate_percent(&Decimal::ZERO).is_err());
        assert!(validate_percent(&dec!(100.01)).is_err());
    }
}
