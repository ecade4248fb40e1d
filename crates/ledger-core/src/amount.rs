//! Decimal helpers. Arithmetic and storage are exact; truncation happens
//! only when rendering for humans.

use crate::error::{LedgerError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimal places shown to users
pub const DISPLAY_DECIMALS: u32 = 6;

/// Currency symbol appended to displayed amounts
pub const SYMBOL: &str = "BNB";

/// Truncate (never round up) to display precision and drop trailing zeros.
pub fn truncate_for_display(amount: Decimal) -> Decimal {
    amount
        .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::ToZero)
        .normalize()
}

/// Render an amount as e.g. `0.001 BNB`
pub fn format_bnb(amount: Decimal) -> String {
    format!("{} {}", truncate_for_display(amount), SYMBOL)
}

/// Parse exact decimal text as stored in the ledger
pub fn parse_amount(text: &str) -> Result<Decimal> {
    Decimal::from_str(text.trim())
        .map_err(|e| LedgerError::Storage(format!("invalid decimal '{}': {}", text, e)))
}

/// Parse a configured amount, which must be non-negative
pub fn parse_config_amount(key: &str, text: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(text.trim())
        .map_err(|e| LedgerError::InvalidConfig(format!("{}: {}", key, e)))?;
    if amount.is_sign_negative() {
        return Err(LedgerError::InvalidConfig(format!(
            "{} must not be negative",
            key
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_truncates_instead_of_rounding() {
        let amount = parse_amount("0.0019999999").unwrap();
        assert_eq!(format_bnb(amount), "0.001999 BNB");
    }

    #[test]
    fn test_display_drops_trailing_zeros() {
        assert_eq!(format_bnb(parse_amount("0.500000").unwrap()), "0.5 BNB");
        assert_eq!(format_bnb(Decimal::ZERO), "0 BNB");
        assert_eq!(format_bnb(parse_amount("12").unwrap()), "12 BNB");
    }

    #[test]
    fn test_repeated_small_credits_do_not_drift() {
        let step = parse_amount("0.001").unwrap();
        let total = (0..1000).fold(Decimal::ZERO, |acc, _| acc + step);
        assert_eq!(total, Decimal::ONE);
    }

    #[test]
    fn test_config_amount_rejects_negative_and_garbage() {
        assert!(parse_config_amount("MIN_WITHDRAW", "-0.5").is_err());
        assert!(parse_config_amount("MIN_WITHDRAW", "half").is_err());
        assert_eq!(
            parse_config_amount("MIN_WITHDRAW", " 0.5 ").unwrap(),
            parse_amount("0.5").unwrap()
        );
    }
}
