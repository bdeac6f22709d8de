//! Money helpers: full-precision decimal sums, two-decimal presentation.
//!
//! Intermediate sums stay at full precision; rounding happens exactly once,
//! when a value is written as a transaction total or emitted in a report.

use crate::core::error::{GranaryError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Round half-up to exactly two fraction digits.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Authoritative line total for a transaction: `round2(quantity x unit_price)`.
/// Client-supplied totals are never trusted.
pub fn line_total(quantity: i64, unit_price: Decimal) -> Decimal {
    round2(Decimal::from(quantity) * unit_price)
}

/// Parse a decimal column written by granary itself.
pub fn decimal_from_db(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| GranaryError::Validation(format!("corrupt decimal column '{}': {}", raw, e)))
}

/// Round a percentage to one fraction digit for report output.
pub fn round_rate(rate: f64) -> f64 {
    (rate * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(dec("2.005")).to_string(), "2.01");
        assert_eq!(round2(dec("2.004")).to_string(), "2.00");
    }

    #[test]
    fn test_round2_pads_to_two_digits() {
        assert_eq!(round2(dec("60")).to_string(), "60.00");
        assert_eq!(round2(dec("1.5")).to_string(), "1.50");
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(50, dec("1.50")).to_string(), "75.00");
        assert_eq!(line_total(120, dec("3.00")).to_string(), "360.00");
        assert_eq!(line_total(3, dec("0.335")).to_string(), "1.01");
    }

    #[test]
    fn test_decimal_from_db_rejects_garbage() {
        assert!(decimal_from_db("not-a-number").is_err());
        assert_eq!(decimal_from_db("12.34").unwrap(), dec("12.34"));
    }

    #[test]
    fn test_round_rate() {
        assert_eq!(round_rate(200.0 / 3.0), 66.7);
        assert_eq!(round_rate(0.0), 0.0);
    }
}
