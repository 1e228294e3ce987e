//! Chilean peso amounts.
//!
//! Prices are carried as [`Decimal`] everywhere (JSON encodes them as
//! strings). Pesos have no minor unit, so display and payment-gateway amounts
//! are rounded to whole pesos.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round to whole pesos, half away from zero.
#[must_use]
pub fn round_clp(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Whole-peso amount as an integer, as Webpay expects it.
///
/// Returns `None` for negative amounts or amounts that do not fit in `u64`.
#[must_use]
pub fn clp_units(amount: Decimal) -> Option<u64> {
    let rounded = round_clp(amount);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        return None;
    }
    rounded.to_u64()
}

/// Format an amount the way Chilean storefronts print it: `$12.990`.
#[must_use]
pub fn format_clp(amount: Decimal) -> String {
    let rounded = round_clp(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_groups_thousands() {
        assert_eq!(format_clp(Decimal::new(0, 0)), "$0");
        assert_eq!(format_clp(Decimal::new(990, 0)), "$990");
        assert_eq!(format_clp(Decimal::new(12_990, 0)), "$12.990");
        assert_eq!(format_clp(Decimal::new(1_234_567, 0)), "$1.234.567");
    }

    #[test]
    fn test_format_rounds_to_whole_pesos() {
        assert_eq!(format_clp(Decimal::new(99_950, 1)), "$9.995");
        assert_eq!(format_clp(Decimal::new(-15_005, 1)), "-$1.501");
    }

    #[test]
    fn test_clp_units() {
        assert_eq!(clp_units(Decimal::new(15_990, 0)), Some(15_990));
        assert_eq!(clp_units(Decimal::new(45, 1)), Some(5));
        assert_eq!(clp_units(Decimal::new(-1, 0)), None);
    }
}
