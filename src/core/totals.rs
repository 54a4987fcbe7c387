//! Amount arithmetic shared by builders, rules, QR and hashing.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a Decimal to `dp` decimal places using half-up (commercial rounding).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// `|a - b| <= tolerance`. A difference too large to represent is never
/// within tolerance.
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    a.checked_sub(b).is_some_and(|diff| diff.abs() <= tolerance)
}

/// Sum of amounts, `None` if any amount is `None` or the sum overflows.
pub fn checked_sum(mut amounts: impl Iterator<Item = Option<Decimal>>) -> Option<Decimal> {
    amounts.try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount?))
}

/// Format an amount with at least 2 decimal places, trailing zeros beyond
/// that stripped. Used for XML output, QR payloads and the canonical hash
/// input, so `6900`, `6900.0` and `6900.000` all render as `6900.00`.
pub fn format_amount(d: Decimal) -> String {
    let s = d.normalize().to_string();
    if let Some(dot_pos) = s.find('.') {
        let decimals = s.len() - dot_pos - 1;
        if decimals < 2 {
            format!("{s}{}", "0".repeat(2 - decimals))
        } else {
            s
        }
    } else {
        format!("{s}.00")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn format_amount_cases() {
        assert_eq!(format_amount(dec!(100)), "100.00");
        assert_eq!(format_amount(dec!(1500.0)), "1500.00");
        assert_eq!(format_amount(dec!(49.90)), "49.90");
        assert_eq!(format_amount(dec!(0.005)), "0.005");
        assert_eq!(format_amount(dec!(6900.000)), "6900.00");
    }

    #[test]
    fn tolerance_is_inclusive() {
        assert!(within_tolerance(dec!(10.00), dec!(10.01), dec!(0.01)));
        assert!(!within_tolerance(dec!(10.00), dec!(10.02), dec!(0.01)));
    }

    #[test]
    fn extreme_amounts_do_not_panic() {
        assert!(!within_tolerance(Decimal::MAX, Decimal::MIN, dec!(0.01)));
        assert_eq!(checked_sum([Some(Decimal::MAX), Some(dec!(1))].into_iter()), None);
        assert_eq!(checked_sum([Some(dec!(1)), None].into_iter()), None);
        assert_eq!(checked_sum([Some(dec!(1)), Some(dec!(2))].into_iter()), Some(dec!(3)));
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_half_up(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_half_up(dec!(-2.345), 2), dec!(-2.35));
    }
}
