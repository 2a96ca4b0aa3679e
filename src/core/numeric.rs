//! Fixed-scale decimal helpers used by every money computation.
//!
//! Amounts are [`Decimal`] throughout. Multiplication and addition are exact
//! and checked: an overflow surfaces as [`EngineError::InvalidInput`] instead
//! of a panic. Division is rounded to the internal scale. Rounding to the
//! currency scale happens only when a result is assembled.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::error::EngineError;

/// Decimal places kept for intermediate division results.
pub const INTERNAL_SCALE: u32 = 4;

/// Decimal places of currency amounts in results.
pub const CURRENCY_SCALE: u32 = 2;

pub const HUNDRED: Decimal = dec!(100);

/// Round a Decimal to `dp` decimal places using half-up (commercial rounding).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to [`CURRENCY_SCALE`].
pub fn round_currency(value: Decimal) -> Decimal {
    round_half_up(value, CURRENCY_SCALE)
}

/// Round half-up to `dp` places and pad to exactly `dp` places, so `45`
/// becomes `45.00`.
pub fn round_to_scale(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = round_half_up(value, dp);
    rounded.rescale(dp);
    rounded
}

/// `a + b`, or an error if the sum does not fit a [`Decimal`].
pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_add(b)
        .ok_or_else(|| EngineError::InvalidInput(format!("{a} + {b} overflows")))
}

/// `a - b`, or an error if the difference does not fit a [`Decimal`].
pub fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_sub(b)
        .ok_or_else(|| EngineError::InvalidInput(format!("{a} - {b} overflows")))
}

/// `a * b`, or an error if the product does not fit a [`Decimal`].
pub fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_mul(b)
        .ok_or_else(|| EngineError::InvalidInput(format!("{a} * {b} overflows")))
}

/// `value * pct / 100`, exact.
pub fn percent_of(value: Decimal, pct: Decimal) -> Result<Decimal, EngineError> {
    div_exact(checked_mul(value, pct)?, HUNDRED)
}

/// `value + value * pct / 100`.
pub fn add_percent(value: Decimal, pct: Decimal) -> Result<Decimal, EngineError> {
    checked_add(value, percent_of(value, pct)?)
}

/// `value - value * pct / 100`, floored at zero.
pub fn sub_percent(value: Decimal, pct: Decimal) -> Result<Decimal, EngineError> {
    Ok(floor_zero(checked_sub(value, percent_of(value, pct)?)?))
}

/// Clamp negative amounts to zero.
pub fn floor_zero(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Divide without rounding the quotient.
pub fn div_exact(numerator: Decimal, denominator: Decimal) -> Result<Decimal, EngineError> {
    numerator.checked_div(denominator).ok_or_else(|| {
        EngineError::InvalidInput(format!("cannot divide {numerator} by {denominator}"))
    })
}

/// Divide and round the quotient to `scale` places.
pub fn div_scaled(
    numerator: Decimal,
    denominator: Decimal,
    scale: u32,
) -> Result<Decimal, EngineError> {
    Ok(round_half_up(div_exact(numerator, denominator)?, scale))
}

/// Divide and round to [`INTERNAL_SCALE`].
pub fn div_internal(numerator: Decimal, denominator: Decimal) -> Result<Decimal, EngineError> {
    div_scaled(numerator, denominator, INTERNAL_SCALE)
}

/// Whether a percentage lies in `[0, 100]`.
pub fn is_valid_percentage(pct: Decimal) -> bool {
    pct >= Decimal::ZERO && pct <= HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_up_rounding() {
        assert_eq!(round_half_up(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_half_up(dec!(2.344), 2), dec!(2.34));
        assert_eq!(round_half_up(dec!(-2.345), 2), dec!(-2.35));
        assert_eq!(round_currency(dec!(0.005)), dec!(0.01));
    }

    #[test]
    fn rounded_amounts_carry_the_scale() {
        assert_eq!(round_to_scale(dec!(45), 2).to_string(), "45.00");
        assert_eq!(round_to_scale(dec!(18.59625), 2).to_string(), "18.60");
        assert_eq!(round_to_scale(dec!(12.825), 2).to_string(), "12.83");
    }

    #[test]
    fn no_float_drift() {
        assert_eq!(dec!(0.1) + dec!(0.2), dec!(0.3));
        assert_eq!(percent_of(dec!(19.99), dec!(19)).unwrap(), dec!(3.7981));
    }

    #[test]
    fn percent_helpers() {
        assert_eq!(add_percent(dec!(100), dec!(10)).unwrap(), dec!(110));
        assert_eq!(sub_percent(dec!(100), dec!(25)).unwrap(), dec!(75));
        assert_eq!(sub_percent(dec!(100), dec!(150)).unwrap(), dec!(0));
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        assert!(matches!(
            add_percent(Decimal::MAX, dec!(100)),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(checked_add(Decimal::MAX, Decimal::ONE).is_err());
        assert!(checked_mul(Decimal::MAX, dec!(2)).is_err());
        assert_eq!(checked_mul(dec!(1.5), dec!(2)).unwrap(), dec!(3.0));
    }

    #[test]
    fn division_keeps_internal_scale() {
        assert_eq!(div_internal(dec!(10), dec!(3)).unwrap(), dec!(3.3333));
        assert_eq!(div_internal(dec!(110), dec!(1.1)).unwrap(), dec!(100));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(matches!(
            div_internal(dec!(1), Decimal::ZERO),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn percentage_range() {
        assert!(is_valid_percentage(dec!(0)));
        assert!(is_valid_percentage(dec!(100)));
        assert!(!is_valid_percentage(dec!(100.01)));
        assert!(!is_valid_percentage(dec!(-1)));
    }
}
