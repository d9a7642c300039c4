//! Fixed-point rules for rate values.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places every published rate carries.
pub const RATE_SCALE: u32 = 4;

/// Round a rate to [`RATE_SCALE`] places, half away from zero.
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Multiplicative inverse at full precision. `None` for zero.
pub fn inverse(value: Decimal) -> Option<Decimal> {
    if value.is_zero() {
        return None;
    }
    Decimal::ONE.checked_div(value)
}

/// Inverse rounded to [`RATE_SCALE`] places.
pub fn inverse_rate(value: Decimal) -> Option<Decimal> {
    inverse(value).map(round_rate)
}
