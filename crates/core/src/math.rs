//! Decimal helpers for priced-value arithmetic.
//!
//! All dollar-denominated sums run on arbitrary-precision decimals with a
//! fixed working precision, so health factors and discounts are exact up to
//! that precision regardless of token decimal ranges (6 to 24 on this
//! ledger).

use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::{ToPrimitive, Zero};
use std::str::FromStr;

/// Working precision (significant digits) for priced-value divisions.
pub const WORKING_PRECISION: u64 = 27;

/// Ratio fields are encoded in basis points on-chain.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Decode a basis-points ratio field (e.g. 9500 -> 0.95).
pub fn ratio_from_bps(bps: u32) -> BigDecimal {
    BigDecimal::from(bps) / BigDecimal::from(BPS_DENOMINATOR)
}

/// 10^exp as a decimal.
pub fn pow10(exp: u32) -> BigDecimal {
    BigDecimal::new(1.into(), -(exp as i64))
}

/// Division at the fixed working precision.
pub fn div(a: &BigDecimal, b: &BigDecimal) -> BigDecimal {
    (a / b).with_prec(WORKING_PRECISION)
}

/// Smaller of two decimals.
pub fn min(a: BigDecimal, b: BigDecimal) -> BigDecimal {
    if a < b {
        a
    } else {
        b
    }
}

/// Floor a non-negative decimal to integer token units.
pub fn floor_to_u128(value: &BigDecimal) -> u128 {
    value
        .with_scale_round(0, RoundingMode::Floor)
        .to_u128()
        .unwrap_or(0)
}

/// Round half-up to an integer value.
pub fn round_half_up(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(0, RoundingMode::HalfUp)
}

/// Parse a decimal integer string (the ledger's stringified u128 amounts).
pub fn parse_amount(s: &str) -> Option<u128> {
    s.parse::<u128>().ok()
}

/// Parse a decimal string into a BigDecimal.
pub fn parse_decimal(s: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(s).ok()
}

/// Convert an f64 configuration value into a decimal.
///
/// Goes through the shortest decimal rendering so `0.995` stays exactly
/// `0.995` rather than the nearest binary fraction. Non-finite inputs
/// collapse to zero.
pub fn from_f64(value: f64) -> BigDecimal {
    if !value.is_finite() {
        return BigDecimal::zero();
    }
    BigDecimal::from_str(&value.to_string()).unwrap_or_else(|_| BigDecimal::zero())
}

/// Apply a basis-points shave: `value * (10000 - bps) / 10000`, floored to
/// integer units.
pub fn shave_bps(value: &BigDecimal, bps: u32) -> BigDecimal {
    let kept = BigDecimal::from(BPS_DENOMINATOR - bps);
    (value * kept / BigDecimal::from(BPS_DENOMINATOR)).with_scale_round(0, RoundingMode::Floor)
}
