//! Fixed-point ratios and token unit conversion.
//!
//! Ratios are stored on chain as integers where `10^precision` means 100%.
//! The plugin contracts use a precision of 6.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{CoreError, CoreResult};
use crate::uint::{U256, U512};

/// Number of decimal digits used by on-chain ratios
pub const RATIO_PRECISION: u32 = 6;

/// On-chain value that represents 100%
pub const RATIO_BASE: u64 = 1_000_000;

/// Largest precision a ratio can carry
pub const MAX_RATIO_PRECISION: u32 = 18;

/// Largest scale a `Decimal` can hold
const MAX_DECIMAL_SCALE: u32 = 28;

/// Largest mantissa a `Decimal` can hold (2^96 - 1)
const MAX_DECIMAL_MANTISSA: u128 = 79_228_162_514_264_337_593_543_950_335;

fn check_precision(precision_digits: u32) -> CoreResult<()> {
    if precision_digits > MAX_RATIO_PRECISION {
        return Err(CoreError::InvalidRatio(format!(
            "precision {} exceeds {}",
            precision_digits, MAX_RATIO_PRECISION
        )));
    }
    Ok(())
}

/// Check that a fraction lies in `[0, 1]`
pub fn validate_fraction(fraction: Decimal) -> CoreResult<()> {
    if (fraction.is_sign_negative() && !fraction.is_zero()) || fraction > Decimal::ONE {
        return Err(CoreError::InvalidRatio(format!("{} is outside [0, 1]", fraction)));
    }
    Ok(())
}

/// Encode a fraction in `[0, 1]` as an integer of `precision_digits` digits.
///
/// Values finer than the precision are rounded half away from zero.
pub fn ratio_encode(fraction: Decimal, precision_digits: u32) -> CoreResult<u64> {
    check_precision(precision_digits)?;
    validate_fraction(fraction)?;

    let base = Decimal::from(10u64.pow(precision_digits));
    (fraction * base)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or_else(|| CoreError::InvalidRatio(fraction.to_string()))
}

/// Decode an integer of `precision_digits` digits back into a fraction
pub fn ratio_decode(value: u64, precision_digits: u32) -> CoreResult<Decimal> {
    check_precision(precision_digits)?;

    let base = 10u64.pow(precision_digits);
    if value > base {
        return Err(CoreError::InvalidRatio(format!(
            "{} exceeds the ratio base {}",
            value, base
        )));
    }
    Ok(Decimal::from_i128_with_scale(value as i128, precision_digits).normalize())
}

/// Rounding applied when a scaled integer has more digits than a `Decimal` holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Drop excess digits
    Down,
    /// Round away from zero whenever a non-zero digit is dropped
    Up,
}

/// Convert `value / 10^scale` into a `Decimal`.
///
/// Least significant digits are dropped while the value exceeds the 96-bit
/// mantissa or the scale exceeds 28. A value too large even at scale 0
/// saturates at `Decimal::MAX`.
pub fn scaled_to_decimal(value: U512, scale: u32, rounding: Rounding) -> Decimal {
    let ten = U512::from(10u64);
    let max_mantissa = U512::from(MAX_DECIMAL_MANTISSA);

    let mut mantissa = value;
    let mut scale = scale;
    let mut dropped = false;

    while scale > MAX_DECIMAL_SCALE || mantissa > max_mantissa {
        if scale == 0 {
            return Decimal::MAX;
        }
        dropped |= !(mantissa % ten).is_zero();
        mantissa = mantissa / ten;
        scale -= 1;
    }

    if dropped && rounding == Rounding::Up {
        mantissa = mantissa + U512::one();
        if mantissa > max_mantissa {
            if scale == 0 {
                return Decimal::MAX;
            }
            mantissa = (mantissa + U512::from(9u64)) / ten;
            scale -= 1;
        }
    }

    let low = (mantissa.0[1] as u128) << 64 | mantissa.0[0] as u128;
    Decimal::from_i128_with_scale(low as i128, scale)
}

/// Split a fraction in `[0, 1]` into an exact integer mantissa and its scale,
/// so that `fraction == mantissa / 10^scale`
pub fn fraction_to_scaled(fraction: Decimal) -> CoreResult<(U512, u32)> {
    validate_fraction(fraction)?;
    let mantissa = fraction.mantissa().unsigned_abs();
    let limbs = [mantissa as u64, (mantissa >> 64) as u64, 0, 0, 0, 0, 0, 0];
    Ok((U512(limbs), fraction.scale()))
}

/// Express a raw token amount in whole units, like `formatUnits`
pub fn format_units(amount: U256, decimals: u32) -> Decimal {
    scaled_to_decimal(U512::from(amount), decimals, Rounding::Down).normalize()
}
