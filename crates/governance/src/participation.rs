//! Participation of a proposal's census.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gasless_voting_core::ratio::{fraction_to_scaled, scaled_to_decimal, Rounding};
use gasless_voting_core::{format_units, U256, U512};

use crate::GovernanceResult;

/// Digits kept after the decimal point of a participation percentage
pub const PERCENTAGE_SCALE: u32 = 18;

/// Participation figures, in whole token units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationResult {
    /// Weight that voted
    pub current_participation: Decimal,
    /// Weight that voted, as a percentage of the census
    pub current_percentage: Decimal,
    /// Weight still needed to reach the minimum participation, never negative
    pub missing_participation: Decimal,
    /// Census weight
    pub total_weight: Decimal,
    /// Weight required by the minimum participation ratio
    pub minimum_participation: Decimal,
}

/// Evaluate participation against the minimum participation ratio.
///
/// Intermediate values are exact integers; rounding only happens when a
/// figure is converted to a `Decimal`. The missing participation rounds up
/// so that a remainder too small to display is still reported as missing.
pub fn evaluate_participation(
    min_participation: Decimal,
    used_weight: U256,
    total_weight: U256,
    token_decimals: u32,
) -> GovernanceResult<ParticipationResult> {
    let (ratio, ratio_scale) = fraction_to_scaled(min_participation)?;
    let used = U512::from(used_weight);
    let total = U512::from(total_weight);

    let current_percentage = if total.is_zero() {
        Decimal::ZERO
    } else {
        let scaled = used * U512::from(100u64) * U512::exp10(PERCENTAGE_SCALE as usize) / total;
        scaled_to_decimal(scaled, PERCENTAGE_SCALE, Rounding::Down).normalize()
    };

    // Both sides expressed at `token_decimals + ratio_scale`
    let scale = token_decimals + ratio_scale;
    let required = total * ratio;
    let reached = used * U512::exp10(ratio_scale as usize);
    let missing_participation = if reached >= required {
        Decimal::ZERO
    } else {
        scaled_to_decimal(required - reached, scale, Rounding::Up).normalize()
    };

    Ok(ParticipationResult {
        current_participation: format_units(used_weight, token_decimals),
        current_percentage,
        missing_participation,
        total_weight: format_units(total_weight, token_decimals),
        minimum_participation: scaled_to_decimal(required, scale, Rounding::Up).normalize(),
    })
}
