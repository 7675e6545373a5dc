//! Early success test for a proposal's vote.

use rust_decimal::Decimal;
use tracing::warn;

use gasless_voting_core::ratio::fraction_to_scaled;
use gasless_voting_core::{U256, U512};

/// Whether the vote has succeeded regardless of who else may still vote.
///
/// With a support threshold `t`, success needs the minimum participation
/// to be reached and `(1 - t) * yes >= t * no`. The comparison runs on
/// exact integers: for `t = m / 10^s` it checks
/// `(10^s - m) * yes >= m * no`.
///
/// An unknown threshold or missing participation, or zero yes votes, is
/// never a success.
pub fn has_succeeded(
    yes: U256,
    no: U256,
    support_threshold: Option<Decimal>,
    missing_participation: Option<Decimal>,
) -> bool {
    let (Some(threshold), Some(missing)) = (support_threshold, missing_participation) else {
        return false;
    };
    if yes.is_zero() || !missing.is_zero() {
        return false;
    }

    let (mantissa, scale) = match fraction_to_scaled(threshold) {
        Ok(parts) => parts,
        Err(e) => {
            warn!("Support threshold rejected: {}", e);
            return false;
        }
    };
    let base = U512::exp10(scale as usize);

    (base - mantissa) * U512::from(yes) >= mantissa * U512::from(no)
}
