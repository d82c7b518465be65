//! Donation progress.

use shared_types::Amount;

/// `min(round(raised * 100 / needed), 100)`, or 0 when nothing is needed.
///
/// Rounds half up, in integer arithmetic so large totals stay exact.
#[must_use]
pub fn donation_progress(total_raised: Amount, total_needed: Amount) -> u8 {
    if total_needed == 0 {
        return 0;
    }
    let raised = u128::from(total_raised);
    let needed = u128::from(total_needed);
    let percent = (raised * 200 + needed) / (needed * 2);
    // Bounded by 100 before the cast.
    percent.min(100) as u8
}
