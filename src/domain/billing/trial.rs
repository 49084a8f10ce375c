//! Trial eligibility.

use super::Plan;

/// Finalizes the plan's trial for this host.
///
/// Returns whether the attempt runs on a trial. When the host already
/// consumed a trial for the package the plan's trial days are zeroed, so
/// calling this again with the same history yields the same answer.
pub fn calculate_trial(plan: &mut Plan, trial_consumed: bool) -> bool {
    if plan.trial_days == 0 {
        return false;
    }
    if trial_consumed {
        plan.trial_days = 0;
        return false;
    }
    true
}
