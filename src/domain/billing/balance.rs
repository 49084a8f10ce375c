//! Balance and proration arithmetic.
//!
//! Pure functions over cents; the ledger handler applies them to users and
//! subscriptions.

/// New balance after charging `price`. Never negative.
pub fn apply_to_balance(balance: i64, price: i64) -> i64 {
    balance.saturating_sub(price).max(0)
}

/// Credit for the unused part of a billing period, rounded down.
///
/// `remaining_secs` is clamped into the period so the credit never exceeds
/// `summary`.
pub fn prorated_credit(summary: i64, period_secs: i64, remaining_secs: i64) -> i64 {
    if summary <= 0 || period_secs <= 0 {
        return 0;
    }
    let remaining = remaining_secs.clamp(0, period_secs);
    (summary as i128 * remaining as i128 / period_secs as i128) as i64
}
