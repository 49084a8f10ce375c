//! Subscription status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Billing recurs at `next_billing_at`.
    Active,

    /// Replaced by another subscription or dropped with its package.
    Cancelled,

    /// The purchase moved to a non-recurring plan.
    Completed,
}

impl SubscriptionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Active, Active) // Renewal
                | (Active, Cancelled)
                | (Active, Completed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Active => vec![Active, Cancelled, Completed],
            Cancelled | Completed => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_can_renew_cancel_or_complete() {
        let s = SubscriptionStatus::Active;
        assert!(s.can_transition_to(&SubscriptionStatus::Active));
        assert!(s.can_transition_to(&SubscriptionStatus::Cancelled));
        assert!(s.can_transition_to(&SubscriptionStatus::Completed));
    }

    #[test]
    fn ended_states_are_terminal() {
        assert!(SubscriptionStatus::Cancelled.is_terminal());
        assert!(SubscriptionStatus::Completed.is_terminal());
        assert!(SubscriptionStatus::Cancelled
            .transition_to(SubscriptionStatus::Active)
            .is_err());
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&SubscriptionStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
