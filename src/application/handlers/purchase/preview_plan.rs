//! PreviewPlanHandler - Query handler showing what a purchase would bill.

use std::sync::Arc;

use crate::domain::billing::{Host, Plan, PurchaseAttempt, PurchaseError};
use crate::domain::foundation::UserId;
use crate::ports::{PackageDirectory, SubscriptionRepository, UserRepository};

use super::prepare::prepare_attempt;

/// Query for the plan a buyer would get.
#[derive(Debug, Clone)]
pub struct PreviewPlanQuery {
    pub plan: Plan,
    pub host: Host,
    pub user_id: Option<UserId>,
}

/// Handler for plan previews.
///
/// Resolves trial eligibility and the host's purchase without buying. A
/// running subscription on the same billing frequency wins over the
/// requested plan, since buying would only extend it.
pub struct PreviewPlanHandler {
    packages: Arc<dyn PackageDirectory>,
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl PreviewPlanHandler {
    pub fn new(
        packages: Arc<dyn PackageDirectory>,
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            packages,
            users,
            subscriptions,
        }
    }

    pub async fn handle(&self, query: PreviewPlanQuery) -> Result<Plan, PurchaseError> {
        let package = self
            .packages
            .find(&query.plan.package_id)
            .await?
            .ok_or_else(|| PurchaseError::package_not_found(query.plan.package_id.clone()))?;

        let user = match &query.user_id {
            Some(id) => self.users.find(id).await?,
            None => None,
        };

        let mut attempt = PurchaseAttempt::new(query.plan, query.host, user, None);
        let active = prepare_attempt(
            &mut attempt,
            package.as_ref(),
            self.subscriptions.as_ref(),
            false,
        )
        .await?;

        match active {
            Some(subscription) if subscription.billing_frequency == attempt.plan.billing_frequency => {
                Ok(subscription.plan)
            }
            _ => Ok(attempt.plan),
        }
    }
}
