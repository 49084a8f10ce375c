//! Plan preparation shared by purchases and previews.

use tracing::debug;

use crate::domain::billing::{calculate_trial, PurchaseAttempt, Subscription};
use crate::domain::foundation::DomainError;
use crate::ports::{Package, SubscriptionRepository};

/// Validates the host, finalizes the trial and resolves the host's purchase.
///
/// Returns the purchase's active subscription. When preparing for purchase
/// the subscription being replaced by this package is captured on the
/// attempt for proration.
pub(crate) async fn prepare_attempt(
    attempt: &mut PurchaseAttempt,
    package: &dyn Package,
    subscriptions: &dyn SubscriptionRepository,
    for_purchase: bool,
) -> Result<Option<Subscription>, DomainError> {
    // 1. The package may substitute the host
    if let Some(host) = package
        .validate(&attempt.host, attempt.user.as_ref(), for_purchase)
        .await?
    {
        debug!(from = %attempt.host.id, to = %host.id, "Host substituted by package");
        attempt.host = host;
    }

    // 2. Package-specific preparation
    package.prepare(&attempt.host, &attempt.plan).await?;

    // 3. Trial
    let consumed = package.trial_consumed(&attempt.host).await?;
    calculate_trial(&mut attempt.plan, consumed);

    // 4. Purchase and its active subscription
    let purchase = package.set_purchase(&attempt.host, for_purchase).await?;
    let active = subscriptions.find_active_by_purchase(&purchase.id).await?;

    // 5. Subscription this package replaces
    if for_purchase {
        if let Some(replaced) = package
            .replaced_purchase(&attempt.host, &attempt.plan)
            .await?
            .filter(|p| p.id != purchase.id)
        {
            let previous = subscriptions.find_active_by_purchase(&replaced.id).await?;
            attempt.replace_subscription(previous);
        }
    }

    attempt.purchase = Some(purchase);
    Ok(active)
}
