//! PurchaseOrchestrator - Command handler for buying a plan for a host.
//!
//! Decides per call whether the plan is sold fresh, renewed, switched to a
//! new billing frequency, or a dormant purchase is reactivated. Bundled
//! plans are bought after the primary plan on a best-effort basis.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::domain::billing::{Host, Invoice, Plan, PurchaseAttempt, PurchaseError, User};
use crate::domain::foundation::{PlanId, UserId};
use crate::ports::{
    Package, PackageDirectory, SubscriptionBilling, SubscriptionRepository, UserRepository,
};

use super::balance_ledger::BalanceLedger;
use super::charge::ChargeExecutor;
use super::dependencies::PurchaseDependencies;
use super::prepare::prepare_attempt;
use super::purchase_locks::PurchaseLocks;
use super::subscription_manager::SubscriptionManager;
use super::transaction_recorder::TransactionRecorder;

/// Command to buy a plan for a host.
#[derive(Debug, Clone)]
pub struct PurchaseCommand {
    pub plan: Plan,
    pub host: Host,
    /// Buyer; without one nothing is sold.
    pub user_id: Option<UserId>,
    /// Coupon code typed by the buyer.
    pub coupon_code: Option<String>,
}

/// Outcome of one bundled plan.
struct BundleOutcome {
    plan_id: PlanId,
    result: Result<Option<Invoice>, PurchaseError>,
}

/// Handler for plan purchases.
///
/// Expects to be the only attempt running for the package and host. Callers
/// that can't guarantee this pass [`PurchaseLocks`] via
/// [`PurchaseOrchestrator::with_locks`].
pub struct PurchaseOrchestrator {
    packages: Arc<dyn PackageDirectory>,
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    billing: Arc<dyn SubscriptionBilling>,
    charger: ChargeExecutor,
    ledger: BalanceLedger,
    manager: SubscriptionManager,
    recorder: TransactionRecorder,
    locks: Option<PurchaseLocks>,
    default_currency: String,
}

impl PurchaseOrchestrator {
    pub fn new(
        deps: PurchaseDependencies,
        billing: Arc<dyn SubscriptionBilling>,
        config: &AppConfig,
    ) -> Self {
        Self {
            charger: ChargeExecutor::new(deps.processor.clone(), config.payment.charge_timeout()),
            ledger: BalanceLedger::new(deps.users.clone(), deps.subscriptions.clone()),
            manager: SubscriptionManager::new(deps.subscriptions.clone()),
            recorder: TransactionRecorder::new(
                deps.transactions.clone(),
                deps.events.clone(),
                &config.billing,
                &config.payment,
            ),
            packages: deps.packages,
            users: deps.users,
            subscriptions: deps.subscriptions,
            billing,
            locks: None,
            default_currency: config.billing.default_currency.clone(),
        }
    }

    /// Serializes attempts per package and host.
    pub fn with_locks(mut self, locks: PurchaseLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Buys `cmd.plan` for `cmd.host`.
    ///
    /// Returns `Ok(None)` when there is no buyer.
    pub async fn handle(&self, cmd: PurchaseCommand) -> Result<Option<Invoice>, PurchaseError> {
        // 1. Resolve the buyer
        let mut user = match &cmd.user_id {
            Some(id) => Some(self.load_user(id).await?),
            None => None,
        };

        // 2. Resolve the package
        let package = self.find_package(&cmd.plan).await?;

        // 3. Lock the host the package will provision on
        let mut host = cmd.host;
        let _guard = match &self.locks {
            Some(locks) => {
                if !cmd.plan.in_renew_mode {
                    if let Some(resolved) = package.validate(&host, user.as_ref(), true).await? {
                        host = resolved;
                    }
                }
                let guard = locks.acquire(&cmd.plan.package_id, &host.id).await;
                // Balance and coupons may have moved while waiting
                if let Some(id) = &cmd.user_id {
                    user = Some(self.load_user(id).await?);
                }
                Some(guard)
            }
            None => None,
        };

        // 4. Purchase
        let attempt = PurchaseAttempt::new(cmd.plan, host, user, cmd.coupon_code);
        self.purchase(attempt, package).await
    }

    async fn load_user(&self, id: &UserId) -> Result<User, PurchaseError> {
        self.users
            .find(id)
            .await?
            .ok_or_else(|| PurchaseError::user_not_found(id.clone()))
    }

    async fn find_package(&self, plan: &Plan) -> Result<Arc<dyn Package>, PurchaseError> {
        self.packages
            .find(&plan.package_id)
            .await?
            .ok_or_else(|| PurchaseError::package_not_found(plan.package_id.clone()))
    }

    fn purchase(
        &self,
        mut attempt: PurchaseAttempt,
        package: Arc<dyn Package>,
    ) -> BoxFuture<'_, Result<Option<Invoice>, PurchaseError>> {
        async move {
            let package_id = attempt.plan.package_id.clone();

            // Renewal of an existing purchase skips every other branch
            if attempt.plan.in_renew_mode {
                info!(package_id = %package_id, host_id = %attempt.host.id, "Purchasing in renew mode");
                return self.make_purchase(&mut attempt, package.as_ref()).await;
            }

            let active = prepare_attempt(
                &mut attempt,
                package.as_ref(),
                self.subscriptions.as_ref(),
                true,
            )
            .await?;

            match active {
                Some(subscription) if attempt.plan.is_recurring => {
                    if package.is_in_use(&attempt.host).await? {
                        if subscription.billing_frequency == attempt.plan.billing_frequency {
                            info!(subscription_id = %subscription.id, "Renewing subscription");
                            return self.billing.renew(&subscription).await.map(Some);
                        }
                        info!(
                            subscription_id = %subscription.id,
                            from = %subscription.billing_frequency,
                            to = %attempt.plan.billing_frequency,
                            "Switching billing frequency"
                        );
                        return self
                            .billing
                            .switch_frequency(&subscription, &attempt.plan)
                            .await
                            .map(Some);
                    }
                    if !subscription.on_trial(attempt.started_at) {
                        return self
                            .use_existing_purchase(&mut attempt, package.as_ref())
                            .await
                            .map(Some);
                    }
                }
                Some(_) => {}
                None => {
                    if attempt.purchase.as_ref().is_some_and(|p| p.active) {
                        return self
                            .use_existing_purchase(&mut attempt, package.as_ref())
                            .await
                            .map(Some);
                    }
                }
            }

            let Some(mut invoice) = self.make_purchase(&mut attempt, package.as_ref()).await?
            else {
                return Ok(None);
            };

            for outcome in self.purchase_additional_plans(&attempt).await {
                match outcome.result {
                    Ok(Some(additional)) => invoice.additional_invoices.push(additional),
                    Ok(None) => {}
                    Err(e) => debug!(plan_id = %outcome.plan_id, error = %e, "Bundled plan skipped"),
                }
            }
            Ok(Some(invoice))
        }
        .boxed()
    }

    /// Charges the buyer and settles the attempt.
    async fn make_purchase(
        &self,
        attempt: &mut PurchaseAttempt,
        package: &dyn Package,
    ) -> Result<Option<Invoice>, PurchaseError> {
        let Some(user) = attempt.user.as_ref() else {
            info!(package_id = %attempt.plan.package_id, "No buyer, nothing purchased");
            return Ok(None);
        };

        if attempt.purchase.is_none() {
            attempt.purchase = package.current_purchase(&attempt.host).await?;
        }

        let amount = attempt.charge_amount();
        let currency = attempt.currency_or(&self.default_currency).to_string();
        attempt.payment = self
            .charger
            .charge(user, amount, &currency, package.descriptor())
            .await;

        self.process_purchase(attempt, package).await.map(Some)
    }

    async fn process_purchase(
        &self,
        attempt: &mut PurchaseAttempt,
        package: &dyn Package,
    ) -> Result<Invoice, PurchaseError> {
        // 1. Balance, whatever the payment outcome
        self.ledger.refund_to_user_balance(attempt).await?;

        // 2. Activate and consume one-shot coupons
        if attempt.payment_cleared() {
            let purchase = package.activate(&attempt.host, &attempt.plan).await?;
            info!(
                purchase_id = %purchase.id,
                plan_id = %attempt.plan.id,
                host_id = %attempt.host.id,
                "Package activated"
            );
            attempt.purchase = Some(purchase);

            let discounts = attempt.discounts().to_vec();
            if let Some(user) = attempt.user.as_mut() {
                user.remove_coupons(&discounts);
            }
        }

        // 3. Grant addon coupons
        if attempt.payment_succeeded() {
            let codes = attempt.plan.addon_coupons.clone();
            let plan_id = attempt.plan.id.clone();
            let host_id = attempt.host.id.clone();
            if let Some(user) = attempt.user.as_mut() {
                user.add_coupons(codes, Some(&plan_id), Some(&host_id));
            }
        }

        if attempt.payment_cleared() {
            if let Some(user) = attempt.user.as_ref() {
                self.users.save(user).await?;
            }
        }

        // 4. Subscription
        self.manager.process_subscription(attempt).await?;

        // 5. Transaction
        self.recorder.create_transaction(attempt, package).await
    }

    /// Reactivates the host's dormant purchase without charging.
    async fn use_existing_purchase(
        &self,
        attempt: &mut PurchaseAttempt,
        package: &dyn Package,
    ) -> Result<Invoice, PurchaseError> {
        attempt.reused_existing = true;

        let purchase = package.activate(&attempt.host, &attempt.plan).await?;
        info!(purchase_id = %purchase.id, host_id = %attempt.host.id, "Reactivated existing purchase");

        self.ledger.release_previous_subscription(attempt).await?;

        let transaction = self.recorder.latest_successful(&purchase.id).await?;
        attempt.purchase = Some(purchase);
        Ok(Invoice::for_attempt(attempt, transaction))
    }

    /// Buys each bundled plan for the same host and buyer, in order.
    async fn purchase_additional_plans(&self, attempt: &PurchaseAttempt) -> Vec<BundleOutcome> {
        let mut outcomes = Vec::with_capacity(attempt.plan.additional_plans.len());
        for plan in &attempt.plan.additional_plans {
            let plan_id = plan.id.clone();
            let result = match self.find_package(plan).await {
                Ok(package) => {
                    let bundled = PurchaseAttempt::new(
                        plan.clone(),
                        attempt.host.clone(),
                        attempt.user.clone(),
                        attempt.coupon_code.clone(),
                    );
                    self.purchase(bundled, package).await
                }
                Err(e) => Err(e),
            };
            outcomes.push(BundleOutcome { plan_id, result });
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryEventBus, InMemoryPackage, InMemoryPackageDirectory,
        InMemorySubscriptionRepository, InMemoryTransactionRepository, InMemoryUserRepository,
        MockPaymentProcessor, ScriptedCharge,
    };
    use crate::domain::billing::{
        BillingFrequency, Coupon, Purchase, RedeemType, Subscription, SubscriptionTerms,
        TransactionStatus, User,
    };
    use crate::domain::foundation::{ErrorCode, HostId, PackageId, Timestamp};
    use crate::ports::TransactionRepository;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock Implementations
    // ════════════════════════════════════════════════════════════════════════════

    #[derive(Debug, Clone, PartialEq)]
    enum BillingCall {
        Renew(Subscription),
        Switch(Subscription, Plan),
    }

    #[derive(Default)]
    struct MockSubscriptionBilling {
        calls: Mutex<Vec<BillingCall>>,
    }

    impl MockSubscriptionBilling {
        fn calls(&self) -> Vec<BillingCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SubscriptionBilling for MockSubscriptionBilling {
        async fn renew(&self, subscription: &Subscription) -> Result<Invoice, PurchaseError> {
            self.calls
                .lock()
                .unwrap()
                .push(BillingCall::Renew(subscription.clone()));
            Ok(Invoice::for_subscription(
                subscription,
                crate::domain::billing::Transaction::empty(),
            ))
        }

        async fn switch_frequency(
            &self,
            subscription: &Subscription,
            plan: &Plan,
        ) -> Result<Invoice, PurchaseError> {
            self.calls
                .lock()
                .unwrap()
                .push(BillingCall::Switch(subscription.clone(), plan.clone()));
            Ok(Invoice::for_subscription(
                subscription,
                crate::domain::billing::Transaction::empty(),
            ))
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Fixture
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        orchestrator: PurchaseOrchestrator,
        package: Arc<InMemoryPackage>,
        users: Arc<InMemoryUserRepository>,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        transactions: Arc<InMemoryTransactionRepository>,
        events: Arc<InMemoryEventBus>,
        processor: MockPaymentProcessor,
        billing: Arc<MockSubscriptionBilling>,
    }

    fn user_id() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn host() -> Host {
        Host::new(HostId::new("site-1").unwrap())
    }

    fn fixture_with(extra: Vec<Arc<InMemoryPackage>>, balance: i64) -> Fixture {
        let package = Arc::new(
            InMemoryPackage::new(PackageId::new("seo").unwrap(), "SEO Tools")
                .with_descriptor("SEO*TOOLS"),
        );
        let mut directory = InMemoryPackageDirectory::new().with(package.clone());
        for p in extra {
            directory = directory.with(p);
        }
        let users = Arc::new(InMemoryUserRepository::with_users([
            User::new(user_id()).with_balance(balance)
        ]));
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let events = Arc::new(InMemoryEventBus::new());
        let processor = MockPaymentProcessor::new();
        let billing = Arc::new(MockSubscriptionBilling::default());

        let deps = PurchaseDependencies {
            packages: Arc::new(directory),
            users: users.clone(),
            subscriptions: subscriptions.clone(),
            transactions: transactions.clone(),
            processor: Arc::new(processor.clone()),
            events: events.clone(),
        };
        Fixture {
            orchestrator: PurchaseOrchestrator::new(deps, billing.clone(), &AppConfig::default()),
            package,
            users,
            subscriptions,
            transactions,
            events,
            processor,
            billing,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(vec![], 0)
    }

    fn plan(id: &str, price: i64, frequency: BillingFrequency) -> Plan {
        Plan::new(
            PlanId::new(id).unwrap(),
            PackageId::new("seo").unwrap(),
            "Pro",
            price,
            frequency,
        )
    }

    fn command(plan: Plan) -> PurchaseCommand {
        PurchaseCommand {
            plan,
            host: host(),
            user_id: Some(user_id()),
            coupon_code: None,
        }
    }

    async fn seed_subscription(f: &Fixture, frequency: BillingFrequency, started: Timestamp) -> Subscription {
        let purchase = f.package.set_purchase(&host(), true).await.unwrap();
        let p = plan("pro", 3_000, frequency);
        let sub = Subscription::start(
            purchase.id,
            user_id(),
            host().id,
            SubscriptionTerms {
                price: 3_000,
                discount: 0,
                summary: 3_000,
                coupons: vec![],
                currency: None,
                plan: p,
            },
            started,
        );
        f.subscriptions.save(&sub).await.unwrap();
        sub
    }

    // ════════════════════════════════════════════════════════════════════════════
    // New purchase
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn new_purchase_charges_activates_and_subscribes() {
        let f = fixture();

        let invoice = f
            .orchestrator
            .handle(command(plan("pro", 3_000, BillingFrequency::Monthly)))
            .await
            .unwrap()
            .unwrap();

        let call = f.processor.last_call().unwrap();
        assert_eq!(call.amount, 3_000);
        assert_eq!(call.currency, "USD");
        assert_eq!(call.descriptor.as_deref(), Some("SEO*TOOLS"));

        assert_eq!(invoice.transaction.status(), TransactionStatus::Success);
        assert_eq!(invoice.transaction.summary(), 3_000);
        assert!(!invoice.reused_existing);

        let purchase = f.package.purchase_for(&host().id).await.unwrap();
        assert!(purchase.active);
        let sub = f
            .subscriptions
            .find_active_by_purchase(&purchase.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invoice.transaction.subscription_id(), Some(sub.id));
    }

    #[tokio::test]
    async fn anonymous_purchase_returns_none() {
        let f = fixture();
        let mut cmd = command(plan("pro", 3_000, BillingFrequency::Monthly));
        cmd.user_id = None;

        let result = f.orchestrator.handle(cmd).await.unwrap();

        assert!(result.is_none());
        assert_eq!(f.processor.charge_count(), 0);
        assert_eq!(f.package.activation_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_user_is_an_error() {
        let f = fixture();
        let mut cmd = command(plan("pro", 3_000, BillingFrequency::Monthly));
        cmd.user_id = Some(UserId::new("ghost").unwrap());

        let err = f.orchestrator.handle(cmd).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn unknown_package_is_an_error() {
        let f = fixture();
        let mut p = plan("pro", 3_000, BillingFrequency::Monthly);
        p.package_id = PackageId::new("missing").unwrap();

        let err = f.orchestrator.handle(command(p)).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::PackageNotFound);
    }

    #[tokio::test]
    async fn trial_skips_processor_and_records_pending() {
        let f = fixture();

        let invoice = f
            .orchestrator
            .handle(command(
                plan("pro", 3_000, BillingFrequency::Monthly).with_trial_days(14),
            ))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(f.processor.charge_count(), 0);
        assert!(invoice.has_trial());
        assert_eq!(invoice.transaction.status(), TransactionStatus::Pending);
        assert_eq!(invoice.transaction.summary(), 0);
        assert_eq!(f.transactions.count().await, 0);
        assert!(f.package.trial_consumed(&host()).await.unwrap());
    }

    #[tokio::test]
    async fn declined_payment_leaves_package_inactive() {
        let f = fixture();
        f.processor
            .push(ScriptedCharge::Decline("Insufficient funds".to_string()));

        let err = f
            .orchestrator
            .handle(command(plan("pro", 3_000, BillingFrequency::Monthly)))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Payment processor: Insufficient funds");
        assert_eq!(f.package.activation_count().await, 0);
        assert!(f.subscriptions.all().await.is_empty());
        let failed = f.transactions.all().await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].status(), TransactionStatus::Failed);
        assert_eq!(failed[0].summary(), 3_000);
        assert!(f.events.has_event("purchase.failed.v1"));
    }

    #[tokio::test]
    async fn coupons_are_consumed_and_granted() {
        let f = fixture();
        let mut holder = User::new(user_id());
        holder.add_coupons(["LOYAL".to_string()], None, None);
        f.users.save(&holder).await.unwrap();

        let p = plan("pro", 3_000, BillingFrequency::OneTime)
            .with_coupon(Coupon::fixed("LOYAL", RedeemType::Internal, 1_000).unwrap())
            .with_addon_coupon("NEXT10");
        f.orchestrator.handle(command(p)).await.unwrap().unwrap();

        assert_eq!(f.processor.last_call().unwrap().amount, 2_000);
        let user = f.users.find(&user_id()).await.unwrap().unwrap();
        assert!(!user.has_coupon("LOYAL"));
        assert!(user.has_coupon("NEXT10"));
        let granted = &user.coupons()[0];
        assert_eq!(granted.plan_id.as_ref().map(|p| p.as_str()), Some("pro"));
        assert_eq!(granted.host_id.as_ref().map(|h| h.as_str()), Some("site-1"));
    }

    #[tokio::test]
    async fn balance_is_debited_before_outcome_is_known() {
        let f = fixture_with(vec![], 1_000);
        f.processor.push(ScriptedCharge::Decline("Declined".to_string()));

        let _ = f
            .orchestrator
            .handle(command(plan("pro", 3_000, BillingFrequency::OneTime)))
            .await;

        assert_eq!(f.processor.last_call().unwrap().amount, 2_000);
        let user = f.users.find(&user_id()).await.unwrap().unwrap();
        assert_eq!(user.balance, 0);
    }

    #[tokio::test]
    async fn balance_pays_before_the_card() {
        let f = fixture_with(vec![], 5_000);

        let invoice = f
            .orchestrator
            .handle(command(plan("pro", 3_000, BillingFrequency::OneTime)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(f.processor.charge_count(), 0);
        assert_eq!(invoice.transaction.summary(), 0);
        assert_eq!(invoice.transaction.discount(), 3_000);
        assert!(f.package.purchase_for(&host().id).await.unwrap().active);
        let user = f.users.find(&user_id()).await.unwrap().unwrap();
        assert_eq!(user.balance, 2_000);
    }

    #[tokio::test]
    async fn partial_balance_lowers_the_charge() {
        let f = fixture_with(vec![], 1_200);

        let invoice = f
            .orchestrator
            .handle(command(plan("pro", 3_000, BillingFrequency::Monthly)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(f.processor.last_call().unwrap().amount, 1_800);
        assert_eq!(invoice.transaction.summary(), 1_800);
        let user = f.users.find(&user_id()).await.unwrap().unwrap();
        assert_eq!(user.balance, 0);

        // Renewals bill the full price again
        let purchase = f.package.purchase_for(&host().id).await.unwrap();
        let sub = f
            .subscriptions
            .find_active_by_purchase(&purchase.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.summary, 3_000);
    }

    #[tokio::test]
    async fn processor_error_is_recorded_as_failed_payment() {
        let f = fixture();
        f.processor.push(ScriptedCharge::Error(crate::ports::PaymentError::network(
            "connection reset",
        )));

        let err = f
            .orchestrator
            .handle(command(plan("pro", 3_000, BillingFrequency::Monthly)))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Payment processor: connection reset");
        assert!(err.transaction_id().is_some());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Existing subscription
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn in_use_same_frequency_delegates_renewal() {
        let f = fixture();
        let sub = seed_subscription(&f, BillingFrequency::Monthly, Timestamp::now()).await;
        f.package.set_in_use(&host().id, true).await;

        f.orchestrator
            .handle(command(plan("pro", 3_000, BillingFrequency::Monthly)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(f.billing.calls(), vec![BillingCall::Renew(sub)]);
        assert_eq!(f.processor.charge_count(), 0);
        assert_eq!(f.transactions.count().await, 0);
    }

    #[tokio::test]
    async fn in_use_new_frequency_delegates_switch() {
        let f = fixture();
        seed_subscription(&f, BillingFrequency::Monthly, Timestamp::now()).await;
        f.package.set_in_use(&host().id, true).await;

        f.orchestrator
            .handle(command(plan("pro-yearly", 30_000, BillingFrequency::Yearly)))
            .await
            .unwrap()
            .unwrap();

        let calls = f.billing.calls();
        assert_eq!(calls.len(), 1);
        assert!(
            matches!(&calls[0], BillingCall::Switch(_, p) if p.billing_frequency == BillingFrequency::Yearly)
        );
    }

    #[tokio::test]
    async fn dormant_subscription_reactivates_without_charge() {
        let f = fixture();
        let sub = seed_subscription(&f, BillingFrequency::Monthly, Timestamp::now()).await;

        // Earlier successful charge on the same purchase
        let mut earlier = crate::domain::billing::Transaction::from_subscription(&sub, None);
        earlier
            .settle(
                &crate::domain::billing::PaymentResult::success(
                    3_000,
                    "tx_earlier",
                    crate::domain::billing::GatewayPayload::Empty,
                ),
                3_000,
            )
            .unwrap();
        f.transactions.save(&earlier).await.unwrap();

        let invoice = f
            .orchestrator
            .handle(command(plan("pro", 3_000, BillingFrequency::Monthly)))
            .await
            .unwrap()
            .unwrap();

        assert!(invoice.reused_existing);
        assert_eq!(invoice.transaction.id(), earlier.id());
        assert_eq!(f.processor.charge_count(), 0);
        assert!(f.billing.calls().is_empty());
        assert!(f.package.is_in_use(&host()).await.unwrap());
    }

    #[tokio::test]
    async fn active_purchase_without_subscription_is_reused() {
        let f = fixture();
        let mut purchase = Purchase::new(PackageId::new("seo").unwrap(), host().id, "SEO Tools");
        purchase.activate(PlanId::new("pro").unwrap(), Timestamp::now());
        f.package.seed_purchase(purchase).await;

        let invoice = f
            .orchestrator
            .handle(command(plan("pro", 3_000, BillingFrequency::OneTime)))
            .await
            .unwrap()
            .unwrap();

        assert!(invoice.reused_existing);
        assert_eq!(invoice.transaction.status(), TransactionStatus::Pending);
        assert_eq!(f.processor.charge_count(), 0);
    }

    #[tokio::test]
    async fn renew_mode_always_charges() {
        let f = fixture();
        seed_subscription(&f, BillingFrequency::Monthly, Timestamp::now()).await;
        f.package.set_in_use(&host().id, true).await;

        f.orchestrator
            .handle(command(
                plan("pro", 3_000, BillingFrequency::Monthly).for_renewal(),
            ))
            .await
            .unwrap()
            .unwrap();

        assert!(f.billing.calls().is_empty());
        assert_eq!(f.processor.charge_count(), 1);
        let subs = f.subscriptions.all().await;
        assert_eq!(subs.iter().filter(|s| s.is_active()).count(), 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Bundles
    // ════════════════════════════════════════════════════════════════════════════

    fn addon_package(id: &str) -> Arc<InMemoryPackage> {
        Arc::new(InMemoryPackage::new(PackageId::new(id).unwrap(), id))
    }

    fn addon_plan(package: &str, price: i64) -> Plan {
        Plan::new(
            PlanId::new(format!("{}-plan", package)).unwrap(),
            PackageId::new(package).unwrap(),
            package,
            price,
            BillingFrequency::OneTime,
        )
    }

    #[tokio::test]
    async fn bundled_plans_append_invoices_in_order() {
        let f = fixture_with(vec![addon_package("backup"), addon_package("cdn")], 0);
        let p = plan("pro", 3_000, BillingFrequency::Monthly)
            .with_additional_plan(addon_plan("backup", 500))
            .with_additional_plan(addon_plan("cdn", 700));

        let invoice = f.orchestrator.handle(command(p)).await.unwrap().unwrap();

        let bundled: Vec<_> = invoice
            .additional_invoices
            .iter()
            .map(|i| i.plan_id.as_str().to_string())
            .collect();
        assert_eq!(bundled, vec!["backup-plan", "cdn-plan"]);
        assert_eq!(invoice.total(), 4_200);
        assert_eq!(f.processor.charge_count(), 3);
    }

    #[tokio::test]
    async fn failed_bundled_plan_is_skipped() {
        let f = fixture_with(vec![addon_package("backup"), addon_package("cdn")], 0);
        f.processor.push(ScriptedCharge::Approve);
        f.processor.push(ScriptedCharge::Decline("Declined".to_string()));
        let p = plan("pro", 3_000, BillingFrequency::Monthly)
            .with_additional_plan(addon_plan("backup", 500))
            .with_additional_plan(addon_plan("cdn", 700))
            .with_additional_plan(addon_plan("missing", 900));

        let invoice = f.orchestrator.handle(command(p)).await.unwrap().unwrap();

        assert_eq!(invoice.additional_invoices.len(), 1);
        assert_eq!(invoice.additional_invoices[0].plan_id.as_str(), "cdn-plan");
    }

    #[tokio::test]
    async fn failed_primary_skips_bundle() {
        let f = fixture_with(vec![addon_package("backup")], 0);
        f.processor.push(ScriptedCharge::Decline("Declined".to_string()));
        let p = plan("pro", 3_000, BillingFrequency::Monthly)
            .with_additional_plan(addon_plan("backup", 500));

        assert!(f.orchestrator.handle(command(p)).await.is_err());
        assert_eq!(f.processor.charge_count(), 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Locks
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn concurrent_attempts_with_locks_sell_once() {
        let Fixture {
            orchestrator,
            processor,
            billing,
            ..
        } = fixture();
        processor.set_latency(std::time::Duration::from_millis(10));
        let orchestrator = orchestrator.with_locks(PurchaseLocks::new());

        let (first, second) = tokio::join!(
            orchestrator.handle(command(plan("pro", 3_000, BillingFrequency::Monthly))),
            orchestrator.handle(command(plan("pro", 3_000, BillingFrequency::Monthly))),
        );

        assert!(first.is_ok() && second.is_ok());
        // The second attempt sees the first one's subscription and renews it
        assert_eq!(processor.charge_count(), 1);
        assert_eq!(billing.calls().len(), 1);
    }

    #[tokio::test]
    async fn locks_follow_the_validated_host() {
        let Fixture {
            orchestrator,
            package,
            processor,
            billing,
            ..
        } = fixture();
        package.redirect(&HostId::new("alias").unwrap(), host()).await;
        processor.set_latency(std::time::Duration::from_millis(10));
        let orchestrator = orchestrator.with_locks(PurchaseLocks::new());
        let mut aliased = command(plan("pro", 3_000, BillingFrequency::Monthly));
        aliased.host = Host::new(HostId::new("alias").unwrap());

        let (first, second) = tokio::join!(
            orchestrator.handle(command(plan("pro", 3_000, BillingFrequency::Monthly))),
            orchestrator.handle(aliased),
        );

        assert!(first.is_ok() && second.is_ok());
        assert_eq!(processor.charge_count(), 1);
        assert_eq!(billing.calls().len(), 1);
        assert!(package.purchase_for(&HostId::new("alias").unwrap()).await.is_none());
    }
}
