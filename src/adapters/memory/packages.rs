//! In-memory packages and package directory.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{Host, Plan, Purchase, User};
use crate::domain::foundation::{DomainError, HostId, PackageId, Timestamp};
use crate::ports::{Package, PackageDirectory};

/// Package keeping its purchases, usage and trial history in memory.
///
/// Activation provisions the package on the host, marks it in use and, for
/// plans with trial days, records the trial as consumed.
pub struct InMemoryPackage {
    id: PackageId,
    name: String,
    descriptor: Option<String>,
    replaces: Option<Arc<dyn Package>>,
    state: RwLock<PackageState>,
}

#[derive(Default)]
struct PackageState {
    purchases: HashMap<HostId, Purchase>,
    in_use: HashSet<HostId>,
    trials: HashSet<HostId>,
    redirects: HashMap<HostId, Host>,
    activations: usize,
}

impl InMemoryPackage {
    pub fn new(id: PackageId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            descriptor: None,
            replaces: None,
            state: RwLock::new(PackageState::default()),
        }
    }

    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = Some(descriptor.into());
        self
    }

    /// Buying this package replaces `other` on the same host.
    pub fn replacing(mut self, other: Arc<dyn Package>) -> Self {
        self.replaces = Some(other);
        self
    }

    // === Test Helpers ===

    /// Stores a purchase as if it had been made earlier.
    pub async fn seed_purchase(&self, purchase: Purchase) {
        let mut state = self.state.write().await;
        if purchase.active {
            state.in_use.insert(purchase.host_id.clone());
        }
        state.purchases.insert(purchase.host_id.clone(), purchase);
    }

    pub async fn set_in_use(&self, host: &HostId, in_use: bool) {
        let mut state = self.state.write().await;
        if in_use {
            state.in_use.insert(host.clone());
        } else {
            state.in_use.remove(host);
        }
    }

    pub async fn mark_trial_consumed(&self, host: &HostId) {
        self.state.write().await.trials.insert(host.clone());
    }

    /// Provisions purchases for `from` onto `to` instead.
    pub async fn redirect(&self, from: &HostId, to: Host) {
        self.state.write().await.redirects.insert(from.clone(), to);
    }

    pub async fn purchase_for(&self, host: &HostId) -> Option<Purchase> {
        self.state.read().await.purchases.get(host).cloned()
    }

    pub async fn activation_count(&self) -> usize {
        self.state.read().await.activations
    }
}

#[async_trait]
impl Package for InMemoryPackage {
    fn id(&self) -> &PackageId {
        &self.id
    }

    fn raw_name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> Option<String> {
        self.descriptor.clone()
    }

    async fn validate(
        &self,
        host: &Host,
        _user: Option<&User>,
        _for_purchase: bool,
    ) -> Result<Option<Host>, DomainError> {
        Ok(self.state.read().await.redirects.get(&host.id).cloned())
    }

    async fn prepare(&self, _host: &Host, _plan: &Plan) -> Result<(), DomainError> {
        Ok(())
    }

    async fn set_purchase(&self, host: &Host, _for_purchase: bool) -> Result<Purchase, DomainError> {
        let mut state = self.state.write().await;
        let purchase = state
            .purchases
            .entry(host.id.clone())
            .or_insert_with(|| Purchase::new(self.id.clone(), host.id.clone(), self.name.clone()));
        Ok(purchase.clone())
    }

    async fn activate(&self, host: &Host, plan: &Plan) -> Result<Purchase, DomainError> {
        let mut state = self.state.write().await;
        state.activations += 1;
        state.in_use.insert(host.id.clone());
        if plan.trial_days > 0 {
            state.trials.insert(host.id.clone());
        }
        let purchase = state
            .purchases
            .entry(host.id.clone())
            .or_insert_with(|| Purchase::new(self.id.clone(), host.id.clone(), self.name.clone()));
        purchase.activate(plan.id.clone(), Timestamp::now());
        Ok(purchase.clone())
    }

    async fn is_in_use(&self, host: &Host) -> Result<bool, DomainError> {
        Ok(self.state.read().await.in_use.contains(&host.id))
    }

    async fn trial_consumed(&self, host: &Host) -> Result<bool, DomainError> {
        Ok(self.state.read().await.trials.contains(&host.id))
    }

    async fn current_purchase(&self, host: &Host) -> Result<Option<Purchase>, DomainError> {
        Ok(self.state.read().await.purchases.get(&host.id).cloned())
    }

    async fn replaced_purchase(
        &self,
        host: &Host,
        _plan: &Plan,
    ) -> Result<Option<Purchase>, DomainError> {
        match &self.replaces {
            Some(other) => Ok(other.current_purchase(host).await?.filter(|p| p.active)),
            None => Ok(None),
        }
    }
}

/// Package directory over a fixed set of packages.
#[derive(Default)]
pub struct InMemoryPackageDirectory {
    packages: HashMap<PackageId, Arc<dyn Package>>,
}

impl InMemoryPackageDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, package: Arc<dyn Package>) -> Self {
        self.packages.insert(package.id().clone(), package);
        self
    }
}

#[async_trait]
impl PackageDirectory for InMemoryPackageDirectory {
    async fn find(&self, id: &PackageId) -> Result<Option<Arc<dyn Package>>, DomainError> {
        Ok(self.packages.get(id).cloned())
    }
}
