//! Package port - the product being sold on a host.
//!
//! Packages own provisioning: they decide which host a purchase lands on,
//! keep at most one active purchase per host and know whether the host
//! already used a trial. The engine drives them through this contract.

use crate::domain::billing::{Host, Plan, Purchase, User};
use crate::domain::foundation::{DomainError, PackageId};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Package: Send + Sync {
    fn id(&self) -> &PackageId;

    /// Untranslated package name, recorded on transactions.
    fn raw_name(&self) -> &str;

    /// Statement descriptor passed to the processor.
    fn descriptor(&self) -> Option<String>;

    /// Checks the host against the package.
    ///
    /// Returns a substitute host when the package provisions elsewhere,
    /// `None` to keep the given host.
    async fn validate(
        &self,
        host: &Host,
        user: Option<&User>,
        for_purchase: bool,
    ) -> Result<Option<Host>, DomainError>;

    /// Hook run before trial calculation.
    async fn prepare(&self, host: &Host, plan: &Plan) -> Result<(), DomainError>;

    /// Resolves the purchase for this host, creating an inactive one if needed.
    async fn set_purchase(&self, host: &Host, for_purchase: bool) -> Result<Purchase, DomainError>;

    /// Provisions the package on the host for the plan.
    async fn activate(&self, host: &Host, plan: &Plan) -> Result<Purchase, DomainError>;

    /// Whether the package is currently provisioned and used on the host.
    async fn is_in_use(&self, host: &Host) -> Result<bool, DomainError>;

    /// Whether the host already had a trial of this package.
    async fn trial_consumed(&self, host: &Host) -> Result<bool, DomainError>;

    /// Purchase of this package on the host, if any.
    async fn current_purchase(&self, host: &Host) -> Result<Option<Purchase>, DomainError>;

    /// Purchase of another package that buying `plan` on this host replaces.
    ///
    /// Its active subscription is cancelled and credited during the purchase.
    async fn replaced_purchase(
        &self,
        host: &Host,
        plan: &Plan,
    ) -> Result<Option<Purchase>, DomainError>;
}

/// Looks up packages by id.
#[async_trait]
pub trait PackageDirectory: Send + Sync {
    async fn find(&self, id: &PackageId) -> Result<Option<Arc<dyn Package>>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_ports_are_object_safe() {
        fn _package(_p: &dyn Package) {}
        fn _directory(_d: &dyn PackageDirectory) {}
    }
}
