//! Purchase - a package provisioned on a host.

use crate::domain::foundation::{HostId, PackageId, PlanId, PurchaseId, Timestamp};
use serde::{Deserialize, Serialize};

/// Durable record of a package on a host.
///
/// A host holds at most one active purchase per package; the package owns
/// that rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub package_id: PackageId,
    pub host_id: HostId,
    pub name: String,
    pub active: bool,
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    #[serde(default)]
    pub activated_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Purchase {
    /// New inactive purchase.
    pub fn new(package_id: PackageId, host_id: HostId, name: impl Into<String>) -> Self {
        Self {
            id: PurchaseId::new(),
            package_id,
            host_id,
            name: name.into(),
            active: false,
            plan_id: None,
            activated_at: None,
            created_at: Timestamp::now(),
        }
    }

    pub fn activate(&mut self, plan_id: PlanId, now: Timestamp) {
        self.active = true;
        self.plan_id = Some(plan_id);
        self.activated_at = Some(now);
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
