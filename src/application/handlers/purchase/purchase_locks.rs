//! PurchaseLocks - One purchase at a time per package and host.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::{HostId, PackageId};

type LockKey = (PackageId, HostId);

/// Keyed async mutex serializing purchase attempts.
///
/// The guard returned by [`PurchaseLocks::acquire`] releases the key on drop.
#[derive(Clone, Default)]
pub struct PurchaseLocks {
    keys: Arc<Mutex<HashMap<LockKey, Arc<Mutex<()>>>>>,
}

impl PurchaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other attempt holds `(package, host)`.
    pub async fn acquire(&self, package: &PackageId, host: &HostId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut keys = self.keys.lock().await;
            // Drop entries nobody is holding or waiting on
            keys.retain(|_, lock| Arc::strong_count(lock) > 1);
            keys.entry((package.clone(), host.clone()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys currently held or awaited.
    pub async fn held(&self) -> usize {
        self.keys
            .lock()
            .await
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}
