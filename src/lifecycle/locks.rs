use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-container mutual exclusion.
///
/// Operations on different containers never contend; operations on the same
/// container run one at a time in lock acquisition order.
#[derive(Debug, Default, Clone)]
pub struct ContainerLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ContainerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a container.
    ///
    /// The guard is owned so it can be moved into a spawned task.
    pub async fn acquire(&self, container_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(container_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry of a removed container.
    pub fn forget(&self, container_id: &str) {
        self.locks.remove(container_id);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
