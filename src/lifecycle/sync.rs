use crate::container::ContainerRuntime;
use crate::lifecycle::locks::ContainerLocks;
use crate::record::{ContainerRecord, ContainerStore, LifecycleStatus, RecordFilter, StoreError};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reconciles stored records against the runtime.
///
/// Runs without status preconditions. Each record is reconciled under its
/// container lock so it never interleaves with a lifecycle operation.
#[derive(Clone)]
pub struct StatusSynchronizer {
    runtime: Arc<dyn ContainerRuntime>,
    store: Arc<dyn ContainerStore>,
    locks: ContainerLocks,
}

impl StatusSynchronizer {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<dyn ContainerStore>,
        locks: ContainerLocks,
    ) -> Self {
        Self {
            runtime,
            store,
            locks,
        }
    }

    /// Reconcile the records owned by `user_id`, or every record.
    ///
    /// Returns the records whose status changed, in listing order.
    pub async fn sync_status(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<ContainerRecord>, StoreError> {
        let filter = match user_id {
            Some(user_id) => RecordFilter::owned_by(user_id),
            None => RecordFilter::all(),
        };
        let records = self.store.list(&filter).await?;
        let total = records.len();

        let changed: Vec<ContainerRecord> = join_all(
            records
                .into_iter()
                .map(|record| self.reconcile(record.container_id)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        info!(
            "Status sync for {}: {} of {} records changed",
            user_id.unwrap_or("all users"),
            changed.len(),
            total
        );
        Ok(changed)
    }

    async fn reconcile(&self, container_id: String) -> Option<ContainerRecord> {
        let guard = self.locks.acquire(&container_id).await;

        // Re-read under the lock; an operation may have finished meanwhile.
        let mut record = match self.store.get(&container_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                // Removed since the listing; don't resurrect its lock entry.
                drop(guard);
                self.locks.forget(&container_id);
                return None;
            }
            Err(e) => {
                error!("Failed to read record {}: {}", container_id, e);
                return None;
            }
        };

        let live = match self.runtime.status(&container_id).await {
            Ok(Some(state)) => LifecycleStatus::from(&state),
            Ok(None) => {
                warn!("Container {} no longer exists in the runtime", container_id);
                LifecycleStatus::Dead
            }
            Err(e) => {
                warn!("Skipping sync of {}: {}", container_id, e);
                return None;
            }
        };

        if live == record.status {
            return None;
        }

        debug!(
            "Container {} status {} -> {}",
            container_id, record.status, live
        );
        record.set_status(live);
        match self.store.update(record.clone()).await {
            Ok(()) => Some(record),
            Err(e) => {
                error!("Failed to store synced status of {}: {}", container_id, e);
                None
            }
        }
    }
}
