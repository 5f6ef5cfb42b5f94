use crate::record::{
    ContainerRecord, Page, PageRequest, RecordFilter, StoreError, sort_records,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Durable mapping from container ID to its last-known record.
///
/// The store is the single source of truth for "last known" status between
/// reconciliations. Callers that read-then-write the same record serialize
/// through the orchestrator's per-container lock; the store itself only
/// guarantees that each call is atomic.
#[async_trait]
pub trait ContainerStore: Send + Sync {
    /// Point lookup.
    async fn get(&self, container_id: &str) -> Result<Option<ContainerRecord>, StoreError>;

    /// Every matching record in listing order.
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ContainerRecord>, StoreError>;

    /// One page of matching records in listing order.
    async fn list_page(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<ContainerRecord>, StoreError> {
        Ok(page.slice(self.list(filter).await?))
    }

    /// Add a new record; fails if the ID is already present.
    async fn insert(&self, record: ContainerRecord) -> Result<(), StoreError>;

    /// Replace an existing record; fails if the ID is unknown.
    async fn update(&self, record: ContainerRecord) -> Result<(), StoreError>;

    /// Delete a record, returning whether it existed.
    async fn delete(&self, container_id: &str) -> Result<bool, StoreError>;
}

/// In-memory store.
///
/// Suitable for tests, dry runs and single-process deployments where the
/// records do not need to survive a restart.
#[derive(Debug, Default, Clone)]
pub struct InMemoryContainerStore {
    records: Arc<RwLock<HashMap<String, ContainerRecord>>>,
}

impl InMemoryContainerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_records(records: impl IntoIterator<Item = ContainerRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.container_id.clone(), r))
            .collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }

    /// Snapshot of every record, unordered.
    pub async fn snapshot(&self) -> Vec<ContainerRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ContainerStore for InMemoryContainerStore {
    async fn get(&self, container_id: &str) -> Result<Option<ContainerRecord>, StoreError> {
        Ok(self.records.read().await.get(container_id).cloned())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ContainerRecord>, StoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<ContainerRecord> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_records(&mut matching);
        Ok(matching)
    }

    async fn insert(&self, record: ContainerRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.container_id) {
            return Err(StoreError::Duplicate(record.container_id));
        }
        records.insert(record.container_id.clone(), record);
        Ok(())
    }

    async fn update(&self, record: ContainerRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.container_id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(StoreError::NotFound(record.container_id)),
        }
    }

    async fn delete(&self, container_id: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(container_id).is_some())
    }
}
