use crate::record::{ContainerRecord, ContainerStore, RecordFilter, StoreError, sort_records};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

const STORE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    records: Vec<ContainerRecord>,
}

/// Record store backed by a single JSON file.
///
/// The whole file is loaded on open and rewritten after every mutation. A
/// write goes to a sibling temporary file which is synced and then renamed
/// over the store file, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct JsonFileContainerStore {
    path: PathBuf,
    records: RwLock<HashMap<String, ContainerRecord>>,
}

impl JsonFileContainerStore {
    /// Open the store at `path`, creating an empty one if the file is missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let records = if async_fs::try_exists(&path).await? {
            let data = async_fs::read(&path).await?;
            let file: StoreFile = serde_json::from_slice(&data)?;
            info!(
                "Loaded {} container records from {}",
                file.records.len(),
                path.display()
            );
            file.records
                .into_iter()
                .map(|r| (r.container_id.clone(), r))
                .collect()
        } else {
            debug!("No record store at {}, starting empty", path.display());
            HashMap::new()
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &HashMap<String, ContainerRecord>) -> Result<(), StoreError> {
        let mut ordered: Vec<ContainerRecord> = records.values().cloned().collect();
        sort_records(&mut ordered);

        let serialized = serde_json::to_vec_pretty(&StoreFile {
            version: STORE_FORMAT_VERSION,
            records: ordered,
        })?;

        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = async_fs::File::create(&temp_path).await?;
        file.write_all(&serialized).await?;
        file.sync_all().await?;
        drop(file);

        async_fs::rename(&temp_path, &self.path).await?;
        debug!(
            "Persisted {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl ContainerStore for JsonFileContainerStore {
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
        let id = record.container_id.clone();
        records.insert(id.clone(), record);
        if let Err(e) = self.persist(&records).await {
            records.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    async fn update(&self, record: ContainerRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let previous = match records.get_mut(&record.container_id) {
            Some(existing) => std::mem::replace(existing, record),
            None => return Err(StoreError::NotFound(record.container_id)),
        };
        if let Err(e) = self.persist(&records).await {
            records.insert(previous.container_id.clone(), previous);
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, container_id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let Some(previous) = records.remove(container_id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&records).await {
            records.insert(previous.container_id.clone(), previous);
            return Err(e);
        }
        Ok(true)
    }
}
