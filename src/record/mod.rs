//! Container records and the store contract.
//!
//! A [`ContainerRecord`] is the platform's last-known view of one provisioned
//! container: who owns it, which project it belongs to and which lifecycle
//! status it was in after the last operation or reconciliation.

mod persistence;
mod store;

pub use persistence::JsonFileContainerStore;
pub use store::{ContainerStore, InMemoryContainerStore};

use crate::container::RuntimeState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a container record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    Created,
    Start,
    Pause,
    Stop,
    Restarting,
    Dead,
    /// Runtime reported something this platform does not recognize.
    Unknown,
}

impl LifecycleStatus {
    /// Every status, in declaration order.
    pub fn all() -> &'static [LifecycleStatus] {
        &[
            LifecycleStatus::Created,
            LifecycleStatus::Start,
            LifecycleStatus::Pause,
            LifecycleStatus::Stop,
            LifecycleStatus::Restarting,
            LifecycleStatus::Dead,
            LifecycleStatus::Unknown,
        ]
    }

    /// Stable numeric code.
    pub fn code(self) -> i32 {
        match self {
            LifecycleStatus::Created => 0,
            LifecycleStatus::Start => 1,
            LifecycleStatus::Pause => 2,
            LifecycleStatus::Stop => 3,
            LifecycleStatus::Restarting => 4,
            LifecycleStatus::Dead => 5,
            LifecycleStatus::Unknown => -1,
        }
    }

    /// Human readable name shown in listings.
    pub fn display_name(self) -> &'static str {
        match self {
            LifecycleStatus::Created => "Created",
            LifecycleStatus::Start => "Running",
            LifecycleStatus::Pause => "Paused",
            LifecycleStatus::Stop => "Stopped",
            LifecycleStatus::Restarting => "Restarting",
            LifecycleStatus::Dead => "Dead",
            LifecycleStatus::Unknown => "Unknown",
        }
    }

    /// Whether the container is occupying the runtime (must be stopped before removal).
    pub fn is_active(self) -> bool {
        matches!(self, LifecycleStatus::Start | LifecycleStatus::Pause)
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl From<&RuntimeState> for LifecycleStatus {
    fn from(state: &RuntimeState) -> Self {
        match state {
            RuntimeState::Created => LifecycleStatus::Created,
            RuntimeState::Running => LifecycleStatus::Start,
            RuntimeState::Paused => LifecycleStatus::Pause,
            RuntimeState::Restarting => LifecycleStatus::Restarting,
            RuntimeState::Exited => LifecycleStatus::Stop,
            RuntimeState::Dead => LifecycleStatus::Dead,
            RuntimeState::Removing | RuntimeState::Other(_) => LifecycleStatus::Unknown,
        }
    }
}

/// Last-known descriptor of one provisioned container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub container_id: String,
    pub project_id: String,
    pub owner_user_id: String,
    pub name: String,
    pub image_id: String,
    pub status: LifecycleStatus,
    /// Container port -> host port
    pub port_map: BTreeMap<String, u16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContainerRecord {
    /// Record for a container the runtime has just created.
    pub fn created(
        container_id: String,
        project_id: String,
        owner_user_id: String,
        name: String,
        image_id: String,
        port_map: BTreeMap<String, u16>,
    ) -> Self {
        let now = Utc::now();
        Self {
            container_id,
            project_id,
            owner_user_id,
            name,
            image_id,
            status: LifecycleStatus::Created,
            port_map,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to a new status, touching `updated_at`.
    pub fn set_status(&mut self, status: LifecycleStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Selection of records for listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub owner_user_id: Option<String>,
    pub project_id: Option<String>,
}

impl RecordFilter {
    /// Every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Records owned by one user.
    pub fn owned_by(user_id: impl Into<String>) -> Self {
        Self {
            owner_user_id: Some(user_id.into()),
            project_id: None,
        }
    }

    /// Records of one project.
    pub fn in_project(project_id: impl Into<String>) -> Self {
        Self {
            owner_user_id: None,
            project_id: Some(project_id.into()),
        }
    }

    pub fn matches(&self, record: &ContainerRecord) -> bool {
        self.owner_user_id
            .as_ref()
            .is_none_or(|owner| *owner == record.owner_user_id)
            && self
                .project_id
                .as_ref()
                .is_none_or(|project| *project == record.project_id)
    }
}

/// Caller-supplied paging, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.page_number >= 1 && self.page_size >= 1
    }

    /// Cut one page out of an already ordered list.
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let skip = (self.page_number.saturating_sub(1) as usize).saturating_mul(self.page_size as usize);
        let records = items
            .into_iter()
            .skip(skip)
            .take(self.page_size as usize)
            .collect();
        Page {
            records,
            total,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub page_number: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Transform the records, keeping the paging information.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            records: self.records.into_iter().map(f).collect(),
            total: self.total,
            page_number: self.page_number,
            page_size: self.page_size,
        }
    }
}

/// Record store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record already exists: {0}")]
    Duplicate(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Ordering used by every listing: oldest first, ties broken by ID.
pub(crate) fn sort_records(records: &mut [ContainerRecord]) {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.container_id.cmp(&b.container_id))
    });
}
