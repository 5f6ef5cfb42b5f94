use crate::access::AccessControl;
use crate::lifecycle::ResultCode;
use crate::record::{ContainerRecord, LifecycleStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display form of a container record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerView {
    pub container_id: String,
    pub project_id: String,
    pub project_name: Option<String>,
    pub owner_user_id: String,
    pub name: String,
    pub image_id: String,
    pub status: LifecycleStatus,
    pub status_name: String,
    pub port_map: BTreeMap<String, u16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContainerView {
    pub async fn resolve(record: ContainerRecord, access: &dyn AccessControl) -> Self {
        let project_name = access.project_name(&record.project_id).await;
        Self::with_project_name(record, project_name)
    }

    pub fn with_project_name(record: ContainerRecord, project_name: Option<String>) -> Self {
        Self {
            status_name: record.status.display_name().to_string(),
            container_id: record.container_id,
            project_id: record.project_id,
            project_name,
            owner_user_id: record.owner_user_id,
            name: record.name,
            image_id: record.image_id,
            status: record.status,
            port_map: record.port_map,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// One enum member as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub name: String,
    pub code: i32,
    pub message: String,
}

/// Every result code and lifecycle status with display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumListing {
    pub result_codes: Vec<EnumEntry>,
    pub statuses: Vec<EnumEntry>,
}

impl EnumListing {
    pub fn collect() -> Self {
        Self {
            result_codes: ResultCode::all()
                .iter()
                .map(|c| EnumEntry {
                    name: format!("{:?}", c),
                    code: c.code(),
                    message: c.message().to_string(),
                })
                .collect(),
            statuses: LifecycleStatus::all()
                .iter()
                .map(|s| EnumEntry {
                    name: format!("{:?}", s),
                    code: s.code(),
                    message: s.display_name().to_string(),
                })
                .collect(),
        }
    }
}
