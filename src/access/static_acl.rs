use crate::access::{AccessControl, Role};
use crate::config::ConfigError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    pub owner: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccessFile {
    #[serde(default)]
    users: Vec<UserEntry>,
    #[serde(default)]
    projects: Vec<ProjectEntry>,
}

/// Fixed table of users and projects.
///
/// ```toml
/// [[users]]
/// id = "alice"
/// role = "ordinary_user"
///
/// [[projects]]
/// id = "shop"
/// name = "Web shop"
/// owner = "alice"
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticAccessControl {
    users: HashMap<String, Role>,
    projects: HashMap<String, ProjectEntry>,
}

impl StaticAccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: impl Into<String>, role: Role) -> Self {
        self.users.insert(id.into(), role);
        self
    }

    pub fn with_project(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        let entry = ProjectEntry {
            id: id.into(),
            name: name.into(),
            owner: owner.into(),
        };
        self.projects.insert(entry.id.clone(), entry);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: AccessFile = toml::from_str(content)?;
        let mut acl = Self::new();
        for user in file.users {
            acl.users.insert(user.id, user.role);
        }
        for project in file.projects {
            acl.projects.insert(project.id.clone(), project);
        }
        Ok(acl)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Projects owned by a user, sorted by ID.
    pub fn projects_of(&self, user_id: &str) -> Vec<&ProjectEntry> {
        let mut owned: Vec<_> = self
            .projects
            .values()
            .filter(|p| p.owner == user_id)
            .collect();
        owned.sort_by(|a, b| a.id.cmp(&b.id));
        owned
    }
}

#[async_trait]
impl AccessControl for StaticAccessControl {
    async fn resolve_role(&self, user_id: &str) -> Option<Role> {
        self.users.get(user_id).copied()
    }

    async fn owns_project(&self, user_id: &str, project_id: &str) -> bool {
        self.projects
            .get(project_id)
            .is_some_and(|p| p.owner == user_id)
    }

    async fn project_name(&self, project_id: &str) -> Option<String> {
        self.projects.get(project_id).map(|p| p.name.clone())
    }
}
