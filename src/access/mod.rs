//! Caller roles, project ownership and the permission guard.
//!
//! Role and ownership lookups are an external concern reached through the
//! [`AccessControl`] trait. The [`PermissionGuard`] combines it with the
//! record store to decide whether a caller may touch a container or project.
//! Nothing here is cached; every request recomputes its permission context.

mod guard;
mod static_acl;

pub use guard::PermissionGuard;
pub use static_acl::{ProjectEntry, StaticAccessControl, UserEntry};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    OrdinaryUser,
    SystemAdmin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::SystemAdmin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::OrdinaryUser => write!(f, "ordinary user"),
            Role::SystemAdmin => write!(f, "system admin"),
        }
    }
}

/// Role and project ownership lookup.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Role of a user; `None` when the user cannot be resolved.
    async fn resolve_role(&self, user_id: &str) -> Option<Role>;

    /// Whether `user_id` owns `project_id`.
    async fn owns_project(&self, user_id: &str, project_id: &str) -> bool;

    /// Display name of a project.
    async fn project_name(&self, project_id: &str) -> Option<String>;
}
