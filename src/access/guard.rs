use crate::access::{AccessControl, Role};
use crate::lifecycle::{LifecycleError, OperationResult};
use crate::record::{ContainerRecord, ContainerStore};
use std::sync::Arc;
use tracing::debug;

/// Decides whether a caller may operate on a container or a project.
#[derive(Clone)]
pub struct PermissionGuard {
    access: Arc<dyn AccessControl>,
    store: Arc<dyn ContainerStore>,
}

impl PermissionGuard {
    pub fn new(access: Arc<dyn AccessControl>, store: Arc<dyn ContainerStore>) -> Self {
        Self { access, store }
    }

    pub fn access(&self) -> &Arc<dyn AccessControl> {
        &self.access
    }

    /// Resolve the caller's role, failing with an authority error when unknown.
    pub async fn role(&self, user_id: &str) -> Result<Role, LifecycleError> {
        self.access
            .resolve_role(user_id)
            .await
            .ok_or_else(|| LifecycleError::Authority(user_id.to_string()))
    }

    /// Permission check for one container, answering with the uniform result.
    pub async fn check_permission(
        &self,
        user_id: &str,
        container_id: &str,
    ) -> OperationResult<()> {
        self.authorize_container(user_id, container_id)
            .await
            .map(|_| ())
            .into()
    }

    /// Check the caller may operate on a container and hand back its record.
    ///
    /// Role is resolved first, then the record is looked up, then ownership
    /// of the record's project is checked for ordinary users.
    pub async fn authorize_container(
        &self,
        user_id: &str,
        container_id: &str,
    ) -> Result<ContainerRecord, LifecycleError> {
        let role = self.role(user_id).await?;

        let record = self
            .store
            .get(container_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(container_id.to_string()))?;

        if role == Role::OrdinaryUser
            && !self.access.owns_project(user_id, &record.project_id).await
        {
            debug!(
                "Denied {} access to container {} in project {}",
                user_id, container_id, record.project_id
            );
            return Err(LifecycleError::Permission {
                user_id: user_id.to_string(),
                target: format!("container {}", container_id),
            });
        }

        Ok(record)
    }

    /// Check the caller may act within a project.
    pub async fn authorize_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Role, LifecycleError> {
        let role = self.role(user_id).await?;
        if role == Role::OrdinaryUser && !self.access.owns_project(user_id, project_id).await {
            debug!("Denied {} access to project {}", user_id, project_id);
            return Err(LifecycleError::Permission {
                user_id: user_id.to_string(),
                target: format!("project {}", project_id),
            });
        }
        Ok(role)
    }

    /// Check the caller may create a container in a project.
    ///
    /// Creation is reserved to ordinary users, and only in projects they own.
    pub async fn authorize_create(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<(), LifecycleError> {
        if self.role(user_id).await?.is_admin() {
            debug!("Denied container creation to admin {}", user_id);
            return Err(LifecycleError::Permission {
                user_id: user_id.to_string(),
                target: format!("container creation in project {}", project_id),
            });
        }
        self.authorize_project(user_id, project_id).await.map(|_| ())
    }
}
