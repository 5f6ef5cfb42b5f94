use crate::access::{AccessControl, PermissionGuard, Role};
use crate::config::PlatformConfig;
use crate::container::{ContainerConfig, ContainerError, ContainerRuntime, ProcessSnapshot};
use crate::env;
use crate::lifecycle::{
    ContainerLocks, ContainerView, EnumListing, LifecycleError, Operation, OperationResult,
    StatusSynchronizer, TerminalRequest, TerminalSession,
};
use crate::record::{
    ContainerRecord, ContainerStore, LifecycleStatus, Page, PageRequest, RecordFilter,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

/// Parameters of a new container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateRequest {
    pub project_id: String,
    pub name: String,
    pub image_id: String,
    /// Empty runs the image's default command
    pub cmd: Vec<String>,
    /// Container port -> host port; port 80 is always routed to the gateway
    pub port_map: BTreeMap<String, u16>,
    /// `KEY=VALUE` entries
    pub env: Vec<String>,
    /// Container paths that receive anonymous volumes
    pub destinations: Vec<String>,
}

impl CreateRequest {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        image_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            image_id: image_id.into(),
            ..Default::default()
        }
    }

    fn validate(&self) -> LifecycleResult<()> {
        for (field, value) in [
            ("image_id", &self.image_id),
            ("name", &self.name),
            ("project_id", &self.project_id),
        ] {
            if value.trim().is_empty() {
                return Err(LifecycleError::Param(format!("{} must not be blank", field)));
            }
        }
        Ok(())
    }

    /// Caller mapping with port 80 forced onto the gateway port.
    fn effective_port_map(&self, gateway_port: u16) -> BTreeMap<String, u16> {
        let gateway_keys = [
            env::GATEWAY_CONTAINER_PORT.to_string(),
            format!("{}/tcp", env::GATEWAY_CONTAINER_PORT),
        ];
        let mut ports: BTreeMap<String, u16> = self
            .port_map
            .iter()
            .filter(|(port, _)| !gateway_keys.contains(port))
            .map(|(port, host)| (port.clone(), *host))
            .collect();
        ports.insert(env::GATEWAY_CONTAINER_PORT.to_string(), gateway_port);
        ports
    }
}

/// Drives container lifecycle operations on behalf of callers.
pub struct LifecycleOrchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    store: Arc<dyn ContainerStore>,
    guard: PermissionGuard,
    locks: ContainerLocks,
    synchronizer: StatusSynchronizer,
    config: PlatformConfig,
    background: Mutex<JoinSet<()>>,
}

impl LifecycleOrchestrator {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<dyn ContainerStore>,
        access: Arc<dyn AccessControl>,
        config: PlatformConfig,
    ) -> Self {
        let locks = ContainerLocks::new();
        Self {
            guard: PermissionGuard::new(access, store.clone()),
            synchronizer: StatusSynchronizer::new(runtime.clone(), store.clone(), locks.clone()),
            runtime,
            store,
            locks,
            config,
            background: Mutex::new(JoinSet::new()),
        }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn guard(&self) -> &PermissionGuard {
        &self.guard
    }

    pub fn store(&self) -> &Arc<dyn ContainerStore> {
        &self.store
    }

    /// Permission check for one container.
    pub async fn check_permission(
        &self,
        user_id: &str,
        container_id: &str,
    ) -> OperationResult<()> {
        self.guard.check_permission(user_id, container_id).await
    }

    /// Create a container in a project the caller owns; the record starts as `Created`.
    ///
    /// Creation is an ordinary-user operation, admins are refused.
    pub async fn create(
        &self,
        user_id: &str,
        request: CreateRequest,
    ) -> OperationResult<ContainerRecord> {
        self.create_inner(user_id, request).await.into()
    }

    async fn create_inner(
        &self,
        user_id: &str,
        request: CreateRequest,
    ) -> LifecycleResult<ContainerRecord> {
        request.validate()?;
        self.guard
            .authorize_create(user_id, &request.project_id)
            .await?;

        let port_map = request.effective_port_map(self.config.gateway_port);

        let mut builder = ContainerConfig::builder()
            .image(&request.image_id)
            .cmd(request.cmd.iter().cloned())
            .env_entries(request.env.iter().cloned())
            .label(env::PROJECT_LABEL, &request.project_id)
            .label(env::OWNER_LABEL, user_id);
        for (port, host_port) in &port_map {
            builder = builder.port_binding(port.as_str(), *host_port);
        }
        for destination in &request.destinations {
            builder = builder.volume(destination.as_str());
        }
        let container_config = builder.build().map_err(|e| match e {
            ContainerError::ConfigError(msg) => LifecycleError::Param(msg),
            other => LifecycleError::Runtime(other),
        })?;

        let container_id = self
            .runtime
            .create(&container_config, &request.name)
            .await
            .inspect_err(|e| error!("Failed to create container {}: {}", request.name, e))?;

        let record = ContainerRecord::created(
            container_id.clone(),
            request.project_id,
            user_id.to_string(),
            request.name,
            request.image_id,
            port_map,
        );

        if let Err(e) = self.store.insert(record.clone()).await {
            error!("Failed to record container {}: {}", container_id, e);
            if let Err(cleanup) = self.runtime.remove(&container_id).await {
                warn!(
                    "Container {} left in runtime without a record: {}",
                    container_id, cleanup
                );
            }
            return Err(e.into());
        }

        info!(
            "Created container {} ({}) for {} in project {}",
            record.name, container_id, user_id, record.project_id
        );
        Ok(record)
    }

    /// Start a container in the background.
    ///
    /// Answers `Ok` with message "starting" once the start has been handed
    /// off. The record becomes `Start` when the runtime call succeeds; a
    /// failure leaves it unchanged and is only logged.
    pub async fn start(&self, user_id: &str, container_id: &str) -> OperationResult<()> {
        match self.start_inner(user_id, container_id).await {
            Ok(()) => OperationResult::ok_with_message("starting"),
            Err(e) => Err(e).into(),
        }
    }

    async fn start_inner(&self, user_id: &str, container_id: &str) -> LifecycleResult<()> {
        self.guard.authorize_container(user_id, container_id).await?;

        let lock = self.locks.acquire(container_id).await;
        let record = self.locked_record(container_id, Operation::Start).await?;

        let runtime = self.runtime.clone();
        let store = self.store.clone();
        let container_id = container_id.to_string();

        let mut background = self.background.lock().await;
        while background.try_join_next().is_some() {}
        background.spawn(async move {
            let _lock = lock;
            match runtime.start(&container_id).await {
                Ok(()) => {
                    if let Err(e) =
                        commit(store.as_ref(), record, LifecycleStatus::Start).await
                    {
                        error!("Container {} started but not recorded: {}", container_id, e);
                    } else {
                        info!("Container {} started", container_id);
                    }
                }
                Err(e) => error!("Failed to start container {}: {}", container_id, e),
            }
        });
        Ok(())
    }

    /// Wait for every background start to finish.
    pub async fn settle(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.background.lock().await);
            if pending.is_empty() {
                return;
            }
            while let Some(joined) = pending.join_next().await {
                if let Err(e) = joined {
                    warn!("Background start task failed: {}", e);
                }
            }
        }
    }

    pub async fn pause(&self, user_id: &str, container_id: &str) -> OperationResult<ContainerRecord> {
        self.transition(user_id, container_id, Operation::Pause)
            .await
            .into()
    }

    /// Resume a paused container.
    pub async fn continue_run(
        &self,
        user_id: &str,
        container_id: &str,
    ) -> OperationResult<ContainerRecord> {
        self.transition(user_id, container_id, Operation::Continue)
            .await
            .into()
    }

    pub async fn stop(&self, user_id: &str, container_id: &str) -> OperationResult<ContainerRecord> {
        self.transition(user_id, container_id, Operation::Stop)
            .await
            .into()
    }

    pub async fn kill(&self, user_id: &str, container_id: &str) -> OperationResult<ContainerRecord> {
        self.transition(user_id, container_id, Operation::Kill)
            .await
            .into()
    }

    pub async fn restart(
        &self,
        user_id: &str,
        container_id: &str,
    ) -> OperationResult<ContainerRecord> {
        self.transition(user_id, container_id, Operation::Restart)
            .await
            .into()
    }

    /// Processes running in a started container.
    pub async fn top(&self, user_id: &str, container_id: &str) -> OperationResult<ProcessSnapshot> {
        self.top_inner(user_id, container_id).await.into()
    }

    async fn top_inner(&self, user_id: &str, container_id: &str) -> LifecycleResult<ProcessSnapshot> {
        let record = self.guard.authorize_container(user_id, container_id).await?;
        require(Operation::Top, &record)?;
        Ok(self
            .runtime
            .top(container_id)
            .await
            .inspect_err(|e| error!("Failed to list processes of {}: {}", container_id, e))?)
    }

    /// Remove a container that is not running or paused, then its record.
    pub async fn remove(&self, user_id: &str, container_id: &str) -> OperationResult<()> {
        self.remove_inner(user_id, container_id).await.into()
    }

    async fn remove_inner(&self, user_id: &str, container_id: &str) -> LifecycleResult<()> {
        self.guard.authorize_container(user_id, container_id).await?;
        {
            let _lock = self.locks.acquire(container_id).await;
            self.locked_record(container_id, Operation::Remove).await?;

            match self.runtime.remove(container_id).await {
                Ok(()) => {}
                Err(ContainerError::NotFound(_)) => {
                    debug!("Container {} already gone from the runtime", container_id);
                }
                Err(e) => {
                    error!("Failed to remove container {}: {}", container_id, e);
                    return Err(e.into());
                }
            }
            self.store.delete(container_id).await?;
        }
        self.locks.forget(container_id);
        info!("Removed container {}", container_id);
        Ok(())
    }

    pub async fn get_by_id(&self, user_id: &str, container_id: &str) -> OperationResult<ContainerView> {
        match self.guard.authorize_container(user_id, container_id).await {
            Ok(record) => {
                OperationResult::ok(ContainerView::resolve(record, self.guard.access().as_ref()).await)
            }
            Err(e) => Err(e).into(),
        }
    }

    /// Own containers in owned projects for ordinary users, every container for admins.
    pub async fn list(&self, user_id: &str, page: PageRequest) -> OperationResult<Page<ContainerView>> {
        self.list_inner(user_id, page).await.into()
    }

    async fn list_inner(&self, user_id: &str, page: PageRequest) -> LifecycleResult<Page<ContainerView>> {
        check_page(page)?;
        let records = match self.guard.role(user_id).await? {
            Role::SystemAdmin => self.store.list_page(&RecordFilter::all(), page).await?,
            Role::OrdinaryUser => page.slice(self.visible_to_owner(user_id).await?),
        };
        Ok(self.views(records).await)
    }

    /// Records owned by `user_id` whose project it still owns.
    async fn visible_to_owner(&self, user_id: &str) -> LifecycleResult<Vec<ContainerRecord>> {
        let owned = self.store.list(&RecordFilter::owned_by(user_id)).await?;
        let access = self.guard.access();
        let keep = join_all(
            owned
                .iter()
                .map(|r| access.owns_project(user_id, &r.project_id)),
        )
        .await;
        Ok(owned
            .into_iter()
            .zip(keep)
            .filter_map(|(record, keep)| keep.then_some(record))
            .collect())
    }

    pub async fn list_by_project(
        &self,
        user_id: &str,
        project_id: &str,
        page: PageRequest,
    ) -> OperationResult<Page<ContainerView>> {
        self.list_by_project_inner(user_id, project_id, page)
            .await
            .into()
    }

    async fn list_by_project_inner(
        &self,
        user_id: &str,
        project_id: &str,
        page: PageRequest,
    ) -> LifecycleResult<Page<ContainerView>> {
        check_page(page)?;
        self.guard.authorize_project(user_id, project_id).await?;
        let records = self
            .store
            .list_page(&RecordFilter::in_project(project_id), page)
            .await?;
        Ok(self.views(records).await)
    }

    /// Records owned by `user_id` within projects it owns, or every record.
    pub async fn list_by_user(
        &self,
        user_id: Option<&str>,
        page: PageRequest,
    ) -> OperationResult<Page<ContainerView>> {
        self.list_by_user_inner(user_id, page).await.into()
    }

    async fn list_by_user_inner(
        &self,
        user_id: Option<&str>,
        page: PageRequest,
    ) -> LifecycleResult<Page<ContainerView>> {
        check_page(page)?;
        let records = match user_id {
            None => self.store.list(&RecordFilter::all()).await?,
            Some(user_id) => self.visible_to_owner(user_id).await?,
        };
        Ok(self.views(page.slice(records)).await)
    }

    /// Connection descriptor for an exec terminal on a running container.
    pub async fn terminal(
        &self,
        user_id: &str,
        request: TerminalRequest,
    ) -> OperationResult<TerminalSession> {
        self.terminal_inner(user_id, request).await.into()
    }

    async fn terminal_inner(
        &self,
        user_id: &str,
        request: TerminalRequest,
    ) -> LifecycleResult<TerminalSession> {
        let record = self
            .guard
            .authorize_container(user_id, &request.container_id)
            .await?;
        if record.status != LifecycleStatus::Start {
            return Err(LifecycleError::StatusRefused {
                container_id: record.container_id,
                status: record.status.to_string(),
                operation: "open terminal",
            });
        }
        TerminalSession::build(&request, &self.config)
            .map_err(|e| LifecycleError::Param(format!("invalid terminal endpoint: {}", e)))
    }

    /// Reconcile records of one user, or all records, without permission checks.
    pub async fn sync_status(&self, user_id: Option<&str>) -> OperationResult<Vec<ContainerRecord>> {
        self.synchronizer
            .sync_status(user_id)
            .await
            .map_err(LifecycleError::from)
            .into()
    }

    /// Reconcile what the caller may see: own containers, or all for admins.
    pub async fn sync_for(&self, user_id: &str) -> OperationResult<Vec<ContainerRecord>> {
        match self.guard.role(user_id).await {
            Ok(Role::SystemAdmin) => self.sync_status(None).await,
            Ok(Role::OrdinaryUser) => self.sync_status(Some(user_id)).await,
            Err(e) => Err(e).into(),
        }
    }

    /// Result codes and lifecycle statuses with their display text.
    pub fn enums(&self) -> OperationResult<EnumListing> {
        OperationResult::ok(EnumListing::collect())
    }

    async fn transition(
        &self,
        user_id: &str,
        container_id: &str,
        operation: Operation,
    ) -> LifecycleResult<ContainerRecord> {
        self.guard.authorize_container(user_id, container_id).await?;

        let _lock = self.locks.acquire(container_id).await;
        let record = self.locked_record(container_id, operation).await?;

        self.dispatch(operation, container_id)
            .await
            .inspect_err(|e| error!("Failed to {} container {}: {}", operation, container_id, e))?;

        let record = match operation.outcome() {
            Some(status) => commit(self.store.as_ref(), record, status).await?,
            None => record,
        };
        info!("Container {} is now {}", container_id, record.status);
        Ok(record)
    }

    /// Current record read under the container lock, checked against `operation`.
    async fn locked_record(
        &self,
        container_id: &str,
        operation: Operation,
    ) -> LifecycleResult<ContainerRecord> {
        let record = self
            .store
            .get(container_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(container_id.to_string()))?;
        require(operation, &record)?;
        Ok(record)
    }

    async fn dispatch(&self, operation: Operation, container_id: &str) -> Result<(), ContainerError> {
        match operation {
            Operation::Start => self.runtime.start(container_id).await,
            Operation::Pause => self.runtime.pause(container_id).await,
            Operation::Continue => self.runtime.unpause(container_id).await,
            Operation::Stop => self.runtime.stop(container_id).await,
            Operation::Kill => self.runtime.kill(container_id).await,
            Operation::Restart => self.runtime.restart(container_id).await,
            Operation::Remove => self.runtime.remove(container_id).await,
            Operation::Top => self.runtime.top(container_id).await.map(|_| ()),
        }
    }

    async fn views(&self, page: Page<ContainerRecord>) -> Page<ContainerView> {
        let access = self.guard.access().as_ref();
        let names = join_all(
            page.records
                .iter()
                .map(|r| access.project_name(&r.project_id)),
        )
        .await;
        let mut names = names.into_iter();
        page.map(|record| {
            let name = names.next().flatten();
            ContainerView::with_project_name(record, name)
        })
    }
}

fn require(operation: Operation, record: &ContainerRecord) -> LifecycleResult<()> {
    if operation.permits(record.status) {
        Ok(())
    } else {
        debug!(
            "Refusing {} on container {} in status {}",
            operation, record.container_id, record.status
        );
        Err(LifecycleError::StatusRefused {
            container_id: record.container_id.clone(),
            status: record.status.to_string(),
            operation: operation.name(),
        })
    }
}

fn check_page(page: PageRequest) -> LifecycleResult<()> {
    if page.is_valid() {
        Ok(())
    } else {
        Err(LifecycleError::Param(format!(
            "page {} of size {} is invalid; both must be at least 1",
            page.page_number, page.page_size
        )))
    }
}

/// Record the outcome of a successful runtime call.
async fn commit(
    store: &dyn ContainerStore,
    mut record: ContainerRecord,
    status: LifecycleStatus,
) -> LifecycleResult<ContainerRecord> {
    record.set_status(status);
    store.update(record.clone()).await?;
    Ok(record)
}
