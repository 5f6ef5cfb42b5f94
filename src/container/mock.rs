//! In-memory container runtime.
//!
//! Simulates the engine without creating containers. Used by the test suite
//! and by `paasctl --dry-run`. Failures can be injected per operation and per
//! container, and every call is recorded.

use crate::container::{
    ContainerConfig, ContainerError, ContainerRuntime, ProcessSnapshot, Result, RuntimeState,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Runtime calls, used for failure injection and call recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeOp {
    Create,
    Start,
    Stop,
    Pause,
    Unpause,
    Kill,
    Restart,
    Remove,
    Top,
    Status,
}

#[derive(Debug, Clone)]
struct MockContainer {
    name: String,
    state: RuntimeState,
}

/// Runtime that keeps containers in memory.
#[derive(Debug, Default)]
pub struct MockRuntime {
    containers: Arc<RwLock<HashMap<String, MockContainer>>>,
    /// (op, container) pairs that fail; `None` matches every container
    failures: Arc<Mutex<HashSet<(RuntimeOp, Option<String>)>>>,
    calls: Arc<Mutex<Vec<(RuntimeOp, String)>>>,
    start_delay: Option<Duration>,
}

impl MockRuntime {
    /// Create an empty mock runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every start call, widening the async start window.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Make `op` fail for one container, or for all when `container_id` is `None`.
    pub async fn fail_on(&self, op: RuntimeOp, container_id: Option<&str>) {
        self.failures
            .lock()
            .await
            .insert((op, container_id.map(String::from)));
    }

    /// Clear every injected failure.
    pub async fn clear_failures(&self) {
        self.failures.lock().await.clear();
    }

    /// Overwrite the live state of a container, as if changed outside the platform.
    pub async fn set_state(&self, container_id: &str, state: RuntimeState) {
        if let Some(container) = self.containers.write().await.get_mut(container_id) {
            container.state = state;
        }
    }

    /// Drop a container, as if removed outside the platform.
    pub async fn forget(&self, container_id: &str) {
        self.containers.write().await.remove(container_id);
    }

    /// Live state of a container, if it exists.
    pub async fn state_of(&self, container_id: &str) -> Option<RuntimeState> {
        self.containers
            .read()
            .await
            .get(container_id)
            .map(|c| c.state.clone())
    }

    /// Number of containers the runtime knows.
    pub async fn container_count(&self) -> usize {
        self.containers.read().await.len()
    }

    /// Number of recorded calls of one kind.
    pub async fn call_count(&self, op: RuntimeOp) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(recorded, _)| *recorded == op)
            .count()
    }

    async fn enter(&self, op: RuntimeOp, container_id: &str) -> Result<()> {
        self.calls.lock().await.push((op, container_id.to_string()));

        let failures = self.failures.lock().await;
        if failures.contains(&(op, None)) || failures.contains(&(op, Some(container_id.to_string())))
        {
            return Err(ContainerError::Other(format!(
                "injected {:?} failure for {}",
                op, container_id
            )));
        }
        Ok(())
    }

    async fn transition<F>(&self, container_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&RuntimeState) -> std::result::Result<RuntimeState, String>,
    {
        let mut containers = self.containers.write().await;
        let container = containers
            .get_mut(container_id)
            .ok_or_else(|| ContainerError::NotFound(container_id.to_string()))?;
        container.state = apply(&container.state).map_err(ContainerError::Other)?;
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn create(&self, config: &ContainerConfig, name: &str) -> Result<String> {
        self.enter(RuntimeOp::Create, name).await?;

        let mut containers = self.containers.write().await;
        if containers.values().any(|c| c.name == name) {
            return Err(ContainerError::Other(format!(
                "container name {} already in use",
                name
            )));
        }

        let container_id = Uuid::new_v4().simple().to_string();
        containers.insert(
            container_id.clone(),
            MockContainer {
                name: name.to_string(),
                state: RuntimeState::Created,
            },
        );

        debug!(
            "MockRuntime: created {} ({}) from {}",
            name, container_id, config.image
        );
        Ok(container_id)
    }

    async fn start(&self, container_id: &str) -> Result<()> {
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        self.enter(RuntimeOp::Start, container_id).await?;
        self.transition(container_id, |state| match state {
            RuntimeState::Paused => Err("cannot start a paused container".to_string()),
            _ => Ok(RuntimeState::Running),
        })
        .await
    }

    async fn stop(&self, container_id: &str) -> Result<()> {
        self.enter(RuntimeOp::Stop, container_id).await?;
        self.transition(container_id, |_| Ok(RuntimeState::Exited))
            .await
    }

    async fn pause(&self, container_id: &str) -> Result<()> {
        self.enter(RuntimeOp::Pause, container_id).await?;
        self.transition(container_id, |state| match state {
            RuntimeState::Running => Ok(RuntimeState::Paused),
            other => Err(format!("container is {}, not running", other)),
        })
        .await
    }

    async fn unpause(&self, container_id: &str) -> Result<()> {
        self.enter(RuntimeOp::Unpause, container_id).await?;
        self.transition(container_id, |state| match state {
            RuntimeState::Paused => Ok(RuntimeState::Running),
            other => Err(format!("container is {}, not paused", other)),
        })
        .await
    }

    async fn kill(&self, container_id: &str) -> Result<()> {
        self.enter(RuntimeOp::Kill, container_id).await?;
        self.transition(container_id, |_| Ok(RuntimeState::Exited))
            .await
    }

    async fn restart(&self, container_id: &str) -> Result<()> {
        self.enter(RuntimeOp::Restart, container_id).await?;
        self.transition(container_id, |_| Ok(RuntimeState::Running))
            .await
    }

    async fn remove(&self, container_id: &str) -> Result<()> {
        self.enter(RuntimeOp::Remove, container_id).await?;
        let mut containers = self.containers.write().await;
        match containers.get(container_id) {
            None => Err(ContainerError::NotFound(container_id.to_string())),
            Some(c) if matches!(c.state, RuntimeState::Running | RuntimeState::Paused) => Err(
                ContainerError::Other(format!("container {} is still {}", container_id, c.state)),
            ),
            Some(_) => {
                containers.remove(container_id);
                Ok(())
            }
        }
    }

    async fn top(&self, container_id: &str) -> Result<ProcessSnapshot> {
        self.enter(RuntimeOp::Top, container_id).await?;
        match self.state_of(container_id).await {
            Some(RuntimeState::Running) => Ok(ProcessSnapshot {
                titles: vec!["PID".to_string(), "CMD".to_string()],
                processes: vec![vec!["1".to_string(), "/bin/sh".to_string()]],
            }),
            Some(other) => Err(ContainerError::Other(format!(
                "container {} is {}, not running",
                container_id, other
            ))),
            None => Err(ContainerError::NotFound(container_id.to_string())),
        }
    }

    async fn status(&self, container_id: &str) -> Result<Option<RuntimeState>> {
        self.enter(RuntimeOp::Status, container_id).await?;
        Ok(self.state_of(container_id).await)
    }

    fn runtime_name(&self) -> &'static str {
        "mock"
    }
}
