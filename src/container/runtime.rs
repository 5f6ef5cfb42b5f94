//! The runtime driver contract.

use crate::container::{ContainerConfig, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Live state of a container as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeState {
    /// Created but never started
    Created,
    /// Container is running
    Running,
    /// Container is paused
    Paused,
    /// Container is restarting
    Restarting,
    /// Container has exited
    Exited,
    /// Container is being removed
    Removing,
    /// Container is dead
    Dead,
    /// Any state string this adapter does not know
    Other(String),
}

impl RuntimeState {
    /// Parse the engine's state vocabulary (`docker inspect .State.Status`).
    pub fn from_engine(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "exited" => Self::Exited,
            "removing" => Self::Removing,
            "dead" => Self::Dead,
            _ => Self::Other(state.to_string()),
        }
    }
}

impl std::fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeState::Created => write!(f, "created"),
            RuntimeState::Running => write!(f, "running"),
            RuntimeState::Paused => write!(f, "paused"),
            RuntimeState::Restarting => write!(f, "restarting"),
            RuntimeState::Exited => write!(f, "exited"),
            RuntimeState::Removing => write!(f, "removing"),
            RuntimeState::Dead => write!(f, "dead"),
            RuntimeState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Process table of a running container (`docker top`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    /// Column titles (UID, PID, CMD, ...)
    pub titles: Vec<String>,
    /// One row per process, aligned with `titles`
    pub processes: Vec<Vec<String>>,
}

/// Remote container runtime consumed by the orchestrator.
///
/// Every call either succeeds or returns a [`ContainerError`](crate::container::ContainerError);
/// implementations are responsible for their own call timeouts.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container and return its runtime-assigned ID.
    async fn create(&self, config: &ContainerConfig, name: &str) -> Result<String>;

    /// Start a created or stopped container.
    async fn start(&self, container_id: &str) -> Result<()>;

    /// Gracefully stop a container.
    async fn stop(&self, container_id: &str) -> Result<()>;

    /// Freeze all processes of a running container.
    async fn pause(&self, container_id: &str) -> Result<()>;

    /// Resume a paused container.
    async fn unpause(&self, container_id: &str) -> Result<()>;

    /// Force-stop a container.
    async fn kill(&self, container_id: &str) -> Result<()>;

    /// Restart a container.
    async fn restart(&self, container_id: &str) -> Result<()>;

    /// Remove a container.
    async fn remove(&self, container_id: &str) -> Result<()>;

    /// List the processes of a running container.
    async fn top(&self, container_id: &str) -> Result<ProcessSnapshot>;

    /// Query the live state. `Ok(None)` means the container no longer exists.
    async fn status(&self, container_id: &str) -> Result<Option<RuntimeState>>;

    /// Name of the runtime for logging.
    fn runtime_name(&self) -> &'static str;
}
