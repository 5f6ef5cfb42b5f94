//! Docker/Podman client wrapper.
//!
//! Provides a simplified interface to the bollard Docker API with connection
//! handling against either a configured remote endpoint or the local daemon.

use crate::container::{ContainerError, Result, RuntimeState};
use bollard::Docker;
use bollard::models::ContainerStateStatusEnum;
use std::sync::Arc;
use tracing::{debug, info};

/// Container client configuration.
#[derive(Debug, Clone)]
pub struct ContainerClientConfig {
    /// Remote engine endpoint (`tcp://host:port`); local daemon when `None`
    pub endpoint: Option<String>,
    /// Connection timeout in seconds
    pub timeout: u64,
}

impl Default for ContainerClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: 120,
        }
    }
}

/// Docker/Podman API client wrapper.
#[derive(Clone)]
pub struct ContainerClient {
    docker: Arc<Docker>,
}

impl ContainerClient {
    /// Connect with the given configuration and verify the daemon answers.
    ///
    /// # Errors
    ///
    /// Returns error if connection to container runtime fails.
    pub async fn with_config(config: ContainerClientConfig) -> Result<Self> {
        let docker = match config.endpoint.as_deref() {
            Some(endpoint) => Self::connect_remote(endpoint, config.timeout)?,
            None => Self::connect_local(config.timeout)?,
        };

        let client = Self {
            docker: Arc::new(docker),
        };

        client.ping().await?;

        Ok(client)
    }

    fn connect_remote(endpoint: &str, timeout: u64) -> Result<Docker> {
        debug!("Connecting to remote container runtime at {}", endpoint);

        let docker = Docker::connect_with_http(endpoint, timeout, bollard::API_DEFAULT_VERSION)
            .map_err(|e| {
                ContainerError::ConnectionError(format!(
                    "Failed to connect to {}: {}",
                    endpoint, e
                ))
            })?;

        info!("Connected to container runtime at {}", endpoint);
        Ok(docker)
    }

    /// Tries local defaults first, then the rootless and system Podman sockets.
    fn connect_local(timeout: u64) -> Result<Docker> {
        debug!("Attempting to connect to local container runtime...");

        match Docker::connect_with_local_defaults() {
            Ok(docker) => {
                info!("Connected to container runtime via local defaults");
                return Ok(docker);
            }
            Err(e) => {
                debug!("Local defaults failed: {}", e);
            }
        }

        #[cfg(unix)]
        {
            let mut sockets = Vec::new();
            if let Ok(home) = std::env::var("HOME") {
                sockets.push(format!("unix://{}/run/podman/podman.sock", home));
            }
            sockets.push("unix:///run/podman/podman.sock".to_string());

            for socket in sockets {
                debug!("Trying Podman socket: {}", socket);
                match Docker::connect_with_socket(&socket, timeout, bollard::API_DEFAULT_VERSION) {
                    Ok(docker) => {
                        info!("Connected to Podman via {}", socket);
                        return Ok(docker);
                    }
                    Err(e) => {
                        debug!("Podman socket {} failed: {}", socket, e);
                    }
                }
            }
        }

        Err(ContainerError::ConnectionError(
            "Failed to connect to Docker or Podman. Please ensure Docker or Podman is installed and running.".to_string()
        ))
    }

    /// Ping the container runtime to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns error if ping fails.
    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await.map_err(|e| {
            ContainerError::ConnectionError(format!("Failed to ping container runtime: {}", e))
        })?;
        debug!("Container runtime ping successful");
        Ok(())
    }

    /// Get version information from the container runtime.
    ///
    /// # Errors
    ///
    /// Returns error if version query fails.
    pub async fn version(&self) -> Result<bollard::models::SystemVersion> {
        self.docker
            .version()
            .await
            .map_err(|e| ContainerError::Other(format!("Failed to get version: {}", e)))
    }

    /// Get the underlying Docker client.
    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    /// Check if the runtime is Docker or Podman.
    ///
    /// # Errors
    ///
    /// Returns error if runtime detection fails.
    pub async fn runtime_type(&self) -> Result<RuntimeType> {
        let version = self.version().await?;

        if version
            .components
            .and_then(|comps| {
                comps
                    .iter()
                    .find(|c| c.name == "Engine")
                    .map(|c| c.version.clone())
            })
            .filter(|name| name.to_lowercase().contains("podman"))
            .is_some()
        {
            return Ok(RuntimeType::Podman);
        }

        Ok(RuntimeType::Docker)
    }

    /// Get the live state of a container by name or ID.
    ///
    /// Returns `Ok(None)` when the engine no longer knows the container.
    ///
    /// # Errors
    ///
    /// Returns error if inspection fails for reasons other than not found.
    pub async fn container_state(&self, name_or_id: &str) -> Result<Option<RuntimeState>> {
        let inspect = match self
            .docker
            .inspect_container(
                name_or_id,
                None::<bollard::query_parameters::InspectContainerOptions>,
            )
            .await
        {
            Ok(inspect) => inspect,
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => return Ok(None),
            Err(e) => return Err(ContainerError::ApiError(e)),
        };

        let state = inspect.state.ok_or_else(|| {
            ContainerError::Other(format!("Container {} has no state", name_or_id))
        })?;

        let runtime_state = match state.status {
            Some(ContainerStateStatusEnum::CREATED) => RuntimeState::Created,
            Some(ContainerStateStatusEnum::RUNNING) => RuntimeState::Running,
            Some(ContainerStateStatusEnum::PAUSED) => RuntimeState::Paused,
            Some(ContainerStateStatusEnum::RESTARTING) => RuntimeState::Restarting,
            Some(ContainerStateStatusEnum::REMOVING) => RuntimeState::Removing,
            Some(ContainerStateStatusEnum::EXITED) => RuntimeState::Exited,
            Some(ContainerStateStatusEnum::DEAD) => RuntimeState::Dead,
            // A paused container also reports running=true, so check paused first.
            _ if state.paused.unwrap_or(false) => RuntimeState::Paused,
            _ if state.running.unwrap_or(false) => RuntimeState::Running,
            _ if state.restarting.unwrap_or(false) => RuntimeState::Restarting,
            _ if state.dead.unwrap_or(false) => RuntimeState::Dead,
            Some(other) => RuntimeState::Other(other.to_string()),
            None => RuntimeState::Exited,
        };

        Ok(Some(runtime_state))
    }
}

/// Type of container runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    /// Docker runtime
    Docker,
    /// Podman runtime
    Podman,
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "Docker"),
            RuntimeType::Podman => write!(f, "Podman"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults_to_local_daemon() {
        let config = ContainerClientConfig::default();
        assert!(config.endpoint.is_none());
        assert_eq!(config.timeout, 120);
    }

    #[tokio::test]
    #[ignore] // Requires Docker/Podman to be running
    async fn test_client_connection() {
        let client = ContainerClient::with_config(ContainerClientConfig::default())
            .await
            .unwrap();
        client.ping().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_missing_container_has_no_state() {
        let client = ContainerClient::with_config(ContainerClientConfig::default())
            .await
            .unwrap();
        let state = client
            .container_state("paas-orchestrator-no-such-container")
            .await
            .unwrap();
        assert!(state.is_none());
    }
}
