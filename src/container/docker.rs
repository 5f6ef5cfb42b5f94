//! [`ContainerRuntime`] over the Docker Engine API.
//!
//! Each call is bounded by the configured call timeout; an elapsed timeout is
//! reported as [`ContainerError::Timeout`].

use crate::config::PlatformConfig;
use crate::container::{
    ContainerClient, ContainerClientConfig, ContainerConfig, ContainerError, ContainerRuntime,
    ProcessSnapshot, Result, RuntimeState,
};
use async_trait::async_trait;
use bollard::models::{ContainerCreateBody, HostConfig, Mount, MountTypeEnum, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, KillContainerOptionsBuilder, RemoveContainerOptionsBuilder,
    RestartContainerOptionsBuilder, StartContainerOptions, StopContainerOptionsBuilder,
    TopOptionsBuilder,
};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Docker-backed runtime driver.
pub struct DockerRuntime {
    client: ContainerClient,
    stop_timeout: i32,
    restart_timeout: i32,
    call_timeout: Duration,
    kill_signal: String,
    top_ps_args: String,
}

impl DockerRuntime {
    /// Connect to the engine described by the platform configuration.
    ///
    /// # Errors
    ///
    /// Returns error if connection to container runtime fails.
    pub async fn connect(config: &PlatformConfig) -> Result<Self> {
        let client = ContainerClient::with_config(ContainerClientConfig {
            endpoint: config.docker_endpoint(),
            timeout: config.call_timeout_secs,
        })
        .await?;

        Ok(Self::with_client(client, config))
    }

    /// Build a runtime over an existing client.
    pub fn with_client(client: ContainerClient, config: &PlatformConfig) -> Self {
        Self {
            client,
            stop_timeout: engine_secs(config.stop_timeout_secs),
            restart_timeout: engine_secs(config.restart_timeout_secs),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            kill_signal: config.kill_signal.clone(),
            top_ps_args: config.top_ps_args.clone(),
        }
    }

    /// Get the underlying client.
    pub fn client(&self) -> &ContainerClient {
        &self.client
    }

    async fn call<T, F>(&self, operation: &'static str, container_id: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, bollard::errors::Error>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            })) => Err(ContainerError::NotFound(container_id.to_string())),
            Ok(Err(e)) => Err(ContainerError::ApiError(e)),
            Err(_) => Err(ContainerError::Timeout {
                operation,
                secs: self.call_timeout.as_secs(),
            }),
        }
    }

    fn create_body(config: &ContainerConfig) -> ContainerCreateBody {
        ContainerCreateBody {
            image: Some(config.image.clone()),
            cmd: config.cmd.clone(),
            env: if config.env.is_empty() {
                None
            } else {
                Some(config.env.clone())
            },
            labels: if config.labels.is_empty() {
                None
            } else {
                Some(config.labels.clone())
            },
            host_config: Some(Self::host_config(config)),
            ..Default::default()
        }
    }

    fn host_config(config: &ContainerConfig) -> HostConfig {
        let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = config
            .port_bindings
            .iter()
            .map(|(port, host_port)| {
                (
                    port.clone(),
                    Some(vec![PortBinding {
                        host_ip: Some("0.0.0.0".to_string()),
                        host_port: Some(host_port.to_string()),
                    }]),
                )
            })
            .collect();

        let mounts: Vec<Mount> = config
            .volumes
            .iter()
            .map(|destination| Mount {
                target: Some(destination.clone()),
                typ: Some(MountTypeEnum::VOLUME),
                ..Default::default()
            })
            .collect();

        HostConfig {
            port_bindings: if port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            mounts: if mounts.is_empty() { None } else { Some(mounts) },
            ..Default::default()
        }
    }
}

/// Engine timeouts are `i32` seconds; out-of-range values saturate.
fn engine_secs(secs: i64) -> i32 {
    secs.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create(&self, config: &ContainerConfig, name: &str) -> Result<String> {
        debug!("Creating container: {} from {}", name, config.image);

        let options = CreateContainerOptionsBuilder::new().name(name).build();

        let response = self
            .call(
                "create",
                name,
                self.client
                    .docker()
                    .create_container(Some(options), Self::create_body(config)),
            )
            .await?;

        info!("Created container: {} ({})", name, response.id);
        Ok(response.id)
    }

    async fn start(&self, container_id: &str) -> Result<()> {
        debug!("Starting container: {}", container_id);
        self.call(
            "start",
            container_id,
            self.client
                .docker()
                .start_container(container_id, None::<StartContainerOptions>),
        )
        .await?;
        info!("Started container: {}", container_id);
        Ok(())
    }

    async fn stop(&self, container_id: &str) -> Result<()> {
        debug!("Stopping container: {}", container_id);
        self.call(
            "stop",
            container_id,
            self.client.docker().stop_container(
                container_id,
                Some(StopContainerOptionsBuilder::new().t(self.stop_timeout).build()),
            ),
        )
        .await?;
        info!("Stopped container: {}", container_id);
        Ok(())
    }

    async fn pause(&self, container_id: &str) -> Result<()> {
        self.call(
            "pause",
            container_id,
            self.client.docker().pause_container(container_id),
        )
        .await?;
        info!("Paused container: {}", container_id);
        Ok(())
    }

    async fn unpause(&self, container_id: &str) -> Result<()> {
        self.call(
            "unpause",
            container_id,
            self.client.docker().unpause_container(container_id),
        )
        .await?;
        info!("Unpaused container: {}", container_id);
        Ok(())
    }

    async fn kill(&self, container_id: &str) -> Result<()> {
        self.call(
            "kill",
            container_id,
            self.client.docker().kill_container(
                container_id,
                Some(
                    KillContainerOptionsBuilder::new()
                        .signal(&self.kill_signal)
                        .build(),
                ),
            ),
        )
        .await?;
        info!("Killed container: {}", container_id);
        Ok(())
    }

    async fn restart(&self, container_id: &str) -> Result<()> {
        self.call(
            "restart",
            container_id,
            self.client.docker().restart_container(
                container_id,
                Some(
                    RestartContainerOptionsBuilder::new()
                        .t(self.restart_timeout)
                        .build(),
                ),
            ),
        )
        .await?;
        info!("Restarted container: {}", container_id);
        Ok(())
    }

    async fn remove(&self, container_id: &str) -> Result<()> {
        debug!("Removing container: {}", container_id);
        self.call(
            "remove",
            container_id,
            self.client.docker().remove_container(
                container_id,
                Some(
                    RemoveContainerOptionsBuilder::new()
                        .force(false)
                        .v(true) // Remove associated anonymous volumes
                        .build(),
                ),
            ),
        )
        .await?;
        info!("Removed container: {}", container_id);
        Ok(())
    }

    async fn top(&self, container_id: &str) -> Result<ProcessSnapshot> {
        let response = self
            .call(
                "top",
                container_id,
                self.client.docker().top_processes(
                    container_id,
                    Some(TopOptionsBuilder::new().ps_args(&self.top_ps_args).build()),
                ),
            )
            .await?;

        Ok(ProcessSnapshot {
            titles: response.titles.unwrap_or_default(),
            processes: response.processes.unwrap_or_default(),
        })
    }

    async fn status(&self, container_id: &str) -> Result<Option<RuntimeState>> {
        match tokio::time::timeout(
            self.call_timeout,
            self.client.container_state(container_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ContainerError::Timeout {
                operation: "status",
                secs: self.call_timeout.as_secs(),
            }),
        }
    }

    fn runtime_name(&self) -> &'static str {
        "docker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_config_maps_ports_and_volumes() {
        let config = ContainerConfig::builder()
            .image("nginx")
            .port_binding("80", 37766)
            .volume("/data")
            .build()
            .unwrap();

        let host_config = DockerRuntime::host_config(&config);

        let bindings = host_config.port_bindings.unwrap();
        let binding = bindings["80/tcp"].as_ref().unwrap();
        assert_eq!(binding[0].host_port.as_deref(), Some("37766"));

        let mounts = host_config.mounts.unwrap();
        assert_eq!(mounts[0].target.as_deref(), Some("/data"));
        assert_eq!(mounts[0].typ, Some(MountTypeEnum::VOLUME));
    }

    #[test]
    fn test_create_body_carries_command_env_and_labels() {
        let config = ContainerConfig::builder()
            .image("alpine:latest")
            .cmd(["sleep", "300"])
            .env("MODE", "prod")
            .label("paas.project", "p")
            .port_binding("80", 37766)
            .build()
            .unwrap();

        let body = DockerRuntime::create_body(&config);
        assert_eq!(body.image.as_deref(), Some("alpine:latest"));
        assert_eq!(
            body.cmd,
            Some(vec!["sleep".to_string(), "300".to_string()])
        );
        assert_eq!(body.env, Some(vec!["MODE=prod".to_string()]));
        assert_eq!(
            body.labels.unwrap().get("paas.project").map(String::as_str),
            Some("p")
        );
        assert!(body.host_config.unwrap().port_bindings.is_some());

        let bare = DockerRuntime::create_body(
            &ContainerConfig::builder().image("nginx").build().unwrap(),
        );
        assert!(bare.cmd.is_none());
        assert!(bare.env.is_none());
        assert!(bare.labels.is_none());
    }

    #[test]
    fn test_engine_secs_saturates() {
        assert_eq!(engine_secs(10), 10);
        assert_eq!(engine_secs(-1), -1);
        assert_eq!(engine_secs(i64::MAX), i32::MAX);
        assert_eq!(engine_secs(i64::MIN), i32::MIN);
    }

    #[test]
    fn test_host_config_empty_when_nothing_bound() {
        let config = ContainerConfig::builder().image("nginx").build().unwrap();
        let host_config = DockerRuntime::host_config(&config);
        assert!(host_config.port_bindings.is_none());
        assert!(host_config.mounts.is_none());
    }
}
