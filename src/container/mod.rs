//! Runtime driver adapter.
//!
//! This module is the only part of the crate that talks to a container
//! engine. Everything above it (the lifecycle orchestrator and the status
//! synchronizer) consumes the [`ContainerRuntime`] trait, so the engine can be
//! swapped for the in-memory [`MockRuntime`] in tests and dry runs.
//!
//! ## Components
//!
//! - [`runtime`]: the [`ContainerRuntime`] trait, runtime states and process snapshots
//! - [`config`]: container creation configuration builder
//! - [`client`]: Docker/Podman API client wrapper with connection management
//! - [`docker`]: [`ContainerRuntime`] implementation over the Docker Engine API
//! - [`mock`]: in-memory runtime with failure injection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paas_orchestrator::container::{ContainerConfig, ContainerRuntime, DockerRuntime};
//! use paas_orchestrator::PlatformConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = DockerRuntime::connect(&PlatformConfig::default()).await?;
//!
//!     let config = ContainerConfig::builder()
//!         .image("nginx:alpine")
//!         .port_binding("80", 37766)
//!         .build()?;
//!
//!     let id = runtime.create(&config, "web-1").await?;
//!     runtime.start(&id).await?;
//!     println!("{:?}", runtime.status(&id).await?);
//!     Ok(())
//! }
//! ```

mod config;
mod mock;
mod runtime;

#[cfg(feature = "docker")]
mod client;
#[cfg(feature = "docker")]
mod docker;

pub use config::{ContainerConfig, ContainerConfigBuilder};
pub use mock::{MockRuntime, RuntimeOp};
pub use runtime::{ContainerRuntime, ProcessSnapshot, RuntimeState};

#[cfg(feature = "docker")]
pub use client::{ContainerClient, ContainerClientConfig, RuntimeType};
#[cfg(feature = "docker")]
pub use docker::DockerRuntime;

/// Container runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Docker/Podman API error
    #[cfg(feature = "docker")]
    #[error("Container API error: {0}")]
    ApiError(#[from] bollard::errors::Error),

    /// Container not found
    #[error("Container not found: {0}")]
    NotFound(String),

    /// Container configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Runtime call did not complete in time
    #[error("Runtime call '{operation}' timed out after {secs}s")]
    Timeout {
        operation: &'static str,
        secs: u64,
    },

    /// Connection to the runtime could not be established
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// General error
    #[error("Container error: {0}")]
    Other(String),
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
