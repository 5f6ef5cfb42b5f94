//! # PaaS Orchestrator
//!
//! Container lifecycle orchestration core of a multi-tenant PaaS control
//! plane. Users provision and operate containers scoped to projects; this
//! crate reconciles the user-facing lifecycle against the real state of the
//! container runtime, enforces permission and status guards before every
//! transition, and keeps a local record store in step with runtime truth.
//!
//! ## Architecture Overview
//!
//! - **[`container`]**: runtime adapter (Docker through `bollard`, plus an in-memory mock)
//! - **[`access`]**: caller roles, project ownership and the permission guard
//! - **[`record`]**: container records and their stores
//! - **[`lifecycle`]**: the orchestrator, its state machine and the status synchronizer
//! - **[`config`]** / **[`env`]**: platform settings and well-known paths
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paas_orchestrator::access::{Role, StaticAccessControl};
//! use paas_orchestrator::container::DockerRuntime;
//! use paas_orchestrator::lifecycle::{CreateRequest, LifecycleOrchestrator};
//! use paas_orchestrator::record::JsonFileContainerStore;
//! use paas_orchestrator::PlatformConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PlatformConfig::default();
//!     let runtime = DockerRuntime::connect(&config).await?;
//!     let store = JsonFileContainerStore::open("/var/lib/paas/containers.json").await?;
//!     let acl = StaticAccessControl::new()
//!         .with_user("alice", Role::OrdinaryUser)
//!         .with_project("shop", "Web shop", "alice");
//!
//!     let orchestrator =
//!         LifecycleOrchestrator::new(Arc::new(runtime), Arc::new(store), Arc::new(acl), config);
//!
//!     let created = orchestrator
//!         .create("alice", CreateRequest::new("shop", "web", "nginx:latest"))
//!         .await;
//!     println!("{}", created.message);
//!     Ok(())
//! }
//! ```

/// Caller roles, project ownership and permission checks.
pub mod access;

/// Command line interface for `paasctl`.
pub mod cli;

/// Platform configuration.
pub mod config;

/// Container runtime adapter.
///
/// Engine-neutral runtime trait with a Docker/Podman implementation and an
/// in-memory runtime for tests and dry runs.
pub mod container;

/// Environment constants and path utilities.
///
/// Centralizes all hardcoded paths and reserved ports used throughout
/// the application for easier maintenance and consistency.
pub mod env;

/// Lifecycle orchestration and status synchronization.
pub mod lifecycle;

/// Container records and stores.
pub mod record;

pub use access::{AccessControl, PermissionGuard, Role, StaticAccessControl};
pub use config::{ConfigError, PlatformConfig};
pub use container::{ContainerError, ContainerRuntime, MockRuntime, RuntimeState};
pub use lifecycle::{
    CreateRequest, LifecycleError, LifecycleOrchestrator, OperationResult, ResultCode,
    StatusSynchronizer, TerminalRequest, TerminalSession,
};
pub use record::{
    ContainerRecord, ContainerStore, InMemoryContainerStore, JsonFileContainerStore,
    LifecycleStatus, Page, PageRequest, StoreError,
};
