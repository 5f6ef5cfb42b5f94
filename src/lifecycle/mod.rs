//! Container lifecycle orchestration.
//!
//! The [`LifecycleOrchestrator`] validates the caller and the container's
//! current status, dispatches to the runtime, records the new status and
//! answers with a uniform [`OperationResult`]. The [`StatusSynchronizer`]
//! realigns stored records with the runtime independently of user requests.
//!
//! # Example
//!
//! ```no_run
//! use paas_orchestrator::access::{Role, StaticAccessControl};
//! use paas_orchestrator::config::PlatformConfig;
//! use paas_orchestrator::container::MockRuntime;
//! use paas_orchestrator::lifecycle::{CreateRequest, LifecycleOrchestrator};
//! use paas_orchestrator::record::InMemoryContainerStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let acl = StaticAccessControl::new()
//!     .with_user("alice", Role::OrdinaryUser)
//!     .with_project("shop", "Web shop", "alice");
//! let orchestrator = LifecycleOrchestrator::new(
//!     Arc::new(MockRuntime::new()),
//!     Arc::new(InMemoryContainerStore::new()),
//!     Arc::new(acl),
//!     PlatformConfig::default(),
//! );
//!
//! let created = orchestrator
//!     .create("alice", CreateRequest::new("shop", "web", "nginx:latest"))
//!     .await;
//! let id = created.payload.unwrap().container_id;
//! orchestrator.start("alice", &id).await;
//! orchestrator.settle().await;
//! # }
//! ```

mod locks;
mod orchestrator;
mod result;
mod state;
mod sync;
mod terminal;
mod view;

#[cfg(test)]
mod tests;

pub use locks::ContainerLocks;
pub use orchestrator::{CreateRequest, LifecycleOrchestrator};
pub use result::{LifecycleError, OperationResult, ResultCode};
pub use state::Operation;
pub use sync::StatusSynchronizer;
pub use terminal::{TerminalRequest, TerminalSession};
pub use view::{ContainerView, EnumEntry, EnumListing};
