//! CLI-specific functionality for `paasctl`
//!
//! This module contains argument parsing, configuration discovery and the
//! wiring that turns a parsed command into an orchestrator call.

pub mod args;
pub mod config;
pub mod runner;

pub use args::{Args, Commands};
pub use config::ConfigDiscovery;
pub use runner::{build_orchestrator, execute, load_config};
