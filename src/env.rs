//! Environment constants and path utilities for the platform.
//!
//! This module centralizes the hardcoded paths, file names and reserved ports
//! used throughout the crate.

use std::path::{Path, PathBuf};

/// Platform directory name (hidden directory like .git, .vscode)
pub const PAAS_DIR_NAME: &str = ".paas";

/// Configuration file name inside the platform directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name in the working directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "paas.toml";

/// System-wide configuration file
#[cfg(unix)]
pub const SYSTEM_CONFIG_FILE: &str = "/etc/paas/config.toml";

/// Record store file name
pub const STORE_FILE_NAME: &str = "containers.json";

/// Host port reserved for the platform's terminal/exec gateway; every
/// container publishes its port 80 there.
pub const DEFAULT_GATEWAY_PORT: u16 = 37766;

/// Container port routed to the gateway
pub const GATEWAY_CONTAINER_PORT: &str = "80";

/// Exec gateway websocket path
pub const TERMINAL_WS_PATH: &str = "/ws/container/exec";

/// Label carrying the owning project on created containers
pub const PROJECT_LABEL: &str = "paas.project.id";

/// Label carrying the owning user on created containers
pub const OWNER_LABEL: &str = "paas.owner.id";

/// Build the platform directory path from a root
pub fn paas_dir_path(root: &Path) -> PathBuf {
    root.join(PAAS_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    paas_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    paas_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

/// Build the default record store path under a root
pub fn store_file_path(root: &Path) -> PathBuf {
    paas_dir_path(root).join(STORE_FILE_NAME)
}
