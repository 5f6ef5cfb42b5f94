//! Platform configuration.
//!
//! One explicit struct carries every setting the core needs (runtime
//! endpoint, gateway port, timeouts, store location). It is passed into the
//! components at construction; nothing reads ambient global state.

use crate::env;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write configuration: {0}")]
    Write(#[from] std::io::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,
}

/// Settings shared by the runtime adapter, the orchestrator and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Connect through the local daemon socket instead of `docker_address:docker_port`
    pub use_local_daemon: bool,
    /// Remote engine host
    pub docker_address: String,
    /// Remote engine port
    pub docker_port: u16,
    /// Host the exec gateway is reachable on
    pub server_ip: String,
    /// Port the exec gateway listens on
    pub server_port: u16,
    /// Host port every container's port 80 is published on
    pub gateway_port: u16,
    /// Grace period for stop, in seconds
    pub stop_timeout_secs: i64,
    /// Grace period for restart, in seconds
    pub restart_timeout_secs: i64,
    /// Upper bound for any single runtime call, in seconds
    pub call_timeout_secs: u64,
    /// Signal sent by kill
    pub kill_signal: String,
    /// `ps` arguments for top
    pub top_ps_args: String,
    /// Record store file; `paasctl` falls back to `~/.paas/containers.json`
    pub store_path: Option<PathBuf>,
    /// Users and projects file for the static access control
    pub access_file: Option<PathBuf>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            use_local_daemon: true,
            docker_address: "127.0.0.1".to_string(),
            docker_port: 2375,
            server_ip: "127.0.0.1".to_string(),
            server_port: 9999,
            gateway_port: env::DEFAULT_GATEWAY_PORT,
            stop_timeout_secs: 10,
            restart_timeout_secs: 10,
            call_timeout_secs: 120,
            kill_signal: "SIGKILL".to_string(),
            top_ps_args: "-ef".to_string(),
            store_path: None,
            access_file: None,
        }
    }
}

impl PlatformConfig {
    /// Engine endpoint, or `None` to use the local daemon.
    pub fn docker_endpoint(&self) -> Option<String> {
        if self.use_local_daemon {
            None
        } else {
            Some(format!("tcp://{}:{}", self.docker_address, self.docker_port))
        }
    }

    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::default();
        assert_eq!(config.gateway_port, 37766);
        assert!(config.docker_endpoint().is_none());
    }

    #[test]
    fn test_remote_endpoint() {
        let config = PlatformConfig {
            use_local_daemon: false,
            docker_address: "10.0.0.5".to_string(),
            docker_port: 2376,
            ..Default::default()
        };
        assert_eq!(
            config.docker_endpoint().as_deref(),
            Some("tcp://10.0.0.5:2376")
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PlatformConfig = toml::from_str("gateway_port = 40000\n").unwrap();
        assert_eq!(config.gateway_port, 40000);
        assert_eq!(config.kill_signal, "SIGKILL");
    }
}
