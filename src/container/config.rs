//! Container configuration builders.
//!
//! Provides a fluent API for describing a container to create. The
//! configuration is engine-neutral; the Docker adapter translates it into the
//! engine's create body.

use crate::container::{ContainerError, Result};
use std::collections::{BTreeMap, HashMap};

/// Container configuration builder.
pub struct ContainerConfigBuilder {
    image: Option<String>,
    cmd: Option<Vec<String>>,
    env: Vec<String>,
    labels: HashMap<String, String>,
    port_bindings: BTreeMap<String, u16>,
    volumes: Vec<String>,
}

impl Default for ContainerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerConfigBuilder {
    /// Create a new container configuration builder.
    pub fn new() -> Self {
        Self {
            image: None,
            cmd: None,
            env: Vec::new(),
            labels: HashMap::new(),
            port_bindings: BTreeMap::new(),
            volumes: Vec::new(),
        }
    }

    /// Set the container image.
    pub fn image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the command to run in the container.
    ///
    /// An empty command leaves the image's default command in place.
    pub fn cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cmd: Vec<String> = cmd.into_iter().map(|s| s.into()).collect();
        self.cmd = if cmd.is_empty() { None } else { Some(cmd) };
        self
    }

    /// Add an environment variable.
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push(format!("{}={}", key.into(), value.into()));
        self
    }

    /// Add raw `KEY=VALUE` environment entries.
    pub fn env_entries<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env.extend(entries.into_iter().map(|s| s.into()));
        self
    }

    /// Add a label to the container.
    pub fn label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add a port binding (container_port[/protocol] -> host_port).
    ///
    /// Ports without a protocol are bound as TCP.
    pub fn port_binding<S: Into<String>>(mut self, container_port: S, host_port: u16) -> Self {
        let port = container_port.into();
        let key = if port.contains('/') {
            port
        } else {
            format!("{}/tcp", port)
        };
        self.port_bindings.insert(key, host_port);
        self
    }

    /// Add an anonymous volume mounted at a container path.
    pub fn volume<S: Into<String>>(mut self, destination: S) -> Self {
        self.volumes.push(destination.into());
        self
    }

    /// Build the container configuration.
    ///
    /// # Errors
    ///
    /// Returns error if required fields are missing or invalid.
    pub fn build(self) -> Result<ContainerConfig> {
        let image = self
            .image
            .filter(|image| !image.trim().is_empty())
            .ok_or_else(|| ContainerError::ConfigError("Image is required".to_string()))?;

        if let Some(bad) = self.env.iter().find(|entry| !entry.contains('=')) {
            return Err(ContainerError::ConfigError(format!(
                "Environment entry '{}' is not KEY=VALUE",
                bad
            )));
        }

        if let Some(bad) = self.volumes.iter().find(|dest| !dest.starts_with('/')) {
            return Err(ContainerError::ConfigError(format!(
                "Volume destination '{}' must be an absolute path",
                bad
            )));
        }

        Ok(ContainerConfig {
            image,
            cmd: self.cmd,
            env: self.env,
            labels: self.labels,
            port_bindings: self.port_bindings,
            volumes: self.volumes,
        })
    }
}

/// Container configuration.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Image name or ID
    pub image: String,
    /// Command to run, `None` for the image default
    pub cmd: Option<Vec<String>>,
    /// Environment variables as `KEY=VALUE`
    pub env: Vec<String>,
    /// Labels
    pub labels: HashMap<String, String>,
    /// `port/proto` -> host port
    pub port_bindings: BTreeMap<String, u16>,
    /// Anonymous volume destinations
    pub volumes: Vec<String>,
}

impl ContainerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ContainerConfigBuilder {
        ContainerConfigBuilder::new()
    }
}
