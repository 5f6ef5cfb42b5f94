use crate::config::PlatformConfig;
use crate::env;
use serde::{Deserialize, Serialize};
use url::Url;

/// Parameters of an exec terminal session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalRequest {
    pub container_id: String,
    pub cursor_blink: bool,
    pub cols: u32,
    pub rows: u32,
    pub width: u32,
    pub height: u32,
}

impl TerminalRequest {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            ..Default::default()
        }
    }
}

impl Default for TerminalRequest {
    fn default() -> Self {
        Self {
            container_id: String::new(),
            cursor_blink: false,
            cols: 100,
            rows: 50,
            width: 100,
            height: 50,
        }
    }
}

/// Connection descriptor handed to the terminal client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSession {
    pub cursor_blink: bool,
    pub cols: u32,
    pub rows: u32,
    pub url: String,
}

impl TerminalSession {
    pub(crate) fn build(
        request: &TerminalRequest,
        config: &PlatformConfig,
    ) -> Result<Self, url::ParseError> {
        let mut url = Url::parse(&format!(
            "ws://{}:{}",
            config.server_ip, config.server_port
        ))?;
        url.set_path(env::TERMINAL_WS_PATH);
        url.query_pairs_mut()
            .append_pair("width", &request.width.to_string())
            .append_pair("height", &request.height.to_string())
            .append_pair("ip", &config.docker_address)
            .append_pair("port", &config.docker_port.to_string())
            .append_pair("containerId", &request.container_id);

        Ok(Self {
            cursor_blink: request.cursor_blink,
            cols: request.cols,
            rows: request.rows,
            url: url.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_url() {
        let config = PlatformConfig {
            server_ip: "10.1.1.1".to_string(),
            server_port: 9999,
            docker_address: "10.1.1.2".to_string(),
            docker_port: 2375,
            ..Default::default()
        };
        let session = TerminalSession::build(&TerminalRequest::new("abc123"), &config).unwrap();

        assert!(!session.cursor_blink);
        assert_eq!(session.cols, 100);
        assert_eq!(session.rows, 50);
        assert_eq!(
            session.url,
            "ws://10.1.1.1:9999/ws/container/exec?width=100&height=50&ip=10.1.1.2&port=2375&containerId=abc123"
        );
    }

    #[test]
    fn test_request_defaults_fill_missing_fields() {
        let request: TerminalRequest =
            serde_json::from_str(r#"{"container_id":"c1","cols":120}"#).unwrap();
        assert_eq!(request.cols, 120);
        assert_eq!(request.rows, 50);
        assert_eq!(request.width, 100);
    }
}
