use paas_orchestrator::{PlatformConfig, Role, StaticAccessControl};
use paas_orchestrator::access::AccessControl;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_config_file_operations() {
    let original_config = PlatformConfig {
        use_local_daemon: false,
        docker_address: "10.0.0.8".to_string(),
        store_path: Some(PathBuf::from("/var/lib/paas/containers.json")),
        ..Default::default()
    };

    let temp_file = NamedTempFile::new().expect("Should be able to create temporary file");
    let temp_path = temp_file.path();

    original_config
        .to_toml_file(temp_path)
        .expect("Should be able to save config to file");

    let loaded_config =
        PlatformConfig::from_toml_file(temp_path).expect("Should be able to load config from file");

    assert_eq!(original_config, loaded_config);
    assert_eq!(
        loaded_config.docker_endpoint().as_deref(),
        Some("tcp://10.0.0.8:2375")
    );
}

#[test]
fn test_partial_config_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("paas.toml");
    std::fs::write(
        &path,
        r#"
server_ip = "172.16.0.1"
server_port = 8088
kill_signal = "SIGTERM"
"#,
    )
    .unwrap();

    let config = PlatformConfig::from_toml_file(&path).unwrap();
    assert_eq!(config.server_ip, "172.16.0.1");
    assert_eq!(config.server_port, 8088);
    assert_eq!(config.kill_signal, "SIGTERM");
    assert_eq!(config.gateway_port, 37766);
    assert!(config.use_local_daemon);
}

#[test]
fn test_invalid_config_reports_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "server_port = \"not a number\"").unwrap();

    let err = PlatformConfig::from_toml_file(&path).unwrap_err();
    assert!(err.to_string().contains("broken.toml"));
}

#[tokio::test]
async fn test_access_file_loading() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("access.toml");
    std::fs::write(
        &path,
        r#"
[[users]]
id = "alice"
role = "ordinary_user"

[[users]]
id = "ops"
role = "system_admin"

[[projects]]
id = "shop"
name = "Web shop"
owner = "alice"

[[projects]]
id = "blog"
name = "Blog"
owner = "alice"
"#,
    )
    .unwrap();

    let acl = StaticAccessControl::from_toml_file(&path).unwrap();
    assert_eq!(acl.resolve_role("ops").await, Some(Role::SystemAdmin));
    assert!(acl.owns_project("alice", "blog").await);
    let owned: Vec<_> = acl.projects_of("alice").iter().map(|p| p.id.as_str()).collect();
    assert_eq!(owned, vec!["blog", "shop"]);
}
