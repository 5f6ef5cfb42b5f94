use super::*;
use crate::access::{Role, StaticAccessControl};
use crate::config::PlatformConfig;
use crate::container::{MockRuntime, RuntimeOp, RuntimeState};
use crate::record::{
    ContainerRecord, ContainerStore, InMemoryContainerStore, LifecycleStatus, PageRequest,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    runtime: Arc<MockRuntime>,
    store: Arc<InMemoryContainerStore>,
    orchestrator: LifecycleOrchestrator,
}

fn fixture_with(runtime: MockRuntime) -> Fixture {
    let acl = StaticAccessControl::new()
        .with_user("u", Role::OrdinaryUser)
        .with_user("v", Role::OrdinaryUser)
        .with_user("admin", Role::SystemAdmin)
        .with_project("p", "Project P", "u")
        .with_project("q", "Project Q", "v");
    let runtime = Arc::new(runtime);
    let store = Arc::new(InMemoryContainerStore::new());
    let orchestrator = LifecycleOrchestrator::new(
        runtime.clone(),
        store.clone(),
        Arc::new(acl),
        PlatformConfig::default(),
    );
    Fixture {
        runtime,
        store,
        orchestrator,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockRuntime::new())
}

impl Fixture {
    async fn create(&self, user: &str, project: &str, name: &str) -> String {
        let result = self
            .orchestrator
            .create(user, CreateRequest::new(project, name, "nginx:latest"))
            .await;
        assert!(result.is_ok(), "create failed: {}", result.message);
        result.payload.unwrap().container_id
    }

    async fn running(&self, user: &str, project: &str, name: &str) -> String {
        let id = self.create(user, project, name).await;
        assert!(self.orchestrator.start(user, &id).await.is_ok());
        self.orchestrator.settle().await;
        id
    }

    async fn status(&self, id: &str) -> LifecycleStatus {
        self.store.get(id).await.unwrap().unwrap().status
    }
}

#[tokio::test]
async fn test_create_maps_gateway_port() {
    let f = fixture();
    let result = f
        .orchestrator
        .create("u", CreateRequest::new("p", "web", "nginx:latest"))
        .await;

    assert_eq!(result.code, ResultCode::Ok);
    let record = result.payload.unwrap();
    assert_eq!(record.status, LifecycleStatus::Created);
    assert_eq!(record.owner_user_id, "u");
    assert_eq!(record.port_map.len(), 1);
    assert_eq!(record.port_map.get("80"), Some(&37766));
}

#[tokio::test]
async fn test_create_overrides_caller_port_80() {
    let f = fixture();
    let mut request = CreateRequest::new("p", "web", "nginx:latest");
    request.port_map.insert("80".to_string(), 8080);
    request.port_map.insert("80/tcp".to_string(), 8081);
    request.port_map.insert("443".to_string(), 8443);

    let record = f.orchestrator.create("u", request).await.payload.unwrap();
    assert_eq!(record.port_map.len(), 2);
    assert_eq!(record.port_map.get("80"), Some(&37766));
    assert_eq!(record.port_map.get("443"), Some(&8443));
}

#[tokio::test]
async fn test_create_validation() {
    let f = fixture();

    let blank = f
        .orchestrator
        .create("u", CreateRequest::new("p", "  ", "nginx"))
        .await;
    assert_eq!(blank.code, ResultCode::ParamError);

    let mut bad_env = CreateRequest::new("p", "web", "nginx");
    bad_env.env.push("NO_EQUALS".to_string());
    assert_eq!(
        f.orchestrator.create("u", bad_env).await.code,
        ResultCode::ParamError
    );

    let foreign = f
        .orchestrator
        .create("v", CreateRequest::new("p", "web", "nginx"))
        .await;
    assert_eq!(foreign.code, ResultCode::PermissionError);

    // Admins operate containers but never create them.
    let by_admin = f
        .orchestrator
        .create("admin", CreateRequest::new("p", "web", "nginx"))
        .await;
    assert_eq!(by_admin.code, ResultCode::PermissionError);

    assert_eq!(f.runtime.container_count().await, 0);
}

#[tokio::test]
async fn test_create_runtime_failure_leaves_no_record() {
    let f = fixture();
    f.runtime.fail_on(RuntimeOp::Create, None).await;

    let result = f
        .orchestrator
        .create("u", CreateRequest::new("p", "web", "nginx"))
        .await;
    assert_eq!(result.code, ResultCode::DockerOperationError);
    assert!(f.store.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_owner_scenario() {
    let f = fixture();
    let id = f.create("u", "p", "web").await;

    let start = f.orchestrator.start("u", &id).await;
    assert!(start.is_ok());
    assert_eq!(start.message, "starting");
    f.orchestrator.settle().await;
    assert_eq!(f.status(&id).await, LifecycleStatus::Start);

    let paused = f.orchestrator.pause("u", &id).await;
    assert_eq!(paused.payload.unwrap().status, LifecycleStatus::Pause);

    let intruder = f.orchestrator.pause("v", &id).await;
    assert_eq!(intruder.code, ResultCode::PermissionError);
    assert_eq!(f.status(&id).await, LifecycleStatus::Pause);
}

#[tokio::test]
async fn test_pause_refused_when_stopped() {
    let f = fixture();
    let id = f.running("u", "p", "web").await;
    assert!(f.orchestrator.stop("u", &id).await.is_ok());

    let result = f.orchestrator.pause("u", &id).await;
    assert_eq!(result.code, ResultCode::ContainerStatusRefuse);
    assert_eq!(f.status(&id).await, LifecycleStatus::Stop);
    assert_eq!(f.runtime.call_count(RuntimeOp::Pause).await, 0);
}

#[tokio::test]
async fn test_start_refused_when_running() {
    let f = fixture();
    let id = f.running("u", "p", "web").await;

    let again = f.orchestrator.start("u", &id).await;
    assert_eq!(again.code, ResultCode::ContainerStatusRefuse);
    assert_eq!(f.runtime.call_count(RuntimeOp::Start).await, 1);
}

#[tokio::test]
async fn test_failed_start_keeps_record() {
    let f = fixture();
    let id = f.create("u", "p", "web").await;
    f.runtime.fail_on(RuntimeOp::Start, Some(&id)).await;

    assert!(f.orchestrator.start("u", &id).await.is_ok());
    f.orchestrator.settle().await;
    assert_eq!(f.status(&id).await, LifecycleStatus::Created);
}

#[tokio::test]
async fn test_operations_wait_for_in_flight_start() {
    let f = fixture_with(MockRuntime::new().with_start_delay(Duration::from_millis(100)));
    let id = f.create("u", "p", "web").await;

    assert!(f.orchestrator.start("u", &id).await.is_ok());
    assert_eq!(f.status(&id).await, LifecycleStatus::Created);

    // Pause waits for the start to release the lock, then sees Start.
    let paused = f.orchestrator.pause("u", &id).await;
    assert_eq!(paused.code, ResultCode::Ok);
    assert_eq!(f.status(&id).await, LifecycleStatus::Pause);
}

#[tokio::test]
async fn test_continue_stop_kill_restart() {
    let f = fixture();
    let id = f.running("u", "p", "web").await;

    assert!(f.orchestrator.pause("u", &id).await.is_ok());
    assert_eq!(
        f.orchestrator.continue_run("u", &id).await.payload.unwrap().status,
        LifecycleStatus::Start
    );
    assert_eq!(
        f.orchestrator.continue_run("u", &id).await.code,
        ResultCode::ContainerStatusRefuse
    );

    assert_eq!(
        f.orchestrator.kill("u", &id).await.payload.unwrap().status,
        LifecycleStatus::Stop
    );
    assert_eq!(
        f.orchestrator.stop("u", &id).await.code,
        ResultCode::ContainerStatusRefuse
    );
    assert_eq!(
        f.orchestrator.restart("u", &id).await.payload.unwrap().status,
        LifecycleStatus::Start
    );
}

#[tokio::test]
async fn test_restart_refused_on_created() {
    let f = fixture();
    let id = f.create("u", "p", "web").await;
    assert_eq!(
        f.orchestrator.restart("u", &id).await.code,
        ResultCode::ContainerStatusRefuse
    );
}

#[tokio::test]
async fn test_runtime_failure_leaves_status() {
    let f = fixture();
    let id = f.running("u", "p", "web").await;
    f.runtime.fail_on(RuntimeOp::Stop, None).await;

    let result = f.orchestrator.stop("u", &id).await;
    assert_eq!(result.code, ResultCode::DockerOperationError);
    assert_eq!(f.status(&id).await, LifecycleStatus::Start);
}

#[tokio::test]
async fn test_top_requires_running() {
    let f = fixture();
    let id = f.create("u", "p", "web").await;
    assert_eq!(
        f.orchestrator.top("u", &id).await.code,
        ResultCode::ContainerStatusRefuse
    );

    f.orchestrator.start("u", &id).await;
    f.orchestrator.settle().await;
    let snapshot = f.orchestrator.top("u", &id).await.payload.unwrap();
    assert_eq!(snapshot.titles, vec!["PID", "CMD"]);
    assert_eq!(f.status(&id).await, LifecycleStatus::Start);
}

#[tokio::test]
async fn test_remove_guarded_by_status() {
    let f = fixture();
    let id = f.running("u", "p", "web").await;

    assert_eq!(
        f.orchestrator.remove("u", &id).await.code,
        ResultCode::ContainerStatusRefuse
    );
    assert_eq!(f.runtime.call_count(RuntimeOp::Remove).await, 0);

    assert!(f.orchestrator.stop("u", &id).await.is_ok());
    assert!(f.orchestrator.remove("u", &id).await.is_ok());
    assert_eq!(
        f.orchestrator.get_by_id("u", &id).await.code,
        ResultCode::ContainerNotFound
    );
    assert_eq!(f.runtime.container_count().await, 0);
}

#[tokio::test]
async fn test_remove_of_container_gone_from_runtime() {
    let f = fixture();
    let id = f.create("u", "p", "web").await;
    f.runtime.forget(&id).await;

    assert!(f.orchestrator.remove("u", &id).await.is_ok());
    assert!(f.store.get(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_status_is_non_actionable() {
    let f = fixture();
    let id = f.running("u", "p", "web").await;
    f.runtime
        .set_state(&id, RuntimeState::Other("migrating".to_string()))
        .await;
    f.orchestrator.sync_status(None).await;
    assert_eq!(f.status(&id).await, LifecycleStatus::Unknown);

    for result in [
        f.orchestrator.pause("u", &id).await.code,
        f.orchestrator.stop("u", &id).await.code,
        f.orchestrator.restart("u", &id).await.code,
        f.orchestrator.start("u", &id).await.code,
    ] {
        assert_eq!(result, ResultCode::ContainerStatusRefuse);
    }
    assert!(f.orchestrator.kill("u", &id).await.is_ok());
}

#[tokio::test]
async fn test_get_by_id_view() {
    let f = fixture();
    let id = f.create("u", "p", "web").await;

    let view = f.orchestrator.get_by_id("u", &id).await.payload.unwrap();
    assert_eq!(view.project_name.as_deref(), Some("Project P"));
    assert_eq!(view.status_name, "Created");

    assert_eq!(
        f.orchestrator.get_by_id("v", &id).await.code,
        ResultCode::PermissionError
    );
    assert!(f.orchestrator.get_by_id("admin", &id).await.is_ok());
    assert_eq!(
        f.orchestrator.get_by_id("ghost", &id).await.code,
        ResultCode::AuthorityError
    );
}

#[tokio::test]
async fn test_listing_by_role() {
    let f = fixture();
    f.create("u", "p", "a").await;
    f.create("u", "p", "b").await;
    f.create("v", "q", "c").await;

    let own = f.orchestrator.list("u", PageRequest::new(1, 10)).await;
    assert_eq!(own.payload.unwrap().total, 2);

    let all = f.orchestrator.list("admin", PageRequest::new(1, 10)).await;
    assert_eq!(all.payload.unwrap().total, 3);

    let paged = f
        .orchestrator
        .list("admin", PageRequest::new(2, 2))
        .await
        .payload
        .unwrap();
    assert_eq!(paged.records.len(), 1);
    assert_eq!(paged.records[0].name, "c");

    assert_eq!(
        f.orchestrator.list("u", PageRequest::new(0, 10)).await.code,
        ResultCode::ParamError
    );
    assert_eq!(
        f.orchestrator.list("ghost", PageRequest::new(1, 10)).await.code,
        ResultCode::AuthorityError
    );
}

#[tokio::test]
async fn test_list_by_project() {
    let f = fixture();
    f.create("u", "p", "a").await;
    f.create("v", "q", "c").await;

    let page = f
        .orchestrator
        .list_by_project("u", "p", PageRequest::default())
        .await
        .payload
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].project_name.as_deref(), Some("Project P"));

    assert_eq!(
        f.orchestrator
            .list_by_project("u", "q", PageRequest::default())
            .await
            .code,
        ResultCode::PermissionError
    );
    assert!(
        f.orchestrator
            .list_by_project("admin", "q", PageRequest::default())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_list_by_user_never_leaks() {
    let f = fixture();
    f.create("u", "p", "a").await;
    f.create("v", "q", "c").await;
    // In u's project but owned by someone else.
    f.store
        .insert(stray_record("admin-owned", "p", "admin"))
        .await
        .unwrap();

    let for_u = f
        .orchestrator
        .list_by_user(Some("u"), PageRequest::default())
        .await
        .payload
        .unwrap();
    assert_eq!(for_u.total, 1);
    assert!(for_u.records.iter().all(|r| r.owner_user_id == "u"));

    let everything = f
        .orchestrator
        .list_by_user(None, PageRequest::default())
        .await
        .payload
        .unwrap();
    assert_eq!(everything.total, 3);
}

fn stray_record(id: &str, project: &str, owner: &str) -> ContainerRecord {
    ContainerRecord::created(
        id.to_string(),
        project.to_string(),
        owner.to_string(),
        id.to_string(),
        "nginx".to_string(),
        BTreeMap::new(),
    )
}

#[tokio::test]
async fn test_listing_hides_records_in_foreign_projects() {
    let f = fixture();
    let mine = f.create("u", "p", "mine").await;
    // Owned by u, but q belongs to v (e.g. the project changed hands).
    f.store
        .insert(stray_record("stray", "q", "u"))
        .await
        .unwrap();

    let listed = f
        .orchestrator
        .list("u", PageRequest::default())
        .await
        .payload
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.records[0].container_id, mine);

    let by_user = f
        .orchestrator
        .list_by_user(Some("u"), PageRequest::default())
        .await
        .payload
        .unwrap();
    assert_eq!(by_user.total, 1);
    assert_eq!(by_user.records[0].container_id, mine);

    // Whatever list hides, get_by_id refuses.
    assert_eq!(
        f.orchestrator.get_by_id("u", "stray").await.code,
        ResultCode::PermissionError
    );

    let paged = f
        .orchestrator
        .list("u", PageRequest::new(2, 1))
        .await
        .payload
        .unwrap();
    assert_eq!(paged.total, 1);
    assert!(paged.records.is_empty());

    let for_admin = f
        .orchestrator
        .list("admin", PageRequest::default())
        .await
        .payload
        .unwrap();
    assert_eq!(for_admin.total, 2);
}

#[tokio::test]
async fn test_terminal_descriptor() {
    let f = fixture();
    let id = f.create("u", "p", "web").await;

    let refused = f.orchestrator.terminal("u", TerminalRequest::new(&id)).await;
    assert_eq!(refused.code, ResultCode::ContainerStatusRefuse);

    let denied = f.orchestrator.terminal("v", TerminalRequest::new(&id)).await;
    assert_eq!(denied.code, ResultCode::PermissionError);

    f.orchestrator.start("u", &id).await;
    f.orchestrator.settle().await;
    let session = f
        .orchestrator
        .terminal("u", TerminalRequest::new(&id))
        .await
        .payload
        .unwrap();
    assert_eq!(session.cols, 100);
    assert!(session.url.starts_with("ws://127.0.0.1:9999/ws/container/exec?"));
    assert!(session.url.ends_with(&format!("containerId={}", id)));
}

#[tokio::test]
async fn test_sync_converges_to_runtime() {
    let f = fixture();
    let id = f.running("u", "p", "web").await;
    assert!(f.orchestrator.stop("u", &id).await.is_ok());

    // Started behind the platform's back.
    f.runtime.set_state(&id, RuntimeState::Running).await;

    let changed = f.orchestrator.sync_status(Some("u")).await.payload.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].status, LifecycleStatus::Start);
    assert_eq!(f.status(&id).await, LifecycleStatus::Start);

    let again = f.orchestrator.sync_status(Some("u")).await.payload.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn test_sync_marks_missing_containers_dead() {
    let f = fixture();
    let id = f.running("u", "p", "web").await;
    f.runtime.forget(&id).await;

    let changed = f.orchestrator.sync_status(None).await.payload.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].status, LifecycleStatus::Dead);
    assert!(f.store.get(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_sync_skips_failing_queries() {
    let f = fixture();
    let a = f.running("u", "p", "a").await;
    let b = f.running("u", "p", "b").await;

    f.runtime.set_state(&a, RuntimeState::Exited).await;
    f.runtime.set_state(&b, RuntimeState::Exited).await;
    f.runtime.fail_on(RuntimeOp::Status, Some(&b)).await;

    let changed = f.orchestrator.sync_status(None).await.payload.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].container_id, a);
    assert_eq!(f.status(&b).await, LifecycleStatus::Start);
}

#[tokio::test]
async fn test_sync_for_caller_scope() {
    let f = fixture();
    let mine = f.running("u", "p", "mine").await;
    let theirs = f.running("v", "q", "theirs").await;
    f.runtime.set_state(&mine, RuntimeState::Exited).await;
    f.runtime.set_state(&theirs, RuntimeState::Exited).await;

    let for_u = f.orchestrator.sync_for("u").await.payload.unwrap();
    assert_eq!(for_u.len(), 1);
    assert_eq!(for_u[0].container_id, mine);

    let for_admin = f.orchestrator.sync_for("admin").await.payload.unwrap();
    assert_eq!(for_admin.len(), 1);
    assert_eq!(for_admin[0].container_id, theirs);

    assert_eq!(
        f.orchestrator.sync_for("ghost").await.code,
        ResultCode::AuthorityError
    );
}

#[tokio::test]
async fn test_enum_listing() {
    let f = fixture();
    let listing = f.orchestrator.enums().payload.unwrap();
    assert_eq!(listing.result_codes.len(), ResultCode::all().len());
    assert!(
        listing
            .statuses
            .iter()
            .any(|s| s.name == "Start" && s.message == "Running")
    );
}
