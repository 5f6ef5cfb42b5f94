//! Command execution for `paasctl`.

use crate::access::{AccessControl, StaticAccessControl};
use crate::cli::args::{Args, Commands};
use crate::cli::config::ConfigDiscovery;
use crate::config::PlatformConfig;
use crate::container::{ContainerRuntime, MockRuntime};
use crate::lifecycle::{LifecycleOrchestrator, OperationResult};
use crate::record::{ContainerStore, InMemoryContainerStore, JsonFileContainerStore};
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Load configuration from `--config` or the discovery hierarchy.
pub fn load_config(args: &Args) -> Result<PlatformConfig> {
    match &args.config {
        Some(path) => {
            info!("Loading configuration override from: {:?}", path);
            PlatformConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))
        }
        None => ConfigDiscovery::discover_config().context("Failed to discover configuration"),
    }
}

/// Wire the orchestrator from configuration.
pub async fn build_orchestrator(
    config: PlatformConfig,
    dry_run: bool,
) -> Result<LifecycleOrchestrator> {
    let access: Arc<dyn AccessControl> = match &config.access_file {
        Some(path) => Arc::new(
            StaticAccessControl::from_toml_file(path).context("Failed to load access file")?,
        ),
        None => Arc::new(StaticAccessControl::new()),
    };

    let (runtime, store): (Arc<dyn ContainerRuntime>, Arc<dyn ContainerStore>) = if dry_run {
        info!("Dry run: using in-memory runtime and store");
        (
            Arc::new(MockRuntime::new()),
            Arc::new(InMemoryContainerStore::new()),
        )
    } else {
        let store_path = match &config.store_path {
            Some(path) => path.clone(),
            None => ConfigDiscovery::default_store_path()?,
        };
        let store = JsonFileContainerStore::open(&store_path)
            .await
            .with_context(|| format!("Failed to open record store {}", store_path.display()))?;
        (connect_runtime(&config).await?, Arc::new(store))
    };

    info!("Using {} runtime", runtime.runtime_name());
    Ok(LifecycleOrchestrator::new(runtime, store, access, config))
}

#[cfg(feature = "docker")]
async fn connect_runtime(config: &PlatformConfig) -> Result<Arc<dyn ContainerRuntime>> {
    let runtime = crate::container::DockerRuntime::connect(config)
        .await
        .context("Failed to connect to the container runtime")?;
    Ok(Arc::new(runtime))
}

#[cfg(not(feature = "docker"))]
async fn connect_runtime(_config: &PlatformConfig) -> Result<Arc<dyn ContainerRuntime>> {
    Err(anyhow!(
        "built without the docker feature; use --dry-run"
    ))
}

/// Run one command and print its result as JSON.
///
/// Returns whether the operation succeeded.
pub async fn execute(args: Args) -> Result<bool> {
    match args.command {
        Commands::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            return Ok(true);
        }
        Commands::InitConfig => {
            let path = ConfigDiscovery::create_default_user_config()?;
            println!("Configuration file: {}", path.display());
            return Ok(true);
        }
        _ => {}
    }

    let config = load_config(&args)?;
    let orchestrator = build_orchestrator(config, args.dry_run).await?;
    let user = args.user.as_deref();
    let caller = || user.ok_or_else(|| anyhow!("--user is required for this command"));

    let ok = match args.command {
        Commands::Create(create) => {
            emit(orchestrator.create(caller()?, create.into_request()).await)?
        }
        Commands::Start { container_id } => {
            let result = orchestrator.start(caller()?, &container_id).await;
            orchestrator.settle().await;
            emit(result)?
        }
        Commands::Pause { container_id } => {
            emit(orchestrator.pause(caller()?, &container_id).await)?
        }
        Commands::Continue { container_id } => {
            emit(orchestrator.continue_run(caller()?, &container_id).await)?
        }
        Commands::Stop { container_id } => emit(orchestrator.stop(caller()?, &container_id).await)?,
        Commands::Kill { container_id } => emit(orchestrator.kill(caller()?, &container_id).await)?,
        Commands::Restart { container_id } => {
            emit(orchestrator.restart(caller()?, &container_id).await)?
        }
        Commands::Top { container_id } => emit(orchestrator.top(caller()?, &container_id).await)?,
        Commands::Remove { container_id } => {
            emit(orchestrator.remove(caller()?, &container_id).await)?
        }
        Commands::Get { container_id } => {
            emit(orchestrator.get_by_id(caller()?, &container_id).await)?
        }
        Commands::Check { container_id } => {
            emit(orchestrator.check_permission(caller()?, &container_id).await)?
        }
        Commands::List(page) => emit(orchestrator.list(caller()?, page.into()).await)?,
        Commands::ListProject { project_id, page } => emit(
            orchestrator
                .list_by_project(caller()?, &project_id, page.into())
                .await,
        )?,
        Commands::ListUser { owner, page } => emit(
            orchestrator
                .list_by_user(owner.as_deref(), page.into())
                .await,
        )?,
        Commands::Terminal(terminal) => {
            emit(orchestrator.terminal(caller()?, terminal.into()).await)?
        }
        Commands::Sync => emit(orchestrator.sync_for(caller()?).await)?,
        Commands::Enums => emit(orchestrator.enums())?,
        Commands::ShowConfig | Commands::InitConfig => true,
    };

    Ok(ok)
}

fn emit<T: Serialize>(result: OperationResult<T>) -> Result<bool> {
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialize result")?
    );
    Ok(result.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ResultCode;

    #[tokio::test]
    async fn test_dry_run_orchestrator_without_access_file() {
        let orchestrator = build_orchestrator(PlatformConfig::default(), true)
            .await
            .unwrap();
        // No access file: nobody resolves to a role.
        let result = orchestrator.sync_for("anyone").await;
        assert_eq!(result.code, ResultCode::AuthorityError);
        assert!(orchestrator.enums().is_ok());
    }

    #[tokio::test]
    async fn test_execute_enums_dry_run() {
        let args = <Args as clap::Parser>::try_parse_from(["paasctl", "--dry-run", "enums"]).unwrap();
        assert!(execute(args).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_user_is_an_error() {
        let args =
            <Args as clap::Parser>::try_parse_from(["paasctl", "--dry-run", "pause", "abc"]).unwrap();
        assert!(execute(args).await.is_err());
    }
}
