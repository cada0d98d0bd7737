//! # nchat Node Runtime
//!
//! The main entry point for the nchat security and orchestration core.
//!
//! ## Subsystems
//!
//! 1. E2E Cryptographic Primitives (`nchat-crypto`)
//! 2. Secure Storage / Credential Vault (`nchat-secure-storage`, `nchat-credential-vault`)
//! 3. Connector Protective Plumbing (`nchat-connector`)
//! 4. Integration Registry & Health Monitor (`nchat-integration-registry`, `nchat-health-monitor`)
//! 5. Cron Scheduling & Triggers (`nchat-cron`, `nchat-trigger`)
//! 6. Workflow Automation Engine (`nchat-workflow`)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use nchat_connector::Connector;
use nchat_credential_vault::CredentialVault;
use nchat_crypto::SecretKey;
use nchat_cron::Scheduler;
use nchat_health_monitor::HealthMonitor;
use nchat_integration_registry::IntegrationRegistry;
use nchat_node::config::NodeConfig;
use nchat_secure_storage::InMemorySecureStorage;
use nchat_telemetry::{init_tracing, Metrics};
use nchat_types::{Clock, SystemClock};
use nchat_workflow::{ActionRegistry, ExecutionEngine};
use tracing::info;

/// Everything the node needs while it runs, kept alive for the process
/// lifetime.
struct NodeHandle {
    health_monitor: Arc<HealthMonitor>,
    scheduler: Arc<Scheduler>,
    #[allow(dead_code)]
    registry: Arc<IntegrationRegistry>,
    #[allow(dead_code)]
    engine: Arc<ExecutionEngine>,
}

fn build_node(config: &NodeConfig, clock: Arc<SystemClock>, metrics: Arc<Metrics>) -> NodeHandle {
    let storage = Arc::new(InMemorySecureStorage::new());
    let vault = Arc::new(match config.security.vault_encryption_key {
        Some(key_bytes) => CredentialVault::with_encryption(storage, SecretKey::from_bytes(key_bytes)),
        None => CredentialVault::passthrough(storage),
    });

    let health_monitor = Arc::new(HealthMonitor::new(config.health.clone(), clock.clone(), metrics.clone()));
    let registry = Arc::new(IntegrationRegistry::new(vec![], vault, health_monitor.clone()));
    let scheduler = Arc::new(Scheduler::new());

    let action_registry = ActionRegistry::new();
    let engine = Arc::new(ExecutionEngine::new(action_registry, clock, metrics));

    NodeHandle { health_monitor, scheduler, registry, engine }
}

/// Register a previously-provisioned connector with the health monitor
/// so its installation is liveness-checked on every tick. Wiring the
/// same connector into the workflow engine's `ActionRegistry` (via
/// [`crate::wiring::ConnectorActionHandler`]) is the host's job, done
/// before the engine is constructed.
#[allow(dead_code)]
async fn register_connector(node: &NodeHandle, installation_id: nchat_types::InstallationId, connector: Arc<dyn Connector>) {
    node.health_monitor.register(installation_id, connector).await;
}

async fn run_background_ticks(node: Arc<NodeHandle>, clock: Arc<SystemClock>) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        let now = clock.now();
        let disabled = node.health_monitor.tick(now).await;
        for id in disabled {
            tracing::warn!(installation_id = %id, "integration auto-disabled after consecutive health-check failures");
        }
        let fired = node.scheduler.tick(now).await;
        for schedule_id in fired {
            tracing::debug!(schedule_id = %schedule_id, "cron schedule fired");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env();
    let _tracing_guard = init_tracing(&config.telemetry)?;

    info!("===========================================");
    info!("  nchat Node Runtime v0.1.0");
    info!("===========================================");

    let clock = Arc::new(SystemClock);
    let metrics = Arc::new(Metrics::new());
    let node = Arc::new(build_node(&config, clock.clone(), metrics));

    info!("Node initialized successfully. Press Ctrl+C to stop.");

    let ticks = tokio::spawn(run_background_ticks(node, clock));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down gracefully...");
    ticks.abort();

    Ok(())
}
