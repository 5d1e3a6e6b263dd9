//! # Initialization
//!
//! Controller start-up: rustls provider, tracing, metrics, the probe server,
//! the Kubernetes client, kind discovery and the reconciler context.

use crate::config::{ControllerConfig, SharedControllerConfig};
use crate::constants::EVENT_REPORTER;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::engine::{KindRegistry, KubeEventPublisher, KubeResourceClient};
use crate::observability;
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the watch loops need
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
    pub config: SharedControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// Order matters: the crypto provider is installed before any TLS use and
/// tracing before the first log line.
pub async fn initialize(config: ControllerConfig) -> Result<InitializationResult> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_provider| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    init_tracing(&config);

    info!("Starting Instance Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let config: SharedControllerConfig = Arc::new(config);
    let server_state = Arc::new(ServerState::default());

    let port = config.metrics_port;
    let server_state_for_server = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(port, server_state_for_server).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let registry = match KindRegistry::discover(client.clone()).await {
        Ok(registry) => registry,
        Err(e) => {
            warn!(
                "API discovery failed, falling back to built-in kinds only: {}",
                e
            );
            KindRegistry::with_builtin_kinds()
        }
    };
    let registry = Arc::new(registry);

    let resources = Arc::new(KubeResourceClient::new(
        client.clone(),
        Arc::clone(&registry),
        config.field_manager.clone(),
    ));
    let events = Arc::new(KubeEventPublisher::new(
        client.clone(),
        EVENT_REPORTER,
        config.pod_name.clone(),
    ));

    let reconciler = Arc::new(Reconciler::new(
        client.clone(),
        resources,
        events,
        registry,
        Arc::clone(&config),
    ));

    info!(
        "Controller initialized (resync: {}s, concurrency: {}, field manager: {})",
        config.resync_interval_secs, config.max_concurrent_reconciliations, config.field_manager
    );

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        config,
    })
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the default `instance_controller=info` filter.
fn init_tracing(config: &ControllerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "instance_controller=info".into());
    if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
