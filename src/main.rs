//! # Instance Controller
//!
//! Kubernetes controller that materializes `Template` documents as live
//! cluster objects for every `Instance` and `ClusterInstance`.
//!
//! Configuration comes from the environment (see `ControllerConfig`);
//! command-line flags override individual settings.

use anyhow::Result;
use clap::Parser;
use instance_controller::config::ControllerConfig;
use instance_controller::crd::{ClusterInstance, Instance};
use instance_controller::runtime::initialization::initialize;
use instance_controller::runtime::watch_loop::{run_watch_loop, spawn_shutdown_watcher};
use std::sync::Arc;
use tracing::info;

/// Instance Controller
#[derive(Debug, Parser)]
#[command(name = "instance-controller", version, about, long_about = None)]
struct Cli {
    /// Port serving /metrics, /healthz and /readyz
    #[arg(long)]
    metrics_port: Option<u16>,
    /// Instances reconciled concurrently per kind
    #[arg(long)]
    max_concurrent_reconciliations: Option<u16>,
    /// Seconds between resyncs of a healthy instance
    #[arg(long)]
    resync_interval_secs: Option<u64>,
    /// Log format
    #[arg(long, value_parser = ["text", "json"])]
    log_format: Option<String>,
}

impl Cli {
    fn apply(self, mut config: ControllerConfig) -> ControllerConfig {
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(concurrency) = self.max_concurrent_reconciliations {
            config.max_concurrent_reconciliations = concurrency;
        }
        if let Some(interval) = self.resync_interval_secs {
            config.resync_interval_secs = interval;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().apply(ControllerConfig::from_env());
    let init = initialize(config).await?;

    spawn_shutdown_watcher(Arc::clone(&init.server_state));
    init.server_state.set_ready(true);

    let (instances, cluster_instances) = tokio::join!(
        run_watch_loop::<Instance>(Arc::clone(&init.reconciler), Arc::clone(&init.server_state)),
        run_watch_loop::<ClusterInstance>(
            Arc::clone(&init.reconciler),
            Arc::clone(&init.server_state)
        ),
    );
    instances?;
    cluster_instances?;

    info!("Instance Controller stopped");
    Ok(())
}
