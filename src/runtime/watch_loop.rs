//! # Watch Loop
//!
//! One controller per instance kind. Each watches its instances plus the
//! template kind they render from, so editing a template re-reconciles every
//! instance that references it.

use crate::constants::{WATCH_BACKOFF_MAX_MS, WATCH_BACKOFF_START_MS};
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::InstanceObject;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::controller::{self, Controller};
use kube_runtime::reflector::{ObjectRef, Store};
use kube_runtime::watcher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Instances in `store` that render from the template named `template_name`
pub fn instances_for_template<K: InstanceObject>(
    store: &Store<K>,
    template_name: &str,
) -> Vec<ObjectRef<K>> {
    store
        .state()
        .into_iter()
        .filter(|instance| instance.instance_spec().template.name == template_name)
        .map(|instance| ObjectRef::from_obj(instance.as_ref()))
        .collect()
}

/// Run the controller for instance kind `K` until shutdown
///
/// The stream is restarted whenever it ends without a shutdown request.
pub async fn run_watch_loop<K: InstanceObject>(
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let kind = K::kind(&()).to_string();
    let config = Arc::clone(&reconciler.config);
    let backoff_ms = Arc::new(AtomicU64::new(WATCH_BACKOFF_START_MS));

    loop {
        if server_state.is_shutting_down() {
            info!("Shutdown requested, exiting {} watch loop", kind);
            break;
        }

        let instances: Api<K> = Api::all(reconciler.client.clone());
        let templates: Api<K::Template> = Api::all(reconciler.client.clone());

        let controller = Controller::new(instances, watcher::Config::default().any_semantic());
        let store = controller.store();
        let restart_delay = config.watch_restart_delay();

        let watch_span = tracing::info_span!("controller.watch", resource.kind = %kind);
        info!(parent: &watch_span, "Starting {} watch loop...", kind);

        controller
            .watches(templates, watcher::Config::default(), move |template| {
                instances_for_template(&store, &template.name_any())
            })
            .with_config(
                controller::Config::default().concurrency(config.max_concurrent_reconciliations),
            )
            .shutdown_on_signal()
            .run(
                reconcile::<K>,
                handle_reconciliation_error::<K>,
                Arc::clone(&reconciler),
            )
            .for_each(|result| {
                let backoff = Arc::clone(&backoff_ms);
                async move {
                    match result {
                        Ok((object, _action)) => {
                            backoff.store(WATCH_BACKOFF_START_MS, Ordering::Relaxed);
                            debug!("watch.event.success {}", object);
                        }
                        // Already handled by the error policy
                        Err(controller::Error::ReconcilerFailed(error, object)) => {
                            debug!("Reconciliation of {} failed: {}", object, error);
                        }
                        Err(error) => {
                            handle_watch_stream_error(
                                &format!("{error:?}"),
                                &backoff,
                                WATCH_BACKOFF_MAX_MS,
                                restart_delay,
                            )
                            .await;
                        }
                    }
                }
            })
            .await;

        let delay = config.watch_restart_delay_after_end();
        warn!(
            "{} watch stream ended, restarting in {} seconds unless shutting down...",
            kind,
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("{} controller stopped gracefully", kind);
    Ok(())
}

/// Mark the process as draining on SIGINT or SIGTERM
pub fn spawn_shutdown_watcher(server_state: Arc<ServerState>) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, waiting for in-flight reconciliations to complete...");
        server_state.request_shutdown();
    });
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
