//! # Error Policy
//!
//! Requeue policy for failed reconciliations and classification of watch
//! stream errors.

use crate::controller::reconciler::{resource_key, Reconciler, ReconcilerError};
use crate::crd::InstanceObject;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Requeue a failed instance with per-instance Fibonacci backoff
///
/// Backoff is keyed by kind, namespace and name so a failing instance
/// never delays its neighbours. The reconciler resets the key on success.
pub fn handle_reconciliation_error<K: InstanceObject>(
    instance: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let key = resource_key(instance.as_ref());
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.key = %key,
        stage = error.stage(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation of {} failed: {}", instance.name_any(), error);
    observability::metrics::increment_reconciliation_errors();

    let (delay, error_count) = ctx.backoff.next_delay(&key);
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    info!(
        "🔄 Retrying {} in {}s (error count: {}, next attempt: {})",
        key,
        delay.as_secs(),
        error_count,
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}

/// Broad class of a watch stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401: credentials revoked or expired
    Unauthorized,
    /// 410: resource version too old, the watch restarts from a fresh list
    Expired,
    /// 429: API server throttling or storage re-initializing
    Throttled,
    /// 404: CRD missing or object deleted mid-watch
    NotFound,
    Other,
}

/// Classify a rendered controller/watcher error
///
/// 404 is checked before 401 because not-found bodies can mention
/// `WatchFailed`.
#[must_use]
pub fn classify_watch_error(error: &str) -> WatchErrorKind {
    let is_not_found =
        error.contains("ObjectNotFound") || error.contains("404") || error.contains("not found");
    if is_not_found {
        return WatchErrorKind::NotFound;
    }
    if error.contains("401") || error.contains("Unauthorized") {
        return WatchErrorKind::Unauthorized;
    }
    if error.contains("410")
        || error.contains("too old resource version")
        || error.contains("Expired")
        || error.contains("Gone")
    {
        return WatchErrorKind::Expired;
    }
    if error.contains("429")
        || error.contains("storage is (re)initializing")
        || error.contains("TooManyRequests")
    {
        return WatchErrorKind::Throttled;
    }
    WatchErrorKind::Other
}

/// Handle one watch stream error
///
/// Sleeps where the error class calls for it. `backoff_ms` grows on
/// throttling up to `max_backoff_ms` and is reset by the caller on success.
pub async fn handle_watch_stream_error(
    error: &str,
    backoff_ms: &std::sync::atomic::AtomicU64,
    max_backoff_ms: u64,
    restart_delay: Duration,
) -> WatchErrorKind {
    let error_span = tracing::span!(tracing::Level::WARN, "controller.watch.error", error = %error);
    let _error_guard = error_span.enter();

    let kind = classify_watch_error(error);
    match kind {
        WatchErrorKind::Unauthorized => {
            error!(
                "❌ Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired"
            );
            error!("   Verify the controller ClusterRole still grants list/watch on instances and templates");
            warn!(
                "⏳ Waiting {}s before retrying watch...",
                restart_delay.as_secs()
            );
            tokio::time::sleep(restart_delay).await;
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410), watch will restart");
        }
        WatchErrorKind::Throttled => {
            let current = backoff_ms.load(std::sync::atomic::Ordering::Relaxed);
            warn!(
                "API server throttling (429), backing off for {}ms...",
                current
            );
            tokio::time::sleep(Duration::from_millis(current)).await;
            backoff_ms.store(
                current.saturating_mul(2).min(max_backoff_ms),
                std::sync::atomic::Ordering::Relaxed,
            );
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Resource not found (404) - the object was deleted or a CRD is missing: {}",
                error
            );
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error);
            tokio::time::sleep(restart_delay).await;
        }
    }
    kind
}
