//! # Garbage Collector
//!
//! Deletes children recorded by the previous cycle that the current cycle no
//! longer produces. Runs only after a fully successful sync.
//!
//! A live object is left alone when its UID differs from the recorded one
//! (the name now belongs to a different object) or when it carries the keep
//! delete-policy annotation. Every stale entry leaves the ledger whatever the
//! delete outcome.

use crate::crd::ObjectRef;
use crate::engine::client::ResourceClient;
use crate::engine::events::{actions, reasons, EventPublisher};
use crate::observability;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use tracing::{debug, info, warn};

/// What happened to each stale entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcOutcome {
    pub deleted: Vec<ObjectRef>,
    /// Already gone from the cluster
    pub missing: Vec<ObjectRef>,
    /// Kept, or the name is now used by a different object
    pub skipped: Vec<ObjectRef>,
    pub failed: Vec<ObjectRef>,
}

impl GcOutcome {
    /// Entries to remove from the ledger: all of them
    pub fn dropped(&self) -> Vec<ObjectRef> {
        self.deleted
            .iter()
            .chain(&self.missing)
            .chain(&self.skipped)
            .chain(&self.failed)
            .cloned()
            .collect()
    }
}

pub async fn collect_garbage(
    client: &dyn ResourceClient,
    events: &dyn EventPublisher,
    regarding: &ObjectReference,
    stale: &[ObjectRef],
) -> GcOutcome {
    let mut outcome = GcOutcome::default();

    for entry in stale {
        let gvk = entry.gvk();
        let namespace = entry.namespace.as_deref();

        let live = match client.get(&gvk, namespace, &entry.name).await {
            Ok(Some(live)) => live,
            Ok(None) => {
                debug!("Stale {} is already gone", entry);
                outcome.missing.push(entry.clone());
                continue;
            }
            Err(e) => {
                warn!("❌ Failed to look up stale {}: {}", entry, e);
                observability::metrics::increment_gc_failures();
                events
                    .publish(
                        regarding,
                        EventType::Warning,
                        reasons::GC_FAILED,
                        actions::DELETE,
                        Some(format!("{entry}: {e}")),
                    )
                    .await;
                outcome.failed.push(entry.clone());
                continue;
            }
        };

        if let (Some(recorded), Some(actual)) = (entry.uid.as_deref(), live.uid()) {
            if recorded != actual {
                info!(
                    "Skipping GC of {}: live uid {} differs from recorded uid {}",
                    entry, actual, recorded
                );
                outcome.skipped.push(entry.clone());
                continue;
            }
        }
        if live.is_kept() {
            info!("Skipping GC of {}: delete policy is keep", entry);
            outcome.skipped.push(entry.clone());
            continue;
        }

        match client.delete(&gvk, namespace, &entry.name).await {
            Ok(()) => {
                info!("🗑️  Deleted stale {}", entry);
                observability::metrics::increment_gc_deletions();
                events
                    .publish(
                        regarding,
                        EventType::Normal,
                        reasons::GC,
                        actions::DELETE,
                        Some(format!("{} {} deleted", entry.kind, entry.name)),
                    )
                    .await;
                outcome.deleted.push(entry.clone());
            }
            Err(e) if e.is_not_found() => {
                outcome.missing.push(entry.clone());
            }
            Err(e) => {
                warn!("❌ Failed to delete stale {}: {}", entry, e);
                observability::metrics::increment_gc_failures();
                events
                    .publish(
                        regarding,
                        EventType::Warning,
                        reasons::GC_FAILED,
                        actions::DELETE,
                        Some(format!("{entry}: {e}")),
                    )
                    .await;
                outcome.failed.push(entry.clone());
            }
        }
    }

    outcome
}
