//! # Sync Engine
//!
//! Reconciles rendered objects against the live cluster, one object at a time
//! in template order.
//!
//! For each object the live copy is fetched. Absent objects are created.
//! Present objects are compared against a dry-run apply of the rendered copy
//! using [`loose_equal`] and only re-applied when they differ, so a repeated
//! sync with no external change performs no writes.
//!
//! On the first cycle of an instance (empty ledger) every object is dry-run
//! applied before any real write; a failure other than not-found aborts the
//! cycle with nothing created.

use crate::crd::ObjectRef;
use crate::engine::client::{ClientError, ResourceClient};
use crate::engine::equality::loose_equal;
use crate::engine::events::{actions, reasons, EventPublisher};
use crate::engine::object::RenderedObject;
use crate::observability;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use thiserror::Error;
use tracing::{debug, info, warn};

/// What happened to one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Created,
    Updated,
    Unchanged,
}

impl SyncOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncOperation::Created => "created",
            SyncOperation::Updated => "updated",
            SyncOperation::Unchanged => "unchanged",
        }
    }
}

/// Result of a fully successful sync pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    /// Ledger entries for this cycle, in template order
    pub applied: Vec<ObjectRef>,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncOutcome {
    /// Number of real (non dry-run) writes issued
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }

    fn record(&mut self, entry: ObjectRef, op: SyncOperation) {
        match op {
            SyncOperation::Created => self.created += 1,
            SyncOperation::Updated => self.updated += 1,
            SyncOperation::Unchanged => self.unchanged += 1,
        }
        self.applied.push(entry);
    }
}

#[derive(Debug)]
pub struct SyncFailure {
    pub object: String,
    pub error: ClientError,
}

impl std::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.object, self.error)
    }
}

/// Every per-object failure of one pass
#[derive(Debug, Error)]
#[error("{} object(s) failed to sync{}: {}", .failures.len(), if *.preflight { " in dry-run" } else { "" }, join(.failures))]
pub struct SyncError {
    pub failures: Vec<SyncFailure>,
    /// Failed in the first-cycle dry-run pass; nothing was written
    pub preflight: bool,
}

fn join(failures: &[SyncFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Sync pass bound to one instance
pub struct Syncer<'a> {
    client: &'a dyn ResourceClient,
    events: &'a dyn EventPublisher,
    regarding: &'a ObjectReference,
}

impl std::fmt::Debug for Syncer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syncer")
            .field("regarding", &self.regarding.name)
            .finish_non_exhaustive()
    }
}

impl<'a> Syncer<'a> {
    pub fn new(
        client: &'a dyn ResourceClient,
        events: &'a dyn EventPublisher,
        regarding: &'a ObjectReference,
    ) -> Self {
        Self {
            client,
            events,
            regarding,
        }
    }

    /// Sync `objects`; `previous` is the ledger from the last successful cycle
    pub async fn sync(
        &self,
        objects: &[RenderedObject],
        previous: &[ObjectRef],
    ) -> Result<SyncOutcome, SyncError> {
        if previous.is_empty() {
            self.preflight(objects).await?;
        }

        let mut outcome = SyncOutcome::default();
        let mut failures = Vec::new();
        for object in objects {
            match self.sync_one(object).await {
                Ok((entry, op)) => {
                    debug!("{} {}", object, op.as_str());
                    outcome.record(entry, op);
                }
                Err(error) => {
                    warn!("❌ Failed to sync {}: {}", object, error);
                    observability::metrics::increment_sync_failures();
                    self.events
                        .publish(
                            self.regarding,
                            EventType::Warning,
                            reasons::SYNC_FAILED,
                            actions::APPLY,
                            Some(format!("{object}: {error}")),
                        )
                        .await;
                    failures.push(SyncFailure {
                        object: object.to_string(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            info!(
                "✅ Synced {} objects (created: {}, updated: {}, unchanged: {})",
                objects.len(),
                outcome.created,
                outcome.updated,
                outcome.unchanged
            );
            Ok(outcome)
        } else {
            Err(SyncError {
                failures,
                preflight: false,
            })
        }
    }

    /// Dry-run every object; not-found is tolerated because a later object of
    /// the same batch may create the missing dependency
    async fn preflight(&self, objects: &[RenderedObject]) -> Result<(), SyncError> {
        let mut failures = Vec::new();
        for object in objects {
            match self.client.apply(object, true).await {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    debug!("Dry-run of {} hit a missing dependency: {}", object, e);
                }
                Err(error) => failures.push(SyncFailure {
                    object: object.to_string(),
                    error,
                }),
            }
        }
        if failures.is_empty() {
            return Ok(());
        }

        for failure in &failures {
            observability::metrics::increment_sync_failures();
            self.events
                .publish(
                    self.regarding,
                    EventType::Warning,
                    reasons::SYNC_FAILED,
                    actions::APPLY,
                    Some(format!("dry-run {failure}")),
                )
                .await;
        }
        warn!(
            "❌ Dry-run failed for {} of {} objects, nothing was created",
            failures.len(),
            objects.len()
        );
        Err(SyncError {
            failures,
            preflight: true,
        })
    }

    async fn sync_one(
        &self,
        object: &RenderedObject,
    ) -> Result<(ObjectRef, SyncOperation), ClientError> {
        let live = self
            .client
            .get(&object.gvk(), object.namespace(), object.name())
            .await?;

        let Some(live) = live else {
            let created = self.client.apply(object, false).await?;
            observability::metrics::increment_objects_applied(SyncOperation::Created.as_str());
            self.publish_synced(&created, SyncOperation::Created).await;
            return Ok((created.to_object_ref(), SyncOperation::Created));
        };

        let desired = self.client.apply(object, true).await?;
        if loose_equal(&live, &desired) {
            observability::metrics::increment_objects_unchanged();
            return Ok((live.to_object_ref(), SyncOperation::Unchanged));
        }

        let updated = self.client.apply(object, false).await?;
        observability::metrics::increment_objects_applied(SyncOperation::Updated.as_str());
        self.publish_synced(&updated, SyncOperation::Updated).await;
        Ok((updated.to_object_ref(), SyncOperation::Updated))
    }

    async fn publish_synced(&self, object: &RenderedObject, op: SyncOperation) {
        self.events
            .publish(
                self.regarding,
                EventType::Normal,
                reasons::SYNCED,
                actions::APPLY,
                Some(format!("{} {} {}", object.kind(), object.name(), op.as_str())),
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_counts_writes() {
        let mut outcome = SyncOutcome::default();
        outcome.record(ObjectRef::default(), SyncOperation::Created);
        outcome.record(ObjectRef::default(), SyncOperation::Unchanged);
        outcome.record(ObjectRef::default(), SyncOperation::Updated);
        assert_eq!(outcome.writes(), 2);
        assert_eq!(outcome.applied.len(), 3);
    }

    #[test]
    fn test_error_message_lists_every_object() {
        let err = SyncError {
            failures: vec![
                SyncFailure {
                    object: "Pod ns/a".to_string(),
                    error: ClientError::NotFound("Pod ns/a".to_string()),
                },
                SyncFailure {
                    object: "Pod ns/b".to_string(),
                    error: ClientError::UnknownKind("v1 Pod".to_string()),
                },
            ],
            preflight: true,
        };
        let message = err.to_string();
        assert!(message.starts_with("2 object(s) failed to sync in dry-run"));
        assert!(message.contains("Pod ns/b"));
    }
}
