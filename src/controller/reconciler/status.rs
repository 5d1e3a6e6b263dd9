//! # Status Management
//!
//! Persists the instance ledger after a successful cycle.

use crate::crd::{InstanceObject, InstanceStatus};
use crate::engine::ledger;
use kube::api::{Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Write `status` unless it equals the instance's current status
///
/// Returns whether a write was issued.
pub async fn update_status<K: InstanceObject>(
    client: Client,
    instance: &K,
    status: &InstanceStatus,
) -> Result<bool, kube::Error> {
    if !ledger::status_changed(instance.instance_status(), status) {
        debug!("Skipping status update - ledger unchanged");
        return Ok(false);
    }

    let api = K::api(client, instance.namespace().as_deref());
    let patch = json!({ "status": status });
    api.patch_status(&instance.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    debug!(
        "Updated status: {} applied objects",
        status.last_applied_objects_count
    );
    Ok(true)
}
