//! # Status Ledger
//!
//! Bookkeeping over `status.lastApplied`: which recorded children are stale,
//! and the status the instance should carry after a successful cycle.
//!
//! Ledger identity is the UID. Entries without a UID (never observed live)
//! fall back to `apiVersion/kind/namespace/name`.

use crate::crd::{InstanceStatus, ObjectRef};
use std::collections::HashSet;

fn identity(entry: &ObjectRef) -> String {
    match &entry.uid {
        Some(uid) if !uid.is_empty() => uid.clone(),
        _ => format!(
            "{}/{}/{}/{}",
            entry.api_version.as_deref().unwrap_or_default(),
            entry.kind,
            entry.namespace.as_deref().unwrap_or_default(),
            entry.name
        ),
    }
}

/// Union of both ledgers: current entries first, then previous entries not
/// touched this cycle
pub fn merge(previous: &[ObjectRef], current: &[ObjectRef]) -> Vec<ObjectRef> {
    let seen: HashSet<String> = current.iter().map(identity).collect();
    current
        .iter()
        .cloned()
        .chain(
            previous
                .iter()
                .filter(|entry| !seen.contains(&identity(entry)))
                .cloned(),
        )
        .collect()
}

/// Entries of `previous` that this cycle did not produce
pub fn stale(previous: &[ObjectRef], current: &[ObjectRef]) -> Vec<ObjectRef> {
    difference(previous, current)
}

/// Entries of `ledger` not present in `remove`
pub fn difference(ledger: &[ObjectRef], remove: &[ObjectRef]) -> Vec<ObjectRef> {
    let removed: HashSet<String> = remove.iter().map(identity).collect();
    ledger
        .iter()
        .filter(|entry| !removed.contains(&identity(entry)))
        .cloned()
        .collect()
}

/// Status after a fully successful cycle
pub fn build_status(
    template_name: &str,
    template_resource_version: Option<String>,
    last_applied: Vec<ObjectRef>,
    template_objects_count: usize,
) -> InstanceStatus {
    InstanceStatus {
        template_name: Some(template_name.to_string()),
        template_resource_version,
        last_applied_objects_count: i32::try_from(last_applied.len()).unwrap_or(i32::MAX),
        last_applied,
        template_objects_count: i32::try_from(template_objects_count).unwrap_or(i32::MAX),
    }
}

/// Whether a status write is needed
pub fn status_changed(before: Option<&InstanceStatus>, after: &InstanceStatus) -> bool {
    before != Some(after)
}
