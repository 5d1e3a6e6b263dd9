//! # Instance Status
//!
//! The durable ledger of child objects applied by the most recent
//! successful reconciliation.

use crate::crd::ObjectRef;
use serde::{Deserialize, Serialize};

/// Status of an `Instance` or `ClusterInstance`
///
/// Written only after a fully successful cycle. `lastApplied` always holds
/// exactly `lastAppliedObjectsCount` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    /// Template the ledger was produced from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    /// Template resourceVersion at render time (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_resource_version: Option<String>,
    /// Child objects applied by the last successful cycle, in template order
    #[serde(default)]
    pub last_applied: Vec<ObjectRef>,
    #[serde(default)]
    pub last_applied_objects_count: i32,
    /// Number of objects the template rendered to
    #[serde(default)]
    pub template_objects_count: i32,
}
