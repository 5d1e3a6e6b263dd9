//! # Instance Overrides
//!
//! Scope-limited structural overrides applied to rendered objects after
//! templating: replica scaling, network rewriting and RFC 6902 patches.

use crate::crd::ObjectRef;
use serde::{Deserialize, Serialize};

/// Overrides carried by an instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverrideSpec {
    /// Replica overrides for scalable workloads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scale: Vec<ScalingOverrideSpec>,
    /// Service port and ingress rule rewriting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkOverrideSpec>,
    /// Generic RFC 6902 patches, applied last
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches_json6902: Vec<Json6902>,
}

impl OverrideSpec {
    /// Whether no override of any kind is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scale.is_empty() && self.network.is_none() && self.patches_json6902.is_empty()
    }
}

/// Replace `spec.replicas` of the target object
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScalingOverrideSpec {
    pub target: ObjectRef,
    pub replicas: i64,
}

/// An RFC 6902 patch document (JSON or YAML list of operations) for one target
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Json6902 {
    pub target: ObjectRef,
    pub patch: String,
}

/// Network rules projected onto a Service and an Ingress of the template
///
/// Normally produced by the workspace layer from its own network spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkOverrideSpec {
    /// Service whose ports are rewritten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ObjectRef>,
    /// Ingress whose rules are rewritten to route to `service`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<ObjectRef>,
    #[serde(default)]
    pub rules: Vec<NetworkRule>,
}

/// One exposed port
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRule {
    /// Service port
    pub port_number: i32,
    /// Container port; defaults to `portNumber`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port_number: Option<i32>,
    /// Ingress HTTP path prefix
    #[serde(default = "default_http_path")]
    pub http_path: String,
    /// Ingress host; rules without a host share the ingress default host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

impl NetworkRule {
    /// Effective container port
    #[must_use]
    pub fn target_port(&self) -> i32 {
        self.target_port_number.unwrap_or(self.port_number)
    }

    /// Deterministic service port name, stable across re-application
    #[must_use]
    pub fn port_name(&self) -> String {
        format!("port{}", self.target_port())
    }
}

/// Default value for `httpPath`
pub fn default_http_path() -> String {
    "/".to_string()
}

/// Default value for `protocol`
pub fn default_protocol() -> String {
    "TCP".to_string()
}
