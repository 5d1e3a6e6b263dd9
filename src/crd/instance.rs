//! # Instance
//!
//! A materialization of a template with concrete variables and overrides.

use crate::crd::{ClusterTemplate, InstanceStatus, OverrideSpec, Template, TemplateObject};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instance Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cosmo-workspace.github.io/v1alpha1
/// kind: Instance
/// metadata:
///   name: alice-ide
///   namespace: cosmo-user-alice
/// spec:
///   template:
///     name: code-server
///   vars:
///     "{{IMAGE_TAG}}": "4.8.0"
///   override:
///     scale:
///       - target:
///           apiVersion: apps/v1
///           kind: Deployment
///           name: ide
///         replicas: 0
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "Instance",
    group = "cosmo-workspace.github.io",
    version = "v1alpha1",
    namespaced,
    status = "InstanceStatus",
    shortname = "inst",
    printcolumn = r#"{"name":"Template", "type":"string", "jsonPath":".spec.template.name"}, {"name":"Applied", "type":"integer", "jsonPath":".status.lastAppliedObjectsCount"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    /// Template to render
    pub template: TemplateRef,
    /// Variables substituted into the template; keys may omit the `{{ }}` decoration
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Structural overrides applied after rendering
    #[serde(default, rename = "override")]
    pub overrides: OverrideSpec,
}

/// Reference to a template by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRef {
    pub name: String,
}

/// ClusterInstance Custom Resource Definition
///
/// Cluster-scoped counterpart of [`Instance`], rendered from a [`ClusterTemplate`].
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "ClusterInstance",
    group = "cosmo-workspace.github.io",
    version = "v1alpha1",
    status = "InstanceStatus",
    shortname = "cinst",
    printcolumn = r#"{"name":"Template", "type":"string", "jsonPath":".spec.template.name"}, {"name":"Applied", "type":"integer", "jsonPath":".status.lastAppliedObjectsCount"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInstanceSpec {
    #[serde(flatten)]
    pub instance: InstanceSpec,
}

/// REST scope of an instance kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceScope {
    Namespaced,
    Cluster,
}

/// Common view over [`Instance`] and [`ClusterInstance`]
///
/// The reconciliation pipeline is written once against this trait.
pub trait InstanceObject:
    Resource<DynamicType = ()>
    + Clone
    + std::fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Template kind this instance kind renders from
    type Template: TemplateObject + Serialize + DeserializeOwned;

    const SCOPE: InstanceScope;

    fn instance_spec(&self) -> &InstanceSpec;

    fn instance_status(&self) -> Option<&InstanceStatus>;

    /// API handle for this kind; `namespace` is ignored for cluster-scoped kinds
    fn api(client: Client, namespace: Option<&str>) -> Api<Self>;
}

impl InstanceObject for Instance {
    type Template = Template;

    const SCOPE: InstanceScope = InstanceScope::Namespaced;

    fn instance_spec(&self) -> &InstanceSpec {
        &self.spec
    }

    fn instance_status(&self) -> Option<&InstanceStatus> {
        self.status.as_ref()
    }

    fn api(client: Client, namespace: Option<&str>) -> Api<Self> {
        match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        }
    }
}

impl InstanceObject for ClusterInstance {
    type Template = ClusterTemplate;

    const SCOPE: InstanceScope = InstanceScope::Cluster;

    fn instance_spec(&self) -> &InstanceSpec {
        &self.spec.instance
    }

    fn instance_status(&self) -> Option<&InstanceStatus> {
        self.status.as_ref()
    }

    fn api(client: Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client)
    }
}
