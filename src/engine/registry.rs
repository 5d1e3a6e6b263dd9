//! # Kind Registry
//!
//! Maps group/version/kind to the REST resource and scope needed to address
//! it. Built once at start-up and shared by `Arc`; never a process global.

use crate::constants::API_GROUP;
use kube::core::{ApiResource, GroupVersionKind};
use kube::discovery::{Discovery, Scope};
use kube::Client;
use std::collections::HashMap;
use tracing::{debug, info};

/// REST scope of a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Namespaced,
    Cluster,
}

impl ResourceScope {
    pub fn is_namespaced(self) -> bool {
        self == ResourceScope::Namespaced
    }
}

/// Everything needed to talk to one kind through the dynamic API
#[derive(Debug, Clone)]
pub struct KindInfo {
    pub resource: ApiResource,
    pub scope: ResourceScope,
}

// (group, version, kind, plural, scope)
const BUILTIN_KINDS: &[(&str, &str, &str, &str, ResourceScope)] = &[
    ("", "v1", "ConfigMap", "configmaps", ResourceScope::Namespaced),
    ("", "v1", "Secret", "secrets", ResourceScope::Namespaced),
    ("", "v1", "Service", "services", ResourceScope::Namespaced),
    ("", "v1", "ServiceAccount", "serviceaccounts", ResourceScope::Namespaced),
    ("", "v1", "Pod", "pods", ResourceScope::Namespaced),
    ("", "v1", "PersistentVolumeClaim", "persistentvolumeclaims", ResourceScope::Namespaced),
    ("", "v1", "Namespace", "namespaces", ResourceScope::Cluster),
    ("", "v1", "PersistentVolume", "persistentvolumes", ResourceScope::Cluster),
    ("apps", "v1", "Deployment", "deployments", ResourceScope::Namespaced),
    ("apps", "v1", "StatefulSet", "statefulsets", ResourceScope::Namespaced),
    ("apps", "v1", "DaemonSet", "daemonsets", ResourceScope::Namespaced),
    ("apps", "v1", "ReplicaSet", "replicasets", ResourceScope::Namespaced),
    ("batch", "v1", "Job", "jobs", ResourceScope::Namespaced),
    ("batch", "v1", "CronJob", "cronjobs", ResourceScope::Namespaced),
    ("networking.k8s.io", "v1", "Ingress", "ingresses", ResourceScope::Namespaced),
    ("networking.k8s.io", "v1", "NetworkPolicy", "networkpolicies", ResourceScope::Namespaced),
    ("rbac.authorization.k8s.io", "v1", "Role", "roles", ResourceScope::Namespaced),
    ("rbac.authorization.k8s.io", "v1", "RoleBinding", "rolebindings", ResourceScope::Namespaced),
    ("rbac.authorization.k8s.io", "v1", "ClusterRole", "clusterroles", ResourceScope::Cluster),
    ("rbac.authorization.k8s.io", "v1", "ClusterRoleBinding", "clusterrolebindings", ResourceScope::Cluster),
    (API_GROUP, "v1alpha1", "Instance", "instances", ResourceScope::Namespaced),
    (API_GROUP, "v1alpha1", "ClusterInstance", "clusterinstances", ResourceScope::Cluster),
    (API_GROUP, "v1alpha1", "Template", "templates", ResourceScope::Cluster),
    (API_GROUP, "v1alpha1", "ClusterTemplate", "clustertemplates", ResourceScope::Cluster),
];

/// Registry of addressable kinds
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    kinds: HashMap<(String, String, String), KindInfo>,
}

impl KindRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that knows the common core, apps, batch, networking and RBAC
    /// kinds plus this operator's own kinds
    #[must_use]
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        for (group, version, kind, plural, scope) in BUILTIN_KINDS {
            registry.register(
                &GroupVersionKind::gvk(group, version, kind),
                plural,
                *scope,
            );
        }
        registry
    }

    /// Built-in kinds extended with every resource the API server advertises
    pub async fn discover(client: Client) -> Result<Self, kube::Error> {
        let mut registry = Self::with_builtin_kinds();
        let discovery = Discovery::new(client).run().await?;
        for group in discovery.groups() {
            for version in group.versions() {
                for (resource, caps) in group.versioned_resources(version) {
                    let scope = match caps.scope {
                        Scope::Namespaced => ResourceScope::Namespaced,
                        Scope::Cluster => ResourceScope::Cluster,
                    };
                    debug!(
                        "Discovered {}/{} {} ({:?})",
                        resource.group, resource.version, resource.kind, scope
                    );
                    registry.insert(resource, scope);
                }
            }
        }
        info!("🔍 Kind registry ready with {} kinds", registry.len());
        Ok(registry)
    }

    pub fn register(&mut self, gvk: &GroupVersionKind, plural: &str, scope: ResourceScope) {
        self.insert(ApiResource::from_gvk_with_plural(gvk, plural), scope);
    }

    fn insert(&mut self, resource: ApiResource, scope: ResourceScope) {
        let key = (
            resource.group.clone(),
            resource.version.clone(),
            resource.kind.clone(),
        );
        self.kinds.insert(key, KindInfo { resource, scope });
    }

    pub fn lookup(&self, gvk: &GroupVersionKind) -> Option<&KindInfo> {
        self.kinds
            .get(&(gvk.group.clone(), gvk.version.clone(), gvk.kind.clone()))
    }

    pub fn scope(&self, gvk: &GroupVersionKind) -> Option<ResourceScope> {
        self.lookup(gvk).map(|info| info.scope)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
