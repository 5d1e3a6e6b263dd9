//! # Object References
//!
//! References to child resources, used both as override targets and as
//! ledger entries in the instance status.

use kube::core::GroupVersionKind;
use serde::{Deserialize, Serialize};

/// Reference to a child resource
///
/// As an override target only `apiVersion`, `kind` and `name` are meaningful;
/// `name` is the logical (unprefixed) name from the template. As a ledger entry
/// every field is filled from the live object after apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// RFC3339 creation timestamp of the live object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
}

impl ObjectRef {
    /// Group/version/kind of the referenced object
    ///
    /// A missing `apiVersion` yields an empty group and version.
    #[must_use]
    pub fn gvk(&self) -> GroupVersionKind {
        let (group, version) = split_api_version(self.api_version.as_deref().unwrap_or_default());
        GroupVersionKind::gvk(group, version, &self.kind)
    }

    /// Whether `api_version`/`kind` of this reference match the given values
    ///
    /// An unset `apiVersion` on the reference matches any version of the kind.
    #[must_use]
    pub fn matches_type(&self, api_version: &str, kind: &str) -> bool {
        self.kind == kind
            && self
                .api_version
                .as_deref()
                .is_none_or(|v| v.is_empty() || v == api_version)
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// Split `group/version` into its parts; core kinds have an empty group
#[must_use]
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_api_version() {
        assert_eq!(split_api_version("apps/v1"), ("apps", "v1"));
        assert_eq!(split_api_version("v1"), ("", "v1"));
        assert_eq!(
            split_api_version("networking.k8s.io/v1"),
            ("networking.k8s.io", "v1")
        );
    }

    #[test]
    fn test_matches_type_without_api_version() {
        let target = ObjectRef {
            kind: "Deployment".to_string(),
            name: "web".to_string(),
            ..Default::default()
        };
        assert!(target.matches_type("apps/v1", "Deployment"));
        assert!(!target.matches_type("apps/v1", "StatefulSet"));
    }

    #[test]
    fn test_matches_type_with_api_version() {
        let target = ObjectRef {
            api_version: Some("apps/v1".to_string()),
            kind: "Deployment".to_string(),
            name: "web".to_string(),
            ..Default::default()
        };
        assert!(target.matches_type("apps/v1", "Deployment"));
        assert!(!target.matches_type("extensions/v1beta1", "Deployment"));
    }
}
