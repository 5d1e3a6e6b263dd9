//! # Name/Scope Normalizer
//!
//! Makes rendered names instance-unique and checks every object's REST scope
//! against the scope of the owning instance. Violations are collected for the
//! whole object set so one failed cycle reports every offending object.

use crate::crd::InstanceScope;
use crate::engine::object::RenderedObject;
use crate::engine::registry::{KindRegistry, ResourceScope};
use std::collections::HashSet;
use thiserror::Error;

/// Identity of the instance objects are normalized for
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub instance_name: &'a str,
    /// Namespace of a namespaced instance; `None` for cluster instances
    pub instance_namespace: Option<&'a str>,
    pub scope: InstanceScope,
    /// Set by the template's disable-nameprefix annotation
    pub disable_name_prefix: bool,
}

/// One object that cannot be applied for the owning instance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeViolation {
    #[error("{object}: object has no metadata.name")]
    MissingName { object: String },
    #[error("{object}: kind is not served by the API server")]
    UnknownKind { object: String },
    #[error("{object}: cluster-scoped object cannot be owned by a namespaced instance")]
    ClusterScopedInNamespacedInstance { object: String },
    #[error("{object}: namespaced object in a cluster instance must declare a namespace")]
    MissingNamespace { object: String },
    #[error("{object}: another template object already has this name")]
    DuplicateObject { object: String },
}

#[derive(Debug, Error)]
#[error("{} object(s) failed scope validation: {}", .violations.len(), join(.violations))]
pub struct NormalizeError {
    pub violations: Vec<ScopeViolation>,
}

fn join(violations: &[ScopeViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Physical name of a logical template object name
///
/// Names that already start with `<instance>-` are left alone.
pub fn prefixed_name(instance_name: &str, name: &str) -> String {
    let prefix = format!("{instance_name}-");
    if name.starts_with(&prefix) {
        name.to_string()
    } else {
        format!("{prefix}{name}")
    }
}

/// Physical name honouring the template's prefix setting
pub fn physical_name(instance_name: &str, name: &str, disable_name_prefix: bool) -> String {
    if disable_name_prefix {
        name.to_string()
    } else {
        prefixed_name(instance_name, name)
    }
}

pub fn normalize(
    objects: Vec<RenderedObject>,
    ctx: &NormalizeContext<'_>,
    registry: &KindRegistry,
) -> Result<Vec<RenderedObject>, NormalizeError> {
    let mut violations = Vec::new();
    let mut normalized = Vec::with_capacity(objects.len());
    let mut seen = HashSet::new();

    for mut object in objects {
        if object.name().is_empty() {
            violations.push(ScopeViolation::MissingName {
                object: object.to_string(),
            });
            continue;
        }
        let name = physical_name(ctx.instance_name, object.name(), ctx.disable_name_prefix);
        object.set_name(name);

        let Some(scope) = registry.scope(&object.gvk()) else {
            violations.push(ScopeViolation::UnknownKind {
                object: format!("{} ({})", object, object.api_version()),
            });
            continue;
        };

        match (ctx.scope, scope) {
            (InstanceScope::Namespaced, ResourceScope::Cluster) => {
                violations.push(ScopeViolation::ClusterScopedInNamespacedInstance {
                    object: object.to_string(),
                });
                continue;
            }
            (InstanceScope::Namespaced, ResourceScope::Namespaced) => {
                object.set_namespace(ctx.instance_namespace);
            }
            (InstanceScope::Cluster, ResourceScope::Namespaced) => {
                if object.namespace().is_none() {
                    violations.push(ScopeViolation::MissingNamespace {
                        object: object.to_string(),
                    });
                    continue;
                }
            }
            (InstanceScope::Cluster, ResourceScope::Cluster) => {
                object.set_namespace(None);
            }
        }

        // Physical identity ignores the API version
        let key = (
            object.gvk().group,
            object.kind().to_string(),
            object.namespace().map(str::to_string),
            object.name().to_string(),
        );
        if !seen.insert(key) {
            violations.push(ScopeViolation::DuplicateObject {
                object: object.to_string(),
            });
            continue;
        }
        normalized.push(object);
    }

    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(NormalizeError { violations })
    }
}
