//! # Transformer Chain
//!
//! Ordered rewrites of the rendered object set, run after normalization and
//! before sync:
//!
//! 1. `ownership.rs` - controller owner reference (or its removal for kept objects)
//! 2. `labels.rs` - instance, template and controller-managed labels
//! 3. `scale.rs` - replica overrides
//! 4. `network.rs` - service port and ingress rule rewriting
//! 5. `patch.rs` - RFC 6902 patches, last so they can override anything above
//!
//! The first failing transformer aborts the chain; the caller then discards the
//! whole object set so no half-transformed object is ever applied.

mod labels;
mod network;
mod ownership;
mod patch;
mod scale;

pub use labels::LabelTransformer;
pub use network::NetworkTransformer;
pub use ownership::{OwnerInfo, OwnershipTransformer};
pub use patch::PatchTransformer;
pub use scale::ScaleTransformer;

use crate::crd::{ObjectRef, OverrideSpec};
use crate::engine::normalize::physical_name;
use crate::engine::object::{ObjectError, RenderedObject};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("owner {owner} has no uid yet")]
    MissingOwnerUid { owner: String },
    #[error("{object} is already controlled by {controller}")]
    AlreadyControlled { object: String, controller: String },
    #[error("{stage} override target {target} not found in rendered objects")]
    TargetNotFound { stage: &'static str, target: String },
    #[error("service port {port} cannot target both {first} and {second}")]
    ConflictingServicePort { port: i32, first: i32, second: i32 },
    #[error("network override for ingress {ingress} has no service target")]
    IngressWithoutService { ingress: String },
    #[error("invalid JSON patch for {target}: {reason}")]
    InvalidPatch { target: String, reason: String },
    #[error("JSON patch failed on {target}: {source}")]
    Patch {
        target: String,
        #[source]
        source: json_patch::PatchError,
    },
    #[error("patched {target} is no longer a Kubernetes object: {source}")]
    InvalidResult {
        target: String,
        #[source]
        source: ObjectError,
    },
}

/// Inputs shared by every transformer in one cycle
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub owner: &'a OwnerInfo,
    pub instance_name: &'a str,
    pub template_name: &'a str,
    pub overrides: &'a OverrideSpec,
    pub disable_name_prefix: bool,
}

impl TransformContext<'_> {
    /// Index of the object addressed by an override target
    ///
    /// The target name is logical; it is resolved to the physical (prefixed)
    /// name before matching.
    pub fn find_target(&self, objects: &[RenderedObject], target: &ObjectRef) -> Option<usize> {
        let name = physical_name(self.instance_name, &target.name, self.disable_name_prefix);
        objects.iter().position(|obj| {
            obj.name() == name && target.matches_type(obj.api_version(), obj.kind())
        })
    }
}

/// One in-place rewrite of the object set
pub trait Transformer: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn transform(
        &self,
        objects: &mut [RenderedObject],
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError>;
}

/// Transformers for one cycle, in their fixed order
///
/// The override transformers are left out when the instance configures none.
pub fn chain(overrides: &OverrideSpec) -> Vec<Box<dyn Transformer>> {
    let mut chain: Vec<Box<dyn Transformer>> =
        vec![Box::new(OwnershipTransformer), Box::new(LabelTransformer)];
    if !overrides.is_empty() {
        chain.push(Box::new(ScaleTransformer));
        chain.push(Box::new(NetworkTransformer));
        chain.push(Box::new(PatchTransformer));
    }
    chain
}

/// Run the chain for `ctx.overrides` over `objects`
pub fn apply(
    mut objects: Vec<RenderedObject>,
    ctx: &TransformContext<'_>,
) -> Result<Vec<RenderedObject>, TransformError> {
    for transformer in chain(ctx.overrides) {
        debug!("Running {} transformer", transformer.name());
        transformer.transform(&mut objects, ctx)?;
    }
    Ok(objects)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::constants::LABEL_INSTANCE;
    use crate::crd::{Json6902, ScalingOverrideSpec};

    #[test]
    fn test_find_target_resolves_logical_name() {
        let owner = owner();
        let overrides = OverrideSpec::default();
        let ctx = ctx(&owner, &overrides);
        let objects = vec![deployment("foo-web", 1)];
        assert_eq!(
            ctx.find_target(&objects, &target(None, "Deployment", "web")),
            Some(0)
        );
        assert_eq!(
            ctx.find_target(&objects, &target(None, "Deployment", "foo-web")),
            Some(0)
        );
        assert_eq!(
            ctx.find_target(&objects, &target(Some("apps/v1beta1"), "Deployment", "web")),
            None
        );
    }

    #[test]
    fn test_chain_skips_override_transformers_without_overrides() {
        let names = |overrides: &OverrideSpec| -> Vec<&'static str> {
            chain(overrides).iter().map(|t| t.name()).collect()
        };
        assert_eq!(names(&OverrideSpec::default()), vec!["ownership", "labels"]);

        let overrides = OverrideSpec {
            scale: vec![ScalingOverrideSpec {
                target: target(None, "Deployment", "web"),
                replicas: 2,
            }],
            ..Default::default()
        };
        assert_eq!(names(&overrides).len(), 5);
    }

    #[test]
    fn test_patch_overrides_scale() {
        let owner = owner();
        let overrides = OverrideSpec {
            scale: vec![ScalingOverrideSpec {
                target: target(None, "Deployment", "web"),
                replicas: 0,
            }],
            patches_json6902: vec![Json6902 {
                target: target(Some("apps/v1"), "Deployment", "web"),
                patch: r#"[{"op": "replace", "path": "/spec/replicas", "value": 5}]"#.to_string(),
            }],
            ..Default::default()
        };
        let out = apply(vec![deployment("foo-web", 1)], &ctx(&owner, &overrides)).unwrap();
        assert_eq!(out[0].as_value()["spec"]["replicas"], 5);
        assert_eq!(out[0].labels()[LABEL_INSTANCE], "foo");
        assert_eq!(out[0].owner_references().len(), 1);
    }

    #[test]
    fn test_missing_target_aborts_chain() {
        let owner = owner();
        let overrides = OverrideSpec {
            scale: vec![ScalingOverrideSpec {
                target: target(None, "StatefulSet", "db"),
                replicas: 1,
            }],
            ..Default::default()
        };
        let err = apply(vec![deployment("foo-web", 1)], &ctx(&owner, &overrides)).unwrap_err();
        assert!(matches!(
            err,
            TransformError::TargetNotFound { stage: "scale", .. }
        ));
    }
}
