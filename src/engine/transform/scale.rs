//! Replica overrides for Deployments, StatefulSets and anything else with
//! `spec.replicas`.

use super::{TransformContext, TransformError, Transformer};
use crate::engine::object::RenderedObject;
use json_patch::{AddOperation, Patch, PatchOperation};
use jsonptr::PointerBuf;
use serde_json::Value;

/// Applies the instance's replica overrides
///
/// Uses an `add` operation on `/spec/replicas`, which replaces an existing
/// value and also covers templates that leave the field unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleTransformer;

impl Transformer for ScaleTransformer {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn transform(
        &self,
        objects: &mut [RenderedObject],
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        for scale in &ctx.overrides.scale {
            let index = ctx.find_target(objects, &scale.target).ok_or_else(|| {
                TransformError::TargetNotFound {
                    stage: "scale",
                    target: scale.target.to_string(),
                }
            })?;
            let patch = Patch(vec![PatchOperation::Add(AddOperation {
                path: PointerBuf::from_tokens(["spec", "replicas"]),
                value: Value::from(scale.replicas),
            })]);
            super::patch::apply_patch(&mut objects[index], &patch)?;
        }
        Ok(())
    }
}
