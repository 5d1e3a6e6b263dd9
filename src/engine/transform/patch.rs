//! User-supplied RFC 6902 patches. The patch text may be YAML or JSON.

use super::{TransformContext, TransformError, Transformer};
use crate::engine::object::RenderedObject;
use json_patch::Patch;

/// Applies the instance's RFC 6902 patches, in declaration order
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchTransformer;

impl Transformer for PatchTransformer {
    fn name(&self) -> &'static str {
        "json6902"
    }

    fn transform(
        &self,
        objects: &mut [RenderedObject],
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        for entry in &ctx.overrides.patches_json6902 {
            let index = ctx.find_target(objects, &entry.target).ok_or_else(|| {
                TransformError::TargetNotFound {
                    stage: "json6902",
                    target: entry.target.to_string(),
                }
            })?;
            let patch = parse_patch(&entry.patch).map_err(|reason| {
                TransformError::InvalidPatch {
                    target: entry.target.to_string(),
                    reason,
                }
            })?;
            apply_patch(&mut objects[index], &patch)?;
        }
        Ok(())
    }
}

/// Parse a patch written as a JSON or YAML list of operations
pub fn parse_patch(text: &str) -> Result<Patch, String> {
    serde_yaml::from_str(text).map_err(|e| e.to_string())
}

/// Apply `patch` to `object`, leaving it untouched on any failure
pub(super) fn apply_patch(object: &mut RenderedObject, patch: &Patch) -> Result<(), TransformError> {
    let target = object.to_string();
    let mut value = object.as_value().clone();
    json_patch::patch(&mut value, patch).map_err(|source| TransformError::Patch {
        target: target.clone(),
        source,
    })?;
    *object = RenderedObject::from_value(value)
        .map_err(|source| TransformError::InvalidResult { target, source })?;
    Ok(())
}
