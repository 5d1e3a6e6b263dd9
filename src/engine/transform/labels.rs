//! Labels every child with the owning instance and template so children can
//! be listed with a label selector.

use super::{TransformContext, TransformError, Transformer};
use crate::constants::{
    LABEL_CONTROLLER_MANAGED, LABEL_CONTROLLER_MANAGED_VALUE, LABEL_INSTANCE, LABEL_TEMPLATE,
};
use crate::engine::object::RenderedObject;

/// Stamps the instance, template and controller-managed labels
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelTransformer;

impl Transformer for LabelTransformer {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn transform(
        &self,
        objects: &mut [RenderedObject],
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        for object in objects.iter_mut() {
            object.set_label(LABEL_INSTANCE, ctx.instance_name);
            object.set_label(LABEL_TEMPLATE, ctx.template_name);
            object.set_label(LABEL_CONTROLLER_MANAGED, LABEL_CONTROLLER_MANAGED_VALUE);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::crd::OverrideSpec;

    #[test]
    fn test_labels_stamped_and_existing_kept() {
        let owner = owner();
        let overrides = OverrideSpec::default();
        let mut objects = vec![deployment("foo-web", 1)];
        objects[0].set_label("app", "web");
        objects[0].set_label(LABEL_INSTANCE, "stale");

        LabelTransformer
            .transform(&mut objects, &ctx(&owner, &overrides))
            .unwrap();
        let first = objects[0].clone();
        LabelTransformer
            .transform(&mut objects, &ctx(&owner, &overrides))
            .unwrap();
        assert_eq!(objects[0], first);

        let labels = objects[0].labels();
        assert_eq!(labels["app"], "web");
        assert_eq!(labels[LABEL_INSTANCE], "foo");
        assert_eq!(labels[LABEL_TEMPLATE], "web");
        assert_eq!(labels[LABEL_CONTROLLER_MANAGED], "1");
    }
}
