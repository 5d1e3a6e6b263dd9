//! Controller owner reference from the instance to every child.

use super::{TransformContext, TransformError, Transformer};
use crate::engine::object::RenderedObject;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use serde_json::Value;

/// The owning instance as seen by the transformers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerInfo {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: Option<String>,
    /// Owner carries the keep delete-policy annotation
    pub keep: bool,
}

impl OwnerInfo {
    pub fn from_resource<K>(owner: &K) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        let keep = owner
            .annotations()
            .get(crate::constants::ANNOTATION_DELETE_POLICY)
            .is_some_and(|v| v == crate::constants::DELETE_POLICY_KEEP);
        Self {
            api_version: K::api_version(&()).to_string(),
            kind: K::kind(&()).to_string(),
            name: owner.name_any(),
            uid: owner.uid(),
            keep,
        }
    }

    fn controller_ref(&self, uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
            uid: uid.to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }
}

impl std::fmt::Display for OwnerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipTransformer;

impl Transformer for OwnershipTransformer {
    fn name(&self) -> &'static str {
        "ownership"
    }

    fn transform(
        &self,
        objects: &mut [RenderedObject],
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        let owner = ctx.owner;
        let uid = owner
            .uid
            .as_deref()
            .ok_or_else(|| TransformError::MissingOwnerUid {
                owner: owner.to_string(),
            })?;

        for object in objects.iter_mut() {
            let mut refs: Vec<OwnerReference> = object
                .owner_references()
                .into_iter()
                .filter_map(|r| serde_json::from_value(r).ok())
                .collect();
            refs.retain(|r| r.uid != uid);

            if !(owner.keep || object.is_kept()) {
                if let Some(other) = refs.iter().find(|r| r.controller == Some(true)) {
                    return Err(TransformError::AlreadyControlled {
                        object: object.to_string(),
                        controller: format!("{} {}", other.kind, other.name),
                    });
                }
                refs.push(owner.controller_ref(uid));
            }

            let values: Vec<Value> = refs
                .iter()
                .filter_map(|r| serde_json::to_value(r).ok())
                .collect();
            object.set_owner_references(values);
        }
        Ok(())
    }
}
