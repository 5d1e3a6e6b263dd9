//! # Rendered Objects
//!
//! A schema-less child resource as produced by the renderer and rewritten by
//! the transformer chain. The document is a plain `serde_json::Value`; only
//! the handful of fields the engine inspects get typed accessors.

use crate::constants::{ANNOTATION_DELETE_POLICY, DELETE_POLICY_KEEP};
use crate::crd::{split_api_version, ObjectRef};
use kube::core::GroupVersionKind;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a document cannot be treated as a Kubernetes object
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectError {
    #[error("document is not a mapping")]
    NotAMapping,
    #[error("document has no `{0}` string field")]
    MissingField(&'static str),
}

/// One child resource in its in-memory form
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedObject(Value);

impl RenderedObject {
    /// Wrap a document, checking that it carries `apiVersion` and `kind`
    pub fn from_value(value: Value) -> Result<Self, ObjectError> {
        let map = value.as_object().ok_or(ObjectError::NotAMapping)?;
        for field in ["apiVersion", "kind"] {
            match map.get(field) {
                Some(Value::String(s)) if !s.is_empty() => {}
                _ => return Err(ObjectError::MissingField(field)),
            }
        }
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    fn str_field(&self, path: &[&str]) -> Option<&str> {
        let mut cur = &self.0;
        for key in path {
            cur = cur.get(key)?;
        }
        cur.as_str()
    }

    pub fn api_version(&self) -> &str {
        self.str_field(&["apiVersion"]).unwrap_or_default()
    }

    pub fn kind(&self) -> &str {
        self.str_field(&["kind"]).unwrap_or_default()
    }

    pub fn gvk(&self) -> GroupVersionKind {
        let (group, version) = split_api_version(self.api_version());
        GroupVersionKind::gvk(group, version, self.kind())
    }

    /// `metadata.name`, empty when absent
    pub fn name(&self) -> &str {
        self.str_field(&["metadata", "name"]).unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.str_field(&["metadata", "namespace"])
            .filter(|ns| !ns.is_empty())
    }

    pub fn uid(&self) -> Option<&str> {
        self.str_field(&["metadata", "uid"])
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.str_field(&["metadata", "resourceVersion"])
    }

    pub fn creation_timestamp(&self) -> Option<&str> {
        self.str_field(&["metadata", "creationTimestamp"])
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map("labels")
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map("annotations")
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.str_field(&["metadata", "annotations", key])
    }

    /// Whether the object carries the keep delete-policy annotation
    pub fn is_kept(&self) -> bool {
        self.annotation(ANNOTATION_DELETE_POLICY) == Some(DELETE_POLICY_KEEP)
    }

    fn string_map(&self, field: &str) -> BTreeMap<String, String> {
        self.0
            .get("metadata")
            .and_then(|m| m.get(field))
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mutable `metadata` mapping, created when missing
    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        let root = as_map_mut(&mut self.0);
        as_map_mut(root.entry("metadata").or_insert(Value::Null))
    }

    /// Mutable mapping under `metadata.<field>`, created when missing
    fn metadata_map_mut(&mut self, field: &str) -> &mut Map<String, Value> {
        as_map_mut(self.metadata_mut().entry(field).or_insert(Value::Null))
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.metadata_mut()
            .insert("name".to_string(), Value::String(name.into()));
    }

    pub fn set_namespace(&mut self, namespace: Option<&str>) {
        let metadata = self.metadata_mut();
        match namespace {
            Some(ns) => {
                metadata.insert("namespace".to_string(), Value::String(ns.to_string()));
            }
            None => {
                metadata.remove("namespace");
            }
        }
    }

    pub fn set_label(&mut self, key: &str, value: &str) {
        self.metadata_map_mut("labels")
            .insert(key.to_string(), Value::String(value.to_string()));
    }

    /// Raw `metadata.ownerReferences` entries
    pub fn owner_references(&self) -> Vec<Value> {
        self.0
            .get("metadata")
            .and_then(|m| m.get("ownerReferences"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace `metadata.ownerReferences`; an empty list removes the field
    pub fn set_owner_references(&mut self, refs: Vec<Value>) {
        let metadata = self.metadata_mut();
        if refs.is_empty() {
            metadata.remove("ownerReferences");
        } else {
            metadata.insert("ownerReferences".to_string(), Value::Array(refs));
        }
    }

    /// Ledger entry for this object, meaningful once it came back from the API server
    pub fn to_object_ref(&self) -> ObjectRef {
        ObjectRef {
            api_version: Some(self.api_version().to_string()),
            kind: self.kind().to_string(),
            name: self.name().to_string(),
            namespace: self.namespace().map(str::to_string),
            uid: self.uid().map(str::to_string),
            resource_version: self.resource_version().map(str::to_string),
            creation_timestamp: self.creation_timestamp().map(str::to_string),
        }
    }
}

/// Coerce `slot` into a mapping, replacing any non-mapping value
fn as_map_mut(slot: &mut Value) -> &mut Map<String, Value> {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just replaced with a mapping"),
    }
}

impl std::fmt::Display for RenderedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.namespace() {
            Some(ns) => write!(f, "{} {}/{}", self.kind(), ns, self.name()),
            None => write!(f, "{} {}", self.kind(), self.name()),
        }
    }
}
