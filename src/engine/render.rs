//! # Template Renderer
//!
//! Substitutes `{{KEY}}` placeholders into a template's raw YAML and parses the
//! result into one [`RenderedObject`] per non-empty document.
//!
//! Variable keys are brace-insensitive: `IMAGE`, `{{IMAGE}}` and `{IMAGE}` all
//! address the `{{IMAGE}}` placeholder. Placeholders without a value are left
//! in the output verbatim.

use crate::constants::{VAR_INSTANCE, VAR_NAMESPACE, VAR_TEMPLATE};
use crate::crd::TemplateSpec;
use crate::engine::object::{ObjectError, RenderedObject};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{[^{}\s]+\}\}").expect("placeholder pattern is a valid regex")
});

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("document {index} is not valid YAML: {source}")]
    Parse {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("document {index} cannot be represented as JSON: {source}")]
    Convert {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("document {index} is not a Kubernetes object: {source}")]
    InvalidObject {
        index: usize,
        #[source]
        source: ObjectError,
    },
}

/// Canonical `{{KEY}}` form of a variable key
pub fn canonical_var_key(key: &str) -> String {
    let bare = key
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim();
    format!("{{{{{bare}}}}}")
}

/// Variables for one render: the instance's own vars under canonical keys,
/// overlaid with the built-in `{{INSTANCE}}`, `{{NAMESPACE}}` and `{{TEMPLATE}}`
pub fn instance_vars(
    instance_name: &str,
    instance_namespace: Option<&str>,
    template_name: &str,
    vars: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = vars
        .iter()
        .map(|(k, v)| (canonical_var_key(k), v.clone()))
        .collect();
    out.insert(VAR_INSTANCE.to_string(), instance_name.to_string());
    out.insert(
        VAR_NAMESPACE.to_string(),
        instance_namespace.unwrap_or_default().to_string(),
    );
    out.insert(VAR_TEMPLATE.to_string(), template_name.to_string());
    out
}

/// Replace every `{{KEY}}` occurrence; keys are canonicalized first
pub fn substitute(raw: &str, vars: &BTreeMap<String, String>) -> String {
    vars.iter().fold(raw.to_string(), |text, (key, value)| {
        text.replace(&canonical_var_key(key), value)
    })
}

/// Placeholders still present in `text`, sorted and deduplicated
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut found: Vec<String> = PLACEHOLDER
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    found.sort();
    found.dedup();
    found
}

/// Render a template into objects, in document order
///
/// Any document that fails to parse fails the whole render; nothing partial
/// is returned. Empty documents are skipped.
pub fn render(
    template: &TemplateSpec,
    vars: &BTreeMap<String, String>,
) -> Result<Vec<RenderedObject>, RenderError> {
    let text = substitute(&template.raw_yaml, vars);

    let unresolved = unresolved_placeholders(&text);
    if !unresolved.is_empty() {
        warn!(
            "⚠️  Template rendered with unresolved placeholders: {}",
            unresolved.join(", ")
        );
    }

    let mut objects = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(&text).enumerate() {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|source| RenderError::Parse { index, source })?;
        if value.is_null() {
            continue;
        }
        let json = serde_json::to_value(&value)
            .map_err(|source| RenderError::Convert { index, source })?;
        let object = RenderedObject::from_value(json)
            .map_err(|source| RenderError::InvalidObject { index, source })?;
        objects.push(object);
    }
    Ok(objects)
}
