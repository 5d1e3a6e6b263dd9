//! # Template
//!
//! Parameterized multi-document YAML definitions of child resources.

use crate::constants::ANNOTATION_DISABLE_NAME_PREFIX;
use kube::{Resource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Template Custom Resource Definition
///
/// Holds the raw YAML that instances render into cluster objects. Templates are
/// cluster-scoped and may only be referenced by namespaced `Instance`s; the
/// objects they describe must therefore all be namespaced.
///
/// # Example
///
/// ```yaml
/// apiVersion: cosmo-workspace.github.io/v1alpha1
/// kind: Template
/// metadata:
///   name: code-server
/// spec:
///   requiredVars:
///     - var: "{{IMAGE_TAG}}"
///       default: latest
///   rawYaml: |
///     apiVersion: v1
///     kind: Pod
///     metadata:
///       name: ide
///     spec:
///       containers:
///         - name: ide
///           image: codercom/code-server:{{IMAGE_TAG}}
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "Template",
    group = "cosmo-workspace.github.io",
    version = "v1alpha1",
    shortname = "tmpl",
    printcolumn = r#"{"name":"Description", "type":"string", "jsonPath":".spec.description"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
    /// Free-form human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Variables the template expects, with optional defaults
    /// Defaulting is performed before rendering by the admission layer
    #[serde(default)]
    pub required_vars: Vec<RequiredVarSpec>,
    /// One or more `---` separated YAML documents containing `{{VAR}}` placeholders
    #[serde(default)]
    pub raw_yaml: String,
}

/// A variable declared by a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequiredVarSpec {
    /// Variable key, with or without the `{{ }}` decoration
    pub var: String,
    /// Value used when an instance does not supply the variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// ClusterTemplate Custom Resource Definition
///
/// Same shape as [`Template`] but referenced by `ClusterInstance`s, so its
/// documents may describe cluster-scoped objects as well.
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "ClusterTemplate",
    group = "cosmo-workspace.github.io",
    version = "v1alpha1",
    shortname = "ctmpl",
    printcolumn = r#"{"name":"Description", "type":"string", "jsonPath":".spec.description"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTemplateSpec {
    #[serde(flatten)]
    pub template: TemplateSpec,
}

/// Common view over [`Template`] and [`ClusterTemplate`]
pub trait TemplateObject:
    Resource<DynamicType = ()> + Clone + std::fmt::Debug + Send + Sync + 'static
{
    /// The shared template spec
    fn template_spec(&self) -> &TemplateSpec;

    /// Whether the template opted out of instance-name prefixing
    fn disable_name_prefix(&self) -> bool {
        self.annotations()
            .get(ANNOTATION_DISABLE_NAME_PREFIX)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

impl TemplateObject for Template {
    fn template_spec(&self) -> &TemplateSpec {
        &self.spec
    }
}

impl TemplateObject for ClusterTemplate {
    fn template_spec(&self) -> &TemplateSpec {
        &self.spec.template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_template_yaml() {
        let yaml = r#"
apiVersion: cosmo-workspace.github.io/v1alpha1
kind: Template
metadata:
  name: code-server
  annotations:
    cosmo-workspace.github.io/disable-nameprefix: "true"
spec:
  requiredVars:
    - var: IMAGE_TAG
      default: latest
  rawYaml: |
    apiVersion: v1
    kind: Pod
    metadata:
      name: ide
"#;
        let tmpl: Template = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(tmpl.spec.required_vars.len(), 1);
        assert_eq!(tmpl.spec.required_vars[0].default.as_deref(), Some("latest"));
        assert!(tmpl.spec.raw_yaml.contains("kind: Pod"));
        assert!(tmpl.disable_name_prefix());
    }

    #[test]
    fn test_cluster_template_flattens_spec() {
        let yaml = r#"
apiVersion: cosmo-workspace.github.io/v1alpha1
kind: ClusterTemplate
metadata:
  name: rbac
spec:
  rawYaml: "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: x\n"
"#;
        let tmpl: ClusterTemplate = serde_yaml::from_str(yaml).unwrap();
        assert!(tmpl.template_spec().raw_yaml.contains("Namespace"));
        assert!(!tmpl.disable_name_prefix());
    }
}
