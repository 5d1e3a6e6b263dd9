//! # Custom Resource Definitions
//!
//! CRD types served by the Instance Controller.
//!
//! ## Module Structure
//!
//! - `template.rs` - Template and ClusterTemplate
//! - `instance.rs` - Instance and ClusterInstance, plus the `InstanceObject` view
//! - `overrides.rs` - Scale, network and JSON-Patch overrides
//! - `object_ref.rs` - Child object references
//! - `status.rs` - Instance status (the applied-object ledger)

mod instance;
mod object_ref;
mod overrides;
mod status;
mod template;

// Re-export all public types
pub use instance::{
    ClusterInstance, ClusterInstanceSpec, Instance, InstanceObject, InstanceScope, InstanceSpec,
    TemplateRef,
};
pub use object_ref::{split_api_version, ObjectRef};
pub use overrides::{
    default_http_path, default_protocol, Json6902, NetworkOverrideSpec, NetworkRule, OverrideSpec,
    ScalingOverrideSpec,
};
pub use status::InstanceStatus;
pub use template::{
    ClusterTemplate, ClusterTemplateSpec, RequiredVarSpec, Template, TemplateObject, TemplateSpec,
};
