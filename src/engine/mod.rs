//! # Reconciliation Engine
//!
//! The per-cycle pipeline that turns a template and an instance into live
//! cluster objects:
//!
//! render → normalize → transform → sync → garbage-collect
//!
//! ## Module Structure
//!
//! - `object.rs` - `RenderedObject`, the schema-less child document
//! - `registry.rs` - group/version/kind to REST resource and scope
//! - `render.rs` - variable substitution and multi-document parsing
//! - `normalize.rs` - name prefixing and scope checks
//! - `transform/` - ownership, labels, scale, network and JSON-Patch rewrites
//! - `equality.rs` - loose live/desired comparison
//! - `client.rs` - `ResourceClient` seam to the API server
//! - `events.rs` - Kubernetes Event publishing
//! - `sync.rs` - apply/diff pass
//! - `gc.rs` - stale child deletion
//! - `ledger.rs` - `status.lastApplied` bookkeeping

pub mod client;
pub mod equality;
pub mod events;
pub mod gc;
pub mod ledger;
pub mod normalize;
pub mod object;
pub mod registry;
pub mod render;
pub mod sync;
pub mod transform;

pub use client::{ClientError, KubeResourceClient, ResourceClient};
pub use events::{EventPublisher, KubeEventPublisher, NoopEventPublisher};
pub use gc::{collect_garbage, GcOutcome};
pub use normalize::{normalize, prefixed_name, NormalizeContext, NormalizeError, ScopeViolation};
pub use object::{ObjectError, RenderedObject};
pub use registry::{KindInfo, KindRegistry, ResourceScope};
pub use render::{canonical_var_key, instance_vars, render, RenderError};
pub use sync::{SyncError, SyncFailure, SyncOperation, SyncOutcome, Syncer};
pub use transform::{OwnerInfo, TransformContext, TransformError};
