//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use instance_controller::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Reconciliation engine seams
pub use crate::engine::{
    ClientError, EventPublisher, KindRegistry, RenderedObject, ResourceClient, ResourceScope,
};

// Reconciler types
pub use crate::controller::reconciler::{
    reconcile, run_cycle, CycleContext, CycleOutcome, Reconciler, ReconcilerError,
};

// Config types
pub use crate::config::{ControllerConfig, SharedControllerConfig};
