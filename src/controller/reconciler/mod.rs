//! # Reconciler
//!
//! Drives the reconciliation engine for `Instance` and `ClusterInstance`.
//!
//! - `types.rs` - `Reconciler` context and `ReconcilerError`
//! - `pipeline.rs` - one render → sync → GC cycle
//! - `reconcile.rs` - controller entry point (template lookup, status, requeue)
//! - `status.rs` - ledger persistence

mod pipeline;
mod reconcile;
mod status;
mod types;

pub use pipeline::{event_reference, run_cycle, CycleContext, CycleOutcome};
pub use reconcile::{reconcile, resource_key};
pub use status::update_status;
pub use types::{Reconciler, ReconcilerError};
