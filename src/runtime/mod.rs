//! # Runtime
//!
//! Process-level plumbing around the reconcilers.
//!
//! - `initialization.rs` - rustls, tracing, metrics, probe server, client and context
//! - `watch_loop.rs` - per-kind controller loops and shutdown handling
//! - `error_policy.rs` - requeue backoff and watch error classification

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
