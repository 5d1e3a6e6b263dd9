//! # Controller
//!
//! - `reconciler/` - reconciliation context and per-instance cycle
//! - `backoff.rs` - per-instance Fibonacci retry delays
//! - `server.rs` - metrics and probe endpoints

pub mod backoff;
pub mod reconciler;
pub mod server;
