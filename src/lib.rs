//! Instance Controller Library
//!
//! Renders `Template` documents into live cluster objects through `Instance`
//! and `ClusterInstance` resources, keeps them in sync and garbage-collects
//! what the template no longer produces.
//!
//! ## Quick Start
//!
//! ```rust
//! use instance_controller::prelude::*;
//! ```
//!
//! Tests for the pure pipeline stages live next to each module under
//! `engine/`; end-to-end cycles run against an in-memory cluster in `tests/`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod engine;
pub mod observability;
pub mod prelude;
pub mod runtime;
