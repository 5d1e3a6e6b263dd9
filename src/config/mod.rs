//! # Configuration
//!
//! Controller configuration loaded once at start-up from the environment.

mod controller;

pub use controller::ControllerConfig;

use std::sync::Arc;

/// Configuration shared between the runtime, reconcilers and HTTP server
pub type SharedControllerConfig = Arc<ControllerConfig>;
