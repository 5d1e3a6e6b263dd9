//! # Types
//!
//! Reconciler context and the top-level reconciliation error.

use crate::config::SharedControllerConfig;
use crate::controller::backoff::BackoffTracker;
use crate::engine::{
    EventPublisher, KindRegistry, NormalizeError, RenderError, ResourceClient, SyncError,
    TransformError,
};
use kube::Client;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("template {0} not found")]
    TemplateNotFound(String),
    #[error("failed to read template {name}: {source}")]
    TemplateFetch {
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("failed to render template: {0}")]
    Render(#[from] RenderError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("failed to transform rendered objects: {0}")]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("failed to update instance status: {0}")]
    Status(#[source] kube::Error),
}

impl ReconcilerError {
    /// Short label for metrics and logs
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            ReconcilerError::TemplateNotFound(_) | ReconcilerError::TemplateFetch { .. } => {
                "template"
            }
            ReconcilerError::Render(_) => "render",
            ReconcilerError::Normalize(_) => "normalize",
            ReconcilerError::Transform(_) => "transform",
            ReconcilerError::Sync(_) => "sync",
            ReconcilerError::Status(_) => "status",
        }
    }
}

/// Shared state handed to every reconciliation
pub struct Reconciler {
    /// Typed client for instances, templates and status writes
    pub client: Client,
    /// Dynamic client for child objects
    pub resources: Arc<dyn ResourceClient>,
    pub events: Arc<dyn EventPublisher>,
    pub registry: Arc<KindRegistry>,
    pub config: SharedControllerConfig,
    pub backoff: BackoffTracker,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("kinds", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        client: Client,
        resources: Arc<dyn ResourceClient>,
        events: Arc<dyn EventPublisher>,
        registry: Arc<KindRegistry>,
        config: SharedControllerConfig,
    ) -> Self {
        let backoff = BackoffTracker::new(config.backoff_min_minutes, config.backoff_max_minutes);
        Self {
            client,
            resources,
            events,
            registry,
            config,
            backoff,
        }
    }
}
