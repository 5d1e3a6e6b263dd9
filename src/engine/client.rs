//! # Resource Client
//!
//! The engine's only door to the cluster. Production code talks to the API
//! server through [`KubeResourceClient`]; tests substitute an in-memory cluster.

use crate::engine::object::RenderedObject;
use crate::engine::registry::KindRegistry;
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict writing {object}: {message}")]
    Conflict { object: String, message: String },
    #[error("{object} rejected by the API server: {message}")]
    Invalid { object: String, message: String },
    #[error("kind {0} is not known to the API server")]
    UnknownKind(String),
    #[error("failed to serialize {object}: {source}")]
    Serialize {
        object: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Kubernetes API error for {object}: {source}")]
    Api {
        object: String,
        #[source]
        source: kube::Error,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Classify a kube error by HTTP status
    pub fn from_kube(object: impl Into<String>, err: kube::Error) -> Self {
        let object = object.into();
        match &err {
            kube::Error::Api(status) if status.code == 404 => ClientError::NotFound(object),
            kube::Error::Api(status) if status.code == 409 => ClientError::Conflict {
                object,
                message: status.message.clone(),
            },
            kube::Error::Api(status) if status.code == 400 || status.code == 422 => {
                ClientError::Invalid {
                    object,
                    message: status.message.clone(),
                }
            }
            _ => ClientError::Api {
                object,
                source: err,
            },
        }
    }
}

/// Read and write access to arbitrary cluster objects
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Live object, `None` when it does not exist
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<RenderedObject>, ClientError>;

    /// Server-side apply; with `dry_run` the server computes the result
    /// without persisting it
    async fn apply(
        &self,
        object: &RenderedObject,
        dry_run: bool,
    ) -> Result<RenderedObject, ClientError>;

    async fn delete(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), ClientError>;
}

/// [`ResourceClient`] backed by the dynamic kube API
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
    registry: Arc<KindRegistry>,
    field_manager: String,
}

impl std::fmt::Debug for KubeResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceClient")
            .field("field_manager", &self.field_manager)
            .field("kinds", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl KubeResourceClient {
    pub fn new(client: Client, registry: Arc<KindRegistry>, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            registry,
            field_manager: field_manager.into(),
        }
    }

    fn api(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        display: &str,
    ) -> Result<Api<DynamicObject>, ClientError> {
        let info = self
            .registry
            .lookup(gvk)
            .ok_or_else(|| ClientError::UnknownKind(format!("{}/{} {}", gvk.group, gvk.version, gvk.kind)))?;
        if info.scope.is_namespaced() {
            let ns = namespace.ok_or_else(|| ClientError::Invalid {
                object: display.to_string(),
                message: "namespaced object without a namespace".to_string(),
            })?;
            Ok(Api::namespaced_with(self.client.clone(), ns, &info.resource))
        } else {
            Ok(Api::all_with(self.client.clone(), &info.resource))
        }
    }

    fn to_rendered(display: &str, obj: &DynamicObject) -> Result<RenderedObject, ClientError> {
        let value = serde_json::to_value(obj).map_err(|source| ClientError::Serialize {
            object: display.to_string(),
            source,
        })?;
        RenderedObject::from_value(value).map_err(|e| ClientError::Invalid {
            object: display.to_string(),
            message: e.to_string(),
        })
    }
}

fn display(gvk: &GroupVersionKind, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{} {}/{}", gvk.kind, ns, name),
        None => format!("{} {}", gvk.kind, name),
    }
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<RenderedObject>, ClientError> {
        let display = display(gvk, namespace, name);
        let api = self.api(gvk, namespace, &display)?;
        match api.get_opt(name).await {
            Ok(Some(obj)) => Ok(Some(Self::to_rendered(&display, &obj)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(ClientError::from_kube(display, e)),
        }
    }

    async fn apply(
        &self,
        object: &RenderedObject,
        dry_run: bool,
    ) -> Result<RenderedObject, ClientError> {
        let target = object.to_string();
        let api = self.api(&object.gvk(), object.namespace(), &target)?;
        let mut params = PatchParams::apply(&self.field_manager).force();
        if dry_run {
            params = params.dry_run();
        }
        debug!("Applying {} (dry_run={})", target, dry_run);
        let applied = api
            .patch(object.name(), &params, &Patch::Apply(object.as_value()))
            .await
            .map_err(|e| ClientError::from_kube(target.clone(), e))?;
        Self::to_rendered(&target, &applied)
    }

    async fn delete(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), ClientError> {
        let display = display(gvk, namespace, name);
        let api = self.api(gvk, namespace, &display)?;
        api.delete(name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| ClientError::from_kube(display, e))
    }
}
