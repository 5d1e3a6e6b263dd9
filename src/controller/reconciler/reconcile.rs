//! # Reconcile
//!
//! Controller entry point for one `Instance` or `ClusterInstance`.

use crate::controller::reconciler::pipeline::{event_reference, run_cycle, CycleContext};
use crate::controller::reconciler::status::update_status;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::InstanceObject;
use crate::engine::events::{actions, reasons};
use crate::observability;
use kube::runtime::events::EventType;
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, Instrument};

/// Backoff and log key of an instance
pub fn resource_key<K: InstanceObject>(instance: &K) -> String {
    format!(
        "{}/{}/{}",
        K::kind(&()),
        instance.namespace().unwrap_or_default(),
        instance.name_any()
    )
}

pub async fn reconcile<K: InstanceObject>(
    instance: Arc<K>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = instance.name_any();
    let namespace = instance.namespace().unwrap_or_default();
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.kind = %K::kind(&()),
        resource.name = %name,
        resource.namespace = %namespace,
    );
    reconcile_inner(instance, ctx).instrument(span).await
}

async fn reconcile_inner<K: InstanceObject>(
    instance: Arc<K>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    if instance.meta().deletion_timestamp.is_some() {
        debug!("Instance is being deleted, children are released to cluster GC");
        return Ok(Action::await_change());
    }

    let start = Instant::now();
    observability::metrics::increment_reconciliations();

    let template_name = instance.instance_spec().template.name.clone();
    let templates: Api<K::Template> = Api::all(ctx.client.clone());
    let template = match templates.get_opt(&template_name).await {
        Ok(Some(template)) => template,
        Ok(None) => {
            observability::metrics::increment_build_failures();
            ctx.events
                .publish(
                    &event_reference(instance.as_ref()),
                    EventType::Warning,
                    reasons::BUILD_FAILED,
                    actions::BUILD,
                    Some(format!("template {template_name} not found")),
                )
                .await;
            return Err(ReconcilerError::TemplateNotFound(template_name));
        }
        Err(source) => {
            return Err(ReconcilerError::TemplateFetch {
                name: template_name,
                source,
            })
        }
    };

    let cycle_ctx = CycleContext {
        client: ctx.resources.as_ref(),
        events: ctx.events.as_ref(),
        registry: ctx.registry.as_ref(),
    };
    let outcome = run_cycle(instance.as_ref(), &template, cycle_ctx).await?;

    update_status(ctx.client.clone(), instance.as_ref(), &outcome.status)
        .await
        .map_err(ReconcilerError::Status)?;

    ctx.backoff.reset(&resource_key(instance.as_ref()));
    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    info!(
        "✅ Reconciled: {} applied (created: {}, updated: {}, unchanged: {}), {} garbage-collected",
        outcome.status.last_applied_objects_count,
        outcome.sync.created,
        outcome.sync.updated,
        outcome.sync.unchanged,
        outcome.gc.deleted.len()
    );
    observability::metrics::increment_requeues_total("resync");
    Ok(Action::requeue(ctx.config.resync_interval()))
}
