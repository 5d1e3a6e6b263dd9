//! # Reconciliation Cycle
//!
//! One pass of render → normalize → transform → sync → GC for a single
//! instance. The cycle never writes the instance itself; it returns the
//! status the caller should persist.

use crate::crd::{InstanceObject, InstanceScope, InstanceStatus, TemplateObject};
use crate::engine::events::{actions, reasons};
use crate::engine::transform::{self, OwnerInfo, TransformContext};
use crate::engine::{
    collect_garbage, instance_vars, ledger, normalize, render, EventPublisher, GcOutcome,
    KindRegistry, NormalizeContext, ResourceClient, SyncOutcome, Syncer,
};
use crate::observability;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use kube::ResourceExt;
use tracing::{info, warn};

use super::ReconcilerError;

/// Collaborators of one cycle
#[derive(Clone, Copy)]
pub struct CycleContext<'a> {
    pub client: &'a dyn ResourceClient,
    pub events: &'a dyn EventPublisher,
    pub registry: &'a KindRegistry,
}

impl std::fmt::Debug for CycleContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleContext")
            .field("kinds", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// Result of a fully successful cycle
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub status: InstanceStatus,
    pub sync: SyncOutcome,
    pub gc: GcOutcome,
}

/// Run one cycle of `instance` against `template`
///
/// Build failures (render, normalize, transform) publish a `BuildFailed`
/// event and abort before anything is applied. Sync failures abort before
/// GC; the returned error carries every failed object.
pub async fn run_cycle<K: InstanceObject>(
    instance: &K,
    template: &K::Template,
    ctx: CycleContext<'_>,
) -> Result<CycleOutcome, ReconcilerError> {
    let regarding = instance.object_ref(&());
    let instance_name = instance.name_any();
    let instance_namespace = match K::SCOPE {
        InstanceScope::Namespaced => instance.namespace(),
        InstanceScope::Cluster => None,
    };
    let template_name = template.name_any();
    let spec = instance.instance_spec();

    let objects = match build::<K>(instance, template, &ctx, instance_namespace.as_deref()) {
        Ok(objects) => objects,
        Err(err) => {
            warn!("❌ Failed to build objects for {}: {}", instance_name, err);
            observability::metrics::increment_build_failures();
            ctx.events
                .publish(
                    &regarding,
                    EventType::Warning,
                    reasons::BUILD_FAILED,
                    actions::BUILD,
                    Some(err.to_string()),
                )
                .await;
            return Err(err);
        }
    };
    info!(
        "Built {} objects from template {} (vars: {})",
        objects.len(),
        template_name,
        spec.vars.len()
    );

    let previous: &[_] = instance
        .instance_status()
        .map(|s| s.last_applied.as_slice())
        .unwrap_or_default();

    let syncer = Syncer::new(ctx.client, ctx.events, &regarding);
    let sync = syncer.sync(&objects, previous).await?;

    let merged = ledger::merge(previous, &sync.applied);
    let stale = ledger::stale(previous, &sync.applied);
    let gc = collect_garbage(ctx.client, ctx.events, &regarding, &stale).await;
    let last_applied = ledger::difference(&merged, &gc.dropped());

    let status = ledger::build_status(
        &template_name,
        template.resource_version(),
        last_applied,
        objects.len(),
    );
    Ok(CycleOutcome { status, sync, gc })
}

fn build<K: InstanceObject>(
    instance: &K,
    template: &K::Template,
    ctx: &CycleContext<'_>,
    instance_namespace: Option<&str>,
) -> Result<Vec<crate::engine::RenderedObject>, ReconcilerError> {
    let instance_name = instance.name_any();
    let template_name = template.name_any();
    let spec = instance.instance_spec();
    let disable_name_prefix = template.disable_name_prefix();

    let vars = instance_vars(&instance_name, instance_namespace, &template_name, &spec.vars);
    let rendered = render(template.template_spec(), &vars)?;

    let normalize_ctx = NormalizeContext {
        instance_name: &instance_name,
        instance_namespace,
        scope: K::SCOPE,
        disable_name_prefix,
    };
    let normalized = normalize(rendered, &normalize_ctx, ctx.registry)?;

    let owner = OwnerInfo::from_resource(instance);
    let transform_ctx = TransformContext {
        owner: &owner,
        instance_name: &instance_name,
        template_name: &template_name,
        overrides: &spec.overrides,
        disable_name_prefix,
    };
    Ok(transform::apply(normalized, &transform_ctx)?)
}

/// Event target for an instance
pub fn event_reference<K: InstanceObject>(instance: &K) -> ObjectReference {
    instance.object_ref(&())
}
