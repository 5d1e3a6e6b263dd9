//! Common test utilities for reconciliation cycle tests
//!
//! `FakeCluster` is an in-memory `ResourceClient`. Apply deep-merges the
//! desired object over the live one (maps merge, everything else replaces),
//! assigns uids and resource versions, and honours dry-run by returning the
//! merged result without storing it. Failures, including dry-run not-found, can be injected per object name.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use instance_controller::controller::reconciler::{run_cycle, CycleContext, CycleOutcome};
use instance_controller::crd::{
    ClusterInstance, ClusterTemplate, Instance, InstanceObject, InstanceSpec, Template,
    TemplateRef, TemplateSpec,
};
use instance_controller::engine::{
    ClientError, EventPublisher, KindRegistry, RenderedObject, ResourceClient,
};
use instance_controller::prelude::ReconcilerError;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::core::GroupVersionKind;
use kube::runtime::events::EventType;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

type Key = (String, String, String, String);

fn key(api_version: &str, kind: &str, namespace: Option<&str>, name: &str) -> Key {
    (
        api_version.to_string(),
        kind.to_string(),
        namespace.unwrap_or_default().to_string(),
        name.to_string(),
    )
}

fn api_version_of(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    }
}

/// Recursive merge: maps merge key by key, everything else is replaced
fn merge(live: &mut Value, desired: &Value) {
    match (live, desired) {
        (Value::Object(live), Value::Object(desired)) => {
            for (k, v) in desired {
                match live.get_mut(k) {
                    Some(slot) => merge(slot, v),
                    None => {
                        live.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (live, desired) => *live = desired.clone(),
    }
}

#[derive(Default)]
struct FakeState {
    objects: BTreeMap<Key, Value>,
    next_uid: u64,
    next_rv: u64,
    writes: usize,
    deletes: usize,
    reject_apply: HashSet<String>,
    dry_run_not_found: HashSet<String>,
    fail_delete: HashSet<String>,
}

impl FakeState {
    fn stamp_new(&mut self, value: &mut Value, persist: bool) {
        let metadata = metadata_mut(value);
        if persist {
            self.next_uid += 1;
            metadata.insert(
                "uid".to_string(),
                Value::String(format!("uid-{}", self.next_uid)),
            );
        }
        metadata.insert(
            "creationTimestamp".to_string(),
            Value::String("2024-01-01T00:00:00Z".to_string()),
        );
    }

    fn bump_rv(&mut self, value: &mut Value) {
        self.next_rv += 1;
        metadata_mut(value).insert(
            "resourceVersion".to_string(),
            Value::String(self.next_rv.to_string()),
        );
    }
}

fn metadata_mut(value: &mut Value) -> &mut Map<String, Value> {
    let root = value.as_object_mut().expect("object is a mapping");
    root.entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .expect("metadata is a mapping")
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object as if created by someone else
    pub fn insert(&self, value: Value) -> RenderedObject {
        let object = RenderedObject::from_value(value).expect("valid object");
        let mut state = self.state.lock().unwrap();
        let mut value = object.into_value();
        state.stamp_new(&mut value, true);
        state.bump_rv(&mut value);
        let object = RenderedObject::from_value(value).unwrap();
        state.objects.insert(
            key(object.api_version(), object.kind(), object.namespace(), object.name()),
            object.as_value().clone(),
        );
        object
    }

    pub fn object(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<RenderedObject> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&key(api_version, kind, namespace, name))
            .map(|v| RenderedObject::from_value(v.clone()).unwrap())
    }

    pub fn remove(&self, api_version: &str, kind: &str, namespace: Option<&str>, name: &str) {
        self.state
            .lock()
            .unwrap()
            .objects
            .remove(&key(api_version, kind, namespace, name));
    }

    /// Names of every stored object, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .objects
            .keys()
            .map(|k| k.3.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    /// Persisted applies since the last reset
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().unwrap().deletes
    }

    pub fn reset_counters(&self) {
        let mut state = self.state.lock().unwrap();
        state.writes = 0;
        state.deletes = 0;
    }

    /// Reject every apply (dry-run included) of objects named `name`
    pub fn reject_apply(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .reject_apply
            .insert(name.to_string());
    }

    /// Answer dry-run applies of objects named `name` with not-found, as the
    /// API server does when a dependency (e.g. a namespace) does not exist yet
    pub fn dry_run_not_found(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .dry_run_not_found
            .insert(name.to_string());
    }

    pub fn allow_apply(&self, name: &str) {
        self.state.lock().unwrap().reject_apply.remove(name);
    }

    pub fn fail_delete(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_delete
            .insert(name.to_string());
    }
}

#[async_trait]
impl ResourceClient for FakeCluster {
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<RenderedObject>, ClientError> {
        Ok(self.object(&api_version_of(gvk), &gvk.kind, namespace, name))
    }

    async fn apply(
        &self,
        object: &RenderedObject,
        dry_run: bool,
    ) -> Result<RenderedObject, ClientError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_apply.contains(object.name()) {
            return Err(ClientError::Invalid {
                object: object.to_string(),
                message: "admission webhook denied the request".to_string(),
            });
        }
        if dry_run && state.dry_run_not_found.contains(object.name()) {
            return Err(ClientError::NotFound(object.to_string()));
        }

        let k = key(object.api_version(), object.kind(), object.namespace(), object.name());
        let mut value = match state.objects.get(&k) {
            Some(live) => {
                let mut merged = live.clone();
                merge(&mut merged, object.as_value());
                merged
            }
            None => {
                let mut created = object.as_value().clone();
                state.stamp_new(&mut created, !dry_run);
                created
            }
        };

        if !dry_run {
            state.bump_rv(&mut value);
            state.writes += 1;
            state.objects.insert(k, value.clone());
        }
        Ok(RenderedObject::from_value(value).unwrap())
    }

    async fn delete(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        let display = format!("{} {}", gvk.kind, name);
        if state.fail_delete.contains(name) {
            return Err(ClientError::Conflict {
                object: display,
                message: "the object has been modified".to_string(),
            });
        }
        let k = key(&api_version_of(gvk), &gvk.kind, namespace, name);
        if state.objects.remove(&k).is_none() {
            return Err(ClientError::NotFound(display));
        }
        state.deletes += 1;
        Ok(())
    }
}

/// Event publisher that keeps `(reason, note)` pairs
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingEvents {
    pub fn reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(reason, _)| reason.clone())
            .collect()
    }

    pub fn count(&self, reason: &str) -> usize {
        self.reasons().iter().filter(|r| *r == reason).count()
    }

    pub fn notes(&self, reason: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == reason)
            .map(|(_, note)| note.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEvents {
    async fn publish(
        &self,
        _regarding: &ObjectReference,
        _type: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        self.events
            .lock()
            .unwrap()
            .push((reason.to_string(), note.unwrap_or_default()));
    }
}

pub fn template(name: &str, raw_yaml: &str) -> Template {
    let mut template = Template::new(
        name,
        TemplateSpec {
            raw_yaml: raw_yaml.to_string(),
            ..TemplateSpec::default()
        },
    );
    template.metadata.resource_version = Some("100".to_string());
    template
}

pub fn cluster_template(name: &str, raw_yaml: &str) -> ClusterTemplate {
    let mut template = ClusterTemplate::new(
        name,
        instance_controller::crd::ClusterTemplateSpec {
            template: TemplateSpec {
                raw_yaml: raw_yaml.to_string(),
                ..TemplateSpec::default()
            },
        },
    );
    template.metadata.resource_version = Some("200".to_string());
    template
}

pub fn instance(name: &str, namespace: &str, template: &str) -> Instance {
    let mut instance = Instance::new(
        name,
        InstanceSpec {
            template: TemplateRef {
                name: template.to_string(),
            },
            ..InstanceSpec::default()
        },
    );
    instance.metadata.namespace = Some(namespace.to_string());
    instance.metadata.uid = Some(format!("instance-uid-{name}"));
    instance
}

pub fn cluster_instance(name: &str, template: &str) -> ClusterInstance {
    let mut instance = ClusterInstance::new(
        name,
        instance_controller::crd::ClusterInstanceSpec {
            instance: InstanceSpec {
                template: TemplateRef {
                    name: template.to_string(),
                },
                ..InstanceSpec::default()
            },
        },
    );
    instance.metadata.uid = Some(format!("cluster-instance-uid-{name}"));
    instance
}

/// Fake cluster, recorded events and registry for one test
pub struct Harness {
    pub cluster: FakeCluster,
    pub events: RecordingEvents,
    pub registry: KindRegistry,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            cluster: FakeCluster::new(),
            events: RecordingEvents::default(),
            registry: KindRegistry::with_builtin_kinds(),
        }
    }

    /// One cycle; on success the status is stored on the instance the way
    /// the reconciler persists it
    pub async fn cycle<K>(
        &self,
        instance: &mut K,
        template: &K::Template,
    ) -> Result<CycleOutcome, ReconcilerError>
    where
        K: InstanceObject + HasStatus,
    {
        let ctx = CycleContext {
            client: &self.cluster,
            events: &self.events,
            registry: &self.registry,
        };
        let outcome = run_cycle(&*instance, template, ctx).await?;
        instance.set_status(outcome.status.clone());
        Ok(outcome)
    }
}

/// Status write-back for the test harness
pub trait HasStatus {
    fn set_status(&mut self, status: instance_controller::crd::InstanceStatus);
}

impl HasStatus for Instance {
    fn set_status(&mut self, status: instance_controller::crd::InstanceStatus) {
        self.status = Some(status);
    }
}

impl HasStatus for ClusterInstance {
    fn set_status(&mut self, status: instance_controller::crd::InstanceStatus) {
        self.status = Some(status);
    }
}
