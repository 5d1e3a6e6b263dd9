//! # Failure Handling Tests
//!
//! Build failures, first-apply atomicity, partial sync failures and the GC
//! safety rules.

mod common;

use common::{cluster_instance, cluster_template, instance, template, Harness};
use instance_controller::constants::{ANNOTATION_DELETE_POLICY, DELETE_POLICY_KEEP};
use instance_controller::engine::ScopeViolation;
use instance_controller::prelude::ReconcilerError;
use serde_json::json;

fn config_map(name: &str) -> String {
    format!("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {name}\ndata:\n  key: value\n")
}

fn config_maps(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| config_map(name))
        .collect::<Vec<_>>()
        .join("---\n")
}

#[tokio::test]
async fn test_cluster_scoped_kind_rejected_for_namespaced_instance() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "bad");
    let raw = format!(
        "{}---\napiVersion: rbac.authorization.k8s.io/v1\nkind: ClusterRole\nmetadata:\n  name: admin\nrules: []\n",
        config_map("ok")
    );

    let err = harness
        .cycle(&mut inst, &template("bad", &raw))
        .await
        .unwrap_err();

    let ReconcilerError::Normalize(err) = err else {
        panic!("expected a normalization error, got {err:?}");
    };
    assert_eq!(err.violations.len(), 1);
    assert!(matches!(
        err.violations[0],
        ScopeViolation::ClusterScopedInNamespacedInstance { .. }
    ));
    assert_eq!(harness.cluster.len(), 0);
    assert!(inst.status.is_none());
    assert_eq!(harness.events.count("BuildFailed"), 1);
}

#[tokio::test]
async fn test_every_scope_violation_is_reported() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "bad");
    let raw = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: extra
---
apiVersion: example.com/v1
kind: Widget
metadata:
  name: w
---
apiVersion: v1
kind: ConfigMap
metadata: {}
"#;

    let err = harness
        .cycle(&mut inst, &template("bad", raw))
        .await
        .unwrap_err();

    let ReconcilerError::Normalize(err) = err else {
        panic!("expected a normalization error, got {err:?}");
    };
    assert_eq!(err.violations.len(), 3);
    assert!(err.to_string().starts_with("3 object(s) failed scope validation"));
}

#[tokio::test]
async fn test_cluster_instance_requires_namespace_on_namespaced_children() {
    let harness = Harness::new();
    let mut inst = cluster_instance("team", "t");

    let err = harness
        .cycle(&mut inst, &cluster_template("t", &config_map("settings")))
        .await
        .unwrap_err();

    let ReconcilerError::Normalize(err) = err else {
        panic!("expected a normalization error, got {err:?}");
    };
    assert!(matches!(
        err.violations[0],
        ScopeViolation::MissingNamespace { .. }
    ));
}

#[tokio::test]
async fn test_invalid_yaml_produces_no_objects() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "broken");
    let raw = format!("{}---\nkind: [unclosed\n", config_map("a"));

    let err = harness
        .cycle(&mut inst, &template("broken", &raw))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "render");
    assert_eq!(harness.cluster.len(), 0);
    assert_eq!(harness.events.count("BuildFailed"), 1);
}

#[tokio::test]
async fn test_first_apply_is_all_or_nothing() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "cm");
    let tmpl = template("cm", &config_maps(&["a", "b", "c"]));
    harness.cluster.reject_apply("foo-b");

    let err = harness.cycle(&mut inst, &tmpl).await.unwrap_err();

    let ReconcilerError::Sync(err) = err else {
        panic!("expected a sync error, got {err:?}");
    };
    assert!(err.preflight);
    assert_eq!(err.failures.len(), 1);
    assert_eq!(err.failures[0].object, "ConfigMap ws/foo-b");
    assert_eq!(harness.cluster.len(), 0);
    assert!(inst.status.is_none());
    assert_eq!(harness.events.count("SyncFailed"), 1);

    harness.cluster.allow_apply("foo-b");
    harness.cycle(&mut inst, &tmpl).await.unwrap();
    assert_eq!(inst.status.unwrap().last_applied_objects_count, 3);
}

#[tokio::test]
async fn test_first_apply_tolerates_not_found_in_dry_run() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "cm");
    harness.cluster.dry_run_not_found("foo-b");

    let outcome = harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a", "b", "c"])))
        .await
        .unwrap();

    assert_eq!(outcome.sync.created, 3);
    assert_eq!(harness.cluster.names(), vec!["foo-a", "foo-b", "foo-c"]);
    assert_eq!(harness.events.count("SyncFailed"), 0);
    assert_eq!(inst.status.unwrap().last_applied_objects_count, 3);
}

#[tokio::test]
async fn test_documents_with_the_same_physical_name_are_rejected() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "cm");

    let err = harness
        .cycle(&mut inst, &template("cm", &config_maps(&["bar", "foo-bar"])))
        .await
        .unwrap_err();

    let ReconcilerError::Normalize(err) = err else {
        panic!("expected a normalization error, got {err:?}");
    };
    assert_eq!(
        err.violations,
        vec![ScopeViolation::DuplicateObject {
            object: "ConfigMap ws/foo-bar".to_string()
        }]
    );
    assert_eq!(harness.cluster.len(), 0);
    assert!(inst.status.is_none());
    assert_eq!(harness.events.count("BuildFailed"), 1);
}

#[tokio::test]
async fn test_sync_failure_keeps_previous_status_and_skips_gc() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "cm");
    harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a", "b"])))
        .await
        .unwrap();
    let before = inst.status.clone().unwrap();

    harness.cluster.reject_apply("foo-c");
    let err = harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a", "c"])))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), "sync");
    assert_eq!(inst.status.unwrap(), before);
    assert_eq!(harness.cluster.names(), vec!["foo-a", "foo-b"]);
    assert_eq!(harness.cluster.deletes(), 0);
}

#[tokio::test]
async fn test_kept_child_survives_removal_from_template() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "cm");
    let kept = format!(
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: c\n  annotations:\n    {ANNOTATION_DELETE_POLICY}: {DELETE_POLICY_KEEP}\n"
    );
    let raw = format!("{}---\n{kept}", config_maps(&["a"]));
    harness
        .cycle(&mut inst, &template("cm", &raw))
        .await
        .unwrap();

    let c = harness
        .cluster
        .object("v1", "ConfigMap", Some("ws"), "foo-c")
        .unwrap();
    assert!(c.owner_references().is_empty());

    let outcome = harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a"])))
        .await
        .unwrap();

    assert_eq!(outcome.gc.skipped.len(), 1);
    assert_eq!(harness.cluster.names(), vec!["foo-a", "foo-c"]);
    assert_eq!(inst.status.unwrap().last_applied_objects_count, 1);
}

#[tokio::test]
async fn test_gc_skips_object_recreated_under_the_same_name() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "cm");
    harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a", "c"])))
        .await
        .unwrap();

    harness.cluster.remove("v1", "ConfigMap", Some("ws"), "foo-c");
    let replacement = harness.cluster.insert(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": "foo-c", "namespace": "ws"},
        "data": {"owner": "someone-else"}
    }));

    let outcome = harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a"])))
        .await
        .unwrap();

    assert_eq!(outcome.gc.skipped.len(), 1);
    let live = harness
        .cluster
        .object("v1", "ConfigMap", Some("ws"), "foo-c")
        .expect("replacement survives");
    assert_eq!(live.uid(), replacement.uid());
    assert_eq!(inst.status.unwrap().last_applied_objects_count, 1);
}

#[tokio::test]
async fn test_failed_delete_still_leaves_the_ledger() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "cm");
    harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a", "c"])))
        .await
        .unwrap();

    harness.cluster.fail_delete("foo-c");
    let outcome = harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a"])))
        .await
        .unwrap();

    assert_eq!(outcome.gc.failed.len(), 1);
    assert_eq!(harness.events.count("GCFailed"), 1);
    assert!(harness
        .cluster
        .object("v1", "ConfigMap", Some("ws"), "foo-c")
        .is_some());
    let ledger = &inst.status.as_ref().unwrap().last_applied;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].name, "foo-a");
}

#[tokio::test]
async fn test_already_deleted_child_is_dropped_quietly() {
    let harness = Harness::new();
    let mut inst = instance("foo", "ws", "cm");
    harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a", "c"])))
        .await
        .unwrap();

    harness.cluster.remove("v1", "ConfigMap", Some("ws"), "foo-c");
    let outcome = harness
        .cycle(&mut inst, &template("cm", &config_maps(&["a"])))
        .await
        .unwrap();

    assert_eq!(outcome.gc.missing.len(), 1);
    assert_eq!(harness.events.count("GCFailed"), 0);
    assert_eq!(inst.status.unwrap().last_applied_objects_count, 1);
}
