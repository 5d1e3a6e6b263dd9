//! # Loose Equality
//!
//! Structural comparison of a live object and its dry-run desired state that
//! ignores fields the API server rewrites on every write.

use crate::engine::object::RenderedObject;
use serde_json::Value;

/// Drop volatile server-managed fields in place
fn strip_volatile(value: &mut Value) {
    let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) else {
        return;
    };
    metadata.remove("resourceVersion");
    if let Some(fields) = metadata
        .get_mut("managedFields")
        .and_then(Value::as_array_mut)
    {
        for entry in fields.iter_mut().filter_map(Value::as_object_mut) {
            entry.remove("time");
        }
    }
}

/// Whether `live` and `desired` differ only in volatile fields
pub fn loose_equal(live: &RenderedObject, desired: &RenderedObject) -> bool {
    let mut a = live.as_value().clone();
    let mut b = desired.as_value().clone();
    strip_volatile(&mut a);
    strip_volatile(&mut b);
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(rv: &str, time: &str, replicas: i64) -> RenderedObject {
        RenderedObject::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": "foo-web",
                "resourceVersion": rv,
                "managedFields": [
                    {"manager": "instance-controller", "operation": "Apply", "time": time}
                ]
            },
            "spec": {"replicas": replicas}
        }))
        .unwrap()
    }

    #[test]
    fn test_ignores_resource_version_and_timestamps() {
        assert!(loose_equal(
            &obj("1", "2024-01-01T00:00:00Z", 1),
            &obj("2", "2024-06-01T00:00:00Z", 1)
        ));
    }

    #[test]
    fn test_detects_spec_drift() {
        assert!(!loose_equal(
            &obj("1", "2024-01-01T00:00:00Z", 1),
            &obj("1", "2024-01-01T00:00:00Z", 2)
        ));
    }

    #[test]
    fn test_managed_field_manager_change_is_drift() {
        let live = obj("1", "t", 1);
        let mut desired = obj("1", "t", 1).into_value();
        desired["metadata"]["managedFields"][0]["manager"] = json!("kubectl");
        let desired = RenderedObject::from_value(desired).unwrap();
        assert!(!loose_equal(&live, &desired));
    }
}
