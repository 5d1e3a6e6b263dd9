//! Rewrites the targeted Service's ports and Ingress's rules from the
//! instance's network rules.
//!
//! Ports are named `port<targetPort>` and emitted in a stable order so that
//! re-applying the same rules never produces a diff.

use super::{TransformContext, TransformError, Transformer};
use crate::crd::NetworkRule;
use crate::engine::object::RenderedObject;
use json_patch::{AddOperation, Patch, PatchOperation};
use jsonptr::PointerBuf;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkTransformer;

impl Transformer for NetworkTransformer {
    fn name(&self) -> &'static str {
        "network"
    }

    fn transform(
        &self,
        objects: &mut [RenderedObject],
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        let Some(network) = &ctx.overrides.network else {
            return Ok(());
        };
        if network.rules.is_empty() {
            return Ok(());
        }

        let service_index = match &network.service {
            Some(target) => Some(ctx.find_target(objects, target).ok_or_else(|| {
                TransformError::TargetNotFound {
                    stage: "network",
                    target: target.to_string(),
                }
            })?),
            None => None,
        };

        if let Some(index) = service_index {
            let ports = service_ports(&network.rules)?;
            set_field(&mut objects[index], &["spec", "ports"], ports)?;
        }

        if let Some(target) = &network.ingress {
            let index = ctx.find_target(objects, target).ok_or_else(|| {
                TransformError::TargetNotFound {
                    stage: "network",
                    target: target.to_string(),
                }
            })?;
            let Some(service_index) = service_index else {
                return Err(TransformError::IngressWithoutService {
                    ingress: target.to_string(),
                });
            };
            let service_name = objects[service_index].name().to_string();
            let rules = ingress_rules(&service_name, &network.rules);
            set_field(&mut objects[index], &["spec", "rules"], rules)?;
        }
        Ok(())
    }
}

fn set_field(object: &mut RenderedObject, path: &[&str], value: Value) -> Result<(), TransformError> {
    let patch = Patch(vec![PatchOperation::Add(AddOperation {
        path: PointerBuf::from_tokens(path.iter().copied()),
        value,
    })]);
    super::patch::apply_patch(object, &patch)
}

/// Service ports, deduplicated by name and ordered by service port
///
/// One service port forwarding to two container ports cannot be expressed
/// and is rejected.
fn service_ports(rules: &[NetworkRule]) -> Result<Value, TransformError> {
    let mut seen = BTreeSet::new();
    let mut ports: Vec<&NetworkRule> = rules
        .iter()
        .filter(|rule| seen.insert(rule.port_name()))
        .collect();
    ports.sort_by_key(|rule| (rule.port_number, rule.target_port()));

    let mut targets: BTreeMap<(i32, &str), i32> = BTreeMap::new();
    for rule in &ports {
        let target = *targets
            .entry((rule.port_number, rule.protocol.as_str()))
            .or_insert(rule.target_port());
        if target != rule.target_port() {
            return Err(TransformError::ConflictingServicePort {
                port: rule.port_number,
                first: target,
                second: rule.target_port(),
            });
        }
    }

    Ok(Value::Array(
        ports
            .into_iter()
            .map(|rule| {
                json!({
                    "name": rule.port_name(),
                    "port": rule.port_number,
                    "targetPort": rule.target_port(),
                    "protocol": rule.protocol,
                })
            })
            .collect(),
    ))
}

/// Ingress rules grouped by host; hostless rules come first
fn ingress_rules(service_name: &str, rules: &[NetworkRule]) -> Value {
    let mut by_host: BTreeMap<Option<&str>, BTreeMap<&str, i32>> = BTreeMap::new();
    for rule in rules {
        by_host
            .entry(rule.host.as_deref())
            .or_default()
            .entry(rule.http_path.as_str())
            .or_insert(rule.port_number);
    }

    Value::Array(
        by_host
            .into_iter()
            .map(|(host, paths)| {
                let paths: Vec<Value> = paths
                    .into_iter()
                    .map(|(path, port)| {
                        json!({
                            "path": path,
                            "pathType": "Prefix",
                            "backend": {
                                "service": {"name": service_name, "port": {"number": port}}
                            }
                        })
                    })
                    .collect();
                let mut rule = json!({"http": {"paths": paths}});
                if let (Some(host), Some(map)) = (host, rule.as_object_mut()) {
                    map.insert("host".to_string(), Value::String(host.to_string()));
                }
                rule
            })
            .collect(),
    )
}
