//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions served by the controller as a
//! multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/bases/crds.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use instance_controller::crd::{ClusterInstance, ClusterTemplate, Instance, Template};
use kube::core::CustomResourceExt;

fn main() {
    let crds = [
        Template::crd(),
        ClusterTemplate::crd(),
        Instance::crd(),
        ClusterInstance::crd(),
    ];

    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
