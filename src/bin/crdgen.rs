//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML for the served kinds.
//!
//! ## Usage
//!
//! ```bash
//! # All kinds
//! cargo run --bin crdgen > config/crd/all.yaml
//!
//! # One kind, applied directly
//! cargo run --bin crdgen -- --kind PG | kubectl apply -f -
//! ```
//!
//! The generated CRDs include:
//! - OpenAPI schema validation
//! - Required fields
//! - Status subresource
//! - Print columns

use clap::Parser;
use managed_service_operator::adapter::AdapterRegistry;

#[derive(Parser, Debug)]
#[command(name = "crdgen", about = "Print CRD manifests for the operator's kinds")]
struct Cli {
    /// Kind to print (repeatable, case-insensitive); all kinds when omitted
    #[arg(long = "kind")]
    kinds: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    let registry = AdapterRegistry::builtin();

    let selected = if cli.kinds.is_empty() {
        registry.iter().collect::<Vec<_>>()
    } else {
        let mut selected = Vec::new();
        for kind in &cli.kinds {
            match registry.get(kind) {
                Some(registration) => selected.push(registration),
                None => {
                    eprintln!(
                        "Unknown kind '{kind}', expected one of: {}",
                        registry.kinds().join(", ")
                    );
                    std::process::exit(1);
                }
            }
        }
        selected
    };

    // Header comments warning that this file should not be edited manually
    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    println!("# Fix schema issues in the Rust types under src/crd/");
    println!("#");

    for registration in selected {
        let crd = (registration.crd)();
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize {} CRD to YAML: {e}", registration.kind);
                std::process::exit(1);
            }
        }
    }
}
