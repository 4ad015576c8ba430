//! # vmforge Operator
//!
//! Reconciles VirtualMachine network interfaces: realizes each declared
//! interface on its network backend and assembles the guest-facing device,
//! customization, and netplan outputs.
//!
//! ## Usage
//! ```bash
//! vmforge-operator --config /etc/vmforge/operator.yaml --dev
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::task::JoinSet;
use tracing::{error, info};

mod cli;
mod config;
mod reconciler;
mod substrate;

use cli::Args;
use config::Config;
use reconciler::Reconciler;
use substrate::DevSubstrate;
use vmforge_network::NetworkProvider;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.log_json {
        vmforge_common::init_logging_json(&args.log_level)?;
    } else {
        vmforge_common::init_logging(&args.log_level)?;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting vmforge Operator"
    );

    let config = match &args.config {
        Some(config_path) => match Config::load(config_path) {
            Ok(cfg) => {
                info!(config_path = %config_path, "Configuration loaded");
                cfg.with_cli_overrides(&args)
            }
            Err(e) => {
                error!(error = %e, path = %config_path, "Failed to load configuration");
                return Err(e);
            }
        },
        None => {
            let default_path = "/etc/vmforge/operator.yaml";
            match Config::load(default_path) {
                Ok(cfg) => {
                    info!(config_path = %default_path, "Configuration loaded from default location");
                    cfg.with_cli_overrides(&args)
                }
                Err(_) => {
                    info!("No config file found, using CLI arguments and defaults");
                    Config::default_with_cli(&args)
                }
            }
        }
    };

    if !config.dev.enabled {
        anyhow::bail!(
            "no substrate integration configured; run with --dev for the in-memory substrate"
        );
    }

    let substrate = DevSubstrate::new(&config.dev);
    tokio::spawn(substrate.clone().run());

    let provider = NetworkProvider::new(
        substrate.inventory.clone(),
        substrate.overlay_store.clone(),
        substrate.switch_store.clone(),
    );
    let reconciler = Arc::new(Reconciler::new(provider, &config));

    if config.virtual_machines.is_empty() {
        info!("No virtual machines declared in configuration, nothing to do");
        return Ok(());
    }

    // One worker per VM, so a slow interface on one VM does not hold up
    // the others. Interfaces within a VM stay sequential.
    let mut workers = JoinSet::new();
    for vm in config.virtual_machines.clone() {
        let reconciler = reconciler.clone();
        workers.spawn(async move {
            let result = reconciler.reconcile_configured(&vm).await;
            (vm, result)
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = workers.join_next().await {
        let (vm, result) = joined?;
        match result {
            Ok(output) => {
                let netplan = serde_yaml::to_string(&output.netplan)?;
                info!(
                    vm = %output.vm.name,
                    namespace = %output.vm.namespace,
                    interfaces = output.interfaces.len(),
                    "Reconciled"
                );
                println!("# {}/{}\n{netplan}", output.vm.namespace, output.vm.name);
            }
            Err((err, disposition)) => {
                failed += 1;
                error!(
                    vm = %vm.name,
                    namespace = %vm.namespace,
                    error = %err,
                    ?disposition,
                    "Reconcile failed"
                );
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} virtual machine(s) failed to reconcile");
    }
    Ok(())
}
