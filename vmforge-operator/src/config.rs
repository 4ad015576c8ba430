//! Configuration management for the operator.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use vmforge_network::NetworkInterfaceSpec;

use crate::cli::Args;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global network settings applied to every VM.
    pub network: NetworkConfig,
    /// Reconciliation settings.
    pub reconcile: ReconcileConfig,
    /// VirtualMachines to reconcile. In development mode this stands in for
    /// the cluster watch.
    pub virtual_machines: Vec<VirtualMachineConfig>,
    /// Development substrate settings.
    pub dev: DevConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config =
            serde_yaml::from_str(&content).with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// Apply CLI argument overrides to the configuration.
    pub fn with_cli_overrides(mut self, args: &Args) -> Self {
        if !args.dns_server.is_empty() {
            self.network.dns_servers = args.dns_server.clone();
        }

        if !args.search_suffix.is_empty() {
            self.network.search_suffixes = args.search_suffix.clone();
        }

        if let Some(secs) = args.reconcile_deadline_secs {
            self.reconcile.deadline_secs = secs;
        }

        if args.dev {
            self.dev.enabled = true;
        }

        self
    }

    /// Configuration built purely from CLI arguments and defaults.
    pub fn default_with_cli(args: &Args) -> Self {
        Self::default().with_cli_overrides(args)
    }
}

/// Global network settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// DNS servers injected into every guest netplan document.
    pub dns_servers: Vec<String>,
    /// DNS search suffixes injected into every guest netplan document.
    pub search_suffixes: Vec<String>,
}

/// Reconciliation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Per-VM reconcile deadline in seconds. Zero disables the deadline.
    pub deadline_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        // Leave headroom above the per-interface readiness budget.
        Self { deadline_secs: 60 }
    }
}

/// A VirtualMachine declaration from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VirtualMachineConfig {
    pub name: String,
    pub namespace: String,
    /// Stable identity; auto-generated when empty.
    pub uid: String,
    /// Declared network interfaces, in order.
    pub interfaces: Vec<NetworkInterfaceSpec>,
}

/// Development substrate settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DevConfig {
    /// Simulate the backend controllers and inventory in memory.
    pub enabled: bool,
    /// Named networks registered in the simulated inventory.
    pub networks: Vec<String>,
    /// Overlay logical switches realized as simulated port groups.
    pub logical_switches: Vec<String>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            networks: vec!["VM Network".to_string()],
            logical_switches: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
network:
  dns_servers:
    - 10.0.0.53
  search_suffixes:
    - corp.local

reconcile:
  deadline_secs: 120

virtual_machines:
  - name: web-0
    namespace: prod
    interfaces:
      - network_name: VM Network
      - network_name: app-net
        network_type: nsx-t

dev:
  enabled: true
  logical_switches:
    - ls-uuid-app
"#;

        let config: Config = serde_yaml::from_str(yaml).expect("Failed to parse YAML");
        assert_eq!(config.network.dns_servers, vec!["10.0.0.53".to_string()]);
        assert_eq!(config.reconcile.deadline_secs, 120);
        assert_eq!(config.virtual_machines.len(), 1);
        assert_eq!(config.virtual_machines[0].interfaces.len(), 2);
        assert_eq!(
            config.virtual_machines[0].interfaces[1].network_type,
            "nsx-t"
        );
        assert!(config.dev.enabled);
    }

    #[test]
    fn test_cli_overrides() {
        let args = crate::cli::Args::parse_from([
            "vmforge-operator",
            "--dns-server",
            "1.1.1.1",
            "--reconcile-deadline-secs",
            "30",
            "--dev",
        ]);

        let config = Config::default_with_cli(&args);
        assert_eq!(config.network.dns_servers, vec!["1.1.1.1".to_string()]);
        assert_eq!(config.reconcile.deadline_secs, 30);
        assert!(config.dev.enabled);
    }
}
