//! Command-line argument parsing.

use clap::Parser;

/// vmforge Operator - VirtualMachine network reconciliation
#[derive(Parser, Debug)]
#[command(name = "vmforge-operator")]
#[command(about = "vmforge Operator - VirtualMachine network reconciliation")]
#[command(version)]
pub struct Args {
    /// Path to configuration file (optional, defaults used if not found)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// DNS servers injected into guest netplan documents
    #[arg(long)]
    pub dns_server: Vec<String>,

    /// DNS search suffixes injected into guest netplan documents
    #[arg(long)]
    pub search_suffix: Vec<String>,

    /// Per-VM reconcile deadline in seconds (0 disables the deadline)
    #[arg(long)]
    pub reconcile_deadline_secs: Option<u64>,

    /// Run against the in-memory development substrate
    #[arg(long)]
    pub dev: bool,
}
