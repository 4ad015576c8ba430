//! VirtualMachine network reconciliation.
//!
//! Drives the network provider for each VM: realize every declared interface,
//! then assemble the guest-facing outputs (device list, customization list,
//! netplan document). Failures are classified so the caller knows whether to
//! requeue or surface a spec error.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use vmforge_network::{
    InterfaceInfoList, Netplan, NetworkError, NetworkInterfaceSpec, NetworkProvider, VmContext,
    VmRef,
};

use crate::config::{Config, VirtualMachineConfig};

/// Outcome of one VM reconcile pass.
#[derive(Debug, Clone)]
pub struct ReconcileOutput {
    pub vm: VmRef,
    /// Per-interface results in declaration order.
    pub interfaces: InterfaceInfoList,
    /// Guest netplan document assembled from the interfaces.
    pub netplan: Netplan,
}

/// What the caller should do after a failed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileDisposition {
    /// Transient failure: requeue and try again.
    Requeue,
    /// The VM spec or fabric configuration needs correction first.
    Stalled,
}

/// Reconciles VirtualMachine network interfaces.
pub struct Reconciler {
    provider: NetworkProvider,
    dns_servers: Vec<String>,
    search_suffixes: Vec<String>,
    deadline: Option<Duration>,
}

impl Reconciler {
    pub fn new(provider: NetworkProvider, config: &Config) -> Self {
        let deadline = match config.reconcile.deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            provider,
            dns_servers: config.network.dns_servers.clone(),
            search_suffixes: config.network.search_suffixes.clone(),
            deadline,
        }
    }

    /// Reconcile one VM's declared interfaces.
    #[instrument(skip(self, vm, interfaces), fields(vm = %vm.name, namespace = %vm.namespace))]
    pub async fn reconcile(
        &self,
        vm: VmRef,
        interfaces: &[NetworkInterfaceSpec],
    ) -> Result<ReconcileOutput, (NetworkError, ReconcileDisposition)> {
        let mut ctx = VmContext::new(vm.clone());
        if let Some(deadline) = self.deadline {
            ctx = ctx.with_deadline(Instant::now() + deadline);
        }

        let infos = self
            .provider
            .ensure_network_interfaces(&ctx, interfaces)
            .await
            .map_err(|err| {
                let disposition = if err.is_retryable() {
                    ReconcileDisposition::Requeue
                } else {
                    ReconcileDisposition::Stalled
                };
                warn!(error = %err, ?disposition, "Network reconciliation failed");
                (err, disposition)
            })?;

        // A fresh VM has no NICs attached yet, so the single-NIC MAC
        // fallback never applies here.
        let netplan = infos.netplan(&[], &self.dns_servers, &self.search_suffixes);

        info!(interfaces = infos.len(), "Network interfaces reconciled");
        Ok(ReconcileOutput {
            vm,
            interfaces: infos,
            netplan,
        })
    }

    /// Reconcile a VM declared in the config file.
    pub async fn reconcile_configured(
        &self,
        vm: &VirtualMachineConfig,
    ) -> Result<ReconcileOutput, (NetworkError, ReconcileDisposition)> {
        let uid = if vm.uid.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            vm.uid.clone()
        };

        self.reconcile(
            VmRef {
                name: vm.name.clone(),
                namespace: vm.namespace.clone(),
                uid,
            },
            &vm.interfaces,
        )
        .await
    }
}
