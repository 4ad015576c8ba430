//! Core types shared across the network providers.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Network type tag selecting the software-defined overlay backend.
pub const OVERLAY_NETWORK_TYPE: &str = "nsx-t";

/// Network type tag selecting the distributed-virtual-switch backend.
pub const SWITCH_NETWORK_TYPE: &str = "vsphere-distributed";

/// IP protocol family of an address reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IpFamily {
    #[default]
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "IPv6")]
    Ipv6,
}

/// An IP configuration derived from backend-reported state.
///
/// The zero value (all fields empty) is the "unset" sentinel and means the
/// interface is configured for DHCP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpConfig {
    /// IP setting.
    pub ip: String,
    /// IP family (IPv4 vs IPv6) the IP belongs to.
    pub family: IpFamily,
    /// Gateway setting.
    pub gateway: String,
    /// Subnet mask setting.
    pub subnet_mask: String,
}

impl IpConfig {
    /// Whether this configuration is the unset/DHCP sentinel.
    pub fn is_unset(&self) -> bool {
        self.ip.is_empty()
    }
}

/// A typed reference to an externally managed backend resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedObjectRef {
    pub api_group: String,
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

/// A single declared network interface on a VirtualMachine spec.
///
/// Owned by the caller and read-only to the providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterfaceSpec {
    /// Name of the network to attach to.
    #[serde(default)]
    pub network_name: String,
    /// Network type tag: empty (named network), overlay, or switch.
    #[serde(default)]
    pub network_type: String,
    /// Optional reference to an already-created backend resource.
    /// When set, the switch backend attaches to it instead of creating one.
    #[serde(default)]
    pub provider_ref: Option<TypedObjectRef>,
    /// Ethernet card type; empty means the registry default.
    #[serde(default)]
    pub ethernet_card_type: String,
}

/// Identity of the VirtualMachine a reconcile pass is operating on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRef {
    pub name: String,
    pub namespace: String,
    pub uid: String,
}

/// Per-reconcile context handed to every provider call.
///
/// Carries the VM identity plus the caller's deadline. The wait loops check
/// the deadline on every iteration so a cancelled reconcile returns promptly
/// instead of running out the full poll budget.
#[derive(Debug, Clone)]
pub struct VmContext {
    pub vm: VmRef,
    deadline: Option<Instant>,
}

impl VmContext {
    /// Create a context with no deadline.
    pub fn new(vm: VmRef) -> Self {
        Self { vm, deadline: None }
    }

    /// Attach a deadline after which waits abort.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Whether the caller's deadline has passed.
    pub fn deadline_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn vm_ref() -> VmRef {
        VmRef {
            name: "test-vm".to_string(),
            namespace: "default".to_string(),
            uid: "uid-1".to_string(),
        }
    }

    #[test]
    fn test_ip_config_unset_sentinel() {
        assert!(IpConfig::default().is_unset());

        let set = IpConfig {
            ip: "10.0.0.5".to_string(),
            ..Default::default()
        };
        assert!(!set.is_unset());
    }

    #[test]
    fn test_context_deadline() {
        let ctx = VmContext::new(vm_ref());
        assert!(!ctx.deadline_expired());

        let expired = VmContext::new(vm_ref()).with_deadline(Instant::now());
        assert!(expired.deadline_expired());

        let future = VmContext::new(vm_ref())
            .with_deadline(Instant::now() + Duration::from_secs(60));
        assert!(!future.deadline_expired());
    }
}
