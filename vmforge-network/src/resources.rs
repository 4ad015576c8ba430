//! Backend resource model.
//!
//! Each overlay/switch interface is realized as a cluster-namespaced record:
//! the provider writes the spec half and an external infrastructure
//! controller fills in the status half (IP assignment, MAC, switch/port
//! identifiers, readiness conditions). The records are owned by the VM so
//! the substrate garbage-collects them when the VM is deleted.

use serde::{Deserialize, Serialize};

use crate::types::{IpFamily, VmRef};

/// API group of the switch-backend interface resource.
pub const SWITCH_INTERFACE_GROUP: &str = "net.vmforge.io";
/// API version of the switch-backend interface resource.
pub const SWITCH_INTERFACE_VERSION: &str = "v1alpha1";
/// Kind of the switch-backend interface resource.
pub const SWITCH_INTERFACE_KIND: &str = "NetworkInterface";

/// Condition type the switch backend requires for readiness (exact match).
pub const SWITCH_INTERFACE_READY: &str = "Ready";

/// Condition status value meaning "true".
pub const CONDITION_TRUE: &str = "True";

/// Owning object of a backend resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
    pub uid: String,
}

impl OwnerRef {
    /// Owner reference pointing at the VM a resource belongs to.
    pub fn for_vm(vm: &VmRef) -> Self {
        Self {
            kind: "VirtualMachine".to_string(),
            name: vm.name.clone(),
            uid: vm.uid.clone(),
        }
    }
}

/// Identifying metadata of a backend resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub owner_refs: Vec<OwnerRef>,
}

/// A readiness condition reported by the backend controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
}

impl Condition {
    /// A condition of the given type with status "True".
    pub fn ready_true(condition_type: impl Into<String>) -> Self {
        Self {
            condition_type: condition_type.into(),
            status: CONDITION_TRUE.to_string(),
        }
    }
}

/// A backend resource the generic store can hold.
///
/// The spec half belongs to the provider and the status half to the backend
/// controller; `desired_state_matches` and `copy_status_from` tell the store
/// how to apply the spec half without clobbering status.
pub trait BackendResource: Clone + Send + Sync + 'static {
    /// Resource kind, used in errors and logs.
    const KIND: &'static str;

    fn metadata(&self) -> &ObjectMeta;

    /// Whether the stored resource already carries this desired state.
    fn desired_state_matches(&self, existing: &Self) -> bool;

    /// Carry the status half over from the stored resource.
    fn copy_status_from(&mut self, existing: &Self);
}

// ---------------------------------------------------------------------------
// Overlay backend resource
// ---------------------------------------------------------------------------

/// Desired state of an overlay attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayInterfaceSpec {
    /// Name of the overlay virtual network to attach to.
    pub virtual_network: String,
}

/// Fabric-assigned identifiers for an overlay attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayProviderStatus {
    /// Logical switch realizing the virtual network.
    pub logical_switch_id: String,
}

/// An address assigned by the overlay fabric. IPv4 only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayIpAddress {
    pub ip: String,
    pub gateway: String,
    pub subnet_mask: String,
}

/// Status half of an overlay attachment, filled by the fabric controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayInterfaceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub mac_address: String,
    /// Port identifier on the logical switch.
    #[serde(default)]
    pub interface_id: String,
    #[serde(default)]
    pub provider: Option<OverlayProviderStatus>,
    #[serde(default)]
    pub ip_addresses: Vec<OverlayIpAddress>,
}

/// Overlay attachment resource, one per VM+network pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayInterface {
    pub metadata: ObjectMeta,
    pub spec: OverlayInterfaceSpec,
    #[serde(default)]
    pub status: OverlayInterfaceStatus,
}

impl BackendResource for OverlayInterface {
    const KIND: &'static str = "VirtualNetworkInterface";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn desired_state_matches(&self, existing: &Self) -> bool {
        self.spec == existing.spec && self.metadata.owner_refs == existing.metadata.owner_refs
    }

    fn copy_status_from(&mut self, existing: &Self) {
        self.status = existing.status.clone();
    }
}

// ---------------------------------------------------------------------------
// Switch backend resource
// ---------------------------------------------------------------------------

/// Desired state of a switch attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchInterfaceSpec {
    /// Name of the network to attach to.
    pub network_name: String,
    /// Card type requested from the backend controller.
    pub card_type: String,
}

/// An address assigned by the switch backend controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchIpConfig {
    pub ip: String,
    #[serde(default)]
    pub family: IpFamily,
    pub gateway: String,
    pub subnet_mask: String,
}

/// Status half of a switch attachment, filled by the backend controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchInterfaceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub external_id: String,
    /// Distributed port group id backing the interface.
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub ip_configs: Vec<SwitchIpConfig>,
}

/// Switch attachment resource, one per VM+network pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchInterface {
    pub metadata: ObjectMeta,
    pub spec: SwitchInterfaceSpec,
    #[serde(default)]
    pub status: SwitchInterfaceStatus,
}

impl BackendResource for SwitchInterface {
    const KIND: &'static str = SWITCH_INTERFACE_KIND;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn desired_state_matches(&self, existing: &Self) -> bool {
        self.spec == existing.spec && self.metadata.owner_refs == existing.metadata.owner_refs
    }

    fn copy_status_from(&mut self, existing: &Self) {
        self.status = existing.status.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_ref_for_vm() {
        let vm = VmRef {
            name: "web-0".to_string(),
            namespace: "prod".to_string(),
            uid: "uid-42".to_string(),
        };
        let owner = OwnerRef::for_vm(&vm);
        assert_eq!(owner.kind, "VirtualMachine");
        assert_eq!(owner.name, "web-0");
        assert_eq!(owner.uid, "uid-42");
    }

    #[test]
    fn test_desired_state_ignores_status() {
        let mut desired = SwitchInterface {
            metadata: ObjectMeta {
                name: "net-vm".to_string(),
                namespace: "prod".to_string(),
                owner_refs: vec![],
            },
            spec: SwitchInterfaceSpec {
                network_name: "net".to_string(),
                card_type: "vmxnet3".to_string(),
            },
            status: SwitchInterfaceStatus::default(),
        };

        let mut stored = desired.clone();
        stored.status.mac_address = "00:50:56:00:00:01".to_string();
        assert!(desired.desired_state_matches(&stored));

        desired.copy_status_from(&stored);
        assert_eq!(desired.status.mac_address, "00:50:56:00:00:01");
    }
}
