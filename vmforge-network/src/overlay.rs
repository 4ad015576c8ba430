//! Overlay (logical switch fabric) network backend.
//!
//! Creates one `VirtualNetworkInterface` resource per VM+network pair, waits
//! for the fabric controller to realize it, then resolves the reported
//! logical switch to a distributed port group and derives the guest
//! configuration from the reported addresses. Addresses are IPv4 only.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};

use crate::customization::{CustomizationAdapterMapping, IpSettings};
use crate::device::{configure_ethernet_card, create_ethernet_card, VirtualEthernetCard};
use crate::error::{NetworkError, Result};
use crate::interface_list::InterfaceInfo;
use crate::inventory::{search_switch_network_reference, Inventory};
use crate::netplan::{normalize_netplan_mac, to_cidr_notation, NetplanEthernet, NetplanEthernetMatch};
use crate::provider::NetworkInterfaceProvider;
use crate::resources::{
    BackendResource, ObjectMeta, OverlayInterface, OverlayInterfaceSpec, OwnerRef,
};
use crate::store::{ApplyResult, ObjectStore, StoreError};
use crate::types::{IpConfig, IpFamily, NetworkInterfaceSpec, VmContext};
use crate::wait::wait_for_ready;

/// Backend for overlay networks.
pub struct OverlayNetworkProvider {
    store: Arc<dyn ObjectStore<OverlayInterface>>,
    inventory: Arc<dyn Inventory>,
}

impl OverlayNetworkProvider {
    pub fn new(
        store: Arc<dyn ObjectStore<OverlayInterface>>,
        inventory: Arc<dyn Inventory>,
    ) -> Self {
        Self { store, inventory }
    }

    /// Deterministic resource name for the VM+network pair.
    fn interface_name(network_name: &str, vm_name: &str) -> String {
        if network_name.is_empty() {
            format!("{vm_name}-lsp")
        } else {
            format!("{network_name}-{vm_name}-lsp")
        }
    }

    /// Create-or-adopt the attachment resource, then wait for readiness.
    async fn create_interface(
        &self,
        ctx: &VmContext,
        spec: &NetworkInterfaceSpec,
    ) -> Result<OverlayInterface> {
        let name = Self::interface_name(&spec.network_name, &ctx.vm.name);

        let desired = OverlayInterface {
            metadata: ObjectMeta {
                name: name.clone(),
                namespace: ctx.vm.namespace.clone(),
                owner_refs: vec![OwnerRef::for_vm(&ctx.vm)],
            },
            spec: OverlayInterfaceSpec {
                virtual_network: spec.network_name.clone(),
            },
            ..Default::default()
        };

        if self.store.apply(desired).await? == ApplyResult::Created {
            info!(
                namespace = %ctx.vm.namespace,
                name = %name,
                "Created VirtualNetworkInterface"
            );
        }

        self.wait_for_ready_interface(ctx, &name).await
    }

    /// Ready when any condition has a Ready-ish type with a True-ish status.
    /// Substring match tolerates label variants across fabric versions.
    fn is_ready(interface: &OverlayInterface) -> bool {
        interface
            .status
            .conditions
            .iter()
            .any(|c| c.condition_type.contains("Ready") && c.status.contains("True"))
    }

    async fn wait_for_ready_interface(
        &self,
        ctx: &VmContext,
        name: &str,
    ) -> Result<OverlayInterface> {
        let namespace = ctx.vm.namespace.clone();

        wait_for_ready(ctx, OverlayInterface::KIND, name, || {
            let store = self.store.clone();
            let namespace = namespace.clone();
            let name = name.to_string();
            async move {
                match store.get(&namespace, &name).await {
                    Ok(interface) if Self::is_ready(&interface) => Ok(Some(interface)),
                    Ok(_) => Ok(None),
                    // Our own create may not be visible yet.
                    Err(StoreError::NotFound { .. }) => Ok(None),
                    Err(err) => Err(err.into()),
                }
            }
        })
        .await
    }

    async fn build_device(
        &self,
        spec: &NetworkInterfaceSpec,
        interface: &OverlayInterface,
    ) -> Result<VirtualEthernetCard> {
        let logical_switch_id = interface
            .status
            .provider
            .as_ref()
            .map(|p| p.logical_switch_id.as_str())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| NetworkError::MissingBackendStatus {
                kind: OverlayInterface::KIND,
                name: interface.metadata.name.clone(),
                field: "logical switch id",
            })?;

        let network_ref =
            search_switch_network_reference(self.inventory.as_ref(), logical_switch_id)
                .await
                .map_err(|err| {
                    error!(
                        name = %interface.metadata.name,
                        logical_switch_id = %logical_switch_id,
                        error = %err,
                        "Failed to resolve overlay network to a port group"
                    );
                    err
                })?;

        let mut device = create_ethernet_card(&network_ref, &spec.ethernet_card_type)?;
        configure_ethernet_card(
            &mut device,
            &interface.status.interface_id,
            &interface.status.mac_address,
        );

        Ok(device)
    }

    /// DHCP when the fabric reported no address (or a single empty one),
    /// otherwise a fixed-IP mapping from the first reported address.
    fn customization(interface: &OverlayInterface) -> CustomizationAdapterMapping {
        let addrs = &interface.status.ip_addresses;

        let adapter = if addrs.is_empty() || (addrs.len() == 1 && addrs[0].ip.is_empty()) {
            IpSettings::dhcp()
        } else {
            let addr = &addrs[0];
            IpSettings::fixed_ipv4(&addr.ip, &addr.subnet_mask, &addr.gateway)
        };

        CustomizationAdapterMapping {
            mac_address: interface.status.mac_address.clone(),
            adapter,
        }
    }

    fn ip_config(interface: &OverlayInterface) -> IpConfig {
        match interface.status.ip_addresses.first() {
            Some(addr) => IpConfig {
                ip: addr.ip.clone(),
                family: IpFamily::Ipv4,
                gateway: addr.gateway.clone(),
                subnet_mask: addr.subnet_mask.clone(),
            },
            None => IpConfig::default(),
        }
    }

    fn netplan_ethernet(interface: &OverlayInterface) -> Result<NetplanEthernet> {
        let mut ethernet = NetplanEthernet {
            matches: NetplanEthernetMatch {
                mac_address: normalize_netplan_mac(&interface.status.mac_address),
            },
            ..Default::default()
        };

        let addrs = &interface.status.ip_addresses;
        if addrs.is_empty() || (addrs.len() == 1 && addrs[0].ip.is_empty()) {
            ethernet.dhcp4 = true;
        } else {
            let addr = &addrs[0];
            ethernet.addresses = vec![to_cidr_notation(&addr.ip, &addr.subnet_mask)?];
            ethernet.gateway4 = addr.gateway.clone();
        }

        Ok(ethernet)
    }
}

#[async_trait]
impl NetworkInterfaceProvider for OverlayNetworkProvider {
    #[instrument(skip(self, ctx, spec), fields(vm = %ctx.vm.name, network = %spec.network_name))]
    async fn ensure_network_interface(
        &self,
        ctx: &VmContext,
        spec: &NetworkInterfaceSpec,
    ) -> Result<InterfaceInfo> {
        let interface = self.create_interface(ctx, spec).await.map_err(|err| {
            error!(
                vm = %ctx.vm.name,
                network = %spec.network_name,
                error = %err,
                "Failed to create VirtualNetworkInterface"
            );
            err
        })?;

        let device = self.build_device(spec, &interface).await?;

        Ok(InterfaceInfo {
            device,
            customization: Self::customization(&interface),
            ip_configuration: Self::ip_config(&interface),
            netplan_ethernet: Self::netplan_ethernet(&interface)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customization::IpAssignment;
    use crate::inventory::{DistributedPortGroup, MockInventory, NetworkReference};
    use crate::resources::{Condition, OverlayIpAddress, OverlayProviderStatus};
    use crate::store::InMemoryStore;
    use crate::types::VmRef;

    fn ctx() -> VmContext {
        VmContext::new(VmRef {
            name: "vm-1".to_string(),
            namespace: "default".to_string(),
            uid: "uid-1".to_string(),
        })
    }

    fn inventory_with_switch(switch_id: &str) -> Arc<MockInventory> {
        let inventory = Arc::new(MockInventory::new());
        inventory.add_port_group(DistributedPortGroup {
            port_group_id: "dvportgroup-21".to_string(),
            name: "overlay-pg".to_string(),
            logical_switch_uuid: switch_id.to_string(),
        });
        inventory
    }

    fn fulfill(interface: &mut OverlayInterface, switch_id: &str, ip: Option<OverlayIpAddress>) {
        interface.status.conditions = vec![Condition::ready_true("NetworkReady")];
        interface.status.mac_address = "00:50:56:AA:00:01".to_string();
        interface.status.interface_id = "vif-1".to_string();
        interface.status.provider = Some(OverlayProviderStatus {
            logical_switch_id: switch_id.to_string(),
        });
        interface.status.ip_addresses = ip.into_iter().collect();
    }

    #[tokio::test]
    async fn test_interface_name_includes_suffix() {
        assert_eq!(
            OverlayNetworkProvider::interface_name("blue", "vm-1"),
            "blue-vm-1-lsp"
        );
        assert_eq!(OverlayNetworkProvider::interface_name("", "vm-1"), "vm-1-lsp");
    }

    #[tokio::test]
    async fn test_ensure_with_static_ip() {
        let store = Arc::new(InMemoryStore::<OverlayInterface>::new());
        let provider = OverlayNetworkProvider::new(store.clone(), inventory_with_switch("ls-1"));

        // Pre-create and fulfill so the wait succeeds immediately.
        let spec = NetworkInterfaceSpec {
            network_name: "blue".to_string(),
            network_type: crate::types::OVERLAY_NETWORK_TYPE.to_string(),
            ..Default::default()
        };
        store.apply(seeded_interface(&spec)).await.unwrap();
        store
            .update_status("default", "blue-vm-1-lsp", |i: &mut OverlayInterface| {
                fulfill(
                    i,
                    "ls-1",
                    Some(OverlayIpAddress {
                        ip: "10.0.0.5".to_string(),
                        gateway: "10.0.0.1".to_string(),
                        subnet_mask: "255.255.255.0".to_string(),
                    }),
                )
            })
            .unwrap();

        let info = provider
            .ensure_network_interface(&ctx(), &spec)
            .await
            .unwrap();

        assert_eq!(
            info.device.backing,
            NetworkReference::port_group("dvportgroup-21")
        );
        assert_eq!(info.device.external_id, "vif-1");
        assert_eq!(
            info.customization.adapter.assignment,
            IpAssignment::Fixed {
                ip: "10.0.0.5".to_string()
            }
        );
        assert_eq!(info.ip_configuration.family, IpFamily::Ipv4);
        assert_eq!(info.netplan_ethernet.addresses, vec!["10.0.0.5/24".to_string()]);
        assert_eq!(info.netplan_ethernet.gateway4, "10.0.0.1");
        assert_eq!(
            info.netplan_ethernet.matches.mac_address,
            "00:50:56:aa:00:01"
        );
    }

    #[tokio::test]
    async fn test_ensure_without_ip_is_dhcp() {
        let store = Arc::new(InMemoryStore::<OverlayInterface>::new());
        let provider = OverlayNetworkProvider::new(store.clone(), inventory_with_switch("ls-1"));

        let spec = NetworkInterfaceSpec {
            network_name: "blue".to_string(),
            ..Default::default()
        };
        store.apply(seeded_interface(&spec)).await.unwrap();
        store
            .update_status("default", "blue-vm-1-lsp", |i: &mut OverlayInterface| {
                fulfill(i, "ls-1", None)
            })
            .unwrap();

        let info = provider
            .ensure_network_interface(&ctx(), &spec)
            .await
            .unwrap();
        assert_eq!(info.customization.adapter.assignment, IpAssignment::Dhcp);
        assert!(info.netplan_ethernet.dhcp4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_ready_times_out() {
        let store = Arc::new(InMemoryStore::<OverlayInterface>::new());
        let provider = OverlayNetworkProvider::new(store, inventory_with_switch("ls-1"));

        let spec = NetworkInterfaceSpec {
            network_name: "blue".to_string(),
            ..Default::default()
        };
        let err = provider
            .ensure_network_interface(&ctx(), &spec)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::WaitTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_ready_without_provider_status_fails() {
        let store = Arc::new(InMemoryStore::<OverlayInterface>::new());
        let provider = OverlayNetworkProvider::new(store.clone(), inventory_with_switch("ls-1"));

        let spec = NetworkInterfaceSpec {
            network_name: "blue".to_string(),
            ..Default::default()
        };
        store.apply(seeded_interface(&spec)).await.unwrap();
        store
            .update_status("default", "blue-vm-1-lsp", |i: &mut OverlayInterface| {
                i.status.conditions = vec![Condition::ready_true("Ready")];
            })
            .unwrap();

        let err = provider
            .ensure_network_interface(&ctx(), &spec)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::MissingBackendStatus { .. }));
    }

    fn seeded_interface(spec: &NetworkInterfaceSpec) -> OverlayInterface {
        OverlayInterface {
            metadata: ObjectMeta {
                name: OverlayNetworkProvider::interface_name(&spec.network_name, "vm-1"),
                namespace: "default".to_string(),
                owner_refs: vec![OwnerRef::for_vm(&ctx().vm)],
            },
            spec: OverlayInterfaceSpec {
                virtual_network: spec.network_name.clone(),
            },
            ..Default::default()
        }
    }
}
