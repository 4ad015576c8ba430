//! Switch (distributed virtual switch) network backend.
//!
//! Same three-phase protocol as the overlay backend against a different
//! resource kind: create-or-adopt a `NetworkInterface`, wait for the backend
//! controller to fulfill it, then resolve the reported port group and derive
//! guest configuration. Supports IPv4 and IPv6, and an attach-to-existing
//! mode when the interface spec carries a provider reference.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::customization::{CustomizationAdapterMapping, IpSettings};
use crate::device::{configure_ethernet_card, create_ethernet_card, VirtualEthernetCard};
use crate::error::{NetworkError, Result};
use crate::interface_list::InterfaceInfo;
use crate::inventory::{search_switch_network_reference, Inventory, NetworkReference};
use crate::netplan::{normalize_netplan_mac, to_cidr_notation, NetplanEthernet, NetplanEthernetMatch};
use crate::provider::NetworkInterfaceProvider;
use crate::resources::{
    BackendResource, Condition, ObjectMeta, OwnerRef, SwitchInterface, SwitchInterfaceSpec,
    CONDITION_TRUE, SWITCH_INTERFACE_READY,
};
use crate::store::{ApplyResult, ObjectStore, StoreError};
use crate::types::{
    IpConfig, IpFamily, NetworkInterfaceSpec, VmContext, OVERLAY_NETWORK_TYPE, SWITCH_NETWORK_TYPE,
};
use crate::wait::wait_for_ready;

/// The only card type the backend controller defines.
const BACKEND_CARD_TYPE: &str = "vmxnet3";

/// Backend for distributed-virtual-switch networks.
pub struct SwitchNetworkProvider {
    store: Arc<dyn ObjectStore<SwitchInterface>>,
    inventory: Arc<dyn Inventory>,
}

impl SwitchNetworkProvider {
    pub fn new(
        store: Arc<dyn ObjectStore<SwitchInterface>>,
        inventory: Arc<dyn Inventory>,
    ) -> Self {
        Self { store, inventory }
    }

    /// Deterministic resource name for the VM+network pair. Falls back to
    /// the VM name when the interface has no network name, which also means
    /// at most one interface per network per VM.
    fn interface_name(network_name: &str, vm_name: &str) -> String {
        if network_name.is_empty() {
            vm_name.to_string()
        } else {
            format!("{network_name}-{vm_name}")
        }
    }

    /// Create-or-adopt the attachment resource, then wait for readiness.
    ///
    /// When the interface spec carries a provider reference the resource
    /// already exists and is only waited on, never written.
    async fn create_interface(
        &self,
        ctx: &VmContext,
        spec: &NetworkInterfaceSpec,
    ) -> Result<SwitchInterface> {
        if spec.provider_ref.is_none() {
            let name = Self::interface_name(&spec.network_name, &ctx.vm.name);
            let desired = SwitchInterface {
                metadata: ObjectMeta {
                    name: name.clone(),
                    namespace: ctx.vm.namespace.clone(),
                    owner_refs: vec![OwnerRef::for_vm(&ctx.vm)],
                },
                spec: SwitchInterfaceSpec {
                    network_name: spec.network_name.clone(),
                    card_type: BACKEND_CARD_TYPE.to_string(),
                },
                ..Default::default()
            };

            if self.store.apply(desired).await? == ApplyResult::Created {
                info!(
                    namespace = %ctx.vm.namespace,
                    name = %name,
                    "Created NetworkInterface"
                );
            }
        }

        self.wait_for_ready_interface(ctx, spec).await
    }

    /// Ready only on an exact condition type match with status true.
    fn is_ready(interface: &SwitchInterface) -> bool {
        interface
            .status
            .conditions
            .iter()
            .any(|c: &Condition| {
                c.condition_type == SWITCH_INTERFACE_READY && c.status == CONDITION_TRUE
            })
    }

    async fn wait_for_ready_interface(
        &self,
        ctx: &VmContext,
        spec: &NetworkInterfaceSpec,
    ) -> Result<SwitchInterface> {
        let name = match &spec.provider_ref {
            Some(provider_ref) => provider_ref.name.clone(),
            None => Self::interface_name(&spec.network_name, &ctx.vm.name),
        };
        let namespace = ctx.vm.namespace.clone();

        wait_for_ready(ctx, SwitchInterface::KIND, &name, || {
            let store = self.store.clone();
            let namespace = namespace.clone();
            let name = name.clone();
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

    /// Resolve the backend-reported network id to a hypervisor reference.
    ///
    /// Switch networks reference their port group directly; overlay networks
    /// routed here (provider-reference mode) need the port group scan.
    async fn network_reference(
        &self,
        network_type: &str,
        network_id: &str,
    ) -> Result<NetworkReference> {
        match network_type {
            SWITCH_NETWORK_TYPE => Ok(NetworkReference::port_group(network_id)),
            OVERLAY_NETWORK_TYPE => {
                search_switch_network_reference(self.inventory.as_ref(), network_id).await
            }
            other => Err(NetworkError::UnsupportedNetworkType(other.to_string())),
        }
    }

    async fn build_device(
        &self,
        spec: &NetworkInterfaceSpec,
        interface: &SwitchInterface,
    ) -> Result<VirtualEthernetCard> {
        let network_ref = self
            .network_reference(&spec.network_type, &interface.status.network_id)
            .await?;

        let mut device = create_ethernet_card(&network_ref, &spec.ethernet_card_type)?;
        configure_ethernet_card(
            &mut device,
            &interface.status.external_id,
            &interface.status.mac_address,
        );

        Ok(device)
    }

    /// DHCP when the backend reported no address, otherwise a fixed mapping
    /// from the first reported config, branching on IP family.
    ///
    /// The backend never reports a MAC for generated addresses, so the
    /// customization engine pairs mappings to devices by bus order.
    fn customization(interface: &SwitchInterface) -> Result<CustomizationAdapterMapping> {
        let adapter = match interface.status.ip_configs.first() {
            None => IpSettings::dhcp(),
            Some(config) => match config.family {
                IpFamily::Ipv4 => {
                    IpSettings::fixed_ipv4(&config.ip, &config.subnet_mask, &config.gateway)
                }
                IpFamily::Ipv6 => {
                    IpSettings::fixed_ipv6(&config.ip, &config.subnet_mask, &config.gateway)?
                }
            },
        };

        Ok(CustomizationAdapterMapping {
            mac_address: interface.status.mac_address.clone(),
            adapter,
        })
    }

    fn ip_config(interface: &SwitchInterface) -> IpConfig {
        match interface.status.ip_configs.first() {
            Some(config) => IpConfig {
                ip: config.ip.clone(),
                family: config.family,
                gateway: config.gateway.clone(),
                subnet_mask: config.subnet_mask.clone(),
            },
            None => IpConfig::default(),
        }
    }

    fn netplan_ethernet(interface: &SwitchInterface) -> Result<NetplanEthernet> {
        let mut ethernet = NetplanEthernet {
            matches: NetplanEthernetMatch {
                mac_address: normalize_netplan_mac(&interface.status.mac_address),
            },
            ..Default::default()
        };

        match interface.status.ip_configs.first() {
            None => ethernet.dhcp4 = true,
            Some(config) => {
                ethernet.addresses = vec![to_cidr_notation(&config.ip, &config.subnet_mask)?];
                ethernet.gateway4 = config.gateway.clone();
            }
        }

        Ok(ethernet)
    }
}

#[async_trait]
impl NetworkInterfaceProvider for SwitchNetworkProvider {
    #[instrument(skip(self, ctx, spec), fields(vm = %ctx.vm.name, network = %spec.network_name))]
    async fn ensure_network_interface(
        &self,
        ctx: &VmContext,
        spec: &NetworkInterfaceSpec,
    ) -> Result<InterfaceInfo> {
        let interface = self.create_interface(ctx, spec).await?;
        let device = self.build_device(spec, &interface).await?;

        Ok(InterfaceInfo {
            device,
            customization: Self::customization(&interface)?,
            ip_configuration: Self::ip_config(&interface),
            netplan_ethernet: Self::netplan_ethernet(&interface)?,
        })
    }
}
