//! Named network backend.
//!
//! The simplest backend: resolve the network directly by inventory name and
//! build a DHCP-only interface. No backend resource is created and nothing
//! is polled.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::customization::{CustomizationAdapterMapping, IpSettings};
use crate::device::create_ethernet_card;
use crate::error::Result;
use crate::interface_list::InterfaceInfo;
use crate::inventory::Inventory;
use crate::netplan::NetplanEthernet;
use crate::provider::NetworkInterfaceProvider;
use crate::types::{IpConfig, NetworkInterfaceSpec, VmContext};

/// Backend for plain named networks.
pub struct NamedNetworkProvider {
    inventory: Arc<dyn Inventory>,
}

impl NamedNetworkProvider {
    pub fn new(inventory: Arc<dyn Inventory>) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl NetworkInterfaceProvider for NamedNetworkProvider {
    #[instrument(skip(self, ctx, spec), fields(vm = %ctx.vm.name, network = %spec.network_name))]
    async fn ensure_network_interface(
        &self,
        ctx: &VmContext,
        spec: &NetworkInterfaceSpec,
    ) -> Result<InterfaceInfo> {
        let network_ref = self.inventory.find_network(&spec.network_name).await?;
        let device = create_ethernet_card(&network_ref, &spec.ethernet_card_type)?;

        Ok(InterfaceInfo {
            device,
            customization: CustomizationAdapterMapping {
                mac_address: String::new(),
                adapter: IpSettings::dhcp(),
            },
            ip_configuration: IpConfig::default(),
            netplan_ethernet: NetplanEthernet::default(),
        })
    }
}
