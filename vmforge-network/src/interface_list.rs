//! Per-interface results and their aggregate views.

use std::collections::BTreeMap;

use crate::customization::CustomizationAdapterMapping;
use crate::device::VirtualEthernetCard;
use crate::netplan::{normalize_netplan_mac, Netplan, NetplanEthernet, NETPLAN_VERSION};
use crate::types::IpConfig;

/// Outcome of ensuring one network interface.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceInfo {
    /// Hypervisor device descriptor for reconfiguration.
    pub device: VirtualEthernetCard,
    /// Guest customization mapping, positionally paired with the device.
    pub customization: CustomizationAdapterMapping,
    /// Derived IP configuration; the zero value means DHCP.
    pub ip_configuration: IpConfig,
    /// Netplan fragment for the guest-side network document.
    pub netplan_ethernet: NetplanEthernet,
}

/// Ordered per-interface outcomes for one VM.
///
/// Order is interface declaration order and is significant: it determines
/// device bus ordering and the guest interface names (`eth0`, `eth1`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceInfoList(Vec<InterfaceInfo>);

impl InterfaceInfoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, info: InterfaceInfo) {
        self.0.push(info);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InterfaceInfo> {
        self.0.iter()
    }

    /// Device list in bus order (list order).
    pub fn virtual_devices(&self) -> Vec<VirtualEthernetCard> {
        self.0.iter().map(|info| info.device.clone()).collect()
    }

    /// Customization list, in the same order as the device list. The guest
    /// customization engine pairs the two positionally.
    pub fn interface_customizations(&self) -> Vec<CustomizationAdapterMapping> {
        self.0.iter().map(|info| info.customization.clone()).collect()
    }

    /// IP configuration list in declaration order.
    pub fn ip_configs(&self) -> Vec<IpConfig> {
        self.0.iter().map(|info| info.ip_configuration.clone()).collect()
    }

    /// Build the guest netplan document.
    ///
    /// Entries are keyed `eth<index>` and get the nameserver settings
    /// injected. When a backend did not report a MAC and exactly one
    /// hypervisor NIC is already attached, match by that NIC's MAC: the
    /// switch backend never fills in the MAC, so on first attachment the
    /// hypervisor-generated address is the only usable match key.
    pub fn netplan(
        &self,
        current_eth_cards: &[VirtualEthernetCard],
        dns_servers: &[String],
        search_suffixes: &[String],
    ) -> Netplan {
        let mut ethernets = BTreeMap::new();

        for (index, info) in self.0.iter().enumerate() {
            let mut ethernet = info.netplan_ethernet.clone();

            if ethernet.matches.is_empty() && current_eth_cards.len() == 1 {
                // Assumes at most one NIC per backing network; with several
                // existing NICs we have no reliable way to pair them up.
                ethernet.matches.mac_address =
                    normalize_netplan_mac(&current_eth_cards[0].mac_address);
            }

            ethernet.nameservers.addresses = dns_servers.to_vec();
            ethernet.nameservers.search = search_suffixes.to_vec();

            let name = format!("eth{index}");
            ethernet.set_name = name.clone();
            ethernets.insert(name, ethernet);
        }

        Netplan {
            version: NETPLAN_VERSION,
            ethernets,
        }
    }
}

impl From<Vec<InterfaceInfo>> for InterfaceInfoList {
    fn from(infos: Vec<InterfaceInfo>) -> Self {
        Self(infos)
    }
}

impl IntoIterator for InterfaceInfoList {
    type Item = InterfaceInfo;
    type IntoIter = std::vec::IntoIter<InterfaceInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
