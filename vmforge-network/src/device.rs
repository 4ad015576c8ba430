//! Virtual ethernet card construction.
//!
//! This is the hypervisor-facing half of an interface: a device description
//! built from a network reference, later fed into VM reconfiguration. The
//! factory is pure apart from the read-only network metadata it receives.

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};
use crate::inventory::NetworkReference;

/// Registry of supported ethernet card types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EthernetCardKind {
    /// Paravirtual card, the default for modern guests.
    #[default]
    Vmxnet3,
    Vmxnet2,
    E1000,
    E1000e,
    Pcnet32,
    Sriov,
}

impl EthernetCardKind {
    /// Parse an ethernet card type from an interface spec.
    ///
    /// The empty string selects the registry default.
    pub fn parse(card_type: &str) -> Result<Self> {
        match card_type {
            "" | "vmxnet3" => Ok(EthernetCardKind::Vmxnet3),
            "vmxnet2" => Ok(EthernetCardKind::Vmxnet2),
            "e1000" => Ok(EthernetCardKind::E1000),
            "e1000e" => Ok(EthernetCardKind::E1000e),
            "pcnet32" => Ok(EthernetCardKind::Pcnet32),
            "sriov" => Ok(EthernetCardKind::Sriov),
            other => Err(NetworkError::UnknownEthernetCardType(other.to_string())),
        }
    }
}

/// How the hypervisor assigns the card's MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MacAddressType {
    /// Hypervisor generates the MAC.
    #[default]
    Generated,
    /// MAC copied verbatim from backend status.
    Manual,
}

/// A hypervisor-native virtual ethernet device description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualEthernetCard {
    /// Card model presented to the guest.
    pub kind: EthernetCardKind,
    /// Network the card is backed by.
    pub backing: NetworkReference,
    /// Opaque identifier the backend controller uses to recognize the port.
    pub external_id: String,
    /// MAC address; empty when the hypervisor generates one.
    pub mac_address: String,
    /// MAC assignment mode.
    pub address_type: MacAddressType,
}

/// Build an ethernet card backed by the given network reference.
pub fn create_ethernet_card(
    network: &NetworkReference,
    card_type: &str,
) -> Result<VirtualEthernetCard> {
    let kind = EthernetCardKind::parse(card_type)?;

    Ok(VirtualEthernetCard {
        kind,
        backing: network.clone(),
        external_id: String::new(),
        mac_address: String::new(),
        address_type: MacAddressType::Generated,
    })
}

/// Apply backend-reported identity to an ethernet card.
///
/// The MAC is copied verbatim when the backend reports one, otherwise the
/// card is left for the hypervisor to assign an address.
pub fn configure_ethernet_card(card: &mut VirtualEthernetCard, external_id: &str, mac_address: &str) {
    card.external_id = external_id.to_string();
    if !mac_address.is_empty() {
        card.mac_address = mac_address.to_string();
        card.address_type = MacAddressType::Manual;
    } else {
        card.address_type = MacAddressType::Generated;
    }
}
