//! Guest OS customization descriptors.
//!
//! A customization mapping pairs a MAC address with the IP settings the
//! guest customization engine should program into the interface. The engine
//! pairs mappings to devices positionally, so the customization list must
//! stay in device bus order.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

/// How the guest obtains the interface IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IpAssignment {
    /// No IPv4 assignment configured (IPv6-only settings leave this unset).
    #[default]
    Unset,
    /// Guest runs DHCP on the interface.
    Dhcp,
    /// Fixed IPv4 address.
    Fixed { ip: String },
}

/// A fixed IPv6 address with its subnet prefix length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6Address {
    pub ip: String,
    pub subnet_prefix: u32,
}

/// IPv6 settings of a customization adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ipv6Settings {
    pub addresses: Vec<Ipv6Address>,
    pub gateways: Vec<String>,
}

/// Per-adapter IP settings handed to the guest customization engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpSettings {
    pub assignment: IpAssignment,
    #[serde(default)]
    pub subnet_mask: String,
    #[serde(default)]
    pub gateways: Vec<String>,
    #[serde(default)]
    pub ipv6: Option<Ipv6Settings>,
}

impl IpSettings {
    /// DHCP settings with nothing else configured.
    pub fn dhcp() -> Self {
        Self {
            assignment: IpAssignment::Dhcp,
            ..Default::default()
        }
    }

    /// Fixed IPv4 settings.
    pub fn fixed_ipv4(ip: &str, subnet_mask: &str, gateway: &str) -> Self {
        Self {
            assignment: IpAssignment::Fixed { ip: ip.to_string() },
            subnet_mask: subnet_mask.to_string(),
            gateways: vec![gateway.to_string()],
            ipv6: None,
        }
    }

    /// Fixed IPv6 settings with the prefix length derived from the mask.
    pub fn fixed_ipv6(ip: &str, subnet_mask: &str, gateway: &str) -> Result<Self> {
        Ok(Self {
            assignment: IpAssignment::Unset,
            subnet_mask: String::new(),
            gateways: Vec::new(),
            ipv6: Some(Ipv6Settings {
                addresses: vec![Ipv6Address {
                    ip: ip.to_string(),
                    subnet_prefix: subnet_mask_prefix_len(subnet_mask)?,
                }],
                gateways: vec![gateway.to_string()],
            }),
        })
    }
}

/// A per-interface customization instruction, matched to a device by MAC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomizationAdapterMapping {
    /// MAC of the device this mapping belongs to; empty when the hypervisor
    /// generates the MAC, in which case the engine pairs by position.
    #[serde(default)]
    pub mac_address: String,
    pub adapter: IpSettings,
}

/// Number of leading one-bits in a subnet mask, parsed from its address form.
///
/// Accepts both dotted-decimal (`255.255.255.0` -> 24) and IPv6 hex
/// (`ffff:ffff:ffff:ffff::` -> 64) notation.
pub fn subnet_mask_prefix_len(mask: &str) -> Result<u32> {
    let parsed: IpAddr = mask
        .parse()
        .map_err(|_| NetworkError::InvalidSubnetMask(mask.to_string()))?;

    let ones = match parsed {
        IpAddr::V4(v4) => u32::from(v4).count_ones(),
        IpAddr::V6(v6) => u128::from(v6).count_ones(),
    };
    Ok(ones)
}
