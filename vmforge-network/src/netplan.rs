//! Guest-side netplan network configuration.
//!
//! A transient document built fresh every reconcile from backend-reported
//! state; it is never persisted. Entries are keyed by synthetic interface
//! name (`eth0`, `eth1`, ...) in interface declaration order and matched to
//! devices by MAC.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::customization::subnet_mask_prefix_len;
use crate::error::Result;

/// Netplan document version emitted for guests.
pub const NETPLAN_VERSION: u32 = 2;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Device match predicate of a netplan ethernet entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetplanEthernetMatch {
    #[serde(rename = "macaddress", default, skip_serializing_if = "String::is_empty")]
    pub mac_address: String,
}

impl NetplanEthernetMatch {
    pub fn is_empty(&self) -> bool {
        self.mac_address.is_empty()
    }
}

/// Nameserver settings injected into every ethernet entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetplanEthernetNameservers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<String>,
}

impl NetplanEthernetNameservers {
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.search.is_empty()
    }
}

/// One guest ethernet interface: match-by-MAC plus static addresses or DHCP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetplanEthernet {
    #[serde(rename = "match", default, skip_serializing_if = "NetplanEthernetMatch::is_empty")]
    pub matches: NetplanEthernetMatch,
    #[serde(rename = "set-name", default, skip_serializing_if = "String::is_empty")]
    pub set_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dhcp4: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gateway4: String,
    #[serde(default, skip_serializing_if = "NetplanEthernetNameservers::is_empty")]
    pub nameservers: NetplanEthernetNameservers,
}

/// Netplan v2 document describing all guest interfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Netplan {
    pub version: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ethernets: BTreeMap<String, NetplanEthernet>,
}

/// Normalize a MAC address to the colon-separated lowercase form netplan
/// matches on.
pub fn normalize_netplan_mac(mac: &str) -> String {
    mac.replace('-', ":").to_lowercase()
}

/// Render an address and its subnet mask as CIDR notation, either family.
pub fn to_cidr_notation(ip: &str, mask: &str) -> Result<String> {
    let prefix = subnet_mask_prefix_len(mask)?;
    Ok(format!("{ip}/{prefix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_netplan_mac() {
        assert_eq!(normalize_netplan_mac("AA-BB-CC-DD-EE-FF"), "aa:bb:cc:dd:ee:ff");
        assert_eq!(normalize_netplan_mac("00:50:56:AA:BB:CC"), "00:50:56:aa:bb:cc");
        assert_eq!(normalize_netplan_mac(""), "");
    }

    #[test]
    fn test_to_cidr_notation() {
        assert_eq!(
            to_cidr_notation("10.0.0.5", "255.255.255.0").unwrap(),
            "10.0.0.5/24"
        );
        assert_eq!(
            to_cidr_notation("192.168.1.9", "255.255.0.0").unwrap(),
            "192.168.1.9/16"
        );
        assert_eq!(
            to_cidr_notation("fd00::5", "ffff:ffff:ffff:ffff::").unwrap(),
            "fd00::5/64"
        );
    }

    #[test]
    fn test_yaml_omits_empty_fields() {
        let mut netplan = Netplan {
            version: NETPLAN_VERSION,
            ethernets: BTreeMap::new(),
        };
        netplan.ethernets.insert(
            "eth0".to_string(),
            NetplanEthernet {
                matches: NetplanEthernetMatch {
                    mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
                },
                set_name: "eth0".to_string(),
                dhcp4: true,
                ..Default::default()
            },
        );

        let yaml = serde_yaml::to_string(&netplan).unwrap();
        assert!(yaml.contains("version: 2"));
        assert!(yaml.contains("macaddress: aa:bb:cc:dd:ee:ff"));
        assert!(yaml.contains("set-name: eth0"));
        assert!(yaml.contains("dhcp4: true"));
        // Empty static fields stay out of the document.
        assert!(!yaml.contains("addresses"));
        assert!(!yaml.contains("gateway4"));
        assert!(!yaml.contains("nameservers"));
    }

    #[test]
    fn test_static_entry_renders_cidr_and_gateway() {
        let eth = NetplanEthernet {
            matches: NetplanEthernetMatch {
                mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
            },
            addresses: vec![to_cidr_notation("10.0.0.5", "255.255.255.0").unwrap()],
            gateway4: "10.0.0.1".to_string(),
            ..Default::default()
        };

        let yaml = serde_yaml::to_string(&eth).unwrap();
        assert!(yaml.contains("- 10.0.0.5/24"));
        assert!(yaml.contains("gateway4: 10.0.0.1"));
    }
}
