//! Inventory collaborator: read-only network metadata lookups.
//!
//! The providers never talk to the hypervisor directly. They resolve network
//! references through this trait, which the substrate integration implements
//! against the real inventory and tests implement in memory.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

/// A resolved reference to a network usable as an ethernet card backing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkReference {
    /// Standard network resolved by inventory name.
    Named { name: String },
    /// Distributed virtual port group addressed by its port group id.
    DistributedPortGroup { port_group_id: String },
}

impl NetworkReference {
    /// Reference a distributed port group directly by id, without a lookup.
    pub fn port_group(port_group_id: impl Into<String>) -> Self {
        NetworkReference::DistributedPortGroup {
            port_group_id: port_group_id.into(),
        }
    }
}

/// A distributed port group as reported by the cluster compute resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedPortGroup {
    /// Port group id.
    pub port_group_id: String,
    /// Display name.
    pub name: String,
    /// Overlay logical switch the port group realizes, empty when none.
    pub logical_switch_uuid: String,
}

/// Read-only network metadata lookups against the cluster inventory.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Resolve a network by inventory name.
    async fn find_network(&self, name: &str) -> Result<NetworkReference>;

    /// Distributed port groups attached to the cluster compute resource.
    async fn distributed_port_groups(&self) -> Result<Vec<DistributedPortGroup>>;
}

/// Resolve an overlay logical switch id to the single distributed port group
/// realizing it.
///
/// The logical switch id is supposed to be unique per cluster: zero matches
/// means the fabric has not realized the switch here, more than one means the
/// fabric is misconfigured and we cannot pick a port group.
pub async fn search_switch_network_reference(
    inventory: &dyn Inventory,
    network_id: &str,
) -> Result<NetworkReference> {
    let port_groups = inventory.distributed_port_groups().await?;
    if port_groups.is_empty() {
        return Err(NetworkError::NoPortGroups);
    }

    let matches: Vec<&DistributedPortGroup> = port_groups
        .iter()
        .filter(|pg| pg.logical_switch_uuid == network_id)
        .collect();

    match matches.len() {
        1 => Ok(NetworkReference::port_group(matches[0].port_group_id.clone())),
        0 => Err(NetworkError::SwitchNotFound(network_id.to_string())),
        n => Err(NetworkError::AmbiguousSwitchMatch {
            network_id: network_id.to_string(),
            matches: n,
        }),
    }
}

/// In-memory inventory for testing and development.
#[derive(Default)]
pub struct MockInventory {
    networks: RwLock<HashMap<String, NetworkReference>>,
    port_groups: RwLock<Vec<DistributedPortGroup>>,
}

impl MockInventory {
    /// Create an empty mock inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a network under an inventory name.
    pub fn add_network(&self, name: impl Into<String>, reference: NetworkReference) {
        self.networks
            .write()
            .expect("inventory lock poisoned")
            .insert(name.into(), reference);
    }

    /// Attach a distributed port group to the cluster.
    pub fn add_port_group(&self, port_group: DistributedPortGroup) {
        self.port_groups
            .write()
            .expect("inventory lock poisoned")
            .push(port_group);
    }
}

#[async_trait]
impl Inventory for MockInventory {
    async fn find_network(&self, name: &str) -> Result<NetworkReference> {
        self.networks
            .read()
            .map_err(|_| NetworkError::Inventory("lock poisoned".to_string()))?
            .get(name)
            .cloned()
            .ok_or_else(|| NetworkError::NetworkNotFound(name.to_string()))
    }

    async fn distributed_port_groups(&self) -> Result<Vec<DistributedPortGroup>> {
        Ok(self
            .port_groups
            .read()
            .map_err(|_| NetworkError::Inventory("lock poisoned".to_string()))?
            .clone())
    }
}
