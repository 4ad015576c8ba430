//! In-memory development substrate.
//!
//! Simulates the collaborators the operator talks to in a real cluster: the
//! inventory, the backend resource stores, and the backend controllers that
//! fulfill attachment resources. Lets the operator run end-to-end with no
//! infrastructure behind it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use vmforge_network::inventory::DistributedPortGroup;
use vmforge_network::resources::{
    Condition, OverlayInterface, OverlayIpAddress, OverlayProviderStatus, SwitchInterface,
    SwitchIpConfig, SWITCH_INTERFACE_READY,
};
use vmforge_network::{InMemoryStore, IpFamily, MockInventory};

use crate::config::DevConfig;

/// How often the simulated controllers scan for unfulfilled resources.
const FULFILL_INTERVAL: Duration = Duration::from_millis(50);

/// The simulated substrate: inventory, stores, and fulfillment loop.
pub struct DevSubstrate {
    pub inventory: Arc<MockInventory>,
    pub overlay_store: Arc<InMemoryStore<OverlayInterface>>,
    pub switch_store: Arc<InMemoryStore<SwitchInterface>>,
    /// Logical switches already realized as port groups.
    realized_switches: Mutex<HashSet<String>>,
    next_mac: AtomicU32,
    next_ip: AtomicU32,
    next_port_group: AtomicU32,
}

impl DevSubstrate {
    /// Build the substrate and register the configured inventory contents.
    pub fn new(config: &DevConfig) -> Arc<Self> {
        let inventory = Arc::new(MockInventory::new());
        for network in &config.networks {
            inventory.add_network(
                network.clone(),
                vmforge_network::NetworkReference::Named {
                    name: network.clone(),
                },
            );
        }

        let substrate = Arc::new(Self {
            inventory,
            overlay_store: Arc::new(InMemoryStore::new()),
            switch_store: Arc::new(InMemoryStore::new()),
            realized_switches: Mutex::new(HashSet::new()),
            next_mac: AtomicU32::new(1),
            next_ip: AtomicU32::new(10),
            next_port_group: AtomicU32::new(1000),
        });

        for switch in &config.logical_switches {
            substrate.realize_switch(switch);
        }

        substrate
    }

    /// Run the simulated backend controllers until the task is dropped.
    pub async fn run(self: Arc<Self>) {
        info!("Development substrate running");
        loop {
            self.fulfill_overlay_interfaces();
            self.fulfill_switch_interfaces();
            tokio::time::sleep(FULFILL_INTERVAL).await;
        }
    }

    /// Register a port group realizing the given logical switch, once.
    fn realize_switch(&self, switch_id: &str) {
        let mut realized = self
            .realized_switches
            .lock()
            .expect("substrate lock poisoned");
        if realized.insert(switch_id.to_string()) {
            let port_group_id = format!(
                "dvportgroup-{}",
                self.next_port_group.fetch_add(1, Ordering::SeqCst)
            );
            self.inventory.add_port_group(DistributedPortGroup {
                port_group_id,
                name: format!("pg-{switch_id}"),
                logical_switch_uuid: switch_id.to_string(),
            });
        }
    }

    fn next_mac_address(&self) -> String {
        let n = self.next_mac.fetch_add(1, Ordering::SeqCst);
        format!("00:50:56:{:02x}:{:02x}:{:02x}", n >> 16, (n >> 8) & 0xff, n & 0xff)
    }

    fn next_ip_address(&self) -> String {
        let n = self.next_ip.fetch_add(1, Ordering::SeqCst);
        format!("10.10.{}.{}", (n >> 8) & 0xff, n & 0xff)
    }

    /// Fulfill pending overlay attachments as the fabric controller would.
    fn fulfill_overlay_interfaces(&self) {
        for interface in self.overlay_store.list() {
            if !interface.status.conditions.is_empty() {
                continue;
            }

            let switch_id = format!("ls-{}", interface.spec.virtual_network);
            self.realize_switch(&switch_id);

            let mac = self.next_mac_address();
            let ip = self.next_ip_address();
            let name = interface.metadata.name.clone();
            let namespace = interface.metadata.namespace.clone();
            debug!(namespace = %namespace, name = %name, ip = %ip, "Fulfilling overlay interface");

            let result = self.overlay_store.update_status(
                &namespace,
                &name,
                |netif: &mut OverlayInterface| {
                    netif.status.conditions = vec![Condition::ready_true("Ready")];
                    netif.status.mac_address = mac;
                    netif.status.interface_id = format!("vif-{name}");
                    netif.status.provider = Some(OverlayProviderStatus {
                        logical_switch_id: switch_id,
                    });
                    netif.status.ip_addresses = vec![OverlayIpAddress {
                        ip,
                        gateway: "10.10.0.1".to_string(),
                        subnet_mask: "255.255.0.0".to_string(),
                    }];
                },
            );
            // The resource may have been deleted between list and update.
            let _ = result;
        }
    }

    /// Fulfill pending switch attachments as the backend controller would.
    fn fulfill_switch_interfaces(&self) {
        for interface in self.switch_store.list() {
            if !interface.status.conditions.is_empty() {
                continue;
            }

            let port_group_id = format!(
                "dvportgroup-{}",
                self.next_port_group.fetch_add(1, Ordering::SeqCst)
            );
            let mac = self.next_mac_address();
            let ip = self.next_ip_address();
            let name = interface.metadata.name.clone();
            let namespace = interface.metadata.namespace.clone();
            debug!(namespace = %namespace, name = %name, ip = %ip, "Fulfilling switch interface");

            let result = self.switch_store.update_status(
                &namespace,
                &name,
                |netif: &mut SwitchInterface| {
                    netif.status.conditions = vec![Condition::ready_true(SWITCH_INTERFACE_READY)];
                    netif.status.mac_address = mac;
                    netif.status.external_id = format!("ext-{name}");
                    netif.status.network_id = port_group_id;
                    netif.status.ip_configs = vec![SwitchIpConfig {
                        ip,
                        family: IpFamily::Ipv4,
                        gateway: "10.10.0.1".to_string(),
                        subnet_mask: "255.255.0.0".to_string(),
                    }];
                },
            );
            let _ = result;
        }
    }
}
