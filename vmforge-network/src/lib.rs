//! # vmforge Network
//!
//! Network provisioning for VirtualMachine reconciliation.
//!
//! Each interface declared on a VM spec is routed to the backend that owns
//! its network type, which realizes the attachment and reports back the
//! device descriptor plus derived guest configuration:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              NetworkProvider                │
//! │   (ensure_network_interfaces, per VM)       │
//! └──────────┬───────────────┬──────────────────┘
//!            │               │
//!     ┌──────┴─────┐  ┌──────┴──────┐  ┌─────────────┐
//!     ▼            ▼  ▼             ▼  ▼             │
//! ┌────────┐  ┌─────────────┐  ┌─────────────────┐   │
//! │ Named  │  │   Overlay   │  │     Switch      │◄──┘
//! │ (DHCP) │  │ (create +   │  │ (create/attach  │ provider_ref
//! │        │  │  poll NCP)  │  │  + poll)        │
//! └────────┘  └─────────────┘  └─────────────────┘
//! ```
//!
//! The overlay and switch backends follow the same three-phase protocol:
//! create-or-adopt a backend resource, poll its readiness condition on a
//! bounded budget, then translate the reported status into a device backing,
//! a customization mapping, an IP configuration, and a netplan fragment.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vmforge_network::{NetworkProvider, VmContext};
//!
//! let provider = NetworkProvider::new(inventory, overlay_store, switch_store);
//! let infos = provider.ensure_network_interfaces(&ctx, &vm_spec.interfaces).await?;
//! let netplan = infos.netplan(&current_nics, &dns_servers, &search_suffixes);
//! ```

pub mod customization;
pub mod device;
pub mod error;
pub mod interface_list;
pub mod inventory;
pub mod named;
pub mod netplan;
pub mod overlay;
pub mod provider;
pub mod resources;
pub mod store;
pub mod switch;
pub mod types;
mod wait;

pub use customization::{CustomizationAdapterMapping, IpAssignment, IpSettings};
pub use device::{EthernetCardKind, MacAddressType, VirtualEthernetCard};
pub use error::{NetworkError, Result};
pub use interface_list::{InterfaceInfo, InterfaceInfoList};
pub use inventory::{Inventory, MockInventory, NetworkReference};
pub use named::NamedNetworkProvider;
pub use netplan::{normalize_netplan_mac, to_cidr_notation, Netplan, NetplanEthernet};
pub use overlay::OverlayNetworkProvider;
pub use provider::{NetworkInterfaceProvider, NetworkProvider};
pub use resources::{OverlayInterface, SwitchInterface};
pub use store::{ApplyResult, InMemoryStore, ObjectStore};
pub use switch::SwitchNetworkProvider;
pub use types::{
    IpConfig, IpFamily, NetworkInterfaceSpec, TypedObjectRef, VmContext, VmRef,
    OVERLAY_NETWORK_TYPE, SWITCH_NETWORK_TYPE,
};
