//! Provider trait and the router that dispatches to the backends.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::error::{NetworkError, Result};
use crate::interface_list::{InterfaceInfo, InterfaceInfoList};
use crate::inventory::Inventory;
use crate::named::NamedNetworkProvider;
use crate::overlay::OverlayNetworkProvider;
use crate::resources::{
    OverlayInterface, SwitchInterface, SWITCH_INTERFACE_GROUP, SWITCH_INTERFACE_KIND,
    SWITCH_INTERFACE_VERSION,
};
use crate::store::ObjectStore;
use crate::switch::SwitchNetworkProvider;
use crate::types::{
    NetworkInterfaceSpec, VmContext, OVERLAY_NETWORK_TYPE, SWITCH_NETWORK_TYPE,
};

/// A network backend that can realize one declared interface.
#[async_trait]
pub trait NetworkInterfaceProvider: Send + Sync {
    /// Ensure the interface exists on the backend and return everything the
    /// reconcile needs to know about it. Idempotent: re-running against an
    /// already-realized interface re-derives the same result without
    /// re-creating anything.
    async fn ensure_network_interface(
        &self,
        ctx: &VmContext,
        spec: &NetworkInterfaceSpec,
    ) -> Result<InterfaceInfo>;
}

/// Routes each declared interface to the backend that owns its network type.
pub struct NetworkProvider {
    named: NamedNetworkProvider,
    overlay: OverlayNetworkProvider,
    switch: SwitchNetworkProvider,
}

impl NetworkProvider {
    pub fn new(
        inventory: Arc<dyn Inventory>,
        overlay_store: Arc<dyn ObjectStore<OverlayInterface>>,
        switch_store: Arc<dyn ObjectStore<SwitchInterface>>,
    ) -> Self {
        Self {
            named: NamedNetworkProvider::new(inventory.clone()),
            overlay: OverlayNetworkProvider::new(overlay_store, inventory.clone()),
            switch: SwitchNetworkProvider::new(switch_store, inventory),
        }
    }

    /// Pick the backend for one interface spec.
    ///
    /// A provider reference takes precedence over the network type tag, but
    /// it must name the switch-backend resource kind exactly.
    fn backend(&self, spec: &NetworkInterfaceSpec) -> Result<&dyn NetworkInterfaceProvider> {
        if let Some(provider_ref) = &spec.provider_ref {
            if provider_ref.api_group != SWITCH_INTERFACE_GROUP
                || provider_ref.api_version != SWITCH_INTERFACE_VERSION
                || provider_ref.kind != SWITCH_INTERFACE_KIND
            {
                return Err(NetworkError::UnsupportedProviderRef {
                    reference: format!(
                        "{}/{}, Kind={}",
                        provider_ref.api_group, provider_ref.api_version, provider_ref.kind
                    ),
                    supported: format!(
                        "{SWITCH_INTERFACE_GROUP}/{SWITCH_INTERFACE_VERSION}, \
                         Kind={SWITCH_INTERFACE_KIND}"
                    ),
                });
            }
            return Ok(&self.switch);
        }

        match spec.network_type.as_str() {
            OVERLAY_NETWORK_TYPE => Ok(&self.overlay),
            SWITCH_NETWORK_TYPE => Ok(&self.switch),
            "" => Ok(&self.named),
            other => Err(NetworkError::UnsupportedNetworkType(other.to_string())),
        }
    }

    /// Realize every declared interface, in declaration order.
    ///
    /// Interfaces are processed sequentially and the first failure aborts the
    /// pass; the caller retries the whole list, which is safe because each
    /// backend is idempotent.
    #[instrument(skip(self, ctx, specs), fields(vm = %ctx.vm.name, interfaces = specs.len()))]
    pub async fn ensure_network_interfaces(
        &self,
        ctx: &VmContext,
        specs: &[NetworkInterfaceSpec],
    ) -> Result<InterfaceInfoList> {
        let mut list = InterfaceInfoList::new();
        for spec in specs {
            let info = self
                .backend(spec)?
                .ensure_network_interface(ctx, spec)
                .await?;
            list.push(info);
        }
        Ok(list)
    }
}

#[async_trait]
impl NetworkInterfaceProvider for NetworkProvider {
    async fn ensure_network_interface(
        &self,
        ctx: &VmContext,
        spec: &NetworkInterfaceSpec,
    ) -> Result<InterfaceInfo> {
        self.backend(spec)?.ensure_network_interface(ctx, spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{MockInventory, NetworkReference};
    use crate::store::InMemoryStore;
    use crate::types::{TypedObjectRef, VmRef};

    fn ctx() -> VmContext {
        VmContext::new(VmRef {
            name: "vm-1".to_string(),
            namespace: "default".to_string(),
            uid: "uid-1".to_string(),
        })
    }

    fn router() -> (
        NetworkProvider,
        Arc<InMemoryStore<OverlayInterface>>,
        Arc<InMemoryStore<SwitchInterface>>,
    ) {
        let inventory = Arc::new(MockInventory::new());
        inventory.add_network(
            "VM Network",
            NetworkReference::Named {
                name: "VM Network".to_string(),
            },
        );
        let overlay_store = Arc::new(InMemoryStore::<OverlayInterface>::new());
        let switch_store = Arc::new(InMemoryStore::<SwitchInterface>::new());
        let provider =
            NetworkProvider::new(inventory, overlay_store.clone(), switch_store.clone());
        (provider, overlay_store, switch_store)
    }

    #[tokio::test]
    async fn test_empty_type_routes_to_named() {
        let (provider, _, _) = router();
        let spec = NetworkInterfaceSpec {
            network_name: "VM Network".to_string(),
            ..Default::default()
        };

        let info = provider
            .ensure_network_interface(&ctx(), &spec)
            .await
            .unwrap();
        assert_eq!(
            info.device.backing,
            NetworkReference::Named {
                name: "VM Network".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_type_is_rejected() {
        let (provider, _, _) = router();
        let spec = NetworkInterfaceSpec {
            network_type: "frame-relay".to_string(),
            ..Default::default()
        };

        let err = provider
            .ensure_network_interface(&ctx(), &spec)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::UnsupportedNetworkType(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_mismatched_provider_ref_is_rejected_before_any_write() {
        let (provider, overlay_store, switch_store) = router();
        let spec = NetworkInterfaceSpec {
            network_type: SWITCH_NETWORK_TYPE.to_string(),
            provider_ref: Some(TypedObjectRef {
                api_group: "other.example.com".to_string(),
                api_version: "v1".to_string(),
                kind: "Gadget".to_string(),
                name: "g-1".to_string(),
            }),
            ..Default::default()
        };

        let err = provider
            .ensure_network_interface(&ctx(), &spec)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::UnsupportedProviderRef { .. }));
        assert!(!err.is_retryable());
        assert_eq!(overlay_store.write_count(), 0);
        assert_eq!(switch_store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_aborts_the_list() {
        let (provider, _, _) = router();
        let specs = vec![
            NetworkInterfaceSpec {
                network_name: "VM Network".to_string(),
                ..Default::default()
            },
            NetworkInterfaceSpec {
                network_name: "missing".to_string(),
                ..Default::default()
            },
        ];

        let err = provider
            .ensure_network_interfaces(&ctx(), &specs)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::NetworkNotFound(_)));
    }
}
