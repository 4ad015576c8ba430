//! Error types for network interface provisioning.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while ensuring a virtual machine network interface.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The interface spec names a network type no backend handles.
    #[error("unsupported network type {0:?}")]
    UnsupportedNetworkType(String),

    /// The interface spec carries a provider reference of the wrong kind.
    #[error("unsupported provider reference {reference} (supported: {supported})")]
    UnsupportedProviderRef {
        reference: String,
        supported: String,
    },

    /// The interface spec names an ethernet card type the registry does not know.
    #[error("unknown ethernet card type {0:?}")]
    UnknownEthernetCardType(String),

    /// A subnet mask reported by the backend could not be parsed.
    #[error("invalid subnet mask {0:?}")]
    InvalidSubnetMask(String),

    /// The named network does not exist in inventory.
    #[error("network {0:?} not found in inventory")]
    NetworkNotFound(String),

    /// The cluster has no distributed port groups to search.
    #[error("cluster has no distributed port groups")]
    NoPortGroups,

    /// No distributed port group carries the backend-reported switch id.
    #[error("no distributed port group with logical switch id {0:?}")]
    SwitchNotFound(String),

    /// More than one port group carries the same logical switch id. The id is
    /// supposed to be unique per cluster, so this indicates misconfiguration
    /// of the overlay fabric and we cannot pick one.
    #[error("multiple distributed port groups ({matches}) with logical switch id {network_id:?}")]
    AmbiguousSwitchMatch { network_id: String, matches: usize },

    /// The backend resource never reported readiness within the poll budget.
    #[error("timed out waiting for {kind} {name:?} to become ready")]
    WaitTimeout { kind: &'static str, name: String },

    /// The caller's reconcile deadline passed while waiting for readiness.
    #[error("reconcile deadline passed while waiting for {kind} {name:?}")]
    DeadlineExceeded { kind: &'static str, name: String },

    /// A ready backend resource is missing the status half we need.
    #[error("{kind} {name:?} is ready but has no {field} in status")]
    MissingBackendStatus {
        kind: &'static str,
        name: String,
        field: &'static str,
    },

    /// The inventory collaborator failed.
    #[error("inventory failure: {0}")]
    Inventory(String),

    /// The backend resource store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl NetworkError {
    /// Whether the next reconciliation pass may succeed without a spec change.
    ///
    /// Retryable errors are transient substrate conditions: the backend
    /// controller has not fulfilled the resource yet, or inventory has not
    /// caught up. Non-retryable errors require the user to correct the
    /// VirtualMachine spec or the fabric configuration.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::WaitTimeout { .. }
            | NetworkError::DeadlineExceeded { .. }
            | NetworkError::NetworkNotFound(_)
            | NetworkError::MissingBackendStatus { .. }
            | NetworkError::Inventory(_)
            | NetworkError::Store(_) => true,
            NetworkError::UnsupportedNetworkType(_)
            | NetworkError::UnsupportedProviderRef { .. }
            | NetworkError::UnknownEthernetCardType(_)
            | NetworkError::InvalidSubnetMask(_)
            | NetworkError::NoPortGroups
            | NetworkError::SwitchNotFound(_)
            | NetworkError::AmbiguousSwitchMatch { .. } => false,
        }
    }
}

/// Result type alias for network provisioning operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let timeout = NetworkError::WaitTimeout {
            kind: "NetworkInterface",
            name: "net-vm".to_string(),
        };
        assert!(timeout.is_retryable());

        let config = NetworkError::UnsupportedNetworkType("bogus".to_string());
        assert!(!config.is_retryable());

        let ambiguous = NetworkError::AmbiguousSwitchMatch {
            network_id: "ls-1".to_string(),
            matches: 2,
        };
        assert!(!ambiguous.is_retryable());
    }
}
