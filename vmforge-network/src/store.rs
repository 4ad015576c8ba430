//! Backend resource store collaborator.
//!
//! The store mediates all access to backend resources. Writes are only ever
//! the spec half; the backend controller owns the status half. Read-after-
//! write consistency on another writer's updates is not assumed, which is why
//! readiness is a separate wait phase.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::resources::BackendResource;

/// Errors surfaced by a backend resource store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The resource does not exist. Distinguishable from other failures so
    /// the wait phase can treat it as "not yet ready".
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// Any other store failure.
    #[error("store failure: {0}")]
    Internal(String),
}

/// Outcome of an idempotent apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// The resource did not exist and was created.
    Created,
    /// The resource existed and its spec half was rewritten.
    Updated,
    /// The stored spec already matched; no write was issued.
    Unchanged,
}

/// Store of one backend resource kind.
#[async_trait]
pub trait ObjectStore<R: BackendResource>: Send + Sync {
    /// Fetch a resource by namespaced name.
    async fn get(&self, namespace: &str, name: &str) -> Result<R, StoreError>;

    /// Create the resource, or update its spec half if it already exists.
    ///
    /// Status on an existing resource survives the update. Re-applying an
    /// unchanged desired state must not issue a write.
    async fn apply(&self, desired: R) -> Result<ApplyResult, StoreError>;
}

/// In-memory store for testing and development.
///
/// Counts writes so tests can assert apply idempotence, and exposes
/// `update_status` for simulating the backend controller.
pub struct InMemoryStore<R> {
    objects: RwLock<HashMap<(String, String), R>>,
    writes: AtomicUsize,
}

impl<R: BackendResource> InMemoryStore<R> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of writes issued so far (creates plus spec updates).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// All stored resources, in no particular order.
    pub fn list(&self) -> Vec<R> {
        self.objects
            .read()
            .expect("store lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Mutate the status half of a stored resource, as the backend
    /// controller would. Does not count as a spec write.
    pub fn update_status<F>(&self, namespace: &str, name: &str, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut R),
    {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| StoreError::Internal("lock poisoned".to_string()))?;

        let resource = objects
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        mutate(resource);
        Ok(())
    }
}

impl<R: BackendResource> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: BackendResource> ObjectStore<R> for InMemoryStore<R> {
    async fn get(&self, namespace: &str, name: &str) -> Result<R, StoreError> {
        self.objects
            .read()
            .map_err(|_| StoreError::Internal("lock poisoned".to_string()))?
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn apply(&self, mut desired: R) -> Result<ApplyResult, StoreError> {
        let key = (
            desired.metadata().namespace.clone(),
            desired.metadata().name.clone(),
        );

        let mut objects = self
            .objects
            .write()
            .map_err(|_| StoreError::Internal("lock poisoned".to_string()))?;

        match objects.get(&key) {
            Some(existing) => {
                if desired.desired_state_matches(existing) {
                    return Ok(ApplyResult::Unchanged);
                }
                desired.copy_status_from(existing);
                objects.insert(key, desired);
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(ApplyResult::Updated)
            }
            None => {
                objects.insert(key, desired);
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(ApplyResult::Created)
            }
        }
    }
}
