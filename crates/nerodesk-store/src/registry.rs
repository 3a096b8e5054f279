//! Tenant registry and collections.
//!
//! The [`Registry`] is the root entry point. It is constructed once at
//! startup and passed to request handlers; there is no process-wide state.
//! Tenants exist implicitly: `tenant()` returns a [`Collection`] view for any
//! identity without provisioning anything.

use std::sync::Arc;

use tracing::debug;

use crate::config::StoreConfig;
use crate::core::{DocumentKey, KeyLocks, StorageBackend, validate_identity};
use crate::document::Document;
use crate::error::StoreResult;
use crate::identity::Identity;

/// Maps identities to their collections.
///
/// Cloning is cheap; clones share the backend and the lock table.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bytes::Bytes;
/// use nerodesk_store::{Identity, Registry};
/// use nerodesk_store::backends::memory::InMemoryBackend;
///
/// # async fn example() -> nerodesk_store::StoreResult<()> {
/// let registry = Registry::new(Arc::new(InMemoryBackend::new()));
/// let owner = Identity::new("urn:test:1");
///
/// let doc = registry.tenant(owner.clone()).document("notes.txt");
/// doc.write(&owner, Bytes::from_static(b"hello")).await?;
/// assert_eq!(doc.read(&owner).await?, Bytes::from_static(b"hello"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Registry {
    backend: Arc<dyn StorageBackend>,
    locks: Arc<KeyLocks>,
}

impl Registry {
    /// Creates a registry with the default lock timeout.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_locks(backend, Arc::new(KeyLocks::default()))
    }

    /// Creates a registry sharing an existing lock table.
    pub fn with_locks(backend: Arc<dyn StorageBackend>, locks: Arc<KeyLocks>) -> Self {
        debug!(backend = backend.name(), "Creating registry");
        Self { backend, locks }
    }

    /// Builds the configured backend and a registry over it.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let backend = config.build_backend()?;
        Ok(Self::with_locks(
            backend,
            Arc::new(KeyLocks::new(config.lock_timeout())),
        ))
    }

    /// Returns the collection owned by `identity`. Never fails.
    pub fn tenant(&self, identity: impl Into<Identity>) -> Collection {
        Collection {
            owner: identity.into(),
            backend: self.backend.clone(),
            locks: self.locks.clone(),
        }
    }

    /// Returns the storage backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Returns the per-document lock table.
    pub fn locks(&self) -> &Arc<KeyLocks> {
        &self.locks
    }
}

/// A tenant's documents, addressed by name.
#[derive(Debug, Clone)]
pub struct Collection {
    owner: Identity,
    backend: Arc<dyn StorageBackend>,
    locks: Arc<KeyLocks>,
}

impl Collection {
    /// Returns the owning identity.
    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Returns a handle for `name`. The document need not exist.
    pub fn document(&self, name: impl Into<String>) -> Document {
        Document::new(
            self.owner.clone(),
            name.into(),
            self.backend.clone(),
            self.locks.clone(),
        )
    }

    /// Returns `true` if `name` has content.
    pub async fn exists(&self, name: &str) -> StoreResult<bool> {
        let key = DocumentKey::new(self.owner.clone(), name)?;
        self.backend.exists(&key).await
    }

    /// Returns the sorted names of documents with content.
    pub async fn names(&self) -> StoreResult<Vec<String>> {
        validate_identity(&self.owner)?;
        self.backend.list(&self.owner).await
    }
}
