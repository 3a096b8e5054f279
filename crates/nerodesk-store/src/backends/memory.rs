//! In-memory storage backend.
//!
//! Content and attributes are kept in two parallel maps. Everything is lost
//! when the process exits, which makes this backend suitable for tests and
//! lightweight single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::trace;

use crate::attributes::Attributes;
use crate::core::{BackendKind, ContentStore, DocumentKey, MetadataStore, StorageBackend};
use crate::error::{DocumentError, StoreResult};
use crate::identity::Identity;

const BACKEND_NAME: &str = "memory";

/// Process-local storage backend.
///
/// Writes swap a whole [`Bytes`] value under a short map lock, so readers see
/// either the previous or the new content, never a mix.
///
/// # Example
///
/// ```
/// use nerodesk_store::backends::memory::InMemoryBackend;
/// use nerodesk_store::core::StorageBackend;
///
/// let backend = InMemoryBackend::new();
/// assert_eq!(backend.name(), "memory");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    content: RwLock<HashMap<DocumentKey, Bytes>>,
    metadata: RwLock<HashMap<DocumentKey, Attributes>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents with content, across all tenants.
    pub fn document_count(&self) -> usize {
        self.content.read().len()
    }

    /// Returns the number of documents with attributes, across all tenants.
    pub fn metadata_count(&self) -> usize {
        self.metadata.read().len()
    }
}

fn not_found(key: &DocumentKey) -> DocumentError {
    DocumentError::NotFound {
        tenant: key.tenant().clone(),
        name: key.name().to_string(),
    }
}

#[async_trait]
impl ContentStore for InMemoryBackend {
    async fn read(&self, key: &DocumentKey) -> StoreResult<Bytes> {
        self.content
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| not_found(key).into())
    }

    async fn size(&self, key: &DocumentKey) -> StoreResult<u64> {
        self.content
            .read()
            .get(key)
            .map(|b| b.len() as u64)
            .ok_or_else(|| not_found(key).into())
    }

    async fn write(&self, key: &DocumentKey, content: Bytes) -> StoreResult<()> {
        trace!(key = %key, size = content.len(), "Storing content in memory");
        self.content.write().insert(key.clone(), content);
        Ok(())
    }

    async fn delete(&self, key: &DocumentKey) -> StoreResult<()> {
        match self.content.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(not_found(key).into()),
        }
    }

    async fn exists(&self, key: &DocumentKey) -> StoreResult<bool> {
        Ok(self.content.read().contains_key(key))
    }

    async fn list(&self, tenant: &Identity) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .content
            .read()
            .keys()
            .filter(|k| k.tenant() == tenant)
            .map(|k| k.name().to_string())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl MetadataStore for InMemoryBackend {
    async fn get_metadata(&self, key: &DocumentKey) -> StoreResult<Option<Attributes>> {
        Ok(self.metadata.read().get(key).cloned())
    }

    async fn set_metadata(&self, key: &DocumentKey, attributes: &Attributes) -> StoreResult<()> {
        self.metadata.write().insert(key.clone(), attributes.clone());
        Ok(())
    }

    async fn delete_metadata(&self, key: &DocumentKey) -> StoreResult<()> {
        self.metadata.write().remove(key);
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
