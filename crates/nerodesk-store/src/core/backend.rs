//! Storage backend abstraction.
//!
//! The document core talks to storage through two narrow capabilities:
//!
//! - [`ContentStore`] - opaque document bytes
//! - [`MetadataStore`] - a key/value side channel holding [`Attributes`]
//!
//! Content and metadata are created and deleted independently. A backend is
//! free to colocate them physically; the in-memory backend keeps two parallel
//! maps, the object-store backend keeps marker objects with user metadata.
//! [`StorageBackend`] ties both together with identification and health.

use std::fmt::{self, Debug};
use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;

use crate::attributes::Attributes;
use crate::error::{StoreResult, ValidationError};
use crate::identity::Identity;

/// Longest accepted document name, in bytes.
pub const MAX_NAME_LEN: usize = 512;

/// Identifies the type of storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Process-local, ephemeral storage.
    Memory,
    /// Remote object storage (S3 or compatible).
    ObjectStore,
    /// Custom or unknown backend.
    Custom(&'static str),
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::ObjectStore => write!(f, "object-store"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Address of a document: `(tenant, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    tenant: Identity,
    name: String,
}

impl DocumentKey {
    /// Creates a validated key.
    ///
    /// Names are case-sensitive, must be non-empty, at most
    /// [`MAX_NAME_LEN`] bytes, and must not contain NUL. The tenant identity
    /// must be non-empty.
    pub fn new(tenant: Identity, name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_identity(&tenant)?;
        validate_name(&name)?;
        Ok(Self { tenant, name })
    }

    /// Returns the owning tenant.
    pub fn tenant(&self) -> &Identity {
        &self.tenant
    }

    /// Returns the document name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant, self.name)
    }
}

pub(crate) fn validate_identity(identity: &Identity) -> Result<(), ValidationError> {
    if identity.as_str().is_empty() {
        return Err(ValidationError::InvalidIdentity {
            identity: String::new(),
            message: "identity must not be empty".to_string(),
        });
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let message = if name.is_empty() {
        "name must not be empty"
    } else if name.len() > MAX_NAME_LEN {
        "name is too long"
    } else if name.contains('\0') {
        "name must not contain NUL"
    } else {
        return Ok(());
    };

    Err(ValidationError::InvalidName {
        name: name.to_string(),
        message: message.to_string(),
    })
}

/// Byte-level document content storage.
///
/// `write` is a full replace and must be atomic from a reader's point of
/// view: a concurrent `read` observes either the old or the new bytes.
#[async_trait]
pub trait ContentStore: Send + Sync + Debug {
    /// Reads the whole content.
    ///
    /// # Errors
    ///
    /// * `StoreError::Document(NotFound)` - if no content exists
    /// * `StoreError::Backend(Unavailable)` - on transient failures
    async fn read(&self, key: &DocumentKey) -> StoreResult<Bytes>;

    /// Reads `range` of the content. The range must already be resolved
    /// against the content size.
    ///
    /// The default implementation reads everything and slices; backends that
    /// can seek should override it.
    async fn read_range(&self, key: &DocumentKey, range: Range<u64>) -> StoreResult<Bytes> {
        let content = self.read(key).await?;
        let end = (range.end as usize).min(content.len());
        let start = (range.start as usize).min(end);
        Ok(content.slice(start..end))
    }

    /// Returns the content length in bytes.
    async fn size(&self, key: &DocumentKey) -> StoreResult<u64> {
        Ok(self.read(key).await?.len() as u64)
    }

    /// Replaces the content, creating it if absent.
    async fn write(&self, key: &DocumentKey, content: Bytes) -> StoreResult<()>;

    /// Deletes the content.
    ///
    /// # Errors
    ///
    /// * `StoreError::Document(NotFound)` - if no content exists
    async fn delete(&self, key: &DocumentKey) -> StoreResult<()>;

    /// Returns `true` if content exists.
    async fn exists(&self, key: &DocumentKey) -> StoreResult<bool>;

    /// Returns the names of all documents with content for a tenant, sorted.
    async fn list(&self, tenant: &Identity) -> StoreResult<Vec<String>>;
}

/// Key/value side channel for document [`Attributes`].
#[async_trait]
pub trait MetadataStore: Send + Sync + Debug {
    /// Returns the stored attributes, or `None` if never set.
    async fn get_metadata(&self, key: &DocumentKey) -> StoreResult<Option<Attributes>>;

    /// Stores the attributes, replacing previous ones.
    async fn set_metadata(&self, key: &DocumentKey, attributes: &Attributes) -> StoreResult<()>;

    /// Removes the attributes. Removing absent attributes is not an error.
    async fn delete_metadata(&self, key: &DocumentKey) -> StoreResult<()>;
}

/// A complete storage backend, selected at construction time.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use nerodesk_store::backends::memory::InMemoryBackend;
/// use nerodesk_store::core::{BackendKind, StorageBackend};
///
/// let backend: Arc<dyn StorageBackend> = Arc::new(InMemoryBackend::new());
/// assert_eq!(backend.kind(), BackendKind::Memory);
/// ```
#[async_trait]
pub trait StorageBackend: ContentStore + MetadataStore {
    /// Returns the kind of backend.
    fn kind(&self) -> BackendKind;

    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;

    /// Checks if the backend is reachable.
    async fn health_check(&self) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Memory.to_string(), "memory");
        assert_eq!(BackendKind::ObjectStore.to_string(), "object-store");
        assert_eq!(BackendKind::Custom("fs").to_string(), "fs");
    }

    #[test]
    fn test_document_key_accepts_names() {
        let key = DocumentKey::new(Identity::new("urn:test:1"), "notes/2024 plan.md").unwrap();
        assert_eq!(key.tenant().as_str(), "urn:test:1");
        assert_eq!(key.name(), "notes/2024 plan.md");
        assert_eq!(key.to_string(), "urn:test:1/notes/2024 plan.md");
    }

    #[test]
    fn test_document_key_rejects_bad_names() {
        let tenant = Identity::new("t");
        assert!(DocumentKey::new(tenant.clone(), "").is_err());
        assert!(DocumentKey::new(tenant.clone(), "a\0b").is_err());
        assert!(DocumentKey::new(tenant.clone(), "x".repeat(MAX_NAME_LEN + 1)).is_err());
        assert!(DocumentKey::new(tenant, "x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(DocumentKey::new(Identity::new(""), "a").is_err());
    }

    #[test]
    fn test_document_key_case_sensitive() {
        let a = DocumentKey::new(Identity::new("t"), "Readme").unwrap();
        let b = DocumentKey::new(Identity::new("t"), "readme").unwrap();
        assert_ne!(a, b);
    }
}
