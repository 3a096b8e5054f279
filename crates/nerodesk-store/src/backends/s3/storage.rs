//! [`ContentStore`], [`MetadataStore`] and [`StorageBackend`] over an object
//! store.

use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{GetOptions, PutOptions, PutPayload};
use tracing::{debug, warn};

use crate::attributes::Attributes;
use crate::core::{BackendKind, ContentStore, DocumentKey, MetadataStore, StorageBackend};
use crate::error::{BackendError, StoreResult};
use crate::identity::Identity;

use super::backend::{BACKEND_NAME, ObjectStoreBackend, decode_segment, map_store_error};
use super::metadata;

#[async_trait]
impl ContentStore for ObjectStoreBackend {
    async fn read(&self, key: &DocumentKey) -> StoreResult<Bytes> {
        let path = self.content_key(key);
        let result = self
            .timed(self.store.get(&path))
            .await
            .map_err(|e| self.map_error(e, key))?;
        self.timed(result.bytes())
            .await
            .map_err(|e| self.map_error(e, key))
    }

    async fn read_range(&self, key: &DocumentKey, range: Range<u64>) -> StoreResult<Bytes> {
        if range.start >= range.end {
            return Ok(Bytes::new());
        }
        let path = self.content_key(key);
        self.timed(
            self.store
                .get_range(&path, range.start as usize..range.end as usize),
        )
        .await
        .map_err(|e| self.map_error(e, key))
    }

    async fn size(&self, key: &DocumentKey) -> StoreResult<u64> {
        let path = self.content_key(key);
        let meta = self
            .timed(self.store.head(&path))
            .await
            .map_err(|e| self.map_error(e, key))?;
        Ok(meta.size as u64)
    }

    async fn write(&self, key: &DocumentKey, content: Bytes) -> StoreResult<()> {
        let path = self.content_key(key);
        debug!(key = %key, path = %path, size = content.len(), "Putting content object");
        self.timed(self.store.put(&path, PutPayload::from(content)))
            .await
            .map_err(|e| self.map_error(e, key))?;
        Ok(())
    }

    async fn delete(&self, key: &DocumentKey) -> StoreResult<()> {
        // S3 deletes of absent keys succeed, so probe first.
        let path = self.content_key(key);
        self.timed(self.store.head(&path))
            .await
            .map_err(|e| self.map_error(e, key))?;
        self.timed(self.store.delete(&path))
            .await
            .map_err(|e| self.map_error(e, key))
    }

    async fn exists(&self, key: &DocumentKey) -> StoreResult<bool> {
        let path = self.content_key(key);
        match self.timed(self.store.head(&path)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(map_store_error(e)),
        }
    }

    async fn list(&self, tenant: &Identity) -> StoreResult<Vec<String>> {
        let root = self.content_root(tenant);
        let listing = self
            .timed(self.store.list_with_delimiter(Some(&root)))
            .await
            .map_err(map_store_error)?;

        let mut names = Vec::with_capacity(listing.objects.len());
        for object in listing.objects {
            let Some(segment) = object.location.filename() else {
                continue;
            };
            match decode_segment(segment) {
                Some(name) => names.push(name),
                None => warn!(location = %object.location, "Skipping object with undecodable name"),
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl MetadataStore for ObjectStoreBackend {
    async fn get_metadata(&self, key: &DocumentKey) -> StoreResult<Option<Attributes>> {
        let path = self.attributes_key(key);
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        match self.timed(self.store.get_opts(&path, options)).await {
            Ok(result) => metadata::decode(&result.attributes).map(Some),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(map_store_error(e)),
        }
    }

    async fn set_metadata(&self, key: &DocumentKey, attributes: &Attributes) -> StoreResult<()> {
        let path = self.attributes_key(key);
        let options = PutOptions {
            attributes: metadata::encode(attributes)?,
            ..Default::default()
        };
        self.timed(self.store.put_opts(&path, PutPayload::new(), options))
            .await
            .map_err(|e| self.map_error(e, key))?;
        Ok(())
    }

    async fn delete_metadata(&self, key: &DocumentKey) -> StoreResult<()> {
        let path = self.attributes_key(key);
        match self.timed(self.store.delete(&path)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(map_store_error(e)),
        }
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn health_check(&self) -> StoreResult<()> {
        let probe = self.probe_key();
        match self.timed(self.store.head(&probe)).await {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("object store health check failed: {err}"),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use object_store::ObjectStore;
    use object_store::memory::InMemory;

    use super::*;

    fn backend() -> (Arc<InMemory>, ObjectStoreBackend) {
        let store = Arc::new(InMemory::new());
        let backend =
            ObjectStoreBackend::with_store(store.clone(), "nerodesk", Duration::from_secs(5));
        (store, backend)
    }

    fn key(tenant: &str, name: &str) -> DocumentKey {
        DocumentKey::new(Identity::new(tenant), name).unwrap()
    }

    #[tokio::test]
    async fn content_round_trip() {
        let (_, b) = backend();
        let k = key("urn:test:1", "a.txt");

        b.write(&k, Bytes::from_static(b"hello")).await.unwrap();
        assert!(b.exists(&k).await.unwrap());
        assert_eq!(b.read(&k).await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(b.size(&k).await.unwrap(), 5);
        assert_eq!(b.read_range(&k, 1..3).await.unwrap(), Bytes::from_static(b"el"));
        assert_eq!(b.read_range(&k, 2..2).await.unwrap(), Bytes::new());
    }

    #[tokio::test]
    async fn missing_content_is_not_found() {
        let (_, b) = backend();
        let k = key("urn:test:1", "ghost");

        assert!(!b.exists(&k).await.unwrap());
        assert!(b.read(&k).await.unwrap_err().is_not_found());
        assert!(b.size(&k).await.unwrap_err().is_not_found());
        assert!(b.delete(&k).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn attributes_live_in_marker_metadata() {
        let (store, b) = backend();
        let k = key("urn:test:1", "a.txt");
        let attrs = Attributes::new(true, vec![Identity::new("urn:test:2")]);

        assert_eq!(b.get_metadata(&k).await.unwrap(), None);
        b.set_metadata(&k, &attrs).await.unwrap();
        assert_eq!(b.get_metadata(&k).await.unwrap(), Some(attrs));

        let marker = store.head(&b.attributes_key(&k)).await.unwrap();
        assert_eq!(marker.size, 0);
        assert!(!b.exists(&k).await.unwrap());

        b.delete_metadata(&k).await.unwrap();
        b.delete_metadata(&k).await.unwrap();
        assert_eq!(b.get_metadata(&k).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_ignores_markers_and_other_tenants() {
        let (_, b) = backend();
        b.write(&key("a", "z/1"), Bytes::new()).await.unwrap();
        b.write(&key("a", "b"), Bytes::new()).await.unwrap();
        b.write(&key("other", "c"), Bytes::new()).await.unwrap();
        b.set_metadata(&key("a", "only-attrs"), &Attributes::default())
            .await
            .unwrap();

        assert_eq!(
            b.list(&Identity::new("a")).await.unwrap(),
            vec!["b".to_string(), "z/1".to_string()]
        );
        assert!(b.list(&Identity::new("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn healthy_when_probe_missing() {
        let (_, b) = backend();
        assert!(b.health_check().await.is_ok());
        assert_eq!(b.kind(), BackendKind::ObjectStore);
    }
}
