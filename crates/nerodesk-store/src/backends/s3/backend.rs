//! Object-store backend wiring: store construction, key layout and error
//! mapping.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use object_store::ObjectStore;
use object_store::path::Path;

use crate::core::DocumentKey;
use crate::error::{BackendError, DocumentError, StoreError};
use crate::identity::Identity;

use super::config::S3BackendConfig;

pub(crate) const BACKEND_NAME: &str = "s3";

const TENANTS_SEGMENT: &str = "tenants";
const CONTENT_SEGMENT: &str = "content";
const ATTRIBUTES_SEGMENT: &str = "attributes";

/// Document storage on top of an [`ObjectStore`].
///
/// Objects are laid out per tenant:
///
/// ```text
/// {prefix}/tenants/{tenant}/content/{name}     document bytes
/// {prefix}/tenants/{tenant}/attributes/{name}  empty marker, attributes in user metadata
/// ```
///
/// Tenant and name segments are base64url encoded so arbitrary identities
/// and names map onto valid, collision-free keys.
#[derive(Debug)]
pub struct ObjectStoreBackend {
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) root: Path,
    pub(crate) timeout: Duration,
}

impl ObjectStoreBackend {
    /// Creates a backend talking to the configured S3 bucket.
    #[cfg(feature = "s3")]
    pub fn new(config: &S3BackendConfig) -> crate::error::StoreResult<Self> {
        config.validate()?;
        let store = build_store(config)?;
        Ok(Self::with_store(
            store,
            &config.normalized_prefix(),
            Duration::from_millis(config.request_timeout_ms),
        ))
    }

    /// Creates a backend over an existing store.
    ///
    /// Used with `object_store::memory::InMemory` in tests.
    pub fn with_store(store: Arc<dyn ObjectStore>, prefix: &str, timeout: Duration) -> Self {
        let root = Path::from(prefix.trim_matches('/'));
        Self {
            store,
            root,
            timeout,
        }
    }

    /// Returns the per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn tenant_root(&self, tenant: &Identity) -> Path {
        self.root
            .child(TENANTS_SEGMENT)
            .child(encode_segment(tenant.as_str()))
    }

    pub(crate) fn content_root(&self, tenant: &Identity) -> Path {
        self.tenant_root(tenant).child(CONTENT_SEGMENT)
    }

    pub(crate) fn content_key(&self, key: &DocumentKey) -> Path {
        self.content_root(key.tenant())
            .child(encode_segment(key.name()))
    }

    pub(crate) fn attributes_key(&self, key: &DocumentKey) -> Path {
        self.tenant_root(key.tenant())
            .child(ATTRIBUTES_SEGMENT)
            .child(encode_segment(key.name()))
    }

    pub(crate) fn probe_key(&self) -> Path {
        self.root.child("health").child("__probe__")
    }

    /// Runs a store call under the per-call timeout. An expired timeout is
    /// reported as a generic store error, which maps to `Unavailable`.
    pub(crate) async fn timed<T, F>(&self, fut: F) -> object_store::Result<T>
    where
        F: Future<Output = object_store::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(elapsed) => Err(object_store::Error::Generic {
                store: BACKEND_NAME,
                source: Box::new(elapsed),
            }),
        }
    }

    pub(crate) fn map_error(&self, err: object_store::Error, key: &DocumentKey) -> StoreError {
        match err {
            object_store::Error::NotFound { .. } => DocumentError::NotFound {
                tenant: key.tenant().clone(),
                name: key.name().to_string(),
            }
            .into(),
            other => map_store_error(other),
        }
    }
}

pub(crate) fn map_store_error(err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::Generic { .. } => BackendError::Unavailable {
            backend_name: BACKEND_NAME.to_string(),
            message: err.to_string(),
        }
        .into(),
        other => BackendError::Internal {
            backend_name: BACKEND_NAME.to_string(),
            message: other.to_string(),
            source: Some(Box::new(other)),
        }
        .into(),
    }
}

pub(crate) fn encode_segment(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

pub(crate) fn decode_segment(segment: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(feature = "s3")]
fn build_store(config: &S3BackendConfig) -> crate::error::StoreResult<Arc<dyn ObjectStore>> {
    use object_store::aws::AmazonS3Builder;

    let mut builder = AmazonS3Builder::new()
        .with_region(&config.region)
        .with_bucket_name(&config.bucket)
        .with_allow_http(config.allow_http)
        .with_virtual_hosted_style_request(config.virtual_hosted_style_request);

    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }

    if let Some(access_key_id) = &config.access_key_id {
        builder = builder.with_access_key_id(access_key_id);
    }

    if let Some(secret_access_key) = &config.secret_access_key {
        builder = builder.with_secret_access_key(secret_access_key);
    }

    let store = builder.build().map_err(|e| {
        StoreError::Backend(BackendError::Unavailable {
            backend_name: BACKEND_NAME.to_string(),
            message: format!("failed to build S3 store for bucket '{}': {e}", config.bucket),
        })
    })?;

    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;

    use super::*;

    fn backend(prefix: &str) -> ObjectStoreBackend {
        ObjectStoreBackend::with_store(Arc::new(InMemory::new()), prefix, Duration::from_secs(1))
    }

    #[test]
    fn keys_follow_layout() {
        let b = backend("/staging/");
        let key = DocumentKey::new(Identity::new("urn:test:1"), "a.txt").unwrap();

        let tenant = encode_segment("urn:test:1");
        let name = encode_segment("a.txt");
        assert_eq!(
            b.content_key(&key).as_ref(),
            format!("staging/tenants/{tenant}/content/{name}")
        );
        assert_eq!(
            b.attributes_key(&key).as_ref(),
            format!("staging/tenants/{tenant}/attributes/{name}")
        );
    }

    #[test]
    fn empty_prefix_has_no_leading_separator() {
        let b = backend("");
        let key = DocumentKey::new(Identity::new("t"), "n").unwrap();
        assert!(b.content_key(&key).as_ref().starts_with("tenants/"));
        assert_eq!(b.probe_key().as_ref(), "health/__probe__");
    }

    #[test]
    fn segments_survive_awkward_names() {
        for raw in ["notes/2024 plan.md", "..", "ünïcödé", "a%2Fb"] {
            let encoded = encode_segment(raw);
            assert!(!encoded.contains('/'));
            assert_eq!(decode_segment(&encoded).as_deref(), Some(raw));
        }
        assert_eq!(decode_segment("***"), None);
    }

    #[test]
    fn generic_errors_are_unavailable() {
        let err = map_store_error(object_store::Error::Generic {
            store: "test",
            source: "connection reset".into(),
        });
        assert!(err.is_retryable());

        let key = DocumentKey::new(Identity::new("t"), "n").unwrap();
        let err = backend("").map_error(
            object_store::Error::NotFound {
                path: "x".to_string(),
                source: "missing".into(),
            },
            &key,
        );
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let b = backend("");
        let result: object_store::Result<()> = b
            .timed(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(map_store_error(result.unwrap_err()).is_retryable());
    }
}
