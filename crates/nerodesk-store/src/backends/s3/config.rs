//! Object-store backend configuration.

use serde::{Deserialize, Serialize};

use crate::error::{StoreResult, ValidationError};

/// Configuration for the S3 object-store backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3BackendConfig {
    /// Bucket holding every tenant's documents.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Optional key prefix applied before all object keys.
    #[serde(default)]
    pub prefix: Option<String>,

    /// S3 region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Optional custom endpoint (for MinIO or S3-compatible services).
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Optional static access key ID.
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Optional static secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Whether HTTP is allowed (useful for local MinIO).
    #[serde(default)]
    pub allow_http: bool,

    /// Whether virtual-hosted-style requests should be used.
    /// Set to `false` to force path-style addressing.
    #[serde(default = "default_virtual_hosted")]
    pub virtual_hosted_style_request: bool,

    /// Upper bound for every remote call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for S3BackendConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            prefix: None,
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
            virtual_hosted_style_request: default_virtual_hosted(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_bucket() -> String {
    "nerodesk".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_virtual_hosted() -> bool {
    true
}

pub(crate) fn default_request_timeout_ms() -> u64 {
    10_000
}

impl S3BackendConfig {
    /// Validates configuration invariants.
    pub fn validate(&self) -> StoreResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(invalid("bucket must not be empty"));
        }

        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms must be > 0"));
        }

        if let Some(endpoint) = self.endpoint.as_deref() {
            let endpoint = endpoint.trim();
            if endpoint.is_empty() {
                return Err(invalid("endpoint must not be empty when provided"));
            }

            let lower = endpoint.to_ascii_lowercase();
            let is_http = lower.starts_with("http://");
            let is_https = lower.starts_with("https://");
            if !is_http && !is_https {
                return Err(invalid("endpoint must start with http:// or https://"));
            }

            if is_http && !self.allow_http {
                return Err(invalid("http endpoint requires allow_http=true"));
            }
        }

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(invalid(
                "access_key_id and secret_access_key must be set together",
            ));
        }

        Ok(())
    }

    /// Returns the normalized key prefix (no leading or trailing `/`).
    pub fn normalized_prefix(&self) -> String {
        self.prefix
            .as_deref()
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or_default()
    }
}

fn invalid(message: &str) -> crate::error::StoreError {
    ValidationError::InvalidConfig {
        message: format!("s3: {message}"),
    }
    .into()
}
