//! Store configuration.
//!
//! All structs deserialize from JSON with defaults for every omitted field,
//! so `{}` is a valid in-memory configuration.
//!
//! # Example
//!
//! ```rust
//! use nerodesk_store::config::{BackendConfig, StoreConfig};
//!
//! let config: StoreConfig = serde_json::from_str(
//!     r#"{ "backend": { "kind": "s3", "bucket": "docs" }, "lock_timeout_ms": 2000 }"#,
//! )
//! .unwrap();
//!
//! assert!(matches!(config.backend, BackendConfig::S3(_)));
//! assert!(config.validate().is_ok());
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backends::memory::InMemoryBackend;
use crate::backends::s3::S3BackendConfig;
use crate::core::StorageBackend;
use crate::error::{StoreResult, ValidationError};

/// Top-level store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Which backend to use.
    #[serde(default)]
    pub backend: BackendConfig,

    /// How long a mutation waits for the per-document lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Partitioned transfer settings.
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Backend selection, tagged by `kind`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Process-local storage.
    #[default]
    Memory,
    /// S3 or S3-compatible object storage.
    S3(S3BackendConfig),
}

/// Settings for partitioned uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Upload sessions idle longer than this are abandoned.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// How often the reaper sweeps for idle sessions.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Largest declared `total` accepted for a partitioned upload.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

pub(crate) fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_idle_timeout_ms() -> u64 {
    15 * 60 * 1000
}

fn default_sweep_interval_ms() -> u64 {
    60 * 1000
}

fn default_max_upload_size() -> u64 {
    1024 * 1024 * 1024
}

impl StoreConfig {
    /// Configuration for tests: in-memory backend, short timeouts.
    pub fn for_testing() -> Self {
        Self {
            backend: BackendConfig::Memory,
            lock_timeout_ms: 1_000,
            transfer: TransferConfig {
                idle_timeout_ms: 1_000,
                sweep_interval_ms: 100,
                max_upload_size: 16 * 1024 * 1024,
            },
        }
    }

    /// Validates configuration invariants.
    pub fn validate(&self) -> StoreResult<()> {
        if self.lock_timeout_ms == 0 {
            return Err(invalid("lock_timeout_ms must be > 0"));
        }

        self.transfer.validate()?;

        match &self.backend {
            BackendConfig::Memory => Ok(()),
            BackendConfig::S3(s3) => s3.validate(),
        }
    }

    /// Returns the lock wait bound.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Validates the configuration and constructs the selected backend.
    pub fn build_backend(&self) -> StoreResult<Arc<dyn StorageBackend>> {
        self.validate()?;

        match &self.backend {
            BackendConfig::Memory => Ok(Arc::new(InMemoryBackend::new())),
            #[cfg(feature = "s3")]
            BackendConfig::S3(s3) => Ok(Arc::new(
                crate::backends::s3::ObjectStoreBackend::new(s3)?,
            )),
            #[cfg(not(feature = "s3"))]
            BackendConfig::S3(_) => Err(invalid(
                "the s3 backend requires building with the `s3` feature",
            )),
        }
    }
}

impl TransferConfig {
    /// Validates transfer settings.
    pub fn validate(&self) -> StoreResult<()> {
        if self.idle_timeout_ms == 0 {
            return Err(invalid("transfer.idle_timeout_ms must be > 0"));
        }
        if self.sweep_interval_ms == 0 {
            return Err(invalid("transfer.sweep_interval_ms must be > 0"));
        }
        if self.max_upload_size == 0 {
            return Err(invalid("transfer.max_upload_size must be > 0"));
        }
        if usize::try_from(self.max_upload_size).is_err() {
            return Err(invalid("transfer.max_upload_size does not fit in memory"));
        }
        Ok(())
    }

    /// Returns the idle timeout.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Returns the sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

fn invalid(message: &str) -> crate::error::StoreError {
    ValidationError::InvalidConfig {
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BackendKind;

    #[test]
    fn test_empty_json_is_default() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert!(matches!(config.backend, BackendConfig::Memory));
        assert_eq!(config.lock_timeout_ms, 5_000);
        assert_eq!(config.transfer.idle_timeout(), Duration::from_secs(15 * 60));
        assert_eq!(config.transfer.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.transfer.max_upload_size, 1 << 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_tagged_by_kind() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"backend":{"kind":"s3","bucket":"docs","prefix":"prod"}}"#,
        )
        .unwrap();
        match config.backend {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "docs");
                assert_eq!(s3.normalized_prefix(), "prod");
            }
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let mut config = StoreConfig::for_testing();
        config.lock_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::for_testing();
        config.transfer.idle_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::for_testing();
        config.transfer.max_upload_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_checks_s3_section() {
        let config = StoreConfig {
            backend: BackendConfig::S3(S3BackendConfig {
                endpoint: Some("http://localhost:9000".to_string()),
                allow_http: false,
                ..Default::default()
            }),
            ..StoreConfig::for_testing()
        };
        assert!(config.validate().is_err());
        assert!(config.build_backend().is_err());
    }

    #[test]
    fn test_build_memory_backend() {
        let backend = StoreConfig::for_testing().build_backend().unwrap();
        assert_eq!(backend.kind(), BackendKind::Memory);
    }
}
