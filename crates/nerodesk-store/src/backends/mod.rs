//! Storage backend implementations.
//!
//! # Available Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Memory | - | Process-local maps, lost on restart; tests and single-process use |
//! | Object store | `s3` (for the AWS client) | Content objects plus attribute markers on S3 |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "s3")]
//! use nerodesk_store::backends::s3::{ObjectStoreBackend, S3BackendConfig};
//!
//! # #[cfg(feature = "s3")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = S3BackendConfig {
//!     bucket: "documents".to_string(),
//!     ..Default::default()
//! };
//! let backend = ObjectStoreBackend::new(&config)?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod s3;
