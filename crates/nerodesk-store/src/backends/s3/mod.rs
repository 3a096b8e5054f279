//! Object-store backend.
//!
//! Production storage on S3 (or any S3-compatible service) via the
//! `object_store` crate. Any [`object_store::ObjectStore`] can be injected
//! with [`ObjectStoreBackend::with_store`]; building a real S3 client needs
//! the `s3` feature.

mod backend;
mod config;
mod metadata;
mod storage;

pub use backend::ObjectStoreBackend;
pub use config::S3BackendConfig;
