//! Core storage traits and abstractions.
//!
//! - [`ContentStore`] - document bytes
//! - [`MetadataStore`] - document attributes side channel
//! - [`StorageBackend`] - a complete, interchangeable backend
//! - [`KeyLocks`] - per-document write serialization
//!
//! # Trait Hierarchy
//!
//! ```text
//! ContentStore ──┐
//!                ├── StorageBackend
//! MetadataStore ─┘
//! ```
//!
//! # Example: Implementing a Storage Backend
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use nerodesk_store::core::{ContentStore, DocumentKey};
//! use nerodesk_store::error::StoreResult;
//!
//! #[derive(Debug)]
//! struct MyBackend;
//!
//! #[async_trait]
//! impl ContentStore for MyBackend {
//!     async fn read(&self, key: &DocumentKey) -> StoreResult<Bytes> {
//!         todo!()
//!     }
//!
//!     // ... implement other required methods
//! }
//! ```

pub mod backend;
pub mod locks;

pub use backend::{
    BackendKind, ContentStore, DocumentKey, MAX_NAME_LEN, MetadataStore, StorageBackend,
};
pub use locks::{KeyGuard, KeyLocks};

pub(crate) use backend::validate_identity;
