//! Nerodesk Document Store
//!
//! This crate is the storage and access-control core of a multi-tenant
//! document store. Every tenant, identified by an opaque identity string,
//! owns a collection of named documents. A document carries byte content plus
//! attributes: a visibility flag and a set of friend identities allowed to
//! read it.
//!
//! # Features
//!
//! - **Tenant addressing**: registry → collection → document, all implicit
//! - **Access control**: owner-only mutation, read for visible documents and friends
//! - **Interchangeable backends**: in-memory and S3 object storage
//! - **Partitioned transfers**: chunked uploads in any order, ranged reads
//!
//! Available features:
//! - `s3` (default) - build the AWS S3 client for the object-store backend
//!
//! # Architecture
//!
//! - [`registry`] - [`Registry`] and [`Collection`]
//! - [`document`] - [`Document`] handles and their operations
//! - [`permissions`] - the [`PermissionEngine`] decision function
//! - [`transfer`] - partitioned uploads and ranged reads
//! - [`core`] - storage traits and per-document locks
//! - [`backends`] - backend implementations
//! - [`config`] - serde configuration
//! - [`error`] - error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use nerodesk_store::{Identity, Registry};
//! use nerodesk_store::backends::memory::InMemoryBackend;
//!
//! # async fn example() -> nerodesk_store::StoreResult<()> {
//! let registry = Registry::new(Arc::new(InMemoryBackend::new()));
//! let alice = Identity::new("urn:github:alice");
//! let bob = Identity::new("urn:github:bob");
//!
//! let doc = registry.tenant(alice.clone()).document("plan.md");
//! doc.write(&alice, Bytes::from_static(b"# Plan")).await?;
//!
//! // Private by default
//! assert!(doc.read(&bob).await.unwrap_err().is_permission_denied());
//!
//! doc.add_friend(&alice, bob.clone()).await?;
//! assert_eq!(doc.read(&bob).await?, Bytes::from_static(b"# Plan"));
//! # Ok(())
//! # }
//! ```
//!
//! # Errors and existence
//!
//! A caller that may not read a document gets `PermissionDenied` whether or
//! not the document exists. Routing layers should present
//! [`StoreError::is_lookup_failure`] errors uniformly.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attributes;
pub mod backends;
pub mod config;
pub mod core;
pub mod document;
pub mod error;
pub mod identity;
pub mod permissions;
pub mod registry;
pub mod transfer;

// Re-export commonly used types at crate root
pub use attributes::Attributes;
pub use config::{BackendConfig, StoreConfig, TransferConfig};
pub use document::Document;
pub use error::{StoreError, StoreResult};
pub use identity::Identity;
pub use permissions::{Action, DecisionReason, PermissionDecision, PermissionEngine};
pub use registry::{Collection, Registry};

// Re-export core traits
pub use core::{BackendKind, ContentStore, MetadataStore, StorageBackend};

// Re-export transfer types
pub use transfer::{
    PartitionedTransferEngine, RangeMode, RangeRequest, RangeSlice, SessionReaper, SessionState,
    UploadStatus,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
