//! Error types for the document store.
//!
//! This module defines all error types used by the store core, following a
//! hierarchy that separates document lookup errors, access-control errors,
//! partitioned transfer errors, validation errors and backend errors.
//!
//! The routing layer is solely responsible for turning these into
//! user-visible responses. [`StoreError::is_lookup_failure`] groups the two
//! errors that must be presented uniformly so that an unauthorized caller
//! cannot tell a private document from a missing one.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::identity::Identity;
use crate::permissions::Action;

/// The primary error type for all store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Document state errors
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Authorization errors
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Partitioned transfer errors
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage backend errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to document state.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document has no content.
    #[error("document not found: {tenant}/{name}")]
    NotFound { tenant: Identity, name: String },
}

/// Errors related to access control.
#[derive(Error, Debug)]
pub enum AccessError {
    /// The acting identity is not allowed to perform the action.
    #[error("permission denied: {identity} cannot {action} {tenant}/{name}")]
    PermissionDenied {
        identity: Identity,
        action: Action,
        tenant: Identity,
        name: String,
    },
}

/// Errors related to partitioned (ranged) transfers.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The byte range is malformed or cannot be satisfied.
    #[error("invalid range {offset}+{length} of {total}: {message}")]
    InvalidRange {
        offset: u64,
        length: u64,
        total: u64,
        message: String,
    },

    /// The upload session timed out or was discarded.
    #[error("upload session abandoned: {tenant}/{name} ({total} bytes)")]
    SessionAbandoned {
        tenant: Identity,
        name: String,
        total: u64,
    },
}

/// Errors related to caller input and configuration.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The document name is not acceptable.
    #[error("invalid document name '{name}': {message}")]
    InvalidName { name: String, message: String },

    /// The identity cannot address a collection.
    #[error("invalid identity '{identity}': {message}")]
    InvalidIdentity { identity: String, message: String },

    /// The declared size exceeds the configured limit.
    #[error("size {size} exceeds the maximum of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    /// The configuration is inconsistent.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Errors originating from the storage backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is temporarily unreachable or timed out.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Waiting for the per-document lock took too long.
    #[error("lock timeout after {timeout_ms}ms for {key}")]
    LockTimeout { key: String, timeout_ms: u64 },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Returns `true` if retrying the same call later may succeed.
    ///
    /// The core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Backend(BackendError::Unavailable { .. })
                | StoreError::Backend(BackendError::LockTimeout { .. })
        )
    }

    /// Returns `true` for errors that callers must present as a failed lookup.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Document(DocumentError::NotFound { .. })
                | StoreError::Access(AccessError::PermissionDenied { .. })
        )
    }

    /// Returns `true` if this is a `DocumentNotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Document(DocumentError::NotFound { .. }))
    }

    /// Returns `true` if this is a `PermissionDenied` error.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::Access(AccessError::PermissionDenied { .. }))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}
