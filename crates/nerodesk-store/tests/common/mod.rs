//! Shared test infrastructure for the document store.
//!
//! Every behavioural suite runs against each backend through
//! [`registries`], so the in-memory and object-store implementations are held
//! to the same contract.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use nerodesk_store::backends::memory::InMemoryBackend;
use nerodesk_store::backends::s3::ObjectStoreBackend;
use nerodesk_store::core::{KeyLocks, StorageBackend};
use nerodesk_store::error::{AccessError, DocumentError, StoreError, TransferError};
use nerodesk_store::{Identity, Registry};
use object_store::memory::InMemory;

/// Builds every backend under test, labelled for assertion messages.
pub fn backends() -> Vec<(&'static str, Arc<dyn StorageBackend>)> {
    vec![
        ("memory", Arc::new(InMemoryBackend::new())),
        ("object-store", Arc::new(object_store_backend())),
    ]
}

/// The production object-store code path over an in-process store.
pub fn object_store_backend() -> ObjectStoreBackend {
    ObjectStoreBackend::with_store(Arc::new(InMemory::new()), "test", Duration::from_secs(5))
}

/// One registry per backend, with a short lock timeout.
pub fn registries() -> Vec<(&'static str, Registry)> {
    backends()
        .into_iter()
        .map(|(label, backend)| {
            let locks = Arc::new(KeyLocks::new(Duration::from_secs(2)));
            (label, Registry::with_locks(backend, locks))
        })
        .collect()
}

pub fn owner() -> Identity {
    Identity::new("urn:test:1")
}

pub fn friend() -> Identity {
    Identity::new("urn:test:2")
}

pub fn stranger() -> Identity {
    Identity::new("urn:test:3")
}

/// Asserts a `PermissionDenied` error.
pub fn assert_denied<T: std::fmt::Debug>(result: Result<T, StoreError>, label: &str) {
    match result {
        Err(StoreError::Access(AccessError::PermissionDenied { .. })) => {}
        other => panic!("[{label}] expected PermissionDenied, got {other:?}"),
    }
}

/// Asserts a `DocumentNotFound` error.
pub fn assert_not_found<T: std::fmt::Debug>(result: Result<T, StoreError>, label: &str) {
    match result {
        Err(StoreError::Document(DocumentError::NotFound { .. })) => {}
        other => panic!("[{label}] expected DocumentNotFound, got {other:?}"),
    }
}

/// Asserts an `InvalidRange` error.
pub fn assert_invalid_range<T: std::fmt::Debug>(result: Result<T, StoreError>, label: &str) {
    match result {
        Err(StoreError::Transfer(TransferError::InvalidRange { .. })) => {}
        other => panic!("[{label}] expected InvalidRange, got {other:?}"),
    }
}

/// Asserts a `SessionAbandoned` error.
pub fn assert_abandoned<T: std::fmt::Debug>(result: Result<T, StoreError>, label: &str) {
    match result {
        Err(StoreError::Transfer(TransferError::SessionAbandoned { .. })) => {}
        other => panic!("[{label}] expected SessionAbandoned, got {other:?}"),
    }
}
