//! Partitioned transfer engine.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::TransferConfig;
use crate::core::DocumentKey;
use crate::error::{StoreResult, ValidationError};
use crate::identity::Identity;
use crate::registry::Registry;

use super::range::{RangeRequest, RangeSlice};
use super::session::{SessionKey, SessionState, UploadSession, UploadStatus, check_chunk};

type SharedSession = Arc<AsyncMutex<UploadSession>>;

#[derive(Debug, Default)]
struct SessionTable {
    open: HashMap<SessionKey, SharedSession>,
    /// Swept sessions, reported once to the next chunk for the same key.
    tombstones: HashMap<SessionKey, Instant>,
}

/// Reassembles chunked uploads and serves ranged reads.
///
/// Each upload is an explicit session keyed by `(tenant, name, total)`, so
/// chunks may arrive over separate requests and in any order. Nothing is
/// written to the document until every byte has arrived; the assembled
/// content is then committed with a single write under the document lock.
///
/// The session table lock is only held for map access. Chunk ingestion holds
/// the session's own lock, which is independent of the document lock.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bytes::Bytes;
/// use nerodesk_store::{Identity, Registry, SessionState};
/// use nerodesk_store::backends::memory::InMemoryBackend;
/// use nerodesk_store::config::TransferConfig;
/// use nerodesk_store::transfer::PartitionedTransferEngine;
///
/// # async fn example() -> nerodesk_store::StoreResult<()> {
/// let registry = Registry::new(Arc::new(InMemoryBackend::new()));
/// let engine = PartitionedTransferEngine::new(registry.clone(), &TransferConfig::default());
/// let owner = Identity::new("urn:test:1");
///
/// engine.begin_chunk(&owner, "big.bin", 3, 6, Bytes::from_static(b"def")).await?;
/// let state = engine.begin_chunk(&owner, "big.bin", 0, 6, Bytes::from_static(b"abc")).await?;
/// assert_eq!(state, SessionState::Complete { total: 6 });
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PartitionedTransferEngine {
    registry: Registry,
    sessions: Mutex<SessionTable>,
    idle_timeout: Duration,
    max_upload_size: u64,
}

impl PartitionedTransferEngine {
    /// Creates an engine committing through `registry`.
    pub fn new(registry: Registry, config: &TransferConfig) -> Self {
        Self {
            registry,
            sessions: Mutex::new(SessionTable::default()),
            idle_timeout: config.idle_timeout(),
            max_upload_size: config.max_upload_size,
        }
    }

    /// Returns the idle timeout after which sessions are abandoned.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Accepts one chunk of a partitioned upload into `tenant`'s collection.
    ///
    /// Returns `Open` while bytes are missing and `Complete` once the chunk
    /// closed the last gap and the content was committed. A failed commit
    /// leaves the session open so the last chunk can be resent.
    ///
    /// # Errors
    ///
    /// * `Validation(TooLarge)` - if `total` exceeds the configured maximum
    /// * `Transfer(InvalidRange)` - if the chunk does not fit in `total`
    /// * `Transfer(SessionAbandoned)` - if the session for this key timed out
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn begin_chunk(
        &self,
        tenant: &Identity,
        name: &str,
        offset: u64,
        total: u64,
        bytes: Bytes,
    ) -> StoreResult<SessionState> {
        DocumentKey::new(tenant.clone(), name)?;
        if total > self.max_upload_size {
            return Err(ValidationError::TooLarge {
                size: total,
                max: self.max_upload_size,
            }
            .into());
        }
        check_chunk(offset, bytes.len() as u64, total)?;

        let key = SessionKey::new(tenant, name, total);
        if total == 0 {
            self.take_tombstone(&key)?;
            self.commit_empty(&key).await?;
            return Ok(SessionState::Complete { total });
        }

        loop {
            let shared = self.session_for(&key)?;
            let mut session = shared.lock().await;

            // Completed, cancelled or swept while we waited; start over.
            if !session.is_open() || !self.is_current(&key, &shared) {
                continue;
            }

            if session.is_expired(Instant::now(), self.idle_timeout) {
                session.abandon();
                self.remove(&key, &shared);
                info!(session = %session.id(), key = %key, "Upload session abandoned after idle timeout");
                return Err(key.abandoned().into());
            }

            session.ingest(offset, bytes.clone())?;
            debug!(session = %session.id(), state = ?session.state(), "Chunk staged");

            if !session.is_filled() {
                return Ok(session.state());
            }

            // Staging stays in place until the write lands; a failed or
            // dropped commit leaves the session filled and retryable.
            let content = session.assemble();
            let document = self.registry.tenant(tenant.clone()).document(name);
            if let Err(e) = document.write(tenant, content).await {
                warn!(session = %session.id(), error = %e, "Commit failed, session stays open");
                return Err(e);
            }

            session.complete();
            self.remove(&key, &shared);
            info!(session = %session.id(), key = %key, "Upload committed");
            return Ok(session.state());
        }
    }

    /// Serves a byte window of `tenant`'s document `name` to `acting`.
    ///
    /// READ authorization applies exactly as for whole reads.
    pub async fn read_range(
        &self,
        acting: &Identity,
        tenant: &Identity,
        name: &str,
        request: RangeRequest,
    ) -> StoreResult<RangeSlice> {
        self.registry
            .tenant(tenant.clone())
            .document(name)
            .read_range(acting, request)
            .await
    }

    /// Returns progress of the open session for the key, if any.
    pub async fn status(
        &self,
        tenant: &Identity,
        name: &str,
        total: u64,
    ) -> StoreResult<Option<UploadStatus>> {
        DocumentKey::new(tenant.clone(), name)?;
        let key = SessionKey::new(tenant, name, total);
        let shared = self.sessions.lock().open.get(&key).cloned();
        let Some(shared) = shared else {
            return Ok(None);
        };

        let session = shared.lock().await;
        if session.is_open() && !session.is_expired(Instant::now(), self.idle_timeout) {
            Ok(Some(session.status()))
        } else {
            Ok(None)
        }
    }

    /// Abandons the open session for the key. Returns `false` if there was
    /// none; cancelling twice is harmless.
    pub async fn cancel(&self, tenant: &Identity, name: &str, total: u64) -> StoreResult<bool> {
        DocumentKey::new(tenant.clone(), name)?;
        let key = SessionKey::new(tenant, name, total);
        let removed = self.sessions.lock().open.remove(&key);
        let Some(shared) = removed else {
            return Ok(false);
        };

        let mut session = shared.lock().await;
        if !session.is_open() {
            return Ok(false);
        }
        session.abandon();
        info!(session = %session.id(), key = %key, "Upload session cancelled");
        Ok(true)
    }

    /// Abandons every idle session and prunes old tombstones. Sessions busy
    /// ingesting a chunk are skipped. Returns the number of sessions swept.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut table = self.sessions.lock();

        let mut expired = Vec::new();
        for (key, shared) in &table.open {
            let Ok(mut session) = shared.try_lock() else {
                continue;
            };
            if session.is_open() && session.is_expired(now, self.idle_timeout) {
                session.abandon();
                debug!(session = %session.id(), key = %key, "Swept idle upload session");
                expired.push(key.clone());
            }
        }

        for key in &expired {
            table.open.remove(key);
            table.tombstones.insert(key.clone(), now);
        }

        let idle = self.idle_timeout;
        table
            .tombstones
            .retain(|_, swept_at| now.saturating_duration_since(*swept_at) < idle);

        if !expired.is_empty() {
            info!(count = expired.len(), "Abandoned idle upload sessions");
        }
        expired.len()
    }

    /// Returns the number of open sessions.
    pub fn open_sessions(&self) -> usize {
        self.sessions.lock().open.len()
    }

    fn session_for(&self, key: &SessionKey) -> StoreResult<SharedSession> {
        let mut table = self.sessions.lock();
        if table.tombstones.remove(key).is_some() {
            return Err(key.abandoned().into());
        }

        let shared = table.open.entry(key.clone()).or_insert_with(|| {
            let session = UploadSession::open(key.clone());
            debug!(session = %session.id(), key = %key, "Upload session opened");
            Arc::new(AsyncMutex::new(session))
        });
        Ok(shared.clone())
    }

    fn take_tombstone(&self, key: &SessionKey) -> StoreResult<()> {
        match self.sessions.lock().tombstones.remove(key) {
            Some(_) => Err(key.abandoned().into()),
            None => Ok(()),
        }
    }

    fn is_current(&self, key: &SessionKey, shared: &SharedSession) -> bool {
        self.sessions
            .lock()
            .open
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, shared))
    }

    fn remove(&self, key: &SessionKey, shared: &SharedSession) {
        let mut table = self.sessions.lock();
        if table
            .open
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, shared))
        {
            table.open.remove(key);
        }
    }

    async fn commit_empty(&self, key: &SessionKey) -> StoreResult<()> {
        self.registry
            .tenant(key.tenant.clone())
            .document(key.name.clone())
            .write(&key.tenant, Bytes::new())
            .await
    }
}
