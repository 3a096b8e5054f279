//! Upload sessions.
//!
//! A session stages the chunks of one partitioned upload, keyed by
//! `(tenant, name, total)`. Received chunks are kept as disjoint slices keyed
//! by offset, so a session only holds the bytes that actually arrived; an
//! overlapping chunk overwrites the bytes it covers. The session is complete
//! once the received ranges cover `[0, total)` without gaps, and the content
//! is only assembled then.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::TransferError;
use crate::identity::Identity;

/// Identifies an upload session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub(crate) tenant: Identity,
    pub(crate) name: String,
    pub(crate) total: u64,
}

impl SessionKey {
    pub(crate) fn new(tenant: &Identity, name: &str, total: u64) -> Self {
        Self {
            tenant: tenant.clone(),
            name: name.to_string(),
            total,
        }
    }

    pub(crate) fn abandoned(&self) -> TransferError {
        TransferError::SessionAbandoned {
            tenant: self.tenant.clone(),
            name: self.name.clone(),
            total: self.total,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({} bytes)", self.tenant, self.name, self.total)
    }
}

/// Lifecycle of an upload session.
///
/// `Open` moves to `Complete` once all bytes are committed, or to `Abandoned`
/// on timeout or cancel. Neither end state is left again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Receiving chunks.
    Open {
        /// Distinct bytes received so far.
        received: u64,
        /// Declared size.
        total: u64,
    },
    /// All bytes arrived and were written to the document.
    Complete {
        /// Committed size.
        total: u64,
    },
    /// Staging was discarded without writing anything.
    Abandoned,
}

/// Progress report for an open upload, enough for a client to resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadStatus {
    /// Session identifier.
    pub id: Uuid,
    /// When the first chunk arrived.
    pub started_at: DateTime<Utc>,
    /// Distinct bytes received so far.
    pub received: u64,
    /// Declared size.
    pub total: u64,
    /// Byte ranges still missing, in order.
    pub missing: Vec<Range<u64>>,
}

/// Disjoint, non-adjacent received ranges, keyed by start.
#[derive(Debug, Default)]
struct Coverage {
    ranges: BTreeMap<u64, u64>,
}

impl Coverage {
    fn insert(&mut self, range: Range<u64>) {
        let (mut start, mut end) = (range.start, range.end);
        if start >= end {
            return;
        }

        // Absorb the range starting at or before `start` if it touches.
        if let Some((&s, &e)) = self.ranges.range(..=start).next_back() {
            if e >= start {
                start = s;
                end = end.max(e);
            }
        }

        // Absorb every range starting inside `[start, end]`.
        let touching: Vec<u64> = self.ranges.range(start..=end).map(|(&s, _)| s).collect();
        for s in touching {
            if let Some(e) = self.ranges.remove(&s) {
                end = end.max(e);
            }
        }

        self.ranges.insert(start, end);
    }

    fn covered(&self) -> u64 {
        self.ranges.iter().map(|(s, e)| e - s).sum()
    }

    fn gaps(&self, total: u64) -> Vec<Range<u64>> {
        let mut gaps = Vec::new();
        let mut cursor = 0;
        for (&s, &e) in &self.ranges {
            if s > cursor {
                gaps.push(cursor..s);
            }
            cursor = e;
        }
        if cursor < total {
            gaps.push(cursor..total);
        }
        gaps
    }
}

/// Staging state of one partitioned upload.
#[derive(Debug)]
pub(crate) struct UploadSession {
    id: Uuid,
    key: SessionKey,
    started_at: DateTime<Utc>,
    last_activity: Instant,
    /// Disjoint staged slices keyed by offset.
    staging: BTreeMap<u64, Bytes>,
    coverage: Coverage,
    state: SessionState,
}

impl UploadSession {
    /// Opens a session. The caller has already checked `total` against the
    /// configured limit.
    pub(crate) fn open(key: SessionKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Open {
                received: 0,
                total: key.total,
            },
            key,
            started_at: Utc::now(),
            last_activity: Instant::now(),
            staging: BTreeMap::new(),
            coverage: Coverage::default(),
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    pub(crate) fn is_expired(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) >= idle_timeout
    }

    /// Stages a chunk, trimming whatever earlier slices it overlaps.
    pub(crate) fn ingest(&mut self, offset: u64, bytes: Bytes) -> Result<(), TransferError> {
        let end = check_chunk(offset, bytes.len() as u64, self.key.total)?;
        if offset == end {
            return Ok(());
        }

        let mut overlapped: Vec<u64> = Vec::new();
        if let Some((&s, b)) = self.staging.range(..offset).next_back() {
            if s + b.len() as u64 > offset {
                overlapped.push(s);
            }
        }
        overlapped.extend(self.staging.range(offset..end).map(|(&s, _)| s));

        for s in overlapped {
            let Some(old) = self.staging.remove(&s) else {
                continue;
            };
            let e = s + old.len() as u64;
            if s < offset {
                self.staging.insert(s, old.slice(..(offset - s) as usize));
            }
            if e > end {
                self.staging.insert(end, old.slice((end - s) as usize..));
            }
        }
        self.staging.insert(offset, bytes);

        self.coverage.insert(offset..end);
        self.last_activity = Instant::now();
        self.state = SessionState::Open {
            received: self.coverage.covered(),
            total: self.key.total,
        };
        Ok(())
    }

    pub(crate) fn is_filled(&self) -> bool {
        self.coverage.covered() == self.key.total
    }

    /// Concatenates the staged slices. Staging is left intact, so a commit
    /// that fails or is dropped midway can simply be retried.
    pub(crate) fn assemble(&self) -> Bytes {
        let mut content = BytesMut::with_capacity(self.staged_len() as usize);
        for bytes in self.staging.values() {
            content.extend_from_slice(bytes);
        }
        content.freeze()
    }

    /// Bytes currently held in staging.
    pub(crate) fn staged_len(&self) -> u64 {
        self.staging.values().map(|b| b.len() as u64).sum()
    }

    pub(crate) fn complete(&mut self) {
        self.state = SessionState::Complete {
            total: self.key.total,
        };
    }

    pub(crate) fn abandon(&mut self) {
        self.staging.clear();
        self.coverage = Coverage::default();
        self.state = SessionState::Abandoned;
    }

    pub(crate) fn status(&self) -> UploadStatus {
        UploadStatus {
            id: self.id,
            started_at: self.started_at,
            received: self.coverage.covered(),
            total: self.key.total,
            missing: self.coverage.gaps(self.key.total),
        }
    }
}

/// Validates that a chunk of `len` bytes at `offset` fits in `total`.
/// Returns the chunk's end offset.
pub(crate) fn check_chunk(offset: u64, len: u64, total: u64) -> Result<u64, TransferError> {
    let invalid = |message: &str| TransferError::InvalidRange {
        offset,
        length: len,
        total,
        message: message.to_string(),
    };

    if len == 0 && total > 0 {
        return Err(invalid("chunk is empty"));
    }
    match offset.checked_add(len) {
        Some(end) if end <= total => Ok(end),
        _ => Err(invalid("chunk ends beyond the declared total")),
    }
}
