//! Partitioned (chunked) transfers.
//!
//! - [`PartitionedTransferEngine`] - upload sessions and ranged reads
//! - [`SessionReaper`] - background sweeping of idle sessions
//! - [`RangeRequest`] / [`RangeSlice`] - byte windows for partitioned reads
//!
//! # Upload session states
//!
//! ```text
//! OPEN ──(all bytes received, committed)──> COMPLETE
//!   │
//!   └──(idle timeout or cancel)───────────> ABANDONED
//! ```

mod engine;
mod range;
mod reaper;
mod session;

pub use engine::PartitionedTransferEngine;
pub use range::{RangeMode, RangeRequest, RangeSlice};
pub use reaper::SessionReaper;
pub use session::{SessionState, UploadStatus};
