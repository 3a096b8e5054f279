//! Byte ranges for partitioned reads.

use std::ops::Range;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TransferError;

/// What to do when a range runs past the end of the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    /// Shorten the range to end at the content's end.
    #[default]
    Clamp,
    /// Reject the range.
    Strict,
}

/// A requested `{offset, length}` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRequest {
    /// First byte requested.
    pub offset: u64,
    /// Number of bytes requested.
    pub length: u64,
    /// Handling of ranges running past the end.
    #[serde(default)]
    pub mode: RangeMode,
}

impl RangeRequest {
    /// Creates a clamped range request.
    pub fn new(offset: u64, length: u64) -> Self {
        Self {
            offset,
            length,
            mode: RangeMode::Clamp,
        }
    }

    /// Creates a range request that must fit inside the content.
    pub fn strict(offset: u64, length: u64) -> Self {
        Self {
            offset,
            length,
            mode: RangeMode::Strict,
        }
    }

    /// Resolves the request against a content of `total` bytes.
    ///
    /// # Errors
    ///
    /// * `InvalidRange` - if `length` is zero, `offset >= total`, or the
    ///   range ends past `total` in [`RangeMode::Strict`]
    pub fn resolve(&self, total: u64) -> Result<Range<u64>, TransferError> {
        if self.length == 0 {
            return Err(self.invalid(total, "length must be > 0"));
        }
        if self.offset >= total {
            return Err(self.invalid(total, "offset is at or beyond the end"));
        }

        match (self.offset.checked_add(self.length), self.mode) {
            (Some(end), _) if end <= total => Ok(self.offset..end),
            (_, RangeMode::Clamp) => Ok(self.offset..total),
            (_, RangeMode::Strict) => Err(self.invalid(total, "range ends beyond the end")),
        }
    }

    fn invalid(&self, total: u64, message: &str) -> TransferError {
        TransferError::InvalidRange {
            offset: self.offset,
            length: self.length,
            total,
            message: message.to_string(),
        }
    }
}

/// The bytes served for a range request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSlice {
    /// Offset of the first byte in `bytes`.
    pub offset: u64,
    /// Size of the whole content.
    pub total: u64,
    /// The served bytes.
    pub bytes: Bytes,
}

impl RangeSlice {
    /// Offset one past the last byte in `bytes`.
    pub fn end(&self) -> u64 {
        self.offset + self.bytes.len() as u64
    }

    /// Returns `true` if the slice reaches the end of the content.
    pub fn is_last(&self) -> bool {
        self.end() == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_past_the_end() {
        assert_eq!(RangeRequest::new(5, 100).resolve(10).unwrap(), 5..10);
        assert_eq!(RangeRequest::new(0, 10).resolve(10).unwrap(), 0..10);
        assert_eq!(RangeRequest::new(9, u64::MAX).resolve(10).unwrap(), 9..10);
    }

    #[test]
    fn strict_rejects_past_the_end() {
        assert!(RangeRequest::strict(5, 100).resolve(10).is_err());
        assert_eq!(RangeRequest::strict(5, 5).resolve(10).unwrap(), 5..10);
    }

    #[test]
    fn rejects_offset_at_or_beyond_end() {
        assert!(RangeRequest::new(10, 1).resolve(10).is_err());
        assert!(RangeRequest::new(11, 1).resolve(10).is_err());
        assert!(RangeRequest::new(0, 1).resolve(0).is_err());
    }

    #[test]
    fn rejects_empty_length() {
        let err = RangeRequest::new(0, 0).resolve(10).unwrap_err();
        assert!(err.to_string().contains("length must be > 0"));
    }

    #[test]
    fn slice_end() {
        let slice = RangeSlice {
            offset: 5,
            total: 10,
            bytes: Bytes::from_static(b"56789"),
        };
        assert_eq!(slice.end(), 10);
        assert!(slice.is_last());
    }

    #[test]
    fn mode_defaults_to_clamp() {
        let req: RangeRequest = serde_json::from_str(r#"{"offset":1,"length":2}"#).unwrap();
        assert_eq!(req, RangeRequest::new(1, 2));
    }
}
