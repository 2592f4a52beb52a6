//! Host-side I/O outcomes and their sentinel encoding
//!
//! Backends and user callbacks speak these enums; the raw sentinel integers of
//! the native convention exist only inside the conversions here. Both
//! directions are total: every outcome has exactly one encoding, and unknown
//! sentinels decode to `Error` (fail closed), never to success.

use crate::ffi::error::{AVERROR_EIO, AVERROR_ENOSYS, AVERROR_EOF};
use std::os::raw::c_int;

/// Result of a backend read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// The operation moved this many bytes (zero is a valid count, distinct
  /// from end of stream)
  Bytes(usize),
  /// No more data exists. Not a failure
  Eof,
  /// The operation failed or is outside the backend's capabilities
  Error,
  /// The backend cannot answer this request at all
  Unsupported,
}

impl Outcome {
  /// Encode as a native callback return value
  ///
  /// Counts saturate at the C int ceiling; in practice they are bounded by
  /// the scratch-buffer chunk size.
  pub fn to_sentinel(self) -> c_int {
    match self {
      Outcome::Bytes(n) => c_int::try_from(n).unwrap_or(c_int::MAX),
      Outcome::Eof => AVERROR_EOF,
      Outcome::Error => AVERROR_EIO,
      Outcome::Unsupported => AVERROR_ENOSYS,
    }
  }

  /// Decode a native callback return value
  pub fn from_sentinel(ret: c_int) -> Self {
    match ret {
      n if n >= 0 => Outcome::Bytes(n as usize),
      AVERROR_EOF => Outcome::Eof,
      AVERROR_ENOSYS => Outcome::Unsupported,
      _ => Outcome::Error,
    }
  }
}

/// Result of a backend seek or size query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
  /// New absolute offset, or total size for a size query
  Position(u64),
  /// The seek failed or is outside the backend's capabilities
  Error,
  /// The backend cannot answer; for a size query this means "size unknown"
  Unsupported,
}

impl SeekOutcome {
  /// Encode as a native seek-callback return value
  pub fn to_sentinel(self) -> i64 {
    match self {
      SeekOutcome::Position(p) => i64::try_from(p).unwrap_or(i64::MAX),
      SeekOutcome::Error => AVERROR_EIO as i64,
      SeekOutcome::Unsupported => AVERROR_ENOSYS as i64,
    }
  }

  /// Decode a native seek-callback return value
  pub fn from_sentinel(ret: i64) -> Self {
    if ret >= 0 {
      SeekOutcome::Position(ret as u64)
    } else if ret == AVERROR_ENOSYS as i64 {
      SeekOutcome::Unsupported
    } else {
      SeekOutcome::Error
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_outcome_roundtrip() {
    for out in [
      Outcome::Bytes(0),
      Outcome::Bytes(4096),
      Outcome::Eof,
      Outcome::Error,
      Outcome::Unsupported,
    ] {
      assert_eq!(Outcome::from_sentinel(out.to_sentinel()), out);
    }
  }

  #[test]
  fn test_seek_outcome_roundtrip() {
    for out in [
      SeekOutcome::Position(0),
      SeekOutcome::Position(1 << 40),
      SeekOutcome::Error,
      SeekOutcome::Unsupported,
    ] {
      assert_eq!(SeekOutcome::from_sentinel(out.to_sentinel()), out);
    }
  }

  #[test]
  fn test_unknown_sentinels_fail_closed() {
    assert_eq!(Outcome::from_sentinel(-1), Outcome::Error);
    assert_eq!(Outcome::from_sentinel(-123456), Outcome::Error);
    assert_eq!(SeekOutcome::from_sentinel(-123456), SeekOutcome::Error);
  }

  #[test]
  fn test_zero_bytes_is_not_eof() {
    assert_eq!(Outcome::from_sentinel(0), Outcome::Bytes(0));
    assert_ne!(Outcome::Bytes(0).to_sentinel(), Outcome::Eof.to_sentinel());
  }
}
