//! Safe host-side I/O layer
//!
//! Stream backends, the trampoline registry that lets the native engine reach
//! them, and the [`IoContext`] wrapper tying one backend to one buffered
//! native context.

pub mod context;
pub mod dict;
pub mod outcome;

pub(crate) mod backend;
pub(crate) mod buffer;
pub(crate) mod registry;

pub use backend::{ReadFn, SeekFn, WriteFn};
pub use buffer::BufferSource;
pub use context::{IoContext, OpenMode};
pub use dict::{dict_flag, Dictionary};
pub use outcome::{Outcome, SeekOutcome};

use crate::ffi::error::{AvError, AVERROR_EIO};

/// I/O error type
#[derive(Debug, thiserror::Error)]
pub enum IoError {
  /// The backend has no more data. Distinct from reading zero bytes into an
  /// empty destination, and not a failure: read loops stop cleanly on it
  #[error("end of stream")]
  EndOfStream,

  /// Generic I/O failure: an unsupported operation, a backend error, or use
  /// of a closed context
  #[error("{0}")]
  Io(#[from] AvError),

  /// A malformed argument rejected before reaching the backend
  #[error("invalid argument: {0}")]
  InvalidArgument(String),
}

impl IoError {
  /// Check if this is the end-of-stream marker
  #[inline]
  pub fn is_end_of_stream(&self) -> bool {
    matches!(self, IoError::EndOfStream)
  }

  pub(crate) fn closed() -> Self {
    IoError::Io(AvError::new(AVERROR_EIO, "context is closed"))
  }
}

/// Result type for I/O operations
pub type IoResult<T> = Result<T, IoError>;
