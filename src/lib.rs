#![deny(clippy::all)]

//! Callback-driven custom I/O context bridge
//!
//! This crate bridges two execution models: a native-style I/O engine that
//! drives every read, write and seek by synchronously calling bare C function
//! pointers with a raw buffer, and host code that wants safe stream backends
//! with real error values. An [`IoContext`] owns a native scratch buffer,
//! binds exactly one backend (a file, an in-memory buffer, a stream object,
//! or raw callbacks), and exposes the uniform read/write/seek/flush surface;
//! the trampoline registry recovers type-safe backends from the opaque
//! pointer the engine passes around, and sentinel integers never leak past
//! the outcome mapper.
//!
//! ```
//! use avio_bridge::IoContext;
//! use std::io::SeekFrom;
//!
//! let mut ctx = IoContext::buffer_reader(vec![1u8, 2, 3, 4]).unwrap();
//! let mut buf = [0u8; 4];
//! assert_eq!(ctx.read(&mut buf).unwrap(), 4);
//! assert_eq!(buf, [1, 2, 3, 4]);
//! assert_eq!(ctx.seek(SeekFrom::Start(0)).unwrap(), 0);
//! ```

// Native C-ABI I/O core (callback convention, sentinels, scratch buffers)
pub mod ffi;

// Safe host-side layer (backends, registry, context)
pub mod io;

// Re-export the I/O surface at the crate root
pub use io::{
  dict_flag, BufferSource, Dictionary, IoContext, IoError, IoResult, OpenMode, Outcome, ReadFn,
  SeekFn, SeekOutcome, WriteFn,
};
