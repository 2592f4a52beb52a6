//! Backend variants bound to an I/O context
//!
//! Each variant owns exactly one underlying resource and exposes only the
//! operations it is capable of; anything else deterministically yields
//! [`Outcome::Error`]. Capability is enforced twice: the context registers a
//! callback only for capabilities the backend declares, and the dispatch here
//! refuses out-of-capability operations regardless.

use super::buffer::{BufferReader, BufferWriter};
use super::outcome::{Outcome, SeekOutcome};
use crate::ffi::avio::seek_whence;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::raw::c_int;

/// Stream object usable behind a read-seeker backend
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Stream object usable behind a write-seeker backend
pub trait WriteSeek: Write + Seek + Send {}
impl<T: Write + Seek + Send> WriteSeek for T {}

/// User-supplied read callback for [`Backend::Callback`]
pub type ReadFn = Box<dyn FnMut(&mut [u8]) -> Outcome + Send>;
/// User-supplied write callback for [`Backend::Callback`]
pub type WriteFn = Box<dyn FnMut(&[u8]) -> Outcome + Send>;
/// User-supplied seek callback for [`Backend::Callback`]
pub type SeekFn = Box<dyn FnMut(SeekFrom) -> SeekOutcome + Send>;

/// The byte source/sink behind an I/O context
pub enum Backend {
  /// OS file opened by the context itself. Owned; closed on drop. The
  /// capability flags mirror the open mode
  File {
    file: File,
    readable: bool,
    writable: bool,
  },
  /// Caller-supplied immutable byte sequence
  BufferReader(BufferReader),
  /// Caller-supplied fixed-capacity byte buffer
  BufferWriter(BufferWriter),
  /// Caller-supplied readable, seekable stream
  ReadSeeker(Box<dyn ReadSeek>),
  /// Caller-supplied writable, seekable stream
  WriteSeeker(Box<dyn WriteSeek>),
  /// Caller-supplied closures; absent closures mean absent capabilities
  Callback {
    read: Option<ReadFn>,
    write: Option<WriteFn>,
    seek: Option<SeekFn>,
  },
}

impl Backend {
  pub(crate) fn can_read(&self) -> bool {
    match self {
      Backend::File { readable, .. } => *readable,
      Backend::BufferReader(_) | Backend::ReadSeeker(_) => true,
      Backend::Callback { read, .. } => read.is_some(),
      _ => false,
    }
  }

  pub(crate) fn can_write(&self) -> bool {
    match self {
      Backend::File { writable, .. } => *writable,
      Backend::BufferWriter(_) | Backend::WriteSeeker(_) => true,
      Backend::Callback { write, .. } => write.is_some(),
      _ => false,
    }
  }

  pub(crate) fn can_seek(&self) -> bool {
    match self {
      Backend::Callback { seek, .. } => seek.is_some(),
      _ => true,
    }
  }

  /// Read into `dest`, reporting how far it got
  pub(crate) fn read(&mut self, dest: &mut [u8]) -> Outcome {
    match self {
      Backend::File { file, readable, .. } => {
        if !*readable {
          return Outcome::Error;
        }
        read_stream(file, dest)
      }
      Backend::BufferReader(buf) => buf.read(dest),
      Backend::ReadSeeker(stream) => read_stream(stream.as_mut(), dest),
      Backend::Callback {
        read: Some(read), ..
      } => clamp_count(read(dest), dest.len()),
      _ => Outcome::Error,
    }
  }

  /// Write from `src`, reporting how many bytes were accepted
  pub(crate) fn write(&mut self, src: &[u8]) -> Outcome {
    match self {
      Backend::File { file, writable, .. } => {
        if !*writable {
          return Outcome::Error;
        }
        write_stream(file, src)
      }
      Backend::BufferWriter(buf) => buf.write(src),
      Backend::WriteSeeker(stream) => write_stream(stream.as_mut(), src),
      Backend::Callback {
        write: Some(write), ..
      } => clamp_count(write(src), src.len()),
      _ => Outcome::Error,
    }
  }

  /// Reposition, or answer the size query for the `AVSEEK_SIZE` whence
  pub(crate) fn seek(&mut self, offset: i64, whence: c_int) -> SeekOutcome {
    if whence == seek_whence::AVSEEK_SIZE {
      return self.size_query();
    }
    let Some(pos) = seek_target(offset, whence) else {
      return SeekOutcome::Error;
    };
    match self {
      Backend::File { file, .. } => seek_stream(file, pos),
      Backend::BufferReader(buf) => buf.seek(pos),
      Backend::BufferWriter(buf) => buf.seek(pos),
      Backend::ReadSeeker(stream) => seek_stream(stream.as_mut(), pos),
      Backend::WriteSeeker(stream) => seek_stream(stream.as_mut(), pos),
      Backend::Callback {
        seek: Some(seek), ..
      } => seek(pos),
      Backend::Callback { .. } => SeekOutcome::Unsupported,
    }
  }

  /// Total size of the underlying resource, where determinable
  fn size_query(&mut self) -> SeekOutcome {
    match self {
      Backend::File { file, .. } => match file.metadata() {
        Ok(meta) => SeekOutcome::Position(meta.len()),
        Err(_) => SeekOutcome::Error,
      },
      Backend::BufferReader(buf) => SeekOutcome::Position(buf.len()),
      Backend::BufferWriter(buf) => SeekOutcome::Position(buf.logical_size()),
      Backend::ReadSeeker(stream) => stream_len(stream.as_mut()),
      Backend::WriteSeeker(stream) => stream_len(stream.as_mut()),
      // No size query exists for bare callbacks; "unknown", not 0
      Backend::Callback { .. } => SeekOutcome::Unsupported,
    }
  }
}

fn read_stream(stream: &mut dyn Read, dest: &mut [u8]) -> Outcome {
  if dest.is_empty() {
    return Outcome::Bytes(0);
  }
  loop {
    match stream.read(dest) {
      Ok(0) => return Outcome::Eof,
      Ok(n) => return Outcome::Bytes(n),
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(_) => return Outcome::Error,
    }
  }
}

fn write_stream(stream: &mut dyn Write, src: &[u8]) -> Outcome {
  if src.is_empty() {
    return Outcome::Bytes(0);
  }
  loop {
    match stream.write(src) {
      Ok(n) => return Outcome::Bytes(n),
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(_) => return Outcome::Error,
    }
  }
}

fn seek_stream(stream: &mut dyn Seek, pos: SeekFrom) -> SeekOutcome {
  match stream.seek(pos) {
    Ok(p) => SeekOutcome::Position(p),
    Err(_) => SeekOutcome::Error,
  }
}

/// Size of a seekable stream, restoring its position afterwards
fn stream_len(stream: &mut dyn Seek) -> SeekOutcome {
  let Ok(cur) = stream.stream_position() else {
    return SeekOutcome::Error;
  };
  let Ok(end) = stream.seek(SeekFrom::End(0)) else {
    return SeekOutcome::Error;
  };
  if stream.seek(SeekFrom::Start(cur)).is_err() {
    return SeekOutcome::Error;
  }
  SeekOutcome::Position(end)
}

/// A callback claiming more bytes than the buffer holds would let the engine
/// consume garbage; fail closed instead
fn clamp_count(out: Outcome, limit: usize) -> Outcome {
  match out {
    Outcome::Bytes(n) if n > limit => Outcome::Error,
    other => other,
  }
}

fn seek_target(offset: i64, whence: c_int) -> Option<SeekFrom> {
  match whence {
    seek_whence::SEEK_SET => u64::try_from(offset).ok().map(SeekFrom::Start),
    seek_whence::SEEK_CUR => Some(SeekFrom::Current(offset)),
    seek_whence::SEEK_END => Some(SeekFrom::End(offset)),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn test_capability_matrix() {
    let reader = Backend::BufferReader(BufferReader::new(vec![0u8; 4]));
    assert!(reader.can_read());
    assert!(!reader.can_write());
    assert!(reader.can_seek());

    let writer = Backend::BufferWriter(BufferWriter::new(vec![0u8; 4]));
    assert!(!writer.can_read());
    assert!(writer.can_write());
    assert!(writer.can_seek());

    let cb = Backend::Callback {
      read: Some(Box::new(|_| Outcome::Eof)),
      write: None,
      seek: None,
    };
    assert!(cb.can_read());
    assert!(!cb.can_write());
    assert!(!cb.can_seek());
  }

  #[test]
  fn test_out_of_capability_operations_fail() {
    let mut reader = Backend::BufferReader(BufferReader::new(vec![0u8; 4]));
    assert_eq!(reader.write(b"x"), Outcome::Error);

    let mut writer = Backend::BufferWriter(BufferWriter::new(vec![0u8; 4]));
    let mut out = [0u8; 1];
    assert_eq!(writer.read(&mut out), Outcome::Error);

    let mut cb = Backend::Callback {
      read: None,
      write: Some(Box::new(|src| Outcome::Bytes(src.len()))),
      seek: None,
    };
    assert_eq!(cb.read(&mut out), Outcome::Error);
    assert_eq!(cb.seek(0, seek_whence::SEEK_SET), SeekOutcome::Unsupported);
  }

  #[test]
  fn test_callback_overcount_fails_closed() {
    let mut cb = Backend::Callback {
      read: Some(Box::new(|dest| Outcome::Bytes(dest.len() + 1))),
      write: Some(Box::new(|src| Outcome::Bytes(src.len() + 1))),
      seek: None,
    };
    let mut out = [0u8; 4];
    assert_eq!(cb.read(&mut out), Outcome::Error);
    assert_eq!(cb.write(b"abcd"), Outcome::Error);
  }

  #[test]
  fn test_stream_size_query_restores_position() {
    let mut backend = Backend::ReadSeeker(Box::new(Cursor::new(vec![0u8; 100])));
    let mut out = [0u8; 10];
    assert_eq!(backend.read(&mut out), Outcome::Bytes(10));
    assert_eq!(
      backend.seek(0, seek_whence::AVSEEK_SIZE),
      SeekOutcome::Position(100)
    );
    // Position is unchanged by the query
    assert_eq!(
      backend.seek(0, seek_whence::SEEK_CUR),
      SeekOutcome::Position(10)
    );
  }

  #[test]
  fn test_write_seeker_rejects_read() {
    let mut backend = Backend::WriteSeeker(Box::new(Cursor::new(Vec::new())));
    let mut out = [0u8; 4];
    assert_eq!(backend.read(&mut out), Outcome::Error);
  }
}
