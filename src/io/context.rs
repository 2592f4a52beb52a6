//! Custom I/O context
//!
//! Safe wrapper binding exactly one backend to a buffered native I/O context.
//! Construction picks the backend; afterwards every operation goes through the
//! uniform read/write/seek/flush surface, and the native side reaches the
//! backend only through the trampoline registry.

use super::backend::{Backend, ReadFn, SeekFn, WriteFn};
use super::buffer::{BufferReader, BufferSource, BufferWriter};
use super::dict::Dictionary;
use super::registry::{self, Handle};
use super::{IoError, IoResult};
use crate::ffi::avio::{
  avio_alloc_context, avio_context_free, avio_flag, avio_flush, avio_read, avio_seek, avio_size,
  avio_write, seek_whence, AVIOContext, ReadPacketFn, SeekFn as RawSeekFn, WritePacketFn,
};
use crate::ffi::error::{check_error, AvError, AVERROR_EIO, AVERROR_ENOMEM, AVERROR_EOF};
use crate::ffi::mem::{av_free, av_malloc};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::raw::{c_int, c_void};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;

/// Default scratch-buffer chunk size (32KB)
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Access mode for file-backed contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
  /// Open an existing file for reading
  Read,
  /// Create or truncate a file for writing
  Write,
  /// Create or truncate a file for reading and writing
  ReadWrite,
}

impl OpenMode {
  fn flags(self) -> c_int {
    match self {
      OpenMode::Read => avio_flag::READ,
      OpenMode::Write => avio_flag::WRITE,
      OpenMode::ReadWrite => avio_flag::READ_WRITE,
    }
  }
}

/// Custom I/O context
///
/// Owns its native context (and through it the scratch buffer) plus the
/// registry entry for its backend. Operations on a closed context fail with
/// an I/O error; they never touch freed memory.
#[derive(Debug)]
pub struct IoContext {
  /// Native context; None once closed
  raw: Option<NonNull<AVIOContext>>,
  handle: Handle,
}

impl IoContext {
  // ==========================================================================
  // Construction paths
  // ==========================================================================

  /// Open a file at `path`
  ///
  /// The file handle is owned by the context and closed with it.
  pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> IoResult<Self> {
    Self::open_with(path, mode, &Dictionary::new())
  }

  /// Open a file at `path`, passing an option collection through the open
  /// call
  ///
  /// The dictionary stays owned by the caller. The file backend currently
  /// defines no options, so every key is ignored (and logged at debug level).
  pub fn open_with(path: impl AsRef<Path>, mode: OpenMode, options: &Dictionary) -> IoResult<Self> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
      return Err(IoError::InvalidArgument("empty path".to_string()));
    }
    for (key, _) in options.iter() {
      tracing::debug!(key, "ignoring unrecognized open option");
    }
    let flags = mode.flags();
    let mut opts = OpenOptions::new();
    opts.read(flags & avio_flag::READ != 0);
    if flags & avio_flag::WRITE != 0 {
      opts.write(true).create(true).truncate(true);
    }
    let file = opts.open(path).map_err(|e| {
      AvError::new(AVERROR_EIO, format!("failed to open {}: {e}", path.display()))
    })?;
    Self::create(Backend::File {
      file,
      readable: flags & avio_flag::READ != 0,
      writable: flags & avio_flag::WRITE != 0,
    })
  }

  /// Wrap an in-memory byte sequence for reading and seeking
  ///
  /// The sequence is moved into the context; it is not copied.
  pub fn buffer_reader(source: impl BufferSource + 'static) -> IoResult<Self> {
    Self::create(Backend::BufferReader(BufferReader::new(source)))
  }

  /// Wrap a fixed-capacity buffer for writing and seeking
  ///
  /// Capacity is `buf.len()` and is never grown; a write that does not fit
  /// fails instead of truncating. Recover the bytes with
  /// [`IoContext::into_buffer`].
  pub fn buffer_writer(buf: Vec<u8>) -> IoResult<Self> {
    Self::create(Backend::BufferWriter(BufferWriter::new(buf)))
  }

  /// Wrap a readable, seekable stream
  ///
  /// The stream is moved into the context and dropped with it.
  pub fn read_seeker(stream: impl Read + Seek + Send + 'static) -> IoResult<Self> {
    Self::create(Backend::ReadSeeker(Box::new(stream)))
  }

  /// Wrap a writable, seekable stream
  ///
  /// The stream is moved into the context and dropped with it. Reading on
  /// this context always fails.
  pub fn write_seeker(stream: impl Write + Seek + Send + 'static) -> IoResult<Self> {
    Self::create(Backend::WriteSeeker(Box::new(stream)))
  }

  /// Wrap raw callbacks
  ///
  /// Each operation is available exactly when its callback is present; a
  /// missing callback yields an I/O error for that operation, and the size
  /// query reports unknown. At least one callback is required.
  pub fn from_callbacks(
    read: Option<ReadFn>,
    write: Option<WriteFn>,
    seek: Option<SeekFn>,
  ) -> IoResult<Self> {
    if read.is_none() && write.is_none() && seek.is_none() {
      return Err(IoError::InvalidArgument(
        "at least one callback is required".to_string(),
      ));
    }
    Self::create(Backend::Callback { read, write, seek })
  }

  fn create(backend: Backend) -> IoResult<Self> {
    let readable = backend.can_read();
    let writable = backend.can_write();
    let seekable = backend.can_seek();

    let buffer = av_malloc(DEFAULT_BUFFER_SIZE) as *mut u8;
    if buffer.is_null() {
      return Err(IoError::Io(AvError::new(
        AVERROR_ENOMEM,
        "failed to allocate I/O buffer",
      )));
    }

    let handle = registry::register(backend);
    // A capability the backend lacks gets no callback at all, never a stub
    let ptr = unsafe {
      avio_alloc_context(
        buffer,
        DEFAULT_BUFFER_SIZE as c_int,
        writable as c_int,
        handle.as_opaque(),
        readable.then_some(registry::trampoline_read as ReadPacketFn),
        writable.then_some(registry::trampoline_write as WritePacketFn),
        seekable.then_some(registry::trampoline_seek as RawSeekFn),
      )
    };
    match NonNull::new(ptr) {
      Some(raw) => {
        tracing::trace!(readable, writable, seekable, "opened I/O context");
        Ok(Self {
          raw: Some(raw),
          handle,
        })
      }
      None => {
        registry::unregister(handle);
        // The context never took ownership of the buffer
        unsafe { av_free(buffer as *mut c_void) };
        Err(IoError::Io(AvError::new(
          AVERROR_ENOMEM,
          "failed to allocate I/O context",
        )))
      }
    }
  }

  // ==========================================================================
  // Data operations
  // ==========================================================================

  fn raw(&self) -> IoResult<*mut AVIOContext> {
    self.raw.map(NonNull::as_ptr).ok_or_else(IoError::closed)
  }

  /// Read up to `dest.len()` bytes, returning the count actually read
  ///
  /// An empty destination reads nothing and returns 0. `EndOfStream` is
  /// returned only when the backend is exhausted before any byte was
  /// produced; it is not sticky, so a backend that grows afterwards becomes
  /// readable again.
  pub fn read(&mut self, dest: &mut [u8]) -> IoResult<usize> {
    let raw = self.raw()?;
    if dest.is_empty() {
      return Ok(0);
    }
    let len = c_int::try_from(dest.len()).unwrap_or(c_int::MAX);
    // SAFETY: raw is live and dest is valid for len bytes
    let ret = unsafe { avio_read(raw, dest.as_mut_ptr(), len) };
    match ret {
      AVERROR_EOF => Err(IoError::EndOfStream),
      code => Ok(check_error(code)? as usize),
    }
  }

  /// Write from `src`, returning the count accepted
  ///
  /// May accept fewer bytes than offered; retry with the remainder or use
  /// [`IoContext::write_all`]. Bytes are staged in the scratch buffer and
  /// reach the backend on flush, seek, close, or when the buffer fills. An
  /// empty `src` is a successful no-op.
  pub fn write(&mut self, src: &[u8]) -> IoResult<usize> {
    let raw = self.raw()?;
    if src.is_empty() {
      return Ok(0);
    }
    let len = c_int::try_from(src.len()).unwrap_or(c_int::MAX);
    // SAFETY: raw is live and src is valid for len bytes
    let ret = unsafe { avio_write(raw, src.as_ptr(), len) };
    Ok(check_error(ret)? as usize)
  }

  /// Write all of `src`, retrying partial accepts
  pub fn write_all(&mut self, mut src: &[u8]) -> IoResult<()> {
    while !src.is_empty() {
      let n = self.write(src)?;
      if n == 0 {
        return Err(IoError::Io(AvError::new(
          AVERROR_EIO,
          "backend accepted no bytes",
        )));
      }
      src = &src[n..];
    }
    Ok(())
  }

  /// Reposition the logical offset, returning the new absolute position
  ///
  /// Staged writes are forwarded first and the read-ahead window is
  /// discarded. Fails when the backend is not seekable.
  pub fn seek(&mut self, pos: SeekFrom) -> IoResult<u64> {
    let raw = self.raw()?;
    let (offset, whence) = match pos {
      SeekFrom::Start(off) => (
        i64::try_from(off)
          .map_err(|_| IoError::InvalidArgument("seek offset out of range".to_string()))?,
        seek_whence::SEEK_SET,
      ),
      SeekFrom::Current(off) => (off, seek_whence::SEEK_CUR),
      SeekFrom::End(off) => (off, seek_whence::SEEK_END),
    };
    // SAFETY: raw is live
    let ret = unsafe { avio_seek(raw, offset, whence) };
    if ret < 0 {
      let code = c_int::try_from(ret).unwrap_or(AVERROR_EIO);
      return Err(IoError::Io(AvError::from_code(code)));
    }
    Ok(ret as u64)
  }

  /// Force staged bytes out to the backend. Idempotent
  pub fn flush(&mut self) -> IoResult<()> {
    let raw = self.raw()?;
    // SAFETY: raw is live
    unsafe { avio_flush(raw) };
    let err = unsafe { (*raw).error };
    if err < 0 {
      return Err(IoError::Io(AvError::from_code(err)));
    }
    Ok(())
  }

  /// Total size of the underlying resource, where the backend can report it
  ///
  /// Staged writes are flushed first so the answer includes them. Returns
  /// None when the backend has no way to answer (for example a bare callback
  /// backend), never a misleading 0.
  pub fn size(&mut self) -> Option<u64> {
    let raw = self.raw.map(NonNull::as_ptr)?;
    // SAFETY: raw is live
    let ret = unsafe { avio_size(raw) };
    u64::try_from(ret).ok()
  }

  /// Check whether the backend supports repositioning
  pub fn seekable(&self) -> bool {
    match self.raw {
      // SAFETY: the pointer is live until close
      Some(raw) => unsafe { (*raw.as_ptr()).seekable != 0 },
      None => false,
    }
  }

  /// Whether this context is still open
  pub fn is_open(&self) -> bool {
    self.raw.is_some()
  }

  // ==========================================================================
  // Teardown
  // ==========================================================================

  /// Close the context
  ///
  /// Flushes staged bytes best-effort, releases the scratch buffer exactly
  /// once and removes the backend from the registry. Never fails and is
  /// idempotent; cleanup paths can call it unconditionally. Also runs on
  /// drop.
  pub fn close(&mut self) {
    let Some(raw) = self.raw.take() else {
      return;
    };
    let mut ptr = raw.as_ptr();
    // SAFETY: ptr is the live context this wrapper owns; taking it out of
    // self.raw above guarantees no further use after the free
    unsafe {
      avio_flush(ptr);
      avio_context_free(&mut ptr);
    }
    registry::unregister(self.handle);
    tracing::trace!("closed I/O context");
  }

  /// Recover the bytes of a buffer-writer context, consuming it
  ///
  /// Flushes staged bytes first, then closes the context and hands back the
  /// buffer passed to [`IoContext::buffer_writer`]. Fails on any other
  /// backend.
  pub fn into_buffer(mut self) -> IoResult<Vec<u8>> {
    self.flush()?;
    let Some(raw) = self.raw.take() else {
      return Err(IoError::closed());
    };
    let mut ptr = raw.as_ptr();
    // SAFETY: same ownership argument as in close()
    unsafe { avio_context_free(&mut ptr) };
    let Some(entry) = registry::unregister(self.handle) else {
      return Err(IoError::closed());
    };
    let backend = Arc::try_unwrap(entry)
      .map_err(|_| IoError::Io(AvError::new(AVERROR_EIO, "backend still in use")))?
      .into_inner();
    match backend {
      Backend::BufferWriter(buf) => Ok(buf.into_inner()),
      _ => Err(IoError::InvalidArgument(
        "context is not backed by a buffer writer".to_string(),
      )),
    }
  }
}

impl Drop for IoContext {
  fn drop(&mut self) {
    self.close();
  }
}

// SAFETY: the native context is reached only through &mut self (or the
// registry's per-entry mutex), and every backend is Send by bound, so moving
// the wrapper to another thread is sound.
unsafe impl Send for IoContext {}
