//! Native custom I/O core
//!
//! The buffered I/O context at the center of the bridge. All data movement is
//! driven through three bare C callbacks plus a single opaque context pointer;
//! the context itself only manages the scratch buffer between the caller and
//! whatever sits behind the callbacks. Callbacks report progress as a byte
//! count or one of the negative sentinel codes from [`crate::ffi::error`].

use super::error::{AVERROR_EINVAL, AVERROR_EIO, AVERROR_ENOSYS, AVERROR_EOF};
use super::mem::av_free;
use std::os::raw::{c_int, c_void};
use std::ptr;

// ============================================================================
// Callback Types
// ============================================================================

/// Read callback for custom I/O
///
/// # Arguments
/// * `opaque` - User-provided opaque pointer
/// * `buf` - Buffer to read into
/// * `buf_size` - Size of buffer
///
/// # Returns
/// Number of bytes read, or a negative sentinel on EOF/error
pub type ReadPacketFn =
  unsafe extern "C" fn(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int;

/// Write callback for custom I/O
///
/// # Arguments
/// * `opaque` - User-provided opaque pointer
/// * `buf` - Buffer containing data to write
/// * `buf_size` - Number of bytes to write
///
/// # Returns
/// Number of bytes accepted (may be fewer), or a negative sentinel on error
pub type WritePacketFn =
  unsafe extern "C" fn(opaque: *mut c_void, buf: *const u8, buf_size: c_int) -> c_int;

/// Seek callback for custom I/O
///
/// # Arguments
/// * `opaque` - User-provided opaque pointer
/// * `offset` - Seek offset
/// * `whence` - Seek mode (SEEK_SET, SEEK_CUR, SEEK_END, or AVSEEK_SIZE)
///
/// # Returns
/// New absolute position (or total size for AVSEEK_SIZE), or a negative
/// sentinel on error
pub type SeekFn = unsafe extern "C" fn(opaque: *mut c_void, offset: i64, whence: c_int) -> i64;

// ============================================================================
// Constants
// ============================================================================

/// Seek whence values
pub mod seek_whence {
  use std::os::raw::c_int;

  /// Seek from beginning
  pub const SEEK_SET: c_int = 0;
  /// Seek from current position
  pub const SEEK_CUR: c_int = 1;
  /// Seek from end
  pub const SEEK_END: c_int = 2;
  /// Return total size (special whence value for seek callback)
  pub const AVSEEK_SIZE: c_int = 0x10000;
}

/// I/O open flags
pub mod avio_flag {
  use std::os::raw::c_int;

  /// Read-only
  pub const READ: c_int = 1;
  /// Write-only
  pub const WRITE: c_int = 2;
  /// Read-write
  pub const READ_WRITE: c_int = READ | WRITE;
}

/// Scratch-buffer phase values for [`AVIOContext::dir`]
pub mod buf_dir {
  use std::os::raw::c_int;

  /// Buffer holds nothing
  pub const NONE: c_int = 0;
  /// Buffer holds read-ahead bytes fetched from the backend
  pub const READ: c_int = 1;
  /// Buffer holds staged bytes not yet forwarded to the backend
  pub const WRITE: c_int = 2;
}

// ============================================================================
// I/O Context
// ============================================================================

/// Buffered I/O context driving all data movement through C callbacks
///
/// The context owns its scratch buffer exclusively; the buffer is handed over
/// at allocation and released by [`avio_context_free`]. `pos` is the backend
/// offset corresponding to `buffer[0]`; together with `buf_pos` it yields the
/// logical stream position.
#[repr(C)]
pub struct AVIOContext {
  /// Scratch buffer (allocated with `av_malloc`, freed by `avio_context_free`)
  pub buffer: *mut u8,
  /// Scratch buffer capacity in bytes
  pub buffer_size: c_int,
  /// Cursor into the scratch buffer: bytes consumed (read phase) or staged
  /// (write phase)
  pub buf_pos: c_int,
  /// Valid bytes in the scratch buffer (read phase only)
  pub buf_len: c_int,
  /// Current phase of the scratch buffer (see [`buf_dir`])
  pub dir: c_int,
  /// Backend offset corresponding to `buffer[0]`
  pub pos: i64,
  /// Nonzero if the context was opened for writing
  pub write_flag: c_int,
  /// Nonzero if the backend supports repositioning
  pub seekable: c_int,
  /// Nonzero after a read hit end of stream (informational; not latched)
  pub eof_reached: c_int,
  /// Sticky error sentinel from a failed forward of staged bytes
  pub error: c_int,
  /// Opaque pointer handed to every callback
  pub opaque: *mut c_void,
  /// Read callback (absent on write-only contexts)
  pub read_packet: Option<ReadPacketFn>,
  /// Write callback (absent on read-only contexts)
  pub write_packet: Option<WritePacketFn>,
  /// Seek callback (absent on non-seekable contexts)
  pub seek: Option<SeekFn>,
}

/// Allocate and initialize an I/O context for custom I/O
///
/// # Arguments
/// * `buffer` - Scratch buffer (must be allocated with `av_malloc`)
/// * `buffer_size` - Size of the scratch buffer
/// * `write_flag` - 1 if writing, 0 if reading
/// * `opaque` - User-provided opaque pointer passed to callbacks
/// * `read_packet` - Read callback (None for write-only)
/// * `write_packet` - Write callback (None for read-only)
/// * `seek` - Seek callback (None for non-seekable)
///
/// # Returns
/// Pointer to the allocated context, or null on failure
///
/// # Safety
/// `buffer` must point to an `av_malloc` allocation of at least `buffer_size`
/// bytes. Ownership of the buffer transfers to the context.
pub unsafe fn avio_alloc_context(
  buffer: *mut u8,
  buffer_size: c_int,
  write_flag: c_int,
  opaque: *mut c_void,
  read_packet: Option<ReadPacketFn>,
  write_packet: Option<WritePacketFn>,
  seek: Option<SeekFn>,
) -> *mut AVIOContext {
  if buffer.is_null() || buffer_size <= 0 {
    return ptr::null_mut();
  }
  Box::into_raw(Box::new(AVIOContext {
    buffer,
    buffer_size,
    buf_pos: 0,
    buf_len: 0,
    dir: buf_dir::NONE,
    pos: 0,
    write_flag: (write_flag != 0) as c_int,
    seekable: seek.is_some() as c_int,
    eof_reached: 0,
    error: 0,
    opaque,
    read_packet,
    write_packet,
    seek,
  }))
}

/// Free an I/O context and its scratch buffer, and null out the pointer
///
/// Staged bytes are NOT forwarded; call [`avio_flush`] first if they matter.
///
/// # Safety
/// `s` must be null, or point to a pointer that is null or was returned by
/// [`avio_alloc_context`] and not freed yet. The context and its buffer must
/// not be used afterwards.
pub unsafe fn avio_context_free(s: *mut *mut AVIOContext) {
  if s.is_null() {
    return;
  }
  let raw = unsafe { *s };
  if raw.is_null() {
    return;
  }
  // Reclaim the context; the scratch buffer is released exactly once here
  let ctx = unsafe { Box::from_raw(raw) };
  unsafe { av_free(ctx.buffer as *mut c_void) };
  unsafe { *s = ptr::null_mut() };
}

/// Read up to `size` bytes into `buf`
///
/// Refills the scratch buffer from the read callback as needed and copies out
/// of it. Staged writes are forwarded first when the buffer switches phase.
///
/// # Returns
/// Bytes read (> 0), `AVERROR_EOF` if the backend is exhausted before any byte
/// was produced, or another negative sentinel on failure. A zero `size`
/// returns 0 without touching the backend. End of stream is not latched: a
/// later call probes the backend again.
///
/// # Safety
/// `s` must be a live context from [`avio_alloc_context`]; `buf` must be valid
/// for `size` writable bytes. The context must not be used reentrantly.
pub unsafe fn avio_read(s: *mut AVIOContext, buf: *mut u8, size: c_int) -> c_int {
  if s.is_null() || size < 0 || (buf.is_null() && size > 0) {
    return AVERROR_EINVAL;
  }
  let ctx = unsafe { &mut *s };
  if size == 0 {
    return 0;
  }
  let Some(read_packet) = ctx.read_packet else {
    return AVERROR_EIO;
  };
  if ctx.dir == buf_dir::WRITE && ctx.buf_pos > 0 {
    let ret = flush_staged(ctx);
    if ret < 0 {
      return ret;
    }
  }
  if ctx.dir != buf_dir::READ {
    ctx.dir = buf_dir::READ;
    ctx.buf_pos = 0;
    ctx.buf_len = 0;
  }
  ctx.eof_reached = 0;
  let mut total: c_int = 0;
  let mut eof = false;
  while total < size {
    if ctx.buf_pos >= ctx.buf_len {
      // Window consumed; refill from the backend
      ctx.pos += ctx.buf_len as i64;
      ctx.buf_pos = 0;
      ctx.buf_len = 0;
      let n = unsafe { read_packet(ctx.opaque, ctx.buffer, ctx.buffer_size) };
      if n == AVERROR_EOF || n == 0 {
        eof = true;
        break;
      }
      if n < 0 {
        ctx.error = n;
        return if total > 0 { total } else { n };
      }
      if n > ctx.buffer_size {
        // Backend claims more than the window holds; fail closed
        ctx.error = AVERROR_EIO;
        return if total > 0 { total } else { AVERROR_EIO };
      }
      ctx.buf_len = n;
    }
    let take = (ctx.buf_len - ctx.buf_pos).min(size - total);
    // SAFETY: both ranges were bounds-checked against their buffers
    unsafe {
      ptr::copy_nonoverlapping(
        ctx.buffer.add(ctx.buf_pos as usize),
        buf.add(total as usize),
        take as usize,
      );
    }
    ctx.buf_pos += take;
    total += take;
  }
  if eof {
    ctx.eof_reached = 1;
    if total == 0 {
      return AVERROR_EOF;
    }
  }
  total
}

/// Write up to `size` bytes from `buf`
///
/// Stages at most one chunk into the scratch buffer; staged bytes reach the
/// backend when the buffer fills, on [`avio_flush`], on [`avio_seek`], or via
/// a phase switch in [`avio_read`].
///
/// # Returns
/// Bytes accepted (possibly fewer than `size`; the caller retries with the
/// remainder), or a negative sentinel. Once a forward has failed the error is
/// sticky and every further write returns it.
///
/// # Safety
/// `s` must be a live context from [`avio_alloc_context`]; `buf` must be valid
/// for `size` readable bytes. The context must not be used reentrantly.
pub unsafe fn avio_write(s: *mut AVIOContext, buf: *const u8, size: c_int) -> c_int {
  if s.is_null() || size < 0 || (buf.is_null() && size > 0) {
    return AVERROR_EINVAL;
  }
  let ctx = unsafe { &mut *s };
  if size == 0 {
    return 0;
  }
  if ctx.write_flag == 0 || ctx.write_packet.is_none() {
    return AVERROR_EIO;
  }
  if ctx.error < 0 {
    return ctx.error;
  }
  if ctx.dir == buf_dir::READ {
    // Drop the read-ahead window. The backend sits at the end of the window,
    // so reposition it to the logical offset unless they already coincide.
    let logical = ctx.pos + ctx.buf_pos as i64;
    if ctx.buf_pos != ctx.buf_len {
      let Some(seek) = ctx.seek else {
        return AVERROR_EIO;
      };
      let ret = unsafe { seek(ctx.opaque, logical, seek_whence::SEEK_SET) };
      if ret < 0 {
        return seek_error(ret);
      }
      ctx.pos = ret;
    } else {
      ctx.pos = logical;
    }
    ctx.buf_pos = 0;
    ctx.buf_len = 0;
  }
  ctx.dir = buf_dir::WRITE;
  if ctx.buf_pos >= ctx.buffer_size {
    let ret = flush_staged(ctx);
    if ret < 0 {
      return ret;
    }
  }
  let take = (ctx.buffer_size - ctx.buf_pos).min(size);
  // SAFETY: [buf_pos, buf_pos + take) lies inside the scratch buffer and
  // [0, take) inside the caller's buffer
  unsafe {
    ptr::copy_nonoverlapping(buf, ctx.buffer.add(ctx.buf_pos as usize), take as usize);
  }
  ctx.buf_pos += take;
  take
}

/// Force staged bytes out to the backend
///
/// A no-op unless the scratch buffer is in the write phase. Idempotent. A
/// failed forward is recorded in the context's `error` field.
///
/// # Safety
/// `s` must be null or a live context from [`avio_alloc_context`], not used
/// reentrantly.
pub unsafe fn avio_flush(s: *mut AVIOContext) {
  if s.is_null() {
    return;
  }
  let ctx = unsafe { &mut *s };
  if ctx.dir == buf_dir::WRITE && ctx.buf_pos > 0 {
    let _ = flush_staged(ctx);
  }
}

/// Reposition the logical stream offset
///
/// Staged writes are forwarded first; the read-ahead window is discarded.
/// `SEEK_CUR` is resolved against the logical position and forwarded to the
/// backend as an absolute seek. The `AVSEEK_SIZE` whence is answered as a
/// size query (see [`avio_size`]).
///
/// # Returns
/// The new absolute offset, or a negative sentinel (`AVERROR_ENOSYS` when the
/// context has no seek callback).
///
/// # Safety
/// `s` must be a live context from [`avio_alloc_context`], not used
/// reentrantly.
pub unsafe fn avio_seek(s: *mut AVIOContext, offset: i64, whence: c_int) -> i64 {
  if s.is_null() {
    return AVERROR_EINVAL as i64;
  }
  if whence == seek_whence::AVSEEK_SIZE {
    return unsafe { avio_size(s) };
  }
  let ctx = unsafe { &mut *s };
  let Some(seek) = ctx.seek else {
    return AVERROR_ENOSYS as i64;
  };
  if ctx.dir == buf_dir::WRITE && ctx.buf_pos > 0 {
    let ret = flush_staged(ctx);
    if ret < 0 {
      return ret as i64;
    }
  }
  let (target, fwd_whence) = match whence {
    seek_whence::SEEK_SET => (offset, seek_whence::SEEK_SET),
    seek_whence::SEEK_CUR => (ctx.pos + ctx.buf_pos as i64 + offset, seek_whence::SEEK_SET),
    seek_whence::SEEK_END => (offset, seek_whence::SEEK_END),
    _ => return AVERROR_EINVAL as i64,
  };
  if fwd_whence == seek_whence::SEEK_SET && target < 0 {
    return AVERROR_EINVAL as i64;
  }
  let ret = unsafe { seek(ctx.opaque, target, fwd_whence) };
  if ret < 0 {
    return ret;
  }
  ctx.pos = ret;
  ctx.buf_pos = 0;
  ctx.buf_len = 0;
  ctx.dir = buf_dir::NONE;
  ctx.eof_reached = 0;
  ret
}

/// Query the total stream size
///
/// Forwards the `AVSEEK_SIZE` whence through the seek callback after flushing
/// staged writes, so the answer reflects everything written so far.
///
/// # Returns
/// The size, or a negative sentinel (`AVERROR_ENOSYS` when the context has no
/// seek callback or the backend cannot report a size).
///
/// # Safety
/// `s` must be a live context from [`avio_alloc_context`], not used
/// reentrantly.
pub unsafe fn avio_size(s: *mut AVIOContext) -> i64 {
  if s.is_null() {
    return AVERROR_EINVAL as i64;
  }
  let ctx = unsafe { &mut *s };
  let Some(seek) = ctx.seek else {
    return AVERROR_ENOSYS as i64;
  };
  if ctx.dir == buf_dir::WRITE && ctx.buf_pos > 0 {
    let ret = flush_staged(ctx);
    if ret < 0 {
      return ret as i64;
    }
  }
  unsafe { seek(ctx.opaque, 0, seek_whence::AVSEEK_SIZE) }
}

/// Forward staged bytes to the backend, retrying partial accepts
///
/// Zero-progress and over-accepting backends fail closed. The error is
/// recorded in the context and returned.
fn flush_staged(ctx: &mut AVIOContext) -> c_int {
  if ctx.error < 0 {
    return ctx.error;
  }
  let Some(write_packet) = ctx.write_packet else {
    ctx.error = AVERROR_EIO;
    return AVERROR_EIO;
  };
  let mut off: c_int = 0;
  while off < ctx.buf_pos {
    // SAFETY: [off, buf_pos) lies inside the scratch buffer
    let n = unsafe { write_packet(ctx.opaque, ctx.buffer.add(off as usize), ctx.buf_pos - off) };
    if n < 0 {
      ctx.error = n;
      return n;
    }
    if n == 0 || n > ctx.buf_pos - off {
      ctx.error = AVERROR_EIO;
      return AVERROR_EIO;
    }
    off += n;
  }
  ctx.pos += ctx.buf_pos as i64;
  ctx.buf_pos = 0;
  0
}

/// Clamp an i64 seek sentinel into the c_int sentinel range
fn seek_error(ret: i64) -> c_int {
  c_int::try_from(ret).unwrap_or(AVERROR_EIO)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ffi::mem::av_malloc;

  /// Byte store driven purely through the C callbacks, like a file in RAM
  struct RamFile {
    data: Vec<u8>,
    pos: usize,
  }

  unsafe extern "C" fn ram_read(opaque: *mut c_void, buf: *mut u8, buf_size: c_int) -> c_int {
    let f = unsafe { &mut *(opaque as *mut RamFile) };
    if f.pos >= f.data.len() {
      return AVERROR_EOF;
    }
    let take = (f.data.len() - f.pos).min(buf_size as usize);
    unsafe { ptr::copy_nonoverlapping(f.data.as_ptr().add(f.pos), buf, take) };
    f.pos += take;
    take as c_int
  }

  unsafe extern "C" fn ram_write(opaque: *mut c_void, buf: *const u8, buf_size: c_int) -> c_int {
    let f = unsafe { &mut *(opaque as *mut RamFile) };
    let src = unsafe { std::slice::from_raw_parts(buf, buf_size as usize) };
    let end = f.pos + src.len();
    if end > f.data.len() {
      f.data.resize(end, 0);
    }
    f.data[f.pos..end].copy_from_slice(src);
    f.pos = end;
    buf_size
  }

  /// Write callback accepting at most 3 bytes per call
  unsafe extern "C" fn ram_write_trickle(
    opaque: *mut c_void,
    buf: *const u8,
    buf_size: c_int,
  ) -> c_int {
    unsafe { ram_write(opaque, buf, buf_size.min(3)) }
  }

  unsafe extern "C" fn ram_seek(opaque: *mut c_void, offset: i64, whence: c_int) -> i64 {
    let f = unsafe { &mut *(opaque as *mut RamFile) };
    if whence == seek_whence::AVSEEK_SIZE {
      return f.data.len() as i64;
    }
    let base = match whence {
      seek_whence::SEEK_SET => 0,
      seek_whence::SEEK_CUR => f.pos as i64,
      seek_whence::SEEK_END => f.data.len() as i64,
      _ => return AVERROR_EINVAL as i64,
    };
    let target = base + offset;
    if target < 0 {
      return AVERROR_EINVAL as i64;
    }
    f.pos = target as usize;
    target
  }

  fn alloc_ram_ctx(
    file: *mut RamFile,
    chunk: usize,
    write_flag: c_int,
    write_packet: Option<WritePacketFn>,
    read_packet: Option<ReadPacketFn>,
  ) -> *mut AVIOContext {
    let buffer = av_malloc(chunk) as *mut u8;
    assert!(!buffer.is_null());
    let ctx = unsafe {
      avio_alloc_context(
        buffer,
        chunk as c_int,
        write_flag,
        file as *mut c_void,
        read_packet,
        write_packet,
        Some(ram_seek),
      )
    };
    assert!(!ctx.is_null());
    ctx
  }

  fn free_ctx(mut ctx: *mut AVIOContext) {
    unsafe { avio_context_free(&mut ctx) };
    assert!(ctx.is_null());
  }

  #[test]
  fn test_staged_write_flushes_in_order() {
    let file = Box::into_raw(Box::new(RamFile {
      data: Vec::new(),
      pos: 0,
    }));
    let ctx = alloc_ram_ctx(file, 8, 1, Some(ram_write), None);
    unsafe {
      assert_eq!(avio_write(ctx, b"hello".as_ptr(), 5), 5);
      // Staged only; nothing reached the backend yet
      assert!((*(file)).data.is_empty());
      avio_flush(ctx);
      assert_eq!((*(file)).data, b"hello");

      // Larger than the remaining chunk: accepted in two calls
      let tail = b"0123456789";
      let n = avio_write(ctx, tail.as_ptr(), 10);
      assert_eq!(n, 8);
      assert_eq!(avio_write(ctx, tail[8..].as_ptr(), 2), 2);
      avio_flush(ctx);
      assert_eq!((*(file)).data, b"hello0123456789");
      assert_eq!((*ctx).error, 0);
    }
    free_ctx(ctx);
    drop(unsafe { Box::from_raw(file) });
  }

  #[test]
  fn test_read_spans_refills() {
    let file = Box::into_raw(Box::new(RamFile {
      data: (0u8..20).collect(),
      pos: 0,
    }));
    let ctx = alloc_ram_ctx(file, 8, 0, None, Some(ram_read));
    let mut out = [0u8; 20];
    unsafe {
      assert_eq!(avio_read(ctx, out.as_mut_ptr(), 20), 20);
      assert_eq!(out.to_vec(), (0u8..20).collect::<Vec<_>>());
      assert_eq!(avio_read(ctx, out.as_mut_ptr(), 1), AVERROR_EOF);
      assert_eq!((*ctx).eof_reached, 1);
    }
    free_ctx(ctx);
    drop(unsafe { Box::from_raw(file) });
  }

  #[test]
  fn test_seek_resolves_current_against_logical_position() {
    let file = Box::into_raw(Box::new(RamFile {
      data: (0u8..32).collect(),
      pos: 0,
    }));
    let ctx = alloc_ram_ctx(file, 8, 0, None, Some(ram_read));
    let mut out = [0u8; 8];
    unsafe {
      assert_eq!(avio_read(ctx, out.as_mut_ptr(), 5), 5);
      // The backend read ahead a full chunk; SEEK_CUR must still resolve
      // against the logical offset 5
      assert_eq!(avio_seek(ctx, -2, seek_whence::SEEK_CUR), 3);
      assert_eq!(avio_read(ctx, out.as_mut_ptr(), 4), 4);
      assert_eq!(&out[..4], &[3, 4, 5, 6]);
    }
    free_ctx(ctx);
    drop(unsafe { Box::from_raw(file) });
  }

  #[test]
  fn test_write_into_read_window_repositions_backend() {
    let file = Box::into_raw(Box::new(RamFile {
      data: vec![0xAA; 20],
      pos: 0,
    }));
    let ctx = alloc_ram_ctx(file, 8, 1, Some(ram_write), Some(ram_read));
    let mut out = [0u8; 8];
    unsafe {
      assert_eq!(avio_read(ctx, out.as_mut_ptr(), 5), 5);
      // Logical offset is 5 but the backend sits at 8; the write must land
      // at 5
      assert_eq!(avio_write(ctx, b"xyz".as_ptr(), 3), 3);
      avio_flush(ctx);
      assert_eq!(&(&(*(file)).data)[5..8], b"xyz");
      assert_eq!((&(*(file)).data)[4], 0xAA);
      assert_eq!((&(*(file)).data)[8], 0xAA);
    }
    free_ctx(ctx);
    drop(unsafe { Box::from_raw(file) });
  }

  #[test]
  fn test_partial_backend_accepts_are_completed() {
    let file = Box::into_raw(Box::new(RamFile {
      data: Vec::new(),
      pos: 0,
    }));
    let ctx = alloc_ram_ctx(file, 16, 1, Some(ram_write_trickle), None);
    unsafe {
      assert_eq!(avio_write(ctx, b"abcdefgh".as_ptr(), 8), 8);
      avio_flush(ctx);
      assert_eq!((*(file)).data, b"abcdefgh");
      assert_eq!((*ctx).error, 0);
    }
    free_ctx(ctx);
    drop(unsafe { Box::from_raw(file) });
  }

  #[test]
  fn test_read_without_callback_is_io_error() {
    let file = Box::into_raw(Box::new(RamFile {
      data: Vec::new(),
      pos: 0,
    }));
    let ctx = alloc_ram_ctx(file, 8, 1, Some(ram_write), None);
    let mut out = [0u8; 4];
    unsafe {
      assert_eq!(avio_read(ctx, out.as_mut_ptr(), 4), AVERROR_EIO);
    }
    free_ctx(ctx);
    drop(unsafe { Box::from_raw(file) });
  }

  #[test]
  fn test_size_reflects_staged_bytes() {
    let file = Box::into_raw(Box::new(RamFile {
      data: Vec::new(),
      pos: 0,
    }));
    let ctx = alloc_ram_ctx(file, 32, 1, Some(ram_write), None);
    unsafe {
      assert_eq!(avio_size(ctx), 0);
      assert_eq!(avio_write(ctx, b"testtest".as_ptr(), 8), 8);
      // The size query must flush first
      assert_eq!(avio_size(ctx), 8);
    }
    free_ctx(ctx);
    drop(unsafe { Box::from_raw(file) });
  }

  #[test]
  fn test_invalid_whence_rejected() {
    let file = Box::into_raw(Box::new(RamFile {
      data: Vec::new(),
      pos: 0,
    }));
    let ctx = alloc_ram_ctx(file, 8, 0, None, Some(ram_read));
    unsafe {
      assert_eq!(avio_seek(ctx, 0, 99), AVERROR_EINVAL as i64);
    }
    free_ctx(ctx);
    drop(unsafe { Box::from_raw(file) });
  }
}
