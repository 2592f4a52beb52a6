//! Callback trampoline registry
//!
//! The native engine invokes callbacks through bare function pointers with a
//! single opaque pointer of context. This registry is the only place that
//! pointer is turned back into a type-safe backend: the opaque value carries a
//! registry handle - a monotonic index that is never reused - rather than a
//! raw address, so a freed-and-reallocated backend can never be confused with
//! a live one. The table is created on first use and drains back to empty
//! when the last context closes.
//!
//! Lookups are safe from any thread the engine calls back on, including
//! reentrantly from inside another callback: the table lock is released
//! before the per-entry mutex is taken.

use super::backend::Backend;
use crate::ffi::error::{AVERROR_EINVAL, AVERROR_EIO};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::os::raw::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Opaque handle identifying a registered backend
///
/// Unique for the lifetime of the process; handle 0 is reserved as null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Handle(u64);

impl Handle {
  /// Encode the handle as the opaque pointer handed to the native layer
  pub(crate) fn as_opaque(self) -> *mut c_void {
    self.0 as usize as *mut c_void
  }

  fn from_opaque(opaque: *mut c_void) -> Self {
    Handle(opaque as usize as u64)
  }
}

struct Registry {
  entries: RwLock<HashMap<u64, Arc<Mutex<Backend>>>>,
  next: AtomicU64,
}

fn registry() -> &'static Registry {
  static REGISTRY: OnceLock<Registry> = OnceLock::new();
  REGISTRY.get_or_init(|| Registry {
    entries: RwLock::new(HashMap::new()),
    next: AtomicU64::new(1),
  })
}

/// Register a backend, returning its fresh handle
pub(crate) fn register(backend: Backend) -> Handle {
  let reg = registry();
  let id = reg.next.fetch_add(1, Ordering::Relaxed);
  reg.entries.write().insert(id, Arc::new(Mutex::new(backend)));
  tracing::trace!(handle = id, "registered I/O backend");
  Handle(id)
}

/// Remove a backend, returning it so a caller can reclaim its resource
pub(crate) fn unregister(handle: Handle) -> Option<Arc<Mutex<Backend>>> {
  let removed = registry().entries.write().remove(&handle.0);
  if removed.is_some() {
    tracing::trace!(handle = handle.0, "unregistered I/O backend");
  }
  removed
}

fn lookup(handle: Handle) -> Option<Arc<Mutex<Backend>>> {
  registry().entries.read().get(&handle.0).cloned()
}

// ============================================================================
// Trampolines
// ============================================================================
//
// Each trampoline recovers the backend from the opaque handle, runs the
// operation, and encodes the outcome as a sentinel. A panicking backend must
// not unwind into the native caller (undefined behavior), so the body runs
// under catch_unwind and a panic becomes an I/O error.

pub(crate) unsafe extern "C" fn trampoline_read(
  opaque: *mut c_void,
  buf: *mut u8,
  buf_size: c_int,
) -> c_int {
  if opaque.is_null() || buf.is_null() || buf_size < 0 {
    return AVERROR_EINVAL;
  }
  let Some(entry) = lookup(Handle::from_opaque(opaque)) else {
    return AVERROR_EIO;
  };
  // SAFETY: the engine hands us a buffer valid for buf_size writable bytes
  let dest = unsafe { std::slice::from_raw_parts_mut(buf, buf_size as usize) };
  match panic::catch_unwind(AssertUnwindSafe(|| {
    entry.lock().read(dest).to_sentinel()
  })) {
    Ok(ret) => ret,
    Err(_) => {
      tracing::error!("panic in read backend caught at the native boundary");
      AVERROR_EIO
    }
  }
}

pub(crate) unsafe extern "C" fn trampoline_write(
  opaque: *mut c_void,
  buf: *const u8,
  buf_size: c_int,
) -> c_int {
  if opaque.is_null() || buf.is_null() || buf_size < 0 {
    return AVERROR_EINVAL;
  }
  let Some(entry) = lookup(Handle::from_opaque(opaque)) else {
    return AVERROR_EIO;
  };
  // SAFETY: the engine hands us a buffer valid for buf_size readable bytes
  let src = unsafe { std::slice::from_raw_parts(buf, buf_size as usize) };
  match panic::catch_unwind(AssertUnwindSafe(|| {
    entry.lock().write(src).to_sentinel()
  })) {
    Ok(ret) => ret,
    Err(_) => {
      tracing::error!("panic in write backend caught at the native boundary");
      AVERROR_EIO
    }
  }
}

pub(crate) unsafe extern "C" fn trampoline_seek(
  opaque: *mut c_void,
  offset: i64,
  whence: c_int,
) -> i64 {
  if opaque.is_null() {
    return AVERROR_EINVAL as i64;
  }
  let Some(entry) = lookup(Handle::from_opaque(opaque)) else {
    return AVERROR_EIO as i64;
  };
  match panic::catch_unwind(AssertUnwindSafe(|| {
    entry.lock().seek(offset, whence).to_sentinel()
  })) {
    Ok(ret) => ret,
    Err(_) => {
      tracing::error!("panic in seek backend caught at the native boundary");
      AVERROR_EIO as i64
    }
  }
}
