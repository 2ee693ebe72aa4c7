//! # Unwinding
//!
//! Capturing the return addresses of the calling thread.
//!
//! The platform unwinder is `backtrace(3)` (glibc on Linux, libSystem on
//! Apple targets). It walks the current thread only and never touches the
//! heap once primed, so it is usable from the crash handler.

use crate::types::Address;

/// Upper bound on frames captured for one trace.
pub const MAX_STACK_DEPTH: usize = 256;

/// Source of return addresses for the current thread.
pub trait Unwinder
{
    /// Fill `frames` newest first and return how many were written.
    ///
    /// Never writes past `frames.len()`.
    fn unwind(&self, frames: &mut [Address]) -> usize;
}

impl<U: Unwinder + ?Sized> Unwinder for &U
{
    fn unwind(&self, frames: &mut [Address]) -> usize
    {
        (**self).unwind(frames)
    }
}

/// The unwinder provided by the C library.
///
/// Targets without `backtrace(3)` capture zero frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformUnwinder;

impl PlatformUnwinder
{
    /// Run one throwaway unwind.
    ///
    /// glibc loads its unwinding library on first use, which allocates. Call
    /// this before any context where allocation is off-limits.
    pub fn prime()
    {
        let mut frames = [Address::ZERO; 4];
        let _ = PlatformUnwinder.unwind(&mut frames);
    }
}

#[cfg(any(target_os = "macos", target_os = "ios", all(target_os = "linux", target_env = "gnu")))]
mod native
{
    use std::os::raw::{c_int, c_void};

    extern "C" {
        pub fn backtrace(buffer: *mut *mut c_void, size: c_int) -> c_int;
    }
}

#[cfg(any(target_os = "macos", target_os = "ios", all(target_os = "linux", target_env = "gnu")))]
impl Unwinder for PlatformUnwinder
{
    fn unwind(&self, frames: &mut [Address]) -> usize
    {
        use std::os::raw::{c_int, c_void};

        let mut raw: [*mut c_void; MAX_STACK_DEPTH] = [std::ptr::null_mut(); MAX_STACK_DEPTH];
        let limit = frames.len().min(MAX_STACK_DEPTH);

        // SAFETY: `raw` holds at least `limit` slots and backtrace writes at most `limit`.
        let written = unsafe { native::backtrace(raw.as_mut_ptr(), limit as c_int) };
        let written = usize::try_from(written).unwrap_or(0).min(limit);

        for (slot, address) in frames.iter_mut().zip(&raw[..written]) {
            *slot = Address::new(*address as usize as u64);
        }
        written
    }
}

#[cfg(not(any(target_os = "macos", target_os = "ios", all(target_os = "linux", target_env = "gnu"))))]
impl Unwinder for PlatformUnwinder
{
    fn unwind(&self, _frames: &mut [Address]) -> usize
    {
        0
    }
}
