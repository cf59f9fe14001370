//! Prevents [false sharing](https://en.wikipedia.org/wiki/False_sharing) by adding padding
//! (unused bytes) between variables.
//!
//! The hot atomics of every queue (`write_to`, `read_from`, `active` and the registration
//! counters) are each wrapped into a [`CachePad`] so that producer-touched and
//! consumer-touched fields never share a cache line. This is a performance contract only:
//! correctness never depends on it.
//!
//! # Size and alignment
//!
//! Cache lines are assumed to be [`CACHE_LINE_SIZE`] bytes long, depending on the
//! architecture:
//!
//! - On x86_64 and aarch64, N = 128 (adjacent-line prefetching pulls lines in pairs).
//! - On all others, N = 64.
//!
//! The size of `CachePad<T>` is the smallest multiple of N bytes large enough to accommodate
//! a value of type `T`.
//!
//! On targets with another line size the padding only costs memory.

use std::fmt;
use std::ops::Deref;

/// The cache line size assumed when padding the hot fields of a queue.
///
/// `#[repr(align(..))]` only accepts literals, so [`CachePad`] repeats the value; both are
/// kept in sync by a test.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
pub const CACHE_LINE_SIZE: usize = 128;

/// The cache line size assumed when padding the hot fields of a queue.
///
/// `#[repr(align(..))]` only accepts literals, so [`CachePad`] repeats the value; both are
/// kept in sync by a test.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub const CACHE_LINE_SIZE: usize = 64;

/// Pads and aligns data to the length of a cache line.
#[cfg_attr(any(target_arch = "x86_64", target_arch = "aarch64"), repr(align(128)))]
#[cfg_attr(
    not(any(target_arch = "x86_64", target_arch = "aarch64")),
    repr(align(64))
)]
pub(crate) struct CachePad<T>(T);

impl<T> CachePad<T> {
    /// Creates a padded representation of the data aligned with the
    /// length of a cache line.
    pub(crate) fn new(t: T) -> CachePad<T> {
        CachePad(t)
    }
}

impl<T> Deref for CachePad<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePad<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CachePad").field(&self.0).finish()
    }
}
