//! Cursor advancement strategies of the claim protocol.
//!
//! A cursor is a monotonically increasing logical index; the ring is addressed with
//! `index % capacity`. Claiming an index means advancing the cursor past it:
//!
//! - [`Shared`] cursors are atomics contended by several producers (or consumers), advanced
//!   with a compare-and-swap. Losing the race hands back the index that won.
//! - `usize` cursors are owned by a single thread and advanced with a plain store, so the
//!   retry path of the claim protocol disappears at compile time.

use crate::variant::sync::atomic::{AtomicUsize, Ordering};

/// A cursor over the logical indices of a ring.
pub(crate) trait Cursor {
    /// The next logical index to claim.
    fn position(&self) -> usize;

    /// Advances the cursor from `index` to `index + 1`.
    ///
    /// Returns the current position if another thread moved the cursor first.
    fn advance(&mut self, index: usize) -> Result<(), usize>;
}

impl Cursor for usize {
    #[inline]
    fn position(&self) -> usize {
        *self
    }

    #[inline]
    fn advance(&mut self, index: usize) -> Result<(), usize> {
        *self = index.wrapping_add(1);
        Ok(())
    }
}

/// A cursor shared between threads.
///
/// Both the load and the CAS are relaxed: the payload hand-over is ordered by the slot tags
/// alone.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Shared<'a>(pub(crate) &'a AtomicUsize);

impl Cursor for Shared<'_> {
    #[inline]
    fn position(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    fn advance(&mut self, index: usize) -> Result<(), usize> {
        self.0
            .compare_exchange_weak(
                index,
                index.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .map(|_| ())
    }
}
