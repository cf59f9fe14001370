//! Holds a chunk of [`Slot`]s of the [`UnboundedQueue`].
//!
//! Blocks form a singly linked list: the writer appends blocks through [`Block::next`] and
//! the reader retires them once drained. A block is either in the list, parked in the
//! recycler, or freed; it is never in two of those places at once.
//!
//! [`Slot`]: crate::slot::Slot
//! [`UnboundedQueue`]: crate::UnboundedQueue

use crate::cache_pad::CachePad;
use crate::ring::RawRing;
use crate::tag::Filled;
use crate::variant::sync::atomic::AtomicPtr;

use std::fmt;
use std::ptr::{self, NonNull};

/// Holds a chunk of slots.
pub(crate) struct Block<T> {
    /// A pointer to the next [`Block`] of the queue, null until the writer links one.
    pub(crate) next: AtomicPtr<CachePad<Block<T>>>,

    /// Filled once from index 0 to the chunk size, then drained in the same order.
    pub(crate) cells: RawRing<T, Filled>,
}

/// An owning pointer to a heap allocated [`Block`].
///
/// Ownership is tracked by hand: whoever holds the pointer in its cursor, in a `next` link
/// or in the recycler owns the block.
pub(crate) struct BlockPtr<T>(NonNull<CachePad<Block<T>>>);

// A block only moves between the writer, the reader and the recycler.
unsafe impl<T: Send> Send for BlockPtr<T> {}

impl<T> BlockPtr<T> {
    /// Allocates an empty block of `chunk_size` slots.
    pub(crate) fn alloc(chunk_size: usize) -> Self {
        let block = Box::new(CachePad::new(Block {
            next: AtomicPtr::new(ptr::null_mut()),
            cells: RawRing::new(chunk_size),
        }));
        tracing::trace!(chunk_size, "block allocated");

        Self(NonNull::from(Box::leak(block)))
    }

    /// Frees the block, dropping any item still in it.
    ///
    /// # Safety
    ///
    /// The caller must own the block and the pointer must not be used afterwards.
    pub(crate) unsafe fn free(self) {
        drop(unsafe { Box::from_raw(self.0.as_ptr()) });
        tracing::trace!("block freed");
    }

    /// Borrows the block.
    ///
    /// # Safety
    ///
    /// The block must stay allocated for `'a`.
    #[inline]
    pub(crate) unsafe fn get<'a>(&self) -> &'a Block<T> {
        unsafe { &*self.0.as_ptr() }
    }

    pub(crate) fn as_ptr(&self) -> *mut CachePad<Block<T>> {
        self.0.as_ptr()
    }

    pub(crate) fn from_raw(ptr: *mut CachePad<Block<T>>) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }
}

impl<T> Clone for BlockPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BlockPtr<T> {}

impl<T> PartialEq for BlockPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for BlockPtr<T> {}

impl<T> fmt::Debug for BlockPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlockPtr").field(&self.0).finish()
    }
}
