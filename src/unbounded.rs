//! An unbounded single-producer single-consumer queue made of chained blocks.
//!
//! The writer fills the block it holds, then links a new one as its `next` and moves on; the
//! reader drains its block, follows `next` and retires the drained block. Retired blocks are
//! offered to a small recycler (itself an SPSC ring, fed by the reader and consumed by the
//! writer) so that a steady stream of items does not allocate; blocks that do not fit in
//! the recycler are freed.
//!
//! ```txt
//!  reader                                writer
//!    |                                     |
//!  [x x . .] -next-> [. . . .] -next-> [. . ? ?]
//!                                          ^ chunk_size slots per block
//!
//!  recycler: [B B . .]  (reader pushes drained blocks, writer pops fresh ones)
//! ```

use crate::block::BlockPtr;
use crate::cache_pad::CachePad;
use crate::config::UnboundedConfig;
use crate::diag::{self, QueueState};
use crate::error::AcquireError;
use crate::handle::{sealed, Endpoint, Reader, Registration, Writer};
use crate::ring::RawRing;
use crate::tag::Filled;
use crate::variant::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use std::fmt;
use std::ptr;

/// The state of the writer of an [`UnboundedQueue`].
pub(crate) struct WriteCursor<T> {
    block: BlockPtr<T>,
    index: usize,
    /// Consumer cursor of the recycler.
    recycled: usize,
}

/// The state of the reader of an [`UnboundedQueue`].
pub(crate) struct ReadCursor<T> {
    block: BlockPtr<T>,
    index: usize,
    /// Producer cursor of the recycler.
    retired: usize,
}

impl<T> Clone for WriteCursor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for WriteCursor<T> {}

impl<T> Clone for ReadCursor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ReadCursor<T> {}

impl<T> fmt::Debug for WriteCursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteCursor")
            .field("block", &self.block)
            .field("index", &self.index)
            .field("recycled", &self.recycled)
            .finish()
    }
}

impl<T> fmt::Debug for ReadCursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadCursor")
            .field("block", &self.block)
            .field("index", &self.index)
            .field("retired", &self.retired)
            .finish()
    }
}

/// An unbounded single-producer single-consumer queue.
///
/// Pushing never fails: when the current block is full a new one is linked, taken from the
/// recycler when possible and allocated otherwise. Items are never moved once pushed.
///
/// As with [`SpscQueue`], at most one [`Writer`] and one [`Reader`] are attached at any
/// time and dropping the writer closes the queue.
///
/// # Examples
///
/// ```
/// use lf_ring::{UnboundedConfig, UnboundedQueue};
///
/// let queue = UnboundedQueue::with_config(UnboundedConfig::new().chunk_size(2).free_blocks(1));
///
/// let mut writer = queue.writer()?;
/// for i in 1..=10 {
///     writer.push(i);
/// }
/// drop(writer);
/// assert_eq!(queue.block_count(), 5);
///
/// let reader = queue.reader()?;
/// assert!(reader.eq(1..=10));
/// # Ok::<(), lf_ring::AcquireError>(())
/// ```
///
/// [`SpscQueue`]: crate::SpscQueue
pub struct UnboundedQueue<T> {
    chunk_size: usize,

    /// Drained blocks kept for reuse, `None` when recycling is disabled.
    free_blocks: Option<RawRing<BlockPtr<T>, Filled>>,

    /// Blocks currently allocated, including the recycled ones.
    blocks: CachePad<AtomicUsize>,

    active: CachePad<AtomicBool>,
    reader: CachePad<Registration<ReadCursor<T>>>,
    writer: CachePad<Registration<WriteCursor<T>>>,
}

impl<T> UnboundedQueue<T> {
    /// Creates a new [`UnboundedQueue`] with the default [`UnboundedConfig`].
    pub fn new() -> Self {
        Self::with_config(UnboundedConfig::new())
    }

    /// Creates a new [`UnboundedQueue`] keeping up to `free_blocks` drained blocks for reuse.
    pub fn with_pool_size(free_blocks: usize) -> Self {
        Self::with_config(UnboundedConfig::new().free_blocks(free_blocks))
    }

    /// Creates a new [`UnboundedQueue`] from `config`.
    pub fn with_config(config: UnboundedConfig) -> Self {
        let first = BlockPtr::alloc(config.chunk_size);

        Self {
            chunk_size: config.chunk_size,
            free_blocks: (config.free_blocks > 0).then(|| RawRing::new(config.free_blocks)),
            blocks: CachePad::new(AtomicUsize::new(1)),
            active: CachePad::new(AtomicBool::new(true)),
            reader: CachePad::new(Registration::new(ReadCursor {
                block: first,
                index: 0,
                retired: 0,
            })),
            writer: CachePad::new(Registration::new(WriteCursor {
                block: first,
                index: 0,
                recycled: 0,
            })),
        }
    }

    /// Returns the number of slots per block.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the number of blocks currently allocated, recycled ones included.
    pub fn block_count(&self) -> usize {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Attaches the [`Reader`] of this queue.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::TooManyReaders`] if a reader is already attached.
    pub fn reader(&self) -> Result<Reader<'_, Self>, AcquireError> {
        if self.reader.acquire() {
            Ok(Reader::attached(self))
        } else {
            tracing::debug!(queue = "unbounded", "reader already attached");
            Err(AcquireError::TooManyReaders)
        }
    }

    /// Attaches the [`Writer`] of this queue.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::TooManyWriters`] if a writer is already attached.
    pub fn writer(&self) -> Result<Writer<'_, Self>, AcquireError> {
        if self.writer.acquire() {
            Ok(Writer::attached(self))
        } else {
            tracing::debug!(queue = "unbounded", "writer already attached");
            Err(AcquireError::TooManyWriters)
        }
    }

    /// Closes the queue. The reader still drains what was pushed before.
    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Returns `true` once the queue has been closed.
    pub fn is_closed(&self) -> bool {
        !self.active.load(Ordering::Acquire)
    }

    /// Returns an advisory snapshot of the queue.
    ///
    /// The length is not reported: counting it would walk blocks the reader may be freeing.
    pub fn state(&self) -> QueueState {
        QueueState {
            read_from: None,
            write_to: None,
            len_hint: None,
            closed: self.is_closed(),
            readers: usize::from(self.reader.is_taken()),
            writers: usize::from(self.writer.is_taken()),
        }
    }

    /// Emits [`UnboundedQueue::state`] as a `debug` tracing event.
    pub fn trace_state(&self) {
        diag::trace_state("unbounded", &self.state());
        tracing::debug!(queue = "unbounded", blocks = self.block_count(), "block usage");
    }

    /// Emits one `trace` event per filled slot, from the oldest block to the newest.
    pub fn debug_ring(&mut self)
    where
        T: fmt::Debug,
    {
        // `&mut self`: no handle is in use and both cursors are current.
        let read = unsafe { self.reader.with_cursor(|cursor| *cursor) };
        let write = unsafe { self.writer.with_cursor(|cursor| *cursor) };
        tracing::trace!(queue = "unbounded", reader = ?read, writer = ?write, "cursors");

        let mut block = Some(read.block);
        let mut position = 0;

        while let Some(current) = block {
            let current = unsafe { current.get() };
            unsafe {
                current.cells.for_each_occupied(|index, _, item| {
                    tracing::trace!(queue = "unbounded", position, index, ?item, "filled slot");
                });
            }
            block = BlockPtr::from_raw(current.next.load(Ordering::Acquire));
            position += 1;
        }
    }

    /// Returns a block for the writer to move to.
    ///
    /// # Safety
    ///
    /// `recycled` must be the recycler cursor of the writer seat holder.
    unsafe fn next_block(&self, recycled: &mut usize) -> BlockPtr<T> {
        if let Some(pool) = &self.free_blocks {
            // The writer seat makes `recycled` the only consumer cursor of the recycler.
            if let Some(block) = unsafe { pool.try_pop(recycled) } {
                tracing::trace!(queue = "unbounded", "block reused");
                return block;
            }
        }

        let _ = self.blocks.fetch_add(1, Ordering::Relaxed);
        BlockPtr::alloc(self.chunk_size)
    }

    /// Hands a drained block to the recycler, or frees it.
    ///
    /// # Safety
    ///
    /// The reader must own `block` and must not use it afterwards.
    unsafe fn retire(&self, block: BlockPtr<T>, retired: &mut usize) {
        let rejected = match &self.free_blocks {
            // The reader seat makes `retired` the only producer cursor of the recycler.
            Some(pool) => unsafe { pool.try_push(retired, block) }.err(),
            None => Some(block),
        };

        match rejected {
            Some(block) => {
                let _ = self.blocks.fetch_sub(1, Ordering::Relaxed);
                unsafe { block.free() };
            }
            None => tracing::trace!(queue = "unbounded", "block recycled"),
        }
    }

    /// Pushes at the writer cursor, linking a new block when the current one is full.
    ///
    /// # Safety
    ///
    /// `cursor` must be the writer cursor of this queue, accessed by the seat holder.
    unsafe fn push_at(&self, cursor: &mut WriteCursor<T>, item: T) -> Result<(), T> {
        if cursor.index >= self.chunk_size {
            let next = unsafe { self.next_block(&mut cursor.recycled) };
            // The writer owns its block until it links the next one.
            let block = unsafe { cursor.block.get() };
            block.next.store(next.as_ptr(), Ordering::Release);

            cursor.block = next;
            cursor.index = 0;
        }

        // `cursor.index` is the only producer cursor of the block.
        unsafe { cursor.block.get().cells.try_push(&mut cursor.index, item) }
    }

    /// Pops at the reader cursor, retiring the current block once it is drained.
    ///
    /// # Safety
    ///
    /// `cursor` must be the reader cursor of this queue, accessed by the seat holder.
    unsafe fn pop_at(&self, cursor: &mut ReadCursor<T>) -> Option<T> {
        if cursor.index >= self.chunk_size {
            let block = unsafe { cursor.block.get() };
            let next = BlockPtr::from_raw(block.next.load(Ordering::Acquire))?;

            // The recycler hand-over publishes the reset link to the writer.
            block.next.store(ptr::null_mut(), Ordering::Relaxed);
            unsafe { self.retire(cursor.block, &mut cursor.retired) };

            cursor.block = next;
            cursor.index = 0;
        }

        // `cursor.index` is the only consumer cursor of the block.
        unsafe { cursor.block.get().cells.try_pop(&mut cursor.index) }
    }

    /// Whether the slot after `cursor` holds no published item, across block boundaries.
    fn is_empty_at(&self, cursor: &ReadCursor<T>) -> bool {
        // The reader owns its block until it retires it.
        let block = unsafe { cursor.block.get() };

        if cursor.index < self.chunk_size {
            return !block.cells.is_ready(cursor.index);
        }

        match BlockPtr::from_raw(block.next.load(Ordering::Acquire)) {
            // A linked block stays alive until this reader retires it.
            Some(next) => !unsafe { next.get() }.cells.is_ready(0),
            None => true,
        }
    }
}

impl<T> Default for UnboundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> sealed::Sealed for UnboundedQueue<T> {}

impl<T> Endpoint for UnboundedQueue<T> {
    type Item = T;

    unsafe fn push_with(&self, item: T) -> Result<(), T> {
        unsafe { self.writer.with_cursor(|cursor| self.push_at(cursor, item)) }
    }

    unsafe fn pop_with(&self) -> Option<T> {
        unsafe { self.reader.with_cursor(|cursor| self.pop_at(cursor)) }
    }

    unsafe fn is_live_with(&self) -> bool {
        !self.is_closed()
            || !unsafe { self.reader.read_cursor(|cursor| self.is_empty_at(cursor)) }
    }

    unsafe fn detach_writer(&self) {
        tracing::trace!(queue = "unbounded", "writer detached, closing");
        self.close();
        self.writer.release();
    }

    unsafe fn detach_reader(&self) {
        self.reader.release();
    }
}

impl<T> Drop for UnboundedQueue<T> {
    fn drop(&mut self) {
        // `&mut self`: no handle is in use, and the cursors are current even for handles that
        // were leaked instead of dropped.
        let read_block = unsafe { self.reader.with_cursor(|cursor| cursor.block) };
        let recycled = unsafe { self.writer.with_cursor(|cursor| cursor.recycled) };

        let mut block = Some(read_block);
        while let Some(current) = block {
            block = BlockPtr::from_raw(unsafe { current.get() }.next.load(Ordering::Acquire));
            unsafe { current.free() };
        }

        if let Some(pool) = &self.free_blocks {
            let mut recycled = recycled;
            while let Some(free) = unsafe { pool.try_pop(&mut recycled) } {
                unsafe { free.free() };
            }
        }
    }
}

impl<T> fmt::Debug for UnboundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnboundedQueue")
            .field("chunk_size", &self.chunk_size)
            .field("blocks", &self.block_count())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn cursors_report_recycler_positions() {
        let mut queue =
            UnboundedQueue::with_config(UnboundedConfig::new().chunk_size(2).free_blocks(1));

        {
            let mut writer = queue.writer().unwrap();
            let mut reader = queue.reader().unwrap();
            for i in 0..3 {
                writer.push(i);
            }
            for i in 0..3 {
                assert_eq!(reader.try_pop(), Some(i));
            }
            // The third push linked a fresh block; the fifth takes the retired one back.
            writer.push(3);
            writer.push(4);
        }

        let read = unsafe { queue.reader.with_cursor(|cursor| *cursor) };
        let write = unsafe { queue.writer.with_cursor(|cursor| *cursor) };
        assert!(format!("{:?}", read).ends_with("index: 1, retired: 1 }"));
        assert!(format!("{:?}", write).ends_with("index: 1, recycled: 1 }"));
        assert_eq!(queue.block_count(), 2);

        queue.debug_ring();
    }
}
