//! A bounded single-producer single-consumer queue.

use crate::cache_pad::CachePad;
use crate::diag::{self, QueueState};
use crate::error::AcquireError;
use crate::handle::{sealed, Endpoint, Reader, Registration, Writer};
use crate::ring::RawRing;
use crate::tag::Filled;
use crate::variant::sync::atomic::{AtomicBool, Ordering};

use std::fmt;

/// Capacity of a queue built with [`SpscQueue::default`].
const DEFAULT_CAPACITY: usize = 2048;

/// A bounded single-producer single-consumer queue.
///
/// At most one [`Writer`] and one [`Reader`] are attached at any time. Each side has a
/// cursor nobody else touches, so advancing it is a plain increment. The only shared state
/// touched by both sides is the filled flag of each slot, which hands payloads over with
/// release/acquire ordering. Items come out in exactly the order they went in.
///
/// Dropping the writer closes the queue.
///
/// # Examples
///
/// ```
/// use lf_ring::{AcquireError, SpscQueue};
/// use std::thread;
///
/// let queue = SpscQueue::new(16);
///
/// thread::scope(|s| {
///     let mut writer = queue.writer().unwrap();
///     assert_eq!(queue.writer().unwrap_err(), AcquireError::TooManyWriters);
///
///     s.spawn(move || {
///         for i in 0..1_000 {
///             writer.push(i);
///         }
///     });
///
///     let reader = queue.reader().unwrap();
///     assert!(reader.eq(0..1_000));
/// });
/// ```
pub struct SpscQueue<T> {
    ring: RawRing<T, Filled>,
    active: CachePad<AtomicBool>,
    reader: CachePad<Registration<usize>>,
    writer: CachePad<Registration<usize>>,
}

impl<T> SpscQueue<T> {
    /// Creates a new [`SpscQueue`] holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be non-zero");

        Self {
            ring: RawRing::new(capacity),
            active: CachePad::new(AtomicBool::new(true)),
            reader: CachePad::new(Registration::new(0)),
            writer: CachePad::new(Registration::new(0)),
        }
    }

    /// Returns the number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Attaches the [`Reader`] of this queue.
    ///
    /// The new reader resumes where the previous one stopped, even if that one was leaked
    /// instead of dropped: the cursor lives in the queue.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::TooManyReaders`] if a reader is already attached.
    pub fn reader(&self) -> Result<Reader<'_, Self>, AcquireError> {
        if self.reader.acquire() {
            Ok(Reader::attached(self))
        } else {
            tracing::debug!(queue = "spsc", "reader already attached");
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
            tracing::debug!(queue = "spsc", "writer already attached");
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
    /// The cursors belong to the attached handles and are not reported; the length is counted
    /// from the slot flags.
    pub fn state(&self) -> QueueState {
        QueueState {
            read_from: None,
            write_to: None,
            len_hint: Some(self.ring.occupied()),
            closed: self.is_closed(),
            readers: usize::from(self.reader.is_taken()),
            writers: usize::from(self.writer.is_taken()),
        }
    }

    /// Emits [`SpscQueue::state`] as a `debug` tracing event.
    pub fn trace_state(&self) {
        diag::trace_state("spsc", &self.state());
    }

    /// Emits one `trace` event per filled slot, with its position and item.
    pub fn debug_ring(&mut self)
    where
        T: fmt::Debug,
    {
        // `&mut self`: no handle is alive.
        unsafe {
            self.ring.for_each_occupied(|position, _, item| {
                tracing::trace!(queue = "spsc", position, ?item, "filled slot");
            });
        }
    }
}

impl<T> Default for SpscQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T> sealed::Sealed for SpscQueue<T> {}

impl<T> Endpoint for SpscQueue<T> {
    type Item = T;

    #[inline]
    unsafe fn push_with(&self, item: T) -> Result<(), T> {
        // The writer seat makes its cursor the only producer cursor.
        unsafe { self.writer.with_cursor(|cursor| self.ring.try_push(cursor, item)) }
    }

    #[inline]
    unsafe fn pop_with(&self) -> Option<T> {
        // The reader seat makes its cursor the only consumer cursor.
        unsafe { self.reader.with_cursor(|cursor| self.ring.try_pop(cursor)) }
    }

    unsafe fn is_live_with(&self) -> bool {
        // Closed first: a close observed here was released after the writer's last push.
        !self.is_closed()
            || unsafe { self.reader.read_cursor(|cursor| self.ring.is_ready(*cursor)) }
    }

    unsafe fn detach_writer(&self) {
        tracing::trace!(queue = "spsc", "writer detached, closing");
        self.close();
        self.writer.release();
    }

    unsafe fn detach_reader(&self) {
        self.reader.release();
    }
}

impl<T> fmt::Debug for SpscQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscQueue")
            .field("capacity", &self.capacity())
            .field("state", &self.state())
            .finish()
    }
}
