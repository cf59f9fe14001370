//! A lock-free bounded multi-producer multi-consumer queue.

use crate::backoff::Backoff;
use crate::cache_pad::CachePad;
use crate::cursor::Shared;
use crate::diag::{self, QueueState};
use crate::handle::{sealed, Endpoint, Reader, Writer};
use crate::ring::RawRing;
use crate::tag::{Epoch, TagWidth};
use crate::variant::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use std::fmt;

/// A lock-free bounded multi-producer multi-consumer queue.
///
/// The queue is a ring of `capacity` slots allocated once. Producers and consumers claim
/// logical indices by advancing a shared cursor with a compare-and-swap, and every slot
/// carries an epoch tag of width `W` telling which lap around the ring it currently serves.
/// A thread acting on an outdated index sees a tag from a later lap and retries, so a slot
/// that wrapped around is never mistaken for the one it was (ABA).
///
/// Any number of [`Writer`]s and [`Reader`]s may be attached at the same time, and the queue
/// may also be used directly through [`BoundedQueue::try_push`], [`BoundedQueue::push`] and
/// [`BoundedQueue::try_pop`]. When the last writer is dropped the queue is closed: readers
/// keep draining it and then observe that it is no longer live.
///
/// # Examples
///
/// ```
/// use lf_ring::BoundedQueue;
///
/// let queue = BoundedQueue::<_>::new(4);
///
/// for i in 1..=4 {
///     assert!(queue.try_push(i).is_ok());
/// }
/// assert_eq!(queue.try_push(5), Err(5));
///
/// for i in 1..=4 {
///     assert_eq!(queue.try_pop(), Some(i));
/// }
/// assert!(queue.try_push(5).is_ok());
/// ```
///
/// Multi Producer - Multi Consumer, with handles:
///
/// ```
/// use lf_ring::BoundedQueue;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::thread;
///
/// const COUNT: usize = 1_000;
/// const CONCURRENCY: usize = 4;
///
/// let queue = BoundedQueue::<_>::new(64);
/// let sum = AtomicUsize::new(0);
///
/// thread::scope(|s| {
///     // Attach every writer up front: the queue closes as soon as the live count drops to 0.
///     let writers: Vec<_> = (0..CONCURRENCY).map(|_| queue.writer()).collect();
///     for mut writer in writers {
///         s.spawn(move || {
///             for i in 0..COUNT {
///                 writer.push(i);
///             }
///         });
///     }
///
///     for _ in 0..CONCURRENCY {
///         let reader = queue.reader();
///         let sum = &sum;
///         s.spawn(move || {
///             for i in reader {
///                 sum.fetch_add(i, Ordering::Relaxed);
///             }
///         });
///     }
/// });
///
/// assert_eq!(sum.into_inner(), CONCURRENCY * COUNT * (COUNT - 1) / 2);
/// assert!(!queue.is_live());
/// ```
pub struct BoundedQueue<T, W: TagWidth = usize> {
    ring: RawRing<T, Epoch<W>>,

    /// Next logical index to write.
    write_to: CachePad<AtomicUsize>,

    /// Next logical index to read.
    read_from: CachePad<AtomicUsize>,

    active: CachePad<AtomicBool>,
    readers: CachePad<AtomicUsize>,
    writers: CachePad<AtomicUsize>,
}

impl<T, W: TagWidth> BoundedQueue<T, W> {
    /// Creates a new [`BoundedQueue`] holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use lf_ring::BoundedQueue;
    ///
    /// // Epoch tags of 16 bits instead of a full word.
    /// let queue = BoundedQueue::<usize, u16>::new(1024);
    /// assert_eq!(queue.capacity(), 1024);
    /// ```
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be non-zero");

        Self {
            ring: RawRing::new(capacity),
            write_to: CachePad::new(AtomicUsize::new(0)),
            read_from: CachePad::new(AtomicUsize::new(0)),
            active: CachePad::new(AtomicBool::new(true)),
            readers: CachePad::new(AtomicUsize::new(0)),
            writers: CachePad::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Pushes `item` if a slot is free, handing it back otherwise.
    ///
    /// Never blocks: a full queue fails right away. Returning `Ok` is the point at which the
    /// item becomes part of the queue; it will be popped exactly once.
    #[inline]
    pub fn try_push(&self, item: T) -> Result<(), T> {
        // Epoch tags make the claim protocol safe with a shared cursor.
        unsafe { self.ring.try_push(&mut Shared(&*self.write_to), item) }
    }

    /// Pushes `item`, spinning then yielding until a slot is free.
    ///
    /// There is no timeout: if consumers stop, this never returns. Use
    /// [`BoundedQueue::try_push`] to bound the wait.
    pub fn push(&self, mut item: T) {
        let backoff = Backoff::new();

        loop {
            match self.try_push(item) {
                Ok(()) => return,
                Err(rejected) => item = rejected,
            }
            backoff.snooze();
        }
    }

    /// Pops the oldest published item, if any.
    ///
    /// Never blocks. Items from different producers come out in the order their producers
    /// claimed their slots.
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        unsafe { self.ring.try_pop(&mut Shared(&*self.read_from)) }
    }

    /// Closes the queue.
    ///
    /// Operations in flight complete normally and items already pushed can still be popped.
    /// Dropping the last [`Writer`] calls this.
    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Returns `true` once the queue has been closed.
    pub fn is_closed(&self) -> bool {
        !self.active.load(Ordering::Acquire)
    }

    /// Returns `true` while the queue is open or still holds claimed items.
    ///
    /// Consumers use it to decide whether to keep polling after a failed
    /// [`BoundedQueue::try_pop`].
    pub fn is_live(&self) -> bool {
        self.active.load(Ordering::Acquire)
            || self.write_to.load(Ordering::Acquire) != self.read_from.load(Ordering::Acquire)
    }

    /// Attaches a new [`Reader`]. Any number of readers may be attached.
    pub fn reader(&self) -> Reader<'_, Self> {
        let _ = self.readers.fetch_add(1, Ordering::Relaxed);
        Reader::attached(self)
    }

    /// Attaches a new [`Writer`]. Any number of writers may be attached; dropping the last
    /// one closes the queue.
    ///
    /// Attaching a writer to a closed queue does not reopen it.
    pub fn writer(&self) -> Writer<'_, Self> {
        let _ = self.writers.fetch_add(1, Ordering::Relaxed);
        Writer::attached(self)
    }

    /// Returns an advisory snapshot of the cursors and registrations.
    pub fn state(&self) -> QueueState {
        let read_from = self.read_from.load(Ordering::Acquire);
        let write_to = self.write_to.load(Ordering::Acquire);

        QueueState {
            read_from: Some(read_from),
            write_to: Some(write_to),
            len_hint: Some(write_to.saturating_sub(read_from)),
            closed: self.is_closed(),
            readers: self.readers.load(Ordering::Relaxed),
            writers: self.writers.load(Ordering::Relaxed),
        }
    }

    /// Emits [`BoundedQueue::state`] as a `debug` tracing event.
    pub fn trace_state(&self) {
        diag::trace_state("bounded", &self.state());
    }

    /// Emits one `trace` event per occupied slot, with its position, tag and item.
    ///
    /// Requires exclusive access, so no handle can be alive while the ring is dumped.
    pub fn debug_ring(&mut self)
    where
        T: fmt::Debug,
    {
        // `&mut self`: no operation is in flight.
        unsafe {
            self.ring.for_each_occupied(|position, tag, item| {
                tracing::trace!(queue = "bounded", position, tag, ?item, "occupied slot");
            });
        }
    }
}

impl<T, W: TagWidth> sealed::Sealed for BoundedQueue<T, W> {}

impl<T, W: TagWidth> Endpoint for BoundedQueue<T, W> {
    type Item = T;

    #[inline]
    unsafe fn push_with(&self, item: T) -> Result<(), T> {
        self.try_push(item)
    }

    #[inline]
    unsafe fn pop_with(&self) -> Option<T> {
        self.try_pop()
    }

    #[inline]
    unsafe fn is_live_with(&self) -> bool {
        self.is_live()
    }

    unsafe fn detach_writer(&self) {
        if self.writers.fetch_sub(1, Ordering::AcqRel) == 1 {
            tracing::trace!(queue = "bounded", "last writer detached, closing");
            self.close();
        }
    }

    unsafe fn detach_reader(&self) {
        let _ = self.readers.fetch_sub(1, Ordering::Relaxed);
    }
}

impl<T, W: TagWidth> fmt::Debug for BoundedQueue<T, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity())
            .field("state", &self.state())
            .finish()
    }
}
