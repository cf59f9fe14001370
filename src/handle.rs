//! Scoped reader and writer handles.
//!
//! A handle registers a producer or consumer with its queue for as long as it lives:
//!
//! - dropping the last [`Writer`] closes the queue, which is how readers learn that no more
//!   items are coming without any out-of-band signal;
//! - dropping a [`Reader`] only deregisters it.
//!
//! Handles borrow their queue, so they can never outlive it. Their methods take `&mut self`:
//! a handle is used by one thread at a time, which is what lets the single-ended queues
//! advance their cursors with plain stores.
//!
//! Leaking a handle (e.g. with [`std::mem::forget`]) never corrupts its queue. A leaked
//! writer simply never closes it, and a leaked reader or writer of a single-ended queue
//! keeps its seat.

use crate::backoff::Backoff;
use crate::variant::cell::UnsafeCell;
use crate::variant::sync::atomic::{AtomicBool, Ordering};

use std::fmt;

pub(crate) mod sealed {
    // Reachable as the supertrait of `Endpoint`, but not nameable from outside the crate.
    #[allow(unreachable_pub)]
    pub trait Sealed {}
}

/// A queue that can be driven through [`Reader`] and [`Writer`] handles.
///
/// Implemented by [`BoundedQueue`], [`SpscQueue`] and [`UnboundedQueue`]. This trait is
/// sealed: its methods are the private interface between a queue and its handles.
///
/// The single-ended queues keep the cursor of each side inside the queue, next to the seat
/// that grants it. A handle holding the seat works on that cursor in place, so the queue
/// always knows the current position of its reader and writer, even when a handle is
/// leaked instead of dropped.
///
/// [`BoundedQueue`]: crate::BoundedQueue
/// [`SpscQueue`]: crate::SpscQueue
/// [`UnboundedQueue`]: crate::UnboundedQueue
pub trait Endpoint: sealed::Sealed {
    /// The type of the items carried by the queue.
    type Item;

    /// Pushes on behalf of the attached writer.
    ///
    /// # Safety
    ///
    /// The caller must be a live writer of this queue, and must not run this concurrently
    /// with another call made on behalf of the same writer.
    #[doc(hidden)]
    unsafe fn push_with(&self, item: Self::Item) -> Result<(), Self::Item>;

    /// Pops on behalf of the attached reader.
    ///
    /// # Safety
    ///
    /// The caller must be a live reader of this queue, and must not run this concurrently
    /// with another call made on behalf of the same reader.
    #[doc(hidden)]
    unsafe fn pop_with(&self) -> Option<Self::Item>;

    /// Liveness as seen by the attached reader.
    ///
    /// # Safety
    ///
    /// The caller must be a live reader of this queue, and must not run this concurrently
    /// with [`Endpoint::pop_with`] on behalf of the same reader.
    #[doc(hidden)]
    unsafe fn is_live_with(&self) -> bool;

    /// Deregisters a writer.
    ///
    /// # Safety
    ///
    /// Called at most once per attached writer, from its drop.
    #[doc(hidden)]
    unsafe fn detach_writer(&self);

    /// Deregisters a reader.
    ///
    /// # Safety
    ///
    /// Called at most once per attached reader, from its drop.
    #[doc(hidden)]
    unsafe fn detach_reader(&self);
}

/// The producer side of a queue.
///
/// Obtained from the `writer` method of a queue. Dropping the last writer of a queue closes
/// it.
///
/// # Examples
///
/// ```
/// use lf_ring::SpscQueue;
///
/// let queue = SpscQueue::new(2);
///
/// {
///     let mut writer = queue.writer()?;
///     writer.try_push(1).unwrap();
///     writer.try_push(2).unwrap();
///     assert_eq!(writer.try_push(3), Err(3));
/// }
///
/// assert!(queue.is_closed());
/// # Ok::<(), lf_ring::AcquireError>(())
/// ```
pub struct Writer<'q, Q: Endpoint> {
    queue: &'q Q,
}

impl<'q, Q: Endpoint> Writer<'q, Q> {
    /// Wraps a registration the queue has already granted.
    pub(crate) fn attached(queue: &'q Q) -> Self {
        Self { queue }
    }

    /// Pushes `item` if there is room for it right now, handing it back otherwise.
    ///
    /// Never blocks. A failure means the queue was full or another producer got the slot
    /// first; the two are not told apart.
    #[inline]
    pub fn try_push(&mut self, item: Q::Item) -> Result<(), Q::Item> {
        unsafe { self.queue.push_with(item) }
    }

    /// Pushes `item`, spinning then yielding until there is room.
    ///
    /// There is no timeout: on a queue whose readers stopped consuming this never returns.
    /// Use [`Writer::try_push`] to bound the wait.
    pub fn push(&mut self, mut item: Q::Item) {
        let backoff = Backoff::new();

        loop {
            match self.try_push(item) {
                Ok(()) => return,
                Err(rejected) => item = rejected,
            }
            backoff.snooze();
        }
    }
}

impl<Q: Endpoint> Drop for Writer<'_, Q> {
    fn drop(&mut self) {
        unsafe { self.queue.detach_writer() }
    }
}

impl<Q: Endpoint> fmt::Debug for Writer<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer").finish_non_exhaustive()
    }
}

/// The consumer side of a queue.
///
/// Obtained from the `reader` method of a queue. A reader keeps returning items after the
/// queue has been closed until everything pushed before has been consumed; only then does
/// [`Reader::is_live`] turn `false`.
///
/// Iterating over a reader pops items until the queue is closed and drained.
///
/// # Examples
///
/// ```
/// use lf_ring::UnboundedQueue;
/// use std::thread;
///
/// let queue = UnboundedQueue::<u64>::new();
///
/// let sum: u64 = thread::scope(|s| {
///     let mut writer = queue.writer().unwrap();
///     s.spawn(move || {
///         for i in 1..=100 {
///             writer.push(i);
///         }
///     });
///
///     queue.reader().unwrap().sum()
/// });
///
/// assert_eq!(sum, 5050);
/// ```
pub struct Reader<'q, Q: Endpoint> {
    queue: &'q Q,
}

impl<'q, Q: Endpoint> Reader<'q, Q> {
    /// Wraps a registration the queue has already granted.
    pub(crate) fn attached(queue: &'q Q) -> Self {
        Self { queue }
    }

    /// Pops the next item if one has been published.
    ///
    /// Never blocks. `None` means nothing was available at this instant; it does not mean
    /// the queue is finished, see [`Reader::is_live`].
    #[inline]
    pub fn try_pop(&mut self) -> Option<Q::Item> {
        unsafe { self.queue.pop_with() }
    }

    /// Pops the next item, spinning then yielding while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&mut self) -> Option<Q::Item> {
        let backoff = Backoff::new();

        loop {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if !self.is_live() {
                // Anything published before the close is visible by now.
                return self.try_pop();
            }
            backoff.snooze();
        }
    }

    /// Returns `false` once the queue is closed and there is nothing left to read.
    #[inline]
    pub fn is_live(&self) -> bool {
        unsafe { self.queue.is_live_with() }
    }
}

impl<Q: Endpoint> Iterator for Reader<'_, Q> {
    type Item = Q::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop()
    }
}

impl<Q: Endpoint> Drop for Reader<'_, Q> {
    fn drop(&mut self) {
        unsafe { self.queue.detach_reader() }
    }
}

impl<Q: Endpoint> fmt::Debug for Reader<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("is_live", &self.is_live())
            .finish_non_exhaustive()
    }
}

/// The single seat of a single-ended queue side, with the cursor of that side.
///
/// Taking the seat is a CAS from free to taken, so at most one handle works on the cursor
/// at any time. The cursor never leaves the seat: the occupant updates it in place, and the
/// acquire on [`Registration::acquire`] pairs with the release on [`Registration::release`]
/// so that the next occupant sees the position left by the previous one.
///
/// A handle leaked while holding the seat keeps it taken forever, but the cursor stays
/// current, so the queue can still tear itself down from it.
pub(crate) struct Registration<C> {
    taken: AtomicBool,
    cursor: UnsafeCell<C>,
}

// The cursor is only accessed by the holder of the seat, or through `&mut` to the queue.
unsafe impl<C: Send> Sync for Registration<C> {}

impl<C> Registration<C> {
    pub(crate) fn new(cursor: C) -> Self {
        Self {
            taken: AtomicBool::new(false),
            cursor: UnsafeCell::new(cursor),
        }
    }

    /// Takes the seat. Returns `false` if it is already taken.
    pub(crate) fn acquire(&self) -> bool {
        self.taken
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Frees the seat, publishing the cursor to the next occupant.
    pub(crate) fn release(&self) {
        self.taken.store(false, Ordering::Release);
    }

    pub(crate) fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Relaxed)
    }

    /// Gives mutable access to the cursor.
    ///
    /// # Safety
    ///
    /// The caller must hold the seat, or have exclusive access to the queue, and no other
    /// access to the cursor may be in progress.
    pub(crate) unsafe fn with_cursor<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        self.cursor.with_mut(|p| f(unsafe { &mut *p }))
    }

    /// Gives shared access to the cursor.
    ///
    /// # Safety
    ///
    /// The caller must hold the seat, or have exclusive access to the queue, and no mutable
    /// access to the cursor may be in progress.
    pub(crate) unsafe fn read_cursor<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        self.cursor.with(|p| f(unsafe { &*p }))
    }
}
