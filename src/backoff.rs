//! Spin-then-yield waiting used by the blocking `push`/`pop` wrappers.
//!
//! Each step of [`Backoff::snooze`] busy-spins twice as long as the previous one until
//! [`SPIN_LIMIT`] steps have been taken; from then on every call yields the current thread
//! to the OS scheduler instead. `try_*` operations never go through here: they never
//! suspend.

use crate::variant::{hint, thread};

use std::cell::Cell;
use std::fmt;

/// Number of doubling spin steps before [`Backoff::snooze`] starts yielding.
const SPIN_LIMIT: u32 = 6;

/// Performs exponential spinning followed by thread yields.
///
/// There is no upper bound on the number of yields: a caller looping on a queue that never
/// makes progress (a permanently full ring in `push`) keeps burning CPU. Callers that need a
/// bounded wait loop over `try_push`/`try_pop` themselves and stop when they see fit,
/// typically once [`Backoff::is_completed`] reports that spinning is no longer useful.
///
/// # Examples
///
/// ```
/// use lf_ring::{Backoff, BoundedQueue};
///
/// let queue = BoundedQueue::<u32>::new(1);
/// queue.push(1);
///
/// // Give up once spinning stopped paying off instead of yielding forever.
/// let backoff = Backoff::new();
/// let mut item = 2;
/// while let Err(rejected) = queue.try_push(item) {
///     if backoff.is_completed() {
///         break;
///     }
///     item = rejected;
///     backoff.snooze();
/// }
///
/// assert_eq!(queue.try_pop(), Some(1));
/// assert_eq!(queue.try_pop(), None);
/// ```
pub struct Backoff {
    step: Cell<u32>,
}

impl Backoff {
    /// Creates a new `Backoff`.
    #[inline]
    pub fn new() -> Self {
        Self { step: Cell::new(0) }
    }

    /// Resets the backoff state.
    #[inline]
    pub fn reset(&self) {
        self.step.set(0);
    }

    /// Busy-spins for the current step without ever yielding.
    ///
    /// Meant for retrying after another thread made progress, e.g. a lost CAS.
    #[inline]
    pub fn spin(&self) {
        for _ in 0..1u32 << self.step.get().min(SPIN_LIMIT) {
            hint::spin_loop();
        }

        if self.step.get() <= SPIN_LIMIT {
            self.step.set(self.step.get() + 1);
        }
    }

    /// Spins while the step is below [`SPIN_LIMIT`], then yields the thread.
    ///
    /// Meant for waiting on another thread, e.g. a full or empty ring.
    #[inline]
    pub fn snooze(&self) {
        if self.step.get() <= SPIN_LIMIT {
            for _ in 0..1u32 << self.step.get() {
                hint::spin_loop();
            }
            self.step.set(self.step.get() + 1);
        } else {
            thread::yield_now();
        }
    }

    /// Returns `true` once spinning has stopped and [`Backoff::snooze`] yields.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step.get() > SPIN_LIMIT
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("step", &self.step.get())
            .field("is_completed", &self.is_completed())
            .finish()
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
