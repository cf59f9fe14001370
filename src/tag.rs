//! Slot tags and the claim protocols built on top of them.
//!
//! Every [`Slot`] carries an atomic tag telling whether its payload may be written or read
//! at a given logical index. Two encodings exist:
//!
//! - [`Epoch`] (multi-producer multi-consumer): the tag counts laps around the ring. For
//!   a logical index `i` on a ring of `N` slots, let `epoch = i / N`:
//!
//!   ```txt
//!   tag == 2 * epoch       empty, writable by the producer claiming index i
//!   tag == 2 * epoch + 1   full, readable by the consumer claiming index i
//!   tag == 2 * epoch + 2   empty again, now belongs to index i + N
//!   ```
//!
//!   A producer or consumer holding a stale index observes a tag *ahead* of what it expects
//!   and retries from the current cursor instead of acting on a slot that wrapped around
//!   the ring (the ABA defense). Tags are compared by wrapping signed distance in the tag
//!   width `W`, so a narrow tag only misjudges a slot once a thread lags more than half the
//!   tag range behind in laps.
//!
//! - [`Filled`] (single-producer single-consumer): a boolean. With exactly one cursor on
//!   each side nobody can hold a stale index, so a "filled" flag is enough.
//!
//! [`Slot`]: crate::slot::Slot

#[cfg(target_has_atomic = "64")]
use crate::variant::sync::atomic::AtomicU64;
use crate::variant::sync::atomic::{
    AtomicBool, AtomicU16, AtomicU32, AtomicU8, AtomicUsize, Ordering,
};

use std::fmt;
use std::marker::PhantomData;

/// The outcome of inspecting a slot tag before claiming a logical index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    /// The slot is in the expected state for this index: the cursor may be advanced.
    Ready,
    /// The slot still belongs to an earlier operation: full on push, empty on pop.
    Blocked,
    /// The slot already moved past this index: the observed cursor is outdated.
    Stale,
}

/// An encoding of the slot states into an atomic tag.
pub(crate) trait Encoding {
    /// The atomic stored next to every payload.
    type Tag;

    /// The tag of a slot in a freshly created ring.
    fn initial() -> Self::Tag;

    /// Inspects `tag` on behalf of a producer about to claim `index`.
    fn push_claim(tag: &Self::Tag, index: usize, capacity: usize) -> Claim;

    /// Inspects `tag` on behalf of a consumer about to claim `index`.
    fn pop_claim(tag: &Self::Tag, index: usize, capacity: usize) -> Claim;

    /// Publishes the payload written for `index`.
    fn mark_full(tag: &Self::Tag, index: usize, capacity: usize);

    /// Hands the slot read for `index` back to producers.
    fn mark_empty(tag: &Self::Tag, index: usize, capacity: usize);

    /// Whether the slot holds a payload. Only meaningful without concurrent operations.
    fn holds_item(tag: &Self::Tag) -> bool;

    /// The raw tag value, for diagnostics.
    fn raw(tag: &Self::Tag) -> u64;
}

mod sealed {
    // Reachable as the supertrait of `TagWidth`, but not nameable from outside the crate.
    #[allow(unreachable_pub)]
    pub trait Sealed {}
}

/// An unsigned integer usable as the width of an epoch tag.
///
/// Implemented for `u8`, `u16`, `u32`, `u64` and `usize`. Narrower tags make slots smaller
/// at the price of a shorter ABA window: a producer or consumer preempted for more than
/// `2^(bits - 2)` laps around the ring could mistake a slot generation.
pub trait TagWidth: sealed::Sealed + Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// The atomic integer of the same width.
    #[doc(hidden)]
    type Atomic: Send + Sync;

    /// Creates an atomic holding `value`.
    #[doc(hidden)]
    fn atomic(value: Self) -> Self::Atomic;

    /// Loads the tag.
    #[doc(hidden)]
    fn load(atomic: &Self::Atomic, order: Ordering) -> Self;

    /// Stores the tag.
    #[doc(hidden)]
    fn store(atomic: &Self::Atomic, value: Self, order: Ordering);

    /// Truncates `value` to the tag width.
    #[doc(hidden)]
    fn truncate(value: usize) -> Self;

    /// `self + 1`, wrapping.
    #[doc(hidden)]
    fn next(self) -> Self;

    /// The signed distance `self - other`, wrapping in the tag width.
    #[doc(hidden)]
    fn distance(self, other: Self) -> i64;

    /// The tag as a `u64`, for diagnostics.
    #[doc(hidden)]
    fn widen(self) -> u64;
}

macro_rules! tag_width {
    ($(#[$cfg:meta])* $int:ty, $signed:ty, $atomic:ident) => {
        $(#[$cfg])*
        impl sealed::Sealed for $int {}

        $(#[$cfg])*
        // `usize` and `u64` convert to themselves.
        #[allow(trivial_numeric_casts)]
        impl TagWidth for $int {
            type Atomic = $atomic;

            #[inline]
            fn atomic(value: Self) -> Self::Atomic {
                $atomic::new(value)
            }

            #[inline]
            fn load(atomic: &Self::Atomic, order: Ordering) -> Self {
                atomic.load(order)
            }

            #[inline]
            fn store(atomic: &Self::Atomic, value: Self, order: Ordering) {
                atomic.store(value, order)
            }

            #[inline]
            fn truncate(value: usize) -> Self {
                value as $int
            }

            #[inline]
            fn next(self) -> Self {
                self.wrapping_add(1)
            }

            #[inline]
            fn distance(self, other: Self) -> i64 {
                self.wrapping_sub(other) as $signed as i64
            }

            #[inline]
            fn widen(self) -> u64 {
                self as u64
            }
        }
    };
}

tag_width!(u8, i8, AtomicU8);
tag_width!(u16, i16, AtomicU16);
tag_width!(u32, i32, AtomicU32);
tag_width!(
    #[cfg(target_has_atomic = "64")]
    u64,
    i64,
    AtomicU64
);
tag_width!(usize, isize, AtomicUsize);

/// Double-epoch encoding over a tag of width `W`.
pub(crate) struct Epoch<W>(PhantomData<W>);

impl<W: TagWidth> Epoch<W> {
    /// The "empty" tag expected by the producer of `index`.
    #[inline]
    fn vacant(index: usize, capacity: usize) -> W {
        W::truncate((index / capacity).wrapping_mul(2))
    }

    #[inline]
    fn classify(observed: W, expected: W) -> Claim {
        match observed.distance(expected) {
            0 => Claim::Ready,
            d if d < 0 => Claim::Blocked,
            _ => Claim::Stale,
        }
    }
}

impl<W: TagWidth> Encoding for Epoch<W> {
    type Tag = W::Atomic;

    fn initial() -> Self::Tag {
        W::atomic(W::truncate(0))
    }

    #[inline]
    fn push_claim(tag: &Self::Tag, index: usize, capacity: usize) -> Claim {
        let observed = W::load(tag, Ordering::Acquire);
        Self::classify(observed, Self::vacant(index, capacity))
    }

    #[inline]
    fn pop_claim(tag: &Self::Tag, index: usize, capacity: usize) -> Claim {
        let observed = W::load(tag, Ordering::Acquire);
        Self::classify(observed, Self::vacant(index, capacity).next())
    }

    #[inline]
    fn mark_full(tag: &Self::Tag, index: usize, capacity: usize) {
        W::store(tag, Self::vacant(index, capacity).next(), Ordering::Release);
    }

    #[inline]
    fn mark_empty(tag: &Self::Tag, index: usize, capacity: usize) {
        W::store(
            tag,
            Self::vacant(index, capacity).next().next(),
            Ordering::Release,
        );
    }

    fn holds_item(tag: &Self::Tag) -> bool {
        W::load(tag, Ordering::Acquire).widen() & 1 == 1
    }

    fn raw(tag: &Self::Tag) -> u64 {
        W::load(tag, Ordering::Relaxed).widen()
    }
}

/// Filled-flag encoding for rings with exactly one producer and one consumer cursor.
pub(crate) struct Filled;

impl Encoding for Filled {
    type Tag = AtomicBool;

    fn initial() -> Self::Tag {
        AtomicBool::new(false)
    }

    #[inline]
    fn push_claim(tag: &Self::Tag, _index: usize, _capacity: usize) -> Claim {
        if tag.load(Ordering::Acquire) {
            Claim::Blocked
        } else {
            Claim::Ready
        }
    }

    #[inline]
    fn pop_claim(tag: &Self::Tag, _index: usize, _capacity: usize) -> Claim {
        if tag.load(Ordering::Acquire) {
            Claim::Ready
        } else {
            Claim::Blocked
        }
    }

    #[inline]
    fn mark_full(tag: &Self::Tag, _index: usize, _capacity: usize) {
        tag.store(true, Ordering::Release);
    }

    #[inline]
    fn mark_empty(tag: &Self::Tag, _index: usize, _capacity: usize) {
        tag.store(false, Ordering::Release);
    }

    fn holds_item(tag: &Self::Tag) -> bool {
        tag.load(Ordering::Acquire)
    }

    fn raw(tag: &Self::Tag) -> u64 {
        u64::from(tag.load(Ordering::Relaxed))
    }
}
