//! Holds an item of a ring together with its tag.
//!
//! The tag type `G` comes from the ring's [`Encoding`]: an epoch counter for multi-producer
//! multi-consumer rings, a filled flag for single-producer single-consumer ones. The tag is
//! the only synchronization point for the payload: a payload write is published by a release
//! store on the tag and acquired by the acquire load that grants the read, and the other way
//! around when the slot is handed back to producers.
//!
//! [`Encoding`]: crate::tag::Encoding

use crate::variant::cell::UnsafeCell;

use std::mem::MaybeUninit;

/// Holds an item of a ring.
#[derive(Debug)]
pub(crate) struct Slot<T, G> {
    /// Holds an item pushed to the ring.
    pub(crate) item: UnsafeCell<MaybeUninit<T>>,

    /// Reports the state of the [`Slot`].
    pub(crate) tag: G,
}

impl<T, G> Slot<T, G> {
    pub(crate) fn new(tag: G) -> Self {
        Self {
            item: UnsafeCell::new(MaybeUninit::uninit()),
            tag,
        }
    }

    /// Moves `item` into the slot.
    ///
    /// # Safety
    ///
    /// The caller must hold the producer claim on the slot and the slot must be empty.
    #[inline]
    pub(crate) unsafe fn write(&self, item: T) {
        self.item.with_mut(|p| unsafe { p.write(MaybeUninit::new(item)) });
    }

    /// Moves the item out of the slot.
    ///
    /// # Safety
    ///
    /// The caller must hold the consumer claim on the slot and the slot must be full.
    #[inline]
    pub(crate) unsafe fn take(&self) -> T {
        self.item.with(|p| unsafe { p.read().assume_init() })
    }

    /// Gives access to the item in place.
    ///
    /// # Safety
    ///
    /// The slot must be full and no other thread may write to it for the duration of `f`.
    pub(crate) unsafe fn inspect<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.item.with(|p| f(unsafe { (*p).assume_init_ref() }))
    }

    /// Drops the item in place.
    ///
    /// # Safety
    ///
    /// The slot must be full and must not be read afterwards.
    pub(crate) unsafe fn drop_in_place(&self) {
        self.item.with_mut(|p| unsafe { (*p).assume_init_drop() });
    }
}
