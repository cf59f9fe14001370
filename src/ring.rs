//! The claim protocol shared by every queue of the crate.
//!
//! A [`RawRing`] is a fixed number of [`Slot`]s that never moves nor resizes. Pushing the
//! item for logical index `i` goes through the slot at `i % capacity`:
//!
//! 1. Load the producer cursor and inspect the slot tag ([`Encoding::push_claim`]).
//! 2. If the slot is ready, advance the cursor past `i`. With a shared cursor this is a CAS;
//!    losing it means another producer claimed `i`, so we retry from the index it reports
//!    without having touched the slot.
//! 3. Write the payload, then publish it with a release store on the tag.
//!
//! If the slot still belongs to an earlier operation the push fails right away (the ring is
//! full), and if the tag is ahead of `i` the cursor we loaded is outdated and is reloaded.
//! Popping is symmetric on the consumer cursor.
//!
//! The ring knows nothing about who owns the cursors: queues pass in a [`Shared`] atomic
//! or their own exclusive `usize`.
//!
//! [`Shared`]: crate::cursor::Shared

use crate::cursor::Cursor;
use crate::slot::Slot;
use crate::tag::{Claim, Encoding};

use std::marker::PhantomData;
use std::mem::needs_drop;

/// A fixed-capacity array of tagged slots.
pub(crate) struct RawRing<T, E: Encoding> {
    slots: Box<[Slot<T, E::Tag>]>,
    _encoding: PhantomData<fn() -> E>,
}

// Payloads only ever move from one thread to another through the claim protocol.
unsafe impl<T: Send, E: Encoding> Send for RawRing<T, E> where E::Tag: Send {}
unsafe impl<T: Send, E: Encoding> Sync for RawRing<T, E> where E::Tag: Sync {}

impl<T, E: Encoding> RawRing<T, E> {
    /// Creates a ring of `capacity` empty slots.
    ///
    /// `capacity` must not be zero; every constructor of the crate checks it beforehand.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);

        Self {
            slots: (0..capacity).map(|_| Slot::new(E::initial())).collect(),
            _encoding: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot(&self, index: usize) -> &Slot<T, E::Tag> {
        &self.slots[index % self.slots.len()]
    }

    /// Pushes `item` at the position of `cursor`, handing it back if the ring is full.
    ///
    /// # Safety
    ///
    /// Unless `E` is an epoch encoding, `cursor` must be the only producer cursor of this
    /// ring for the whole call.
    pub(crate) unsafe fn try_push<C: Cursor>(&self, cursor: &mut C, item: T) -> Result<(), T> {
        let capacity = self.capacity();
        let mut index = cursor.position();

        loop {
            let slot = self.slot(index);

            match E::push_claim(&slot.tag, index, capacity) {
                Claim::Ready => match cursor.advance(index) {
                    Ok(()) => {
                        // Winning the claim on an empty slot makes us its only writer.
                        unsafe { slot.write(item) };
                        E::mark_full(&slot.tag, index, capacity);
                        return Ok(());
                    }
                    Err(current) => index = current,
                },
                Claim::Blocked => return Err(item),
                Claim::Stale => index = cursor.position(),
            }
        }
    }

    /// Pops the item at the position of `cursor`, if it has been published.
    ///
    /// # Safety
    ///
    /// Unless `E` is an epoch encoding, `cursor` must be the only consumer cursor of this
    /// ring for the whole call.
    pub(crate) unsafe fn try_pop<C: Cursor>(&self, cursor: &mut C) -> Option<T> {
        let capacity = self.capacity();
        let mut index = cursor.position();

        loop {
            let slot = self.slot(index);

            match E::pop_claim(&slot.tag, index, capacity) {
                Claim::Ready => match cursor.advance(index) {
                    Ok(()) => {
                        // Winning the claim on a full slot makes us its only reader.
                        let item = unsafe { slot.take() };
                        E::mark_empty(&slot.tag, index, capacity);
                        return Some(item);
                    }
                    Err(current) => index = current,
                },
                Claim::Blocked => return None,
                Claim::Stale => index = cursor.position(),
            }
        }
    }

    /// Whether the item for logical `index` is published and waiting to be popped.
    #[inline]
    pub(crate) fn is_ready(&self, index: usize) -> bool {
        E::pop_claim(&self.slot(index).tag, index, self.capacity()) == Claim::Ready
    }

    /// Counts the slots holding an item. Advisory while operations are in flight.
    pub(crate) fn occupied(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| E::holds_item(&slot.tag))
            .count()
    }

    /// Calls `f` with the position, raw tag and item of every occupied slot.
    ///
    /// # Safety
    ///
    /// No push or pop may run on the ring for the duration of the call.
    pub(crate) unsafe fn for_each_occupied(&self, mut f: impl FnMut(usize, u64, &T)) {
        for (position, slot) in self.slots.iter().enumerate() {
            if E::holds_item(&slot.tag) {
                unsafe { slot.inspect(|item| f(position, E::raw(&slot.tag), item)) };
            }
        }
    }
}

impl<T, E: Encoding> Drop for RawRing<T, E> {
    fn drop(&mut self) {
        if !needs_drop::<T>() {
            return;
        }

        for slot in self.slots.iter() {
            if E::holds_item(&slot.tag) {
                unsafe { slot.drop_in_place() };
            }
        }
    }
}
