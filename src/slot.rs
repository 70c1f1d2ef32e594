//! The slot arena: a flat table of values and their ring-membership metadata.
//!
//! This is pure data. The arena knows nothing about ring invariants; all
//! splicing logic lives in [`ring`](crate::ring). Slots are created at
//! construction or growth and never destroyed individually.

use alloc::vec::Vec;

use crate::index::Capacity;

/// One arena position: the caller's payload plus the intrusive link fields.
///
/// `next` and `prev` are intra-group circular indices, only meaningful in
/// the context of the slot's current `group`.
pub(crate) struct Slot<T, I> {
    pub value: T,
    pub group: I,
    pub next: I,
    pub prev: I,
}

/// A flat, growable table of slots. Indices are stable across growth.
pub(crate) struct SlotArena<T, I: Capacity> {
    slots: Vec<Slot<T, I>>,
}

impl<T, I: Capacity> SlotArena<T, I> {
    pub fn with_capacity(capacity: usize) -> Self {
        SlotArena {
            slots: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn reserve(&mut self, extra: usize) {
        self.slots.reserve_exact(extra);
    }

    pub fn push(&mut self, slot: Slot<T, I>) {
        self.slots.push(slot);
    }

    /// Panics if `index` is out of bounds; callers validate first.
    #[inline]
    pub fn slot(&self, index: usize) -> &Slot<T, I> {
        &self.slots[index]
    }

    #[inline]
    pub fn slot_mut(&mut self, index: usize) -> &mut Slot<T, I> {
        &mut self.slots[index]
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Slot<T, I>> {
        self.slots.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Slot<T, I>> {
        self.slots.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_layout_is_compact() {
        use core::mem::size_of;
        assert_eq!(size_of::<Slot<(), u8>>(), 3);
        assert_eq!(size_of::<Slot<u8, u8>>(), 4);
    }

    #[test]
    fn indices_are_stable_across_growth() {
        let mut arena = SlotArena::<u32, u8>::with_capacity(2);
        arena.push(Slot { value: 7, group: 0, next: 1, prev: 1 });
        arena.push(Slot { value: 9, group: 0, next: 0, prev: 0 });

        arena.reserve(100);
        for i in 2..102u32 {
            arena.push(Slot { value: i, group: 0, next: 0, prev: 0 });
        }

        // values survive reallocation even though addresses may not
        assert_eq!(arena.slot(0).value, 7);
        assert_eq!(arena.slot(1).value, 9);
        assert_eq!(arena.len(), 102);
        assert!(arena.get(102).is_none());
    }
}
