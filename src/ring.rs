//! A multi-group circular queue over a fixed slot arena.
//!
//! [`MultiRing`] owns a flat arena of slots and a directory of groups. Each
//! group's members form a circular doubly-linked ring threaded through the
//! arena by index, so reassigning a slot to another group, inserting at a
//! group's logical tail, and starting a round-robin traversal are all O(1)
//! and never allocate or touch unrelated slots.
//!
//! Traversal is snapshotted and bounded: a [`GroupCursor`] records the
//! group's entrance and length at acquisition and yields exactly that many
//! indices. While any cursor is live, the structure holds a traversal lock
//! and rejects structural mutation with [`RingError::LockedMutation`];
//! splicing a ring that an active traversal still references could skip or
//! duplicate items, or tear the ring into an endless loop.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt::{self, Debug, Display, Formatter};
use core::iter::FusedIterator;
use core::ops::{Index, IndexMut};

use crate::group::GroupDirectory;
use crate::index::Capacity;
use crate::slot::{Slot, SlotArena};

/// The ways a ring operation can be rejected.
///
/// All three conditions are recoverable by the caller, and none of them
/// leaves the structure partially modified.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RingError {
    /// A slot index or group id was outside the valid range.
    OutOfRange,
    /// A structural mutation was attempted while a traversal lock is held.
    ///
    /// Defer the mutation until every cursor has been exhausted or dropped.
    LockedMutation,
    /// Growth would take some slot index outside the index type's
    /// representable range. Capacity and group assignments are unchanged.
    CapacityExceeded,
}

impl Display for RingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RingError::OutOfRange => "slot index or group id out of range",
            RingError::LockedMutation => {
                "structural mutation while a traversal lock is held"
            }
            RingError::CapacityExceeded => {
                "capacity growth exceeds the index type's range"
            }
        })
    }
}

#[cold]
#[inline(never)]
#[track_caller]
fn zero_sized_ring() -> ! {
    panic!("a ring needs at least one slot and one group")
}

#[cold]
#[inline(never)]
#[track_caller]
fn arena_too_large_for_index_type(requested: usize) -> ! {
    panic!(
        "requested range (is {}) cannot be represented by the index type",
        requested
    )
}

#[cold]
#[inline(never)]
#[track_caller]
fn cursor_from_foreign_ring() -> ! {
    panic!("cursor was created by a different ring")
}

/// Scoped acquisition of a ring's traversal lock.
///
/// Dropping the guard releases the lock exactly once; this is the only way
/// the depth counter is ever decremented.
struct TraversalLock {
    depth: Rc<Cell<u32>>,
}

impl TraversalLock {
    fn acquire(depth: &Rc<Cell<u32>>) -> Self {
        depth.set(depth.get() + 1);
        TraversalLock {
            depth: Rc::clone(depth),
        }
    }
}

impl Drop for TraversalLock {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// A detached round-robin cursor over one group's ring.
///
/// The cursor snapshots the group's entrance and length when it is acquired
/// via [`MultiRing::cursor`], and holds the ring's traversal lock until the
/// snapshot is exhausted or the cursor is dropped, whichever comes first.
/// It does not borrow the ring; pass it back to [`MultiRing::advance`] to
/// step it.
pub struct GroupCursor<I: Capacity> {
    group: I,
    next: Option<I>,
    remaining: usize,
    lock: Option<TraversalLock>,
}

impl<I: Capacity> GroupCursor<I> {
    /// Returns the group this cursor traverses.
    #[inline]
    pub fn group(&self) -> I {
        self.group
    }

    /// Returns the number of indices left in the snapshot.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Returns [`true`] once the snapshot has been fully consumed.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

impl<I: Capacity> Debug for GroupCursor<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupCursor")
            .field("group", &self.group)
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// A multi-group circular queue over a fixed slot arena.
///
/// Construction places every slot in group 0, in one ring ordered by
/// ascending index. Slots are never destroyed; "removing" an item from a
/// group means reassigning its slot to another group (commonly back to a
/// designated default group). Within a group, insertion order is FIFO: a
/// slot moved into a group lands at the logical tail, so traversal visits
/// members oldest-resident-first.
///
/// Not thread-safe by construction (`!Send`/`!Sync`); confine each instance
/// to one thread. Not suited to workloads where most groups are empty most
/// of the time, since every slot always belongs to some group.
///
/// # Examples
/// ```
/// use multiring::MultiRing;
///
/// // distribute 60 entities over four update buckets
/// let mut ring: MultiRing<u64> = MultiRing::with_capacity_from(60, 4, |i| i as u64);
/// for i in 0..60 {
///     ring.set_group(i, i % 4)?;
/// }
///
/// // each tick visits one bucket, allocation-free
/// let visited = ring.iter_group(1)?.count();
/// assert_eq!(visited, 15);
/// # Ok::<(), multiring::RingError>(())
/// ```
pub struct MultiRing<T, I: Capacity = usize> {
    slots: SlotArena<T, I>,
    groups: GroupDirectory<I>,
    lock: Rc<Cell<u32>>,
}

impl<T: Default, I: Capacity> MultiRing<T, I> {
    /// Creates a ring with `capacity` default-initialized slots distributed
    /// over `group_count` groups, all starting in group 0.
    ///
    /// # Panics
    /// Panics if `capacity` or `group_count` is zero, or if either range
    /// cannot be represented by the index type `I`.
    ///
    /// # Examples
    /// ```
    /// use multiring::MultiRing;
    ///
    /// let ring: MultiRing<u32, u8> = MultiRing::with_capacity(4, 2);
    /// assert_eq!(ring.capacity(), 4);
    /// assert_eq!(ring.group_count(), 2);
    /// assert_eq!(ring.group_len(0), Ok(4));
    /// assert_eq!(ring.group_len(1), Ok(0));
    /// ```
    #[track_caller]
    pub fn with_capacity(capacity: usize, group_count: usize) -> Self {
        Self::with_capacity_from(capacity, group_count, |_| T::default())
    }

    /// Grows the arena by `extra` default-initialized slots, all placed in
    /// `group` as if each had been individually tail-inserted in index
    /// order. Existing slots keep their indices, values, and groups.
    ///
    /// Fails with [`RingError::CapacityExceeded`] if the grown arena would
    /// contain indices the index type cannot represent, and with
    /// [`RingError::LockedMutation`] while a cursor is live; in both cases
    /// the structure is left unchanged. `extra == 0` is a no-op.
    ///
    /// # Examples
    /// ```
    /// use multiring::MultiRing;
    ///
    /// let mut ring: MultiRing<u32> = MultiRing::with_capacity(4, 2);
    /// ring.append_capacity(1, 3)?;
    /// assert_eq!(ring.capacity(), 7);
    /// assert_eq!(ring.group_len(0), Ok(4));
    /// assert_eq!(ring.group_len(1), Ok(3));
    /// # Ok::<(), multiring::RingError>(())
    /// ```
    pub fn append_capacity(&mut self, group: I, extra: usize) -> Result<(), RingError> {
        self.append_capacity_from(group, extra, |_| T::default())
    }
}

impl<T, I: Capacity> MultiRing<T, I> {
    /// Creates a ring like [`with_capacity`](MultiRing::with_capacity), with
    /// each slot's value produced by `fill` from its index.
    ///
    /// # Panics
    /// Panics under the same conditions as `with_capacity`.
    #[track_caller]
    pub fn with_capacity_from<F>(capacity: usize, group_count: usize, mut fill: F) -> Self
    where
        F: FnMut(usize) -> T,
    {
        if capacity == 0 || group_count == 0 {
            zero_sized_ring();
        }
        if capacity - 1 > I::MAX_REPRESENTABLE {
            arena_too_large_for_index_type(capacity - 1);
        }
        if group_count - 1 > I::MAX_REPRESENTABLE {
            arena_too_large_for_index_type(group_count - 1);
        }

        let home = I::from_usize(0);
        let mut slots = SlotArena::with_capacity(capacity);
        for i in 0..capacity {
            slots.push(Slot {
                value: fill(i),
                group: home,
                next: I::from_usize((i + 1) % capacity),
                prev: I::from_usize((i + capacity - 1) % capacity),
            });
        }

        let mut groups = GroupDirectory::new(group_count);
        let meta = groups.meta_mut(0);
        meta.entrance = Some(home);
        meta.len = capacity;

        MultiRing {
            slots,
            groups,
            lock: Rc::new(Cell::new(0)),
        }
    }

    /// Returns the number of slots in the arena.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of groups.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.group_count()
    }

    /// Returns [`true`] while at least one traversal lock is held.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.lock.get() != 0
    }

    /// Returns a reference to the value at `index`, or [`None`] if the index
    /// is out of range.
    #[inline]
    pub fn get(&self, index: I) -> Option<&T> {
        self.slots.get(index.as_usize()).map(|s| &s.value)
    }

    /// Returns a mutable reference to the value at `index`, or [`None`] if
    /// the index is out of range.
    ///
    /// Value mutation does not touch ring structure, so this is permitted
    /// while a traversal lock is held.
    #[inline]
    pub fn get_mut(&mut self, index: I) -> Option<&mut T> {
        self.slots.get_mut(index.as_usize()).map(|s| &mut s.value)
    }

    /// Replaces the value at `index`, returning the previous one.
    ///
    /// Like [`get_mut`](MultiRing::get_mut), this is permitted while locked.
    pub fn set(&mut self, index: I, value: T) -> Result<T, RingError> {
        let slot = self
            .slots
            .get_mut(index.as_usize())
            .ok_or(RingError::OutOfRange)?;
        Ok(core::mem::replace(&mut slot.value, value))
    }

    /// Returns the group currently owning the slot at `index`.
    pub fn group_of(&self, index: I) -> Result<I, RingError> {
        self.slots
            .get(index.as_usize())
            .map(|s| s.group)
            .ok_or(RingError::OutOfRange)
    }

    /// Returns the number of slots currently in `group`.
    pub fn group_len(&self, group: I) -> Result<usize, RingError> {
        self.groups
            .get(group.as_usize())
            .map(|m| m.len)
            .ok_or(RingError::OutOfRange)
    }

    /// Returns `group`'s entrance slot, or `Ok(None)` if the group is empty.
    ///
    /// The entrance is the fixed starting point of the group's traversal;
    /// it only changes when the entrance slot itself leaves the group.
    pub fn entrance(&self, group: I) -> Result<Option<I>, RingError> {
        self.groups
            .get(group.as_usize())
            .map(|m| m.entrance)
            .ok_or(RingError::OutOfRange)
    }

    /// Returns the successor of `index` in its group's ring.
    pub fn next_in_ring(&self, index: I) -> Result<I, RingError> {
        self.slots
            .get(index.as_usize())
            .map(|s| s.next)
            .ok_or(RingError::OutOfRange)
    }

    /// Returns the predecessor of `index` in its group's ring.
    pub fn prev_in_ring(&self, index: I) -> Result<I, RingError> {
        self.slots
            .get(index.as_usize())
            .map(|s| s.prev)
            .ok_or(RingError::OutOfRange)
    }

    /// Moves the slot at `index` into `group`, at the group's logical tail.
    ///
    /// A no-op if the slot is already in `group`. Fails with
    /// [`RingError::LockedMutation`] while a cursor is live, even for the
    /// no-op case, so that callers see one uniform rule during traversal.
    /// Both the unlink and the tail insertion are O(1).
    ///
    /// # Examples
    /// ```
    /// use multiring::MultiRing;
    ///
    /// let mut ring: MultiRing<u32> = MultiRing::with_capacity(4, 2);
    /// ring.set_group(2, 1)?;
    /// assert_eq!(ring.group_of(2), Ok(1));
    /// assert_eq!(ring.group_len(0), Ok(3));
    /// assert_eq!(ring.group_len(1), Ok(1));
    /// # Ok::<(), multiring::RingError>(())
    /// ```
    pub fn set_group(&mut self, index: I, group: I) -> Result<(), RingError> {
        let i = index.as_usize();
        if i >= self.slots.len() || group.as_usize() >= self.groups.group_count() {
            return Err(RingError::OutOfRange);
        }
        if self.is_locked() {
            return Err(RingError::LockedMutation);
        }
        if self.slots.slot(i).group == group {
            return Ok(());
        }

        self.unlink(i);
        self.link_before_entrance(i, group);
        Ok(())
    }

    /// Splices the slot at `index` out of its current group's ring.
    fn unlink(&mut self, index: usize) {
        let slot = self.slots.slot(index);
        let group = slot.group.as_usize();
        let prev = slot.prev;
        let next = slot.next;

        self.slots.slot_mut(prev.as_usize()).next = next;
        self.slots.slot_mut(next.as_usize()).prev = prev;

        let meta = self.groups.meta_mut(group);
        if meta.entrance.map(|e| e.as_usize()) == Some(index) {
            // hand the entrance to the successor, unless this slot was the
            // ring's only member
            meta.entrance = if next.as_usize() == index {
                None
            } else {
                Some(next)
            };
        }
        meta.len -= 1;
    }

    /// Splices the (unlinked) slot at `index` into `group`'s ring at the
    /// tail position, immediately before the entrance.
    fn link_before_entrance(&mut self, index: usize, group: I) {
        let idx = I::from_usize(index);
        let entrance = self.groups.meta(group.as_usize()).entrance;
        match entrance {
            None => {
                let slot = self.slots.slot_mut(index);
                slot.next = idx;
                slot.prev = idx;
                slot.group = group;

                let meta = self.groups.meta_mut(group.as_usize());
                meta.entrance = Some(idx);
                meta.len += 1;
            }
            Some(entrance) => {
                let tail = self.slots.slot(entrance.as_usize()).prev;
                self.slots.slot_mut(entrance.as_usize()).prev = idx;
                self.slots.slot_mut(tail.as_usize()).next = idx;

                let slot = self.slots.slot_mut(index);
                slot.prev = tail;
                slot.next = entrance;
                slot.group = group;

                self.groups.meta_mut(group.as_usize()).len += 1;
            }
        }
    }

    /// Grows the arena like [`append_capacity`](MultiRing::append_capacity),
    /// with each new slot's value produced by `fill` from its index.
    pub fn append_capacity_from<F>(
        &mut self,
        group: I,
        extra: usize,
        mut fill: F,
    ) -> Result<(), RingError>
    where
        F: FnMut(usize) -> T,
    {
        let g = group.as_usize();
        if g >= self.groups.group_count() {
            return Err(RingError::OutOfRange);
        }
        if self.is_locked() {
            return Err(RingError::LockedMutation);
        }
        if extra == 0 {
            return Ok(());
        }

        let old = self.slots.len();
        let new = old.checked_add(extra).ok_or(RingError::CapacityExceeded)?;
        if new - 1 > I::MAX_REPRESENTABLE {
            return Err(RingError::CapacityExceeded);
        }

        // Pre-ring the fresh block among itself, in index order.
        self.slots.reserve(extra);
        for i in old..new {
            let next = if i + 1 == new { old } else { i + 1 };
            let prev = if i == old { new - 1 } else { i - 1 };
            self.slots.push(Slot {
                value: fill(i),
                group,
                next: I::from_usize(next),
                prev: I::from_usize(prev),
            });
        }

        let first = I::from_usize(old);
        let last = I::from_usize(new - 1);
        let entrance = self.groups.meta(g).entrance;
        match entrance {
            None => {
                let meta = self.groups.meta_mut(g);
                meta.entrance = Some(first);
                meta.len = extra;
            }
            Some(entrance) => {
                // splice the whole block in front of the entrance in one go
                let tail = self.slots.slot(entrance.as_usize()).prev;
                self.slots.slot_mut(tail.as_usize()).next = first;
                self.slots.slot_mut(first.as_usize()).prev = tail;
                self.slots.slot_mut(last.as_usize()).next = entrance;
                self.slots.slot_mut(entrance.as_usize()).prev = last;

                self.groups.meta_mut(g).len += extra;
            }
        }

        Ok(())
    }

    /// Acquires a traversal lock and returns a cursor over `group`,
    /// snapshotting the group's entrance and length.
    ///
    /// The cursor yields exactly [`group_len(group)`](MultiRing::group_len)
    /// indices as of this call; it never observes later changes. The lock
    /// is released when the cursor is exhausted or dropped.
    ///
    /// # Examples
    /// ```
    /// use multiring::MultiRing;
    ///
    /// let mut ring: MultiRing<u32> = MultiRing::with_capacity(3, 1);
    /// let mut cursor = ring.cursor(0)?;
    /// while let Some(i) = ring.advance(&mut cursor) {
    ///     *ring.get_mut(i).unwrap() += 1;
    /// }
    /// assert!(!ring.is_locked());
    /// # Ok::<(), multiring::RingError>(())
    /// ```
    pub fn cursor(&self, group: I) -> Result<GroupCursor<I>, RingError> {
        let meta = self
            .groups
            .get(group.as_usize())
            .ok_or(RingError::OutOfRange)?;

        Ok(GroupCursor {
            group,
            next: meta.entrance,
            remaining: meta.len,
            lock: Some(TraversalLock::acquire(&self.lock)),
        })
    }

    /// Steps `cursor`, returning the next slot index in its group's ring,
    /// or [`None`] once the snapshot is exhausted.
    ///
    /// Exhaustion releases the cursor's traversal lock promptly, without
    /// waiting for the cursor to be dropped.
    ///
    /// # Panics
    /// Panics if `cursor` was created by a different ring.
    pub fn advance(&self, cursor: &mut GroupCursor<I>) -> Option<I> {
        if cursor.remaining == 0 {
            cursor.lock = None;
            return None;
        }
        if let Some(lock) = &cursor.lock {
            if !Rc::ptr_eq(&lock.depth, &self.lock) {
                cursor_from_foreign_ring();
            }
        }

        let current = cursor.next?;
        cursor.remaining -= 1;
        cursor.next = Some(self.slots.slot(current.as_usize()).next);
        if cursor.remaining == 0 {
            cursor.lock = None;
        }

        Some(current)
    }

    /// Acquires a traversal lock and returns a borrowing iterator over
    /// `group`, yielding `(index, &value)` pairs in ring order starting at
    /// the entrance.
    ///
    /// This is [`cursor`](MultiRing::cursor) with iterator ergonomics; the
    /// same snapshot and locking rules apply.
    ///
    /// # Examples
    /// ```
    /// use multiring::MultiRing;
    ///
    /// let mut ring: MultiRing<char> = MultiRing::with_capacity_from(3, 2, |i| (b'a' + i as u8) as char);
    /// ring.set_group(1, 1)?;
    ///
    /// let items: Vec<_> = ring.iter_group(0)?.collect();
    /// assert_eq!(items, [(0, &'a'), (2, &'c')]);
    /// # Ok::<(), multiring::RingError>(())
    /// ```
    pub fn iter_group(&self, group: I) -> Result<GroupIter<'_, T, I>, RingError> {
        Ok(GroupIter {
            ring: self,
            cursor: self.cursor(group)?,
        })
    }
}

impl<T, I: Capacity> Index<I> for MultiRing<T, I> {
    type Output = T;

    /// # Panics
    /// Panics if `index` is out of range.
    #[inline]
    fn index(&self, index: I) -> &T {
        &self.slots.slot(index.as_usize()).value
    }
}

impl<T, I: Capacity> IndexMut<I> for MultiRing<T, I> {
    #[inline]
    fn index_mut(&mut self, index: I) -> &mut T {
        &mut self.slots.slot_mut(index.as_usize()).value
    }
}

impl<T, I: Capacity> Debug for MultiRing<T, I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiRing")
            .field("capacity", &self.capacity())
            .field("group_count", &self.group_count())
            .field("lock_depth", &self.lock.get())
            .finish()
    }
}

/// A borrowing iterator over one group's ring, created by
/// [`MultiRing::iter_group`].
///
/// Holds the ring's traversal lock until exhausted or dropped.
pub struct GroupIter<'a, T, I: Capacity> {
    ring: &'a MultiRing<T, I>,
    cursor: GroupCursor<I>,
}

impl<'a, T, I: Capacity> Iterator for GroupIter<'a, T, I> {
    type Item = (I, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.ring.advance(&mut self.cursor)?;
        Some((index, &self.ring.slots.slot(index.as_usize()).value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<T, I: Capacity> ExactSizeIterator for GroupIter<'_, T, I> {}
impl<T, I: Capacity> FusedIterator for GroupIter<'_, T, I> {}

#[cfg(test)]
impl<T, I: Capacity> MultiRing<T, I> {
    /// Walks every ring and checks the structural invariants: the groups
    /// partition the arena, each ring closes after exactly `len` steps, and
    /// `next`/`prev` mirror each other.
    fn assert_invariants(&self) {
        let mut total = 0;
        for g in 0..self.group_count() {
            let meta = self.groups.meta(g);
            total += meta.len;
            match meta.entrance {
                None => assert_eq!(meta.len, 0, "empty group {} has an entrance", g),
                Some(entrance) => {
                    assert!(meta.len > 0);
                    let mut i = entrance;
                    for _ in 0..meta.len {
                        let slot = self.slots.slot(i.as_usize());
                        assert_eq!(slot.group.as_usize(), g);
                        assert_eq!(self.slots.slot(slot.next.as_usize()).prev, i);
                        i = slot.next;
                    }
                    assert_eq!(i, entrance, "ring of group {} does not close", g);
                }
            }
        }
        assert_eq!(total, self.capacity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn indices<I: Capacity, T>(ring: &MultiRing<T, I>, group: I) -> Vec<usize> {
        ring.iter_group(group)
            .unwrap()
            .map(|(i, _)| i.as_usize())
            .collect()
    }

    #[test]
    fn construction_forms_one_ascending_ring() {
        let ring: MultiRing<u32, u8> = MultiRing::with_capacity(4, 2);
        ring.assert_invariants();

        assert_eq!(ring.entrance(0), Ok(Some(0)));
        assert_eq!(ring.entrance(1), Ok(None));
        assert_eq!(indices(&ring, 0), [0, 1, 2, 3]);
        assert_eq!(ring.next_in_ring(3), Ok(0));
        assert_eq!(ring.prev_in_ring(0), Ok(3));
    }

    #[test]
    fn capacity_one_is_a_self_ring() {
        let ring: MultiRing<(), u8> = MultiRing::with_capacity(1, 1);
        ring.assert_invariants();
        assert_eq!(ring.next_in_ring(0), Ok(0));
        assert_eq!(ring.prev_in_ring(0), Ok(0));
    }

    #[test]
    fn concrete_scenario() {
        let mut ring: MultiRing<u32> = MultiRing::with_capacity_from(4, 2, |i| i as u32 * 10);
        ring.set_group(2, 1).unwrap();
        ring.assert_invariants();

        assert_eq!(ring.group_len(0), Ok(3));
        assert_eq!(ring.group_len(1), Ok(1));
        assert_eq!(indices(&ring, 0), [0, 1, 3]);
        assert_eq!(indices(&ring, 1), [2]);

        ring.append_capacity_from(0, 2, |i| i as u32 * 10).unwrap();
        ring.assert_invariants();

        assert_eq!(ring.capacity(), 6);
        assert_eq!(ring.group_len(0), Ok(5));
        assert_eq!(indices(&ring, 0), [0, 1, 3, 4, 5]);
        assert_eq!(indices(&ring, 1), [2]);
        for i in 0..6 {
            assert_eq!(ring[i], i as u32 * 10);
        }
        assert_eq!(ring.group_of(2), Ok(1));
    }

    #[test]
    fn idempotent_move() {
        let mut ring: MultiRing<(), u8> = MultiRing::with_capacity(4, 2);
        ring.set_group(2, 1).unwrap();
        let before: Vec<usize> = (0..2).map(|g| ring.group_len(g).unwrap()).collect();

        ring.set_group(2, 1).unwrap();
        ring.assert_invariants();
        let after: Vec<usize> = (0..2).map(|g| ring.group_len(g).unwrap()).collect();
        assert_eq!(before, after);
        assert_eq!(indices(&ring, 1), [2]);
    }

    #[test]
    fn fifo_order_within_group() {
        let mut ring: MultiRing<(), u8> = MultiRing::with_capacity(8, 3);
        for &i in &[5u8, 2, 7] {
            ring.set_group(i, 2).unwrap();
        }
        assert_eq!(indices(&ring, 2), [5, 2, 7]);
    }

    #[test]
    fn entrance_hands_off_to_successor() {
        let mut ring: MultiRing<(), u8> = MultiRing::with_capacity(4, 2);
        ring.set_group(0, 1).unwrap();
        assert_eq!(ring.entrance(0), Ok(Some(1)));
        assert_eq!(ring.entrance(1), Ok(Some(0)));

        // single-member group collapses to empty
        ring.set_group(0, 0).unwrap();
        assert_eq!(ring.entrance(1), Ok(None));
        assert_eq!(ring.group_len(1), Ok(0));

        // slot 0 rejoined at the tail of group 0
        assert_eq!(indices(&ring, 0), [1, 2, 3, 0]);
        ring.assert_invariants();
    }

    #[test]
    fn growth_into_empty_group() {
        let mut ring: MultiRing<(), u8> = MultiRing::with_capacity(2, 2);
        ring.append_capacity(1, 3).unwrap();
        ring.assert_invariants();

        assert_eq!(ring.capacity(), 5);
        assert_eq!(ring.entrance(1), Ok(Some(2)));
        assert_eq!(indices(&ring, 1), [2, 3, 4]);
        assert_eq!(indices(&ring, 0), [0, 1]);
    }

    #[test]
    fn growth_to_the_index_limit() {
        let mut ring: MultiRing<(), u8> = MultiRing::with_capacity(250, 1);
        ring.append_capacity(0, 6).unwrap();
        assert_eq!(ring.capacity(), 256);

        // one more slot would need index 256
        assert_eq!(ring.append_capacity(0, 1), Err(RingError::CapacityExceeded));
        assert_eq!(ring.capacity(), 256);
        assert_eq!(ring.group_len(0), Ok(256));
        ring.assert_invariants();
    }

    #[test]
    fn zero_growth_is_a_no_op() {
        let mut ring: MultiRing<(), u8> = MultiRing::with_capacity(4, 2);
        ring.append_capacity(1, 0).unwrap();
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.group_len(1), Ok(0));
    }

    #[test]
    fn out_of_range_reports() {
        let mut ring: MultiRing<u32, u8> = MultiRing::with_capacity(4, 2);
        assert_eq!(ring.get(4), None);
        assert_eq!(ring.set(9, 1), Err(RingError::OutOfRange));
        assert_eq!(ring.group_of(4), Err(RingError::OutOfRange));
        assert_eq!(ring.group_len(2), Err(RingError::OutOfRange));
        assert_eq!(ring.entrance(2), Err(RingError::OutOfRange));
        assert_eq!(ring.next_in_ring(4), Err(RingError::OutOfRange));
        assert_eq!(ring.set_group(0, 5), Err(RingError::OutOfRange));
        assert_eq!(ring.set_group(7, 0), Err(RingError::OutOfRange));
        assert_eq!(ring.append_capacity(2, 1), Err(RingError::OutOfRange));
        assert!(ring.cursor(2).is_err());
        assert!(!ring.is_locked());
    }

    #[test]
    fn mutation_is_rejected_while_locked() {
        let mut ring: MultiRing<u32> = MultiRing::with_capacity(4, 2);
        let mut cursor = ring.cursor(0).unwrap();
        assert!(ring.is_locked());

        assert_eq!(ring.set_group(1, 1), Err(RingError::LockedMutation));
        assert_eq!(ring.set_group(1, 0), Err(RingError::LockedMutation)); // even the no-op
        assert_eq!(ring.append_capacity(0, 2), Err(RingError::LockedMutation));

        // value access stays legal
        assert_eq!(ring.set(0, 42), Ok(0));
        assert_eq!(ring.get(0), Some(&42));

        let mut yielded = 0;
        while ring.advance(&mut cursor).is_some() {
            yielded += 1;
        }
        assert_eq!(yielded, 4);

        // normal exhaustion released the lock before the cursor was dropped
        assert!(!ring.is_locked());
        assert_eq!(ring.set_group(1, 1), Ok(()));
        assert_eq!(ring.advance(&mut cursor), None);
    }

    #[test]
    fn early_drop_releases_the_lock() {
        let mut ring: MultiRing<(), u8> = MultiRing::with_capacity(4, 1);
        let mut cursor = ring.cursor(0).unwrap();
        assert_eq!(ring.advance(&mut cursor), Some(0));
        drop(cursor);
        assert!(!ring.is_locked());
        assert_eq!(ring.append_capacity(0, 1), Ok(()));
    }

    #[test]
    fn lock_depth_is_reentrant() {
        let ring: MultiRing<(), u8> = MultiRing::with_capacity(4, 2);
        let a = ring.cursor(0).unwrap();
        let b = ring.cursor(1).unwrap();
        assert!(ring.is_locked());
        drop(a);
        assert!(ring.is_locked());
        drop(b);
        assert!(!ring.is_locked());
    }

    #[test]
    fn iteration_is_bounded_by_the_snapshot() {
        let mut ring: MultiRing<(), u8> = MultiRing::with_capacity(6, 2);
        let iter = ring.iter_group(0).unwrap();
        assert_eq!(iter.len(), 6);
        assert_eq!(iter.count(), 6);

        // the consumed iterator released the lock; mutate and re-snapshot
        ring.set_group(3, 1).unwrap();
        assert_eq!(ring.iter_group(0).unwrap().count(), 5);
        assert_eq!(ring.iter_group(1).unwrap().count(), 1);
    }

    #[test]
    fn empty_group_cursor_releases_on_first_advance() {
        let ring: MultiRing<(), u8> = MultiRing::with_capacity(2, 2);
        let mut cursor = ring.cursor(1).unwrap();
        assert!(ring.is_locked());
        assert_eq!(ring.advance(&mut cursor), None);
        assert!(!ring.is_locked());
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        let _ = MultiRing::<u32, u8>::with_capacity(0, 1);
    }

    #[test]
    #[should_panic]
    fn zero_groups_panics() {
        let _ = MultiRing::<u32, u8>::with_capacity(1, 0);
    }

    #[test]
    #[should_panic]
    fn arena_too_large_for_u8_panics() {
        let _ = MultiRing::<u32, u8>::with_capacity(300, 1);
    }

    #[test]
    #[should_panic]
    fn foreign_cursor_panics() {
        let a: MultiRing<(), u8> = MultiRing::with_capacity(4, 1);
        let b: MultiRing<(), u8> = MultiRing::with_capacity(4, 1);
        let mut cursor = a.cursor(0).unwrap();
        let _ = b.advance(&mut cursor);
    }

    #[test]
    fn randomized_moves_preserve_partition() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};

        const GROUPS: usize = 5;
        let mut rng = SmallRng::seed_from_u64(0x5EED);
        let mut ring: MultiRing<u64, u32> = MultiRing::with_capacity_from(64, GROUPS, |i| i as u64);
        let mut model: Vec<usize> = vec![0; 64];

        for step in 0..10_000 {
            if step % 500 == 499 {
                let g = rng.gen_range(0..GROUPS);
                let extra = rng.gen_range(1..8);
                let old = ring.capacity();
                ring.append_capacity_from(g as u32, extra, |i| i as u64)
                    .unwrap();
                model.resize(old + extra, g);
            } else {
                let i = rng.gen_range(0..ring.capacity());
                let g = rng.gen_range(0..GROUPS);
                ring.set_group(i as u32, g as u32).unwrap();
                model[i] = g;
            }

            if step % 250 == 0 {
                ring.assert_invariants();
            }
        }

        ring.assert_invariants();
        for (i, &g) in model.iter().enumerate() {
            assert_eq!(ring.group_of(i as u32), Ok(g as u32));
            assert_eq!(ring[i as u32], i as u64);
        }
        for g in 0..GROUPS {
            let mut want: Vec<usize> = model
                .iter()
                .enumerate()
                .filter(|(_, &x)| x == g)
                .map(|(i, _)| i)
                .collect();
            want.sort_unstable();

            assert_eq!(ring.group_len(g as u32), Ok(want.len()));
            let mut seen = indices(&ring, g as u32);
            seen.sort_unstable();
            assert_eq!(seen, want);
        }
    }
}
