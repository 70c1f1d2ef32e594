//! The group directory: per-group ring metadata.
//!
//! Like the slot arena, this is pure data; the directory records where each
//! group's ring can be entered and how many slots it currently claims.

use alloc::vec::Vec;

use crate::index::Capacity;

/// Per-group metadata.
///
/// `entrance` is a representative member of the group's ring, `None` iff the
/// group is empty. `len` is the number of slots the group currently owns.
pub(crate) struct GroupMeta<I> {
    pub entrance: Option<I>,
    pub len: usize,
}

pub(crate) struct GroupDirectory<I: Capacity> {
    groups: Vec<GroupMeta<I>>,
}

impl<I: Capacity> GroupDirectory<I> {
    /// Creates `group_count` empty groups.
    pub fn new(group_count: usize) -> Self {
        let mut groups = Vec::with_capacity(group_count);
        for _ in 0..group_count {
            groups.push(GroupMeta {
                entrance: None,
                len: 0,
            });
        }

        GroupDirectory { groups }
    }

    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn meta(&self, group: usize) -> &GroupMeta<I> {
        &self.groups[group]
    }

    #[inline]
    pub fn meta_mut(&mut self, group: usize) -> &mut GroupMeta<I> {
        &mut self.groups[group]
    }

    #[inline]
    pub fn get(&self, group: usize) -> Option<&GroupMeta<I>> {
        self.groups.get(group)
    }
}
