#![no_std]
#![warn(missing_docs)]

//! Grouped circular queues over a fixed slot arena.
//!
//! [`MultiRing`] partitions a fixed (but growable) arena of slots into named
//! groups. Every slot belongs to exactly one group at all times; each
//! group's members form a circular doubly-linked ring threaded through the
//! arena by index, never through individually allocated nodes. Reassigning a
//! slot to another group, inserting at a group's logical tail, and starting
//! a round-robin traversal are all O(1), and traversing one group never
//! walks or allocates anything else.
//!
//! This shape fits workloads with many homogeneous items that migrate
//! between buckets frequently and whose buckets are each visited in full,
//! independently; spreading periodic update work across frames is the
//! archetype. It is *not* a general-purpose collection: slots can be
//! reassigned but never removed, capacity never shrinks, and occupancy is
//! total by construction.
//!
//! # Examples
//! ```
//! use multiring::MultiRing;
//!
//! // four slots in two groups; everything starts in group 0
//! let mut ring: MultiRing<&str> = MultiRing::with_capacity(4, 2);
//! assert_eq!(ring.group_len(0), Ok(4));
//!
//! ring.set_group(2, 1)?;
//! assert_eq!(ring.group_len(0), Ok(3));
//! assert_eq!(ring.group_len(1), Ok(1));
//!
//! let visited: Vec<usize> = ring.iter_group(0)?.map(|(i, _)| i).collect();
//! assert_eq!(visited, [0, 1, 3]);
//!
//! // growth appends at the target group's tail; indices stay stable
//! ring.append_capacity(0, 2)?;
//! assert_eq!(ring.capacity(), 6);
//! let visited: Vec<usize> = ring.iter_group(0)?.map(|(i, _)| i).collect();
//! assert_eq!(visited, [0, 1, 3, 4, 5]);
//! # Ok::<(), multiring::RingError>(())
//! ```

extern crate alloc;

pub mod index;
pub mod ring;

mod group;
mod slot;

pub use crate::index::Capacity;
pub use crate::ring::{GroupCursor, GroupIter, MultiRing, RingError};
