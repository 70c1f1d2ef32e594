//! Traits and macros providing genericity over index types.
//!
//! Slot indices and group identifiers are stored inline in every slot, so
//! picking a narrow index type (e.g. `u16`) can meaningfully shrink a large
//! arena. The [`Capacity`] trait abstracts over the conversion to and from
//! `usize`, and [`index_type!`](crate::index_type) mints zero-cost newtypes
//! so that indices of unrelated rings cannot be mixed up.

use core::convert::TryInto;
use core::fmt::Debug;
use core::hash::Hash;

/// Two-way conversion between `Self` and `usize`.
///
/// # Safety
/// Implementors must ensure the conversion functions are each other's
/// inverse, i.e. `Capacity::from_usize(i).as_usize()` must either evaluate
/// to `i`, or panic, for all `usize` values. `MAX_REPRESENTABLE` must be the
/// largest value for which `from_usize` does not panic.
///
/// Using [`index_type!`](crate::index_type) should be preferred over
/// implementing this manually.
pub unsafe trait Capacity: Copy + Eq + Debug + Hash {
    /// The largest `usize` value that can round-trip through `Self`.
    const MAX_REPRESENTABLE: usize;
    /// Converts a `usize` into `Self`.
    fn from_usize(i: usize) -> Self;
    /// Converts `self` into `usize`.
    fn as_usize(&self) -> usize;
}

#[inline(never)]
#[cold]
#[track_caller]
fn index_value_out_of_range(i: usize) -> ! {
    panic!("called `from_usize` with value out of range (is {})", i)
}

unsafe impl Capacity for u8 {
    const MAX_REPRESENTABLE: usize = u8::MAX as usize;

    #[inline]
    #[track_caller]
    fn from_usize(i: usize) -> Self {
        if let Ok(t) = i.try_into() {
            t
        } else {
            index_value_out_of_range(i);
        }
    }

    #[inline]
    fn as_usize(&self) -> usize {
        (*self).into()
    }
}

unsafe impl Capacity for u16 {
    const MAX_REPRESENTABLE: usize = u16::MAX as usize;

    #[inline]
    #[track_caller]
    fn from_usize(i: usize) -> Self {
        if let Ok(t) = i.try_into() {
            t
        } else {
            index_value_out_of_range(i);
        }
    }

    #[inline]
    fn as_usize(&self) -> usize {
        (*self).into()
    }
}

unsafe impl Capacity for u32 {
    const MAX_REPRESENTABLE: usize = u32::MAX as usize;

    #[inline]
    #[track_caller]
    fn from_usize(i: usize) -> Self {
        if let Ok(t) = i.try_into() {
            t
        } else {
            index_value_out_of_range(i);
        }
    }

    #[inline]
    fn as_usize(&self) -> usize {
        *self as usize
    }
}

unsafe impl Capacity for usize {
    const MAX_REPRESENTABLE: usize = usize::MAX;

    #[inline]
    fn from_usize(i: usize) -> Self {
        i
    }

    #[inline]
    fn as_usize(&self) -> usize {
        *self
    }
}

/// Generates a newtype wrapping an implementor of [`Capacity`].
///
/// This can help in avoiding use of the wrong index with a
/// [`MultiRing`](crate::MultiRing).
///
/// # Examples
/// ```compile_fail
/// use multiring::{index_type, MultiRing};
///
/// index_type! { pub SpriteId: u16 };
/// index_type! { ParticleId: u16 };
///
/// let sprites = MultiRing::<u32, SpriteId>::with_capacity(100, 4);
/// let particles = MultiRing::<u32, ParticleId>::with_capacity(100, 4);
///
/// let s = sprites.get(SpriteId(10));
/// let p = particles.get(ParticleId(15));
/// let oops = sprites.get(ParticleId(25));
/// //         ^^^^^^^^^^^ expected `SpriteId`, found `ParticleId`
/// ```
#[macro_export]
macro_rules! index_type {
    ($v:vis $name:ident: $repr:ty) => {
        #[derive(
            core::marker::Copy,
            core::clone::Clone,
            core::default::Default,
            core::fmt::Debug,
            core::hash::Hash,
            core::cmp::PartialEq,
            core::cmp::Eq,
            core::cmp::PartialOrd,
            core::cmp::Ord)]
        $v struct $name($repr);

        unsafe impl $crate::index::Capacity for $name {
            const MAX_REPRESENTABLE: usize =
                <$repr as $crate::index::Capacity>::MAX_REPRESENTABLE;

            #[inline]
            #[track_caller]
            fn from_usize(i: usize) -> Self {
                Self(<$repr as $crate::index::Capacity>::from_usize(i))
            }

            #[inline]
            fn as_usize(&self) -> usize {
                <$repr as $crate::index::Capacity>::as_usize(&self.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_within_range() {
        assert_eq!(u8::from_usize(255).as_usize(), 255);
        assert_eq!(u16::from_usize(9999).as_usize(), 9999);
        assert_eq!(u32::from_usize(70_000).as_usize(), 70_000);
        assert_eq!(usize::from_usize(usize::MAX), usize::MAX);
    }

    #[test]
    #[should_panic]
    fn narrow_index_panics_out_of_range() {
        let _ = u8::from_usize(256);
    }

    #[test]
    fn newtype_indices() {
        index_type! { TestId: u16 }
        assert_eq!(TestId::MAX_REPRESENTABLE, u16::MAX as usize);
        assert_eq!(TestId::from_usize(42).as_usize(), 42);
    }
}
