use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::OpaqueVec;

/// A borrowed iterator over the elements of an [`OpaqueVec`].
///
/// Created by [`OpaqueVec::iter()`]. The index range `[0, len())` is captured at creation,
/// and the iterator holds a shared borrow of the vec, so the vec cannot be mutated while
/// iteration is in progress. To observe later changes, create a fresh iterator.
///
/// Lookups go through the unchecked path because the captured range already established
/// every index as valid.
///
/// # Examples
///
/// ```
/// use opaque_vec::OpaqueVec;
///
/// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
/// for value in [3_u32, 1, 4] {
///     // SAFETY: u32 matches the layout used to create the vec.
///     unsafe { vec.push(value) }.unwrap();
/// }
///
/// // SAFETY: u32 matches the layout and every slot holds an initialized value.
/// let collected: Vec<u32> = unsafe { vec.iter::<u32>() }.copied().collect();
/// assert_eq!(collected, [3, 1, 4]);
/// ```
#[must_use]
pub struct Iter<'v, T> {
    vec: &'v OpaqueVec,

    /// Index of the next element to yield from the front.
    front: usize,

    /// One past the index of the next element to yield from the back. Captured from the
    /// vec's length at creation; `front == back` means the iterator is exhausted.
    back: usize,

    _items: PhantomData<&'v T>,
}

impl<'v, T> Iter<'v, T> {
    /// Creates an iterator over the current index range of the vec.
    ///
    /// The layout and initialization contract is enforced by the caller of
    /// [`OpaqueVec::iter()`], which is the only way to obtain an instance.
    pub(crate) fn new(vec: &'v OpaqueVec) -> Self {
        Self {
            vec,
            front: 0,
            back: vec.len(),
            _items: PhantomData,
        }
    }
}

impl<'v, T> Iterator for Iter<'v, T> {
    type Item = &'v T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        let index = self.front;

        // Cannot overflow because front is bounded by back, which fits in memory.
        self.front = index.wrapping_add(1);

        // SAFETY: index < back <= the vec's length (the length cannot have changed, as we
        // hold a borrow of the vec); the layout and initialization requirements were
        // accepted by the caller of OpaqueVec::iter().
        Some(unsafe { self.vec.get_unchecked(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len();
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        // Cannot underflow because back > front >= 0.
        let index = self.back.wrapping_sub(1);
        self.back = index;

        // SAFETY: index < the captured length and the vec cannot have shrunk while borrowed;
        // the layout and initialization requirements were accepted by the caller of
        // OpaqueVec::iter().
        Some(unsafe { self.vec.get_unchecked(index) })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {
    fn len(&self) -> usize {
        // Cannot underflow because front never exceeds back.
        self.back.wrapping_sub(self.front)
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("front", &self.front)
            .field("back", &self.back)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn vec_of(values: &[u32]) -> OpaqueVec {
        let mut vec = OpaqueVec::builder().layout_of::<u32>().build();

        for value in values {
            // SAFETY: u32 matches the layout used to create the vec.
            unsafe { vec.push(*value) }.unwrap();
        }

        vec
    }

    #[test]
    fn yields_elements_in_order() {
        let vec = vec_of(&[3, 1, 4, 1, 5]);

        // SAFETY: u32 matches the layout and every slot holds an initialized value.
        let collected: Vec<u32> = unsafe { vec.iter::<u32>() }.copied().collect();

        assert_eq!(collected, [3, 1, 4, 1, 5]);
    }

    #[test]
    fn empty_vec_yields_nothing() {
        let vec = OpaqueVec::builder().layout_of::<u32>().build();

        // SAFETY: u32 matches the layout; there are no slots to read.
        let mut iter = unsafe { vec.iter::<u32>() };

        assert_eq!(iter.len(), 0);
        assert!(iter.next().is_none());
        // Remains exhausted on repeated calls.
        assert!(iter.next().is_none());
    }

    #[test]
    fn reports_exact_length() {
        let vec = vec_of(&[3, 1, 4]);

        // SAFETY: u32 matches the layout and every slot holds an initialized value.
        let mut iter = unsafe { vec.iter::<u32>() };

        assert_eq!(iter.len(), 3);
        assert_eq!(iter.size_hint(), (3, Some(3)));

        iter.next();
        assert_eq!(iter.len(), 2);
    }

    #[test]
    fn iterates_from_both_ends() {
        let vec = vec_of(&[3, 1, 4]);

        // SAFETY: u32 matches the layout and every slot holds an initialized value.
        let mut iter = unsafe { vec.iter::<u32>() };

        assert_eq!(iter.next().copied(), Some(3));
        assert_eq!(iter.next_back().copied(), Some(4));
        assert_eq!(iter.next().copied(), Some(1));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn fresh_iterator_observes_mutations() {
        let mut vec = vec_of(&[3, 1, 4]);

        vec.remove_ordered(0).unwrap();

        // SAFETY: u32 matches the layout and every slot holds an initialized value.
        let collected: Vec<u32> = unsafe { vec.iter::<u32>() }.copied().collect();

        assert_eq!(collected, [1, 4]);
    }

    #[test]
    fn debug_output_names_the_range() {
        let vec = vec_of(&[3, 1]);

        // SAFETY: u32 matches the layout and every slot holds an initialized value.
        let iter = unsafe { vec.iter::<u32>() };

        let rendered = format!("{iter:?}");
        assert!(rendered.contains("Iter"));
    }
}
