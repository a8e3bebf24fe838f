use std::alloc::Layout;
use std::cell::Cell;
use std::marker::PhantomData;
use std::num::NonZero;

use new_zealand::nz;

use crate::OpaqueVec;

/// Capacity floor used when the builder is not given an explicit one.
const DEFAULT_RESERVE: NonZero<usize> = nz!(4);

/// Builder for creating an instance of [`OpaqueVec`].
///
/// [`OpaqueVec`] requires the item memory layout to be specified at construction time.
/// Use either `.layout()` to provide a specific layout or `.layout_of::<T>()` to generate
/// a layout based on the provided type.
///
/// The layout is mandatory, whereas other settings are optional.
///
/// # Examples
///
/// Using a specific layout:
///
/// ```
/// use std::alloc::Layout;
///
/// use opaque_vec::OpaqueVec;
///
/// let layout = Layout::new::<u32>();
/// let vec = OpaqueVec::builder().layout(layout).build();
/// ```
///
/// Using type-based layout with an explicit capacity floor:
///
/// ```
/// use new_zealand::nz;
/// use opaque_vec::OpaqueVec;
///
/// let vec = OpaqueVec::builder().layout_of::<u64>().reserve(nz!(16)).build();
///
/// assert_eq!(vec.capacity(), 16);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads,
/// allowing vec configuration to happen on different threads than where the vec is used.
/// However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
#[derive(Debug)]
#[must_use]
pub struct OpaqueVecBuilder {
    item_layout: Option<Layout>,
    reserve: NonZero<usize>,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl OpaqueVecBuilder {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            item_layout: None,
            reserve: DEFAULT_RESERVE,
            _not_sync: PhantomData,
        }
    }

    /// Sets the memory layout of the items stored in the vec.
    ///
    /// # Panics
    ///
    /// Panics if the layout has zero size.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::alloc::Layout;
    ///
    /// use opaque_vec::OpaqueVec;
    ///
    /// let layout = Layout::new::<u32>();
    /// let vec = OpaqueVec::builder().layout(layout).build();
    /// ```
    #[inline]
    pub fn layout(mut self, layout: Layout) -> Self {
        assert!(layout.size() > 0, "OpaqueVec must have non-zero item size");
        self.item_layout = Some(layout);
        self
    }

    /// Sets the memory layout of the items stored in the vec based on a type.
    ///
    /// This is a convenience method that automatically creates the layout for the given type.
    ///
    /// # Panics
    ///
    /// Panics if the type is zero-sized.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().layout_of::<u64>().build();
    /// ```
    #[inline]
    pub fn layout_of<T>(mut self) -> Self {
        let layout = Layout::new::<T>();
        assert!(layout.size() > 0, "OpaqueVec must have non-zero item size");
        self.item_layout = Some(layout);
        self
    }

    /// Sets the capacity floor of the vec, in slots. The default is 4.
    ///
    /// The vec starts with this capacity and never shrinks below it, no matter how many
    /// items are removed. A floor sized for the expected steady-state population avoids
    /// reallocation churn when the population repeatedly crosses a power-of-two boundary.
    ///
    /// # Panics
    ///
    /// Panics if the value is not a power of two. This is a precondition on the capacity
    /// management algorithm, which only ever doubles and halves the capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// use new_zealand::nz;
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().layout_of::<u32>().reserve(nz!(32)).build();
    ///
    /// assert_eq!(vec.capacity(), 32);
    /// ```
    #[inline]
    pub fn reserve(mut self, reserve: NonZero<usize>) -> Self {
        assert!(
            reserve.get().is_power_of_two(),
            "the capacity floor must be a power of two, got {reserve}"
        );
        self.reserve = reserve;
        self
    }

    /// Creates the vec, allocating its initial buffer at the capacity floor.
    ///
    /// # Panics
    ///
    /// Panics if no item layout has been set or if the initial allocation cannot be
    /// satisfied. Setup-time allocation failure is treated as fatal; only growth during
    /// normal operation is reported as a recoverable error.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().layout_of::<u32>().build();
    ///
    /// assert_eq!(vec.len(), 0);
    /// ```
    #[must_use]
    pub fn build(self) -> OpaqueVec {
        let item_layout = self
            .item_layout
            .expect("the item layout is mandatory - call layout() or layout_of() before build()");

        OpaqueVec::new_inner(item_layout, self.reserve)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(OpaqueVecBuilder: Send);
    assert_not_impl_any!(OpaqueVecBuilder: Sync);

    #[test]
    fn default_reserve_is_four() {
        let vec = OpaqueVec::builder().layout_of::<u32>().build();

        assert_eq!(vec.capacity(), 4);
        assert_eq!(vec.reserve(), 4);
    }

    #[test]
    #[should_panic]
    fn zero_size_layout_is_panic() {
        drop(OpaqueVec::builder().layout_of::<()>());
    }

    #[test]
    #[should_panic]
    fn non_power_of_two_reserve_is_panic() {
        drop(OpaqueVec::builder().layout_of::<u32>().reserve(nz!(3)));
    }

    #[test]
    #[should_panic]
    fn missing_layout_is_panic() {
        drop(OpaqueVec::builder().build());
    }

    #[test]
    fn reserve_of_one_is_accepted() {
        let vec = OpaqueVec::builder().layout_of::<u32>().reserve(nz!(1)).build();

        assert_eq!(vec.capacity(), 1);
    }
}
