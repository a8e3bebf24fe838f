use std::alloc::{Layout, alloc, dealloc, realloc};
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr;
use std::ptr::NonNull;

use new_zealand::nz;

use crate::{Error, Iter, OpaqueVecBuilder, Result};

/// A type-erased dynamic array of uniformly-sized elements.
///
/// `OpaqueVec` stores elements of any type that matches a [`std::alloc::Layout`] specified at
/// construction time, packed contiguously in a single buffer. The buffer grows by doubling when
/// full and opportunistically halves after removals, never shrinking below the capacity floor
/// established at construction.
///
/// # Key features
///
/// - **Type erasure**: store any type matching the vec's layout; elements are opaque byte blobs
/// - **Power-of-two capacity**: growth doubles, shrink halves, bounded below by the floor
/// - **Two removal strategies**: order-preserving (O(n)) and swap-with-last (O(1))
/// - **Pointer-identity lookup**: resolve a previously obtained element pointer back to its index
/// - **Borrowed views**: lookups return references, so a view cannot outlive the next mutation
///
/// # Element semantics
///
/// Elements are moved in and out as raw bytes. The vec never runs drop glue for its elements:
/// removing an element discards its bytes and dropping the vec frees the buffer without touching
/// the contents. Types with meaningful [`Drop`] implementations are therefore leaked if inserted;
/// the intended element types are plain-old-data values.
///
/// # View invalidation
///
/// References returned by [`get()`][Self::get], [`get_mut()`][Self::get_mut] and
/// [`emplace()`][Self::emplace] borrow the vec, so the borrow checker prevents holding one across
/// a mutating call. Raw pointers derived from such references carry no such protection: any
/// operation that reallocates the buffer (growth on insert, shrink after removal or clear)
/// invalidates them. Never retain a derived pointer across a mutating call.
///
/// # Examples
///
/// ```
/// use opaque_vec::OpaqueVec;
///
/// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
///
/// // SAFETY: u32 matches the layout used to create the vec.
/// unsafe { vec.push(3_u32) }.unwrap();
/// // SAFETY: u32 matches the layout used to create the vec.
/// unsafe { vec.push(1_u32) }.unwrap();
///
/// // SAFETY: u32 matches the layout and the slot holds an initialized value.
/// let first = unsafe { vec.get::<u32>(0) }.unwrap();
/// assert_eq!(*first, 3);
///
/// // Swap-with-last removal runs in constant time.
/// vec.remove_unordered(0).unwrap();
/// assert_eq!(vec.len(), 1);
/// ```
///
/// # Thread safety
///
/// The vec is thread-mobile ([`Send`]) and can be moved between threads, but it is not
/// thread-safe ([`Sync`]) and cannot be shared between threads without external synchronization.
#[derive(Debug)]
pub struct OpaqueVec {
    /// The memory layout of one element. We accept elements of any type as long as they
    /// match this layout.
    item_layout: Layout,

    /// Byte distance between consecutive slots: the item size padded to the item alignment,
    /// so that every slot starts on a properly aligned boundary.
    stride: NonZero<usize>,

    /// Capacity floor established at construction. Always a power of two; the capacity
    /// never shrinks below it.
    reserve: NonZero<usize>,

    /// Number of slots currently backing the buffer. Always a power of two and at least
    /// `reserve`. Only updated when the matching (re)allocation has succeeded, so exactly
    /// `capacity * stride` bytes are allocated at `ptr` at all times.
    capacity: NonZero<usize>,

    /// Number of logically valid elements, occupying slots `[0, length)`. The contents of
    /// slots `[length, capacity)` are unspecified.
    length: usize,

    /// Base pointer of the buffer. Exclusively owned; reallocated on growth and shrink.
    ptr: NonNull<u8>,
}

impl OpaqueVec {
    /// Creates a builder for configuring and constructing an [`OpaqueVec`].
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().layout_of::<u64>().build();
    /// assert!(vec.is_empty());
    /// ```
    #[must_use]
    #[inline]
    pub fn builder() -> OpaqueVecBuilder {
        OpaqueVecBuilder::new()
    }

    /// Creates a new vec with the specified item layout and capacity floor.
    ///
    /// # Panics
    ///
    /// Panics if the item layout has zero size, if the floor is not a power of two or if the
    /// initial allocation cannot be satisfied.
    #[must_use]
    pub(crate) fn new_inner(item_layout: Layout, reserve: NonZero<usize>) -> Self {
        assert!(
            item_layout.size() > 0,
            "OpaqueVec must have non-zero item size"
        );
        assert!(
            reserve.get().is_power_of_two(),
            "the capacity floor must be a power of two, got {reserve}"
        );

        let stride = NonZero::new(item_layout.pad_to_align().size())
            .expect("padding a non-zero-size layout cannot produce a zero-size layout");

        let buffer_layout = Self::buffer_layout_for(item_layout, stride, reserve);

        // SAFETY: The buffer layout has non-zero size because both the stride and the
        // capacity floor are non-zero.
        let ptr = NonNull::new(unsafe { alloc(buffer_layout) })
            .expect("we do not intend to handle initial allocation failure as a real possibility - OOM results in panic");

        Self {
            item_layout,
            stride,
            reserve,
            capacity: reserve,
            length: 0,
            ptr,
        }
    }

    /// The memory layout of the elements stored in this vec.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::alloc::Layout;
    ///
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// assert_eq!(vec.item_layout(), Layout::new::<u32>());
    /// ```
    #[must_use]
    pub fn item_layout(&self) -> Layout {
        self.item_layout
    }

    /// The number of elements in the vec.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// assert_eq!(vec.len(), 0);
    ///
    /// // SAFETY: u32 matches the layout used to create the vec.
    /// unsafe { vec.push(42_u32) }.unwrap();
    /// assert_eq!(vec.len(), 1);
    /// ```
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the vec contains no elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// assert!(vec.is_empty());
    /// ```
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to turn test drain loops into infinite loops.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The number of slots currently backing the buffer.
    ///
    /// Always a power of two and at least [`reserve()`][Self::reserve].
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// assert_eq!(vec.capacity(), 4);
    /// ```
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// The capacity floor established at construction.
    ///
    /// The capacity never shrinks below this value, no matter how many elements are removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use new_zealand::nz;
    /// use opaque_vec::OpaqueVec;
    ///
    /// let vec = OpaqueVec::builder().layout_of::<u32>().reserve(nz!(8)).build();
    /// assert_eq!(vec.reserve(), 8);
    /// ```
    #[must_use]
    pub fn reserve(&self) -> usize {
        self.reserve.get()
    }

    /// Appends an element to the end of the vec and returns its index.
    ///
    /// The value's bytes are moved into the slot at index [`len()`][Self::len]. If the vec is
    /// full, the capacity doubles first; a refused growth allocation leaves the vec unchanged
    /// and the value is not inserted.
    ///
    /// The returned index remains valid until a removal or [`clear()`][Self::clear] displaces
    /// the element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if the vec was full and the allocator refused to
    /// provide a larger buffer.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the layout of `T` matches the vec's item layout.
    /// In debug builds, this is checked with an assertion.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    ///
    /// // SAFETY: u32 matches the layout used to create the vec.
    /// let index = unsafe { vec.push(42_u32) }.unwrap();
    /// assert_eq!(index, 0);
    /// ```
    pub unsafe fn push<T>(&mut self, value: T) -> Result<usize> {
        #[cfg(debug_assertions)]
        {
            assert_eq!(
                Layout::new::<T>(),
                self.item_layout,
                "type layout mismatch: expected layout {:?}, got layout {:?}",
                self.item_layout,
                Layout::new::<T>()
            );
        }

        self.ensure_slot_available()?;

        let index = self.length;
        let slot = self.slot_ptr(index).cast::<T>();

        // SAFETY: The slot is within our allocation, properly aligned for T (the stride is a
        // multiple of the item alignment) and not aliased, as we hold an exclusive reference.
        unsafe {
            slot.write(value);
        }

        // Cannot overflow because length is bounded by capacity, which fits in memory.
        self.length = index.wrapping_add(1);

        Ok(index)
    }

    /// Reserves the slot at the end of the vec and returns it for in-place initialization.
    ///
    /// Like [`push()`][Self::push] but without copying a value in: the slot's previous
    /// contents are left as-is (no zeroing) and the caller is responsible for fully
    /// initializing it before reading the element back. The length is incremented, so the
    /// uninitialized slot is immediately part of the logical contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if the vec was full and the allocator refused to
    /// provide a larger buffer. No slot is reserved and the length is unchanged.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - The layout of `T` matches the vec's item layout.
    /// - The slot is fully initialized before the element is read through any other operation.
    ///
    /// In debug builds, the layout requirement is checked with an assertion.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    ///
    /// // SAFETY: u32 matches the layout used to create the vec.
    /// let slot = unsafe { vec.emplace::<u32>() }.unwrap();
    /// slot.write(7);
    ///
    /// assert_eq!(vec.len(), 1);
    /// ```
    pub unsafe fn emplace<T>(&mut self) -> Result<&mut MaybeUninit<T>> {
        #[cfg(debug_assertions)]
        {
            assert_eq!(
                Layout::new::<T>(),
                self.item_layout,
                "type layout mismatch: expected layout {:?}, got layout {:?}",
                self.item_layout,
                Layout::new::<T>()
            );
        }

        self.ensure_slot_available()?;

        let index = self.length;

        // Cannot overflow because length is bounded by capacity, which fits in memory.
        self.length = index.wrapping_add(1);

        let mut slot = self.slot_ptr(index).cast::<MaybeUninit<T>>();

        // SAFETY: The slot is within our allocation and properly aligned for T; MaybeUninit
        // places no validity requirement on the bytes. The borrow is tied to &mut self, so no
        // other access can observe the slot while the caller initializes it.
        Ok(unsafe { slot.as_mut() })
    }

    /// Appends an element initialized in place by a closure and returns its index.
    ///
    /// This is [`emplace()`][Self::emplace] with the initialization step folded in, which
    /// keeps the "must initialize before reading" obligation inside a single call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if the vec was full and the allocator refused to
    /// provide a larger buffer.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - The layout of `T` matches the vec's item layout.
    /// - The closure fully initializes the `MaybeUninit<T>` before returning.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u64>().build();
    ///
    /// // SAFETY: u64 matches the layout and the closure initializes the slot.
    /// let index = unsafe {
    ///     vec.emplace_with(|slot: &mut std::mem::MaybeUninit<u64>| {
    ///         slot.write(99);
    ///     })
    /// }
    /// .unwrap();
    ///
    /// assert_eq!(index, 0);
    /// ```
    pub unsafe fn emplace_with<T>(
        &mut self,
        f: impl FnOnce(&mut MaybeUninit<T>),
    ) -> Result<usize> {
        let index = self.length;

        // SAFETY: Forwarding the layout requirement to the caller; the initialization
        // requirement is discharged by calling the closure below.
        let slot = unsafe { self.emplace::<T>() }?;

        f(slot);

        Ok(index)
    }

    /// Returns a reference to the element at the given index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= len()`. The vec is not mutated and
    /// out-of-bounds indexes are never clamped.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - The layout of `T` matches the vec's item layout.
    /// - The slot at `index` holds an initialized value of type `T` (always the case unless
    ///   an [`emplace()`][Self::emplace] slot was left uninitialized).
    ///
    /// In debug builds, the layout requirement is checked with an assertion.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// // SAFETY: u32 matches the layout used to create the vec.
    /// unsafe { vec.push(42_u32) }.unwrap();
    ///
    /// // SAFETY: u32 matches the layout and the slot holds an initialized value.
    /// let value = unsafe { vec.get::<u32>(0) }.unwrap();
    /// assert_eq!(*value, 42);
    ///
    /// // SAFETY: Same contract; the index is past the end, so this reports an error.
    /// let missing = unsafe { vec.get::<u32>(1) };
    /// assert!(missing.is_err());
    /// ```
    pub unsafe fn get<T>(&self, index: usize) -> Result<&T> {
        if index >= self.length {
            return Err(Error::IndexOutOfBounds {
                index,
                length: self.length,
            });
        }

        // SAFETY: The bounds check above established index < length; the remaining
        // requirements are forwarded to the caller.
        Ok(unsafe { self.get_unchecked(index) })
    }

    /// Returns a mutable reference to the element at the given index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= len()`.
    ///
    /// # Safety
    ///
    /// Same contract as [`get()`][Self::get].
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// // SAFETY: u32 matches the layout used to create the vec.
    /// unsafe { vec.push(42_u32) }.unwrap();
    ///
    /// // SAFETY: u32 matches the layout and the slot holds an initialized value.
    /// let value = unsafe { vec.get_mut::<u32>(0) }.unwrap();
    /// *value = 43;
    ///
    /// // SAFETY: Same contract.
    /// assert_eq!(*unsafe { vec.get::<u32>(0) }.unwrap(), 43);
    /// ```
    pub unsafe fn get_mut<T>(&mut self, index: usize) -> Result<&mut T> {
        #[cfg(debug_assertions)]
        {
            assert_eq!(
                Layout::new::<T>(),
                self.item_layout,
                "type layout mismatch: expected layout {:?}, got layout {:?}",
                self.item_layout,
                Layout::new::<T>()
            );
        }

        if index >= self.length {
            return Err(Error::IndexOutOfBounds {
                index,
                length: self.length,
            });
        }

        let mut slot = self.slot_ptr(index).cast::<T>();

        // SAFETY: The bounds check above established index < length, so the slot holds an
        // initialized element (per the caller's contract); alignment follows from the stride
        // being a multiple of the item alignment. Exclusivity follows from &mut self.
        Ok(unsafe { slot.as_mut() })
    }

    /// Returns a reference to the element at the given index without checking bounds.
    ///
    /// This exists for iteration, where the loop bound has already established every index
    /// as valid; prefer [`get()`][Self::get] everywhere else.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - `index < len()` - this is only checked with a debug assertion.
    /// - The layout of `T` matches the vec's item layout.
    /// - The slot at `index` holds an initialized value of type `T`.
    ///
    /// Violating any of these is undefined behavior.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// // SAFETY: u32 matches the layout used to create the vec.
    /// unsafe { vec.push(42_u32) }.unwrap();
    ///
    /// for index in 0..vec.len() {
    ///     // SAFETY: The loop bound establishes index < len(); u32 matches the layout and
    ///     // every slot below len() holds an initialized value.
    ///     let value = unsafe { vec.get_unchecked::<u32>(index) };
    ///     assert_eq!(*value, 42);
    /// }
    /// ```
    #[must_use]
    pub unsafe fn get_unchecked<T>(&self, index: usize) -> &T {
        #[cfg(debug_assertions)]
        {
            assert_eq!(
                Layout::new::<T>(),
                self.item_layout,
                "type layout mismatch: expected layout {:?}, got layout {:?}",
                self.item_layout,
                Layout::new::<T>()
            );
        }

        debug_assert!(
            index < self.length,
            "index {index} out of bounds in unchecked lookup on a vec of length {}",
            self.length
        );

        let slot = self.slot_ptr(index).cast::<T>();

        // SAFETY: The caller guarantees index < length and that the slot holds an initialized
        // T; alignment follows from the stride being a multiple of the item alignment. The
        // borrow is tied to &self, so the element cannot be mutated while the reference lives.
        unsafe { slot.as_ref() }
    }

    /// Resolves a pointer previously obtained from this vec back to the element's index.
    ///
    /// Two checks run in order: the pointer must fall within the occupied region
    /// `[buffer, buffer + len() * stride)`, and its byte offset from the buffer start must be
    /// a multiple of the slot stride. The two failure modes are reported as distinct errors
    /// because they mean different things: an out-of-range pointer is a legitimate miss
    /// (e.g. the element was removed or the buffer reallocated), while a misaligned in-range
    /// pointer is caller misuse.
    ///
    /// This performs pure address arithmetic and never dereferences the pointer.
    ///
    /// Any operation that reallocates the buffer invalidates previously obtained pointers;
    /// resolving a stale pointer yields an arbitrary (but safely reported) result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PointerOutOfBounds`] if the pointer is outside the occupied region,
    /// or [`Error::PointerMisaligned`] if it is inside but not on a slot boundary.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::ptr::NonNull;
    ///
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// // SAFETY: u32 matches the layout used to create the vec.
    /// unsafe { vec.push(3_u32) }.unwrap();
    /// // SAFETY: u32 matches the layout used to create the vec.
    /// unsafe { vec.push(1_u32) }.unwrap();
    ///
    /// // SAFETY: u32 matches the layout and the slot holds an initialized value.
    /// let second = NonNull::from(unsafe { vec.get::<u32>(1) }.unwrap());
    ///
    /// assert_eq!(vec.index_of_ptr(second).unwrap(), 1);
    /// ```
    #[expect(
        clippy::arithmetic_side_effects,
        clippy::integer_division,
        reason = "the stride is non-zero by construction and the division only runs after the range check"
    )]
    pub fn index_of_ptr<T>(&self, ptr: NonNull<T>) -> Result<usize> {
        let base = self.ptr.addr().get();
        let addr = ptr.addr().get();

        let Some(offset) = addr.checked_sub(base) else {
            return Err(Error::PointerOutOfBounds);
        };

        // Cannot overflow because the occupied region fits in the allocated buffer.
        let occupied = self.length.wrapping_mul(self.stride.get());

        if offset >= occupied {
            return Err(Error::PointerOutOfBounds);
        }

        if offset % self.stride.get() != 0 {
            return Err(Error::PointerMisaligned {
                offset,
                stride: self.stride.get(),
            });
        }

        Ok(offset / self.stride.get())
    }

    /// Removes the element at the given index, preserving the relative order of the rest.
    ///
    /// All elements after `index` shift down by one slot in a single bulk move, costing
    /// O(`len()` − `index`) byte copies. When order does not matter, prefer
    /// [`remove_unordered()`][Self::remove_unordered], which runs in constant time.
    ///
    /// After the removal the capacity halves if the vec is at most half full and above its
    /// floor. A caveat follows from that: alternating removals and insertions right at a
    /// power-of-two boundary reallocate on every call, degrading a sequence of n such
    /// operations to O(n²) byte copies. Set the floor above the steady-state population to
    /// avoid the churn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= len()`. The vec is not mutated.
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
    /// vec.remove_ordered(0).unwrap();
    ///
    /// // The remaining elements kept their relative order.
    /// // SAFETY: u32 matches the layout and the slots hold initialized values.
    /// assert_eq!(*unsafe { vec.get::<u32>(0) }.unwrap(), 1);
    /// // SAFETY: Same contract.
    /// assert_eq!(*unsafe { vec.get::<u32>(1) }.unwrap(), 4);
    /// ```
    pub fn remove_ordered(&mut self, index: usize) -> Result<()> {
        if index >= self.length {
            return Err(Error::IndexOutOfBounds {
                index,
                length: self.length,
            });
        }

        // Number of elements after the removed one; exactly these shift down.
        // Cannot underflow because index < length.
        let tail = self.length.wrapping_sub(index).wrapping_sub(1);

        if tail > 0 {
            let src = self.slot_ptr(index.wrapping_add(1));
            let dst = self.slot_ptr(index);

            // Cannot overflow because the tail region fits in the allocated buffer.
            let bytes = tail.wrapping_mul(self.stride.get());

            // SAFETY: Both regions lie within the occupied part of our allocation and the
            // regions overlap, which ptr::copy permits.
            unsafe {
                ptr::copy(src.as_ptr(), dst.as_ptr(), bytes);
            }
        }

        // Cannot underflow because length > index >= 0.
        self.length = self.length.wrapping_sub(1);

        self.shrink_if_excessive();

        Ok(())
    }

    /// Removes the element at the given index in constant time, without preserving order.
    ///
    /// The removed slot is overwritten with the bytes of the last element, which therefore
    /// moves to `index`; all other elements stay where they are.
    ///
    /// After the removal the capacity halves if the vec is at most half full and above its
    /// floor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if `index >= len()`. The vec is not mutated.
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
    /// vec.remove_unordered(0).unwrap();
    ///
    /// // The former last element now occupies the vacated slot.
    /// // SAFETY: u32 matches the layout and the slots hold initialized values.
    /// assert_eq!(*unsafe { vec.get::<u32>(0) }.unwrap(), 4);
    /// // SAFETY: Same contract.
    /// assert_eq!(*unsafe { vec.get::<u32>(1) }.unwrap(), 1);
    /// ```
    pub fn remove_unordered(&mut self, index: usize) -> Result<()> {
        if index >= self.length {
            return Err(Error::IndexOutOfBounds {
                index,
                length: self.length,
            });
        }

        // Cannot underflow because length > index >= 0.
        let last = self.length.wrapping_sub(1);

        if index != last {
            let src = self.slot_ptr(last);
            let dst = self.slot_ptr(index);

            // SAFETY: Both slots lie within the occupied part of our allocation and are
            // distinct, so the regions cannot overlap.
            unsafe {
                ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), self.stride.get());
            }
        }

        self.length = last;

        self.shrink_if_excessive();

        Ok(())
    }

    /// Removes the element a previously obtained pointer refers to, preserving the relative
    /// order of the rest.
    ///
    /// The pointer is resolved via [`index_of_ptr()`][Self::index_of_ptr] and the element is
    /// then removed as by [`remove_ordered()`][Self::remove_ordered].
    ///
    /// # Errors
    ///
    /// Returns [`Error::PointerOutOfBounds`] or [`Error::PointerMisaligned`] if the pointer
    /// cannot be resolved to an index.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::ptr::NonNull;
    ///
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// for value in [3_u32, 1, 4] {
    ///     // SAFETY: u32 matches the layout used to create the vec.
    ///     unsafe { vec.push(value) }.unwrap();
    /// }
    ///
    /// // SAFETY: u32 matches the layout and the slot holds an initialized value.
    /// let middle = NonNull::from(unsafe { vec.get::<u32>(1) }.unwrap());
    /// vec.remove_ptr_ordered(middle).unwrap();
    ///
    /// assert_eq!(vec.len(), 2);
    /// // SAFETY: Same contract.
    /// assert_eq!(*unsafe { vec.get::<u32>(1) }.unwrap(), 4);
    /// ```
    pub fn remove_ptr_ordered<T>(&mut self, ptr: NonNull<T>) -> Result<()> {
        let index = self.index_of_ptr(ptr)?;
        self.remove_ordered(index)
    }

    /// Removes the element a previously obtained pointer refers to in constant time, without
    /// preserving order.
    ///
    /// The pointer is resolved via [`index_of_ptr()`][Self::index_of_ptr] and the element is
    /// then removed as by [`remove_unordered()`][Self::remove_unordered].
    ///
    /// # Errors
    ///
    /// Returns [`Error::PointerOutOfBounds`] or [`Error::PointerMisaligned`] if the pointer
    /// cannot be resolved to an index.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::ptr::NonNull;
    ///
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// for value in [3_u32, 1, 4] {
    ///     // SAFETY: u32 matches the layout used to create the vec.
    ///     unsafe { vec.push(value) }.unwrap();
    /// }
    ///
    /// // SAFETY: u32 matches the layout and the slot holds an initialized value.
    /// let first = NonNull::from(unsafe { vec.get::<u32>(0) }.unwrap());
    /// vec.remove_ptr_unordered(first).unwrap();
    ///
    /// // SAFETY: Same contract.
    /// assert_eq!(*unsafe { vec.get::<u32>(0) }.unwrap(), 4);
    /// ```
    pub fn remove_ptr_unordered<T>(&mut self, ptr: NonNull<T>) -> Result<()> {
        let index = self.index_of_ptr(ptr)?;
        self.remove_unordered(index)
    }

    /// Removes all elements and returns the capacity to the floor.
    ///
    /// Growth accumulated above the floor is released. Nothing needs copying at length zero,
    /// so this is a single reallocation; as with the post-removal shrink, a refused shrink
    /// reallocation is tolerated and the current capacity kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use opaque_vec::OpaqueVec;
    ///
    /// let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
    /// for value in 0..10_u32 {
    ///     // SAFETY: u32 matches the layout used to create the vec.
    ///     unsafe { vec.push(value) }.unwrap();
    /// }
    /// assert_eq!(vec.capacity(), 16);
    ///
    /// vec.clear();
    ///
    /// assert_eq!(vec.len(), 0);
    /// assert_eq!(vec.capacity(), vec.reserve());
    /// ```
    pub fn clear(&mut self) {
        self.length = 0;

        if self.capacity > self.reserve {
            match self.reallocate(self.reserve) {
                Ok(()) => {}
                Err(_) => {
                    // Shrinking is an optimization, not a correctness requirement; keep the
                    // oversized buffer and report the capacity we actually hold.
                }
            }
        }
    }

    /// Returns an iterator over the elements of the vec.
    ///
    /// The index range `[0, len())` is captured when the iterator is created; create a fresh
    /// iterator to observe later changes. The iterator borrows the vec, so the vec cannot be
    /// mutated while iteration is in progress.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - The layout of `T` matches the vec's item layout.
    /// - Every slot below `len()` holds an initialized value of type `T`.
    ///
    /// In debug builds, the layout requirement is checked with an assertion.
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
    /// let sum: u32 = unsafe { vec.iter::<u32>() }.sum();
    /// assert_eq!(sum, 8);
    /// ```
    #[must_use]
    pub unsafe fn iter<T>(&self) -> Iter<'_, T> {
        #[cfg(debug_assertions)]
        {
            assert_eq!(
                Layout::new::<T>(),
                self.item_layout,
                "type layout mismatch: expected layout {:?}, got layout {:?}",
                self.item_layout,
                Layout::new::<T>()
            );
        }

        Iter::new(self)
    }

    /// Grows the buffer if the next append has no free slot.
    fn ensure_slot_available(&mut self) -> Result<()> {
        if self.length == self.capacity.get() {
            self.grow()
        } else {
            Ok(())
        }
    }

    /// Doubles the capacity, reallocating the buffer.
    fn grow(&mut self) -> Result<()> {
        let new_capacity = self
            .capacity
            .checked_mul(nz!(2))
            .expect("doubling the capacity cannot overflow unless the buffer already spans half of virtual memory");

        self.reallocate(new_capacity)
    }

    /// Halves the capacity after a removal if the vec is at most half full and above its
    /// floor. A refused shrink reallocation is ignored; the removal's logical effect stands.
    fn shrink_if_excessive(&mut self) {
        if self.capacity <= self.reserve {
            return;
        }

        // Cannot reach zero because the capacity is a power of two above the floor.
        let half = NonZero::new(self.capacity.get() >> 1)
            .expect("halving a capacity above the floor cannot produce zero");

        if self.length > half.get() {
            return;
        }

        match self.reallocate(half) {
            Ok(()) => {}
            Err(_) => {
                // Shrinking is an optimization, not a correctness requirement; keep the
                // oversized buffer and report the capacity we actually hold.
            }
        }
    }

    /// Reallocates the buffer for a new capacity, updating the bookkeeping only on success.
    fn reallocate(&mut self, new_capacity: NonZero<usize>) -> Result<()> {
        let old_layout = Self::buffer_layout_for(self.item_layout, self.stride, self.capacity);
        let new_layout = Self::buffer_layout_for(self.item_layout, self.stride, new_capacity);

        // SAFETY: ptr was allocated via the global allocator with exactly old_layout and the
        // new size is non-zero and does not overflow isize (enforced by Layout).
        let new_ptr = unsafe { realloc(self.ptr.as_ptr(), old_layout, new_layout.size()) };

        match NonNull::new(new_ptr) {
            Some(ptr) => {
                self.ptr = ptr;
                self.capacity = new_capacity;
                Ok(())
            }
            // On failure the old buffer remains valid and untouched.
            None => Err(Error::AllocationFailed {
                bytes: new_layout.size(),
            }),
        }
    }

    /// Calculates the buffer layout for a given capacity.
    #[cfg_attr(test, mutants::skip)] // Mutations here corrupt allocation sizes, producing undefined behavior instead of clean test failures.
    fn buffer_layout_for(
        item_layout: Layout,
        stride: NonZero<usize>,
        capacity: NonZero<usize>,
    ) -> Layout {
        let bytes = stride
            .get()
            .checked_mul(capacity.get())
            .expect("buffer size calculation cannot overflow for capacities that fit in virtual memory");

        Layout::from_size_align(bytes, item_layout.align())
            .expect("buffer layout calculation cannot fail for a valid item layout")
    }

    /// Returns a pointer to the slot at the given index. The index must be below the
    /// capacity; the slot is not necessarily occupied.
    #[cfg_attr(test, mutants::skip)] // Mutations here corrupt pointer arithmetic, producing undefined behavior instead of clean test failures.
    fn slot_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(
            index < self.capacity.get(),
            "slot index {index} out of bounds for capacity {}",
            self.capacity
        );

        // Cannot overflow because the slot lies within the allocated buffer.
        let offset = index.wrapping_mul(self.stride.get());

        // SAFETY: The offset is within our allocation per the bounds check above.
        unsafe { self.ptr.add(offset) }
    }

    /// Verifies the capacity management invariants. Only used by tests.
    #[cfg(test)]
    pub(crate) fn integrity_check(&self) {
        assert!(
            self.capacity.get().is_power_of_two(),
            "capacity {} is not a power of two",
            self.capacity
        );
        assert!(
            self.capacity >= self.reserve,
            "capacity {} fell below the floor {}",
            self.capacity,
            self.reserve
        );
        assert!(
            self.length <= self.capacity.get(),
            "length {} exceeds capacity {}",
            self.length,
            self.capacity
        );
    }
}

impl Drop for OpaqueVec {
    fn drop(&mut self) {
        let layout = Self::buffer_layout_for(self.item_layout, self.stride, self.capacity);

        // SAFETY: ptr was allocated via the global allocator with exactly this layout, as
        // the capacity bookkeeping only changes when the matching reallocation succeeded.
        unsafe {
            dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

// SAFETY: The buffer is exclusively owned and elements are opaque byte blobs with no thread
// affinity, so moving the vec to another thread is sound.
unsafe impl Send for OpaqueVec {}
