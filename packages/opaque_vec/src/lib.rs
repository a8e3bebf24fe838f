#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A type-erased dynamic array for uniformly-sized elements.
//!
//! This crate provides [`OpaqueVec`], a contiguous, growable array that stores elements of any
//! type matching a [`std::alloc::Layout`] defined at construction time. Elements are opaque
//! byte blobs: the vec copies them in and out and never runs their drop glue, making it suited
//! to plain-old-data element types.
//!
//! This is part of the [Folo project](https://github.com/folo-rs/folo) that provides mechanisms
//! for high-performance hardware-aware programming in Rust.
//!
//! # Key features
//!
//! - **Type-erased storage**: any type matching the vec's layout, chosen at runtime
//! - **Power-of-two capacity management**: growth doubles the capacity, removal halves it when
//!   the vec is at most half full, and the capacity never drops below the floor set at
//!   construction
//! - **Two removal strategies**: [`remove_ordered()`][OpaqueVec::remove_ordered] preserves the
//!   relative order of the remaining elements at O(n) cost, while
//!   [`remove_unordered()`][OpaqueVec::remove_unordered] fills the hole with the last element
//!   in O(1)
//! - **Pointer-identity lookup**: [`index_of_ptr()`][OpaqueVec::index_of_ptr] translates a
//!   previously obtained element pointer back into its index via range and alignment checks,
//!   reporting the two failure modes as distinct errors
//! - **Borrowed iteration**: [`iter()`][OpaqueVec::iter] walks the elements through the
//!   unchecked lookup path while the borrow prevents mutation mid-iteration
//!
//! # Examples
//!
//! ```
//! use opaque_vec::OpaqueVec;
//!
//! let mut vec = OpaqueVec::builder().layout_of::<u32>().build();
//!
//! // SAFETY: u32 matches the layout used to create the vec.
//! unsafe { vec.push(3_u32) }.unwrap();
//! // SAFETY: u32 matches the layout used to create the vec.
//! unsafe { vec.push(1_u32) }.unwrap();
//! // SAFETY: u32 matches the layout used to create the vec.
//! unsafe { vec.push(4_u32) }.unwrap();
//!
//! // SAFETY: u32 matches the layout and the slot holds an initialized value.
//! assert_eq!(*unsafe { vec.get::<u32>(2) }.unwrap(), 4);
//!
//! // Constant-time removal: the last element fills the vacated slot.
//! vec.remove_unordered(0).unwrap();
//! // SAFETY: Same contract.
//! assert_eq!(*unsafe { vec.get::<u32>(0) }.unwrap(), 4);
//! ```
//!
//! Choosing a capacity floor sized for the expected population:
//!
//! ```
//! use new_zealand::nz;
//! use opaque_vec::OpaqueVec;
//!
//! let mut vec = OpaqueVec::builder().layout_of::<u64>().reserve(nz!(64)).build();
//!
//! for value in 0..100_u64 {
//!     // SAFETY: u64 matches the layout used to create the vec.
//!     unsafe { vec.push(value) }.unwrap();
//! }
//! assert_eq!(vec.capacity(), 128);
//!
//! // Clearing releases the growth but honors the floor.
//! vec.clear();
//! assert_eq!(vec.capacity(), 64);
//! ```

mod builder;
mod error;
mod iter;
mod vec;

pub use builder::*;
pub use error::*;
pub use iter::*;
pub use vec::OpaqueVec;
