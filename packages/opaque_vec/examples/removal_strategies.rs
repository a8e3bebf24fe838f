//! Demonstrates the two removal strategies of `OpaqueVec` and pointer-identity removal.
//!
//! Ordered removal preserves the relative order of the remaining elements at O(n) cost;
//! unordered removal fills the hole with the last element in O(1). Both are also available
//! in pointer-based forms that first resolve an element pointer back to its index.

use std::ptr::NonNull;

use opaque_vec::OpaqueVec;

fn print_contents(label: &str, vec: &OpaqueVec) {
    // SAFETY: u32 matches the layout and every slot holds an initialized value.
    let contents: Vec<u32> = unsafe { vec.iter::<u32>() }.copied().collect();
    println!("{label}: {contents:?} (capacity {})", vec.capacity());
}

fn main() {
    let mut vec = OpaqueVec::builder().layout_of::<u32>().build();

    for value in [10_u32, 20, 30, 40, 50] {
        // SAFETY: u32 matches the layout used to create the vec.
        unsafe { vec.push(value) }.expect("allocation failed");
    }

    print_contents("Initial", &vec);

    // Ordered removal shifts everything after the removed slot down by one.
    vec.remove_ordered(1).expect("index is in bounds");
    print_contents("After remove_ordered(1)", &vec);

    // Unordered removal moves the last element into the vacated slot instead.
    vec.remove_unordered(0).expect("index is in bounds");
    print_contents("After remove_unordered(0)", &vec);

    // Pointer-identity removal: resolve a previously obtained pointer to its index, then
    // remove. Useful when an element was located by value rather than by position.
    // SAFETY: u32 matches the layout and the slot holds an initialized value.
    let target = NonNull::from(unsafe { vec.get::<u32>(1) }.expect("index is in bounds"));
    let resolved = vec.index_of_ptr(target).expect("pointer is valid");
    println!("Resolved pointer to index: {resolved}");

    vec.remove_ptr_unordered(target).expect("pointer is valid");
    print_contents("After remove_ptr_unordered", &vec);

    // A pointer into the middle of an element is caller misuse and reported distinctly
    // from a plain out-of-bounds miss.
    // SAFETY: u32 matches the layout and the slot holds an initialized value.
    let base = NonNull::from(unsafe { vec.get::<u32>(0) }.expect("index is in bounds"));
    let inside = NonNull::new(base.as_ptr().cast::<u8>().wrapping_add(1)).expect("non-null");

    match vec.index_of_ptr(inside) {
        Err(error) => println!("Misaligned pointer rejected: {error}"),
        Ok(index) => println!("Unexpectedly resolved to index {index}"),
    }
}
