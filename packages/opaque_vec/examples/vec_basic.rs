//! Basic usage example for `OpaqueVec`.
//!
//! This example demonstrates pushing, reading and iterating over elements of a
//! type-erased vec, and how the power-of-two capacity tracks the population.

use opaque_vec::OpaqueVec;

fn main() {
    // Create a vec for u32 values. The default capacity floor is 4 slots.
    let mut vec = OpaqueVec::builder().layout_of::<u32>().build();

    println!("Created OpaqueVec with capacity: {}", vec.capacity());

    for value in [0xdead_beef_u32, 0xcafe_babe, 0xfeed_face, 0x0bad_f00d, 0xb01d_face] {
        // SAFETY: u32 matches the layout used to create the vec.
        let index = unsafe { vec.push(value) }.expect("allocation failed");
        println!("Pushed {value:#x} at index {index}");
    }

    // The fifth push doubled the capacity from 4 to 8.
    println!("Length: {}, capacity: {}", vec.len(), vec.capacity());

    // Read one element back through a bounds-checked lookup.
    // SAFETY: u32 matches the layout and the slot holds an initialized value.
    let third = unsafe { vec.get::<u32>(2) }.expect("index is in bounds");
    println!("Element at index 2: {third:#x}");

    // Iterate over everything. The borrow prevents mutation while iterating.
    // SAFETY: u32 matches the layout and every slot holds an initialized value.
    for (index, value) in unsafe { vec.iter::<u32>() }.enumerate() {
        println!("[{index}] = {value:#x}");
    }

    // Clearing resets the length and returns the capacity to the floor.
    vec.clear();
    println!(
        "After clear - length: {}, capacity: {}",
        vec.len(),
        vec.capacity()
    );
}
