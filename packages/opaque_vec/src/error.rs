use thiserror::Error;

/// Errors that can occur when operating on an [`OpaqueVec`][crate::OpaqueVec].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller provided an index at or past the end of the vec.
    ///
    /// Indexes are never clamped - an index is either within `[0, len)` or it is an error.
    #[error("index {index} is out of bounds for a vec of length {length}")]
    IndexOutOfBounds {
        /// The index that was requested.
        index: usize,

        /// The length of the vec at the time of the request.
        length: usize,
    },

    /// The caller provided a pointer that does not fall within the occupied region of the
    /// vec's buffer.
    ///
    /// Only pointers previously obtained from this vec, and not retained across a
    /// reallocation, can be resolved back to an index.
    #[error("pointer does not fall within the occupied region of the vec")]
    PointerOutOfBounds,

    /// The caller provided a pointer that falls within the occupied region of the vec's
    /// buffer but does not point at the start of a slot.
    ///
    /// This indicates caller misuse (e.g. a pointer into the middle of an element), which is
    /// why it is reported separately from a plain out-of-bounds miss.
    #[error("pointer offset {offset} from the buffer start is not a multiple of the {stride} byte slot stride")]
    PointerMisaligned {
        /// Byte offset of the pointer from the start of the buffer.
        offset: usize,

        /// Byte distance between consecutive slots.
        stride: usize,
    },

    /// The allocator refused to provide a larger buffer when the vec needed to grow.
    ///
    /// The operation that triggered the growth has no effect: the vec remains in its
    /// previous valid state and the item was not inserted.
    #[error("the allocator could not provide a buffer of {bytes} bytes")]
    AllocationFailed {
        /// Size of the refused allocation request.
        bytes: usize,
    },
}

/// A specialized `Result` type for `opaque_vec` operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn out_of_bounds_is_error() {
        let error = Error::IndexOutOfBounds {
            index: 5,
            length: 3,
        };

        // Verify it is a valid Error that can be used in Result context.
        let result: Result<()> = Err(error);
        assert!(result.is_err());
    }

    #[test]
    fn misaligned_message_names_offset_and_stride() {
        let error = Error::PointerMisaligned {
            offset: 6,
            stride: 4,
        };

        let message = error.to_string();
        assert!(message.contains('6'));
        assert!(message.contains('4'));
    }
}
