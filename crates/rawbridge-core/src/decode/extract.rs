//! Copying pixel data out of a native memory image.
//!
//! The native struct ends in a variable-length data region whose real size
//! is only known from the `data_size` header field. The copy is a single
//! bulk copy bounded by that field; nothing is read past it.

use super::{DecodeError, RawPixelBuffer};
use crate::session::MemoryImage;

/// Copy the data region of `image` into an owned [`RawPixelBuffer`].
///
/// # Errors
///
/// Returns `DecodeError::BufferExtraction` if the data region is missing or
/// its length disagrees with the header's `data_size`. No partial buffer is
/// ever returned.
pub fn extract_buffer<M: MemoryImage + ?Sized>(image: &M) -> Result<RawPixelBuffer, DecodeError> {
    let header = image.header();
    let expected = header.data_size as usize;

    let span = match image.data() {
        Some(span) => span,
        None if expected == 0 => &[],
        None => {
            return Err(DecodeError::BufferExtraction {
                expected,
                actual: 0,
            })
        }
    };

    if span.len() != expected {
        return Err(DecodeError::BufferExtraction {
            expected,
            actual: span.len(),
        });
    }

    Ok(RawPixelBuffer::from_header(&header, span.to_vec()))
}
