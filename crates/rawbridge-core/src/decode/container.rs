//! Binary PPM container used to hand pixels to the raster decoder.
//!
//! The container is `"P6\n<width> <height>\n<maxval>\n"` followed directly by
//! the pixel bytes, with `maxval = 2^bits - 1`.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use super::{DecodeError, DecodedImage, RawPixelBuffer};

/// Magic number of a binary RGB PPM.
pub const PPM_MAGIC: &str = "P6";

/// Largest sample value representable with `bits` bits.
#[inline]
pub fn max_sample_value(bits: u16) -> u64 {
    1u64.checked_shl(u32::from(bits))
        .map_or(u64::MAX, |v| v - 1)
}

/// Format the container header for the given dimensions and bit depth.
pub fn container_header(width: u32, height: u32, bits: u16) -> String {
    format!(
        "{PPM_MAGIC}\n{width} {height}\n{}\n",
        max_sample_value(bits)
    )
}

/// Wrap a pixel buffer into a binary PPM container.
pub fn synthesize(buffer: &RawPixelBuffer) -> Vec<u8> {
    let header = container_header(buffer.width, buffer.height, buffer.bits);
    let mut container = Vec::with_capacity(header.len() + buffer.data.len());
    container.extend_from_slice(header.as_bytes());
    container.extend_from_slice(&buffer.data);
    container
}

/// Decode a binary PPM container into a structured image.
///
/// # Errors
///
/// Returns `DecodeError::ContainerDecode` if the header is malformed or the
/// body is shorter than the header promises.
pub fn decode_container(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let img = ImageReader::with_format(Cursor::new(bytes), ImageFormat::Pnm)
        .decode()
        .map_err(|e| DecodeError::ContainerDecode(e.to_string()))?;

    Ok(DecodedImage::from_dynamic(img))
}


// ============================================================================
// Property-Based Tests
// ============================================================================
