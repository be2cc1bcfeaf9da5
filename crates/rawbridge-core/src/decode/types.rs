//! Core types for RAW decoding.

use std::path::PathBuf;

use image::{ColorType, DynamicImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::Stage;

/// Error types for RAW decoding and export operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The native library could not allocate a decoder handle.
    #[error("Failed to initialize LibRaw handle")]
    InitFailed,

    /// A native stage reported a nonzero status code.
    #[error("LibRaw {stage} failed with code {code}: {message}")]
    NativeStage {
        stage: Stage,
        code: i32,
        message: String,
    },

    /// The memory image reported a size its data region does not honor.
    #[error("Buffer extraction failed: expected {expected} bytes, got {actual}")]
    BufferExtraction { expected: usize, actual: usize },

    /// The native library produced no memory image to extract from.
    #[error("No processed image available")]
    MissingImage,

    /// The synthesized raster container could not be parsed.
    #[error("Raster container decode failed: {0}")]
    ContainerDecode(String),

    /// The path cannot be handed to the native library.
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    /// I/O error during path checks.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of data carried by a native memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageKind {
    /// Encoded JPEG stream (embedded thumbnails).
    Jpeg,
    /// Uncompressed interleaved samples.
    #[default]
    Bitmap,
    /// Any other tag value reported by the library.
    Unknown(u32),
}

impl From<u32> for ImageKind {
    fn from(value: u32) -> Self {
        match value {
            1 => ImageKind::Jpeg,
            2 => ImageKind::Bitmap,
            other => ImageKind::Unknown(other),
        }
    }
}

/// Fixed header of a native memory image.
///
/// The pixel data itself lives in a separate span of exactly `data_size`
/// bytes, see [`crate::session::MemoryImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageHeader {
    pub kind: ImageKind,
    pub height: u16,
    pub width: u16,
    /// Number of interleaved color channels.
    pub colors: u16,
    /// Bits per sample.
    pub bits: u16,
    /// Byte length of the trailing data region.
    pub data_size: u32,
}

/// An owned copy of the pixel bytes from a native memory image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPixelBuffer {
    pub width: u32,
    pub height: u32,
    pub colors: u16,
    pub bits: u16,
    pub data: Vec<u8>,
}

impl RawPixelBuffer {
    /// Create a buffer from a header and the bytes copied out of its span.
    pub fn from_header(header: &ImageHeader, data: Vec<u8>) -> Self {
        Self {
            width: u32::from(header.width),
            height: u32::from(header.height),
            colors: header.colors,
            bits: header.bits,
            data,
        }
    }

    /// Size of the pixel data in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Byte length implied by the dimensions, channel count and bit depth.
    pub fn expected_size(&self) -> usize {
        let bytes_per_sample = usize::from(self.bits).div_ceil(8);
        (self.width as usize) * (self.height as usize) * usize::from(self.colors) * bytes_per_sample
    }
}

/// Color model of a decoded raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorModel {
    Rgb8,
    Rgb16,
    Luma8,
    Luma16,
    Other,
}

impl From<ColorType> for ColorModel {
    fn from(value: ColorType) -> Self {
        match value {
            ColorType::Rgb8 => ColorModel::Rgb8,
            ColorType::Rgb16 => ColorModel::Rgb16,
            ColorType::L8 => ColorModel::Luma8,
            ColorType::L16 => ColorModel::Luma16,
            _ => ColorModel::Other,
        }
    }
}

/// A decoded image with its pixel grid.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Color model of the pixel grid.
    pub color: ColorModel,
    image: DynamicImage,
}

impl DecodedImage {
    /// Wrap a decoded `image::DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            color: ColorModel::from(image.color()),
            image,
        }
    }

    /// Borrow the underlying pixel grid.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Take ownership of the underlying pixel grid.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Convert to 8-bit RGB for further processing.
    pub fn to_rgb8(&self) -> image::RgbImage {
        self.image.to_rgb8()
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Get the size of the pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.image.as_bytes().len()
    }
}

/// Shot metadata read from the native handle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShotMetadata {
    /// Capture time as seconds since the Unix epoch.
    pub capture_timestamp: i64,
    /// Capture time formatted as `YYYY-MM-DDTHH:MM:SS` (UTC).
    pub capture_date_time: String,
}
