//! RAW decoding pipeline for rawbridge.
//!
//! This module provides functionality for:
//! - Decoding RAW files through LibRaw (unpack, then demosaic/process)
//! - Copying LibRaw's in-memory image into an owned pixel buffer
//! - Wrapping that buffer in a binary PPM container and decoding it
//! - Reading the capture timestamp of the shot
//!
//! # Architecture
//!
//! All operations are synchronous and run on the calling thread. The
//! pipeline is generic over [`crate::session::RawSession`], so the same code
//! drives a real LibRaw handle or a test double.
//!
//! # Error Policy
//!
//! LibRaw reports failures as integer status codes. By default the pipeline
//! stops at the first nonzero code ([`ErrorPolicy::FailFast`]).
//! [`ErrorPolicy::BestEffort`] reports every failure and keeps going, which
//! can still yield an image for files LibRaw only partially understands.
//!
//! # Examples
//!
//! ```ignore
//! use rawbridge_core::decode::decode;
//!
//! let (image, meta) = decode("DSC01234.ARW").unwrap();
//! println!("Decoded {}x{} image shot at {}", image.width, image.height, meta.capture_date_time);
//! ```

mod container;
mod extract;
mod metadata;
mod options;
mod pipeline;
mod types;

pub use container::{container_header, decode_container, max_sample_value, synthesize, PPM_MAGIC};
pub use extract::extract_buffer;
pub use metadata::{extract_metadata, DATE_TIME_FORMAT};
pub use options::{DecodeOptions, ErrorPolicy};
pub use pipeline::{decode, decode_pooled, decode_with, decode_with_options};
pub(crate) use pipeline::StageCheck;
pub use types::{
    ColorModel, DecodeError, DecodedImage, ImageHeader, ImageKind, RawPixelBuffer, ShotMetadata,
};
