//! Rawbridge Core - LibRaw decode bridge
//!
//! This crate drives LibRaw over its C API: it opens a RAW file, unpacks and
//! processes it, copies the processed raster out of native memory, wraps it
//! in a PPM container and decodes that into an image. It also exports the
//! processed raster and the embedded thumbnail to disk with LibRaw's own
//! writers.
//!
//! # Module Structure
//!
//! - `session` - native handles, diagnostics and the session pool
//! - `decode` - the in-memory decode pipeline and its data types
//! - `export` - idempotent `.ppm` / `_embedded.jpg` exports

pub mod decode;
pub mod export;
pub mod session;

pub use decode::{
    decode, decode_pooled, decode_with, decode_with_options, DecodeError, DecodeOptions,
    DecodedImage, ErrorPolicy, ShotMetadata,
};
pub use export::{export_embedded_thumbnail, export_raster, export_with, ExportKind};
pub use session::{DiagnosticSink, LibRaw, RawSession, SessionPool, Stage};
