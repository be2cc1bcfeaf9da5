//! Native decoder sessions.
//!
//! A session wraps one LibRaw handle. The decode and export pipelines are
//! written against the [`RawSession`] trait so the native library can be
//! swapped for a stub in tests.
//!
//! # Lifecycle
//!
//! Sessions are owned by the caller. Every pipeline run wraps its session in
//! a [`RecycleGuard`], so working buffers are released on every exit route.
//! [`LibRaw`] closes its handle when dropped. For reuse across many decodes,
//! check sessions out of a [`SessionPool`] instead of keeping a global.

mod diagnostics;
mod libraw;
mod pool;
#[cfg(test)]
pub(crate) mod stub;

use std::ffi::CStr;
use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::decode::{DecodeOptions, ImageHeader};

pub use diagnostics::{translate, CollectingSink, DiagnosticSink, StageDiagnostic, TracingSink};
pub use libraw::{LibRaw, LibRawMemImage};
pub(crate) use libraw::native_path;
pub use pool::{PooledSession, SessionPool};

/// A native pipeline stage that reports a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Open,
    Unpack,
    UnpackThumb,
    Process,
    MakeMemImage,
    WriteRaster,
    WriteThumbnail,
}

impl Stage {
    /// Short human-readable stage name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Open => "open",
            Stage::Unpack => "unpack",
            Stage::UnpackThumb => "unpack thumb",
            Stage::Process => "dcraw processing",
            Stage::MakeMemImage => "make mem image",
            Stage::WriteRaster => "save ppm",
            Stage::WriteThumbnail => "save thumb",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A processed image held in native memory.
///
/// Implementations release the native allocation on drop.
pub trait MemoryImage {
    /// The fixed header fields.
    fn header(&self) -> ImageHeader;

    /// The trailing data region, `header().data_size` bytes long.
    ///
    /// `None` when the image has no backing region to read from.
    fn data(&self) -> Option<&[u8]>;
}

/// Operations of a native RAW decoder session.
///
/// Status-returning methods follow the LibRaw convention: `0` is success,
/// anything else is a library-defined error code.
pub trait RawSession {
    type Image: MemoryImage;

    /// Apply processing parameters before a file is opened.
    fn configure(&mut self, options: &DecodeOptions);

    fn open_file(&mut self, path: &CStr) -> i32;

    fn unpack(&mut self) -> i32;

    fn unpack_thumb(&mut self) -> i32;

    /// Run demosaicing and the rest of the dcraw processing stage.
    fn process(&mut self) -> i32;

    /// Render the processed raster into memory.
    ///
    /// Returns the image (if any) together with the secondary error code.
    fn make_mem_image(&mut self) -> (Option<Self::Image>, i32);

    /// Write the processed raster with the library's own PPM/TIFF writer.
    fn write_raster(&mut self, path: &CStr) -> i32;

    /// Write the unpacked embedded thumbnail with the library's own writer.
    fn write_thumbnail(&mut self, path: &CStr) -> i32;

    /// Capture time from the "other parameters" block, in epoch seconds.
    fn capture_timestamp(&self) -> i64;

    /// Release working buffers, keeping the handle usable.
    fn recycle(&mut self);

    /// Render a status code with the library's own message table.
    fn describe(&self, code: i32) -> String;
}

/// Recycles the wrapped session when dropped.
pub struct RecycleGuard<'a, S: RawSession> {
    session: &'a mut S,
}

impl<'a, S: RawSession> RecycleGuard<'a, S> {
    pub fn new(session: &'a mut S) -> Self {
        Self { session }
    }
}

impl<S: RawSession> Deref for RecycleGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session
    }
}

impl<S: RawSession> DerefMut for RecycleGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session
    }
}

impl<S: RawSession> Drop for RecycleGuard<'_, S> {
    fn drop(&mut self) {
        self.session.recycle();
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubSession;
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Unpack.to_string(), "unpack");
        assert_eq!(Stage::Process.to_string(), "dcraw processing");
        assert_eq!(Stage::WriteThumbnail.to_string(), "save thumb");
    }

    #[test]
    fn test_recycle_guard_recycles_on_drop() {
        let mut session = StubSession::new();
        {
            let mut guard = RecycleGuard::new(&mut session);
            assert_eq!(guard.unpack(), 0);
        }
        assert_eq!(session.calls.recycle, 1);
        assert_eq!(session.calls.unpack, 1);
    }

    #[test]
    fn test_recycle_guard_recycles_on_early_return() {
        fn fails(session: &mut StubSession) -> Result<(), i32> {
            let mut guard = RecycleGuard::new(session);
            let code = guard.unpack();
            if code != 0 {
                return Err(code);
            }
            Ok(())
        }

        let mut session = StubSession::new().with_code(Stage::Unpack, -2);
        assert_eq!(fails(&mut session), Err(-2));
        assert_eq!(session.calls.recycle, 1);
    }
}
