//! In-memory stand-in for a native session, used by unit tests.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use super::{MemoryImage, RawSession, Stage};
use crate::decode::{DecodeOptions, ImageHeader, ImageKind};

/// Per-method call counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub configure: usize,
    pub open: usize,
    pub unpack: usize,
    pub unpack_thumb: usize,
    pub process: usize,
    pub make_mem_image: usize,
    pub write_raster: usize,
    pub write_thumbnail: usize,
    pub recycle: usize,
}

impl CallCounts {
    /// Number of calls that would touch the native library.
    pub fn native_calls(&self) -> usize {
        self.configure
            + self.open
            + self.unpack
            + self.unpack_thumb
            + self.process
            + self.make_mem_image
            + self.write_raster
            + self.write_thumbnail
            + self.recycle
    }
}

/// Memory image backed by a plain vector.
pub struct StubImage {
    pub header: ImageHeader,
    pub data: Option<Vec<u8>>,
    released: Rc<Cell<usize>>,
}

impl StubImage {
    /// An 8-bit RGB image filled with a position-dependent pattern.
    pub fn rgb8(width: u16, height: u16) -> Self {
        let len = usize::from(width) * usize::from(height) * 3;
        let data = (0..len).map(|i| (i % 256) as u8).collect::<Vec<_>>();
        Self::with_data(
            ImageHeader {
                kind: ImageKind::Bitmap,
                height,
                width,
                colors: 3,
                bits: 8,
                data_size: len as u32,
            },
            Some(data),
        )
    }

    pub fn with_data(header: ImageHeader, data: Option<Vec<u8>>) -> Self {
        Self {
            header,
            data,
            released: Rc::new(Cell::new(0)),
        }
    }
}

impl MemoryImage for StubImage {
    fn header(&self) -> ImageHeader {
        self.header
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

impl Drop for StubImage {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

/// A session whose stage codes and outputs are scripted by the test.
pub struct StubSession {
    pub calls: CallCounts,
    pub codes: HashMap<Stage, i32>,
    pub image: Option<(u16, u16)>,
    pub timestamp: i64,
    pub opened: Option<CString>,
    pub options: Option<DecodeOptions>,
    /// Number of memory images released so far.
    pub released: Rc<Cell<usize>>,
}

impl StubSession {
    pub fn new() -> Self {
        Self {
            calls: CallCounts::default(),
            codes: HashMap::new(),
            image: Some((4, 3)),
            timestamp: 0,
            opened: None,
            options: None,
            released: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_code(mut self, stage: Stage, code: i32) -> Self {
        self.codes.insert(stage, code);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn without_image(mut self) -> Self {
        self.image = None;
        self
    }

    fn code(&self, stage: Stage) -> i32 {
        self.codes.get(&stage).copied().unwrap_or(0)
    }

    fn write_marker(&self, stage: Stage, path: &CStr, contents: &[u8]) -> i32 {
        let code = self.code(stage);
        if code == 0 {
            let path = PathBuf::from(path.to_string_lossy().into_owned());
            fs::write(path, contents).expect("stub writer failed");
        }
        code
    }
}

impl RawSession for StubSession {
    type Image = StubImage;

    fn configure(&mut self, options: &DecodeOptions) {
        self.calls.configure += 1;
        self.options = Some(options.clone());
    }

    fn open_file(&mut self, path: &CStr) -> i32 {
        self.calls.open += 1;
        self.opened = Some(path.to_owned());
        self.code(Stage::Open)
    }

    fn unpack(&mut self) -> i32 {
        self.calls.unpack += 1;
        self.code(Stage::Unpack)
    }

    fn unpack_thumb(&mut self) -> i32 {
        self.calls.unpack_thumb += 1;
        self.code(Stage::UnpackThumb)
    }

    fn process(&mut self) -> i32 {
        self.calls.process += 1;
        self.code(Stage::Process)
    }

    fn make_mem_image(&mut self) -> (Option<StubImage>, i32) {
        self.calls.make_mem_image += 1;
        let image = self.image.map(|(w, h)| {
            let mut image = StubImage::rgb8(w, h);
            image.released = Rc::clone(&self.released);
            image
        });
        (image, self.code(Stage::MakeMemImage))
    }

    fn write_raster(&mut self, path: &CStr) -> i32 {
        self.calls.write_raster += 1;
        self.write_marker(Stage::WriteRaster, path, b"P6\n1 1\n255\n\0\0\0")
    }

    fn write_thumbnail(&mut self, path: &CStr) -> i32 {
        self.calls.write_thumbnail += 1;
        self.write_marker(Stage::WriteThumbnail, path, &[0xFF, 0xD8, 0xFF, 0xD9])
    }

    fn capture_timestamp(&self) -> i64 {
        self.timestamp
    }

    fn recycle(&mut self) {
        self.calls.recycle += 1;
    }

    fn describe(&self, code: i32) -> String {
        format!("stub error {code}")
    }
}
