//! LibRaw-backed session and memory image.

use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr::{addr_of, NonNull};
use std::slice;

use libraw_sys as sys;

use super::{MemoryImage, RawSession};
use crate::decode::{DecodeError, DecodeOptions, ImageHeader, ImageKind};

/// Output bit depth requested from LibRaw.
///
/// The memory image is native-endian; at 8 bits per sample it is a valid
/// binary PPM body as-is.
const OUTPUT_BPS: i32 = 8;

/// LibRaw's demosaic default (AHD, chosen by the library).
const DEFAULT_DEMOSAIC: i32 = -1;

/// LibRaw's highlight mode default (clip).
const DEFAULT_HIGHLIGHT: i32 = 0;

extern "C" {
    // Part of the LibRaw C API since 0.19, not declared by libraw-sys.
    fn libraw_get_imgother(lr: *mut sys::libraw_data_t) -> *mut sys::libraw_imgother_t;
}

/// Values handed to LibRaw's parameter setters.
///
/// Every field is written on every configure, so a recycled handle never
/// keeps a previous run's settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NativeParams {
    output_bps: i32,
    demosaic: i32,
    no_auto_bright: i32,
    highlight: i32,
}

impl From<&DecodeOptions> for NativeParams {
    fn from(options: &DecodeOptions) -> Self {
        Self {
            output_bps: OUTPUT_BPS,
            demosaic: options.demosaic.unwrap_or(DEFAULT_DEMOSAIC),
            no_auto_bright: i32::from(options.no_auto_bright),
            highlight: options.highlight.unwrap_or(DEFAULT_HIGHLIGHT),
        }
    }
}

impl NativeParams {
    /// Write through the C setters; the struct layout stays on the C side.
    fn apply(self, lr: *mut sys::libraw_data_t) {
        // SAFETY: lr is a live handle owned by the caller.
        unsafe {
            sys::libraw_set_output_bps(lr, self.output_bps);
            sys::libraw_set_demosaic(lr, self.demosaic);
            sys::libraw_set_no_auto_bright(lr, self.no_auto_bright);
            sys::libraw_set_highlight(lr, self.highlight);
        }
    }
}

/// An owned LibRaw handle. Closed on drop.
#[derive(Debug)]
pub struct LibRaw {
    inner: NonNull<sys::libraw_data_t>,
}

// SAFETY: LibRaw owns the handle exclusively. Separate handles may be used
// from separate threads; a single handle is never shared (`!Sync`).
unsafe impl Send for LibRaw {}

impl LibRaw {
    /// Allocate a fresh handle.
    pub fn new() -> Result<Self, DecodeError> {
        // SAFETY: libraw_init returns a valid handle or null on failure.
        let ptr = unsafe { sys::libraw_init(0) };
        let inner = NonNull::new(ptr).ok_or(DecodeError::InitFailed)?;
        tracing::debug!("libraw handle initialized");
        Ok(Self { inner })
    }

    fn as_ptr(&self) -> *mut sys::libraw_data_t {
        self.inner.as_ptr()
    }
}

impl Drop for LibRaw {
    fn drop(&mut self) {
        // SAFETY: we own this pointer and it was allocated by libraw_init.
        unsafe { sys::libraw_close(self.as_ptr()) };
    }
}

impl RawSession for LibRaw {
    type Image = LibRawMemImage;

    fn configure(&mut self, options: &DecodeOptions) {
        NativeParams::from(options).apply(self.as_ptr());
    }

    fn open_file(&mut self, path: &CStr) -> i32 {
        // SAFETY: handle is valid, path is a NUL-terminated string that
        // outlives the call.
        unsafe { sys::libraw_open_file(self.as_ptr(), path.as_ptr()) }
    }

    fn unpack(&mut self) -> i32 {
        // SAFETY: handle is valid.
        unsafe { sys::libraw_unpack(self.as_ptr()) }
    }

    fn unpack_thumb(&mut self) -> i32 {
        // SAFETY: handle is valid.
        unsafe { sys::libraw_unpack_thumb(self.as_ptr()) }
    }

    fn process(&mut self) -> i32 {
        // SAFETY: handle is valid.
        unsafe { sys::libraw_dcraw_process(self.as_ptr()) }
    }

    fn make_mem_image(&mut self) -> (Option<LibRawMemImage>, i32) {
        let mut errc: i32 = 0;
        // SAFETY: handle is valid, errc outlives the call.
        let ptr = unsafe { sys::libraw_dcraw_make_mem_image(self.as_ptr(), &mut errc) };
        (NonNull::new(ptr).map(|inner| LibRawMemImage { inner }), errc)
    }

    fn write_raster(&mut self, path: &CStr) -> i32 {
        // SAFETY: handle is valid, path outlives the call.
        unsafe { sys::libraw_dcraw_ppm_tiff_writer(self.as_ptr(), path.as_ptr()) }
    }

    fn write_thumbnail(&mut self, path: &CStr) -> i32 {
        // SAFETY: handle is valid, path outlives the call.
        unsafe { sys::libraw_dcraw_thumb_writer(self.as_ptr(), path.as_ptr()) }
    }

    #[allow(clippy::unnecessary_cast)]
    fn capture_timestamp(&self) -> i64 {
        // SAFETY: handle is valid. The accessor returns the address of the
        // handle's own `other` block, computed by the linked library.
        let other = unsafe { libraw_get_imgother(self.as_ptr()) };
        if other.is_null() {
            return 0;
        }
        // SAFETY: non-null and live for the handle's lifetime. Only the
        // leading fields, whose layout never changed, are read.
        let timestamp = unsafe { (*other).timestamp };
        timestamp as i64
    }

    fn recycle(&mut self) {
        // SAFETY: handle is valid; recycle only frees working buffers.
        unsafe { sys::libraw_recycle(self.as_ptr()) };
    }

    fn describe(&self, code: i32) -> String {
        // SAFETY: libraw_strerror returns a pointer into a static table.
        let message = unsafe { sys::libraw_strerror(code) };
        if message.is_null() {
            return format!("unknown error {code}");
        }
        // SAFETY: non-null and NUL-terminated static string.
        unsafe { CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned()
    }
}

/// A `libraw_processed_image_t` owned by us. Released on drop.
#[derive(Debug)]
pub struct LibRawMemImage {
    inner: NonNull<sys::libraw_processed_image_t>,
}

impl MemoryImage for LibRawMemImage {
    fn header(&self) -> ImageHeader {
        let ptr = self.inner.as_ptr();
        // SAFETY: ptr came from libraw_dcraw_make_mem_image and is live until
        // drop. The format tag is a C enum, read as its underlying integer so
        // unexpected values map to `ImageKind::Unknown`.
        unsafe {
            let tag = addr_of!((*ptr).image_type).cast::<u32>().read();
            ImageHeader {
                kind: ImageKind::from(tag),
                height: (*ptr).height,
                width: (*ptr).width,
                colors: (*ptr).colors,
                bits: (*ptr).bits,
                data_size: (*ptr).data_size,
            }
        }
    }

    /// Always `Some`: the region is part of the same allocation as the
    /// header, so its address is never null.
    fn data(&self) -> Option<&[u8]> {
        let ptr = self.inner.as_ptr();
        // The struct declares `data[1]` but the allocation extends
        // `data_size` bytes past the header. Take the address as a raw
        // pointer so the span is not limited to the declared array.
        // SAFETY: ptr is live; LibRaw guarantees `data_size` valid bytes
        // starting at `data`.
        unsafe {
            let start = addr_of!((*ptr).data).cast::<u8>();
            let len = (*ptr).data_size as usize;
            Some(slice::from_raw_parts(start, len))
        }
    }
}

impl Drop for LibRawMemImage {
    fn drop(&mut self) {
        // SAFETY: we own this pointer and it was allocated by
        // libraw_dcraw_make_mem_image.
        unsafe { sys::libraw_dcraw_clear_mem(self.inner.as_ptr()) };
    }
}

/// Convert a path into the NUL-terminated form LibRaw expects.
pub(crate) fn native_path(path: &Path) -> Result<CString, DecodeError> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path
        .to_str()
        .ok_or_else(|| DecodeError::InvalidPath(path.to_path_buf()))?
        .as_bytes()
        .to_vec();

    CString::new(bytes).map_err(|_| DecodeError::InvalidPath(path.to_path_buf()))
}
