//! Idempotent export of processed rasters and embedded thumbnails.
//!
//! Output paths are a pure function of the output directory and the input
//! file name:
//!
//! - `<output_dir>/<file_name>.ppm` for the processed raster
//! - `<output_dir>/<file_name>_embedded.jpg` for the embedded thumbnail
//!
//! If the output already exists the export is a no-op and the existing path
//! is returned. The file is not checked for staleness. Bytes are written by
//! LibRaw's own writers; nothing is reinterpreted on this path.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use crate::decode::{DecodeError, DecodeOptions, StageCheck};
use crate::session::{
    native_path, DiagnosticSink, LibRaw, RawSession, RecycleGuard, Stage, TracingSink,
};

/// Suffix appended to the input file name for raster exports.
pub const RASTER_SUFFIX: &str = ".ppm";

/// Suffix appended to the input file name for thumbnail exports.
pub const THUMBNAIL_SUFFIX: &str = "_embedded.jpg";

/// What an export writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// The fully processed raster, as PPM.
    Raster,
    /// The thumbnail embedded in the RAW file, as stored by the camera.
    EmbeddedThumbnail,
}

impl ExportKind {
    pub fn suffix(self) -> &'static str {
        match self {
            ExportKind::Raster => RASTER_SUFFIX,
            ExportKind::EmbeddedThumbnail => THUMBNAIL_SUFFIX,
        }
    }
}

/// Compute the output path for an export.
pub fn output_path(output_dir: &Path, file_name: &OsStr, kind: ExportKind) -> PathBuf {
    let mut name = file_name.to_os_string();
    name.push(kind.suffix());
    output_dir.join(name)
}

/// Export the processed raster of `input_dir/file_name` as PPM.
pub fn export_raster(
    input_dir: impl AsRef<Path>,
    file_name: impl AsRef<OsStr>,
    output_dir: impl AsRef<Path>,
) -> Result<PathBuf, DecodeError> {
    export_with_libraw(ExportKind::Raster, input_dir, file_name, output_dir)
}

/// Export the embedded JPEG thumbnail of `input_dir/file_name`.
pub fn export_embedded_thumbnail(
    input_dir: impl AsRef<Path>,
    file_name: impl AsRef<OsStr>,
    output_dir: impl AsRef<Path>,
) -> Result<PathBuf, DecodeError> {
    export_with_libraw(ExportKind::EmbeddedThumbnail, input_dir, file_name, output_dir)
}

fn export_with_libraw(
    kind: ExportKind,
    input_dir: impl AsRef<Path>,
    file_name: impl AsRef<OsStr>,
    output_dir: impl AsRef<Path>,
) -> Result<PathBuf, DecodeError> {
    let output = output_path(output_dir.as_ref(), file_name.as_ref(), kind);
    // Skip handle creation entirely when there is nothing to do.
    if output.try_exists()? {
        tracing::debug!(output = %output.display(), "export target exists, skipping");
        return Ok(output);
    }

    let mut session = LibRaw::new()?;
    export_with(
        &mut session,
        kind,
        input_dir.as_ref(),
        file_name.as_ref(),
        output_dir.as_ref(),
        &DecodeOptions::default(),
        &TracingSink,
    )
}

/// Run an export on a caller-owned session.
///
/// # Errors
///
/// - `DecodeError::Io` - the input file is missing or a path check failed
/// - `DecodeError::InvalidPath` - a path cannot be passed to LibRaw
/// - `DecodeError::NativeStage` - a native stage failed under `FailFast`
pub fn export_with<S: RawSession>(
    session: &mut S,
    kind: ExportKind,
    input_dir: &Path,
    file_name: &OsStr,
    output_dir: &Path,
    options: &DecodeOptions,
    sink: &dyn DiagnosticSink,
) -> Result<PathBuf, DecodeError> {
    let output = output_path(output_dir, file_name, kind);
    if output.try_exists()? {
        tracing::debug!(output = %output.display(), "export target exists, skipping");
        return Ok(output);
    }

    let input = input_dir.join(file_name);
    if !input.try_exists()? {
        return Err(DecodeError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input file not found: {}", input.display()),
        )));
    }

    let native_input = native_path(&input)?;
    let native_output = native_path(&output)?;
    let stages = StageCheck::new(options, sink);
    let mut session = RecycleGuard::new(session);

    session.configure(options);
    let code = session.open_file(&native_input);
    stages.check(&*session, Stage::Open, code)?;

    match kind {
        ExportKind::Raster => {
            let code = session.unpack();
            stages.check(&*session, Stage::Unpack, code)?;

            let code = session.process();
            stages.check(&*session, Stage::Process, code)?;

            tracing::info!(
                "exporting {} -> {}",
                input.display(),
                output.display()
            );
            let code = session.write_raster(&native_output);
            stages.check(&*session, Stage::WriteRaster, code)?;
        }
        ExportKind::EmbeddedThumbnail => {
            let code = session.unpack_thumb();
            stages.check(&*session, Stage::UnpackThumb, code)?;

            let code = session.write_thumbnail(&native_output);
            stages.check(&*session, Stage::WriteThumbnail, code)?;
        }
    }

    Ok(output)
}
