//! Decode orchestration: RAW file in, image and shot metadata out.

use std::path::Path;
use std::time::Instant;

use super::container::{decode_container, synthesize};
use super::extract::extract_buffer;
use super::metadata::extract_metadata;
use super::{DecodeError, DecodeOptions, DecodedImage, ShotMetadata};
use crate::session::{
    native_path, translate, DiagnosticSink, LibRaw, RawSession, RecycleGuard, SessionPool, Stage,
    StageDiagnostic, TracingSink,
};

impl From<StageDiagnostic> for DecodeError {
    fn from(diagnostic: StageDiagnostic) -> Self {
        DecodeError::NativeStage {
            stage: diagnostic.stage,
            code: diagnostic.code,
            message: diagnostic.message,
        }
    }
}

/// Applies the error policy to native status codes.
pub(crate) struct StageCheck<'a> {
    fail_fast: bool,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> StageCheck<'a> {
    pub(crate) fn new(options: &DecodeOptions, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            fail_fast: options.is_fail_fast(),
            sink,
        }
    }

    /// Report a nonzero code and, under `FailFast`, turn it into an error.
    pub(crate) fn check<S: RawSession>(
        &self,
        session: &S,
        stage: Stage,
        code: i32,
    ) -> Result<(), DecodeError> {
        match translate(session, stage, code, self.sink) {
            Some(diagnostic) if self.fail_fast => Err(diagnostic.into()),
            _ => Ok(()),
        }
    }
}

/// Decode a RAW file with default options on a fresh LibRaw handle.
///
/// # Example
///
/// ```ignore
/// use rawbridge_core::decode::decode;
///
/// let (image, meta) = decode("DSC01234.ARW")?;
/// println!("{}x{} taken {}", image.width, image.height, meta.capture_date_time);
/// ```
pub fn decode(path: impl AsRef<Path>) -> Result<(DecodedImage, ShotMetadata), DecodeError> {
    decode_with_options(path, &DecodeOptions::default())
}

/// Decode a RAW file on a fresh LibRaw handle, closed when the call returns.
pub fn decode_with_options(
    path: impl AsRef<Path>,
    options: &DecodeOptions,
) -> Result<(DecodedImage, ShotMetadata), DecodeError> {
    let mut session = LibRaw::new()?;
    decode_with(&mut session, path.as_ref(), options, &TracingSink)
}

/// Decode a RAW file on a session checked out of `pool`.
pub fn decode_pooled<S: RawSession>(
    pool: &SessionPool<S>,
    path: impl AsRef<Path>,
    options: &DecodeOptions,
    sink: &dyn DiagnosticSink,
) -> Result<(DecodedImage, ShotMetadata), DecodeError> {
    let mut session = pool.checkout()?;
    decode_with(&mut *session, path.as_ref(), options, sink)
}

/// Run the full decode pipeline on a caller-owned session.
///
/// Stages: open, unpack, process, make memory image, copy the pixel data
/// out, wrap it in a PPM container, decode the container and read the
/// capture time. The session is recycled on every exit route.
///
/// # Errors
///
/// - `DecodeError::NativeStage` - a native stage failed under `FailFast`
/// - `DecodeError::MissingImage` - no memory image was produced
/// - `DecodeError::BufferExtraction` - the memory image size is inconsistent
/// - `DecodeError::ContainerDecode` - the container could not be parsed
pub fn decode_with<S: RawSession>(
    session: &mut S,
    path: &Path,
    options: &DecodeOptions,
    sink: &dyn DiagnosticSink,
) -> Result<(DecodedImage, ShotMetadata), DecodeError> {
    let native = native_path(path)?;
    let stages = StageCheck::new(options, sink);
    let mut session = RecycleGuard::new(session);

    tracing::debug!(path = %path.display(), policy = ?options.error_policy, "decoding raw file");
    session.configure(options);

    let code = session.open_file(&native);
    stages.check(&*session, Stage::Open, code)?;

    let started = Instant::now();

    let code = session.unpack();
    stages.check(&*session, Stage::Unpack, code)?;

    let code = session.process();
    stages.check(&*session, Stage::Process, code)?;

    let (image, code) = session.make_mem_image();
    stages.check(&*session, Stage::MakeMemImage, code)?;
    let image = image.ok_or(DecodeError::MissingImage)?;

    let buffer = extract_buffer(&image)?;
    // The copy is complete; hand the native allocation back.
    drop(image);

    tracing::info!(
        path = %path.display(),
        width = buffer.width,
        height = buffer.height,
        "raw decoding required {:?}",
        started.elapsed()
    );

    let decoded = decode_container(&synthesize(&buffer))?;
    tracing::debug!(pixels = decoded.pixel_count(), color = ?decoded.color, "raster decoded");
    let metadata = extract_metadata(&*session);

    Ok((decoded, metadata))
}
