//! Translation of native status codes into diagnostics.
//!
//! Translation is purely observational: it renders the code with the
//! library's own message table and hands the result to a [`DiagnosticSink`].
//! Whether the pipeline stops is decided by the caller's error policy.

use std::sync::{Mutex, PoisonError};

use super::{RawSession, Stage};

/// A nonzero status code reported by a native stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDiagnostic {
    pub stage: Stage,
    pub code: i32,
    pub message: String,
}

/// Receives diagnostics produced while running a pipeline.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: &StageDiagnostic);
}

/// Default sink: emits each diagnostic as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &StageDiagnostic) {
        tracing::warn!(
            stage = %diagnostic.stage,
            code = diagnostic.code,
            "ERROR libraw {}",
            diagnostic.message
        );
    }
}

/// Sink that keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<StageDiagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the diagnostics collected so far.
    pub fn diagnostics(&self) -> Vec<StageDiagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &StageDiagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic.clone());
    }
}

/// Translate a stage's status code.
///
/// Returns `None` for success. For any other code the diagnostic is reported
/// to `sink` and also returned.
pub fn translate<S: RawSession>(
    session: &S,
    stage: Stage,
    code: i32,
    sink: &dyn DiagnosticSink,
) -> Option<StageDiagnostic> {
    if code == 0 {
        return None;
    }

    let diagnostic = StageDiagnostic {
        stage,
        code,
        message: session.describe(code),
    };
    sink.report(&diagnostic);
    Some(diagnostic)
}
