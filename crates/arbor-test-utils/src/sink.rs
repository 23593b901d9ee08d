//! A [`DiagnosticSink`] that keeps everything it receives.

use std::sync::{Mutex, PoisonError};

use arbor_core::{Diagnostic, DiagnosticSink, Level};

/// Records every emitted [`Diagnostic`] in order.
///
/// Share it with a solver through an `Arc` and inspect it afterwards.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded diagnostics at `level`.
    pub fn at_level(&self, level: Level) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.level() == level)
            .collect()
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.at_level(Level::Warn)
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic.clone());
    }
}
