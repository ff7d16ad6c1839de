//! Diagnostic queue: collection, once-per-location guards, and stable
//! location ordering.

use rustc_hash::FxHashSet;
use tess_ast::Location;

use crate::{Diagnostic, ErrorCode};

/// Collects diagnostics during one pass and flushes them sorted by
/// source position.
#[derive(Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    /// (code, location) pairs already emitted through `emit_once`.
    once_guard: FxHashSet<(ErrorCode, Location)>,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic unconditionally.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Append a diagnostic unless the same code was already reported at
    /// the same location in this pass (the "warned once" policy for
    /// unreachable code).
    pub fn emit_once(&mut self, diagnostic: Diagnostic) {
        let Some(loc) = diagnostic.primary_loc() else {
            self.emit(diagnostic);
            return;
        };
        if self.once_guard.insert((diagnostic.code, loc)) {
            self.emit(diagnostic);
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Drain all diagnostics, stably sorted by file and span start.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let mut drained = std::mem::take(&mut self.diagnostics);
        self.error_count = 0;
        self.once_guard.clear();
        drained.sort_by_key(|d| {
            d.primary_loc()
                .map_or((u32::MAX, u32::MAX), |loc| (loc.file.0, loc.span.start))
        });
        drained
    }
}
