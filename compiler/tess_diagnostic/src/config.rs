//! Severity configuration for the tunable diagnostic classes.
//!
//! The configuration is an immutable value constructed up front and
//! threaded through the checker entry point. Changing a preference means
//! constructing a new value and re-running the check with a fresh
//! timestamp; nothing listens for live changes.

use crate::{Diagnostic, ErrorCode, Severity};

/// Reporting level for one configurable class.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ReportLevel {
    Ignore,
    #[default]
    Warning,
    Error,
}

impl ReportLevel {
    /// Map to a diagnostic severity; `None` means suppressed.
    pub fn severity(self) -> Option<Severity> {
        match self {
            ReportLevel::Ignore => None,
            ReportLevel::Warning => Some(Severity::Warning),
            ReportLevel::Error => Some(Severity::Error),
        }
    }
}

/// Severities of the configurable diagnostic classes, plus the
/// statement-count threshold.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SeverityConfig {
    pub unreachable_code: ReportLevel,
    pub empty_block: ReportLevel,
    pub excessive_statements: ReportLevel,
    pub shadowing: ReportLevel,
    /// Blocks with more statements than this trigger the
    /// excessive-statements class. Zero disables the threshold.
    pub max_block_statements: usize,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        SeverityConfig {
            unreachable_code: ReportLevel::Warning,
            empty_block: ReportLevel::Warning,
            excessive_statements: ReportLevel::Warning,
            shadowing: ReportLevel::Warning,
            max_block_statements: 150,
        }
    }
}

impl SeverityConfig {
    /// The configured level for a configurable code.
    ///
    /// Non-configurable codes report at their built-in severity.
    pub fn level_for(&self, code: ErrorCode) -> Option<ReportLevel> {
        match code {
            ErrorCode::W9001 => Some(self.unreachable_code),
            ErrorCode::W9002 => Some(self.empty_block),
            ErrorCode::W9003 => Some(self.excessive_statements),
            ErrorCode::W9004 => Some(self.shadowing),
            _ => None,
        }
    }

    /// Build a diagnostic of a configurable class at its configured
    /// severity. Returns `None` when the class is set to ignore.
    pub fn make(&self, code: ErrorCode) -> Option<Diagnostic> {
        let level = self.level_for(code).unwrap_or(ReportLevel::Warning);
        level
            .severity()
            .map(|severity| Diagnostic::at_severity(code, severity))
    }
}
