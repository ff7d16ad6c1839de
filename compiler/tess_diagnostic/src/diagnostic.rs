use std::fmt;

use tess_ast::Location;

use crate::ErrorCode;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A labeled location with a message.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub loc: Location,
    pub message: String,
    pub is_primary: bool,
}

impl Label {
    /// The main error location.
    pub fn primary(loc: Location, message: impl Into<String>) -> Self {
        Label {
            loc,
            message: message.into(),
            is_primary: true,
        }
    }

    /// Related context (the other half of a duplicate pair, the
    /// defining site of a shadowed name).
    pub fn secondary(loc: Location, message: impl Into<String>) -> Self {
        Label {
            loc,
            message: message.into(),
            is_primary: false,
        }
    }
}

/// One diagnostic: code, severity, message, and labeled locations.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be emitted or returned, not silently dropped"]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn new_with_severity(code: ErrorCode, severity: Severity) -> Self {
        Diagnostic {
            code,
            severity,
            message: String::new(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn error(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Error)
    }

    pub fn warning(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Warning)
    }

    /// Diagnostic at an explicitly chosen severity (for the
    /// configurable classes).
    pub fn at_severity(code: ErrorCode, severity: Severity) -> Self {
        Self::new_with_severity(code, severity)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_label(mut self, loc: Location, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(loc, message));
        self
    }

    pub fn with_secondary_label(mut self, loc: Location, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(loc, message));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// The first primary label's location.
    pub fn primary_loc(&self) -> Option<Location> {
        self.labels.iter().find(|l| l.is_primary).map(|l| l.loc)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.code, self.message)?;
        for label in &self.labels {
            let marker = if label.is_primary { "-->" } else { "   " };
            write!(f, "\n  {} {}: {}", marker, label.loc, label.message)?;
        }
        for note in &self.notes {
            write!(f, "\n  = note: {note}")?;
        }
        Ok(())
    }
}

/// Create an "undefined reference" diagnostic.
pub fn undefined_reference(loc: Location, name: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2001)
        .with_message(format!("undefined reference `{name}`"))
        .with_label(loc, "not found in this or any enclosing scope")
}

/// Create a "duplicate definition" diagnostic carrying both locations.
pub fn duplicate_definition(dup: Location, existing: Location, name: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2002)
        .with_message(format!("duplicate definition of `{name}`"))
        .with_label(dup, "redefined here")
        .with_secondary_label(existing, "first defined here")
}

/// Create a "circular definition" diagnostic.
pub fn circular_reference(loc: Location, cycle: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2003)
        .with_message(format!("circular definition: {cycle}"))
        .with_label(loc, "definition refers back to itself")
}

/// Create a "type mismatch" diagnostic.
pub fn type_mismatch(loc: Location, expected: &str, found: &str, context: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E2004)
        .with_message(format!(
            "type mismatch: expected `{expected}`, found `{found}`"
        ))
        .with_label(loc, context)
}
