//! Conversion of grammar-layer syntax-error records into diagnostics.
//!
//! The records are surfaced unchanged: the recognizer's message text is
//! the diagnostic message, the line/char-range positioning is preserved.

use tess_ast::{FileId, Location, Span, SyntaxError, SyntaxErrorKind};

use crate::{Diagnostic, ErrorCode};

/// The error code a recognizer failure class maps to.
pub fn code_for(kind: SyntaxErrorKind) -> ErrorCode {
    match kind {
        SyntaxErrorKind::LexerNoViableAlt => ErrorCode::E1001,
        SyntaxErrorKind::NoViableAlt => ErrorCode::E1002,
        SyntaxErrorKind::FailedPredicate => ErrorCode::E1003,
        SyntaxErrorKind::InputMismatch => ErrorCode::E1004,
    }
}

/// Surface a syntax error as a diagnostic, unchanged.
///
/// The grammar layer reports line/character positions rather than byte
/// offsets; the character range is carried in the span field of the
/// location, qualified by the line number.
pub fn syntax_error_to_diagnostic(file: FileId, error: &SyntaxError) -> Diagnostic {
    let loc = Location::new(
        file,
        Span::new(error.char_start, error.char_end),
        error.line,
    );
    Diagnostic::error(code_for(error.kind))
        .with_message(error.message.clone())
        .with_label(loc, error.kind.describe())
}
