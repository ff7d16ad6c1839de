//! Syntax-error records handed over by the grammar layer.
//!
//! The core does not parse; it receives these typed records alongside
//! the syntax tree and surfaces them unchanged as diagnostics.

use std::fmt;

/// The recognizer failure classes the grammar layer reports.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SyntaxErrorKind {
    /// The lexer found no viable alternative for the input character.
    LexerNoViableAlt,
    /// The parser found no viable alternative for the token sequence.
    NoViableAlt,
    /// A semantic predicate in the grammar failed.
    FailedPredicate,
    /// A single token did not match the expected one.
    InputMismatch,
}

impl SyntaxErrorKind {
    pub fn describe(self) -> &'static str {
        match self {
            SyntaxErrorKind::LexerNoViableAlt => "unrecognized character sequence",
            SyntaxErrorKind::NoViableAlt => "no viable alternative",
            SyntaxErrorKind::FailedPredicate => "failed predicate",
            SyntaxErrorKind::InputMismatch => "mismatched input",
        }
    }
}

/// One syntax error, surfaced unchanged.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    /// 1-based line number reported by the recognizer.
    pub line: u32,
    /// Character range within the line.
    pub char_start: u32,
    pub char_end: u32,
    /// The recognizer's own message, passed through verbatim.
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, chars {}..{}: {}",
            self.kind.describe(),
            self.line,
            self.char_start,
            self.char_end,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_passes_message_through() {
        let err = SyntaxError {
            kind: SyntaxErrorKind::InputMismatch,
            line: 12,
            char_start: 4,
            char_end: 9,
            message: "expecting ';'".into(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("mismatched input"));
        assert!(rendered.contains("line 12"));
        assert!(rendered.contains("expecting ';'"));
    }
}
