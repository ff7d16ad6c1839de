//! Follow-token sets for neighbor-growth detection.
//!
//! When an edit sits exactly at a statement boundary, the neighboring
//! statement may be "grown" by it: typing an identifier right after a
//! label continues the label chain, typing after a `goto` continues its
//! target. The engine classifies the token at the boundary and asks the
//! neighbor's follow set whether the region must absorb it.

use tess_ast::StmtKind;

/// Coarse classification of the token at a damage boundary.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TokenClass {
    /// Identifier or keyword characters.
    Ident,
    Number,
    Colon,
    Semicolon,
    OpenBrace,
    CloseBrace,
    Other,
    /// Boundary at end of input or whitespace only.
    None,
}

/// Classify the first non-whitespace byte at or after `offset`.
pub fn class_at(source: &str, offset: usize) -> TokenClass {
    source
        .as_bytes()
        .get(offset..)
        .map_or(TokenClass::None, |rest| {
            rest.iter()
                .find(|b| !b.is_ascii_whitespace())
                .map_or(TokenClass::None, |&b| classify(b))
        })
}

/// Classify the last non-whitespace byte strictly before `offset`.
pub fn class_before(source: &str, offset: usize) -> TokenClass {
    source
        .as_bytes()
        .get(..offset.min(source.len()))
        .map_or(TokenClass::None, |prefix| {
            prefix
                .iter()
                .rev()
                .find(|b| !b.is_ascii_whitespace())
                .map_or(TokenClass::None, |&b| classify(b))
        })
}

fn classify(b: u8) -> TokenClass {
    match b {
        b'a'..=b'z' | b'A'..=b'Z' | b'_' => TokenClass::Ident,
        b'0'..=b'9' => TokenClass::Number,
        b':' => TokenClass::Colon,
        b';' => TokenClass::Semicolon,
        b'{' => TokenClass::OpenBrace,
        b'}' => TokenClass::CloseBrace,
        _ => TokenClass::Other,
    }
}

/// Whether a statement of this kind, sitting immediately before the
/// damage, can be grown by an edit starting with `next`.
pub fn grows_rightward(kind: &StmtKind, next: TokenClass) -> bool {
    match kind {
        // `lbl:` followed by identifier text merges into a longer label
        // chain; a colon re-opens the label itself.
        StmtKind::Label(_) => matches!(next, TokenClass::Ident | TokenClass::Colon),
        // `goto tgt` followed by more identifier characters extends the
        // target name.
        StmtKind::Goto(_) => matches!(next, TokenClass::Ident | TokenClass::Number),
        _ => false,
    }
}

/// Whether a statement of this kind, sitting immediately after the
/// damage, can be grown by an edit ending with `prev`.
pub fn grows_leftward(kind: &StmtKind, prev: TokenClass) -> bool {
    match kind {
        // Identifier characters typed right before a label glue onto
        // its name.
        StmtKind::Label(_) | StmtKind::Goto(_) => {
            matches!(prev, TokenClass::Ident | TokenClass::Number)
        }
        _ => false,
    }
}
