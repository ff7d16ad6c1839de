//! Charstring escape decoding.
//!
//! Accepts a full quoted literal (surrounding quotes included) and
//! expands backslash escapes and doubled-quote escaping. The decoder is
//! pure and stateless; malformed sequences produce a typed error
//! carrying the offending fragment and its byte offset within the
//! literal.
//!
//! Supported escapes:
//! - `\n \t \r \a \b \f \v` control characters
//! - `\\` and `\"`
//! - `\xH` / `\xHH`: hex byte, second digit optional; a lone trailing
//!   `\xH` at the end of the literal counts as truncated
//! - `\N` / `\NN` / `\NNN`: octal byte, value capped at decimal 255
//! - `""`: doubled quote inside the literal

use std::fmt;

use memchr::memchr2;

/// Classification of a malformed literal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum EscapeErrorKind {
    /// The literal is missing its surrounding quotes.
    MissingQuotes,
    /// A backslash escape with an unknown or absent selector.
    InvalidEscape,
    /// `\x` with no usable hex digit, or a lone digit cut off by the
    /// end of the literal.
    TruncatedHex,
    /// Octal escape whose value exceeds decimal 255.
    OctalOutOfRange,
    /// A quote inside the literal that is neither doubled nor escaped.
    StrayQuote,
}

impl EscapeErrorKind {
    pub fn describe(self) -> &'static str {
        match self {
            EscapeErrorKind::MissingQuotes => "literal is not enclosed in quotes",
            EscapeErrorKind::InvalidEscape => "invalid escape sequence",
            EscapeErrorKind::TruncatedHex => "truncated hex escape",
            EscapeErrorKind::OctalOutOfRange => "octal escape exceeds 255",
            EscapeErrorKind::StrayQuote => "stray quote inside literal",
        }
    }
}

/// A malformed escape sequence, with the offending fragment.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct EscapeError {
    pub kind: EscapeErrorKind,
    /// Byte offset of the fragment within the quoted literal.
    pub offset: usize,
    /// The offending source fragment, verbatim.
    pub fragment: String,
}

impl EscapeError {
    fn new(kind: EscapeErrorKind, offset: usize, fragment: impl Into<String>) -> Self {
        EscapeError {
            kind,
            offset,
            fragment: fragment.into(),
        }
    }
}

impl fmt::Display for EscapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at offset {}: `{}`",
            self.kind.describe(),
            self.offset,
            self.fragment
        )
    }
}

impl std::error::Error for EscapeError {}

/// Decode a quoted charstring literal into its content.
///
/// Printable-ASCII content without escapes decodes to itself.
pub fn decode_charstring(quoted: &str) -> Result<String, EscapeError> {
    let bytes = quoted.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'"' || bytes[bytes.len() - 1] != b'"' {
        return Err(EscapeError::new(
            EscapeErrorKind::MissingQuotes,
            0,
            quoted.chars().take(8).collect::<String>(),
        ));
    }

    // Content between the outer quotes; offsets reported against the
    // full literal, hence the +1 below.
    let content = &bytes[1..bytes.len() - 1];
    let mut out = String::with_capacity(content.len());
    let mut pos = 0;

    while pos < content.len() {
        // Fast-forward to the next escape or embedded quote.
        let Some(special) = memchr2(b'\\', b'"', &content[pos..]) else {
            push_verbatim(&mut out, &content[pos..]);
            break;
        };
        push_verbatim(&mut out, &content[pos..pos + special]);
        pos += special;

        if content[pos] == b'"' {
            // Only a doubled quote is legal here; the lexer would have
            // ended the literal at a lone one.
            if content.get(pos + 1) == Some(&b'"') {
                out.push('"');
                pos += 2;
            } else {
                return Err(EscapeError::new(EscapeErrorKind::StrayQuote, pos + 1, "\""));
            }
            continue;
        }

        // Backslash escape.
        let selector = match content.get(pos + 1) {
            Some(&b) => b,
            None => {
                return Err(EscapeError::new(
                    EscapeErrorKind::InvalidEscape,
                    pos + 1,
                    "\\",
                ));
            }
        };
        match selector {
            b'n' => out.push('\n'),
            b't' => out.push('\t'),
            b'r' => out.push('\r'),
            b'a' => out.push('\u{07}'),
            b'b' => out.push('\u{08}'),
            b'f' => out.push('\u{0C}'),
            b'v' => out.push('\u{0B}'),
            b'\\' => out.push('\\'),
            b'"' => out.push('"'),
            b'x' => {
                let consumed = decode_hex(content, pos, &mut out)?;
                pos += consumed;
                continue;
            }
            b'0'..=b'7' => {
                let consumed = decode_octal(content, pos, &mut out)?;
                pos += consumed;
                continue;
            }
            other => {
                return Err(EscapeError::new(
                    EscapeErrorKind::InvalidEscape,
                    pos + 1,
                    format!("\\{}", char::from(other)),
                ));
            }
        }
        pos += 2;
    }

    Ok(out)
}

fn push_verbatim(out: &mut String, chunk: &[u8]) {
    // The literal arrived as &str, so any multi-byte sequences are
    // valid UTF-8 and contain no ASCII specials to split on.
    out.push_str(&String::from_utf8_lossy(chunk));
}

/// Decode `\xH` or `\xHH` starting at the backslash. Returns the number
/// of bytes consumed.
fn decode_hex(content: &[u8], pos: usize, out: &mut String) -> Result<usize, EscapeError> {
    let first = match content.get(pos + 2).copied().and_then(hex_digit) {
        Some(v) => v,
        None => {
            return Err(EscapeError::new(
                EscapeErrorKind::TruncatedHex,
                pos + 1,
                "\\x",
            ));
        }
    };
    match content.get(pos + 3) {
        // A lone trailing digit at the end of the literal is cut off.
        None => Err(EscapeError::new(
            EscapeErrorKind::TruncatedHex,
            pos + 1,
            format!("\\x{}", char::from(content[pos + 2])),
        )),
        Some(&b) => match hex_digit(b) {
            Some(second) => {
                out.push(char::from(first * 16 + second));
                Ok(4)
            }
            // Second digit optional: one-digit value, next char kept.
            None => {
                out.push(char::from(first));
                Ok(3)
            }
        },
    }
}

/// Decode `\N`, `\NN`, or `\NNN` starting at the backslash. Returns the
/// number of bytes consumed.
fn decode_octal(content: &[u8], pos: usize, out: &mut String) -> Result<usize, EscapeError> {
    let mut value: u32 = 0;
    let mut digits = 0;
    while digits < 3 {
        match content.get(pos + 1 + digits).copied() {
            Some(b @ b'0'..=b'7') => {
                value = value * 8 + u32::from(b - b'0');
                digits += 1;
            }
            _ => break,
        }
    }
    if value > 255 {
        let fragment: String = std::str::from_utf8(&content[pos..pos + 1 + digits])
            .unwrap_or("\\")
            .to_owned();
        return Err(EscapeError::new(
            EscapeErrorKind::OctalOutOfRange,
            pos + 1,
            fragment,
        ));
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "value is bounds-checked against 255 above"
    )]
    out.push(char::from(value as u8));
    Ok(1 + digits)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
