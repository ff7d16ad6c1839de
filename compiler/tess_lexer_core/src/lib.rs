//! Standalone lexical helpers for the Tess compiler.
//!
//! Only pure, stateless pieces of the lexical layer live here; today
//! that is the charstring escape decoder. The crate deliberately has no
//! compiler-internal dependencies so external tools can use it alone.

mod escape;

pub use escape::{decode_charstring, EscapeError, EscapeErrorKind};
