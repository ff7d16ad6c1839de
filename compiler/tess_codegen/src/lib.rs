//! C code generation backend for the Tess compiler.
//!
//! Lowers a validated AST into C fragments driving the `tessrt`
//! runtime, which models concurrent test components, ports, timers,
//! and alt rendezvous.
//!
//! # Architecture
//!
//! ```text
//! AstArena + Module (validated)
//!        ↓
//!   generate_module     (per-node fragment emission)
//!        ↓
//!   CodegenResult       (C source + import manifest + errors)
//! ```
//!
//! Each node emits an [`ExpressionFragment`], an ordered
//! (preamble, expression, postamble) triple, and composes its
//! children's fragments strictly preamble-before-use, postamble-after.
//! One unimplemented construct never aborts generation of the rest of
//! the unit: a placeholder diagnostic comment is emitted instead.

mod context;
mod fragment;
mod generate;

pub use context::GenContext;
pub use fragment::ExpressionFragment;
pub use generate::generate_module;

/// Result of code generation for one compilation unit.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CodegenResult {
    /// Generated C code (target fragments, in definition order).
    pub code: String,
    /// Deduplicated, sorted runtime-import manifest.
    pub imports: Vec<String>,
    /// Hard errors encountered during generation.
    pub errors: Vec<CodegenError>,
}

impl CodegenResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A code generation error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodegenError {
    pub message: String,
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CodegenError {}
