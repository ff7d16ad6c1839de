//! Diagnostic system for the Tess compiler.
//!
//! - Error codes for searchability
//! - Every diagnostic carries at least one [`Location`]-bearing label
//! - Semantic errors never unwind: they are queued and checking
//!   continues with degraded operands
//! - A handful of classes (unreachable code, empty block, excessive
//!   statement count, shadowing) report at a configurable severity
//!
//! [`Location`]: tess_ast::Location

mod config;
mod diagnostic;
mod error_code;
mod queue;
mod syntax;

pub use config::{ReportLevel, SeverityConfig};
pub use diagnostic::{
    circular_reference, duplicate_definition, type_mismatch, undefined_reference, Diagnostic,
    Label, Severity,
};
pub use error_code::ErrorCode;
pub use queue::DiagnosticQueue;
pub use syntax::{code_for, syntax_error_to_diagnostic};
