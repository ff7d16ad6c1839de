//! AST node model for the Tess compiler.
//!
//! The node categories (definitions, types, values, templates,
//! statements) are closed tagged variants stored in an [`AstArena`] and
//! addressed by 32-bit ids. Every node carries its owning scope, source
//! location, last-checked timestamp, and erroneous flag; qualified names
//! are derived on demand from the ancestor chain.
//!
//! This crate holds no checking logic: semantic validation lives in
//! `tess_sema`, incremental reparse in `tess_reparse`, generation in
//! `tess_codegen`.

pub mod arena;
pub mod chain;
pub mod def;
pub mod ids;
pub mod incremental;
pub mod interner;
pub mod loc;
pub mod module;
pub mod node;
pub mod scope;
pub mod stmt;
pub mod syntax;
pub mod template;
pub mod timestamp;
pub mod ty;
pub mod value;

pub use arena::AstArena;
pub use chain::{ChainMarker, ReferenceChain};
pub use def::{DefBody, Definition, Param};
pub use ids::{BlockId, DefId, ScopeId, StmtId, TemplateId, TypeId, ValueId};
pub use incremental::{DamageRegion, Edit};
pub use interner::{Name, StringInterner};
pub use loc::{FileId, Location, Span};
pub use module::Module;
pub use node::{AssignmentKind, NodeMeta, NodeRef};
pub use scope::{Scope, ScopeKind};
pub use stmt::{
    AltGuard, AltGuards, BlockFlags, GuardOp, LabelInfo, ReturnStatus, Statement, StatementBlock,
    StmtKind,
};
pub use syntax::{SyntaxError, SyntaxErrorKind};
pub use template::{Template, TemplateKind};
pub use timestamp::{CompilationClock, CompilationTimestamp};
pub use ty::{element_type, is_compatible, record_field, PortClass, TypeKind, TypeNode};
pub use value::{BinaryOp, Reference, SubRef, UnaryOp, Value, ValueKind, Verdict};
