//! Common node identity.
//!
//! Every node category embeds a [`NodeMeta`]: owning scope, source
//! location, last-checked timestamp, and the erroneous flag. A
//! [`NodeRef`] addresses any node uniformly for meta access, full-name
//! computation, and the reference chain.

use std::fmt;

use crate::ids::{BlockId, DefId, StmtId, TemplateId, TypeId, ValueId};
use crate::loc::Location;
use crate::timestamp::CompilationTimestamp;
use crate::ScopeId;

/// Fields shared by every AST node.
#[derive(Clone, Debug)]
pub struct NodeMeta {
    /// Scope the node lives in.
    pub scope: ScopeId,
    /// Source position.
    pub loc: Location,
    /// Timestamp of the last completed validation, if any.
    pub last_checked: Option<CompilationTimestamp>,
    /// Set once a semantic or structural error has been reported against
    /// the node; downstream checks degrade instead of repeating it.
    pub erroneous: bool,
}

impl NodeMeta {
    pub fn new(scope: ScopeId, loc: Location) -> Self {
        NodeMeta {
            scope,
            loc,
            last_checked: None,
            erroneous: false,
        }
    }

    /// Whether a check against `ts` would be a no-op.
    #[inline]
    pub fn is_fresh(&self, ts: CompilationTimestamp) -> bool {
        matches!(self.last_checked, Some(last) if last >= ts)
    }

    /// Stamp a completed validation.
    #[inline]
    pub fn stamp(&mut self, ts: CompilationTimestamp) {
        self.last_checked = Some(ts);
    }
}

/// Uniform reference to a node of any category.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum NodeRef {
    Def(DefId),
    Type(TypeId),
    Value(ValueId),
    Template(TemplateId),
    Stmt(StmtId),
    Block(BlockId),
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Def(id) => write!(f, "{id:?}"),
            NodeRef::Type(id) => write!(f, "{id:?}"),
            NodeRef::Value(id) => write!(f, "{id:?}"),
            NodeRef::Template(id) => write!(f, "{id:?}"),
            NodeRef::Stmt(id) => write!(f, "{id:?}"),
            NodeRef::Block(id) => write!(f, "{id:?}"),
        }
    }
}

/// What kind of named entity an assignment introduces.
///
/// Unique within its scope together with the name; drives which
/// sub-references and statement contexts are legal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AssignmentKind {
    Function,
    Altstep,
    Testcase,
    Constant,
    Variable,
    Template,
    Port,
    Timer,
}

impl AssignmentKind {
    /// Human-readable noun for diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            AssignmentKind::Function => "function",
            AssignmentKind::Altstep => "altstep",
            AssignmentKind::Testcase => "testcase",
            AssignmentKind::Constant => "constant",
            AssignmentKind::Variable => "variable",
            AssignmentKind::Template => "template",
            AssignmentKind::Port => "port",
            AssignmentKind::Timer => "timer",
        }
    }

    /// Whether the entity can be invoked with a parameter list.
    pub fn is_invocable(self) -> bool {
        matches!(
            self,
            AssignmentKind::Function | AssignmentKind::Altstep | AssignmentKind::Testcase
        )
    }
}
