//! Compilation units.

use crate::ids::DefId;
use crate::interner::Name;
use crate::loc::FileId;
use crate::node::NodeMeta;
use crate::syntax::SyntaxError;
use crate::ScopeId;

/// One compilation unit: a module with its root scope and top-level
/// definitions.
///
/// Nodes are created at parse time, mutated in place by incremental
/// reparse, and discarded with the module when the unit is replaced.
#[derive(Clone, Debug)]
pub struct Module {
    pub name: Name,
    pub file: FileId,
    pub root_scope: ScopeId,
    /// Top-level definitions in source order.
    pub defs: Vec<DefId>,
    /// Syntax errors handed over by the grammar layer, surfaced
    /// unchanged when the module is checked.
    pub syntax_errors: Vec<SyntaxError>,
    pub meta: NodeMeta,
}

impl Module {
    pub fn new(name: Name, file: FileId, root_scope: ScopeId, meta: NodeMeta) -> Self {
        Module {
            name,
            file,
            root_scope,
            defs: Vec::new(),
            syntax_errors: Vec::new(),
            meta,
        }
    }
}
