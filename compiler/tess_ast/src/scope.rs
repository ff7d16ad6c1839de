//! Lexical scope tree.
//!
//! Scopes form a tree; name lookup walks from the innermost scope toward
//! the root. Child scopes are registered against the source interval
//! they cover so the incremental reparse engine can find and invalidate
//! exactly the scopes inside a damaged region.

use rustc_hash::FxHashMap;

use crate::ids::DefId;
use crate::interner::Name;
use crate::loc::Span;
use crate::ScopeId;

/// What construct owns a scope; affects the qualified-name chain.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ScopeKind {
    Module,
    Component,
    Definition,
    Block,
}

/// A node in the scope tree.
#[derive(Clone, Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    /// Name of the owning construct, when it has one (module name,
    /// component name, definition name). Block scopes are anonymous.
    pub name: Option<Name>,
    /// First declaration wins; later same-name declarations are kept in
    /// `duplicates` for the checker to report with both locations.
    names: FxHashMap<Name, DefId>,
    /// Collision pairs `(existing, duplicate)` in declaration order.
    pub duplicates: Vec<(DefId, DefId)>,
    /// Child scopes keyed by the source interval they cover.
    pub children: Vec<(Span, ScopeId)>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>, kind: ScopeKind, name: Option<Name>) -> Self {
        Scope {
            parent,
            kind,
            name,
            names: FxHashMap::default(),
            duplicates: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Declare `def` under `name`.
    ///
    /// On collision the first declaration stays visible and the pair is
    /// recorded for diagnosis; resolution intentionally keeps working
    /// against the first entry.
    pub fn declare(&mut self, name: Name, def: DefId) {
        match self.names.get(&name) {
            Some(&existing) => self.duplicates.push((existing, def)),
            None => {
                self.names.insert(name, def);
            }
        }
    }

    /// Look a name up in this scope only.
    pub fn get_local(&self, name: Name) -> Option<DefId> {
        self.names.get(&name).copied()
    }

    /// Register a child scope against the interval it covers.
    pub fn register_child(&mut self, covers: Span, child: ScopeId) {
        self.children.push((covers, child));
    }

    /// Child scopes whose interval intersects `span`.
    pub fn children_intersecting(&self, span: Span) -> impl Iterator<Item = ScopeId> + '_ {
        self.children
            .iter()
            .filter(move |(covers, _)| covers.intersects(span))
            .map(|(_, child)| *child)
    }

    /// Names declared here, in arbitrary order.
    pub fn local_defs(&self) -> impl Iterator<Item = DefId> + '_ {
        self.names.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StringInterner;

    #[test]
    fn test_first_declaration_wins() {
        let interner = StringInterner::new();
        let name = interner.intern("max_retries");
        let mut scope = Scope::new(None, ScopeKind::Module, None);
        scope.declare(name, DefId::from_raw(0));
        scope.declare(name, DefId::from_raw(1));
        assert_eq!(scope.get_local(name), Some(DefId::from_raw(0)));
        assert_eq!(
            scope.duplicates,
            vec![(DefId::from_raw(0), DefId::from_raw(1))]
        );
    }

    #[test]
    fn test_children_by_interval() {
        let mut scope = Scope::new(None, ScopeKind::Definition, None);
        scope.register_child(Span::new(10, 50), ScopeId::from_raw(1));
        scope.register_child(Span::new(60, 90), ScopeId::from_raw(2));
        let hits: Vec<_> = scope.children_intersecting(Span::new(45, 65)).collect();
        assert_eq!(hits, vec![ScopeId::from_raw(1), ScopeId::from_raw(2)]);
        let hits: Vec<_> = scope.children_intersecting(Span::new(50, 60)).collect();
        assert!(hits.is_empty());
    }
}
