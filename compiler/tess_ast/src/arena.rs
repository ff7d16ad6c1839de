//! The AST arena.
//!
//! All nodes live in per-category vectors and address each other by id,
//! so the parent and scope back-links never form ownership cycles and a
//! subtree can be replaced in place during incremental reparse.

use crate::def::Definition;
use crate::ids::{BlockId, DefId, ScopeId, StmtId, TemplateId, TypeId, ValueId};
use crate::interner::StringInterner;
use crate::loc::{Location, Span};
use crate::node::{NodeMeta, NodeRef};
use crate::scope::{Scope, ScopeKind};
use crate::stmt::{Statement, StatementBlock, StmtKind};
use crate::template::{Template, TemplateKind};
use crate::ty::{TypeKind, TypeNode};
use crate::value::{SubRef, Value, ValueKind};

/// Arena of all AST nodes of one or more compilation units.
#[derive(Debug, Default)]
pub struct AstArena {
    defs: Vec<Definition>,
    types: Vec<TypeNode>,
    values: Vec<Value>,
    templates: Vec<Template>,
    stmts: Vec<Statement>,
    blocks: Vec<StatementBlock>,
    scopes: Vec<Scope>,
}

impl AstArena {
    /// The scope primitives and synthesized nodes live in.
    pub const GLOBAL_SCOPE: ScopeId = ScopeId::from_raw(0);

    /// Create an arena with the global scope and pre-interned primitive
    /// types in place.
    pub fn new() -> Self {
        let mut arena = AstArena {
            defs: Vec::new(),
            types: Vec::with_capacity(16),
            values: Vec::new(),
            templates: Vec::new(),
            stmts: Vec::new(),
            blocks: Vec::new(),
            scopes: vec![Scope::new(None, ScopeKind::Module, None)],
        };
        for kind in [
            TypeKind::Integer,
            TypeKind::Float,
            TypeKind::Boolean,
            TypeKind::Charstring,
            TypeKind::Verdict,
            TypeKind::Timer,
            TypeKind::Default,
            TypeKind::Undefined,
        ] {
            arena.types.push(TypeNode {
                kind,
                meta: NodeMeta::new(Self::GLOBAL_SCOPE, Location::NONE),
            });
        }
        arena
    }

    /// Pre-size the node vectors from a source-length heuristic
    /// (roughly one statement per 24 bytes of source).
    pub fn with_capacity(source_len: usize) -> Self {
        let mut arena = Self::new();
        let estimated = source_len / 24;
        arena.stmts.reserve(estimated);
        arena.values.reserve(estimated * 2);
        arena
    }

    // === Allocation ===

    pub fn alloc_def(&mut self, def: Definition) -> DefId {
        let id = DefId::from_raw(self.next_raw(self.defs.len()));
        self.defs.push(def);
        id
    }

    pub fn alloc_type(&mut self, ty: TypeNode) -> TypeId {
        let id = TypeId::from_raw(self.next_raw(self.types.len()));
        self.types.push(ty);
        id
    }

    pub fn alloc_value(&mut self, value: Value) -> ValueId {
        let id = ValueId::from_raw(self.next_raw(self.values.len()));
        self.values.push(value);
        id
    }

    pub fn alloc_template(&mut self, template: Template) -> TemplateId {
        let id = TemplateId::from_raw(self.next_raw(self.templates.len()));
        self.templates.push(template);
        id
    }

    pub fn alloc_stmt(&mut self, stmt: Statement) -> StmtId {
        let id = StmtId::from_raw(self.next_raw(self.stmts.len()));
        self.stmts.push(stmt);
        id
    }

    pub fn alloc_block(&mut self, block: StatementBlock) -> BlockId {
        let id = BlockId::from_raw(self.next_raw(self.blocks.len()));
        self.blocks.push(block);
        id
    }

    /// Allocate a scope and register it with its parent.
    pub fn alloc_scope(
        &mut self,
        parent: ScopeId,
        kind: ScopeKind,
        name: Option<crate::Name>,
        covers: Span,
    ) -> ScopeId {
        let id = ScopeId::from_raw(self.next_raw(self.scopes.len()));
        self.scopes.push(Scope::new(Some(parent), kind, name));
        self.scopes[parent.index()].register_child(covers, id);
        id
    }

    #[allow(
        clippy::unused_self,
        reason = "kept on self so the capacity policy stays in one place"
    )]
    fn next_raw(&self, len: usize) -> u32 {
        u32::try_from(len).unwrap_or_else(|_| panic!("arena capacity exceeded"))
    }

    // === Accessors ===

    pub fn def(&self, id: DefId) -> &Definition {
        &self.defs[id.index()]
    }

    pub fn def_mut(&mut self, id: DefId) -> &mut Definition {
        &mut self.defs[id.index()]
    }

    pub fn ty(&self, id: TypeId) -> &TypeNode {
        &self.types[id.index()]
    }

    pub fn ty_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.types[id.index()]
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    pub fn value_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.values[id.index()]
    }

    pub fn template(&self, id: TemplateId) -> &Template {
        &self.templates[id.index()]
    }

    pub fn template_mut(&mut self, id: TemplateId) -> &mut Template {
        &mut self.templates[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &Statement {
        &self.stmts[id.index()]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Statement {
        &mut self.stmts[id.index()]
    }

    pub fn block(&self, id: BlockId) -> &StatementBlock {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut StatementBlock {
        &mut self.blocks[id.index()]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn def_count(&self) -> usize {
        self.defs.len()
    }

    /// Shared meta of any node.
    pub fn meta(&self, node: NodeRef) -> &NodeMeta {
        match node {
            NodeRef::Def(id) => &self.def(id).meta,
            NodeRef::Type(id) => &self.ty(id).meta,
            NodeRef::Value(id) => &self.value(id).meta,
            NodeRef::Template(id) => &self.template(id).meta,
            NodeRef::Stmt(id) => &self.stmt(id).meta,
            NodeRef::Block(id) => &self.block(id).meta,
        }
    }

    pub fn meta_mut(&mut self, node: NodeRef) -> &mut NodeMeta {
        match node {
            NodeRef::Def(id) => &mut self.def_mut(id).meta,
            NodeRef::Type(id) => &mut self.ty_mut(id).meta,
            NodeRef::Value(id) => &mut self.value_mut(id).meta,
            NodeRef::Template(id) => &mut self.template_mut(id).meta,
            NodeRef::Stmt(id) => &mut self.stmt_mut(id).meta,
            NodeRef::Block(id) => &mut self.block_mut(id).meta,
        }
    }

    // === Name lookup ===

    /// Walk the scope chain from `scope` outward looking for `name`.
    ///
    /// Returns the defining entity and the scope it was found in.
    pub fn lookup(&self, scope: ScopeId, name: crate::Name) -> Option<(DefId, ScopeId)> {
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            let scope = self.scope(scope_id);
            if let Some(def) = scope.get_local(name) {
                return Some((def, scope_id));
            }
            current = scope.parent;
        }
        None
    }

    /// Look `name` up starting from the parent of `scope`.
    ///
    /// Used for shadowing detection: a hit means an outer definition is
    /// hidden by a local one.
    pub fn lookup_outer(&self, scope: ScopeId, name: crate::Name) -> Option<(DefId, ScopeId)> {
        self.scope(scope).parent.and_then(|p| self.lookup(p, name))
    }

    /// Dot-separated qualified name derived from the ancestor chain.
    ///
    /// Computed on demand; the ancestor chain is the single source of
    /// truth, so a relocated subtree needs no fix-up.
    pub fn full_name(&self, node: NodeRef, interner: &StringInterner) -> String {
        let mut parts: Vec<&str> = Vec::new();
        match node {
            NodeRef::Def(id) => parts.push(interner.lookup(self.def(id).name)),
            NodeRef::Type(id) => {
                if let TypeKind::Component { name, .. }
                | TypeKind::Port { name, .. }
                | TypeKind::Record { name, .. } = &self.ty(id).kind
                {
                    parts.push(interner.lookup(*name));
                }
            }
            _ => {}
        }
        let mut current = Some(self.meta(node).scope);
        while let Some(scope_id) = current {
            let scope = self.scope(scope_id);
            if let Some(name) = scope.name {
                parts.push(interner.lookup(name));
            }
            current = scope.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    // === Incremental-reparse support ===

    /// Insert a statement into a block keeping the offset order, via
    /// binary search on the span start.
    pub fn insert_stmt_sorted(&mut self, block: BlockId, stmt: StmtId) {
        let start = self.stmt(stmt).meta.loc.span.start;
        let stmts = &self.blocks[block.index()].stmts;
        let at = stmts
            .binary_search_by_key(&start, |&s| self.stmts[s.index()].meta.loc.span.start)
            .unwrap_or_else(|insert_at| insert_at);
        self.blocks[block.index()].stmts.insert(at, stmt);
    }

    /// Direct children of a node, for subtree walks.
    pub fn children_of(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        match node {
            NodeRef::Def(id) => collect_def_children(self.def(id), &mut out),
            NodeRef::Type(_) => {}
            NodeRef::Value(id) => collect_value_children(&self.value(id).kind, &mut out),
            NodeRef::Template(id) => collect_template_children(&self.template(id).kind, &mut out),
            NodeRef::Stmt(id) => collect_stmt_children(&self.stmt(id).kind, &mut out),
            NodeRef::Block(id) => {
                out.extend(self.block(id).stmts.iter().map(|&s| NodeRef::Stmt(s)));
            }
        }
        out
    }

    /// Shift the spans of a whole subtree by `delta`.
    ///
    /// Used by the reparse engine on statements that survive an edit
    /// unchanged but sit after the damaged region.
    pub fn shift_subtree(&mut self, root: NodeRef, delta: i64) {
        let mut worklist = vec![root];
        while let Some(node) = worklist.pop() {
            let meta = self.meta_mut(node);
            meta.loc.span = meta.loc.span.shifted(delta);
            worklist.extend(self.children_of(node));
        }
    }

    /// Shift registered child-scope intervals at or after `offset`,
    /// recursively, so damage lookups keep working after an edit.
    pub fn shift_scope_intervals(&mut self, scope: ScopeId, offset: u32, delta: i64) {
        let children: Vec<ScopeId> = {
            let scope = self.scope_mut(scope);
            for (covers, _) in &mut scope.children {
                if covers.start >= offset {
                    *covers = covers.shifted(delta);
                } else if covers.end > offset {
                    *covers = Span::new(covers.start, covers.shifted(delta).end);
                }
            }
            scope.children.iter().map(|(_, child)| *child).collect()
        };
        for child in children {
            self.shift_scope_intervals(child, offset, delta);
        }
    }
}

fn collect_def_children(def: &Definition, out: &mut Vec<NodeRef>) {
    use crate::def::DefBody;
    match &def.body {
        DefBody::Function { body, .. } => out.push(NodeRef::Block(*body)),
        DefBody::Altstep { guards, .. } => {
            for guard in &guards.guards {
                if let Some(value) = guard.guard {
                    out.push(NodeRef::Value(value));
                }
                out.push(NodeRef::Block(guard.block));
            }
        }
        DefBody::Testcase { body, .. } => out.push(NodeRef::Block(*body)),
        DefBody::Constant { init } => out.push(NodeRef::Value(*init)),
        DefBody::Variable { init } => {
            if let Some(init) = init {
                out.push(NodeRef::Value(*init));
            }
        }
        DefBody::Template { template } => out.push(NodeRef::Template(*template)),
        DefBody::Port => {}
        DefBody::Timer { default_duration } => {
            if let Some(duration) = default_duration {
                out.push(NodeRef::Value(*duration));
            }
        }
    }
}

fn collect_value_children(kind: &ValueKind, out: &mut Vec<NodeRef>) {
    match kind {
        ValueKind::Reference(reference) => {
            for subref in &reference.subrefs {
                match subref {
                    SubRef::Field(_) => {}
                    SubRef::Index(value) => out.push(NodeRef::Value(*value)),
                    SubRef::Call(args) => {
                        out.extend(args.iter().map(|&a| NodeRef::Value(a)));
                    }
                }
            }
        }
        ValueKind::Unary { operand, .. } => out.push(NodeRef::Value(*operand)),
        ValueKind::Binary { lhs, rhs, .. } => {
            out.push(NodeRef::Value(*lhs));
            out.push(NodeRef::Value(*rhs));
        }
        _ => {}
    }
}

fn collect_template_children(kind: &TemplateKind, out: &mut Vec<NodeRef>) {
    match kind {
        TemplateKind::Specific(value) => out.push(NodeRef::Value(*value)),
        TemplateKind::ValueList(entries) => {
            out.extend(entries.iter().map(|&t| NodeRef::Template(t)));
        }
        TemplateKind::FieldAssignments(fields) => {
            out.extend(fields.iter().map(|(_, t)| NodeRef::Template(*t)));
        }
        _ => {}
    }
}

fn collect_stmt_children(kind: &StmtKind, out: &mut Vec<NodeRef>) {
    match kind {
        StmtKind::Block(block) => out.push(NodeRef::Block(*block)),
        StmtKind::Def(def) => out.push(NodeRef::Def(*def)),
        StmtKind::Assign { lhs, rhs } => {
            out.push(NodeRef::Value(*lhs));
            out.push(NodeRef::Value(*rhs));
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            out.push(NodeRef::Value(*cond));
            out.push(NodeRef::Block(*then_block));
            if let Some(else_block) = else_block {
                out.push(NodeRef::Block(*else_block));
            }
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { cond, body } => {
            out.push(NodeRef::Value(*cond));
            out.push(NodeRef::Block(*body));
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(init) = init {
                out.push(NodeRef::Stmt(*init));
            }
            out.push(NodeRef::Value(*cond));
            if let Some(step) = step {
                out.push(NodeRef::Stmt(*step));
            }
            out.push(NodeRef::Block(*body));
        }
        StmtKind::Return(value_opt) => {
            if let Some(v) = value_opt {
                out.push(NodeRef::Value(*v));
            }
        }
        StmtKind::Alt(guards) | StmtKind::Interleave(guards) => {
            for guard in &guards.guards {
                if let Some(v) = guard.guard {
                    out.push(NodeRef::Value(v));
                }
                collect_guard_op_children(&guard.op, out);
                out.push(NodeRef::Block(guard.block));
            }
        }
        StmtKind::Invoke { args, .. } => {
            out.extend(args.iter().map(|&a| NodeRef::Value(a)));
        }
        StmtKind::Send { template, .. } => out.push(NodeRef::Template(*template)),
        StmtKind::Receive { template, .. } => {
            if let Some(template) = template {
                out.push(NodeRef::Template(*template));
            }
        }
        StmtKind::TimerStart { duration, .. } => {
            if let Some(d) = duration {
                out.push(NodeRef::Value(*d));
            }
        }
        StmtKind::SetVerdict(v) | StmtKind::Log(v) => out.push(NodeRef::Value(*v)),
        StmtKind::Label(_)
        | StmtKind::Goto(_)
        | StmtKind::TimerStop { .. }
        | StmtKind::Repeat
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Stop => {}
    }
}

fn collect_guard_op_children(op: &crate::stmt::GuardOp, out: &mut Vec<NodeRef>) {
    use crate::stmt::GuardOp;
    match op {
        GuardOp::Receive { template, .. }
        | GuardOp::Trigger { template, .. }
        | GuardOp::GetCall { template, .. }
        | GuardOp::GetReply { template, .. } => {
            if let Some(template) = template {
                out.push(NodeRef::Template(*template));
            }
        }
        GuardOp::Invoke { args, .. } => {
            out.extend(args.iter().map(|&a| NodeRef::Value(a)));
        }
        GuardOp::Timeout { .. } | GuardOp::Done { .. } | GuardOp::Else => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loc::FileId;
    use crate::node::AssignmentKind;
    use crate::StringInterner;

    fn loc(start: u32, end: u32) -> Location {
        Location::new(FileId(0), Span::new(start, end), 1)
    }

    #[test]
    fn test_primitives_are_preinterned() {
        let arena = AstArena::new();
        assert!(matches!(arena.ty(TypeId::INTEGER).kind, TypeKind::Integer));
        assert!(matches!(
            arena.ty(TypeId::UNDEFINED).kind,
            TypeKind::Undefined
        ));
    }

    #[test]
    fn test_lookup_walks_parent_chain() {
        let interner = StringInterner::new();
        let mut arena = AstArena::new();
        let name = interner.intern("limit");
        let module = arena.alloc_scope(
            AstArena::GLOBAL_SCOPE,
            ScopeKind::Module,
            Some(interner.intern("m")),
            Span::new(0, 100),
        );
        let inner = arena.alloc_scope(module, ScopeKind::Block, None, Span::new(10, 90));
        let init = arena.alloc_value(Value {
            kind: ValueKind::IntLit(3),
            meta: NodeMeta::new(module, loc(8, 9)),
        });
        let def = arena.alloc_def(Definition {
            name,
            kind: AssignmentKind::Constant,
            ty: TypeId::INTEGER,
            body: crate::def::DefBody::Constant { init },
            meta: NodeMeta::new(module, loc(0, 9)),
        });
        arena.scope_mut(module).declare(name, def);

        assert_eq!(arena.lookup(inner, name), Some((def, module)));
        assert_eq!(arena.lookup(inner, interner.intern("missing")), None);
    }

    #[test]
    fn test_full_name_from_ancestor_chain() {
        let interner = StringInterner::new();
        let mut arena = AstArena::new();
        let module = arena.alloc_scope(
            AstArena::GLOBAL_SCOPE,
            ScopeKind::Module,
            Some(interner.intern("proto_tests")),
            Span::new(0, 200),
        );
        let init = arena.alloc_value(Value {
            kind: ValueKind::IntLit(0),
            meta: NodeMeta::new(module, loc(10, 11)),
        });
        let def = arena.alloc_def(Definition {
            name: interner.intern("retry_count"),
            kind: AssignmentKind::Constant,
            ty: TypeId::INTEGER,
            body: crate::def::DefBody::Constant { init },
            meta: NodeMeta::new(module, loc(0, 11)),
        });
        assert_eq!(
            arena.full_name(NodeRef::Def(def), &interner),
            "proto_tests.retry_count"
        );
    }

    #[test]
    fn test_insert_stmt_sorted() {
        let mut arena = AstArena::new();
        let scope = arena.alloc_scope(
            AstArena::GLOBAL_SCOPE,
            ScopeKind::Block,
            None,
            Span::new(0, 100),
        );
        let block = arena.alloc_block(StatementBlock {
            scope,
            stmts: Vec::new(),
            flags: crate::stmt::BlockFlags::empty(),
            labels: Vec::new(),
            cached_returns: None,
            meta: NodeMeta::new(scope, loc(0, 100)),
        });
        let mk = |arena: &mut AstArena, start: u32| {
            arena.alloc_stmt(Statement {
                kind: StmtKind::Stop,
                meta: NodeMeta::new(scope, loc(start, start + 5)),
            })
        };
        let s40 = mk(&mut arena, 40);
        let s10 = mk(&mut arena, 10);
        let s25 = mk(&mut arena, 25);
        arena.insert_stmt_sorted(block, s40);
        arena.insert_stmt_sorted(block, s10);
        arena.insert_stmt_sorted(block, s25);
        assert_eq!(arena.block(block).stmts, vec![s10, s25, s40]);
    }

    #[test]
    fn test_shift_subtree() {
        let mut arena = AstArena::new();
        let scope = arena.alloc_scope(
            AstArena::GLOBAL_SCOPE,
            ScopeKind::Block,
            None,
            Span::new(0, 100),
        );
        let operand = arena.alloc_value(Value {
            kind: ValueKind::IntLit(1),
            meta: NodeMeta::new(scope, loc(14, 15)),
        });
        let value = arena.alloc_value(Value {
            kind: ValueKind::Unary {
                op: crate::value::UnaryOp::Neg,
                operand,
            },
            meta: NodeMeta::new(scope, loc(13, 15)),
        });
        let stmt = arena.alloc_stmt(Statement {
            kind: StmtKind::Log(value),
            meta: NodeMeta::new(scope, loc(10, 16)),
        });
        arena.shift_subtree(NodeRef::Stmt(stmt), 4);
        assert_eq!(arena.stmt(stmt).meta.loc.span, Span::new(14, 20));
        assert_eq!(arena.value(value).meta.loc.span, Span::new(17, 19));
        assert_eq!(arena.value(operand).meta.loc.span, Span::new(18, 19));
    }
}
