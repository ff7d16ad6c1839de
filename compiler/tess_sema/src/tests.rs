//! Checker tests: memoization, cycles, control flow, alt legality.

use pretty_assertions::assert_eq;

use tess_ast::{
    AltGuard, AltGuards, AssignmentKind, AstArena, BlockFlags, BlockId, CompilationClock, DefBody,
    DefId, Definition, FileId, GuardOp, Location, Module, NodeMeta, PortClass, Reference, ScopeId,
    ScopeKind, Span, Statement, StatementBlock, StmtId, StmtKind, StringInterner, Template,
    TemplateId, TemplateKind, TypeId, TypeKind, TypeNode, Value, ValueId, ValueKind,
};
use tess_diagnostic::{Diagnostic, ErrorCode, ReportLevel, SeverityConfig};

use crate::{check_module, CheckConfig, DiagnosticStore};

struct Builder {
    arena: AstArena,
    interner: StringInterner,
    module: Module,
    cursor: u32,
}

impl Builder {
    fn new() -> Self {
        let interner = StringInterner::new();
        let mut arena = AstArena::new();
        let name = interner.intern("suite");
        let root = arena.alloc_scope(
            AstArena::GLOBAL_SCOPE,
            ScopeKind::Module,
            Some(name),
            Span::new(0, 10_000),
        );
        let module = Module::new(
            name,
            FileId(0),
            root,
            NodeMeta::new(root, Location::new(FileId(0), Span::new(0, 10_000), 1)),
        );
        Builder {
            arena,
            interner,
            module,
            cursor: 1,
        }
    }

    fn next_loc(&mut self, len: u32) -> Location {
        let start = self.cursor;
        self.cursor += len + 1;
        Location::new(FileId(0), Span::new(start, start + len), 1)
    }

    fn scope(&mut self, parent: ScopeId) -> ScopeId {
        self.arena
            .alloc_scope(parent, ScopeKind::Block, None, Span::new(0, 10_000))
    }

    fn value(&mut self, scope: ScopeId, kind: ValueKind) -> ValueId {
        let loc = self.next_loc(3);
        self.arena.alloc_value(Value {
            kind,
            meta: NodeMeta::new(scope, loc),
        })
    }

    fn int(&mut self, scope: ScopeId, v: i64) -> ValueId {
        self.value(scope, ValueKind::IntLit(v))
    }

    fn boolean(&mut self, scope: ScopeId, v: bool) -> ValueId {
        self.value(scope, ValueKind::BoolLit(v))
    }

    fn refv(&mut self, scope: ScopeId, name: &str) -> ValueId {
        let name = self.interner.intern(name);
        self.value(scope, ValueKind::Reference(Reference::plain(name)))
    }

    fn stmt(&mut self, scope: ScopeId, kind: StmtKind) -> StmtId {
        let loc = self.next_loc(6);
        self.arena.alloc_stmt(Statement {
            kind,
            meta: NodeMeta::new(scope, loc),
        })
    }

    fn block_of(&mut self, scope: ScopeId, flags: BlockFlags, stmts: Vec<StmtId>) -> BlockId {
        let loc = self.next_loc(20);
        self.arena.alloc_block(StatementBlock {
            scope,
            stmts,
            flags,
            labels: Vec::new(),
            cached_returns: None,
            meta: NodeMeta::new(scope, loc),
        })
    }

    fn add_def(&mut self, name: &str, kind: AssignmentKind, ty: TypeId, body: DefBody) -> DefId {
        let name = self.interner.intern(name);
        let loc = self.next_loc(10);
        let def = self.arena.alloc_def(Definition {
            name,
            kind,
            ty,
            body,
            meta: NodeMeta::new(self.module.root_scope, loc),
        });
        self.arena.scope_mut(self.module.root_scope).declare(name, def);
        self.module.defs.push(def);
        def
    }

    fn add_const(&mut self, name: &str, ty: TypeId, init: ValueId) -> DefId {
        self.add_def(name, AssignmentKind::Constant, ty, DefBody::Constant { init })
    }

    fn add_function(&mut self, name: &str, return_type: Option<TypeId>, body: BlockId) -> DefId {
        self.add_def(
            name,
            AssignmentKind::Function,
            return_type.unwrap_or(TypeId::UNDEFINED),
            DefBody::Function {
                params: Vec::new(),
                runs_on: None,
                return_type,
                body,
            },
        )
    }

    fn add_component_type(&mut self, name: &str, extends: Option<TypeId>) -> TypeId {
        let name = self.interner.intern(name);
        let loc = self.next_loc(10);
        self.arena.alloc_type(TypeNode {
            kind: TypeKind::Component {
                name,
                extends,
                defs: Vec::new(),
            },
            meta: NodeMeta::new(self.module.root_scope, loc),
        })
    }

    fn check(&mut self, store: &mut DiagnosticStore, ts: tess_ast::CompilationTimestamp) {
        self.check_with(store, ts, &CheckConfig::default());
    }

    fn check_with(
        &mut self,
        store: &mut DiagnosticStore,
        ts: tess_ast::CompilationTimestamp,
        config: &CheckConfig,
    ) {
        check_module(
            &mut self.arena,
            &self.interner,
            store,
            config,
            &mut self.module,
            ts,
        );
    }
}

fn count(diags: &[Diagnostic], code: ErrorCode) -> usize {
    diags.iter().filter(|d| d.code == code).count()
}

fn quiet_config() -> CheckConfig {
    CheckConfig {
        severity: SeverityConfig {
            empty_block: ReportLevel::Ignore,
            ..SeverityConfig::default()
        },
    }
}

// === Memoization ===

#[test]
fn test_check_same_timestamp_is_idempotent() {
    let mut b = Builder::new();
    let init = b.int(b.module.root_scope, 3);
    b.add_const("max_retries", TypeId::INTEGER, init);
    let body_scope = b.scope(b.module.root_scope);
    let body = b.block_of(body_scope, BlockFlags::empty(), Vec::new());
    b.add_function("empty_fn", None, body);

    let mut clock = CompilationClock::new();
    let t1 = clock.tick();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, t1);
    let first = store.collect();
    // The empty function body warns once.
    assert_eq!(count(&first, ErrorCode::W9002), 1);

    b.check(&mut store, t1);
    let second = store.collect();
    assert_eq!(first, second);
}

#[test]
fn test_newer_timestamp_revalidates_older_does_not() {
    let mut b = Builder::new();
    let init = b.int(b.module.root_scope, 3);
    b.add_const("width", TypeId::INTEGER, init);

    let mut clock = CompilationClock::new();
    let t1 = clock.tick();
    let t2 = clock.tick();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, t1);
    assert_eq!(store.collect(), Vec::new());

    // Break the initializer without touching any stamps.
    b.arena.value_mut(init).kind = ValueKind::BoolLit(true);

    // Same timestamp: a no-op, the breakage stays unnoticed.
    b.check(&mut store, t1);
    assert_eq!(store.collect(), Vec::new());

    // Newer timestamp: re-validates and reports.
    b.check(&mut store, t2);
    let diags = store.collect();
    assert_eq!(count(&diags, ErrorCode::E2004), 1);

    // And the newer pass is itself idempotent.
    b.check(&mut store, t2);
    assert_eq!(store.collect(), diags);
}

// === Cycle detection ===

#[test]
fn test_mutual_constants_yield_exactly_one_cycle_error() {
    let mut b = Builder::new();
    let root = b.module.root_scope;
    let ra = b.refv(root, "c_b");
    b.add_const("c_a", TypeId::INTEGER, ra);
    let rb = b.refv(root, "c_c");
    b.add_const("c_b", TypeId::INTEGER, rb);
    let rc = b.refv(root, "c_a");
    b.add_const("c_c", TypeId::INTEGER, rc);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    let diags = store.collect();
    assert_eq!(count(&diags, ErrorCode::E2003), 1);

    // A later pass converges to the same single error.
    b.check(&mut store, clock.tick());
    assert_eq!(count(&store.collect(), ErrorCode::E2003), 1);
}

#[test]
fn test_self_referential_constant() {
    let mut b = Builder::new();
    let root = b.module.root_scope;
    let r = b.refv(root, "c_self");
    b.add_const("c_self", TypeId::INTEGER, r);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    assert_eq!(count(&store.collect(), ErrorCode::E2003), 1);
}

#[test]
fn test_sibling_references_are_not_cycles() {
    // Two constants referencing a third: the chain rewind must keep
    // the diamond from looking circular.
    let mut b = Builder::new();
    let root = b.module.root_scope;
    let base = b.int(root, 1);
    b.add_const("c_base", TypeId::INTEGER, base);
    let r1 = b.refv(root, "c_base");
    b.add_const("c_one", TypeId::INTEGER, r1);
    let r2 = b.refv(root, "c_base");
    b.add_const("c_two", TypeId::INTEGER, r2);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    assert_eq!(count(&store.collect(), ErrorCode::E2003), 0);
}

// === Return-status lattice ===

#[test]
fn test_if_else_both_return_is_yes() {
    let mut b = Builder::new();
    let fn_scope = b.scope(b.module.root_scope);
    let cond = b.boolean(fn_scope, true);
    let then_scope = b.scope(fn_scope);
    let v1 = b.int(then_scope, 1);
    let ret1 = b.stmt(then_scope, StmtKind::Return(Some(v1)));
    let then_block = b.block_of(then_scope, BlockFlags::empty(), vec![ret1]);
    let else_scope = b.scope(fn_scope);
    let v2 = b.int(else_scope, 2);
    let ret2 = b.stmt(else_scope, StmtKind::Return(Some(v2)));
    let else_block = b.block_of(else_scope, BlockFlags::empty(), vec![ret2]);
    let if_stmt = b.stmt(
        fn_scope,
        StmtKind::If {
            cond,
            then_block,
            else_block: Some(else_block),
        },
    );
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![if_stmt]);
    b.add_function("both_return", Some(TypeId::INTEGER), body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    assert_eq!(count(&store.collect(), ErrorCode::E2018), 0);
}

#[test]
fn test_if_without_else_is_maybe() {
    let mut b = Builder::new();
    let fn_scope = b.scope(b.module.root_scope);
    let cond = b.boolean(fn_scope, true);
    let then_scope = b.scope(fn_scope);
    let v1 = b.int(then_scope, 1);
    let ret1 = b.stmt(then_scope, StmtKind::Return(Some(v1)));
    let then_block = b.block_of(then_scope, BlockFlags::empty(), vec![ret1]);
    let if_stmt = b.stmt(
        fn_scope,
        StmtKind::If {
            cond,
            then_block,
            else_block: None,
        },
    );
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![if_stmt]);
    b.add_function("maybe_returns", Some(TypeId::INTEGER), body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    assert_eq!(count(&store.collect(), ErrorCode::E2018), 1);
}

#[test]
fn test_unreachable_after_return_warned_exactly_once() {
    let mut b = Builder::new();
    let fn_scope = b.scope(b.module.root_scope);
    let ret = b.stmt(fn_scope, StmtKind::Return(None));
    let v = b.int(fn_scope, 1);
    let log = b.stmt(fn_scope, StmtKind::Log(v));
    let stop = b.stmt(fn_scope, StmtKind::Stop);
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![ret, log, stop]);
    b.add_function("unreachable_tail", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    assert_eq!(count(&store.collect(), ErrorCode::W9001), 1);
}

// === Goto and labels ===

#[test]
fn test_backward_goto_reports_infinite_loop() {
    let mut b = Builder::new();
    let fn_scope = b.scope(b.module.root_scope);
    let lbl_name = b.interner.intern("again");
    let label = b.stmt(fn_scope, StmtKind::Label(lbl_name));
    let v = b.int(fn_scope, 0);
    let log = b.stmt(fn_scope, StmtKind::Log(v));
    let goto = b.stmt(fn_scope, StmtKind::Goto(lbl_name));
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![label, log, goto]);
    b.add_function("spin", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    let diags = store.collect();
    assert_eq!(count(&diags, ErrorCode::E2017), 1);
    assert_eq!(count(&diags, ErrorCode::W9005), 0);
}

#[test]
fn test_forward_goto_skips_unreachable_analysis() {
    let mut b = Builder::new();
    let fn_scope = b.scope(b.module.root_scope);
    let lbl_name = b.interner.intern("done");
    let goto = b.stmt(fn_scope, StmtKind::Goto(lbl_name));
    let stop = b.stmt(fn_scope, StmtKind::Stop);
    let label = b.stmt(fn_scope, StmtKind::Label(lbl_name));
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![goto, stop, label]);
    b.add_function("jump_over", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    let diags = store.collect();
    // The skipped statement draws no unreachable warning, and the
    // label counts as used.
    assert_eq!(count(&diags, ErrorCode::W9001), 0);
    assert_eq!(count(&diags, ErrorCode::W9005), 0);
    assert_eq!(count(&diags, ErrorCode::E2017), 0);
}

#[test]
fn test_undefined_and_unused_labels() {
    let mut b = Builder::new();
    let fn_scope = b.scope(b.module.root_scope);
    let missing = b.interner.intern("nowhere");
    let goto = b.stmt(fn_scope, StmtKind::Goto(missing));
    let lonely = b.interner.intern("lonely");
    let label = b.stmt(fn_scope, StmtKind::Label(lonely));
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![goto, label]);
    b.add_function("label_trouble", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    let diags = store.collect();
    assert_eq!(count(&diags, ErrorCode::E2015), 1);
    assert_eq!(count(&diags, ErrorCode::W9005), 1);
}

// === Duplicates and shadowing ===

#[test]
fn test_duplicate_definition_reports_both_locations() {
    let mut b = Builder::new();
    let root = b.module.root_scope;
    let i1 = b.int(root, 1);
    b.add_const("dup", TypeId::INTEGER, i1);
    let i2 = b.int(root, 2);
    b.add_const("dup", TypeId::INTEGER, i2);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    let diags = store.collect();
    assert_eq!(count(&diags, ErrorCode::E2002), 1);
    let dup = diags
        .iter()
        .find(|d| d.code == ErrorCode::E2002)
        .map(|d| d.labels.len());
    assert_eq!(dup, Some(2));
}

#[test]
fn test_shadowing_is_warned_but_legal() {
    let mut b = Builder::new();
    let root = b.module.root_scope;
    let i1 = b.int(root, 1);
    b.add_const("timeout_s", TypeId::INTEGER, i1);

    let fn_scope = b.scope(root);
    let local_name = b.interner.intern("timeout_s");
    let loc = b.next_loc(8);
    let i2 = b.int(fn_scope, 2);
    let local = b.arena.alloc_def(Definition {
        name: local_name,
        kind: AssignmentKind::Variable,
        ty: TypeId::INTEGER,
        body: DefBody::Variable { init: Some(i2) },
        meta: NodeMeta::new(fn_scope, loc),
    });
    b.arena.scope_mut(fn_scope).declare(local_name, local);
    let decl = b.stmt(fn_scope, StmtKind::Def(local));
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![decl]);
    b.add_function("shadower", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    let diags = store.collect();
    assert_eq!(count(&diags, ErrorCode::W9004), 1);
    assert!(!diags.iter().any(Diagnostic::is_error));
}

// === Alt / altstep / interleave legality ===

fn message_port(b: &mut Builder, name: &str) -> DefId {
    let type_name = b.interner.intern(name);
    let loc = b.next_loc(10);
    let port_ty = b.arena.alloc_type(TypeNode {
        kind: TypeKind::Port {
            name: type_name,
            kind: PortClass::Message,
            in_types: vec![TypeId::CHARSTRING],
            out_types: vec![TypeId::CHARSTRING],
        },
        meta: NodeMeta::new(b.module.root_scope, loc),
    });
    b.add_def("pco", AssignmentKind::Port, port_ty, DefBody::Port)
}

fn empty_altstep(b: &mut Builder, name: &str, runs_on: Option<TypeId>) -> DefId {
    b.add_def(
        name,
        AssignmentKind::Altstep,
        TypeId::UNDEFINED,
        DefBody::Altstep {
            params: Vec::new(),
            runs_on,
            guards: AltGuards::default(),
        },
    )
}

#[test]
fn test_altstep_invocation_guard_rejected_in_interleave() {
    let mut b = Builder::new();
    empty_altstep(&mut b, "as_fallback", None);

    let fn_scope = b.scope(b.module.root_scope);
    let guard_scope = b.scope(fn_scope);
    let guard_block = b.block_of(guard_scope, BlockFlags::OWNER_IS_INTERLEAVE, Vec::new());
    let callee = Reference::plain(b.interner.intern("as_fallback"));
    let loc = b.next_loc(6);
    let guards = AltGuards::new(vec![AltGuard {
        guard: None,
        op: GuardOp::Invoke {
            callee,
            args: Vec::new(),
        },
        block: guard_block,
        loc,
    }]);
    let inter = b.stmt(fn_scope, StmtKind::Interleave(guards));
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![inter]);
    b.add_function("driver", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check_with(&mut store, clock.tick(), &quiet_config());
    assert_eq!(count(&store.collect(), ErrorCode::E2013), 1);
}

#[test]
fn test_altstep_invocation_statement_rejected_in_interleave() {
    let mut b = Builder::new();
    empty_altstep(&mut b, "as_watch", None);
    message_port(&mut b, "PcoType");

    let fn_scope = b.scope(b.module.root_scope);
    let guard_scope = b.scope(fn_scope);
    let callee = Reference::plain(b.interner.intern("as_watch"));
    let invoke = b.stmt(
        guard_scope,
        StmtKind::Invoke {
            callee,
            args: Vec::new(),
        },
    );
    let guard_block = b.block_of(guard_scope, BlockFlags::OWNER_IS_INTERLEAVE, vec![invoke]);
    let port = Reference::plain(b.interner.intern("pco"));
    let loc = b.next_loc(6);
    let guards = AltGuards::new(vec![AltGuard {
        guard: None,
        op: GuardOp::Receive {
            port,
            template: None,
        },
        block: guard_block,
        loc,
    }]);
    let inter = b.stmt(fn_scope, StmtKind::Interleave(guards));
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![inter]);
    b.add_function("driver", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check_with(&mut store, clock.tick(), &quiet_config());
    assert_eq!(count(&store.collect(), ErrorCode::E2013), 1);
}

#[test]
fn test_return_rejected_in_interleave_even_unreachable() {
    let mut b = Builder::new();
    message_port(&mut b, "PcoType");

    let fn_scope = b.scope(b.module.root_scope);
    let guard_scope = b.scope(fn_scope);
    let stop = b.stmt(guard_scope, StmtKind::Stop);
    // The return sits after an unconditional stop: unreachable, still
    // a hard error.
    let ret = b.stmt(guard_scope, StmtKind::Return(None));
    let guard_block = b.block_of(guard_scope, BlockFlags::OWNER_IS_INTERLEAVE, vec![stop, ret]);
    let port = Reference::plain(b.interner.intern("pco"));
    let loc = b.next_loc(6);
    let guards = AltGuards::new(vec![AltGuard {
        guard: None,
        op: GuardOp::Receive {
            port,
            template: None,
        },
        block: guard_block,
        loc,
    }]);
    let inter = b.stmt(fn_scope, StmtKind::Interleave(guards));
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![inter]);
    b.add_function("driver", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check_with(&mut store, clock.tick(), &quiet_config());
    assert_eq!(count(&store.collect(), ErrorCode::E2012), 1);
}

#[test]
fn test_guard_expression_rejected_in_interleave() {
    let mut b = Builder::new();
    message_port(&mut b, "PcoType");

    let fn_scope = b.scope(b.module.root_scope);
    let guard_scope = b.scope(fn_scope);
    let guard_block = b.block_of(guard_scope, BlockFlags::OWNER_IS_INTERLEAVE, Vec::new());
    let guard_value = b.boolean(fn_scope, true);
    let port = Reference::plain(b.interner.intern("pco"));
    let loc = b.next_loc(6);
    let guards = AltGuards::new(vec![AltGuard {
        guard: Some(guard_value),
        op: GuardOp::Receive {
            port,
            template: None,
        },
        block: guard_block,
        loc,
    }]);
    let inter = b.stmt(fn_scope, StmtKind::Interleave(guards));
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![inter]);
    b.add_function("driver", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check_with(&mut store, clock.tick(), &quiet_config());
    assert_eq!(count(&store.collect(), ErrorCode::E2023), 1);
}

#[test]
fn test_runs_on_self_altstep_value_cannot_be_dereferenced() {
    let mut b = Builder::new();
    let loc = b.next_loc(10);
    let altstep_ty = b.arena.alloc_type(TypeNode {
        kind: TypeKind::Altstep {
            runs_on: None,
            runs_on_self: true,
        },
        meta: NodeMeta::new(b.module.root_scope, loc),
    });
    b.add_def(
        "v_step",
        AssignmentKind::Variable,
        altstep_ty,
        DefBody::Variable { init: None },
    );

    let fn_scope = b.scope(b.module.root_scope);
    let callee = Reference::plain(b.interner.intern("v_step"));
    let invoke = b.stmt(
        fn_scope,
        StmtKind::Invoke {
            callee,
            args: Vec::new(),
        },
    );
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![invoke]);
    b.add_function("dyn_driver", None, body);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check_with(&mut store, clock.tick(), &quiet_config());
    assert_eq!(count(&store.collect(), ErrorCode::E2009), 1);
}

#[test]
fn test_runs_on_compatibility_is_not_identity() {
    let mut b = Builder::new();
    let base = b.add_component_type("BaseComp", None);
    let derived = b.add_component_type("DerivedComp", Some(base));
    let stranger = b.add_component_type("StrangerComp", None);
    empty_altstep(&mut b, "as_on_base", Some(base));

    // Derived component extends the base: compatible, no error.
    let fn_scope = b.scope(b.module.root_scope);
    let callee = Reference::plain(b.interner.intern("as_on_base"));
    let invoke = b.stmt(
        fn_scope,
        StmtKind::Invoke {
            callee: callee.clone(),
            args: Vec::new(),
        },
    );
    let body = b.block_of(fn_scope, BlockFlags::empty(), vec![invoke]);
    let ok_fn = b.add_def(
        "compatible_driver",
        AssignmentKind::Function,
        TypeId::UNDEFINED,
        DefBody::Function {
            params: Vec::new(),
            runs_on: Some(derived),
            return_type: None,
            body,
        },
    );

    // Unrelated component: incompatible.
    let fn2_scope = b.scope(b.module.root_scope);
    let invoke2 = b.stmt(
        fn2_scope,
        StmtKind::Invoke {
            callee,
            args: Vec::new(),
        },
    );
    let body2 = b.block_of(fn2_scope, BlockFlags::empty(), vec![invoke2]);
    b.add_def(
        "incompatible_driver",
        AssignmentKind::Function,
        TypeId::UNDEFINED,
        DefBody::Function {
            params: Vec::new(),
            runs_on: Some(stranger),
            return_type: None,
            body: body2,
        },
    );

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check_with(&mut store, clock.tick(), &quiet_config());
    let diags = store.collect();
    assert_eq!(count(&diags, ErrorCode::E2010), 1);
    // The compatible driver stays clean.
    assert!(store
        .per_def
        .get(&ok_fn)
        .is_some_and(|d| d.iter().all(|diag| diag.code != ErrorCode::E2010)));
}

// === Reference resolution ===

#[test]
fn test_undefined_reference_degrades_without_cascade() {
    let mut b = Builder::new();
    let root = b.module.root_scope;
    // `missing.field[0]`: one undefined-reference error, the failing
    // chain keeps resolving without follow-on noise.
    let name = b.interner.intern("missing");
    let idx = b.int(root, 0);
    let value = b.value(
        root,
        ValueKind::Reference(Reference::with_subrefs(
            name,
            vec![
                tess_ast::SubRef::Field(b.interner.intern("field")),
                tess_ast::SubRef::Index(idx),
            ],
        )),
    );
    b.add_const("chained", TypeId::INTEGER, value);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    let diags = store.collect();
    assert_eq!(count(&diags, ErrorCode::E2001), 1);
    assert_eq!(count(&diags, ErrorCode::E2006), 0);
    assert_eq!(count(&diags, ErrorCode::E2007), 0);
    assert_eq!(count(&diags, ErrorCode::E2004), 0);
}

#[test]
fn test_type_mismatch_reported_once() {
    let mut b = Builder::new();
    let root = b.module.root_scope;
    let text = b.value(root, ValueKind::CharstringLit("oops".into()));
    b.add_const("miscast", TypeId::INTEGER, text);

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    assert_eq!(count(&store.collect(), ErrorCode::E2004), 1);
}

// === Templates ===

#[test]
fn test_template_field_assignments_check_against_record() {
    let mut b = Builder::new();
    let root = b.module.root_scope;
    let rec_name = b.interner.intern("MsgType");
    let field_id = b.interner.intern("id");
    let loc = b.next_loc(10);
    let rec_ty = b.arena.alloc_type(TypeNode {
        kind: TypeKind::Record {
            name: rec_name,
            fields: vec![(field_id, TypeId::INTEGER)],
        },
        meta: NodeMeta::new(root, loc),
    });

    let good = b.int(root, 7);
    let loc2 = b.next_loc(4);
    let inner: TemplateId = b.arena.alloc_template(Template {
        kind: TemplateKind::Specific(good),
        meta: NodeMeta::new(root, loc2),
    });
    let bogus_field = b.interner.intern("nope");
    let loc3 = b.next_loc(4);
    let wild: TemplateId = b.arena.alloc_template(Template {
        kind: TemplateKind::Any,
        meta: NodeMeta::new(root, loc3),
    });
    let loc4 = b.next_loc(8);
    let outer = b.arena.alloc_template(Template {
        kind: TemplateKind::FieldAssignments(vec![(field_id, inner), (bogus_field, wild)]),
        meta: NodeMeta::new(root, loc4),
    });
    b.add_def(
        "t_msg",
        AssignmentKind::Template,
        rec_ty,
        DefBody::Template { template: outer },
    );

    let mut clock = CompilationClock::new();
    let mut store = DiagnosticStore::new();
    b.check(&mut store, clock.tick());
    let diags = store.collect();
    // Only the unknown field is reported.
    assert_eq!(count(&diags, ErrorCode::E2006), 1);
    assert_eq!(count(&diags, ErrorCode::E2004), 0);
}
