//! Damage-region reparse against a mock grammar layer.
//!
//! The mock grammar is a flat statement language: whitespace-separated
//! tokens, `stop;` / `return;` / `log;` statements and `name:` labels.
//! It is enough to drive envelope recursion, neighbor growth, the
//! offset-ordered merge, and the incremental-versus-full equivalence
//! property.

use pretty_assertions::assert_eq;

use tess_ast::{
    AstArena, BlockFlags, BlockId, CompilationClock, DefBody, DefId, Definition, Edit, FileId,
    Location, Module, NodeMeta, ScopeId, ScopeKind, Span, Statement, StatementBlock, StmtId,
    StmtKind, StringInterner, TypeId, Value, ValueKind,
};
use tess_reparse::{reparse_damaged, BlockReparser, GrammarError, ModuleReparse, DEFAULT_MAX_DEPTH};
use tess_sema::{check_module, CheckConfig, DiagnosticStore};

struct MockGrammar {
    interner: StringInterner,
    source: String,
}

impl MockGrammar {
    fn new(interner: StringInterner, source: &str) -> Self {
        MockGrammar {
            interner,
            source: source.to_owned(),
        }
    }

    fn loc(span: Span) -> Location {
        Location::new(FileId(0), span, 1)
    }

    fn parse_region(
        &self,
        arena: &mut AstArena,
        region: Span,
        scope: ScopeId,
    ) -> Result<Vec<StmtId>, GrammarError> {
        let text = self
            .source
            .get(region.to_range())
            .ok_or_else(|| GrammarError::new("region out of bounds"))?;
        let mut stmts = Vec::new();
        let mut offset = 0usize;
        for token in text.split_whitespace() {
            let at = match text[offset..].find(token) {
                Some(found) => offset + found,
                None => return Err(GrammarError::new("tokenizer lost its position")),
            };
            offset = at + token.len();
            let start = region.start + u32::try_from(at).unwrap_or(u32::MAX);
            let span = Span::new(start, start + u32::try_from(token.len()).unwrap_or(0));
            let kind = self.classify(arena, token, span, scope)?;
            stmts.push(arena.alloc_stmt(Statement {
                kind,
                meta: NodeMeta::new(scope, Self::loc(span)),
            }));
        }
        Ok(stmts)
    }

    fn classify(
        &self,
        arena: &mut AstArena,
        token: &str,
        span: Span,
        scope: ScopeId,
    ) -> Result<StmtKind, GrammarError> {
        if let Some(name) = token.strip_suffix(':') {
            return Ok(StmtKind::Label(self.interner.intern(name)));
        }
        match token {
            "stop;" => Ok(StmtKind::Stop),
            "return;" => Ok(StmtKind::Return(None)),
            "log;" => {
                let value = arena.alloc_value(Value {
                    kind: ValueKind::IntLit(0),
                    meta: NodeMeta::new(scope, Self::loc(Span::new(span.start, span.start + 1))),
                });
                Ok(StmtKind::Log(value))
            }
            other => Err(GrammarError::new(format!("unknown statement `{other}`"))),
        }
    }
}

impl BlockReparser for MockGrammar {
    fn reparse_statements(
        &mut self,
        arena: &mut AstArena,
        region: Span,
        scope: ScopeId,
    ) -> Result<Vec<StmtId>, GrammarError> {
        self.parse_region(arena, region, scope)
    }

    fn reparse_module(
        &mut self,
        arena: &mut AstArena,
        module: &mut Module,
        source: &str,
    ) -> Result<(), GrammarError> {
        self.source = source.to_owned();
        let len = u32::try_from(source.len()).unwrap_or(u32::MAX);
        let full = Span::new(0, len);
        let fn_name = self.interner.intern("f");
        let scope = arena.alloc_scope(module.root_scope, ScopeKind::Definition, Some(fn_name), full);
        let stmts = self.parse_region(arena, full, scope)?;
        let block = arena.alloc_block(StatementBlock {
            scope,
            stmts,
            flags: BlockFlags::empty(),
            labels: Vec::new(),
            cached_returns: None,
            meta: NodeMeta::new(scope, Self::loc(full)),
        });
        let def = arena.alloc_def(Definition {
            name: fn_name,
            kind: tess_ast::AssignmentKind::Function,
            ty: TypeId::UNDEFINED,
            body: DefBody::Function {
                params: Vec::new(),
                runs_on: None,
                return_type: None,
                body: block,
            },
            meta: NodeMeta::new(module.root_scope, Self::loc(full)),
        });
        if arena.scope(module.root_scope).get_local(fn_name).is_none() {
            arena.scope_mut(module.root_scope).declare(fn_name, def);
        }
        module.defs = vec![def];
        module.meta.last_checked = None;
        Ok(())
    }
}

/// Build a module holding one function `f` whose body is the whole
/// source, parsed by the mock grammar.
fn build(source: &str, interner: &StringInterner) -> (AstArena, Module, DefId, BlockId) {
    let mut arena = AstArena::new();
    let module_name = interner.intern("unit");
    let root = arena.alloc_scope(
        AstArena::GLOBAL_SCOPE,
        ScopeKind::Module,
        Some(module_name),
        Span::new(0, 1 << 20),
    );
    let mut module = Module::new(
        module_name,
        FileId(0),
        root,
        NodeMeta::new(root, MockGrammar::loc(Span::new(0, 1 << 20))),
    );
    let mut grammar = MockGrammar::new(interner.clone(), source);
    if let Err(err) = grammar.reparse_module(&mut arena, &mut module, source) {
        panic!("mock grammar failed on seed source: {err}");
    }
    let def = module.defs[0];
    let block = match arena.def(def).body {
        DefBody::Function { body, .. } => body,
        _ => panic!("mock module must hold a function"),
    };
    (arena, module, def, block)
}

fn stmt_shapes(arena: &AstArena, block: BlockId) -> Vec<(String, Span)> {
    arena
        .block(block)
        .stmts
        .iter()
        .map(|&s| {
            let stmt = arena.stmt(s);
            (stmt.kind.describe().to_owned(), stmt.meta.loc.span)
        })
        .collect()
}

fn diagnostics_of(arena: &mut AstArena, interner: &StringInterner, module: &mut Module) -> Vec<(String, Span)> {
    let mut store = DiagnosticStore::new();
    let mut clock = CompilationClock::new();
    check_module(
        arena,
        interner,
        &mut store,
        &CheckConfig::default(),
        module,
        clock.tick(),
    );
    store
        .collect()
        .into_iter()
        .map(|d| {
            let span = d.primary_loc().map_or(Span::DUMMY, |l| l.span);
            (format!("{}", d.code), span)
        })
        .collect()
}

#[test]
fn test_single_statement_edit_patches_incrementally() {
    let interner = StringInterner::new();
    let source_old = "log; log;";
    let source_new = "return; log;";
    let (mut arena, mut module, _, block) = build(source_old, &interner);

    // Replace the first `log` with `return`.
    let edit = Edit::replace(0, 3, 6);
    let mut grammar = MockGrammar::new(interner.clone(), source_new);
    let outcome = match reparse_damaged(
        &mut arena,
        &mut module,
        source_new,
        edit,
        &mut grammar,
        DEFAULT_MAX_DEPTH,
    ) {
        Ok(outcome) => outcome,
        Err(err) => panic!("reparse failed: {err}"),
    };
    assert_eq!(outcome, ModuleReparse::Incremental);

    let shapes = stmt_shapes(&arena, block);
    assert_eq!(
        shapes,
        vec![
            ("return".to_owned(), Span::new(0, 7)),
            ("log".to_owned(), Span::new(8, 12)),
        ]
    );
}

#[test]
fn test_incremental_and_full_reparse_are_equivalent() {
    let interner = StringInterner::new();
    let source_old = "log; log;";
    let source_new = "return; log;";

    // Incremental: patch the damaged region only.
    let (mut arena_inc, mut module_inc, _, block_inc) = build(source_old, &interner);
    let edit = Edit::replace(0, 3, 6);
    let mut grammar = MockGrammar::new(interner.clone(), source_new);
    let outcome = match reparse_damaged(
        &mut arena_inc,
        &mut module_inc,
        source_new,
        edit,
        &mut grammar,
        DEFAULT_MAX_DEPTH,
    ) {
        Ok(outcome) => outcome,
        Err(err) => panic!("reparse failed: {err}"),
    };
    assert_eq!(outcome, ModuleReparse::Incremental);

    // Full: parse the new source from scratch.
    let (mut arena_full, mut module_full, _, block_full) = build(source_new, &interner);

    // Same statement shapes...
    assert_eq!(
        stmt_shapes(&arena_inc, block_inc),
        stmt_shapes(&arena_full, block_full)
    );
    // ...and the same diagnostics: the unreachable `log` after the new
    // `return` is reported identically on both sides.
    let diags_inc = diagnostics_of(&mut arena_inc, &interner, &mut module_inc);
    let diags_full = diagnostics_of(&mut arena_full, &interner, &mut module_full);
    assert_eq!(diags_inc, diags_full);
    assert!(diags_inc.iter().any(|(code, _)| code == "W9001"));
}

#[test]
fn test_label_grown_leftward_is_absorbed() {
    let interner = StringInterner::new();
    let source_old = "stop; fin: stop;";
    let source_new = "stop; refin: stop;";
    let (mut arena, mut module, _, block) = build(source_old, &interner);

    // Insert `re` right before the label: the label is grown by the
    // edit and must be absorbed into the damaged region.
    let edit = Edit::insert(6, 2);
    let mut grammar = MockGrammar::new(interner.clone(), source_new);
    let outcome = match reparse_damaged(
        &mut arena,
        &mut module,
        source_new,
        edit,
        &mut grammar,
        DEFAULT_MAX_DEPTH,
    ) {
        Ok(outcome) => outcome,
        Err(err) => panic!("reparse failed: {err}"),
    };
    assert_eq!(outcome, ModuleReparse::Incremental);

    let shapes = stmt_shapes(&arena, block);
    assert_eq!(
        shapes,
        vec![
            ("stop".to_owned(), Span::new(0, 5)),
            ("label".to_owned(), Span::new(6, 12)),
            ("stop".to_owned(), Span::new(13, 18)),
        ]
    );
    // The merged label carries the grown name.
    let label_stmt = arena.block(block).stmts[1];
    match arena.stmt(label_stmt).kind {
        StmtKind::Label(name) => assert_eq!(interner.lookup(name), "refin"),
        ref other => panic!("expected label, got {other:?}"),
    }
}

#[test]
fn test_enveloping_statement_recurses_into_nested_block() {
    let interner = StringInterner::new();
    // Hand-built nesting: the mock grammar itself is flat, so the if
    // statement and its inner block are constructed directly.
    //   source:  "if { log; log; }"
    //   if spans [0,16), inner block [4,15), logs [5,9) and [10,14)
    let source_old = "if { log; log; }";
    let source_new = "if { stop; log; }";
    let mut arena = AstArena::new();
    let module_name = interner.intern("unit");
    let root = arena.alloc_scope(
        AstArena::GLOBAL_SCOPE,
        ScopeKind::Module,
        Some(module_name),
        Span::new(0, 1 << 20),
    );
    let mut module = Module::new(
        module_name,
        FileId(0),
        root,
        NodeMeta::new(root, MockGrammar::loc(Span::new(0, 1 << 20))),
    );
    let fn_name = interner.intern("f");
    let fn_scope = arena.alloc_scope(root, ScopeKind::Definition, Some(fn_name), Span::new(0, 16));
    let inner_scope = arena.alloc_scope(fn_scope, ScopeKind::Block, None, Span::new(4, 15));

    let grammar = MockGrammar::new(interner.clone(), source_old);
    let inner_stmts = match grammar.parse_region(&mut arena, Span::new(5, 14), inner_scope) {
        Ok(stmts) => stmts,
        Err(err) => panic!("seed parse failed: {err}"),
    };
    let inner_block = arena.alloc_block(StatementBlock {
        scope: inner_scope,
        stmts: inner_stmts,
        flags: BlockFlags::empty(),
        labels: Vec::new(),
        cached_returns: None,
        meta: NodeMeta::new(inner_scope, MockGrammar::loc(Span::new(4, 15))),
    });
    let cond = arena.alloc_value(Value {
        kind: ValueKind::BoolLit(true),
        meta: NodeMeta::new(fn_scope, MockGrammar::loc(Span::new(3, 4))),
    });
    let if_stmt = arena.alloc_stmt(Statement {
        kind: StmtKind::If {
            cond,
            then_block: inner_block,
            else_block: None,
        },
        meta: NodeMeta::new(fn_scope, MockGrammar::loc(Span::new(0, 16))),
    });
    let body = arena.alloc_block(StatementBlock {
        scope: fn_scope,
        stmts: vec![if_stmt],
        flags: BlockFlags::empty(),
        labels: Vec::new(),
        cached_returns: None,
        meta: NodeMeta::new(fn_scope, MockGrammar::loc(Span::new(0, 16))),
    });
    let def = arena.alloc_def(Definition {
        name: fn_name,
        kind: tess_ast::AssignmentKind::Function,
        ty: TypeId::UNDEFINED,
        body: DefBody::Function {
            params: Vec::new(),
            runs_on: None,
            return_type: None,
            body,
        },
        meta: NodeMeta::new(root, MockGrammar::loc(Span::new(0, 16))),
    });
    arena.scope_mut(root).declare(fn_name, def);
    module.defs.push(def);

    // Replace the first inner `log` with `stop`.
    let edit = Edit::replace(5, 3, 4);
    let mut grammar = MockGrammar::new(interner.clone(), source_new);
    let outcome = match reparse_damaged(
        &mut arena,
        &mut module,
        source_new,
        edit,
        &mut grammar,
        DEFAULT_MAX_DEPTH,
    ) {
        Ok(outcome) => outcome,
        Err(err) => panic!("reparse failed: {err}"),
    };
    assert_eq!(outcome, ModuleReparse::Incremental);

    // Inner block patched in place; the sibling shifted by the delta.
    assert_eq!(
        stmt_shapes(&arena, inner_block),
        vec![
            ("stop".to_owned(), Span::new(5, 10)),
            ("log".to_owned(), Span::new(11, 15)),
        ]
    );
    // The enveloping statement and the outer block stretched.
    assert_eq!(arena.stmt(if_stmt).meta.loc.span, Span::new(0, 17));
    assert_eq!(arena.block(body).meta.loc.span, Span::new(0, 17));
}

#[test]
fn test_insertion_at_block_end_is_still_incremental() {
    let interner = StringInterner::new();
    let source_old = "log; stop;";
    // Appending a statement at the very end of the body block.
    let source_new = "log; stop; stop;";
    let (mut arena, mut module, _, block) = build(source_old, &interner);

    let edit = Edit::insert(10, 6);
    let mut grammar = MockGrammar::new(interner.clone(), source_new);
    let outcome = match reparse_damaged(
        &mut arena,
        &mut module,
        source_new,
        edit,
        &mut grammar,
        DEFAULT_MAX_DEPTH,
    ) {
        Ok(outcome) => outcome,
        Err(err) => panic!("reparse failed: {err}"),
    };
    assert_eq!(outcome, ModuleReparse::Incremental);
    assert_eq!(stmt_shapes(&arena, block).len(), 3);
}

#[test]
fn test_damage_outside_any_definition_falls_back_to_full() {
    let interner = StringInterner::new();
    // The definition covers [2, 12) only; the edit lands before it.
    let source_old = "  log; stop;";
    let source_new = "stop;  log; stop;";
    let mut arena = AstArena::new();
    let module_name = interner.intern("unit");
    let root = arena.alloc_scope(
        AstArena::GLOBAL_SCOPE,
        ScopeKind::Module,
        Some(module_name),
        Span::new(0, 1 << 20),
    );
    let mut module = Module::new(
        module_name,
        FileId(0),
        root,
        NodeMeta::new(root, MockGrammar::loc(Span::new(0, 1 << 20))),
    );
    let fn_name = interner.intern("f");
    let fn_scope = arena.alloc_scope(root, ScopeKind::Definition, Some(fn_name), Span::new(2, 12));
    let grammar = MockGrammar::new(interner.clone(), source_old);
    let stmts = match grammar.parse_region(&mut arena, Span::new(2, 12), fn_scope) {
        Ok(stmts) => stmts,
        Err(err) => panic!("seed parse failed: {err}"),
    };
    let block = arena.alloc_block(StatementBlock {
        scope: fn_scope,
        stmts,
        flags: BlockFlags::empty(),
        labels: Vec::new(),
        cached_returns: None,
        meta: NodeMeta::new(fn_scope, MockGrammar::loc(Span::new(2, 12))),
    });
    let def = arena.alloc_def(Definition {
        name: fn_name,
        kind: tess_ast::AssignmentKind::Function,
        ty: TypeId::UNDEFINED,
        body: DefBody::Function {
            params: Vec::new(),
            runs_on: None,
            return_type: None,
            body: block,
        },
        meta: NodeMeta::new(root, MockGrammar::loc(Span::new(2, 12))),
    });
    arena.scope_mut(root).declare(fn_name, def);
    module.defs.push(def);

    let edit = Edit::insert(0, 5);
    let mut grammar = MockGrammar::new(interner.clone(), source_new);
    let outcome = match reparse_damaged(
        &mut arena,
        &mut module,
        source_new,
        edit,
        &mut grammar,
        DEFAULT_MAX_DEPTH,
    ) {
        Ok(outcome) => outcome,
        Err(err) => panic!("reparse failed: {err}"),
    };
    assert_eq!(outcome, ModuleReparse::Full);

    // The fallback rebuilt the unit from the whole new source.
    let def = module.defs[0];
    let rebuilt = match arena.def(def).body {
        DefBody::Function { body, .. } => body,
        _ => panic!("expected function"),
    };
    assert_eq!(stmt_shapes(&arena, rebuilt).len(), 3);
}

#[test]
fn test_grammar_failure_in_region_escalates_to_full() {
    let interner = StringInterner::new();
    let source_old = "log; stop;";
    // The edit introduces a token the narrow reparse cannot read; the
    // full reparse cannot either, so the driver surfaces the error.
    let source_new = "zap; stop;";
    let (mut arena, mut module, _, _) = build(source_old, &interner);

    let edit = Edit::replace(0, 3, 3);
    let mut grammar = MockGrammar::new(interner.clone(), source_new);
    let result = reparse_damaged(
        &mut arena,
        &mut module,
        source_new,
        edit,
        &mut grammar,
        DEFAULT_MAX_DEPTH,
    );
    match result {
        Err(err) => assert!(err.message.contains("zap")),
        Ok(outcome) => panic!("expected grammar failure, got {outcome:?}"),
    }
}

#[test]
fn test_pure_insertion_between_statements() {
    let interner = StringInterner::new();
    let source_old = "log; stop;";
    let source_new = "log; log; stop;";
    let (mut arena, mut module, _, block) = build(source_old, &interner);

    // Insert a whole new statement between the two existing ones.
    let edit = Edit::insert(5, 5);
    let mut grammar = MockGrammar::new(interner.clone(), source_new);
    let outcome = match reparse_damaged(
        &mut arena,
        &mut module,
        source_new,
        edit,
        &mut grammar,
        DEFAULT_MAX_DEPTH,
    ) {
        Ok(outcome) => outcome,
        Err(err) => panic!("reparse failed: {err}"),
    };
    assert_eq!(outcome, ModuleReparse::Incremental);
    assert_eq!(
        stmt_shapes(&arena, block),
        vec![
            ("log".to_owned(), Span::new(0, 4)),
            ("log".to_owned(), Span::new(5, 9)),
            ("stop".to_owned(), Span::new(10, 15)),
        ]
    );
}
