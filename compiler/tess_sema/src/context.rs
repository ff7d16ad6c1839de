//! Checking context and configuration.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

use tess_ast::{
    AstArena, CompilationTimestamp, DefId, Location, Name, ReferenceChain, StringInterner, TypeId,
    TypeKind,
};
use tess_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode, SeverityConfig};

/// Immutable configuration for one checking pass.
///
/// There is no live preference reloading: to change a setting, build a
/// new config and re-run the check with a fresh timestamp.
#[derive(Clone, Debug, Default)]
pub struct CheckConfig {
    pub severity: SeverityConfig,
}

/// Diagnostics persisted across passes.
///
/// Module-level diagnostics (syntax errors, duplicates, shadowing) are
/// rebuilt whenever the module re-checks; per-definition diagnostics
/// are replaced only when that definition actually re-validates, so a
/// timestamp-gated no-op leaves them untouched.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    pub module: Vec<Diagnostic>,
    pub per_def: FxHashMap<DefId, Vec<Diagnostic>>,
}

impl DiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All current diagnostics, sorted by source position.
    pub fn collect(&self) -> Vec<Diagnostic> {
        let mut queue = DiagnosticQueue::new();
        for diag in &self.module {
            queue.emit(diag.clone());
        }
        for diags in self.per_def.values() {
            for diag in diags {
                queue.emit(diag.clone());
            }
        }
        queue.flush()
    }

    /// Whether any stored diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.module.iter().any(Diagnostic::is_error)
            || self
                .per_def
                .values()
                .any(|diags| diags.iter().any(Diagnostic::is_error))
    }
}

/// Mutable state of one checking pass over one compilation unit.
///
/// Single-threaded by design: one pass owns the arena mutably for its
/// whole duration.
pub struct CheckContext<'a> {
    pub arena: &'a mut AstArena,
    pub interner: &'a StringInterner,
    pub config: &'a CheckConfig,
    pub store: &'a mut DiagnosticStore,
    /// The pass timestamp; explicit, never read from an ambient clock.
    pub ts: CompilationTimestamp,
    /// Active evaluation chain for circular-definition detection.
    pub(crate) chain: ReferenceChain,
    /// Diagnostics of the definition currently being checked.
    pub(crate) sink: Vec<Diagnostic>,
    /// Return type of the enclosing function, when checking its body.
    pub(crate) current_return_type: Option<TypeId>,
    /// Component constraint of the enclosing behaviour definition.
    pub(crate) current_runs_on: Option<TypeId>,
    /// Nesting depth of interleave branch blocks.
    pub(crate) interleave_depth: u32,
    /// Nesting depth of loop bodies.
    pub(crate) loop_depth: u32,
    /// Nesting depth of alt guard bodies.
    pub(crate) altguard_depth: u32,
    /// Labels already declared along the current block chain.
    pub(crate) label_stack: Vec<Name>,
    /// Labels referenced by at least one goto in the current definition.
    pub(crate) used_labels: FxHashSet<Name>,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        arena: &'a mut AstArena,
        interner: &'a StringInterner,
        store: &'a mut DiagnosticStore,
        config: &'a CheckConfig,
        ts: CompilationTimestamp,
    ) -> Self {
        CheckContext {
            arena,
            interner,
            config,
            store,
            ts,
            chain: ReferenceChain::new(),
            sink: Vec::new(),
            current_return_type: None,
            current_runs_on: None,
            interleave_depth: 0,
            loop_depth: 0,
            altguard_depth: 0,
            label_stack: Vec::new(),
            used_labels: FxHashSet::default(),
        }
    }

    /// Queue a diagnostic against the definition currently checking.
    pub(crate) fn emit(&mut self, diagnostic: Diagnostic) {
        self.sink.push(diagnostic);
    }

    /// Queue a module-level diagnostic.
    pub(crate) fn emit_module(&mut self, diagnostic: Diagnostic) {
        self.store.module.push(diagnostic);
    }

    /// Queue a configurable-class diagnostic at its configured severity;
    /// a class set to ignore emits nothing.
    pub(crate) fn emit_config(&mut self, code: ErrorCode, loc: Location, message: &str) {
        if let Some(diag) = self.config.severity.make(code) {
            self.emit(diag.with_message(message).with_label(loc, ""));
        }
    }

    /// Human-readable name of a type, for diagnostics.
    pub(crate) fn type_name(&self, ty: TypeId) -> String {
        match &self.arena.ty(ty).kind {
            TypeKind::Component { name, .. }
            | TypeKind::Port { name, .. }
            | TypeKind::Record { name, .. } => self.interner.lookup(*name).to_owned(),
            other => other.describe().to_owned(),
        }
    }

    /// Whether the current statement position is inside an interleave
    /// branch.
    pub(crate) fn in_interleave(&self) -> bool {
        self.interleave_depth > 0
    }
}
