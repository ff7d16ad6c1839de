//! Timestamp-gated checking of modules and definitions.
//!
//! `check(ts)` on a node whose `last_checked` is not older than `ts` is
//! a no-op. A module that is invalidated re-checks its own concerns
//! unconditionally (syntax surfacing, duplicates, shadowing) and
//! delegates to its definitions, each gated individually, so the cost
//! of a whole-program re-validation after a localized edit is bounded
//! by the nodes actually invalidated.

use std::mem;

use tracing::{debug, trace};

use tess_ast::{
    AstArena, CompilationTimestamp, DefBody, DefId, Module, NodeRef, ScopeId, StringInterner,
    TypeId,
};
use tess_diagnostic::{
    circular_reference, duplicate_definition, syntax_error_to_diagnostic, Diagnostic, ErrorCode,
    ReportLevel,
};

use crate::context::{CheckConfig, CheckContext, DiagnosticStore};

/// Check one compilation unit against a pass timestamp.
///
/// The timestamp is an explicit parameter: callers own the
/// [`CompilationClock`](tess_ast::CompilationClock) and tick it once
/// per edit-and-recheck cycle.
#[tracing::instrument(level = "debug", skip_all, fields(ts = ?ts))]
pub fn check_module(
    arena: &mut AstArena,
    interner: &StringInterner,
    store: &mut DiagnosticStore,
    config: &CheckConfig,
    module: &mut Module,
    ts: CompilationTimestamp,
) {
    if module.meta.is_fresh(ts) {
        trace!("module is fresh, skipping");
        return;
    }

    let mut ctx = CheckContext::new(arena, interner, store, config, ts);

    // Module-level concerns are rebuilt from scratch on every
    // invalidated pass.
    ctx.store.module.clear();
    for error in &module.syntax_errors {
        let diag = syntax_error_to_diagnostic(module.file, error);
        ctx.store.module.push(diag);
    }
    check_scope_tree(&mut ctx, module.root_scope);

    for def_id in module.defs.clone() {
        ctx.check_definition(def_id);
    }

    module.meta.stamp(ts);
    debug!(defs = module.defs.len(), "module checked");
}

/// Report duplicate declarations and shadowing over a scope subtree.
fn check_scope_tree(ctx: &mut CheckContext<'_>, scope_id: ScopeId) {
    let duplicates = ctx.arena.scope(scope_id).duplicates.clone();
    for (existing, dup) in duplicates {
        let name = ctx.interner.lookup(ctx.arena.def(dup).name).to_owned();
        let dup_loc = ctx.arena.def(dup).meta.loc;
        let existing_loc = ctx.arena.def(existing).meta.loc;
        let diag = duplicate_definition(dup_loc, existing_loc, &name);
        ctx.emit_module(diag);
        ctx.arena.def_mut(dup).meta.erroneous = true;
    }

    if ctx.config.severity.shadowing != ReportLevel::Ignore {
        let locals: Vec<DefId> = ctx.arena.scope(scope_id).local_defs().collect();
        for def_id in locals {
            let name = ctx.arena.def(def_id).name;
            if let Some((outer, _)) = ctx.arena.lookup_outer(scope_id, name) {
                let name_str = ctx.interner.lookup(name).to_owned();
                let loc = ctx.arena.def(def_id).meta.loc;
                let outer_loc = ctx.arena.def(outer).meta.loc;
                if let Some(diag) = ctx.config.severity.make(ErrorCode::W9004) {
                    ctx.emit_module(
                        diag.with_message(format!("`{name_str}` shadows an outer definition"))
                            .with_label(loc, "shadowing definition")
                            .with_secondary_label(outer_loc, "outer definition is here"),
                    );
                }
            }
        }
    }

    let children: Vec<ScopeId> = ctx
        .arena
        .scope(scope_id)
        .children
        .iter()
        .map(|(_, child)| *child)
        .collect();
    for child in children {
        check_scope_tree(ctx, child);
    }
}

impl CheckContext<'_> {
    /// Check one definition, gated by the pass timestamp and guarded by
    /// the reference chain against circular definitions.
    pub(crate) fn check_definition(&mut self, def_id: DefId) {
        if self.arena.def(def_id).meta.is_fresh(self.ts) {
            return;
        }

        let marker = self.chain.marker();
        if !self.chain.push(NodeRef::Def(def_id)) {
            // The definition is already under evaluation above us:
            // report the cycle once, here, and do not recurse further.
            let cycle = self.format_cycle(def_id);
            let loc = self.arena.def(def_id).meta.loc;
            self.emit(circular_reference(loc, &cycle));
            self.arena.def_mut(def_id).meta.erroneous = true;
            // Stamp so sibling references do not re-evaluate the
            // definition (and re-report) within this pass.
            self.arena.def_mut(def_id).meta.stamp(self.ts);
            return;
        }

        trace!(def = ?def_id, "checking definition");
        let saved_sink = mem::take(&mut self.sink);
        self.check_definition_body(def_id);
        let diags = mem::replace(&mut self.sink, saved_sink);
        self.store.per_def.insert(def_id, diags);

        self.arena.def_mut(def_id).meta.stamp(self.ts);
        self.chain.rewind(marker);
    }

    fn check_definition_body(&mut self, def_id: DefId) {
        let body = self.arena.def(def_id).body.clone();
        let declared_ty = self.arena.def(def_id).ty;
        let loc = self.arena.def(def_id).meta.loc;

        match body {
            DefBody::Constant { init } => {
                self.check_value(init, expected_of(declared_ty));
            }
            DefBody::Variable { init } => {
                if let Some(init) = init {
                    self.check_value(init, expected_of(declared_ty));
                }
            }
            DefBody::Template { template } => {
                self.check_template(template, expected_of(declared_ty));
            }
            DefBody::Timer { default_duration } => {
                if let Some(duration) = default_duration {
                    self.check_value(duration, Some(TypeId::FLOAT));
                }
            }
            DefBody::Port => {}
            DefBody::Function {
                runs_on,
                return_type,
                body,
                ..
            } => {
                let saved = self.enter_behaviour(return_type, runs_on);
                let outcome = self.check_block(body);
                self.leave_behaviour(saved);
                if return_type.is_some() && outcome.status != tess_ast::ReturnStatus::Yes {
                    let name = self.interner.lookup(self.arena.def(def_id).name);
                    self.emit(
                        Diagnostic::error(ErrorCode::E2018)
                            .with_message(format!(
                                "function `{name}` may complete without returning a value"
                            ))
                            .with_label(loc, "declared with a return type"),
                    );
                }
            }
            DefBody::Testcase {
                runs_on, body, ..
            } => {
                let saved = self.enter_behaviour(None, Some(runs_on));
                self.check_block(body);
                self.leave_behaviour(saved);
            }
            DefBody::Altstep {
                runs_on, guards, ..
            } => {
                let saved = self.enter_behaviour(None, runs_on);
                self.check_alt_construct(&guards, crate::alt::AltKind::AltstepBody, loc);
                self.leave_behaviour(saved);
            }
        }
    }

    fn enter_behaviour(
        &mut self,
        return_type: Option<TypeId>,
        runs_on: Option<TypeId>,
    ) -> (Option<TypeId>, Option<TypeId>) {
        let saved = (self.current_return_type, self.current_runs_on);
        self.current_return_type = return_type;
        self.current_runs_on = runs_on;
        saved
    }

    fn leave_behaviour(&mut self, saved: (Option<TypeId>, Option<TypeId>)) {
        self.current_return_type = saved.0;
        self.current_runs_on = saved.1;
    }

    fn format_cycle(&self, through: DefId) -> String {
        let mut names: Vec<&str> = self
            .chain
            .cycle_through(NodeRef::Def(through))
            .iter()
            .filter_map(|node| match node {
                NodeRef::Def(id) => Some(self.interner.lookup(self.arena.def(*id).name)),
                _ => None,
            })
            .collect();
        names.push(self.interner.lookup(self.arena.def(through).name));
        names.join(" -> ")
    }
}

/// Treat an undefined declared type as "no expectation" so follow-on
/// mismatches stay quiet.
fn expected_of(ty: TypeId) -> Option<TypeId> {
    if ty.is_undefined() {
        None
    } else {
        Some(ty)
    }
}
