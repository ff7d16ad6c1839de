//! Alt, altstep, and interleave legality.
//!
//! Alt branches are order-sensitive at run time (first syntactically
//! matching, semantically true guard wins is a generation-time policy);
//! static checking validates every branch independently of that order.

use tracing::trace;

use tess_ast::{
    is_compatible, AltGuards, AssignmentKind, DefBody, GuardOp, Location, Reference, ReturnStatus,
    ScopeId, TypeId, TypeKind, ValueId,
};
use tess_diagnostic::{Diagnostic, ErrorCode};

use crate::context::CheckContext;

/// Which construct a guard list belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) enum AltKind {
    Alt,
    Interleave,
    /// The body of an altstep definition; checked like an alt.
    AltstepBody,
}

impl CheckContext<'_> {
    /// Check the guards of an alt / interleave / altstep body and fold
    /// the branch statuses.
    pub(crate) fn check_alt_construct(
        &mut self,
        guards: &AltGuards,
        kind: AltKind,
        loc: Location,
    ) -> ReturnStatus {
        trace!(?kind, branches = guards.len(), "checking alt construct");
        if guards.is_empty() {
            self.emit_config(ErrorCode::W9002, loc, "construct has no branches");
            return ReturnStatus::No;
        }

        let mut combined: Option<ReturnStatus> = None;
        for guard in &guards.guards {
            // Guard expression.
            if let Some(guard_value) = guard.guard {
                if kind == AltKind::Interleave {
                    self.emit(
                        Diagnostic::error(ErrorCode::E2023)
                            .with_message("interleave branches cannot carry guard expressions")
                            .with_label(guard.loc, "guard expression here"),
                    );
                } else {
                    self.check_value(guard_value, Some(TypeId::BOOLEAN));
                }
            }

            self.check_guard_op(&guard.op, kind, guard.block, guard.loc);

            let branch_status = self.check_block(guard.block).status;
            combined = Some(match combined {
                Some(previous) => previous.join_branch(branch_status),
                None => branch_status,
            });
        }
        combined.unwrap_or(ReturnStatus::No)
    }

    fn check_guard_op(
        &mut self,
        op: &GuardOp,
        kind: AltKind,
        block: tess_ast::BlockId,
        loc: Location,
    ) {
        // References in the guard operation resolve through the branch
        // block's scope; the walk through its parents reaches the same
        // definitions the enclosing scope would.
        let scope = self.arena.block(block).scope;
        match op {
            GuardOp::Receive { port, template }
            | GuardOp::Trigger { port, template }
            | GuardOp::GetCall { port, template }
            | GuardOp::GetReply { port, template } => {
                self.resolve_entity(port, scope, loc, AssignmentKind::Port);
                if let Some(template) = template {
                    self.check_template(*template, None);
                }
            }
            GuardOp::Timeout { timer } => {
                self.resolve_entity(timer, scope, loc, AssignmentKind::Timer);
            }
            GuardOp::Done { component } => {
                let resolution = self.resolve_reference(component, scope, loc);
                let is_component = matches!(
                    self.arena.ty(resolution.ty).kind,
                    TypeKind::Component { .. } | TypeKind::Undefined
                );
                if !is_component {
                    let found = self.type_name(resolution.ty);
                    self.emit(
                        Diagnostic::error(ErrorCode::E2022)
                            .with_message(format!(
                                "done requires a component reference, found `{found}`"
                            ))
                            .with_label(loc, "in this guard"),
                    );
                }
            }
            GuardOp::Else => {
                if kind == AltKind::Interleave {
                    self.emit(
                        Diagnostic::error(ErrorCode::E2019)
                            .with_message("else branches are not allowed inside interleave")
                            .with_label(loc, "else guard here"),
                    );
                }
            }
            GuardOp::Invoke { callee, args } => {
                if kind == AltKind::Interleave {
                    // Hard error, independent of reachability.
                    self.emit(
                        Diagnostic::error(ErrorCode::E2013)
                            .with_message(
                                "altstep invocation is not allowed inside interleave",
                            )
                            .with_label(loc, "invoked here"),
                    );
                    return;
                }
                self.check_behaviour_invocation(callee, args, scope, loc);
            }
        }
    }

    /// An `Invoke` statement: a function call or an altstep invocation,
    /// distinguished only after the callee resolves.
    pub(crate) fn check_invocation_statement(
        &mut self,
        stmt_id: tess_ast::StmtId,
        callee: &Reference,
        args: &[ValueId],
        scope: ScopeId,
        loc: Location,
    ) {
        if self.in_interleave() && self.invokes_altstep(callee, scope) {
            // Hard error, independent of reachability.
            self.emit(
                Diagnostic::error(ErrorCode::E2013)
                    .with_message("altstep invocation is not allowed inside interleave")
                    .with_label(loc, "invoked here"),
            );
            self.arena.stmt_mut(stmt_id).meta.erroneous = true;
            return;
        }
        self.check_behaviour_invocation(callee, args, scope, loc);
    }

    /// Whether a reference denotes an altstep definition or an
    /// altstep-typed value (a dynamic dereference).
    fn invokes_altstep(&self, callee: &Reference, scope: ScopeId) -> bool {
        let Some((def_id, _)) = self.arena.lookup(scope, callee.name) else {
            return false;
        };
        let def = self.arena.def(def_id);
        matches!(def.kind, AssignmentKind::Altstep)
            || matches!(self.arena.ty(def.ty).kind, TypeKind::Altstep { .. })
    }

    /// Shared invocation checking for statements and alt guards:
    /// resolves the callee, validates arguments, and enforces the
    /// altstep runs-on rules.
    pub(crate) fn check_behaviour_invocation(
        &mut self,
        callee: &Reference,
        args: &[ValueId],
        scope: ScopeId,
        loc: Location,
    ) {
        let Some((def_id, _)) = self.arena.lookup(scope, callee.name) else {
            let name = self.interner.lookup(callee.name);
            self.emit(tess_diagnostic::undefined_reference(loc, name));
            for &arg in args {
                self.check_value(arg, None);
            }
            return;
        };

        let def_kind = self.arena.def(def_id).kind;
        match def_kind {
            AssignmentKind::Function | AssignmentKind::Altstep => {
                self.check_invocation_args(def_id, args, loc);
                if def_kind == AssignmentKind::Altstep {
                    let runs_on = match &self.arena.def(def_id).body {
                        DefBody::Altstep { runs_on, .. } => *runs_on,
                        _ => None,
                    };
                    self.check_runs_on_compat(runs_on, loc);
                }
            }
            AssignmentKind::Testcase => {
                let name = self.interner.lookup(callee.name);
                self.emit(
                    Diagnostic::error(ErrorCode::E2024)
                        .with_message(format!(
                            "testcase `{name}` cannot be invoked as a statement"
                        ))
                        .with_label(loc, "testcases only run under execute"),
                );
            }
            AssignmentKind::Variable | AssignmentKind::Constant => {
                // Dynamic dereference of an altstep value.
                let ty = self.arena.def(def_id).ty;
                let ty_kind = self.arena.ty(ty).kind.clone();
                match ty_kind {
                    TypeKind::Altstep {
                        runs_on,
                        runs_on_self,
                    } => {
                        if runs_on_self {
                            let name = self.interner.lookup(callee.name);
                            self.emit(
                                Diagnostic::error(ErrorCode::E2009)
                                    .with_message(format!(
                                        "`{name}` holds an altstep declared \"runs on self\" \
                                         and cannot be dereferenced here"
                                    ))
                                    .with_label(loc, "dynamic altstep dereference"),
                            );
                        } else {
                            self.check_runs_on_compat(runs_on, loc);
                        }
                        for &arg in args {
                            self.check_value(arg, None);
                        }
                    }
                    TypeKind::Undefined => {
                        for &arg in args {
                            self.check_value(arg, None);
                        }
                    }
                    _ => {
                        let name = self.interner.lookup(callee.name);
                        self.emit(
                            Diagnostic::error(ErrorCode::E2008)
                                .with_message(format!("`{name}` cannot be invoked"))
                                .with_label(loc, "not a function or altstep"),
                        );
                    }
                }
            }
            _ => {
                let name = self.interner.lookup(callee.name);
                self.emit(
                    Diagnostic::error(ErrorCode::E2008)
                        .with_message(format!(
                            "`{name}` is a {}, which cannot be invoked",
                            def_kind.describe()
                        ))
                        .with_label(loc, "invoked here"),
                );
            }
        }
    }

    /// The invoked altstep's component constraint must be
    /// type-compatible, not identity-equal, with the invoking
    /// context's.
    fn check_runs_on_compat(&mut self, required: Option<TypeId>, loc: Location) {
        let Some(required) = required else {
            return;
        };
        match self.current_runs_on {
            Some(current) if is_compatible(self.arena, current, required) => {}
            Some(current) => {
                let required_name = self.type_name(required);
                let current_name = self.type_name(current);
                self.emit(
                    Diagnostic::error(ErrorCode::E2010)
                        .with_message(format!(
                            "altstep runs on `{required_name}`, but the invoking context \
                             runs on incompatible `{current_name}`"
                        ))
                        .with_label(loc, "invoked here"),
                );
            }
            None => {
                let required_name = self.type_name(required);
                self.emit(
                    Diagnostic::error(ErrorCode::E2010)
                        .with_message(format!(
                            "altstep runs on `{required_name}`, but the invoking context \
                             declares no runs-on component"
                        ))
                        .with_label(loc, "invoked here"),
                );
            }
        }
    }
}
