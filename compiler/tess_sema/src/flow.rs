//! Statement-block and control-flow checking.
//!
//! Each statement and block gets a three-valued return status. The
//! forward-goto handling is deliberately the conservative heuristic the
//! original diagnostics depend on: analysis is skipped until the next
//! label that some goto references, rather than building a control-flow
//! graph.

use rustc_hash::FxHashSet;
use tracing::trace;

use tess_ast::{
    AssignmentKind, BlockFlags, BlockId, LabelInfo, Location, Name, NodeRef, ReturnStatus, StmtId,
    StmtKind, TypeId,
};
use tess_diagnostic::{Diagnostic, ErrorCode};

use crate::alt::AltKind;
use crate::context::CheckContext;
use crate::stack::ensure_sufficient_stack;

/// Result of checking one statement block.
#[derive(Copy, Clone, Debug)]
pub(crate) struct BlockOutcome {
    pub(crate) status: ReturnStatus,
}

impl CheckContext<'_> {
    /// Check a statement block, producing its return status.
    ///
    /// Gated by the pass timestamp; a fresh block answers from its
    /// cached status.
    pub(crate) fn check_block(&mut self, block_id: BlockId) -> BlockOutcome {
        ensure_sufficient_stack(|| self.check_block_inner(block_id))
    }

    fn check_block_inner(&mut self, block_id: BlockId) -> BlockOutcome {
        if self.arena.block(block_id).meta.is_fresh(self.ts) {
            let status = self
                .arena
                .block(block_id)
                .cached_returns
                .unwrap_or(ReturnStatus::No);
            return BlockOutcome { status };
        }

        let flags = self.arena.block(block_id).flags;
        let block_loc = self.arena.block(block_id).meta.loc;
        let stmts = self.arena.block(block_id).stmts.clone();

        if flags.contains(BlockFlags::OWNER_IS_LOOP) {
            self.loop_depth += 1;
        }
        if flags.contains(BlockFlags::OWNER_IS_ALTGUARD) {
            self.altguard_depth += 1;
        }
        if flags.contains(BlockFlags::OWNER_IS_INTERLEAVE) {
            self.interleave_depth += 1;
        }

        let label_base = self.label_stack.len();
        let labels = self.collect_labels(&stmts);

        // Which labels any goto in this subtree targets; drives both the
        // forward-skip heuristic and the unused-label diagnostic.
        let mut goto_targets = FxHashSet::default();
        collect_goto_targets(self.arena, block_id, &mut goto_targets);

        let mut status = ReturnStatus::No;
        let mut skipping = false;
        let mut warned_unreachable = false;
        for (idx, &stmt_id) in stmts.iter().enumerate() {
            if skipping {
                if let StmtKind::Label(name) = self.arena.stmt(stmt_id).kind {
                    if goto_targets.contains(&name) {
                        skipping = false;
                    }
                }
                if skipping {
                    // Conservatively skipped: no analysis until the next
                    // used label.
                    self.arena.meta_mut(NodeRef::Stmt(stmt_id)).stamp(self.ts);
                    continue;
                }
            }

            if status == ReturnStatus::Yes && !warned_unreachable {
                let loc = self.arena.stmt(stmt_id).meta.loc;
                self.emit_config(
                    ErrorCode::W9001,
                    loc,
                    "unreachable code after an unconditional return",
                );
                warned_unreachable = true;
            }

            let stmt_status = self.check_statement(stmt_id, idx, &labels, &mut skipping);
            status = status.join_sequence(stmt_status);
        }

        for label in &labels {
            // Used when some goto in this subtree targets it, or when a
            // goto processed earlier in this pass resolved to it.
            if !goto_targets.contains(&label.name) && !self.used_labels.contains(&label.name) {
                let loc = self.arena.stmt(stmts[label.stmt_index]).meta.loc;
                let name = self.interner.lookup(label.name);
                self.emit(
                    Diagnostic::warning(ErrorCode::W9005)
                        .with_message(format!("label `{name}` is never referenced by a goto"))
                        .with_label(loc, "unused label"),
                );
            }
        }
        self.label_stack.truncate(label_base);

        if stmts.is_empty() {
            self.emit_config(ErrorCode::W9002, block_loc, "empty statement block");
        }
        let max = self.config.severity.max_block_statements;
        if max > 0 && stmts.len() > max {
            self.emit_config(
                ErrorCode::W9003,
                block_loc,
                &format!("block has {} statements, more than the configured {max}", stmts.len()),
            );
        }

        if flags.contains(BlockFlags::OWNER_IS_LOOP) {
            self.loop_depth -= 1;
        }
        if flags.contains(BlockFlags::OWNER_IS_ALTGUARD) {
            self.altguard_depth -= 1;
        }
        if flags.contains(BlockFlags::OWNER_IS_INTERLEAVE) {
            self.interleave_depth -= 1;
        }

        let block = self.arena.block_mut(block_id);
        block.labels = labels;
        block.cached_returns = Some(status);
        block.meta.stamp(self.ts);
        trace!(?block_id, ?status, "block checked");
        BlockOutcome { status }
    }

    /// Collect this block's labels, reporting duplicates against the
    /// enclosing block chain, and push them on the label stack.
    fn collect_labels(&mut self, stmts: &[StmtId]) -> Vec<LabelInfo> {
        let mut labels: Vec<LabelInfo> = Vec::new();
        for (idx, &stmt_id) in stmts.iter().enumerate() {
            let StmtKind::Label(name) = self.arena.stmt(stmt_id).kind else {
                continue;
            };
            if self.label_stack.contains(&name) || labels.iter().any(|l| l.name == name) {
                let loc = self.arena.stmt(stmt_id).meta.loc;
                let name_str = self.interner.lookup(name);
                self.emit(
                    Diagnostic::error(ErrorCode::E2016)
                        .with_message(format!(
                            "label `{name_str}` is already defined in this block chain"
                        ))
                        .with_label(loc, "duplicate label"),
                );
                self.arena.stmt_mut(stmt_id).meta.erroneous = true;
                continue;
            }
            self.label_stack.push(name);
            labels.push(LabelInfo {
                name,
                stmt_index: idx,
                used: false,
            });
        }
        labels
    }

    /// Check one statement and produce its return status.
    fn check_statement(
        &mut self,
        stmt_id: StmtId,
        idx: usize,
        labels: &[LabelInfo],
        skipping: &mut bool,
    ) -> ReturnStatus {
        let kind = self.arena.stmt(stmt_id).kind.clone();
        let loc = self.arena.stmt(stmt_id).meta.loc;
        let scope = self.arena.stmt(stmt_id).meta.scope;

        // Interleave restrictions are independent of reachability: they
        // fire for every statement in an interleave branch, reachable
        // or not.
        if self.in_interleave() {
            self.check_interleave_legality(stmt_id, &kind, loc);
        }

        let status = match kind {
            StmtKind::Block(block) => self.check_block(block).status,
            StmtKind::Def(def) => {
                self.check_definition(def);
                ReturnStatus::No
            }
            StmtKind::Assign { lhs, rhs } => {
                let lhs_ty = self.check_value(lhs, None);
                self.check_value(rhs, if lhs_ty.is_undefined() { None } else { Some(lhs_ty) });
                ReturnStatus::No
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.check_value(cond, Some(TypeId::BOOLEAN));
                let then_status = self.check_block(then_block).status;
                let else_status = match else_block {
                    Some(else_block) => self.check_block(else_block).status,
                    None => ReturnStatus::No,
                };
                then_status.join_branch(else_status)
            }
            StmtKind::While { cond, body } => {
                self.check_value(cond, Some(TypeId::BOOLEAN));
                let body_status = self.check_block(body).status;
                // The body may never run; a returning body only makes
                // the loop a maybe.
                if body_status == ReturnStatus::No {
                    ReturnStatus::No
                } else {
                    ReturnStatus::Maybe
                }
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let mut nested_skip = false;
                if let Some(init) = init {
                    self.check_statement(init, 0, &[], &mut nested_skip);
                }
                self.check_value(cond, Some(TypeId::BOOLEAN));
                if let Some(step) = step {
                    self.check_statement(step, 0, &[], &mut nested_skip);
                }
                let body_status = self.check_block(body).status;
                if body_status == ReturnStatus::No {
                    ReturnStatus::No
                } else {
                    ReturnStatus::Maybe
                }
            }
            StmtKind::DoWhile { cond, body } => {
                self.check_value(cond, Some(TypeId::BOOLEAN));
                // Runs at least once.
                self.check_block(body).status
            }
            StmtKind::Label(_) => ReturnStatus::No,
            StmtKind::Goto(name) => self.check_goto(stmt_id, name, idx, labels, skipping, loc),
            StmtKind::Return(value) => {
                self.check_return(value, loc);
                ReturnStatus::Yes
            }
            StmtKind::Alt(guards) => self.check_alt_construct(&guards, AltKind::Alt, loc),
            StmtKind::Interleave(guards) => {
                self.check_alt_construct(&guards, AltKind::Interleave, loc)
            }
            StmtKind::Invoke { callee, args } => {
                self.check_invocation_statement(stmt_id, &callee, &args, scope, loc);
                ReturnStatus::No
            }
            StmtKind::Send { port, template } => {
                self.resolve_entity(&port, scope, loc, AssignmentKind::Port);
                self.check_template(template, None);
                ReturnStatus::No
            }
            StmtKind::Receive { port, template } => {
                self.resolve_entity(&port, scope, loc, AssignmentKind::Port);
                if let Some(template) = template {
                    self.check_template(template, None);
                }
                ReturnStatus::No
            }
            StmtKind::TimerStart { timer, duration } => {
                self.resolve_entity(&timer, scope, loc, AssignmentKind::Timer);
                if let Some(duration) = duration {
                    self.check_value(duration, Some(TypeId::FLOAT));
                }
                ReturnStatus::No
            }
            StmtKind::TimerStop { timer } => {
                self.resolve_entity(&timer, scope, loc, AssignmentKind::Timer);
                ReturnStatus::No
            }
            StmtKind::SetVerdict(value) => {
                self.check_value(value, Some(TypeId::VERDICT));
                ReturnStatus::No
            }
            StmtKind::Log(value) => {
                self.check_value(value, None);
                ReturnStatus::No
            }
            StmtKind::Repeat => {
                if self.altguard_depth == 0 {
                    self.emit(
                        Diagnostic::error(ErrorCode::E2021)
                            .with_message("repeat is only allowed inside an alt guard body")
                            .with_label(loc, "repeat here"),
                    );
                    self.arena.stmt_mut(stmt_id).meta.erroneous = true;
                }
                // Control re-enters the alt; it never continues in
                // sequence.
                ReturnStatus::Yes
            }
            StmtKind::Break | StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.emit(
                        Diagnostic::error(ErrorCode::E2020)
                            .with_message("break/continue outside a loop body")
                            .with_label(loc, "here"),
                    );
                    self.arena.stmt_mut(stmt_id).meta.erroneous = true;
                }
                // Leaves the sequence either way.
                ReturnStatus::Yes
            }
            StmtKind::Stop => ReturnStatus::Yes,
        };

        self.arena.meta_mut(NodeRef::Stmt(stmt_id)).stamp(self.ts);
        status
    }

    fn check_goto(
        &mut self,
        stmt_id: StmtId,
        name: Name,
        idx: usize,
        labels: &[LabelInfo],
        skipping: &mut bool,
        loc: Location,
    ) -> ReturnStatus {
        if self.in_interleave() {
            // Already reported as illegal; no flow effects.
            return ReturnStatus::No;
        }
        if let Some(label) = labels.iter().find(|l| l.name == name) {
            self.used_labels.insert(name);
            if label.stmt_index < idx {
                // Backward goto: an unconditional loop; status caps at
                // No so following statements stay reachable.
                let name_str = self.interner.lookup(name);
                self.emit(
                    Diagnostic::warning(ErrorCode::E2017)
                        .with_message(format!(
                            "backward goto to `{name_str}` forms an unconditional loop"
                        ))
                        .with_label(loc, "jumps backward"),
                );
            } else {
                // Forward goto: skip analysis until the next used label.
                *skipping = true;
            }
            ReturnStatus::No
        } else if self.label_stack.contains(&name) {
            // Label of an enclosing block; treated conservatively.
            self.used_labels.insert(name);
            ReturnStatus::No
        } else {
            let name_str = self.interner.lookup(name);
            self.emit(
                Diagnostic::error(ErrorCode::E2015)
                    .with_message(format!("goto target `{name_str}` is not defined"))
                    .with_label(loc, "no such label in the enclosing block chain"),
            );
            self.arena.stmt_mut(stmt_id).meta.erroneous = true;
            ReturnStatus::No
        }
    }

    fn check_return(&mut self, value: Option<tess_ast::ValueId>, loc: Location) {
        match (value, self.current_return_type) {
            (Some(value), Some(return_type)) => {
                self.check_value(value, Some(return_type));
            }
            (Some(value), None) => {
                self.check_value(value, None);
                self.emit(
                    Diagnostic::error(ErrorCode::E2004)
                        .with_message("return with a value in a definition that returns none")
                        .with_label(loc, "value returned here"),
                );
            }
            (None, Some(return_type)) => {
                let expected = self.type_name(return_type);
                self.emit(
                    Diagnostic::error(ErrorCode::E2004)
                        .with_message(format!(
                            "return without a value in a function returning `{expected}`"
                        ))
                        .with_label(loc, "missing return value"),
                );
            }
            (None, None) => {}
        }
    }

    /// The restricted statement subset of interleave branches. Return
    /// and altstep invocation are reported by their own codes; the rest
    /// of the blacklist shares the generic one.
    fn check_interleave_legality(&mut self, stmt_id: StmtId, kind: &StmtKind, loc: Location) {
        let code = match kind {
            StmtKind::Return(_) => Some((
                ErrorCode::E2012,
                "return is not allowed inside interleave".to_owned(),
            )),
            StmtKind::While { .. }
            | StmtKind::DoWhile { .. }
            | StmtKind::For { .. }
            | StmtKind::Goto(_)
            | StmtKind::Label(_)
            | StmtKind::Alt(_)
            | StmtKind::Repeat => Some((
                ErrorCode::E2011,
                format!("{} is not allowed inside interleave", kind.describe()),
            )),
            _ => None,
        };
        if let Some((code, message)) = code {
            self.emit(Diagnostic::error(code).with_message(message).with_label(
                loc,
                "inside an interleave branch",
            ));
            self.arena.stmt_mut(stmt_id).meta.erroneous = true;
        }
    }
}

/// Collect the targets of every goto in a block subtree.
fn collect_goto_targets(
    arena: &tess_ast::AstArena,
    block_id: BlockId,
    targets: &mut FxHashSet<Name>,
) {
    for &stmt_id in &arena.block(block_id).stmts {
        collect_goto_targets_stmt(arena, stmt_id, targets);
    }
}

fn collect_goto_targets_stmt(
    arena: &tess_ast::AstArena,
    stmt_id: StmtId,
    targets: &mut FxHashSet<Name>,
) {
    match &arena.stmt(stmt_id).kind {
        StmtKind::Goto(name) => {
            targets.insert(*name);
        }
        StmtKind::Block(block) => collect_goto_targets(arena, *block, targets),
        StmtKind::If {
            then_block,
            else_block,
            ..
        } => {
            collect_goto_targets(arena, *then_block, targets);
            if let Some(else_block) = else_block {
                collect_goto_targets(arena, *else_block, targets);
            }
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::For { body, .. } => collect_goto_targets(arena, *body, targets),
        StmtKind::Alt(guards) | StmtKind::Interleave(guards) => {
            for guard in &guards.guards {
                collect_goto_targets(arena, guard.block, targets);
            }
        }
        _ => {}
    }
}
