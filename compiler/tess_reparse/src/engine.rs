//! The damage-region patching algorithm.
//!
//! Given an edit, the engine finds the smallest statement region that
//! must be re-read, hands exactly that interval to the grammar layer,
//! and splices the fresh statements back into the block, never a
//! whole-document reparse unless bounded escalation runs out.

use tracing::{debug, trace};

use tess_ast::{
    AstArena, BlockId, DamageRegion, DefBody, DefId, Edit, Module, NodeRef, ScopeId, Span, StmtId,
    StmtKind,
};

use crate::follow::{class_at, class_before, grows_leftward, grows_rightward};

/// Result of one patch attempt.
///
/// `NeedsWiderRegion` is the typed, depth-bounded condition replacing
/// exception-based control flow: it is caught exactly one level up,
/// where the caller retries with a widened envelope. A payload of zero
/// tells every ancestor to stop retrying and fall back to a full
/// reparse of the unit.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ReparseOutcome {
    /// The damage was absorbed and the AST patched in place.
    Applied,
    /// The damage cannot be absorbed at this level.
    NeedsWiderRegion { depth: u32 },
}

/// Failure reported by the grammar layer.
///
/// During damage patching a grammar failure escalates like any other
/// non-convergence; only a failing full-unit reparse surfaces it.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct GrammarError {
    pub message: String,
}

impl GrammarError {
    pub fn new(message: impl Into<String>) -> Self {
        GrammarError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for GrammarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "grammar layer failure: {}", self.message)
    }
}

impl std::error::Error for GrammarError {}

/// The seam to the excluded grammar layer.
pub trait BlockReparser {
    /// Parse the given interval of the new source text into fresh
    /// statements belonging to `scope`. Spans of the returned
    /// statements are in new-text coordinates.
    fn reparse_statements(
        &mut self,
        arena: &mut AstArena,
        region: Span,
        scope: ScopeId,
    ) -> Result<Vec<StmtId>, GrammarError>;

    /// Reparse the whole unit from scratch (the bounded-escalation
    /// fallback). Replaces the module's definitions and scope contents.
    fn reparse_module(
        &mut self,
        arena: &mut AstArena,
        module: &mut Module,
        source: &str,
    ) -> Result<(), GrammarError>;
}

/// How a damaged unit ended up being reparsed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ModuleReparse {
    /// The damage was patched into the existing AST.
    Incremental,
    /// Escalation ran out; the unit was reparsed in full.
    Full,
}

/// Default escalation budget before a unit falls back to full reparse.
pub const DEFAULT_MAX_DEPTH: u32 = 4;

/// Patch a module after an edit.
///
/// Locates the definition body enveloping the damage and patches it;
/// any non-convergence falls back to one full reparse of the unit.
#[tracing::instrument(level = "debug", skip_all, fields(edit = ?edit))]
pub fn reparse_damaged(
    arena: &mut AstArena,
    module: &mut Module,
    source: &str,
    edit: Edit,
    reparser: &mut dyn BlockReparser,
    max_depth: u32,
) -> Result<ModuleReparse, GrammarError> {
    let damage = edit.damage();
    let delta = edit.delta();

    let target = module.defs.iter().copied().find_map(|def_id| {
        let def = arena.def(def_id);
        if !def.meta.loc.span.contains_span(Span::new(damage.start, damage.end)) {
            return None;
        }
        body_block(arena, def_id).map(|block| (def_id, block))
    });

    if let Some((def_id, block_id)) = target {
        match patch_block(arena, source, block_id, &edit, reparser, max_depth) {
            ReparseOutcome::Applied => {
                let def = arena.def_mut(def_id);
                def.meta.loc.span = def.meta.loc.span.shifted_end(delta);
                def.meta.last_checked = None;
                // Later top-level definitions move by the edit delta.
                let later: Vec<DefId> = module
                    .defs
                    .iter()
                    .copied()
                    .filter(|&d| arena.def(d).meta.loc.span.start >= damage.end)
                    .collect();
                for d in later {
                    arena.shift_subtree(NodeRef::Def(d), delta);
                }
                arena.shift_scope_intervals(module.root_scope, damage.end, delta);
                module.meta.last_checked = None;
                debug!("incremental patch applied");
                return Ok(ModuleReparse::Incremental);
            }
            ReparseOutcome::NeedsWiderRegion { depth } => {
                debug!(depth, "escalation exhausted, falling back to full reparse");
            }
        }
    }

    reparser.reparse_module(arena, module, source)?;
    module.meta.last_checked = None;
    Ok(ModuleReparse::Full)
}

/// Patch one statement block. See the module docs for the three phases.
pub fn patch_block(
    arena: &mut AstArena,
    source: &str,
    block_id: BlockId,
    edit: &Edit,
    reparser: &mut dyn BlockReparser,
    depth: u32,
) -> ReparseOutcome {
    let damage = edit.damage();
    let block_span = arena.block(block_id).meta.loc.span;
    if damage.start < block_span.start || damage.end > block_span.end {
        trace!(?damage, ?block_span, "damage escapes block");
        return ReparseOutcome::NeedsWiderRegion {
            depth: depth.saturating_sub(1),
        };
    }

    let stmt_ids = arena.block(block_id).stmts.clone();
    let mut depth = depth;

    // Phase (a): when exactly one child statement strictly envelops the
    // damage, recurse into that statement only.
    let enveloping: Vec<StmtId> = stmt_ids
        .iter()
        .copied()
        .filter(|&s| {
            let span = arena.stmt(s).meta.loc.span;
            span.start < damage.start && damage.end < span.end
        })
        .collect();
    if let [child] = enveloping[..] {
        let nested = nested_blocks(arena, child).into_iter().find(|&b| {
            arena
                .block(b)
                .meta
                .loc
                .span
                .contains_span(Span::new(damage.start, damage.end))
        });
        if let Some(nested) = nested {
            match patch_block(arena, source, nested, edit, reparser, depth) {
                ReparseOutcome::Applied => {
                    finish_enveloping(arena, block_id, child, edit, &stmt_ids);
                    return ReparseOutcome::Applied;
                }
                ReparseOutcome::NeedsWiderRegion { depth: 0 } => {
                    return ReparseOutcome::NeedsWiderRegion { depth: 0 };
                }
                // Caught one level up: retry here with the wider
                // sibling-level envelope below.
                ReparseOutcome::NeedsWiderRegion { depth: d } => depth = d,
            }
        }
    }

    // Phase (b): minimal left/right boundaries among the siblings,
    // extended over any neighbor the edit may have grown into.
    let region = widen_region(arena, source, edit, &stmt_ids);
    if region.start < block_span.start || region.end > block_span.end {
        return ReparseOutcome::NeedsWiderRegion {
            depth: depth.saturating_sub(1),
        };
    }

    // Phase (c): statements fully inside the region are dropped, the
    // region goes to the grammar layer, and the fresh statements merge
    // back in offset order.
    let delta = edit.delta();
    let scope = arena.block(block_id).scope;
    let new_region = region.in_new_text(edit);
    let fresh = match reparser.reparse_statements(arena, new_region, scope) {
        Ok(fresh) => fresh,
        Err(err) => {
            debug!(%err, "grammar failure in damaged region, widening");
            return ReparseOutcome::NeedsWiderRegion {
                depth: depth.saturating_sub(1),
            };
        }
    };

    let mut kept = Vec::with_capacity(stmt_ids.len());
    for &s in &stmt_ids {
        let span = arena.stmt(s).meta.loc.span;
        if region.envelops(span) {
            continue;
        }
        if span.start >= region.end {
            arena.shift_subtree(NodeRef::Stmt(s), delta);
        }
        kept.push(s);
    }
    arena.block_mut(block_id).stmts = kept;
    for f in fresh {
        arena.insert_stmt_sorted(block_id, f);
    }

    let block = arena.block_mut(block_id);
    block.meta.loc.span = block_span.shifted_end(delta);
    block.meta.last_checked = None;
    block.cached_returns = None;
    arena.shift_scope_intervals(scope, region.end, delta);

    trace!(?region, "damaged region replaced");
    ReparseOutcome::Applied
}

/// Grow the initial damage over every statement it overlaps, then over
/// adjacent statements the edit may have grown per the follow sets.
/// Runs to a fixpoint (each round absorbs at least one statement).
fn widen_region(
    arena: &AstArena,
    source: &str,
    edit: &Edit,
    stmt_ids: &[StmtId],
) -> DamageRegion {
    let mut region = edit.damage();
    loop {
        let mut changed = false;
        for &s in stmt_ids {
            let span = arena.stmt(s).meta.loc.span;
            if region.envelops(span) {
                continue;
            }
            let absorb = if span.intersects(Span::new(region.start, region.end)) {
                true
            } else if span.end == region.start {
                grows_rightward(
                    &arena.stmt(s).kind,
                    class_at(source, region.start as usize),
                )
            } else if span.start == region.end {
                let boundary = region.in_new_text(edit).end as usize;
                grows_leftward(&arena.stmt(s).kind, class_before(source, boundary))
            } else {
                false
            };
            if absorb {
                region = region.absorb(span);
                changed = true;
            }
        }
        if !changed {
            return region;
        }
    }
}

/// Parent-side bookkeeping after a nested block absorbed the damage:
/// the enveloping statement stretches by the delta, later siblings and
/// sibling parts of the enveloping statement shift, caches invalidate.
fn finish_enveloping(
    arena: &mut AstArena,
    block_id: BlockId,
    child: StmtId,
    edit: &Edit,
    stmt_ids: &[StmtId],
) {
    let damage = edit.damage();
    let delta = edit.delta();

    // Parts of the enveloping statement after the damage (an else block
    // when the edit hit the then block, a loop step, ...).
    let trailing_parts: Vec<NodeRef> = arena
        .children_of(NodeRef::Stmt(child))
        .into_iter()
        .filter(|&part| arena.meta(part).loc.span.start >= damage.end)
        .collect();
    for part in trailing_parts {
        arena.shift_subtree(part, delta);
    }

    let child_stmt = arena.stmt_mut(child);
    child_stmt.meta.loc.span = child_stmt.meta.loc.span.shifted_end(delta);
    child_stmt.meta.last_checked = None;

    for &s in stmt_ids {
        if s != child && arena.stmt(s).meta.loc.span.start >= damage.end {
            arena.shift_subtree(NodeRef::Stmt(s), delta);
        }
    }

    let block_span = arena.block(block_id).meta.loc.span;
    let scope = arena.block(block_id).scope;
    let block = arena.block_mut(block_id);
    block.meta.loc.span = block_span.shifted_end(delta);
    block.meta.last_checked = None;
    block.cached_returns = None;
    arena.shift_scope_intervals(scope, damage.end, delta);
}

/// The statement-body block of a definition, when it has one.
fn body_block(arena: &AstArena, def_id: DefId) -> Option<BlockId> {
    match &arena.def(def_id).body {
        DefBody::Function { body, .. } | DefBody::Testcase { body, .. } => Some(*body),
        _ => None,
    }
}

/// Blocks nested directly inside a statement.
fn nested_blocks(arena: &AstArena, stmt: StmtId) -> Vec<BlockId> {
    match &arena.stmt(stmt).kind {
        StmtKind::Block(b) => vec![*b],
        StmtKind::If {
            then_block,
            else_block,
            ..
        } => {
            let mut blocks = vec![*then_block];
            blocks.extend(*else_block);
            blocks
        }
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::For { body, .. } => vec![*body],
        StmtKind::Alt(guards) | StmtKind::Interleave(guards) => {
            guards.guards.iter().map(|g| g.block).collect()
        }
        _ => Vec::new(),
    }
}
