//! Damage-region incremental reparse for the Tess compiler.
//!
//! An edit damages a source interval. Instead of reparsing the unit,
//! the engine walks the statement tree: a statement that fully envelops
//! the damage absorbs it recursively; otherwise the minimal sibling
//! region, grown over any neighbor the edit bleeds into (detected via
//! follow-token sets), is handed to the grammar layer and the fresh
//! statements are merged back by offset-ordered binary search.
//!
//! Non-convergence is an explicit [`ReparseOutcome::NeedsWiderRegion`]
//! value with a decrementing depth budget, caught exactly one level up;
//! when the budget runs out the unit is reparsed in full. That outcome
//! threading is the only control-flow-like condition in the core.

mod engine;
mod follow;

pub use engine::{
    patch_block, reparse_damaged, BlockReparser, GrammarError, ModuleReparse, ReparseOutcome,
    DEFAULT_MAX_DEPTH,
};
pub use follow::{class_at, class_before, grows_leftward, grows_rightward, TokenClass};
