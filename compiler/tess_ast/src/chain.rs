//! Reference chain for circular-definition detection.
//!
//! Live only while one value is being evaluated. Before recursing into a
//! definition that can reference itself (constant and default
//! initializers), the evaluator pushes it here; finding it already
//! present is the cycle. The chain is mark/rewind, never unwound by
//! panics, so sibling evaluations and re-entrant evaluation triggered
//! from an unrelated value are unaffected.

use smallvec::SmallVec;

use crate::node::NodeRef;

/// Position in the chain, handed back by [`ReferenceChain::marker`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ChainMarker(usize);

/// Stack of nodes currently under evaluation.
#[derive(Debug, Default)]
pub struct ReferenceChain {
    entries: SmallVec<[NodeRef; 8]>,
}

impl ReferenceChain {
    pub fn new() -> Self {
        ReferenceChain {
            entries: SmallVec::new(),
        }
    }

    /// Try to push a node. Returns `false` when the node is already on
    /// the chain; the caller reports a circular reference and must not
    /// recurse further.
    #[must_use]
    pub fn push(&mut self, node: NodeRef) -> bool {
        if self.entries.contains(&node) {
            return false;
        }
        self.entries.push(node);
        true
    }

    /// Current position, for a later [`rewind`](Self::rewind).
    pub fn marker(&self) -> ChainMarker {
        ChainMarker(self.entries.len())
    }

    /// Drop everything pushed after `marker`.
    ///
    /// Called on every exit path of an evaluation, successful or not.
    pub fn rewind(&mut self, marker: ChainMarker) {
        self.entries.truncate(marker.0);
    }

    /// The nodes forming the cycle through `node`, in push order.
    ///
    /// Empty when `node` is not on the chain.
    pub fn cycle_through(&self, node: NodeRef) -> &[NodeRef] {
        match self.entries.iter().position(|&n| n == node) {
            Some(start) => &self.entries[start..],
            None => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
