//! Logical compilation timestamps.
//!
//! Every checkable node remembers the timestamp of its last successful
//! validation; a check call with a timestamp that is not newer is a
//! no-op. The timestamp is always an explicit parameter; nothing in the
//! core reads an ambient clock.

use std::fmt;

/// Totally ordered logical clock value gating re-validation.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct CompilationTimestamp(u64);

impl CompilationTimestamp {
    /// First valid timestamp; `CompilationClock::tick` starts here.
    pub const FIRST: CompilationTimestamp = CompilationTimestamp(1);

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for CompilationTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ts#{}", self.0)
    }
}

/// Monotonic producer of [`CompilationTimestamp`] values.
///
/// One clock per driver; each edit-and-recheck cycle calls [`tick`] once
/// and threads the produced value through the whole pass.
///
/// [`tick`]: CompilationClock::tick
#[derive(Debug, Default)]
pub struct CompilationClock {
    last: u64,
}

impl CompilationClock {
    pub fn new() -> Self {
        CompilationClock { last: 0 }
    }

    /// Produce the next, strictly greater timestamp.
    pub fn tick(&mut self) -> CompilationTimestamp {
        self.last += 1;
        CompilationTimestamp(self.last)
    }

    /// Most recently produced timestamp, if any.
    pub fn current(&self) -> Option<CompilationTimestamp> {
        if self.last == 0 {
            None
        } else {
            Some(CompilationTimestamp(self.last))
        }
    }
}
