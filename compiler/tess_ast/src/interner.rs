//! String interner for identifiers.
//!
//! Names are compared and hashed as 32-bit handles; the backing strings
//! are leaked so lookups can hand out `&'static str` without lifetime
//! plumbing. The interner is shared between compilation units and passes,
//! so it stays behind a lock even though each unit is checked
//! single-threaded.

// Arc is needed so one interner can be shared by several compilation
// units and by the generation pass that outlives a single check.
#![allow(clippy::disallowed_types)]

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Interned identifier handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Raw index, for arena-parallel tables.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

struct InternerInner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Thread-safe string interner.
///
/// Cheap to clone (`Arc` inside); all clones observe the same table.
#[derive(Clone)]
pub struct StringInterner {
    inner: Arc<RwLock<InternerInner>>,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    pub fn new() -> Self {
        StringInterner {
            inner: Arc::new(RwLock::new(InternerInner {
                map: FxHashMap::default(),
                strings: Vec::with_capacity(256),
            })),
        }
    }

    /// Intern a string, returning its stable handle.
    pub fn intern(&self, s: &str) -> Name {
        {
            let inner = self.inner.read();
            if let Some(&idx) = inner.map.get(s) {
                return Name(idx);
            }
        }
        let mut inner = self.inner.write();
        // Re-check under the write lock; another caller may have won.
        if let Some(&idx) = inner.map.get(s) {
            return Name(idx);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(inner.strings.len()).unwrap_or_else(|_| {
            // 4 billion identifiers exceeds any real compilation unit.
            panic!("interner capacity exceeded")
        });
        inner.strings.push(leaked);
        inner.map.insert(leaked, idx);
        Name(idx)
    }

    /// Resolve a handle back to its string.
    ///
    /// # Panics
    /// Panics if `name` came from a different interner.
    pub fn lookup(&self, name: Name) -> &'static str {
        let inner = self.inner.read();
        match inner.strings.get(name.0 as usize) {
            Some(s) => s,
            None => panic!("name {:?} not found in this interner", name),
        }
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringInterner")
            .field("len", &self.len())
            .finish()
    }
}
