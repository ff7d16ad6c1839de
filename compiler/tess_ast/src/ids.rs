//! Arena id newtypes.
//!
//! Nodes address each other by 32-bit indices into the [`AstArena`]
//! vectors rather than by owning references, which keeps the parent /
//! scope back-links acyclic and makes subtree relocation during
//! incremental reparse a vector splice.
//!
//! [`AstArena`]: crate::AstArena

use std::fmt;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

arena_id! {
    /// A named definition (the "Assignment" of the scope model).
    DefId
}
arena_id! {
    /// A type node.
    TypeId
}
arena_id! {
    /// A value / expression node.
    ValueId
}
arena_id! {
    /// A template node.
    TemplateId
}
arena_id! {
    /// A statement node.
    StmtId
}
arena_id! {
    /// A statement block.
    BlockId
}
arena_id! {
    /// A lexical scope.
    ScopeId
}

impl TypeId {
    // Pre-interned primitives, created by `AstArena::new` in this order.

    /// The `integer` type.
    pub const INTEGER: TypeId = TypeId(0);
    /// The `float` type.
    pub const FLOAT: TypeId = TypeId(1);
    /// The `boolean` type.
    pub const BOOLEAN: TypeId = TypeId(2);
    /// The `charstring` type.
    pub const CHARSTRING: TypeId = TypeId(3);
    /// The `verdicttype` type.
    pub const VERDICT: TypeId = TypeId(4);
    /// The `timer` pseudo-type.
    pub const TIMER: TypeId = TypeId(5);
    /// The `default` type (activated altstep handle).
    pub const DEFAULT: TypeId = TypeId(6);
    /// Degraded type standing in for a failed resolution step.
    ///
    /// Checks continue against this type without emitting follow-on
    /// mismatch errors.
    pub const UNDEFINED: TypeId = TypeId(7);

    /// Number of pre-interned primitive types.
    pub const PRIMITIVE_COUNT: u32 = 8;

    /// Whether this id refers to a pre-interned primitive.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::PRIMITIVE_COUNT
    }

    /// Whether this is the degraded error type.
    #[inline]
    pub const fn is_undefined(self) -> bool {
        self.0 == Self::UNDEFINED.0
    }
}
