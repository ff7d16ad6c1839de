//! Type nodes.
//!
//! Types are closed tagged variants held in the arena; user-defined
//! types (components, ports, records) live above the pre-interned
//! primitive ids. Compatibility is deliberately not identity: component
//! types are compatible along their `extends` chain, records
//! structurally.

use crate::ids::{DefId, TypeId, ValueId};
use crate::interner::Name;
use crate::node::NodeMeta;
use crate::AstArena;

/// A type node.
#[derive(Clone, Debug)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub meta: NodeMeta,
}

/// Closed set of type shapes.
#[derive(Clone, Debug)]
pub enum TypeKind {
    Integer,
    Float,
    Boolean,
    Charstring,
    Verdict,
    Timer,
    /// Activated-altstep handle (`default`).
    Default,
    /// Degraded stand-in after a failed resolution step.
    Undefined,
    /// Test component type; carries its local definitions and an
    /// optional base component it extends.
    Component {
        name: Name,
        extends: Option<TypeId>,
        defs: Vec<DefId>,
    },
    /// Message- or procedure-based port type.
    Port {
        name: Name,
        kind: PortClass,
        in_types: Vec<TypeId>,
        out_types: Vec<TypeId>,
    },
    /// Ordered named fields.
    Record {
        name: Name,
        fields: Vec<(Name, TypeId)>,
    },
    /// Fixed- or open-length element sequence.
    ArrayOf {
        elem: TypeId,
        len: Option<ValueId>,
    },
    /// Type of an altstep value that can be dereferenced and invoked.
    Altstep {
        runs_on: Option<TypeId>,
        runs_on_self: bool,
    },
}

impl TypeKind {
    /// Short name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            TypeKind::Integer => "integer",
            TypeKind::Float => "float",
            TypeKind::Boolean => "boolean",
            TypeKind::Charstring => "charstring",
            TypeKind::Verdict => "verdicttype",
            TypeKind::Timer => "timer",
            TypeKind::Default => "default",
            TypeKind::Undefined => "<undefined>",
            TypeKind::Component { .. } => "component type",
            TypeKind::Port { .. } => "port type",
            TypeKind::Record { .. } => "record type",
            TypeKind::ArrayOf { .. } => "array type",
            TypeKind::Altstep { .. } => "altstep type",
        }
    }
}

/// Communication style of a port type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PortClass {
    Message,
    Procedure,
}

/// Type compatibility, not identity.
///
/// - anything is compatible with `UNDEFINED` in either direction, so one
///   failed resolution step does not cascade;
/// - primitives are compatible by identity;
/// - a component type is compatible with every base on its `extends`
///   chain;
/// - records are compatible field-wise by name and type;
/// - arrays are compatible when their element types are.
pub fn is_compatible(arena: &AstArena, from: TypeId, to: TypeId) -> bool {
    if from == to || from.is_undefined() || to.is_undefined() {
        return true;
    }
    match (&arena.ty(from).kind, &arena.ty(to).kind) {
        (TypeKind::Component { .. }, TypeKind::Component { .. }) => {
            extends_chain_contains(arena, from, to)
        }
        (
            TypeKind::Record { fields: lhs, .. },
            TypeKind::Record { fields: rhs, .. },
        ) => {
            lhs.len() == rhs.len()
                && lhs.iter().zip(rhs.iter()).all(|((ln, lt), (rn, rt))| {
                    ln == rn && is_compatible(arena, *lt, *rt)
                })
        }
        (TypeKind::ArrayOf { elem: le, .. }, TypeKind::ArrayOf { elem: re, .. }) => {
            is_compatible(arena, *le, *re)
        }
        _ => false,
    }
}

/// Walk the `extends` chain of `from` looking for `to`.
fn extends_chain_contains(arena: &AstArena, from: TypeId, to: TypeId) -> bool {
    let mut current = from;
    // The chain is acyclic by construction (a component cannot extend a
    // component that is not yet declared), but cap the walk anyway.
    for _ in 0..64 {
        if current == to {
            return true;
        }
        match &arena.ty(current).kind {
            TypeKind::Component {
                extends: Some(base),
                ..
            } => current = *base,
            _ => return false,
        }
    }
    false
}

/// Field lookup on a record type.
pub fn record_field(arena: &AstArena, ty: TypeId, field: Name) -> Option<TypeId> {
    match &arena.ty(ty).kind {
        TypeKind::Record { fields, .. } => fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, field_ty)| *field_ty),
        _ => None,
    }
}

/// Element type of an array type.
pub fn element_type(arena: &AstArena, ty: TypeId) -> Option<TypeId> {
    match &arena.ty(ty).kind {
        TypeKind::ArrayOf { elem, .. } => Some(*elem),
        _ => None,
    }
}
