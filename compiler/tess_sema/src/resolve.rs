//! Reference resolution and value checking.
//!
//! Name lookup starts at the innermost scope and walks outward.
//! Sub-references resolve step-wise against the governing type produced
//! by the previous step; a failing step reports once and continues with
//! the undefined type so the rest of the chain (and sibling checks)
//! still run.

use tracing::trace;

use tess_ast::{
    element_type, is_compatible, record_field, AssignmentKind, DefId, Location, NodeRef,
    Reference, SubRef, TypeId, ValueId, ValueKind,
};
use tess_diagnostic::{type_mismatch, undefined_reference, Diagnostic, ErrorCode};

use crate::context::CheckContext;
use crate::stack::ensure_sufficient_stack;

/// Outcome of resolving a reference chain.
#[derive(Copy, Clone, Debug)]
pub struct Resolution {
    /// The defining entity of the head name, when found.
    pub def: Option<DefId>,
    /// Governing type after the last sub-reference step.
    pub ty: TypeId,
}

impl CheckContext<'_> {
    /// Resolve a reference in the scope it was written in.
    ///
    /// Reports `undefined reference` for a missing head name and a
    /// typed diagnostic for each failing sub-reference step; the chain
    /// keeps resolving against the undefined type after a failure.
    pub(crate) fn resolve_reference(
        &mut self,
        reference: &Reference,
        scope: tess_ast::ScopeId,
        loc: Location,
    ) -> Resolution {
        let head = self.arena.lookup(scope, reference.name).map(|(def, _)| def);
        if head.is_none() {
            let name = self.interner.lookup(reference.name);
            trace!(name, "reference not found");
            self.emit(undefined_reference(loc, name));
        }

        // Referenced constants and templates are checked on demand so
        // their own types are settled; the reference chain in the
        // context bounds this re-entrancy.
        if let Some(def_id) = head {
            let def_kind = self.arena.def(def_id).kind;
            if matches!(def_kind, AssignmentKind::Constant | AssignmentKind::Template) {
                self.check_definition(def_id);
            }
        }

        // The chain keeps resolving even after a failed head lookup,
        // with the undefined type suppressing follow-on noise.
        let mut governing = head.map_or(TypeId::UNDEFINED, |def_id| self.arena.def(def_id).ty);
        for (step, subref) in reference.subrefs.iter().enumerate() {
            governing = self.resolve_subref(head, governing, step, subref, loc);
        }
        Resolution { def: head, ty: governing }
    }

    fn resolve_subref(
        &mut self,
        head: Option<DefId>,
        governing: TypeId,
        step: usize,
        subref: &SubRef,
        loc: Location,
    ) -> TypeId {
        match subref {
            SubRef::Field(field) => match record_field(self.arena, governing, *field) {
                Some(field_ty) => field_ty,
                None => {
                    if !governing.is_undefined() {
                        let field_name = self.interner.lookup(*field);
                        let ty_name = self.type_name(governing);
                        self.emit(
                            Diagnostic::error(ErrorCode::E2006)
                                .with_message(format!(
                                    "type `{ty_name}` has no field `{field_name}`"
                                ))
                                .with_label(loc, "in this reference"),
                        );
                    }
                    TypeId::UNDEFINED
                }
            },
            SubRef::Index(index) => {
                self.check_value(*index, Some(TypeId::INTEGER));
                match element_type(self.arena, governing) {
                    Some(elem) => elem,
                    None => {
                        if !governing.is_undefined() {
                            let ty_name = self.type_name(governing);
                            self.emit(
                                Diagnostic::error(ErrorCode::E2007)
                                    .with_message(format!("type `{ty_name}` cannot be indexed"))
                                    .with_label(loc, "in this reference"),
                            );
                        }
                        TypeId::UNDEFINED
                    }
                }
            }
            SubRef::Call(args) => {
                // Only the head position of a chain can be invocable.
                let head_kind = head.map(|d| self.arena.def(d).kind);
                match (head, head_kind) {
                    (Some(head), Some(kind)) if step == 0 && kind.is_invocable() => {
                        self.check_invocation_args(head, args, loc);
                        governing
                    }
                    _ => {
                        if !governing.is_undefined() {
                            let ty_name = self.type_name(governing);
                            self.emit(
                                Diagnostic::error(ErrorCode::E2008)
                                    .with_message(format!(
                                        "a value of type `{ty_name}` cannot be invoked"
                                    ))
                                    .with_label(loc, "call applied to a non-invocable entity"),
                            );
                        }
                        let args = args.clone();
                        for arg in args {
                            self.check_value(arg, None);
                        }
                        TypeId::UNDEFINED
                    }
                }
            }
        }
    }

    /// Check an actual-parameter list against a definition's formals.
    pub(crate) fn check_invocation_args(&mut self, def_id: DefId, args: &[ValueId], loc: Location) {
        let params: Vec<TypeId> = self.arena.def(def_id).params().iter().map(|p| p.ty).collect();
        if params.len() != args.len() {
            let name = self.interner.lookup(self.arena.def(def_id).name);
            self.emit(
                Diagnostic::error(ErrorCode::E2005)
                    .with_message(format!(
                        "`{name}` expects {} argument(s), found {}",
                        params.len(),
                        args.len()
                    ))
                    .with_label(loc, "in this invocation"),
            );
        }
        for (&arg, &param_ty) in args.iter().zip(params.iter()) {
            self.check_value(arg, Some(param_ty));
        }
        // Surplus arguments still get checked, without an expectation.
        for &arg in args.iter().skip(params.len()) {
            self.check_value(arg, None);
        }
    }

    /// Check a value and return its governing type.
    ///
    /// With `expected` set, a compatibility failure reports a type
    /// mismatch and degrades the result to the undefined type.
    pub(crate) fn check_value(&mut self, id: ValueId, expected: Option<TypeId>) -> TypeId {
        ensure_sufficient_stack(|| self.check_value_inner(id, expected))
    }

    fn check_value_inner(&mut self, id: ValueId, expected: Option<TypeId>) -> TypeId {
        let kind = self.arena.value(id).kind.clone();
        let loc = self.arena.value(id).meta.loc;
        let scope = self.arena.value(id).meta.scope;

        let actual = match kind {
            ValueKind::IntLit(_) => TypeId::INTEGER,
            ValueKind::FloatLit(_) => TypeId::FLOAT,
            ValueKind::BoolLit(_) => TypeId::BOOLEAN,
            ValueKind::CharstringLit(_) => TypeId::CHARSTRING,
            ValueKind::VerdictLit(_) => TypeId::VERDICT,
            ValueKind::Undefined => TypeId::UNDEFINED,
            ValueKind::Reference(reference) => self.resolve_reference(&reference, scope, loc).ty,
            ValueKind::Unary { op, operand } => self.check_unary(op, operand, loc),
            ValueKind::Binary { op, lhs, rhs } => self.check_binary(op, lhs, rhs, loc),
        };

        let result = match expected {
            Some(expected_ty) if !is_compatible(self.arena, actual, expected_ty) => {
                let expected_name = self.type_name(expected_ty);
                let found_name = self.type_name(actual);
                self.emit(type_mismatch(
                    loc,
                    &expected_name,
                    &found_name,
                    "in this value",
                ));
                self.arena.value_mut(id).meta.erroneous = true;
                TypeId::UNDEFINED
            }
            _ => actual,
        };
        self.arena.meta_mut(NodeRef::Value(id)).stamp(self.ts);
        result
    }

    fn check_unary(
        &mut self,
        op: tess_ast::UnaryOp,
        operand: ValueId,
        loc: Location,
    ) -> TypeId {
        use tess_ast::UnaryOp;
        match op {
            UnaryOp::Not => {
                self.check_value(operand, Some(TypeId::BOOLEAN));
                TypeId::BOOLEAN
            }
            UnaryOp::Neg => {
                let ty = self.check_value(operand, None);
                if matches!(ty, TypeId::INTEGER | TypeId::FLOAT) || ty.is_undefined() {
                    ty
                } else {
                    let found = self.type_name(ty);
                    self.emit(type_mismatch(loc, "integer or float", &found, "negated here"));
                    TypeId::UNDEFINED
                }
            }
        }
    }

    fn check_binary(
        &mut self,
        op: tess_ast::BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
        loc: Location,
    ) -> TypeId {
        use tess_ast::BinaryOp;
        if op.is_logical() {
            self.check_value(lhs, Some(TypeId::BOOLEAN));
            self.check_value(rhs, Some(TypeId::BOOLEAN));
            return TypeId::BOOLEAN;
        }
        if op.is_comparison() {
            let lt = self.check_value(lhs, None);
            let rt = self.check_value(rhs, None);
            if !is_compatible(self.arena, rt, lt) && !is_compatible(self.arena, lt, rt) {
                let lhs_name = self.type_name(lt);
                let rhs_name = self.type_name(rt);
                self.emit(type_mismatch(
                    loc,
                    &lhs_name,
                    &rhs_name,
                    &format!("operands of `{}` must be comparable", op.as_str()),
                ));
            }
            return TypeId::BOOLEAN;
        }
        if matches!(op, BinaryOp::Concat) {
            self.check_value(lhs, Some(TypeId::CHARSTRING));
            self.check_value(rhs, Some(TypeId::CHARSTRING));
            return TypeId::CHARSTRING;
        }
        // Arithmetic: integer or float, both sides alike.
        let lt = self.check_value(lhs, None);
        if matches!(lt, TypeId::INTEGER | TypeId::FLOAT) {
            self.check_value(rhs, Some(lt));
            lt
        } else if lt.is_undefined() {
            self.check_value(rhs, None);
            TypeId::UNDEFINED
        } else {
            let found = self.type_name(lt);
            self.emit(type_mismatch(
                loc,
                "integer or float",
                &found,
                &format!("left operand of `{}`", op.as_str()),
            ));
            self.check_value(rhs, None);
            TypeId::UNDEFINED
        }
    }

    /// Check a template, optionally against a governed type.
    pub(crate) fn check_template(
        &mut self,
        id: tess_ast::TemplateId,
        expected: Option<TypeId>,
    ) {
        use tess_ast::TemplateKind;
        let kind = self.arena.template(id).kind.clone();
        match kind {
            TemplateKind::Specific(value) => {
                self.check_value(value, expected);
            }
            TemplateKind::Any | TemplateKind::AnyOrOmit | TemplateKind::Omit => {}
            TemplateKind::ValueList(entries) => {
                for entry in entries {
                    self.check_template(entry, expected);
                }
            }
            TemplateKind::FieldAssignments(fields) => {
                let loc = self.arena.template(id).meta.loc;
                for (field, template) in fields {
                    let field_ty = expected.and_then(|ty| record_field(self.arena, ty, field));
                    if field_ty.is_none() {
                        if let Some(expected_ty) = expected {
                            if !expected_ty.is_undefined() {
                                let field_name = self.interner.lookup(field);
                                let ty_name = self.type_name(expected_ty);
                                self.emit(
                                    Diagnostic::error(ErrorCode::E2006)
                                        .with_message(format!(
                                            "type `{ty_name}` has no field `{field_name}`"
                                        ))
                                        .with_label(loc, "in this template"),
                                );
                            }
                        }
                    }
                    self.check_template(template, field_ty);
                }
            }
        }
        self.arena
            .meta_mut(NodeRef::Template(id))
            .stamp(self.ts);
    }

    /// Resolve a reference that must denote a definition of `kind`.
    ///
    /// Emits a kind-mismatch diagnostic and returns `None` otherwise.
    pub(crate) fn resolve_entity(
        &mut self,
        reference: &Reference,
        scope: tess_ast::ScopeId,
        loc: Location,
        kind: AssignmentKind,
    ) -> Option<DefId> {
        let resolution = self.resolve_reference(reference, scope, loc);
        let def_id = resolution.def?;
        let found = self.arena.def(def_id).kind;
        if found == kind {
            Some(def_id)
        } else {
            let name = self.interner.lookup(reference.name);
            self.emit(
                Diagnostic::error(ErrorCode::E2022)
                    .with_message(format!(
                        "`{name}` is a {}, expected a {}",
                        found.describe(),
                        kind.describe()
                    ))
                    .with_label(loc, "referenced here"),
            );
            None
        }
    }

}
