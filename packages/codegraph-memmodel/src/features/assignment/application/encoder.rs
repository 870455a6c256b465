//! Assignment lowering
//!
//! Aggregates are lowered cell by cell. All memory cells written by one
//! assignment land in the *next* version of their type's memory function;
//! the versions are bumped once, after retention has been generated, so
//! every read inside the assignment still sees the pre-write memory.

use crate::context::EncoderContext;
use crate::errors::{EncodingError, Result};
use crate::features::assignment::domain::{Lvalue, Rvalue, TypedRvalue};
use crate::features::formula::{Constraints, Formula};
use crate::features::pointer_target::PointerTargetPattern;
use crate::features::pointer_target_set::PointerTargetSet;
use crate::features::retention::RetentionConstraintGenerator;
use crate::features::ssa::SsaMapBuilder;
use crate::features::type_layout::{CompositeLayout, TypeShape};
use crate::shared::models::CanonicalType;

/// Mutable encoding state threaded through one assignment
pub struct AssignmentState<'s> {
    pub pts: &'s PointerTargetSet,
    pub ssa: &'s mut SsaMapBuilder,
    pub constraints: &'s mut Constraints,
}

pub struct AssignmentEncoder<'a> {
    ctx: &'a EncoderContext,
}

impl<'a> AssignmentEncoder<'a> {
    pub fn new(ctx: &'a EncoderContext) -> Self {
        Self { ctx }
    }

    /// Encode `lhs = rhs`, returning the assignment formula
    ///
    /// Memory writes add their retention constraints to `state.constraints`;
    /// `pattern` classifies the written address (inexact when `None`).
    pub fn encode_assignment(
        &self,
        lhs_ty: &CanonicalType,
        rhs_ty: &CanonicalType,
        lhs: &Lvalue,
        rhs: &Rvalue,
        pattern: Option<&PointerTargetPattern>,
        state: &mut AssignmentState<'_>,
    ) -> Result<Formula> {
        let layout = self.ctx.layout();
        let lhs_ty = layout.resolve(lhs_ty);
        let mut written = Vec::new();
        let formula = self.lower(&lhs_ty, rhs_ty, lhs, rhs, state, &mut written)?;

        if let Lvalue::Address(start) = lhs {
            let any = PointerTargetPattern::any();
            let pattern = pattern.unwrap_or(&any);
            let retention = RetentionConstraintGenerator::new(self.ctx);
            if matches!(layout.shape(&lhs_ty), TypeShape::Scalar) {
                for ty in &written {
                    retention.scalar_write(state.pts, ty, pattern, start, state.ssa, state.constraints);
                }
            } else if !written.is_empty() {
                retention.aggregate_write(
                    state.pts,
                    pattern,
                    &self.first_leaf_type(&lhs_ty),
                    start,
                    layout.size_of(&lhs_ty),
                    &written,
                    state.ssa,
                    state.constraints,
                );
            }
            for ty in &written {
                state.ssa.bump(ty.uf_name(), ty);
            }
        }
        Ok(formula)
    }

    fn lower(
        &self,
        lhs_ty: &CanonicalType,
        rhs_ty: &CanonicalType,
        lhs: &Lvalue,
        rhs: &Rvalue,
        state: &mut AssignmentState<'_>,
        written: &mut Vec<CanonicalType>,
    ) -> Result<Formula> {
        match self.ctx.layout().shape(lhs_ty) {
            TypeShape::Function => Err(EncodingError::illegal_assignment(format!(
                "cannot assign to function type {}",
                lhs_ty
            ))),
            TypeShape::Array { element, length } => {
                self.lower_array(&element, length, rhs_ty, lhs, rhs, state, written)
            }
            TypeShape::Composite(composite) => {
                self.lower_composite(&composite, rhs_ty, lhs, rhs, state, written)
            }
            TypeShape::Scalar => self.lower_scalar(lhs_ty, rhs_ty, lhs, rhs, state, written),
        }
    }

    fn zero(&self) -> Rvalue {
        Rvalue::Value(Formula::bv(0, 8))
    }

    fn shifted(&self, address: &Formula, offset: u64) -> Formula {
        Formula::add(address.clone(), self.ctx.offset(offset))
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_array(
        &self,
        element: &CanonicalType,
        length: u64,
        rhs_ty: &CanonicalType,
        lhs: &Lvalue,
        rhs: &Rvalue,
        state: &mut AssignmentState<'_>,
        written: &mut Vec<CanonicalType>,
    ) -> Result<Formula> {
        let layout = self.ctx.layout();
        let Lvalue::Address(start) = lhs else {
            return Err(EncodingError::illegal_assignment(
                "array elements cannot be held in a pure variable",
            ));
        };
        let rhs_element = match rhs_ty.array_element() {
            Some((rhs_element, _)) => {
                if layout.resolve(&rhs_element) != layout.resolve(element) {
                    return Err(EncodingError::illegal_assignment(format!(
                        "incompatible array element types {} and {}",
                        element, rhs_element
                    )));
                }
                rhs_element
            }
            None => rhs_ty.clone(),
        };
        if let Rvalue::List(items) = rhs {
            if items.len() as u64 > length {
                return Err(EncodingError::illegal_assignment(format!(
                    "{} initializers for an array of {} elements",
                    items.len(),
                    length
                )));
            }
        }

        let element_size = layout.size_of(element);
        let mut parts = Vec::new();
        for i in 0..length {
            let offset = i * element_size;
            let cell = Lvalue::Address(self.shifted(start, offset));
            let (item_ty, item) = match rhs {
                Rvalue::Nondet => (rhs_element.clone(), Rvalue::Nondet),
                Rvalue::Value(v) => (rhs_element.clone(), Rvalue::Value(v.clone())),
                Rvalue::Address(a) => (rhs_element.clone(), Rvalue::Address(self.shifted(a, offset))),
                Rvalue::Variable(_) => {
                    return Err(EncodingError::illegal_assignment(
                        "array elements cannot be read from a pure variable",
                    ))
                }
                Rvalue::List(items) => match items.get(i as usize) {
                    Some(TypedRvalue { ty, value }) => (ty.clone(), value.clone()),
                    None => (element.clone(), self.zero()),
                },
            };
            parts.push(self.lower(element, &item_ty, &cell, &item, state, written)?);
        }
        Ok(Formula::and(parts))
    }

    /// Members of a memory object are written only when tracked; members of
    /// a pure variable become `name$member` variables
    fn lower_composite(
        &self,
        composite: &CompositeLayout,
        rhs_ty: &CanonicalType,
        lhs: &Lvalue,
        rhs: &Rvalue,
        state: &mut AssignmentState<'_>,
        written: &mut Vec<CanonicalType>,
    ) -> Result<Formula> {
        let layout = self.ctx.layout();
        let rhs_composite = layout.composite(rhs_ty).is_some();
        if rhs_composite && layout.resolve(rhs_ty) != composite.ty {
            return Err(EncodingError::illegal_assignment(format!(
                "incompatible composite types {} and {}",
                composite.ty, rhs_ty
            )));
        }
        if let Rvalue::List(items) = rhs {
            if items.len() > composite.members.len() {
                return Err(EncodingError::illegal_assignment(format!(
                    "{} initializers for {} with {} members",
                    items.len(),
                    composite.ty,
                    composite.members.len()
                )));
            }
        }

        let mut parts = Vec::new();
        for (k, member) in composite.members.iter().enumerate() {
            let member_lhs = match lhs {
                Lvalue::Variable(name) => Lvalue::Variable(format!("{}${}", name, member.name)),
                Lvalue::Address(a) if state.pts.tracks_field(&composite.ty, &member.name) => {
                    Lvalue::Address(self.shifted(a, member.offset))
                }
                Lvalue::Address(_) => continue,
            };
            let (item_ty, item) = match rhs {
                Rvalue::Nondet => (member.ty.clone(), Rvalue::Nondet),
                Rvalue::Value(v) if rhs_composite => (member.ty.clone(), Rvalue::Value(v.clone())),
                Rvalue::Value(v) => (rhs_ty.clone(), Rvalue::Value(v.clone())),
                Rvalue::Address(a) if rhs_composite => {
                    (member.ty.clone(), Rvalue::Address(self.shifted(a, member.offset)))
                }
                Rvalue::Address(_) => {
                    return Err(EncodingError::illegal_assignment(format!(
                        "cannot copy {} from a {} object",
                        composite.ty, rhs_ty
                    )))
                }
                Rvalue::Variable(name) => (
                    member.ty.clone(),
                    Rvalue::Variable(format!("{}${}", name, member.name)),
                ),
                Rvalue::List(items) => match items.get(k) {
                    Some(TypedRvalue { ty, value }) => (ty.clone(), value.clone()),
                    None => (member.ty.clone(), self.zero()),
                },
            };
            parts.push(self.lower(&member.ty, &item_ty, &member_lhs, &item, state, written)?);
        }
        Ok(Formula::and(parts))
    }

    fn lower_scalar(
        &self,
        lhs_ty: &CanonicalType,
        rhs_ty: &CanonicalType,
        lhs: &Lvalue,
        rhs: &Rvalue,
        state: &mut AssignmentState<'_>,
        written: &mut Vec<CanonicalType>,
    ) -> Result<Formula> {
        let layout = self.ctx.layout();
        let value = match rhs {
            Rvalue::Nondet => None,
            Rvalue::Value(v) => Some(v.clone()),
            Rvalue::Address(a) => {
                let source = layout.resolve(rhs_ty);
                let name = source.uf_name();
                let index = state.ssa.get_index(&name);
                Some(Formula::uf(name, index, self.ctx.value_sort(&source), vec![a.clone()]))
            }
            Rvalue::Variable(name) => Some(Formula::ssa_var(
                name.clone(),
                state.ssa.get_index(name),
                self.ctx.value_sort(rhs_ty),
            )),
            Rvalue::List(items) => match items.first() {
                Some(TypedRvalue { ty, value }) => {
                    return self.lower_scalar(lhs_ty, ty, lhs, value, state, written)
                }
                None => Some(Formula::bv(0, 8)),
            },
        };
        let width = layout.bit_width(lhs_ty);
        let value = value.map(|v| {
            let v = if v.is_bool() {
                Formula::ite(v, Formula::bv(1, width), Formula::bv(0, width))
            } else {
                v
            };
            Formula::cast(v, width, !rhs_ty.is_unsigned())
        });

        let sort = self.ctx.value_sort(lhs_ty);
        let cell = match lhs {
            Lvalue::Variable(name) => {
                let index = state.ssa.bump(name.clone(), lhs_ty);
                Formula::ssa_var(name.clone(), index, sort)
            }
            Lvalue::Address(address) => {
                let name = lhs_ty.uf_name();
                let index = state.ssa.next_index(&name);
                if !written.contains(lhs_ty) {
                    written.push(lhs_ty.clone());
                }
                Formula::uf(name, index, sort, vec![address.clone()])
            }
        };
        Ok(value.map_or_else(Formula::tt, |v| Formula::eq(cell, v)))
    }

    /// Type of the scalar at offset zero of `ty`
    fn first_leaf_type(&self, ty: &CanonicalType) -> CanonicalType {
        let layout = self.ctx.layout();
        let mut current = layout.resolve(ty);
        loop {
            let next = match layout.shape(&current) {
                TypeShape::Array { element, .. } => element,
                TypeShape::Composite(composite) => match composite.members.first() {
                    Some(member) => member.ty.clone(),
                    None => return current,
                },
                TypeShape::Scalar | TypeShape::Function => return current,
            };
            current = layout.resolve(&next);
        }
    }
}
