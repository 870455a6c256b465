//! Expression encoding
//!
//! Pure variables become SSA constants `x@i`; anything living in memory is
//! read through the memory function of its type at the current version.
//! Field accesses through memory keep the tracked-field set up to date.

use super::edge_state::EdgeState;
use crate::errors::Result;
use crate::features::assignment::{Rvalue, TypedRvalue};
use crate::features::formula::{BvOp, Formula};
use crate::shared::models::{BinaryOp, CExpression, CanonicalType, ExprKind, UnaryOp};

/// Where an lvalue lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Pure(String),
    Memory(Formula),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl<'a> EdgeState<'a> {
    fn width(&self, ty: &CanonicalType) -> u32 {
        self.ctx.layout().bit_width(ty)
    }

    /// Resize `value` of type `from` to the representation of `to`
    pub(crate) fn convert(&self, value: Formula, from: &CanonicalType, to: &CanonicalType) -> Formula {
        let width = self.width(to);
        if value.is_bool() {
            return Formula::ite(value, Formula::bv(1, width), Formula::bv(0, width));
        }
        Formula::cast(value, width, !from.is_unsigned())
    }

    /// Pointer-width copy of an index expression
    fn index_value(&mut self, index: &CExpression) -> Result<Formula> {
        let ty = self.canonical(&index.ty);
        let value = self.encode_expression(index)?;
        Ok(Formula::cast(value, self.ctx.layout().pointer_bits(), !ty.is_unsigned()))
    }

    /// Bytes one step of pointer arithmetic moves; `void *` steps by one
    fn stride(&self, pointer_ty: &CanonicalType) -> u64 {
        let ctx = self.ctx;
        let layout = ctx.layout();
        pointer_ty
            .pointee()
            .or_else(|| pointer_ty.array_element().map(|(element, _)| element))
            .map(|target| layout.size_of(&layout.resolve(&target)))
            .filter(|size| *size > 0)
            .unwrap_or(1)
    }

    pub fn encode_expression(&mut self, e: &CExpression) -> Result<Formula> {
        let ty = self.canonical(&e.ty);
        let width = self.width(&ty);
        match &e.kind {
            ExprKind::IntLiteral(value) => Ok(Formula::bv(*value, width)),
            ExprKind::Id(name) => self.read_variable(name, &ty),
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.canonical(&operand.ty);
                match op {
                    UnaryOp::Minus => {
                        let value = self.encode_expression(operand)?;
                        Ok(Formula::neg(self.convert(value, &operand_ty, &ty)))
                    }
                    UnaryOp::BitNot => {
                        let value = self.encode_expression(operand)?;
                        Ok(Formula::bv_not(self.convert(value, &operand_ty, &ty)))
                    }
                    UnaryOp::LogicalNot => {
                        let cond = Formula::not(self.encode_condition(operand)?);
                        Ok(self.convert(cond, &ty, &ty))
                    }
                }
            }
            ExprKind::Binary { op, .. } if op.is_relational() => {
                let cond = self.encode_condition(e)?;
                Ok(self.convert(cond, &ty, &ty))
            }
            ExprKind::Binary { op, lhs, rhs } => self.encode_arithmetic(*op, lhs, rhs, &ty),
            ExprKind::Cast(inner) => {
                if let Some(pointee) = ty.pointee() {
                    let pointee = self.ctx.layout().resolve(&pointee);
                    self.reveal(inner, &pointee)?;
                }
                let inner_ty = self.canonical(&inner.ty);
                let value = self.encode_expression(inner)?;
                Ok(self.convert(value, &inner_ty, &ty))
            }
            ExprKind::AddressOf(inner) => self.encode_address(inner),
            ExprKind::Deref(_) | ExprKind::Field { .. } | ExprKind::Subscript { .. } => {
                let location = self.encode_location(e, Access::Read)?;
                self.read_location(location, &ty)
            }
            ExprKind::SizeOf(target) => {
                let target = self.canonical(target);
                Ok(Formula::bv(self.ctx.size_of(&target) as i128, width))
            }
        }
    }

    fn read_variable(&mut self, name: &str, ty: &CanonicalType) -> Result<Formula> {
        if ty.is_function() || ty.is_array() {
            return Ok(self.ctx.base_address(name));
        }
        if self.pts.is_actual_base(name) {
            return self.read_location(Location::Memory(self.ctx.base_address(name)), ty);
        }
        if self.ctx.layout().composite(ty).is_some() {
            return Err(self.unrecognized(format!("struct value '{}' used as a scalar", name)));
        }
        Ok(Formula::ssa_var(
            name,
            self.ssa.get_index(name),
            self.ctx.value_sort(ty),
        ))
    }

    /// Value of the object at `location`; aggregates evaluate to their address
    pub(crate) fn read_location(&mut self, location: Location, ty: &CanonicalType) -> Result<Formula> {
        let ctx = self.ctx;
        let layout = ctx.layout();
        match location {
            Location::Pure(name) => {
                if layout.composite(ty).is_some() {
                    return Err(self.unrecognized(format!("struct value '{}' used as a scalar", name)));
                }
                let index = self.ssa.get_index(&name);
                Ok(Formula::ssa_var(name, index, self.ctx.value_sort(ty)))
            }
            Location::Memory(address) => {
                if ty.is_array() || ty.is_function() || layout.composite(ty).is_some() {
                    return Ok(address);
                }
                let name = ty.uf_name();
                let index = self.ssa.get_index(&name);
                Ok(Formula::uf(name, index, self.ctx.value_sort(ty), vec![address]))
            }
        }
    }

    fn encode_arithmetic(
        &mut self,
        op: BinaryOp,
        lhs: &CExpression,
        rhs: &CExpression,
        ty: &CanonicalType,
    ) -> Result<Formula> {
        let lhs_ty = self.canonical(&lhs.ty);
        let rhs_ty = self.canonical(&rhs.ty);
        let lhs_pointer = lhs_ty.is_pointer() || lhs_ty.is_array();
        let rhs_pointer = rhs_ty.is_pointer() || rhs_ty.is_array();

        match (op, lhs_pointer, rhs_pointer) {
            (BinaryOp::Add | BinaryOp::Sub, true, false) => {
                let pointer = self.encode_expression(lhs)?;
                let index = self.index_value(rhs)?;
                let step = Formula::mul(index, self.ctx.offset(self.stride(&lhs_ty)));
                Ok(match op {
                    BinaryOp::Add => Formula::add(pointer, step),
                    _ => Formula::sub(pointer, step),
                })
            }
            (BinaryOp::Add, false, true) => {
                let index = self.index_value(lhs)?;
                let pointer = self.encode_expression(rhs)?;
                let step = Formula::mul(index, self.ctx.offset(self.stride(&rhs_ty)));
                Ok(Formula::add(pointer, step))
            }
            (BinaryOp::Sub, true, true) => {
                let a = self.encode_expression(lhs)?;
                let b = self.encode_expression(rhs)?;
                let distance = Formula::bv_op(
                    BvOp::SDiv,
                    Formula::sub(a, b),
                    self.ctx.offset(self.stride(&lhs_ty)),
                );
                Ok(Formula::cast(distance, self.width(ty), true))
            }
            _ => {
                let a = self.encode_expression(lhs)?;
                let a = self.convert(a, &lhs_ty, ty);
                let b = self.encode_expression(rhs)?;
                let b = self.convert(b, &rhs_ty, ty);
                let signed = !ty.is_unsigned();
                let op = match op {
                    BinaryOp::Add => BvOp::Add,
                    BinaryOp::Sub => BvOp::Sub,
                    BinaryOp::Mul => BvOp::Mul,
                    BinaryOp::Div if signed => BvOp::SDiv,
                    BinaryOp::Div => BvOp::UDiv,
                    BinaryOp::Rem if signed => BvOp::SRem,
                    BinaryOp::Rem => BvOp::URem,
                    BinaryOp::BitAnd => BvOp::And,
                    BinaryOp::BitOr => BvOp::Or,
                    BinaryOp::BitXor => BvOp::Xor,
                    BinaryOp::Shl => BvOp::Shl,
                    BinaryOp::Shr if signed => BvOp::AShr,
                    BinaryOp::Shr => BvOp::LShr,
                    other => {
                        return Err(self.unrecognized(format!("operator {:?} is not arithmetic", other)))
                    }
                };
                Ok(Formula::bv_op(op, a, b))
            }
        }
    }

    /// Truth value of a controlling expression
    pub fn encode_condition(&mut self, e: &CExpression) -> Result<Formula> {
        match &e.kind {
            ExprKind::Binary { op, lhs, rhs } if op.is_relational() => match op {
                BinaryOp::LogicalAnd => Ok(Formula::and2(
                    self.encode_condition(lhs)?,
                    self.encode_condition(rhs)?,
                )),
                BinaryOp::LogicalOr => Ok(Formula::or2(
                    self.encode_condition(lhs)?,
                    self.encode_condition(rhs)?,
                )),
                _ => self.encode_comparison(*op, lhs, rhs),
            },
            ExprKind::Unary {
                op: UnaryOp::LogicalNot,
                operand,
            } => Ok(Formula::not(self.encode_condition(operand)?)),
            _ => {
                let value = self.encode_expression(e)?;
                let zero = Formula::bv(0, value.width());
                Ok(Formula::not(Formula::eq(value, zero)))
            }
        }
    }

    fn encode_comparison(&mut self, op: BinaryOp, lhs: &CExpression, rhs: &CExpression) -> Result<Formula> {
        let lhs_ty = self.canonical(&lhs.ty);
        let rhs_ty = self.canonical(&rhs.ty);
        let a = self.encode_expression(lhs)?;
        let b = self.encode_expression(rhs)?;
        let width = a.width().max(b.width());
        let a = Formula::cast(a, width, !lhs_ty.is_unsigned());
        let b = Formula::cast(b, width, !rhs_ty.is_unsigned());
        let signed = !(lhs_ty.is_unsigned() || rhs_ty.is_unsigned());
        Ok(match op {
            BinaryOp::Eq => Formula::eq(a, b),
            BinaryOp::Ne => Formula::not(Formula::eq(a, b)),
            BinaryOp::Lt => Formula::lt(a, b, signed),
            BinaryOp::Le => Formula::le(a, b, signed),
            BinaryOp::Gt => Formula::gt(a, b, signed),
            BinaryOp::Ge => Formula::ge(a, b, signed),
            other => return Err(self.unrecognized(format!("operator {:?} is not a comparison", other))),
        })
    }

    /// Address of an lvalue, for `&e`
    fn encode_address(&mut self, e: &CExpression) -> Result<Formula> {
        if let ExprKind::Deref(pointer) = &e.kind {
            return self.encode_expression(pointer);
        }
        match self.encode_location(e, Access::Read)? {
            Location::Memory(address) => Ok(address),
            Location::Pure(name) => Err(self.unrecognized(format!(
                "address of '{}', which is not known to be addressed",
                name
            ))),
        }
    }

    pub(crate) fn encode_location(&mut self, e: &CExpression, access: Access) -> Result<Location> {
        let ctx = self.ctx;
        let layout = ctx.layout();
        match &e.kind {
            ExprKind::Id(name) => {
                let ty = self.canonical(&e.ty);
                if self.pts.is_actual_base(name) || ty.is_function() {
                    Ok(Location::Memory(self.ctx.base_address(name)))
                } else {
                    Ok(Location::Pure(name.clone()))
                }
            }
            ExprKind::Deref(pointer) => {
                let target = self.canonical(&e.ty);
                self.reveal(pointer, &target)?;
                Ok(Location::Memory(self.encode_expression(pointer)?))
            }
            ExprKind::Field { owner, field, arrow } => {
                let (location, owner_ty) = if *arrow {
                    let pointer_ty = self.canonical(&owner.ty);
                    let Some(owner_ty) = pointer_ty.pointee().map(|t| layout.resolve(&t)) else {
                        return Err(self.unrecognized(format!("'->{}' applied to a non-pointer", field)));
                    };
                    self.reveal(owner, &owner_ty)?;
                    (Location::Memory(self.encode_expression(owner)?), owner_ty)
                } else {
                    (self.encode_location(owner, access)?, self.canonical(&owner.ty))
                };
                match location {
                    Location::Pure(name) => Ok(Location::Pure(format!("{}${}", name, field))),
                    Location::Memory(address) => {
                        let Some(offset) = layout.offset_of(&owner_ty, field) else {
                            return Err(self.unrecognized(format!("no member '{}' in {}", field, owner_ty)));
                        };
                        self.track_field(&owner_ty, field, access);
                        Ok(Location::Memory(Formula::add(address, self.ctx.offset(offset))))
                    }
                }
            }
            ExprKind::Subscript { array, index } => {
                let array_ty = self.canonical(&array.ty);
                let (start, element) = match array_ty.array_element() {
                    Some((element, _)) => match self.encode_location(array, access)? {
                        Location::Memory(address) => (address, element),
                        Location::Pure(name) => {
                            return Err(self.unrecognized(format!("array '{}' is not in memory", name)))
                        }
                    },
                    None => {
                        let Some(element) = array_ty.pointee() else {
                            return Err(self.unrecognized("subscript of a non-pointer"));
                        };
                        let element = layout.resolve(&element);
                        self.reveal(array, &element)?;
                        (self.encode_expression(array)?, element)
                    }
                };
                let element = layout.resolve(&element);
                let index = self.index_value(index)?;
                let step = Formula::mul(index, self.ctx.offset(layout.size_of(&element).max(1)));
                Ok(Location::Memory(Formula::add(start, step)))
            }
            ExprKind::Cast(inner) => self.encode_location(inner, access),
            _ => Err(self.unrecognized("expression is not an lvalue")),
        }
    }

    /// Track `composite.field`; a read that generates no target leaves the
    /// tracked set as it was
    fn track_field(&mut self, composite: &CanonicalType, field: &str, access: Access) {
        let newly = !self.pts.tracks_field(composite, field);
        let essential = self.pts.add_field(composite, field);
        if access == Access::Read && newly && !essential {
            self.pts.shallow_remove_field(composite, field);
        }
    }

    /// Right-hand side of an assignment with its type
    ///
    /// Structs and unions are copied from their location; arrays decay to a
    /// pointer to their first element.
    pub(crate) fn encode_rvalue(&mut self, e: &CExpression) -> Result<TypedRvalue> {
        let ty = self.canonical(&e.ty);
        if self.ctx.layout().composite(&ty).is_some() {
            let value = match self.encode_location(e, Access::Read)? {
                Location::Pure(name) => Rvalue::Variable(name),
                Location::Memory(address) => Rvalue::Address(address),
            };
            return Ok(TypedRvalue::new(ty, value));
        }
        let value = self.encode_expression(e)?;
        let ty = match ty.array_element() {
            Some((element, _)) => element.pointer_to(),
            None => ty,
        };
        Ok(TypedRvalue::new(ty, Rvalue::Value(value)))
    }

    /// Non-negative compile-time value of an integer expression
    pub(crate) fn constant_value(&self, e: &CExpression) -> Option<u64> {
        match &e.kind {
            ExprKind::IntLiteral(value) => u64::try_from(*value).ok(),
            ExprKind::SizeOf(ty) => Some(self.ctx.size_of(&self.canonical(ty))),
            ExprKind::Cast(inner) => self.constant_value(inner),
            ExprKind::Binary { op, lhs, rhs } => {
                let (a, b) = (self.constant_value(lhs)?, self.constant_value(rhs)?);
                match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
