//! Dynamic allocation modeling
//!
//! `p = malloc(n)` gives the memory a fresh base name `__alloc_<k>` but no
//! type: the allocation is parked in a deferred pool keyed by the pointer
//! variables holding it. The first typed use (`*(T *)p`, `p->f`, `p[i]`)
//! reveals the element type and turns every base of the pool into a real
//! base of type `T` or `T[n / sizeof(T)]`.

use super::edge_state::EdgeState;
use crate::errors::Result;
use crate::features::assignment::{Lvalue, Rvalue};
use crate::features::formula::{Formula, Sort};
use crate::features::pointer_target::PointerTargetPattern;
use crate::features::pointer_target_set::DeferredAllocationPool;
use crate::shared::models::{CExpression, CanonicalType, ExprKind, FunctionCall};
use tracing::debug;

/// Prefix of synthetic bases created for allocations
pub const ALLOCATION_PREFIX: &str = "__alloc_";

/// Innermost non-cast operand
pub(crate) fn strip_casts(e: &CExpression) -> &CExpression {
    match &e.kind {
        ExprKind::Cast(inner) => strip_casts(inner),
        _ => e,
    }
}

impl<'a> EdgeState<'a> {
    /// Pure pointer variable named by `e`, if any
    pub(crate) fn pure_variable<'e>(&self, e: &'e CExpression) -> Option<&'e str> {
        match &e.kind {
            ExprKind::Id(name) if !self.pts.is_actual_base(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Reveal the element type of the allocation `pointer` refers to
    pub(crate) fn reveal(&mut self, pointer: &CExpression, element: &CanonicalType) -> Result<()> {
        if element.is_void() {
            return Ok(());
        }
        let ExprKind::Id(name) = &strip_casts(pointer).kind else {
            return Ok(());
        };
        if !self.pts.is_deferred_allocation_pointer(name) {
            return Ok(());
        }
        let pool = self.pts.remove_deferred_allocation(name)?;
        self.materialize(&pool, element)
    }

    fn revealed_type(&self, pool: &DeferredAllocationPool, element: &CanonicalType) -> CanonicalType {
        match pool.size() {
            Some(size) => {
                let element_size = self.ctx.size_of(element).max(1);
                match size / element_size {
                    0 | 1 => element.clone(),
                    n => element.array_of(Some(n)),
                }
            }
            None => element.array_of(None),
        }
    }

    pub(crate) fn materialize(&mut self, pool: &DeferredAllocationPool, element: &CanonicalType) -> Result<()> {
        let ty = self.revealed_type(pool, element);
        debug!(
            bases = ?pool.base_variables(),
            ty = %ty,
            zeroing = pool.is_zeroing(),
            "materialized deferred allocation"
        );
        for base in pool.base_variables().iter() {
            let (_, inequality) = self.pts.add_base(base, &ty);
            self.constraints.add(inequality);
            if pool.is_zeroing() {
                let pattern = PointerTargetPattern::exact(base.as_str(), None, 0, 0);
                let zero = self.assign(
                    &ty,
                    &CanonicalType::int(),
                    Lvalue::Address(self.ctx.base_address(base)),
                    Rvalue::Value(Formula::bv(0, 8)),
                    Some(&pattern),
                )?;
                self.constraints.add(zero);
            }
        }
        Ok(())
    }

    /// Reserve address slots for pool bases that never got one
    fn reserve(&mut self, pool: &DeferredAllocationPool) {
        let size = pool
            .size()
            .unwrap_or(self.ctx.config().default_allocation_size);
        for base in pool.base_variables().iter() {
            if !self.pts.is_prepared_base(base) {
                let inequality = self.pts.prepare_base(base, size);
                self.constraints.add(inequality);
            }
        }
    }

    /// Forget that `name` holds a deferred allocation, reserving the pool's
    /// memory when `name` was its last alias
    pub(crate) fn release_pointer(&mut self, name: &str) -> Result<()> {
        let Some(pool) = self.pts.deferred_allocation(name).cloned() else {
            return Ok(());
        };
        if self.pts.remove_deferred_allocation_pointer(name)? {
            self.reserve(&pool);
        }
        Ok(())
    }

    /// Make pure pointer `target` follow the deferred allocation of `source`
    pub(crate) fn alias_pointer(&mut self, target: &str, source: &CExpression) -> Result<()> {
        let source = match &strip_casts(source).kind {
            ExprKind::Id(name) if self.pts.is_deferred_allocation_pointer(name) => name.clone(),
            _ => return self.release_pointer(target),
        };
        if source == target {
            return Ok(());
        }
        self.release_pointer(target)?;
        self.pts.add_deferred_allocation_pointer(target, &source)
    }

    fn allocation_size(&self, call: &FunctionCall, zeroing: bool) -> Option<u64> {
        match call.arguments.as_slice() {
            [count, size] if zeroing => self
                .constant_value(count)?
                .checked_mul(self.constant_value(size)?),
            [size, ..] => self.constant_value(size),
            [] => None,
        }
    }

    /// `lhs = alloc(...)`
    pub(crate) fn encode_allocation(
        &mut self,
        lhs: &CExpression,
        call: &FunctionCall,
        zeroing: bool,
    ) -> Result<Formula> {
        let id = self.ctx.next_allocation_id();
        let base = format!("{}{}", ALLOCATION_PREFIX, id);
        let size = self.allocation_size(call, zeroing);
        if let Some(size) = size {
            let inequality = self.pts.prepare_base(&base, size);
            self.constraints.add(inequality);
        }

        let lhs_ty = self.canonical(&lhs.ty);
        match self.pure_variable(lhs) {
            Some(pointer) => {
                self.release_pointer(pointer)?;
                self.pts.add_deferred_allocation(pointer, zeroing, size, &base);
            }
            None => {
                let element = lhs_ty.pointee().map(|t| self.ctx.layout().resolve(&t));
                match element {
                    Some(element) if !element.is_void() => {
                        let pool = DeferredAllocationPool::new(base.as_str(), zeroing, size, base.as_str());
                        self.materialize(&pool, &element)?;
                    }
                    _ => self.pts.add_temporary_deferred_allocation(zeroing, size, &base),
                }
            }
        }

        let address = self.ctx.base_address(&base);
        let value = if self.ctx.config().allocations_always_succeed {
            address
        } else {
            let succeeded = Formula::var(format!("{}_succeeded", base), Sort::Bool);
            Formula::ite(succeeded, address, self.ctx.offset(0))
        };
        let rhs_ty = CanonicalType::void().pointer_to();
        self.assign_to(lhs, &lhs_ty, &rhs_ty, Rvalue::Value(value))
    }
}
