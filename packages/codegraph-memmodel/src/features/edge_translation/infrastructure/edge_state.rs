//! Per-edge encoding state
//!
//! One `EdgeState` lives for the translation of one edge (including all
//! parts of a multi-edge). It owns working copies of the SSA map and the
//! pointer-target set and collects side constraints.

use crate::context::EncoderContext;
use crate::errors::{EncodingError, Result};
use crate::features::assignment::{AssignmentEncoder, AssignmentState, Lvalue, Rvalue};
use crate::features::formula::{Constraints, Formula};
use crate::features::pointer_target::PointerTargetPattern;
use crate::features::pointer_target_set::{PointerTargetSet, PointerTargetSetBuilder};
use crate::features::ssa::{SsaMap, SsaMapBuilder};
use crate::shared::models::{CType, CanonicalType};

/// Suffix of the pure variable carrying a function's return value
pub const RETURN_VARIABLE: &str = "__retval__";

pub struct EdgeState<'a> {
    pub(crate) ctx: &'a EncoderContext,
    pub(crate) function: String,
    pub(crate) edge: String,
    pub(crate) ssa: SsaMapBuilder,
    pub(crate) pts: PointerTargetSetBuilder<'a>,
    pub(crate) constraints: Constraints,
}

impl<'a> EdgeState<'a> {
    pub fn new(
        ctx: &'a EncoderContext,
        function: impl Into<String>,
        edge: impl Into<String>,
        ssa: &SsaMap,
        pts: &PointerTargetSet,
    ) -> Self {
        Self {
            ctx,
            function: function.into(),
            edge: edge.into(),
            ssa: ssa.builder(),
            pts: pts.builder(ctx),
            constraints: Constraints::new(),
        }
    }

    pub fn finish(self) -> (SsaMap, PointerTargetSet, Constraints) {
        (self.ssa.build(), self.pts.build(), self.constraints)
    }

    pub(crate) fn unrecognized(&self, reason: impl Into<String>) -> EncodingError {
        EncodingError::unrecognized_code(reason, self.edge.clone())
    }

    /// Canonical form of a front-end type, registering its definitions
    pub(crate) fn canonical(&self, ty: &CType) -> CanonicalType {
        let layout = self.ctx.layout();
        layout.register(ty);
        layout.resolve(&CanonicalType::of(ty))
    }

    pub(crate) fn return_variable(function: &str) -> String {
        format!("{}::{}", function, RETURN_VARIABLE)
    }

    /// Run the assignment encoder against this edge's state
    pub(crate) fn assign(
        &mut self,
        lhs_ty: &CanonicalType,
        rhs_ty: &CanonicalType,
        lhs: Lvalue,
        rhs: Rvalue,
        pattern: Option<&PointerTargetPattern>,
    ) -> Result<Formula> {
        let mut state = AssignmentState {
            pts: &*self.pts,
            ssa: &mut self.ssa,
            constraints: &mut self.constraints,
        };
        AssignmentEncoder::new(self.ctx).encode_assignment(lhs_ty, rhs_ty, &lhs, &rhs, pattern, &mut state)
    }
}
