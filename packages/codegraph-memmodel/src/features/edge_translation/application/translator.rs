//! Edge formula translation
//!
//! ```text
//! PathFormula ──translate_edge(edge)──▶ PathFormula'
//!   formula' = formula ∧ edge formula ∧ side constraints
//!   ssa'     = ssa + writes of the edge
//!   pts'     = pts + bases / fields / pools introduced by the edge
//! ```

use crate::context::EncoderContext;
use crate::errors::{EncodingError, Result};
use crate::features::assignment::{Lvalue, Rvalue, TypedRvalue};
use crate::features::edge_translation::infrastructure::{Access, EdgeState, Location};
use crate::features::formula::Formula;
use crate::features::path_formula::PathFormula;
use crate::features::pointer_target::PointerTargetPattern;
use crate::features::type_layout::TypeShape;
use crate::shared::models::{
    CDeclaration, CExpression, CStatement, CanonicalType, CfaEdge, EdgeKind, FunctionCall,
    Initializer, Parameter,
};
use tracing::trace;

pub struct EdgeFormulaTranslator<'a> {
    ctx: &'a EncoderContext,
}

impl<'a> EdgeFormulaTranslator<'a> {
    pub fn new(ctx: &'a EncoderContext) -> Self {
        Self { ctx }
    }

    #[inline]
    pub fn context(&self) -> &'a EncoderContext {
        self.ctx
    }

    /// Extend `prior` by one edge taken inside `function`
    ///
    /// Blank edges return `prior` unchanged. The formula of any other edge is
    /// conjoined with the side constraints it produced.
    pub fn translate_edge(&self, edge: &CfaEdge, function: &str, prior: &PathFormula) -> Result<PathFormula> {
        if matches!(edge.kind, EdgeKind::Blank) {
            return Ok(prior.clone());
        }
        trace!(edge = %edge.label(), function, "translating edge");
        let mut state = EdgeState::new(self.ctx, function, edge.label(), prior.ssa(), prior.pts());
        let formula = state.encode_edge(&edge.kind)?;
        let (ssa, pts, constraints) = state.finish();
        let edge_formula = Formula::and2(formula, constraints.into_formula());
        Ok(PathFormula::new(
            Formula::and2(prior.formula().clone(), edge_formula),
            ssa,
            pts,
            prior.length() + 1,
        ))
    }

    /// [`Self::translate_edge`] inside the edge's own function
    pub fn make_and(&self, prior: &PathFormula, edge: &CfaEdge) -> Result<PathFormula> {
        self.translate_edge(edge, edge.function(), prior)
    }
}

impl<'a> EdgeState<'a> {
    pub(crate) fn encode_edge(&mut self, kind: &EdgeKind) -> Result<Formula> {
        match kind {
            EdgeKind::Blank => Ok(Formula::tt()),
            EdgeKind::Statement(statement) => self.encode_statement(statement),
            EdgeKind::Declaration(declaration) => self.encode_declaration(declaration),
            EdgeKind::Assume { expression, truth } => {
                let condition = self.encode_condition(expression)?;
                Ok(if *truth {
                    condition
                } else {
                    Formula::not(condition)
                })
            }
            EdgeKind::Return {
                expression,
                return_type,
            } => match expression {
                Some(expression) => {
                    let rhs = self.encode_rvalue(expression)?;
                    let return_ty = self.canonical(return_type);
                    let retval = Self::return_variable(&self.function);
                    self.assign(&return_ty, &rhs.ty, Lvalue::Variable(retval), rhs.value, None)
                }
                None => Ok(Formula::tt()),
            },
            EdgeKind::FunctionCall {
                callee,
                arguments,
                parameters,
            } => self.encode_call(callee, arguments, parameters),
            EdgeKind::FunctionReturn {
                callee,
                lhs,
                return_type,
            } => match lhs {
                Some(lhs) => {
                    let lhs_ty = self.canonical(&lhs.ty);
                    let return_ty = self.canonical(return_type);
                    let retval = Self::return_variable(callee);
                    if let Some(pointer) = self.pure_variable(lhs) {
                        self.release_pointer(pointer)?;
                    }
                    self.assign_to(lhs, &lhs_ty, &return_ty, Rvalue::Variable(retval))
                }
                None => Ok(Formula::tt()),
            },
            EdgeKind::CallToReturn { .. } => Err(EncodingError::unrecognized_edge(self.edge.clone())),
            EdgeKind::Multi(edges) => {
                let mut parts = Vec::with_capacity(edges.len());
                for edge in edges {
                    if !matches!(edge.kind, EdgeKind::Blank) {
                        parts.push(self.encode_edge(&edge.kind)?);
                    }
                }
                Ok(Formula::and(parts))
            }
        }
    }

    /// Assign `rhs` to the lvalue expression `lhs`
    pub(crate) fn assign_to(
        &mut self,
        lhs: &CExpression,
        lhs_ty: &CanonicalType,
        rhs_ty: &CanonicalType,
        rhs: Rvalue,
    ) -> Result<Formula> {
        match self.encode_location(lhs, Access::Write)? {
            Location::Pure(name) => self.assign(lhs_ty, rhs_ty, Lvalue::Variable(name), rhs, None),
            Location::Memory(address) => {
                let pattern = self.pattern_for(lhs);
                self.assign(lhs_ty, rhs_ty, Lvalue::Address(address), rhs, Some(&pattern))
            }
        }
    }

    fn encode_statement(&mut self, statement: &CStatement) -> Result<Formula> {
        match statement {
            CStatement::Assignment { lhs, rhs } => {
                let lhs_ty = self.canonical(&lhs.ty);
                let value = self.encode_rvalue(rhs)?;
                if let Some(pointer) = self.pure_variable(lhs) {
                    if lhs_ty.is_pointer() {
                        self.alias_pointer(pointer, rhs)?;
                    }
                }
                self.assign_to(lhs, &lhs_ty, &value.ty, value.value)
            }
            CStatement::CallAssignment { lhs, call } => self.encode_call_assignment(lhs, call),
            CStatement::Call(call) => {
                if self.ctx.config().is_deallocation(&call.name) {
                    trace!(function = %call.name, "deallocation encoded as no-op");
                }
                Ok(Formula::tt())
            }
            CStatement::Expression(expression) => {
                // evaluated only for the dereferences it performs
                self.encode_expression(expression)?;
                Ok(Formula::tt())
            }
        }
    }

    /// Call of a function without a body: allocators, nondet sources and
    /// unknown externals
    fn encode_call_assignment(&mut self, lhs: &CExpression, call: &FunctionCall) -> Result<Formula> {
        if let Some(zeroing) = self.ctx.config().allocation_kind(&call.name) {
            return self.encode_allocation(lhs, call, zeroing);
        }
        if !self.ctx.config().is_nondet_function(&call.name) {
            trace!(function = %call.name, "unknown external returns a nondeterministic value");
        }
        let lhs_ty = self.canonical(&lhs.ty);
        if let Some(pointer) = self.pure_variable(lhs) {
            self.release_pointer(pointer)?;
        }
        self.assign_to(lhs, &lhs_ty, &lhs_ty, Rvalue::Nondet)
    }

    fn is_base_variable(&self, name: &str, ty: &CanonicalType) -> bool {
        ty.contains_array() || self.ctx.is_addressed(name) || self.pts.is_actual_base(name)
    }

    fn encode_declaration(&mut self, declaration: &CDeclaration) -> Result<Formula> {
        match declaration {
            CDeclaration::Variable {
                name,
                ty,
                initializer,
                is_global,
            } => {
                let ty = sized_by_initializer(self.canonical(ty), initializer.as_ref());
                let rhs = match initializer {
                    Some(initializer) => self.encode_initializer(initializer, &ty)?,
                    None if *is_global => {
                        TypedRvalue::new(CanonicalType::int(), Rvalue::Value(Formula::bv(0, 8)))
                    }
                    None => {
                        if self.is_base_variable(name, &ty) {
                            let (_, inequality) = self.pts.add_base(name, &ty);
                            self.constraints.add(inequality);
                        }
                        return Ok(Formula::tt());
                    }
                };
                if self.is_base_variable(name, &ty) {
                    let (_, inequality) = self.pts.add_base(name, &ty);
                    self.constraints.add(inequality);
                    let pattern = PointerTargetPattern::exact(name.as_str(), None, 0, 0);
                    let address = self.ctx.base_address(name);
                    self.assign(&ty, &rhs.ty, Lvalue::Address(address), rhs.value, Some(&pattern))
                } else {
                    if let Some(Initializer::Expression(source)) = initializer {
                        if ty.is_pointer() {
                            self.alias_pointer(name, source)?;
                        }
                    }
                    self.assign(&ty, &rhs.ty, Lvalue::Variable(name.clone()), rhs.value, None)
                }
            }
            CDeclaration::Function { name, ty } => {
                if self.ctx.is_addressed(name) {
                    let ty = self.canonical(ty);
                    let (_, inequality) = self.pts.add_base(name, &ty);
                    self.constraints.add(inequality);
                }
                Ok(Formula::tt())
            }
            CDeclaration::Type { ty, .. } => {
                self.ctx.layout().register(ty);
                Ok(Formula::tt())
            }
        }
    }

    fn encode_initializer(&mut self, initializer: &Initializer, ty: &CanonicalType) -> Result<TypedRvalue> {
        match initializer {
            Initializer::Expression(e) => self.encode_rvalue(e),
            Initializer::List(items) => {
                let ctx = self.ctx;
                let layout = ctx.layout();
                let item_types: Vec<CanonicalType> = match layout.shape(ty) {
                    TypeShape::Array { element, .. } => vec![layout.resolve(&element); items.len()],
                    TypeShape::Composite(composite) => {
                        composite.members.iter().map(|m| m.ty.clone()).collect()
                    }
                    TypeShape::Scalar | TypeShape::Function => vec![ty.clone(); items.len().min(1)],
                };
                if items.len() > item_types.len() {
                    return Err(EncodingError::illegal_assignment(format!(
                        "{} initializers for {}",
                        items.len(),
                        ty
                    )));
                }
                let mut values = Vec::with_capacity(items.len());
                for (item, item_ty) in items.iter().zip(&item_types) {
                    values.push(self.encode_initializer(item, item_ty)?);
                }
                Ok(TypedRvalue::new(ty.clone(), Rvalue::List(values)))
            }
        }
    }

    /// Bind the callee's parameters to the caller's arguments
    fn encode_call(
        &mut self,
        callee: &str,
        arguments: &[CExpression],
        parameters: &[Parameter],
    ) -> Result<Formula> {
        if arguments.len() < parameters.len() {
            return Err(self.unrecognized(format!(
                "{} called with {} arguments, expects {}",
                callee,
                arguments.len(),
                parameters.len()
            )));
        }
        let mut values = Vec::with_capacity(parameters.len());
        for argument in &arguments[..parameters.len()] {
            values.push(self.encode_rvalue(argument)?);
        }

        let mut parts = Vec::with_capacity(parameters.len());
        for ((parameter, argument), value) in parameters.iter().zip(arguments).zip(values) {
            let mut ty = self.canonical(&parameter.ty);
            if let Some((element, _)) = ty.array_element() {
                ty = element.pointer_to();
            }
            let name = parameter.name.as_str();
            if self.is_base_variable(name, &ty) {
                let (_, inequality) = self.pts.add_base(name, &ty);
                self.constraints.add(inequality);
                let pattern = PointerTargetPattern::exact(name, None, 0, 0);
                let address = self.ctx.base_address(name);
                parts.push(self.assign(&ty, &value.ty, Lvalue::Address(address), value.value, Some(&pattern))?);
            } else {
                if ty.is_pointer() {
                    self.alias_pointer(name, argument)?;
                }
                parts.push(self.assign(&ty, &value.ty, Lvalue::Variable(name.to_string()), value.value, None)?);
            }
        }
        Ok(Formula::and(parts))
    }
}

/// An array declared without a length takes it from its initializer list
fn sized_by_initializer(ty: CanonicalType, initializer: Option<&Initializer>) -> CanonicalType {
    match (ty.array_element(), initializer) {
        (Some((element, None)), Some(Initializer::List(items))) => element.array_of(Some(items.len() as u64)),
        _ => ty,
    }
}
