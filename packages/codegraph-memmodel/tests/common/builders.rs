//! Edge and expression builders

use codegraph_memmodel::shared::models::{
    CDeclaration, CExpression, CStatement, CType, CfaEdge, EdgeKind, FunctionCall, Initializer, Member,
};
use codegraph_memmodel::{CanonicalType, EncoderContext, Formula, PathFormula, PathFormulaManager, Sort, Term};

pub const FUNCTION: &str = "main";

pub fn int() -> CType {
    CType::int()
}

pub fn int_ptr() -> CType {
    CType::pointer_to(CType::int())
}

pub fn void_ptr() -> CType {
    CType::pointer_to(CType::void())
}

/// `struct pair { int a; int b; }`
pub fn pair() -> CType {
    CType::struct_type(
        "pair",
        vec![Member::new("a", CType::int()), Member::new("b", CType::int())],
    )
}

/// Resolved canonical form of `ty`, with its definitions registered
pub fn canonical(ctx: &EncoderContext, ty: &CType) -> CanonicalType {
    ctx.layout().register(ty);
    ctx.layout().resolve(&CanonicalType::of(ty))
}

pub fn local(name: &str) -> String {
    format!("{}::{}", FUNCTION, name)
}

pub fn var(name: &str, ty: CType) -> CExpression {
    CExpression::id(local(name), ty)
}

pub fn int_var(name: &str) -> CExpression {
    var(name, int())
}

pub fn assign(lhs: CExpression, rhs: CExpression) -> CfaEdge {
    CfaEdge::new(FUNCTION, EdgeKind::Statement(CStatement::Assignment { lhs, rhs }))
}

pub fn declare(name: &str, ty: CType, init: Option<CExpression>) -> CfaEdge {
    declare_with(name, ty, init.map(Initializer::Expression))
}

/// `ty name = { items... }`
pub fn declare_list(name: &str, ty: CType, items: Vec<CExpression>) -> CfaEdge {
    let items = items.into_iter().map(Initializer::Expression).collect();
    declare_with(name, ty, Some(Initializer::List(items)))
}

fn declare_with(name: &str, ty: CType, initializer: Option<Initializer>) -> CfaEdge {
    CfaEdge::new(
        FUNCTION,
        EdgeKind::Declaration(CDeclaration::Variable {
            name: local(name),
            ty,
            initializer,
            is_global: false,
        }),
    )
}

pub fn call_assign(lhs: CExpression, function: &str, arguments: Vec<CExpression>) -> CfaEdge {
    let call = FunctionCall::new(function, arguments, void_ptr());
    CfaEdge::new(FUNCTION, EdgeKind::Statement(CStatement::CallAssignment { lhs, call }))
}

pub fn assume(expression: CExpression, truth: bool) -> CfaEdge {
    CfaEdge::new(FUNCTION, EdgeKind::Assume { expression, truth })
}

/// Fold `edges` onto `start`, failing the test on the first encoding error
pub fn run(manager: &PathFormulaManager<'_>, start: &PathFormula, edges: &[CfaEdge]) -> PathFormula {
    edges.iter().fold(start.clone(), |pf, edge| {
        manager
            .make_and(&pf, edge)
            .unwrap_or_else(|e| panic!("encoding {} failed: {}", edge.label(), e))
    })
}

/// The two branches of the disjunction a join produced
pub fn join_branches(pf: &PathFormula) -> Vec<Formula> {
    pf.formula()
        .conjuncts()
        .into_iter()
        .find_map(|c| match c.term() {
            Term::Or(items) => Some(items.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no disjunction in {}", pf.formula()))
}

pub fn ssa_int(name: &str, index: u32) -> Formula {
    Formula::ssa_var(local(name), index, Sort::BitVec(32))
}
