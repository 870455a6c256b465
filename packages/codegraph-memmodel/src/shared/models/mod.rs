//! Shared models of the consumed program representation

pub mod cfa_edge;
pub mod ctype;
pub mod expression;

pub use cfa_edge::{CDeclaration, CStatement, CfaEdge, CfaNode, EdgeKind, FunctionCall, Parameter};
pub use ctype::{BasicType, CType, CanonicalType, CompositeKind, CompositeType, Member, Qualifiers};
pub use expression::{BinaryOp, CExpression, ExprKind, Initializer, UnaryOp};
