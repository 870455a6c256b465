//! Typed C expressions
//!
//! Every node carries the C type the front end assigned to it. Identifiers are
//! already qualified (`main::x`) by the front end.

use super::ctype::CType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Minus,
    BitNot,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    /// Whether the result is a truth value rather than a number
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Self::Lt
                | Self::Le
                | Self::Gt
                | Self::Ge
                | Self::Eq
                | Self::Ne
                | Self::LogicalAnd
                | Self::LogicalOr
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    IntLiteral(i128),
    Id(String),
    Unary {
        op: UnaryOp,
        operand: Box<CExpression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<CExpression>,
        rhs: Box<CExpression>,
    },
    /// Conversion of the operand to the node type
    Cast(Box<CExpression>),
    AddressOf(Box<CExpression>),
    Deref(Box<CExpression>),
    Field {
        owner: Box<CExpression>,
        field: String,
        arrow: bool,
    },
    Subscript {
        array: Box<CExpression>,
        index: Box<CExpression>,
    },
    SizeOf(CType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CExpression {
    pub kind: ExprKind,
    pub ty: CType,
}

impl CExpression {
    #[inline]
    pub fn new(kind: ExprKind, ty: CType) -> Self {
        Self { kind, ty }
    }

    pub fn int(value: i128) -> Self {
        Self::new(ExprKind::IntLiteral(value), CType::int())
    }

    pub fn literal(value: i128, ty: CType) -> Self {
        Self::new(ExprKind::IntLiteral(value), ty)
    }

    pub fn id(name: impl Into<String>, ty: CType) -> Self {
        Self::new(ExprKind::Id(name.into()), ty)
    }

    pub fn unary(op: UnaryOp, operand: CExpression, ty: CType) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn binary(op: BinaryOp, lhs: CExpression, rhs: CExpression, ty: CType) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn cast(operand: CExpression, ty: CType) -> Self {
        Self::new(ExprKind::Cast(Box::new(operand)), ty)
    }

    pub fn address_of(operand: CExpression) -> Self {
        let ty = CType::pointer_to(operand.ty.clone());
        Self::new(ExprKind::AddressOf(Box::new(operand)), ty)
    }

    pub fn deref(operand: CExpression, ty: CType) -> Self {
        Self::new(ExprKind::Deref(Box::new(operand)), ty)
    }

    pub fn field(owner: CExpression, field: impl Into<String>, ty: CType) -> Self {
        Self::new(
            ExprKind::Field {
                owner: Box::new(owner),
                field: field.into(),
                arrow: false,
            },
            ty,
        )
    }

    pub fn arrow(owner: CExpression, field: impl Into<String>, ty: CType) -> Self {
        Self::new(
            ExprKind::Field {
                owner: Box::new(owner),
                field: field.into(),
                arrow: true,
            },
            ty,
        )
    }

    pub fn subscript(array: CExpression, index: CExpression, ty: CType) -> Self {
        Self::new(
            ExprKind::Subscript {
                array: Box::new(array),
                index: Box::new(index),
            },
            ty,
        )
    }

    pub fn size_of(ty: CType) -> Self {
        Self::new(ExprKind::SizeOf(ty), CType::unsigned_long())
    }

    /// Constant value of integer literals, `sizeof` excluded
    pub fn as_int_literal(&self) -> Option<i128> {
        match &self.kind {
            ExprKind::IntLiteral(v) => Some(*v),
            ExprKind::Cast(inner) => inner.as_int_literal(),
            _ => None,
        }
    }
}

/// Declaration initializer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initializer {
    Expression(CExpression),
    List(Vec<Initializer>),
}
