//! Control-flow edges consumed by the edge translator

use super::ctype::CType;
use super::expression::{CExpression, Initializer};
use serde::{Deserialize, Serialize};

/// Control point; only its owning function matters to the encoder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CfaNode {
    pub id: u32,
    pub function: String,
}

impl CfaNode {
    pub fn new(id: u32, function: impl Into<String>) -> Self {
        Self {
            id,
            function: function.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<CExpression>,
    pub return_type: CType,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: Vec<CExpression>, return_type: CType) -> Self {
        Self {
            name: name.into(),
            arguments,
            return_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CStatement {
    Assignment {
        lhs: CExpression,
        rhs: CExpression,
    },
    CallAssignment {
        lhs: CExpression,
        call: FunctionCall,
    },
    Call(FunctionCall),
    Expression(CExpression),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CDeclaration {
    Variable {
        name: String,
        ty: CType,
        initializer: Option<Initializer>,
        is_global: bool,
    },
    Function {
        name: String,
        ty: CType,
    },
    Type {
        name: String,
        ty: CType,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Qualified parameter name inside the callee
    pub name: String,
    pub ty: CType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: CType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    Blank,
    Statement(CStatement),
    Declaration(CDeclaration),
    Assume {
        expression: CExpression,
        truth: bool,
    },
    /// Return from the predecessor's function
    Return {
        expression: Option<CExpression>,
        return_type: CType,
    },
    /// Call edge into `callee`, binding its parameters
    FunctionCall {
        callee: String,
        arguments: Vec<CExpression>,
        parameters: Vec<Parameter>,
    },
    /// Return edge back into the caller, assigning the callee result
    FunctionReturn {
        callee: String,
        lhs: Option<CExpression>,
        return_type: CType,
    },
    /// Summary edge bypassing a call
    CallToReturn {
        call: FunctionCall,
    },
    /// Straight-line sequence of edges
    Multi(Vec<CfaEdge>),
}

impl EdgeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blank => "BlankEdge",
            Self::Statement(_) => "StatementEdge",
            Self::Declaration(_) => "DeclarationEdge",
            Self::Assume { .. } => "AssumeEdge",
            Self::Return { .. } => "ReturnStatementEdge",
            Self::FunctionCall { .. } => "FunctionCallEdge",
            Self::FunctionReturn { .. } => "FunctionReturnEdge",
            Self::CallToReturn { .. } => "CallToReturnEdge",
            Self::Multi(_) => "MultiEdge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfaEdge {
    pub kind: EdgeKind,
    pub predecessor: CfaNode,
    pub successor: CfaNode,
    pub line: u32,
    pub description: String,
}

impl CfaEdge {
    /// Edge between consecutive nodes of one function
    pub fn new(function: impl Into<String>, kind: EdgeKind) -> Self {
        let function = function.into();
        Self {
            kind,
            predecessor: CfaNode::new(0, function.clone()),
            successor: CfaNode::new(1, function),
            line: 0,
            description: String::new(),
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn function(&self) -> &str {
        &self.predecessor.function
    }

    /// Short label for diagnostics
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            format!("{} at line {}", self.kind.name(), self.line)
        } else {
            format!("{} '{}' at line {}", self.kind.name(), self.description, self.line)
        }
    }
}
