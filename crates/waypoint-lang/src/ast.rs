//! Expression and statement nodes.

use smol_str::SmolStr;

use crate::ops::{BinaryOp, UnaryOp};
use crate::value::Value;

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value.
    Literal(Value),
    /// Variable reference.
    Name(SmolStr),
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        expr: Box<Expr>,
    },
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
}

/// Assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Set,
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `*=`
    Mul,
    /// `/=`
    Div,
}

impl AssignOp {
    /// The binary operator applied by an augmented assignment, if any.
    #[must_use]
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
        }
    }
}

/// Statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Plain or augmented assignment to a scope variable.
    Assign {
        /// Target variable name.
        target: SmolStr,
        /// Assignment operator.
        op: AssignOp,
        /// Right-hand side.
        value: Expr,
    },
    /// Expression evaluated for effect; the result is discarded.
    Expr(Expr),
    /// `return` with an optional value.
    Return(Option<Expr>),
    /// `pass` no-op.
    Pass,
}
