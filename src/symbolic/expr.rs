//! Symbolic expression graph
//!
//! Decision variables and constraints are built as an explicit expression
//! DAG (constants, variable leaves, unary and binary operations) with
//! `std::ops` overloads for arithmetic. Shared sub-expressions are cheap
//! `Rc` clones, which keeps the nested forward-Euler rollouts of the
//! formulation compact.

use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Sin,
    Cos,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Expression node variants
#[derive(Debug)]
pub enum ExprNode {
    /// Numeric constant
    Const(f64),
    /// Decision variable leaf; `index` is the position in the flattened
    /// decision vector
    Var { index: usize, name: String },
    /// Unary operation
    Unary { op: UnaryOp, arg: Expr },
    /// Binary operation
    Binary { op: BinaryOp, lhs: Expr, rhs: Expr },
}

/// Shared handle to an expression node
#[derive(Debug, Clone)]
pub struct Expr(Rc<ExprNode>);

impl Expr {
    pub fn constant(value: f64) -> Self {
        Expr(Rc::new(ExprNode::Const(value)))
    }

    /// Creates a variable leaf. The index must match the variable's position
    /// in the decision vector handed to the solver.
    pub fn variable(index: usize, name: impl Into<String>) -> Self {
        Expr(Rc::new(ExprNode::Var { index, name: name.into() }))
    }

    fn unary(op: UnaryOp, arg: Expr) -> Self {
        Expr(Rc::new(ExprNode::Unary { op, arg }))
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr(Rc::new(ExprNode::Binary { op, lhs, rhs }))
    }

    pub fn sin(&self) -> Expr {
        Expr::unary(UnaryOp::Sin, self.clone())
    }

    pub fn cos(&self) -> Expr {
        Expr::unary(UnaryOp::Cos, self.clone())
    }

    pub fn squared(&self) -> Expr {
        Expr::binary(BinaryOp::Mul, self.clone(), self.clone())
    }

    pub fn node(&self) -> &ExprNode {
        &self.0
    }

    /// Stable identity of the underlying node, used for DAG interning
    pub(crate) fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Variable name if this expression is a bare variable leaf
    pub fn var_name(&self) -> Option<&str> {
        match self.node() {
            ExprNode::Var { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Variable index if this expression is a bare variable leaf
    pub fn var_index(&self) -> Option<usize> {
        match self.node() {
            ExprNode::Var { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Evaluates the expression tree at the given decision vector.
    ///
    /// This walks the tree recursively and re-visits shared nodes; it is
    /// meant for spot checks and tests. Repeated evaluation should go
    /// through a compiled [`Tape`](super::Tape).
    pub fn eval(&self, x: &[f64]) -> f64 {
        match self.node() {
            ExprNode::Const(v) => *v,
            ExprNode::Var { index, .. } => x[*index],
            ExprNode::Unary { op, arg } => {
                let v = arg.eval(x);
                match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Sin => v.sin(),
                    UnaryOp::Cos => v.cos(),
                }
            }
            ExprNode::Binary { op, lhs, rhs } => {
                let a = lhs.eval(x);
                let b = rhs.eval(x);
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                }
            }
        }
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }

        impl $trait<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                Expr::binary($op, self, Expr::constant(rhs))
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, Expr::constant(self), rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(Div, div, BinaryOp::Div);

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}
