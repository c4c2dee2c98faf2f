//! Symbolic expression layer: explicit expression DAG plus a compiled
//! evaluation/differentiation tape

pub mod expr;
pub mod tape;

pub use expr::{BinaryOp, Expr, ExprNode, UnaryOp};
pub use tape::Tape;
