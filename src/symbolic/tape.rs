//! Compiled evaluation tape
//!
//! Flattens a set of expression roots into a topologically ordered
//! instruction list with shared nodes emitted once. A forward sweep
//! evaluates every node; a reverse sweep accumulates exact gradients
//! (a vector-Jacobian product seeded per output), which is what the
//! packaged solver consumes instead of finite differences.

use std::collections::HashMap;

use super::expr::{BinaryOp, Expr, ExprNode, UnaryOp};

#[derive(Debug, Clone, Copy)]
enum TapeOp {
    Const(f64),
    Var(usize),
    Unary(UnaryOp, usize),
    Binary(BinaryOp, usize, usize),
}

/// Instruction tape over a set of expression roots
#[derive(Debug)]
pub struct Tape {
    ops: Vec<TapeOp>,
    outputs: Vec<usize>,
    num_variables: usize,
}

impl Tape {
    /// Compiles the given roots. Shared sub-expressions across roots are
    /// emitted once.
    pub fn compile(roots: &[Expr], num_variables: usize) -> Self {
        let mut tape = Tape {
            ops: Vec::new(),
            outputs: Vec::with_capacity(roots.len()),
            num_variables,
        };
        let mut interned: HashMap<usize, usize> = HashMap::new();
        for root in roots {
            let idx = tape.lower(root, &mut interned);
            tape.outputs.push(idx);
        }
        tape
    }

    fn lower(&mut self, expr: &Expr, interned: &mut HashMap<usize, usize>) -> usize {
        if let Some(&idx) = interned.get(&expr.key()) {
            return idx;
        }
        let op = match expr.node() {
            ExprNode::Const(v) => TapeOp::Const(*v),
            ExprNode::Var { index, .. } => TapeOp::Var(*index),
            ExprNode::Unary { op, arg } => {
                let a = self.lower(arg, interned);
                TapeOp::Unary(*op, a)
            }
            ExprNode::Binary { op, lhs, rhs } => {
                let a = self.lower(lhs, interned);
                let b = self.lower(rhs, interned);
                TapeOp::Binary(*op, a, b)
            }
        };
        let idx = self.ops.len();
        self.ops.push(op);
        interned.insert(expr.key(), idx);
        idx
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Number of tape instructions
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Evaluates every node at the given decision vector. The returned
    /// buffer is indexed per instruction and is reused by [`Tape::backward`].
    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        let mut values = vec![0.0; self.ops.len()];
        for (i, op) in self.ops.iter().enumerate() {
            values[i] = match *op {
                TapeOp::Const(v) => v,
                TapeOp::Var(j) => x[j],
                TapeOp::Unary(op, a) => {
                    let va = values[a];
                    match op {
                        UnaryOp::Neg => -va,
                        UnaryOp::Sin => va.sin(),
                        UnaryOp::Cos => va.cos(),
                    }
                }
                TapeOp::Binary(op, a, b) => {
                    let va = values[a];
                    let vb = values[b];
                    match op {
                        BinaryOp::Add => va + vb,
                        BinaryOp::Sub => va - vb,
                        BinaryOp::Mul => va * vb,
                        BinaryOp::Div => va / vb,
                    }
                }
            };
        }
        values
    }

    /// Extracts the output (root) values from a forward-pass buffer
    pub fn outputs_from(&self, values: &[f64]) -> Vec<f64> {
        self.outputs.iter().map(|&idx| values[idx]).collect()
    }

    /// Reverse sweep: given the forward-pass buffer and one adjoint seed per
    /// output, accumulates the gradient of `sum_i seeds[i] * output_i` with
    /// respect to the decision variables.
    pub fn backward(&self, values: &[f64], seeds: &[f64]) -> Vec<f64> {
        let mut adjoint = vec![0.0; self.ops.len()];
        for (o, &idx) in self.outputs.iter().enumerate() {
            adjoint[idx] += seeds[o];
        }

        let mut grad = vec![0.0; self.num_variables];
        for i in (0..self.ops.len()).rev() {
            let w = adjoint[i];
            if w == 0.0 {
                continue;
            }
            match self.ops[i] {
                TapeOp::Const(_) => {}
                TapeOp::Var(j) => grad[j] += w,
                TapeOp::Unary(op, a) => match op {
                    UnaryOp::Neg => adjoint[a] -= w,
                    UnaryOp::Sin => adjoint[a] += w * values[a].cos(),
                    UnaryOp::Cos => adjoint[a] -= w * values[a].sin(),
                },
                TapeOp::Binary(op, a, b) => match op {
                    BinaryOp::Add => {
                        adjoint[a] += w;
                        adjoint[b] += w;
                    }
                    BinaryOp::Sub => {
                        adjoint[a] += w;
                        adjoint[b] -= w;
                    }
                    BinaryOp::Mul => {
                        adjoint[a] += w * values[b];
                        adjoint[b] += w * values[a];
                    }
                    BinaryOp::Div => {
                        adjoint[a] += w / values[b];
                        adjoint[b] -= w * values[a] / (values[b] * values[b]);
                    }
                },
            }
        }
        grad
    }
}
