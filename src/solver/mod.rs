//! NLP solver interface
//!
//! The formulation layer assembles an [`NlpProblem`] and hands it to any
//! [`NlpSolver`] implementation together with an initial guess. Solvers
//! report non-convergence through [`SolverStats::success`], never as an
//! error; deciding what to do with a failed solve is the caller's job.

pub mod augmented_lagrangian;

pub use augmented_lagrangian::{AugmentedLagrangianConfig, AugmentedLagrangianSolver};

use nalgebra::DVector;

use crate::common::error::PlannerResult;
use crate::symbolic::Expr;

/// Assembled nonlinear program
#[derive(Debug)]
pub struct NlpProblem {
    /// Length of the flattened decision vector
    pub num_variables: usize,
    /// Scalar objective expression
    pub objective: Expr,
    /// Constraint expressions, index-aligned with the bound vectors
    pub constraints: Vec<Expr>,
    /// Lower bounds (`-inf` for unbounded rows)
    pub lower: DVector<f64>,
    /// Upper bounds (`+inf` for unbounded rows)
    pub upper: DVector<f64>,
}

/// Solver diagnostics
#[derive(Debug, Clone, Copy)]
pub struct SolverStats {
    /// Whether the final iterate satisfies the constraints to tolerance
    pub success: bool,
    /// Total inner iterations spent
    pub iterations: usize,
    /// Wall-clock solve time [s]
    pub solve_time: f64,
    /// Largest bound violation at the final iterate
    pub constraint_violation: f64,
}

/// Numeric result of one solve
#[derive(Debug, Clone)]
pub struct NlpSolution {
    /// Decision-variable assignment
    pub x: DVector<f64>,
    /// Constraint-expression values at `x`, aligned with the registry order
    pub g: DVector<f64>,
    /// Objective value at `x`
    pub objective: f64,
    /// Diagnostics
    pub stats: SolverStats,
}

/// Black-box NLP solver
pub trait NlpSolver {
    fn solve(&self, problem: &NlpProblem, initial_guess: &DVector<f64>)
        -> PlannerResult<NlpSolution>;
}
