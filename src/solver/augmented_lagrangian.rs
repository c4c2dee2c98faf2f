//! Augmented-Lagrangian NLP solver
//!
//! Outer loop updates Lagrange multiplier estimates and grows the penalty
//! when feasibility stalls; the inner subproblems are minimized with
//! limited-memory BFGS (two-loop recursion) and a backtracking Armijo line
//! search. Gradients are exact, computed in one reverse sweep over the
//! compiled tape with the penalty derivatives as adjoint seeds.
//!
//! Unbounded (observation) rows contribute nothing to the merit function,
//! so bookkeeping constraints never influence the solve.

use std::collections::VecDeque;
use std::time::Instant;

use nalgebra::DVector;

use super::{NlpProblem, NlpSolution, NlpSolver, SolverStats};
use crate::common::error::PlannerResult;
use crate::symbolic::Tape;

/// Solver configuration
#[derive(Debug, Clone)]
pub struct AugmentedLagrangianConfig {
    /// Maximum multiplier/penalty update rounds
    pub max_outer_iterations: usize,
    /// Maximum L-BFGS iterations per subproblem
    pub max_inner_iterations: usize,
    /// L-BFGS history depth (limited-memory Hessian approximation)
    pub memory: usize,
    /// Initial quadratic penalty weight
    pub initial_penalty: f64,
    /// Penalty growth factor when feasibility stalls
    pub penalty_growth: f64,
    /// Penalty ceiling
    pub max_penalty: f64,
    /// Feasibility tolerance on the largest bound violation
    pub violation_tolerance: f64,
    /// Stationarity tolerance on the merit gradient norm
    pub gradient_tolerance: f64,
}

impl Default for AugmentedLagrangianConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: 30,
            max_inner_iterations: 200,
            memory: 10,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty: 1e8,
            violation_tolerance: 1e-4,
            gradient_tolerance: 1e-6,
        }
    }
}

/// Augmented-Lagrangian solver over a compiled expression tape
#[derive(Debug, Default)]
pub struct AugmentedLagrangianSolver {
    config: AugmentedLagrangianConfig,
}

/// Multiplier estimates per constraint row. Equality rows use the signed
/// multiplier; range rows keep one non-negative multiplier per active side.
struct Multipliers {
    eq: Vec<f64>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl AugmentedLagrangianSolver {
    pub fn new(config: AugmentedLagrangianConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(AugmentedLagrangianConfig::default())
    }

    /// Merit value and per-output adjoint seeds at the given forward-pass
    /// outputs. Seed 0 belongs to the objective.
    fn merit_and_seeds(
        problem: &NlpProblem,
        outputs: &[f64],
        mults: &Multipliers,
        mu: f64,
    ) -> (f64, Vec<f64>) {
        let mut merit = outputs[0];
        let mut seeds = vec![0.0; outputs.len()];
        seeds[0] = 1.0;

        for i in 0..problem.constraints.len() {
            let g = outputs[i + 1];
            let l = problem.lower[i];
            let u = problem.upper[i];

            if l == u && l.is_finite() {
                let e = g - l;
                merit += mults.eq[i] * e + 0.5 * mu * e * e;
                seeds[i + 1] += mults.eq[i] + mu * e;
                continue;
            }
            if l.is_finite() {
                let t = (mults.lower[i] + mu * (l - g)).max(0.0);
                merit += (t * t - mults.lower[i] * mults.lower[i]) / (2.0 * mu);
                if t > 0.0 {
                    seeds[i + 1] -= t;
                }
            }
            if u.is_finite() {
                let t = (mults.upper[i] + mu * (g - u)).max(0.0);
                merit += (t * t - mults.upper[i] * mults.upper[i]) / (2.0 * mu);
                if t > 0.0 {
                    seeds[i + 1] += t;
                }
            }
        }
        (merit, seeds)
    }

    fn merit_value(
        tape: &Tape,
        problem: &NlpProblem,
        x: &DVector<f64>,
        mults: &Multipliers,
        mu: f64,
    ) -> f64 {
        let values = tape.forward(x.as_slice());
        let outputs = tape.outputs_from(&values);
        Self::merit_and_seeds(problem, &outputs, mults, mu).0
    }

    fn merit_with_gradient(
        tape: &Tape,
        problem: &NlpProblem,
        x: &DVector<f64>,
        mults: &Multipliers,
        mu: f64,
    ) -> (f64, DVector<f64>) {
        let values = tape.forward(x.as_slice());
        let outputs = tape.outputs_from(&values);
        let (merit, seeds) = Self::merit_and_seeds(problem, &outputs, mults, mu);
        let grad = tape.backward(&values, &seeds);
        (merit, DVector::from_vec(grad))
    }

    /// Two-loop L-BFGS recursion; returns a descent direction
    fn lbfgs_direction(
        grad: &DVector<f64>,
        s_hist: &VecDeque<DVector<f64>>,
        y_hist: &VecDeque<DVector<f64>>,
    ) -> DVector<f64> {
        let k = s_hist.len();
        let mut q = grad.clone();
        let mut alphas = vec![0.0; k];
        let mut rhos = vec![0.0; k];

        for i in (0..k).rev() {
            rhos[i] = 1.0 / y_hist[i].dot(&s_hist[i]);
            alphas[i] = rhos[i] * s_hist[i].dot(&q);
            q.axpy(-alphas[i], &y_hist[i], 1.0);
        }

        let gamma = if k > 0 {
            s_hist[k - 1].dot(&y_hist[k - 1]) / y_hist[k - 1].norm_squared()
        } else {
            1.0
        };
        let mut r = q;
        r *= gamma;

        for i in 0..k {
            let beta = rhos[i] * y_hist[i].dot(&r);
            r.axpy(alphas[i] - beta, &s_hist[i], 1.0);
        }
        -r
    }

    /// Minimizes the current augmented Lagrangian; returns iterations spent
    fn minimize_subproblem(
        &self,
        tape: &Tape,
        problem: &NlpProblem,
        x: &mut DVector<f64>,
        mults: &Multipliers,
        mu: f64,
    ) -> usize {
        let mut s_hist: VecDeque<DVector<f64>> = VecDeque::new();
        let mut y_hist: VecDeque<DVector<f64>> = VecDeque::new();
        let (mut value, mut grad) = Self::merit_with_gradient(tape, problem, x, mults, mu);
        let mut iterations = 0;

        for _ in 0..self.config.max_inner_iterations {
            if grad.norm() <= self.config.gradient_tolerance {
                break;
            }
            iterations += 1;

            let mut direction = Self::lbfgs_direction(&grad, &s_hist, &y_hist);
            let mut slope = grad.dot(&direction);
            if !slope.is_finite() || slope >= 0.0 {
                // Curvature history went bad; fall back to steepest descent
                direction = -&grad;
                slope = -grad.norm_squared();
                s_hist.clear();
                y_hist.clear();
            }

            let mut alpha = 1.0;
            let mut accepted = false;
            for _ in 0..40 {
                let mut candidate = x.clone();
                candidate.axpy(alpha, &direction, 1.0);
                let trial = Self::merit_value(tape, problem, &candidate, mults, mu);
                if trial.is_finite() && trial <= value + 1e-4 * alpha * slope {
                    let (new_value, new_grad) =
                        Self::merit_with_gradient(tape, problem, &candidate, mults, mu);
                    let s = &candidate - &*x;
                    let y = &new_grad - &grad;
                    if s.dot(&y) > 1e-12 {
                        s_hist.push_back(s);
                        y_hist.push_back(y);
                        if s_hist.len() > self.config.memory {
                            s_hist.pop_front();
                            y_hist.pop_front();
                        }
                    }
                    *x = candidate;
                    value = new_value;
                    grad = new_grad;
                    accepted = true;
                    break;
                }
                alpha *= 0.5;
            }
            if !accepted {
                break;
            }
        }
        iterations
    }

    fn max_violation(problem: &NlpProblem, g: &[f64]) -> f64 {
        let mut worst = 0.0f64;
        for i in 0..problem.constraints.len() {
            let l = problem.lower[i];
            let u = problem.upper[i];
            if l.is_finite() {
                worst = worst.max(l - g[i]);
            }
            if u.is_finite() {
                worst = worst.max(g[i] - u);
            }
        }
        worst
    }

    fn update_multipliers(problem: &NlpProblem, g: &[f64], mults: &mut Multipliers, mu: f64) {
        for i in 0..problem.constraints.len() {
            let l = problem.lower[i];
            let u = problem.upper[i];
            if l == u && l.is_finite() {
                mults.eq[i] += mu * (g[i] - l);
                continue;
            }
            if l.is_finite() {
                mults.lower[i] = (mults.lower[i] + mu * (l - g[i])).max(0.0);
            }
            if u.is_finite() {
                mults.upper[i] = (mults.upper[i] + mu * (g[i] - u)).max(0.0);
            }
        }
    }
}

impl NlpSolver for AugmentedLagrangianSolver {
    fn solve(
        &self,
        problem: &NlpProblem,
        initial_guess: &DVector<f64>,
    ) -> PlannerResult<NlpSolution> {
        let start = Instant::now();

        let mut roots = Vec::with_capacity(problem.constraints.len() + 1);
        roots.push(problem.objective.clone());
        roots.extend(problem.constraints.iter().cloned());
        let tape = Tape::compile(&roots, problem.num_variables);

        let m = problem.constraints.len();
        let mut mults = Multipliers {
            eq: vec![0.0; m],
            lower: vec![0.0; m],
            upper: vec![0.0; m],
        };
        let mut mu = self.config.initial_penalty;
        let mut x = initial_guess.clone();
        let mut total_iterations = 0;
        let mut prev_violation = f64::INFINITY;

        for _ in 0..self.config.max_outer_iterations {
            total_iterations += self.minimize_subproblem(&tape, problem, &mut x, &mults, mu);

            let values = tape.forward(x.as_slice());
            let outputs = tape.outputs_from(&values);
            let violation = Self::max_violation(problem, &outputs[1..]);
            if violation <= self.config.violation_tolerance {
                break;
            }

            Self::update_multipliers(problem, &outputs[1..], &mut mults, mu);
            if violation > 0.25 * prev_violation {
                mu = (mu * self.config.penalty_growth).min(self.config.max_penalty);
            }
            prev_violation = violation;
        }

        let values = tape.forward(x.as_slice());
        let outputs = tape.outputs_from(&values);
        let objective = outputs[0];
        let g = DVector::from_vec(outputs[1..].to_vec());
        let violation = Self::max_violation(problem, g.as_slice());

        let stats = SolverStats {
            success: violation <= self.config.violation_tolerance,
            iterations: total_iterations,
            solve_time: start.elapsed().as_secs_f64(),
            constraint_violation: violation,
        };
        Ok(NlpSolution { x, g, objective, stats })
    }
}
