//! Variable and constraint registry
//!
//! Accumulates symbolic decision variables and bounded constraint
//! expressions under stable string names. Insertion order determines the
//! layout of the flattened vectors handed to the solver, and the
//! substring-pattern lookup lets downstream consumers regroup solved
//! constraint values without knowing exact indices.

use std::collections::HashMap;

use nalgebra::DVector;

use crate::common::error::{PlannerError, PlannerResult};
use crate::symbolic::Expr;

#[derive(Debug, Clone)]
struct ConstraintEntry {
    name: String,
    expr: Expr,
    lower: f64,
    upper: f64,
}

/// Ordered registry of decision variables and bounded constraints
#[derive(Debug, Default)]
pub struct Problem {
    variables: Vec<Expr>,
    variable_names: Vec<String>,
    variable_index: HashMap<String, usize>,
    constraints: Vec<ConstraintEntry>,
    constraint_index: HashMap<String, usize>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a new decision variable and registers it under `name`.
    /// The variable's index is its position in the flattened decision
    /// vector. Duplicate names are a programmer error.
    pub fn declare_variable(&mut self, name: &str) -> PlannerResult<Expr> {
        if self.variable_index.contains_key(name) {
            return Err(PlannerError::DuplicateName(name.to_string()));
        }
        let index = self.variables.len();
        let var = Expr::variable(index, name);
        self.variable_index.insert(name.to_string(), index);
        self.variable_names.push(name.to_string());
        self.variables.push(var.clone());
        Ok(var)
    }

    /// Registers a bounded constraint expression
    pub fn declare_constraint(
        &mut self,
        name: &str,
        expr: Expr,
        lower: f64,
        upper: f64,
    ) -> PlannerResult<()> {
        if self.constraint_index.contains_key(name) {
            return Err(PlannerError::DuplicateName(name.to_string()));
        }
        self.constraint_index
            .insert(name.to_string(), self.constraints.len());
        self.constraints.push(ConstraintEntry {
            name: name.to_string(),
            expr,
            lower,
            upper,
        });
        Ok(())
    }

    /// Equality constraint: expression pinned to `target`
    pub fn declare_equality(&mut self, name: &str, expr: Expr, target: f64) -> PlannerResult<()> {
        self.declare_constraint(name, expr, target, target)
    }

    /// Unbounded entry kept purely so its value can be extracted from the
    /// solved constraint vector by pattern
    pub fn declare_observation(&mut self, name: &str, expr: Expr) -> PlannerResult<()> {
        self.declare_constraint(name, expr, f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Variable handles in declaration order
    pub fn all_variables(&self) -> &[Expr] {
        &self.variables
    }

    /// Variable names in declaration order
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variable_names.iter().map(String::as_str)
    }

    /// Constraint expressions, lower bounds, and upper bounds as three
    /// index-aligned vectors in declaration order
    pub fn all_constraints(&self) -> (Vec<Expr>, DVector<f64>, DVector<f64>) {
        let exprs = self.constraints.iter().map(|c| c.expr.clone()).collect();
        let lower = DVector::from_iterator(
            self.constraints.len(),
            self.constraints.iter().map(|c| c.lower),
        );
        let upper = DVector::from_iterator(
            self.constraints.len(),
            self.constraints.iter().map(|c| c.upper),
        );
        (exprs, lower, upper)
    }

    /// Constraint expression and bounds registered under `name`
    pub fn constraint(&self, name: &str) -> Option<(&Expr, f64, f64)> {
        self.constraint_index
            .get(name)
            .map(|&idx| {
                let entry = &self.constraints[idx];
                (&entry.expr, entry.lower, entry.upper)
            })
    }

    /// Positions of every constraint whose name contains `pattern`, in
    /// declaration order. No match yields an empty vector, not an error.
    pub fn lookup_by_pattern(&self, pattern: &str) -> Vec<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name.contains(pattern))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Values of every pattern-matched constraint, pulled from a solved
    /// constraint-value vector. `values` must be the full flattened vector
    /// aligned with [`Problem::all_constraints`]; a mismatched length is a
    /// programmer error and panics.
    pub fn extract_by_pattern(&self, values: &[f64], pattern: &str) -> Vec<f64> {
        assert_eq!(
            values.len(),
            self.constraints.len(),
            "constraint-value vector length mismatch"
        );
        self.lookup_by_pattern(pattern)
            .into_iter()
            .map(|idx| values[idx])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_order_matches_declaration() {
        let mut problem = Problem::new();
        for name in ["x0", "y0", "th0", "x1"] {
            problem.declare_variable(name).unwrap();
        }
        assert_eq!(problem.num_variables(), 4);
        let names: Vec<&str> = problem.variable_names().collect();
        assert_eq!(names, vec!["x0", "y0", "th0", "x1"]);
        for (i, var) in problem.all_variables().iter().enumerate() {
            assert_eq!(var.var_index(), Some(i));
        }
    }

    #[test]
    fn test_duplicate_variable_is_fatal() {
        let mut problem = Problem::new();
        problem.declare_variable("x0").unwrap();
        let err = problem.declare_variable("x0").unwrap_err();
        assert!(matches!(err, PlannerError::DuplicateName(_)));
    }

    #[test]
    fn test_constraint_vectors_are_aligned() {
        let mut problem = Problem::new();
        let x = problem.declare_variable("x").unwrap();
        problem
            .declare_constraint("box", x.clone(), -1.0, 1.0)
            .unwrap();
        problem.declare_equality("pin", x.clone() + 2.0, 5.0).unwrap();
        problem.declare_observation("watch", x.squared()).unwrap();

        let (exprs, lower, upper) = problem.all_constraints();
        assert_eq!(exprs.len(), 3);
        assert_eq!(lower.len(), 3);
        assert_eq!(upper.len(), 3);
        assert_eq!(lower[0], -1.0);
        assert_eq!(upper[0], 1.0);
        assert_eq!(lower[1], 5.0);
        assert_eq!(upper[1], 5.0);
        assert_eq!(lower[2], f64::NEG_INFINITY);
        assert_eq!(upper[2], f64::INFINITY);
    }

    #[test]
    fn test_duplicate_constraint_is_fatal() {
        let mut problem = Problem::new();
        let x = problem.declare_variable("x").unwrap();
        problem.declare_equality("pin", x.clone(), 0.0).unwrap();
        let err = problem.declare_equality("pin", x, 1.0).unwrap_err();
        assert!(matches!(err, PlannerError::DuplicateName(_)));
    }

    #[test]
    fn test_pattern_lookup_order_and_empty() {
        let mut problem = Problem::new();
        let x = problem.declare_variable("x").unwrap();
        problem.declare_observation("intermediate_x0", x.clone()).unwrap();
        problem.declare_equality("cont_x1", x.clone(), 0.0).unwrap();
        problem.declare_observation("intermediate_y0", x.clone()).unwrap();
        problem.declare_observation("intermediate_x1", x.clone()).unwrap();

        assert_eq!(problem.lookup_by_pattern("intermediate"), vec![0, 2, 3]);
        assert_eq!(problem.lookup_by_pattern("intermediate_x"), vec![0, 3]);
        assert!(problem.lookup_by_pattern("command").is_empty());
    }

    #[test]
    fn test_disjoint_patterns_partition_index_range() {
        let mut problem = Problem::new();
        let x = problem.declare_variable("x").unwrap();
        problem.declare_observation("alpha_0", x.clone()).unwrap();
        problem.declare_observation("beta_0", x.clone()).unwrap();
        problem.declare_observation("alpha_1", x.clone()).unwrap();
        problem.declare_observation("other", x).unwrap();

        let alphas = problem.lookup_by_pattern("alpha");
        let betas = problem.lookup_by_pattern("beta");
        let mut all: Vec<usize> = alphas.iter().chain(betas.iter()).copied().collect();
        all.extend(
            (0..problem.num_constraints())
                .filter(|i| !alphas.contains(i) && !betas.contains(i)),
        );
        all.sort_unstable();
        assert_eq!(all, (0..problem.num_constraints()).collect::<Vec<_>>());
    }

    #[test]
    fn test_extract_by_pattern_preserves_order() {
        let mut problem = Problem::new();
        let x = problem.declare_variable("x").unwrap();
        problem.declare_observation("watch_a", x.clone()).unwrap();
        problem.declare_equality("pin", x.clone(), 0.0).unwrap();
        problem.declare_observation("watch_b", x).unwrap();

        let g = [10.0, 20.0, 30.0];
        assert_eq!(problem.extract_by_pattern(&g, "watch"), vec![10.0, 30.0]);
    }

    #[test]
    #[should_panic(expected = "constraint-value vector length mismatch")]
    fn test_extract_by_pattern_rejects_short_vector() {
        let mut problem = Problem::new();
        let x = problem.declare_variable("x").unwrap();
        problem.declare_observation("watch_a", x.clone()).unwrap();
        problem.declare_observation("watch_b", x).unwrap();
        problem.extract_by_pattern(&[1.0], "watch");
    }
}
