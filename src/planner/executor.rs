//! Solve orchestration
//!
//! Sequences one planning query end to end: variable declaration,
//! constraint building, and the hand-off to the NLP solver.

use nalgebra::DVector;

use super::car_planner::CarPlanner;
use crate::common::error::PlannerResult;
use crate::common::types::{Obstacle, State};
use crate::solver::{NlpSolution, NlpSolver};

/// Runs `prep` then `solve` over a planner/solver pair
pub struct Executor<S: NlpSolver> {
    planner: CarPlanner,
    solver: S,
}

impl<S: NlpSolver> Executor<S> {
    pub fn new(planner: CarPlanner, solver: S) -> Self {
        Self { planner, solver }
    }

    /// Declares decision variables and builds the constraint registry for
    /// the given query
    pub fn prep(
        &mut self,
        initial: &State,
        final_state: &State,
        obstacles: &[Obstacle],
    ) -> PlannerResult<()> {
        self.planner.prep_problem()?;
        self.planner.prep_constraints(initial, final_state, obstacles)
    }

    /// Solves the prepared problem, seeded with the warm start if supplied
    pub fn solve(&self, warm_start: Option<&DVector<f64>>) -> PlannerResult<NlpSolution> {
        self.planner.solve(&self.solver, warm_start)
    }

    pub fn planner(&self) -> &CarPlanner {
        &self.planner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::robot::LimoBot;
    use crate::planner::car_planner::CarPlannerConfig;
    use crate::solver::AugmentedLagrangianSolver;

    fn executor(num_waypoints: usize, granularity: usize) -> Executor<AugmentedLagrangianSolver> {
        let planner = CarPlanner::new(
            &LimoBot,
            CarPlannerConfig {
                num_waypoints,
                granularity,
                t_max: 40.0,
            },
        )
        .unwrap();
        Executor::new(planner, AugmentedLagrangianSolver::with_defaults())
    }

    #[test]
    fn test_solve_before_prep_fails() {
        let ex = executor(3, 2);
        assert!(ex.solve(None).is_err());
    }

    #[test]
    fn test_straight_line_query() {
        let mut ex = executor(4, 3);
        let initial = State::origin();
        let final_state = State::new(1.5, 0.0, 0.0);
        ex.prep(&initial, &final_state, &[]).unwrap();

        let solution = ex.solve(None).unwrap();
        assert_eq!(solution.x.len(), 4 * 7);
        assert_eq!(
            solution.g.len(),
            ex.planner().problem().num_constraints()
        );
        assert!(solution.stats.solve_time >= 0.0);

        // Convergence depends on the iterative solver; check the boundary
        // poses only when it reports success
        if solution.stats.success {
            assert!((solution.x[0] - initial.x).abs() < 1e-2);
            assert!((solution.x[1] - initial.y).abs() < 1e-2);
            let base = 3 * 7;
            assert!((solution.x[base] - final_state.x).abs() < 1e-2);
            assert!((solution.x[base + 1] - final_state.y).abs() < 1e-2);
        }
    }

    #[test]
    fn test_obstacle_query_keeps_clearance() {
        let mut ex = executor(6, 4);
        let obstacle = Obstacle::new(0.0, 0.0, 1.0, 1.0);
        ex.prep(
            &State::new(-3.0, 0.0, 0.0),
            &State::new(3.0, 0.0, 0.0),
            &[obstacle],
        )
        .unwrap();

        let solution = ex.solve(None).unwrap();
        if solution.stats.success {
            // Every intermediate point must stay outside the inflated circle
            for point in ex
                .planner()
                .intermediate_trajectory(solution.g.as_slice())
            {
                let distance = (point.x * point.x + point.y * point.y).sqrt();
                assert!(
                    distance >= obstacle.inflated_radius() - 1e-2,
                    "point ({}, {}) inside inflated obstacle",
                    point.x,
                    point.y
                );
            }
        }
    }

    #[test]
    fn test_warm_start_is_used() {
        let mut ex = executor(3, 2);
        ex.prep(&State::origin(), &State::new(1.0, 0.0, 0.0), &[])
            .unwrap();
        let warm = ex.planner().initial_guess().unwrap();
        let solution = ex.solve(Some(&warm)).unwrap();
        assert_eq!(solution.x.len(), warm.len());
    }
}
