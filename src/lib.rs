//! car_planner - trajectory optimization for car-like robots
//!
//! This crate formulates a nonlinear trajectory-optimization problem for a
//! bicycle-model robot: given a start pose, a goal pose, and circular
//! obstacles, it produces waypoints (position, heading, curvature, velocity,
//! curvature-rate control, and per-segment duration) connecting the two
//! poses while respecting kinematic limits and avoiding obstacles.
//!
//! The formulation uses multiple shooting with nested forward-Euler
//! integration; constraints and decision variables live in an ordered,
//! name-keyed registry that supports substring-pattern lookup over the
//! solved constraint vector. A packaged augmented-Lagrangian solver is
//! provided behind the [`solver::NlpSolver`] trait.

// Core modules
pub mod common;
pub mod symbolic;

// Formulation modules
pub mod planner;
pub mod problem;
pub mod solver;

// Re-export common types for convenience
pub use common::{CarLikeRobot, Command, LimoBot, Obstacle, PlannerError, PlannerResult, State};
pub use planner::{CarPlanner, CarPlannerConfig, Executor, Waypoint};
pub use problem::Problem;
pub use solver::{
    AugmentedLagrangianConfig, AugmentedLagrangianSolver, NlpProblem, NlpSolution, NlpSolver,
    SolverStats,
};
pub use symbolic::Expr;
