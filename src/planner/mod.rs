// Trajectory formulation and orchestration module

pub mod car_planner;
pub mod executor;

pub use car_planner::{CarPlanner, CarPlannerConfig, Waypoint, VARIABLES_PER_WAYPOINT};
pub use executor::Executor;
