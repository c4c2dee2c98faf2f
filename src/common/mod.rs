//! Common types shared across the planner

pub mod error;
pub mod robot;
pub mod types;

pub use error::{PlannerError, PlannerResult};
pub use robot::{CarLikeRobot, LimoBot};
pub use types::{Command, Obstacle, State};
