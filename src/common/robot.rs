//! Robot capability interface
//!
//! Kinematic parameters are exposed through a trait so the planner can be
//! formulated against any car-like platform. Accessors are pure and are
//! queried once when a planner is constructed.

/// Capability object for a car-like (bicycle-model) robot
pub trait CarLikeRobot {
    /// Minimum turning radius [m]
    fn minimum_turning_radius(&self) -> f64;

    /// Distance between front and rear axles [m]
    fn wheel_base(&self) -> f64;

    /// Maximum linear velocity [m/s]
    fn max_linear_velocity(&self) -> f64;

    /// Maximum linear acceleration [m/s^2]
    fn max_acceleration(&self) -> f64;

    /// Maximum steering angle [rad]
    fn max_steering_angle(&self) -> f64;
}

/// Parameters of a small AgileX Limo-class platform
#[derive(Debug, Clone, Copy, Default)]
pub struct LimoBot;

impl CarLikeRobot for LimoBot {
    fn minimum_turning_radius(&self) -> f64 {
        0.4
    }

    fn wheel_base(&self) -> f64 {
        0.2
    }

    fn max_linear_velocity(&self) -> f64 {
        1.0
    }

    fn max_acceleration(&self) -> f64 {
        0.5
    }

    fn max_steering_angle(&self) -> f64 {
        0.523598775 // 30 degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limo_parameters_positive() {
        let robot = LimoBot;
        assert!(robot.minimum_turning_radius() > 0.0);
        assert!(robot.wheel_base() > 0.0);
        assert!(robot.max_linear_velocity() > 0.0);
        assert!(robot.max_acceleration() > 0.0);
        assert!(robot.max_steering_angle() > 0.0);
    }
}
