//! Common value types for the car trajectory planner

/// 2D pose used as a boundary condition for a planning query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl State {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, theta: 0.0 }
    }

    /// Planar distance to another state, heading ignored
    pub fn distance(&self, other: &State) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Circular obstacle with a safety margin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub inflation: f64,
}

impl Obstacle {
    pub fn new(x: f64, y: f64, radius: f64, inflation: f64) -> Self {
        Self { x, y, radius, inflation }
    }

    /// Physical radius plus the safety margin
    pub fn inflated_radius(&self) -> f64 {
        self.radius + self.inflation
    }

    /// Signed clearance of a point: zero on the inflated boundary,
    /// negative inside, positive outside
    pub fn clearance(&self, x: f64, y: f64) -> f64 {
        (self.x - x).powi(2) + (self.y - y).powi(2) - self.inflated_radius().powi(2)
    }
}

/// One playback step recovered from a solved trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    /// Path curvature [1/m]
    pub curvature: f64,
    /// Linear velocity [m/s]
    pub velocity: f64,
    /// Segment duration [s]
    pub duration: f64,
}

impl Command {
    pub fn new(curvature: f64, velocity: f64, duration: f64) -> Self {
        Self { curvature, velocity, duration }
    }

    /// Angular velocity equivalent for a twist-style consumer
    pub fn angular_velocity(&self) -> f64 {
        self.curvature * self.velocity
    }
}
