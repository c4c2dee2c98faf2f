//! Error types for the car trajectory planner

use std::fmt;

/// Main error type for problem formulation and solving
#[derive(Debug)]
pub enum PlannerError {
    /// A variable or constraint name was registered twice
    DuplicateName(String),
    /// A formulation phase was invoked out of order
    PreconditionViolation(String),
    /// A required query input is not available
    MissingInput(String),
    /// Invalid configuration or robot parameter
    InvalidParameter(String),
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::DuplicateName(name) => write!(f, "Duplicate name: {}", name),
            PlannerError::PreconditionViolation(msg) => {
                write!(f, "Precondition violation: {}", msg)
            }
            PlannerError::MissingInput(msg) => write!(f, "Missing input: {}", msg),
            PlannerError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for PlannerError {}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
