//! Car trajectory formulator
//!
//! Turns continuous bicycle kinematics into a finite nonlinear program via
//! multiple shooting: each trajectory segment is integrated independently
//! with nested forward-Euler sub-steps, and explicit G2 continuity
//! equalities (position, heading, curvature) tie the segments together.
//! Obstacle clearance is enforced at every sub-step, and the running
//! sub-step states are registered as unbounded observation rows so the
//! solved trajectory can be recovered by pattern lookup.

use std::f64::consts::PI;

use itertools::Itertools;
use nalgebra::DVector;

use crate::common::error::{PlannerError, PlannerResult};
use crate::common::robot::CarLikeRobot;
use crate::common::types::{Command, Obstacle, State};
use crate::problem::Problem;
use crate::solver::{NlpProblem, NlpSolution, NlpSolver};
use crate::symbolic::Expr;

/// Formulation parameters
#[derive(Debug, Clone)]
pub struct CarPlannerConfig {
    /// Number of trajectory waypoints (shooting nodes)
    pub num_waypoints: usize,
    /// Euler sub-steps per segment
    pub granularity: usize,
    /// Budget on the total trajectory duration [s]
    pub t_max: f64,
}

impl Default for CarPlannerConfig {
    fn default() -> Self {
        Self {
            num_waypoints: 6,
            granularity: 10,
            t_max: 40.0,
        }
    }
}

/// One discretization node: state `[x, y, theta, k]`, controls `[s, v]`
/// (curvature rate and linear velocity), and segment duration `t`.
/// Every field is a registered decision variable.
#[derive(Debug, Clone)]
pub struct Waypoint {
    pub x: Expr,
    pub y: Expr,
    pub theta: Expr,
    pub k: Expr,
    pub s: Expr,
    pub v: Expr,
    pub t: Expr,
}

/// Number of scalar decision variables per waypoint
pub const VARIABLES_PER_WAYPOINT: usize = 7;

/// Robot parameters derived once at construction
#[derive(Debug, Clone, Copy)]
struct RobotInfo {
    minimum_turning_radius: f64,
    wheel_base: f64,
    max_linear_velocity: f64,
    max_acceleration: f64,
    max_steering_angle: f64,
    /// Curvature bound, 1 / minimum turning radius
    max_curvature: f64,
    /// Seed velocity for the initial guess, 0.4 x max velocity
    cruise_velocity: f64,
}

/// Signed clearance of a point from an inflated obstacle circle;
/// non-negative iff the point is outside the circle
fn obstacle_clearance(x: &Expr, y: &Expr, obstacle: &Obstacle) -> Expr {
    let dx = obstacle.x - x.clone();
    let dy = obstacle.y - y.clone();
    let r = obstacle.inflated_radius();
    dx.squared() + dy.squared() - r * r
}

/// Three-valued sign; zero maps to zero so an axis-aligned guess walk does
/// not drift off the axis
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Multiple-shooting trajectory formulator for a car-like robot.
///
/// Phases are strictly ordered: [`prep_problem`](CarPlanner::prep_problem)
/// declares decision variables, [`prep_constraints`](CarPlanner::prep_constraints)
/// builds the constraint registry from boundary states and obstacles, and
/// only then may the objective, initial guess, or solve be requested. One
/// instance serves one planning query.
pub struct CarPlanner {
    config: CarPlannerConfig,
    info: RobotInfo,
    problem: Problem,
    waypoints: Vec<Waypoint>,
    boundary: Option<(State, State)>,
}

impl CarPlanner {
    pub fn new(robot: &dyn CarLikeRobot, config: CarPlannerConfig) -> PlannerResult<Self> {
        if config.num_waypoints < 2 {
            return Err(PlannerError::InvalidParameter(
                "at least 2 waypoints are required".to_string(),
            ));
        }
        if config.granularity < 1 {
            return Err(PlannerError::InvalidParameter(
                "granularity must be at least 1".to_string(),
            ));
        }
        if config.t_max <= 0.0 {
            return Err(PlannerError::InvalidParameter(
                "t_max must be positive".to_string(),
            ));
        }
        let minimum_turning_radius = robot.minimum_turning_radius();
        let max_linear_velocity = robot.max_linear_velocity();
        if minimum_turning_radius <= 0.0 || max_linear_velocity <= 0.0 {
            return Err(PlannerError::InvalidParameter(
                "turning radius and max velocity must be positive".to_string(),
            ));
        }

        let info = RobotInfo {
            minimum_turning_radius,
            wheel_base: robot.wheel_base(),
            max_linear_velocity,
            max_acceleration: robot.max_acceleration(),
            max_steering_angle: robot.max_steering_angle(),
            max_curvature: 1.0 / minimum_turning_radius,
            cruise_velocity: 0.4 * max_linear_velocity,
        };

        Ok(Self {
            config,
            info,
            problem: Problem::new(),
            waypoints: Vec::new(),
            boundary: None,
        })
    }

    pub fn with_defaults(robot: &dyn CarLikeRobot) -> PlannerResult<Self> {
        Self::new(robot, CarPlannerConfig::default())
    }

    pub fn config(&self) -> &CarPlannerConfig {
        &self.config
    }

    pub fn minimum_turning_radius(&self) -> f64 {
        self.info.minimum_turning_radius
    }

    pub fn wheel_base(&self) -> f64 {
        self.info.wheel_base
    }

    pub fn max_linear_velocity(&self) -> f64 {
        self.info.max_linear_velocity
    }

    pub fn max_acceleration(&self) -> f64 {
        self.info.max_acceleration
    }

    pub fn max_steering_angle(&self) -> f64 {
        self.info.max_steering_angle
    }

    /// Curvature bound derived from the minimum turning radius
    pub fn max_curvature(&self) -> f64 {
        self.info.max_curvature
    }

    /// Velocity used to seed the initial guess
    pub fn cruise_velocity(&self) -> f64 {
        self.info.cruise_velocity
    }

    /// Underlying registry, e.g. for pattern lookups over a solved
    /// constraint vector
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Declares the decision variables: seven scalars per waypoint in the
    /// order `x, y, th, k, s, v, t`, names suffixed with the waypoint index.
    /// May only run once per instance.
    pub fn prep_problem(&mut self) -> PlannerResult<()> {
        if !self.waypoints.is_empty() {
            return Err(PlannerError::PreconditionViolation(
                "prep_problem may only run once".to_string(),
            ));
        }
        for i in 0..self.config.num_waypoints {
            let waypoint = Waypoint {
                x: self.problem.declare_variable(&format!("x{i}"))?,
                y: self.problem.declare_variable(&format!("y{i}"))?,
                theta: self.problem.declare_variable(&format!("th{i}"))?,
                k: self.problem.declare_variable(&format!("k{i}"))?,
                s: self.problem.declare_variable(&format!("s{i}"))?,
                v: self.problem.declare_variable(&format!("v{i}"))?,
                t: self.problem.declare_variable(&format!("t{i}"))?,
            };
            self.waypoints.push(waypoint);
        }
        Ok(())
    }

    /// Builds boundary, kinematic, continuity, obstacle, and time-budget
    /// constraints. Requires [`prep_problem`](CarPlanner::prep_problem);
    /// may only run once.
    pub fn prep_constraints(
        &mut self,
        initial: &State,
        final_state: &State,
        obstacles: &[Obstacle],
    ) -> PlannerResult<()> {
        if self.waypoints.is_empty() {
            return Err(PlannerError::PreconditionViolation(
                "prep_constraints requires prep_problem".to_string(),
            ));
        }
        if self.boundary.is_some() {
            return Err(PlannerError::PreconditionViolation(
                "prep_constraints may only run once".to_string(),
            ));
        }

        let n = self.config.num_waypoints;
        let granularity = self.config.granularity;
        let k_max = self.info.max_curvature;
        let v_max = self.info.max_linear_velocity;

        // Boundary conditions pin pose only; curvature and controls at the
        // endpoints stay free
        let first = &self.waypoints[0];
        let last = &self.waypoints[n - 1];
        self.problem.declare_equality("x0", first.x.clone(), initial.x)?;
        self.problem.declare_equality("y0", first.y.clone(), initial.y)?;
        self.problem
            .declare_equality("th0", first.theta.clone(), initial.theta)?;
        self.problem.declare_equality("xn", last.x.clone(), final_state.x)?;
        self.problem.declare_equality("yn", last.y.clone(), final_state.y)?;
        self.problem
            .declare_equality("thn", last.theta.clone(), final_state.theta)?;

        let mut time_sum = Expr::constant(0.0);
        for i in 1..n {
            let prev = self.waypoints[i - 1].clone();
            let cur = self.waypoints[i].clone();

            self.problem
                .declare_constraint(&format!("v{i}"), cur.v.clone(), 0.0, v_max)?;
            self.problem
                .declare_constraint(&format!("k{i}"), cur.k.clone(), -k_max, k_max)?;
            self.problem
                .declare_constraint(&format!("t{i}"), cur.t.clone(), 0.0, f64::INFINITY)?;

            // Shoot forward from waypoint i-1 with waypoint i's controls
            // held constant over the sub-steps
            let dt = cur.t.clone() * (1.0 / granularity as f64);
            let mut dx = prev.x.clone();
            let mut dy = prev.y.clone();
            let mut dth = prev.theta.clone();
            let mut dk = prev.k.clone();

            for j in 0..granularity {
                // Euler update order is significant: curvature advances
                // before it drives the heading within the same sub-step
                dk = dk + cur.s.clone() * dt.clone();
                dx = dx + cur.v.clone() * dth.cos() * dt.clone();
                dy = dy + cur.v.clone() * dth.sin() * dt.clone();
                dth = dth + dk.clone() * cur.v.clone() * dt.clone();

                self.problem.declare_constraint(
                    &format!("k_sub{j}_{i}"),
                    dk.clone(),
                    -k_max,
                    k_max,
                )?;

                self.problem
                    .declare_observation(&format!("intermediate_x{j}_{i}"), dx.clone())?;
                self.problem
                    .declare_observation(&format!("intermediate_y{j}_{i}"), dy.clone())?;
                self.problem
                    .declare_observation(&format!("intermediate_th{j}_{i}"), dth.clone())?;

                for (o, obstacle) in obstacles.iter().enumerate() {
                    self.problem.declare_constraint(
                        &format!("check_obs{o}_{j}_{i}"),
                        obstacle_clearance(&dx, &dy, obstacle),
                        0.0,
                        f64::INFINITY,
                    )?;
                }
            }

            // G2 continuity: the simulated end state must equal waypoint i
            self.problem
                .declare_equality(&format!("cont_x{i}"), cur.x.clone() - dx, 0.0)?;
            self.problem
                .declare_equality(&format!("cont_y{i}"), cur.y.clone() - dy, 0.0)?;
            self.problem
                .declare_equality(&format!("cont_th{i}"), cur.theta.clone() - dth, 0.0)?;
            self.problem
                .declare_equality(&format!("cont_k{i}"), cur.k.clone() - dk, 0.0)?;

            // Per-segment command observations for downstream playback
            self.problem
                .declare_observation(&format!("command_k{i}"), cur.k.clone())?;
            self.problem
                .declare_observation(&format!("command_v{i}"), cur.v.clone())?;
            self.problem
                .declare_observation(&format!("command_t{i}"), cur.t.clone())?;

            time_sum = time_sum + cur.t.clone();
        }

        self.problem
            .declare_constraint("time_sum", time_sum, 0.0, self.config.t_max)?;

        self.boundary = Some((*initial, *final_state));
        Ok(())
    }

    /// Discretized path-length proxy: sum of squared planar distances
    /// between consecutive waypoints.
    // TODO: weigh heading error into the metric? Plain Euclidean distance
    // underestimates curved segments.
    pub fn objective(&self) -> PlannerResult<Expr> {
        if self.waypoints.is_empty() {
            return Err(PlannerError::PreconditionViolation(
                "objective requires prep_problem".to_string(),
            ));
        }
        let mut path_length = Expr::constant(0.0);
        for (a, b) in self.waypoints.iter().tuple_windows() {
            let dx = b.x.clone() - a.x.clone();
            let dy = b.y.clone() - a.y.clone();
            path_length = path_length + dx.squared() + dy.squared();
        }
        Ok(path_length)
    }

    /// Closed-form seed for the solve: a straight line when start and goal
    /// are near-collinear, otherwise a half-circle arc, walked forward with
    /// the same Euler-style update as the constraint phase. The first
    /// waypoint is emitted at the literal initial pose before any
    /// integration step.
    pub fn initial_guess(&self) -> PlannerResult<DVector<f64>> {
        let (initial, final_state) = self.boundary.as_ref().ok_or_else(|| {
            PlannerError::MissingInput("boundary states; run prep_constraints first".to_string())
        })?;

        let dx = final_state.x - initial.x;
        let dy = final_state.y - initial.y;
        let r = 0.5 * (dx * dx + dy * dy).sqrt();
        let v = self.info.cruise_velocity;

        // A vertical displacement (dx = 0) has no finite slope and is
        // treated as the arc case; a zero displacement degenerates to the
        // straight case so the arc curvature never divides by zero
        let straight = r < 1e-9 || (dx != 0.0 && (dy / dx).abs() < 1e-2);
        let (k, distance) = if straight { (0.0, r) } else { (v / r, r * PI) };

        let n = self.config.num_waypoints;
        let total_time = distance / v;
        let dt = total_time / n as f64;

        let mut x = initial.x;
        let mut y = initial.y;
        let mut theta = initial.theta;
        let mut guess = Vec::with_capacity(n * VARIABLES_PER_WAYPOINT);
        let mut first = true;
        for _ in 0..n {
            guess.extend_from_slice(&[x, y, theta, 0.0, dt, v, k]);
            if first {
                first = false;
            } else {
                x += sign(dx) * v * theta.cos() * dt;
                y += sign(dy) * v * theta.sin() * dt;
                theta += v * k * dt;
            }
        }
        Ok(DVector::from_vec(guess))
    }

    /// Assembles the flattened NLP from the registries
    pub fn build_nlp(&self) -> PlannerResult<NlpProblem> {
        if self.boundary.is_none() {
            return Err(PlannerError::PreconditionViolation(
                "solve requires prep_constraints".to_string(),
            ));
        }
        let (constraints, lower, upper) = self.problem.all_constraints();
        Ok(NlpProblem {
            num_variables: self.problem.num_variables(),
            objective: self.objective()?,
            constraints,
            lower,
            upper,
        })
    }

    /// Hands the assembled NLP to the solver, seeded with the warm start if
    /// one is supplied and the computed initial guess otherwise. The
    /// solver's verdict is returned unmodified; convergence is the caller's
    /// concern.
    pub fn solve(
        &self,
        solver: &dyn NlpSolver,
        warm_start: Option<&DVector<f64>>,
    ) -> PlannerResult<NlpSolution> {
        let nlp = self.build_nlp()?;
        let x0 = match warm_start {
            Some(x0) => x0.clone(),
            None => self.initial_guess()?,
        };
        solver.solve(&nlp, &x0)
    }

    /// Intermediate simulated trajectory points recovered from a solved
    /// constraint-value vector
    pub fn intermediate_trajectory(&self, constraint_values: &[f64]) -> Vec<State> {
        self.problem
            .extract_by_pattern(constraint_values, "intermediate")
            .into_iter()
            .tuples()
            .map(|(x, y, theta)| State::new(x, y, theta))
            .collect()
    }

    /// Per-segment `(curvature, velocity, duration)` playback commands
    /// recovered from a solved constraint-value vector
    pub fn control_commands(&self, constraint_values: &[f64]) -> Vec<Command> {
        self.problem
            .extract_by_pattern(constraint_values, "command")
            .into_iter()
            .tuples()
            .map(|(k, v, t)| Command::new(k, v, t))
            .collect()
    }
}
