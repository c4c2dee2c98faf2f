//
// Car trajectory planning demo
//
// Runs a planning query on the sample Limo platform and prints solver
// diagnostics plus the recovered playback commands. Pass "obstacle" to
// plan around an inflated circle, and "plot" to render the intermediate
// trajectory to img/plan_demo.png with gnuplot.
//

use std::f64::consts::PI;

use gnuplot::{AxesCommon, Caption, Color, Figure, PointSymbol};

use car_planner::{
    AugmentedLagrangianSolver, CarPlanner, CarPlannerConfig, Executor, LimoBot, Obstacle, State,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let with_obstacle = args.iter().any(|a| a == "obstacle");

    let (initial, final_state, obstacles) = if with_obstacle {
        (
            State::new(-3.0, 0.0, 0.0),
            State::new(3.0, 0.0, 0.0),
            vec![Obstacle::new(0.0, 0.0, 1.0, 1.0)],
        )
    } else {
        (State::new(0.0, 0.0, 0.0), State::new(-2.0, 0.0, 0.0), vec![])
    };

    let planner = CarPlanner::new(
        &LimoBot,
        CarPlannerConfig {
            num_waypoints: 10,
            granularity: 10,
            t_max: 40.0,
        },
    )?;
    let mut executor = Executor::new(planner, AugmentedLagrangianSolver::with_defaults());
    executor.prep(&initial, &final_state, &obstacles)?;

    let solution = executor.solve(None)?;
    println!(
        "success: {}  iterations: {}  time: {:.3}s  violation: {:.3e}",
        solution.stats.success,
        solution.stats.iterations,
        solution.stats.solve_time,
        solution.stats.constraint_violation
    );

    let commands = executor.planner().control_commands(solution.g.as_slice());
    for (i, cmd) in commands.iter().enumerate() {
        println!(
            "segment {}: v={:.3} m/s  w={:.3} rad/s  dt={:.3} s",
            i + 1,
            cmd.velocity,
            cmd.angular_velocity(),
            cmd.duration
        );
    }

    if args.iter().any(|a| a == "plot") {
        let trajectory = executor
            .planner()
            .intermediate_trajectory(solution.g.as_slice());
        let traj_x: Vec<f64> = trajectory.iter().map(|p| p.x).collect();
        let traj_y: Vec<f64> = trajectory.iter().map(|p| p.y).collect();

        let waypoint_x: Vec<f64> = solution.x.iter().step_by(7).copied().collect();
        let waypoint_y: Vec<f64> = solution.x.iter().skip(1).step_by(7).copied().collect();

        let mut fg = Figure::new();
        {
            let axes = fg
                .axes2d()
                .set_title("Car trajectory plan", &[])
                .set_x_label("x [m]", &[])
                .set_y_label("y [m]", &[])
                .set_aspect_ratio(gnuplot::Fix(1.0));

            axes.lines(&traj_x, &traj_y, &[Caption("Trajectory"), Color("blue")]);
            axes.points(
                &waypoint_x,
                &waypoint_y,
                &[Caption("Waypoints"), Color("red"), PointSymbol('o')],
            );

            for obstacle in &obstacles {
                let angles: Vec<f64> = (0..=120).map(|i| i as f64 * PI / 60.0).collect();
                for radius in [obstacle.radius, obstacle.inflated_radius()] {
                    let cx: Vec<f64> =
                        angles.iter().map(|a| obstacle.x + radius * a.cos()).collect();
                    let cy: Vec<f64> =
                        angles.iter().map(|a| obstacle.y + radius * a.sin()).collect();
                    axes.lines(&cx, &cy, &[Color("black")]);
                }
            }
        }

        std::fs::create_dir_all("img")?;
        fg.set_terminal("pngcairo", "img/plan_demo.png");
        fg.show().unwrap();
        println!("Plot saved to img/plan_demo.png");
    }

    Ok(())
}
