//! Trajectory move walkthrough.
//!
//! Closes the loop around the controller with a toy inertia plant and prints
//! the move's progress. Run with:
//!
//! ```sh
//! cargo run --example position_move
//! ```

use servo_control::{AxisContext, Controller, ControllerConfig, InputMode};

const DT: f32 = 1.0 / 8000.0;

/// Minimal plant: a pure inertia driven by the commanded torque.
struct Plant {
    pos: f32,
    vel: f32,
    inertia: f32,
}

impl Plant {
    fn step(&mut self, torque: f32) {
        self.vel += torque / self.inertia * DT;
        self.pos += self.vel * DT;
    }
}

fn main() {
    let mut controller = Controller::new(AxisContext::single_axis(), DT);

    let mut config = ControllerConfig::default();
    config.input_mode = InputMode::TrapTraj;
    config.vel_gain = 0.5;
    config.vel_integrator_gain = 2.0;
    config.torque_ramp_rate = servo_control::NewtonMetersPerSec(50.0);
    controller.apply_config(config).expect("config is valid");

    let mut plant = Plant {
        pos: 0.0,
        vel: 0.0,
        inertia: 0.01,
    };

    controller.set_input_pos(2.0);
    println!("moving to 2.0 turns");

    for tick in 0..400_000 {
        controller.pos_estimate_linear.write(plant.pos);
        controller.pos_estimate_circular.write(plant.pos - plant.pos.floor());
        controller.vel_estimate.write(plant.vel);

        if !controller.update(None) {
            println!("fault: {:?}", controller.fault());
            break;
        }

        let torque = controller.torque_output.read().unwrap_or(0.0);
        plant.step(torque);

        if tick % 8000 == 0 {
            println!(
                "t={:>5.2}s  pos={:>7.4}  vel={:>7.4}  torque={:>8.5}",
                tick as f32 * DT,
                plant.pos,
                plant.vel,
                torque
            );
        }

        if controller.trajectory_done() {
            println!(
                "done after {:.2}s at pos={:.4}",
                tick as f32 * DT,
                plant.pos
            );
            break;
        }
    }
}
