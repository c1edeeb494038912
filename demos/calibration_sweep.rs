//! Anticogging calibration walkthrough.
//!
//! Simulates a motor with position-dependent cogging torque, runs the
//! calibration sweep against it, and prints the learned table's shape.
//! Run with:
//!
//! ```sh
//! cargo run --example calibration_sweep
//! ```

use servo_control::{AxisContext, CalibrationState, Controller, ControllerConfig};

const DT: f32 = 1.0 / 8000.0;

/// Cogging disturbance torque at a mechanical position.
fn cogging_torque(pos: f32) -> f32 {
    let angle = pos * core::f32::consts::TAU;
    0.02 * (angle * 12.0).sin() + 0.01 * (angle * 24.0).cos()
}

fn main() {
    let mut controller = Controller::new(AxisContext::single_axis(), DT);

    let mut config = ControllerConfig::default();
    config.vel_gain = 0.3;
    config.torque_ramp_rate = servo_control::NewtonMetersPerSec(50.0);
    controller.apply_config(config).expect("config is valid");

    // Inertia plant with cogging ripple opposing the commanded torque.
    let mut pos = 0.0f32;
    let mut vel = 0.0f32;
    let inertia = 0.005f32;

    controller.pos_estimate_linear.write(pos);
    controller.vel_estimate.write(vel);
    controller
        .start_anticogging_calibration()
        .expect("sweep starts");
    println!("sweeping...");

    for tick in 0..4_000_000 {
        controller.pos_estimate_linear.write(pos);
        controller.pos_estimate_circular.write(pos - pos.floor());
        controller.vel_estimate.write(vel);
        controller.update(None);

        let torque = controller.torque_output.read().unwrap_or(0.0);
        vel += (torque - cogging_torque(pos)) / inertia * DT;
        pos += vel * DT;

        match controller.calibration_state() {
            CalibrationState::Done => {
                println!("converged after {:.1}s, {:.1} turns", tick as f32 * DT, pos);
                break;
            }
            CalibrationState::Aborted => {
                println!("sweep aborted: {:?}", controller.fault());
                return;
            }
            _ => {}
        }
    }

    controller.anticogging_remove_bias();

    println!("learned table (every 64th bucket):");
    for i in (0..servo_control::COGGING_MAP_LEN as u32).step_by(64) {
        let value = controller.anticogging_get_val(i).unwrap();
        println!("  bucket {:>4}: {:>9.5} Nm", i, value);
    }
}
