//! Integration tests for the servo-control outer loop.
//!
//! These tests close the loop around the controller with a simulated plant
//! and verify the externally observable guarantees: limits, fault latching,
//! trajectory completion, calibration convergence and mirroring.

use servo_control::{
    AxisContext, ControlMode, Controller, ControllerConfig, Fault, InputMode, Setpoints,
    TurnsPerSec,
};

const DT: f32 = 1.0 / 8000.0;

fn controller() -> Controller {
    Controller::new(AxisContext::single_axis(), DT)
}

fn feed(controller: &mut Controller, pos: f32, vel: f32) {
    controller.pos_estimate_linear.write(pos);
    controller.pos_estimate_circular.write(pos - pos.floor());
    controller.vel_estimate.write(vel);
}

// =============================================================================
// Configuration commit semantics
// =============================================================================

#[test]
fn valid_config_commits_exactly() {
    let mut c = controller();
    let mut config = ControllerConfig::default();
    config.pos_gain = 35.0;
    config.vel_limit = TurnsPerSec(3.5);
    config.enable_gain_scheduling = true;

    c.apply_config(config.clone()).expect("valid config must apply");
    assert_eq!(c.config(), &config);
}

#[test]
fn invalid_config_leaves_prior_active() {
    let mut c = controller();
    let mut good = ControllerConfig::default();
    good.pos_gain = 35.0;
    c.apply_config(good.clone()).unwrap();

    let mut bad = good.clone();
    bad.vel_gain = -0.5;
    assert!(c.apply_config(bad).is_err());

    assert_eq!(c.config(), &good);
}

// =============================================================================
// Velocity clamp
// =============================================================================

#[test]
fn velocity_setpoint_never_exceeds_limit() {
    let mut c = controller();
    let mut config = ControllerConfig::default();
    config.vel_limit = TurnsPerSec(2.0);
    c.apply_config(config).unwrap();

    // Enormous position errors in both directions.
    for target in [1000.0, -1000.0, 3.0, -0.001] {
        c.set_input_pos(target);
        feed(&mut c, 0.0, 0.0);
        c.update(None);

        assert!(
            c.vel_desired().abs() <= 2.0 + 1e-6,
            "velocity demand {} exceeded the limit for target {}",
            c.vel_desired(),
            target
        );
    }
}

// =============================================================================
// Overspeed detection
// =============================================================================

#[test]
fn overspeed_latches_after_one_tick() {
    let mut c = controller();
    let mut config = ControllerConfig::default();
    config.vel_limit = TurnsPerSec(2.0);
    config.vel_limit_tolerance = 1.2; // threshold 2.4
    c.apply_config(config).unwrap();

    feed(&mut c, 0.0, 2.5);
    assert!(!c.update(None));
    assert_eq!(c.fault(), Some(Fault::Overspeed));
}

#[test]
fn no_overspeed_inside_tolerance() {
    let mut c = controller();
    let mut config = ControllerConfig::default();
    config.vel_limit = TurnsPerSec(2.0);
    config.vel_limit_tolerance = 1.2;
    c.apply_config(config).unwrap();

    feed(&mut c, 0.0, 2.3);
    assert!(c.update(None));
    assert!(c.fault().is_none());
}

// =============================================================================
// Torque ramp bound
// =============================================================================

#[test]
fn published_torque_change_is_ramp_bounded() {
    let mut c = controller();
    let mut config = ControllerConfig::default();
    config.control_mode = ControlMode::Torque;
    config.enable_torque_mode_vel_limit = false;
    c.apply_config(config).unwrap();
    let max_step = c.config().torque_ramp_rate.value() * DT;

    let mut previous = 0.0f32;
    for i in 0..5000 {
        // Aggressively stepping torque command.
        let command = if i % 200 < 100 { 0.5 } else { -0.5 };
        c.set_input_torque(command);
        feed(&mut c, 0.0, 0.0);
        c.update(None);

        let output = c.torque_output.read().unwrap();
        assert!(
            (output - previous).abs() <= max_step + 1e-7,
            "tick {}: output stepped {} > {}",
            i,
            (output - previous).abs(),
            max_step
        );
        previous = output;
    }
}

// =============================================================================
// Trajectory termination & supersede
// =============================================================================

/// Run the trajectory input mode with a perfectly tracking plant: the
/// estimates follow the previous tick's setpoints.
fn run_trajectory(c: &mut Controller, max_ticks: usize) -> usize {
    let mut pos = c.pos_setpoint();
    let mut vel = c.vel_setpoint();
    for i in 0..max_ticks {
        feed(c, pos, vel);
        c.update(None);
        pos = c.pos_setpoint();
        vel = c.vel_setpoint();
        if c.trajectory_done() {
            return i;
        }
    }
    max_ticks
}

#[test]
fn trajectory_move_terminates_at_goal() {
    let mut c = controller();
    let mut config = ControllerConfig::default();
    config.input_mode = InputMode::TrapTraj;
    c.apply_config(config).unwrap();
    feed(&mut c, 0.0, 0.0);

    c.set_input_pos(1.0);
    let ticks = run_trajectory(&mut c, 200_000);

    assert!(c.trajectory_done(), "move never completed");
    assert!(ticks < 200_000);
    assert!((c.pos_setpoint() - 1.0).abs() < 1e-3);
    assert!(c.vel_setpoint().abs() < 1e-2);
}

#[test]
fn new_move_supersedes_without_blending() {
    let mut c = controller();
    let mut config = ControllerConfig::default();
    config.input_mode = InputMode::TrapTraj;
    c.apply_config(config).unwrap();
    feed(&mut c, 0.0, 0.0);

    // Start toward +10, then redirect to -0.5 partway through.
    c.set_input_pos(10.0);
    let mut pos = 0.0;
    let mut vel = 0.0;
    for _ in 0..4000 {
        feed(&mut c, pos, vel);
        c.update(None);
        pos = c.pos_setpoint();
        vel = c.vel_setpoint();
    }
    assert!(!c.trajectory_done());

    c.set_input_pos(-0.5);
    run_trajectory(&mut c, 400_000);

    assert!(c.trajectory_done());
    assert!((c.pos_setpoint() + 0.5).abs() < 1e-3);
}

#[test]
fn incremental_move_from_goal_point_does_not_drift() {
    let mut c = controller();
    let mut config = ControllerConfig::default();
    config.input_mode = InputMode::TrapTraj;
    c.apply_config(config).unwrap();
    feed(&mut c, 0.0, 0.0);

    c.move_to_pos(1.0);
    run_trajectory(&mut c, 200_000);

    // Two relative moves measured from the goal, not the (noisy) estimate.
    c.move_incremental(0.5, true);
    run_trajectory(&mut c, 200_000);
    c.move_incremental(0.5, true);
    run_trajectory(&mut c, 200_000);

    assert!((c.pos_setpoint() - 2.0).abs() < 1e-3);
}

// =============================================================================
// Calibration convergence
// =============================================================================

#[test]
fn calibration_converges_and_restores_mode() {
    let mut c = controller();
    let config = ControllerConfig::default(); // position control
    c.apply_config(config).unwrap();

    feed(&mut c, 0.0, 0.0);
    c.start_anticogging_calibration().unwrap();
    assert_eq!(c.config().control_mode, ControlMode::Velocity);

    // Plant: tracks the sweep with a velocity error that decays away.
    let mut pos = 0.0f32;
    let mut converged = false;
    for i in 0..400_000 {
        let command = c.vel_setpoint();
        let error = 0.5 * (-(i as f32) * DT / 2.0).exp(); // decaying error
        let vel = command - error;
        pos += vel * DT;
        feed(&mut c, pos, vel);
        c.update(None);

        if c.calibration_state() == servo_control::CalibrationState::Done {
            converged = true;
            break;
        }
    }

    assert!(converged, "calibration never converged");
    assert!(c.anticogging_valid());
    assert!(c.config().anticogging.pre_calibrated);
    // Pre-calibration control mode restored.
    assert_eq!(c.config().control_mode, ControlMode::Position);
    assert!(c.fault().is_none());
}

#[test]
fn remove_bias_zeroes_table_mean() {
    let mut c = controller();

    for i in 0..servo_control::COGGING_MAP_LEN as u32 {
        c.anticogging_set_val(i, 0.05 + 0.02 * (i as f32 * 0.01).sin())
            .unwrap();
    }
    c.anticogging_remove_bias();

    let mut sum = 0.0;
    for i in 0..servo_control::COGGING_MAP_LEN as u32 {
        sum += c.anticogging_get_val(i).unwrap();
    }
    let mean = sum / servo_control::COGGING_MAP_LEN as f32;
    assert!(mean.abs() < 1e-4, "residual bias {}", mean);
}

#[test]
fn stop_calibration_returns_to_idle_without_validity() {
    let mut c = controller();
    feed(&mut c, 0.0, 0.0);

    c.start_anticogging_calibration().unwrap();
    assert!(c.start_anticogging_calibration().is_err());

    c.stop_anticogging_calibration();
    assert_eq!(
        c.calibration_state(),
        servo_control::CalibrationState::Idle
    );
    assert!(!c.anticogging_valid());
    assert_eq!(c.config().control_mode, ControlMode::Position);
}

// =============================================================================
// Mirroring
// =============================================================================

#[test]
fn mirrored_axis_tracks_source_times_ratio() {
    let context = AxisContext {
        axis_count: 2,
        estimator_count: 1,
    };
    let mut source = Controller::new(context, DT);
    let mut target = Controller::new(context, DT);

    let mut target_config = ControllerConfig::default();
    target_config.input_mode = InputMode::Mirror;
    target_config.mirror_axis = Some(0);
    target_config.mirror_ratio = 0.5;
    target.apply_config(target_config).unwrap();

    // Local commands on the mirroring axis must be overridden.
    target.set_input_pos(123.0);

    source.set_input_pos(2.0);
    source.set_input_vel(1.0);
    feed(&mut source, 2.0, 0.0);
    source.update(None);

    let snapshot: Setpoints = source.setpoints();
    feed(&mut target, 1.0, 0.0);
    target.update(Some(snapshot));

    assert!((target.pos_setpoint() - snapshot.pos * 0.5).abs() < 1e-6);
    assert!((target.vel_setpoint() - snapshot.vel * 0.5).abs() < 1e-6);
    assert!((target.torque_setpoint() - snapshot.torque * 0.5).abs() < 1e-6);
}

// =============================================================================
// Reset
// =============================================================================

#[test]
fn reset_is_idempotent() {
    let mut c = controller();
    c.set_input_pos(5.0);
    feed(&mut c, 0.0, 9.0); // overspeed
    c.update(None);
    assert!(c.fault().is_some());

    for _ in 0..5 {
        c.reset();
        assert!(c.fault().is_none());
        assert_eq!(c.pos_setpoint(), 0.0);
        assert_eq!(c.vel_setpoint(), 0.0);
        assert_eq!(c.torque_setpoint(), 0.0);
        assert_eq!(c.vel_integrator_torque(), 0.0);
        assert!(c.trajectory_done());
    }
}

#[test]
fn reset_preserves_cogging_table() {
    let mut c = controller();
    c.anticogging_set_val(10, 0.07).unwrap();

    c.reset();
    assert!((c.anticogging_get_val(10).unwrap() - 0.07).abs() < 1e-6);

    // Clearing validity is a separate, explicit request.
    c.invalidate_anticogging();
    assert!(!c.anticogging_valid());
    assert!((c.anticogging_get_val(10).unwrap() - 0.07).abs() < 1e-6);
}
