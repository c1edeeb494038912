//! Configuration validation.

use crate::error::ConfigError;

use super::controller::{ControlMode, ControllerConfig, InputMode};
use super::AnticoggingConfig;

/// Validate a controller configuration.
///
/// Checks:
/// - Gains and the inertia coefficient are finite and non-negative
/// - Limits, ramp rates, bandwidth and the circular range are positive
/// - The velocity limit tolerance ratio is at least 1.0
/// - The control/input mode combination is meaningful
/// - Anticogging sweep parameters describe a decelerating, softening sweep
///
/// Index bounds against the owning device (mirror axis, encoder) are checked
/// by [`Controller::apply_config`](crate::control::Controller::apply_config),
/// which knows the axis context.
pub fn validate_config(config: &ControllerConfig) -> Result<(), ConfigError> {
    if !non_negative(config.pos_gain) {
        return Err(ConfigError::InvalidPosGain(config.pos_gain));
    }
    if !non_negative(config.vel_gain) {
        return Err(ConfigError::InvalidVelGain(config.vel_gain));
    }
    if !non_negative(config.vel_integrator_gain) {
        return Err(ConfigError::InvalidVelIntegratorGain(config.vel_integrator_gain));
    }

    if !positive(config.vel_limit.value()) {
        return Err(ConfigError::InvalidVelLimit(config.vel_limit.value()));
    }
    if !config.vel_limit_tolerance.is_finite() || config.vel_limit_tolerance < 1.0 {
        return Err(ConfigError::InvalidVelLimitTolerance(config.vel_limit_tolerance));
    }
    if !positive(config.vel_ramp_rate.value()) {
        return Err(ConfigError::InvalidVelRampRate(config.vel_ramp_rate.value()));
    }
    if !positive(config.torque_ramp_rate.value()) {
        return Err(ConfigError::InvalidTorqueRampRate(config.torque_ramp_rate.value()));
    }

    if !positive(config.circular_setpoint_range.value()) {
        return Err(ConfigError::InvalidCircularRange(config.circular_setpoint_range.value()));
    }
    if !non_negative(config.inertia) {
        return Err(ConfigError::InvalidInertia(config.inertia));
    }
    if !positive(config.input_filter_bandwidth.value()) {
        return Err(ConfigError::InvalidFilterBandwidth(config.input_filter_bandwidth.value()));
    }
    if !non_negative(config.homing_speed.value()) {
        return Err(ConfigError::InvalidHomingSpeed(config.homing_speed.value()));
    }
    if !positive(config.gain_scheduling_width.value()) {
        return Err(ConfigError::InvalidGainSchedulingWidth(
            config.gain_scheduling_width.value(),
        ));
    }
    if !config.mirror_ratio.is_finite() {
        return Err(ConfigError::InvalidMirrorRatio(config.mirror_ratio));
    }

    validate_mode_combination(config)?;
    validate_anticogging(&config.anticogging)?;

    Ok(())
}

fn validate_mode_combination(config: &ControllerConfig) -> Result<(), ConfigError> {
    let invalid = match config.input_mode {
        InputMode::Inactive | InputMode::Passthrough => false,
        InputMode::VelRamp => config.control_mode != ControlMode::Velocity,
        InputMode::PosFilter | InputMode::TrapTraj => {
            config.control_mode != ControlMode::Position
        }
        InputMode::TorqueRamp => config.control_mode != ControlMode::Torque,
        InputMode::Mirror => config.mirror_axis.is_none(),
    };

    if invalid {
        return Err(ConfigError::InvalidModeCombination {
            control: config.control_mode,
            input: config.input_mode,
        });
    }

    Ok(())
}

fn validate_anticogging(config: &AnticoggingConfig) -> Result<(), ConfigError> {
    let start_vel = config.start_vel.value();
    let end_vel = config.end_vel.value();
    if !positive(start_vel) || !positive(end_vel) || end_vel > start_vel {
        return Err(ConfigError::InvalidCalibrationVelocity {
            start: start_vel,
            end: end_vel,
        });
    }

    if !positive(config.start_gain) || !positive(config.end_gain) {
        return Err(ConfigError::InvalidCalibrationGain {
            start: config.start_gain,
            end: config.end_gain,
        });
    }

    if !positive(config.end_tolerance) {
        return Err(ConfigError::InvalidCalibrationTolerance(config.end_tolerance));
    }
    if !non_negative(config.max_torque.value()) {
        return Err(ConfigError::InvalidMaxCompensationTorque(config.max_torque.value()));
    }

    Ok(())
}

#[inline]
fn non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

#[inline]
fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}
