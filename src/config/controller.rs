//! Controller configuration.
//!
//! The configuration is a plain validated value: it carries no behavior and
//! no back-pointer to the controller. Field mutations that affect derived
//! state (filter coefficients, output ramp rate) go through setters on
//! [`Controller`](crate::control::Controller), which re-derive together with
//! the field update.

use serde::Deserialize;

use super::anticogging::AnticoggingConfig;
use super::units::{Hertz, NewtonMetersPerSec, Turns, TurnsPerSec, TurnsPerSecSquared};

/// Outer-loop control mode.
///
/// Each level is a superset of the one below: position control runs the
/// velocity loop, and the velocity loop feeds the torque stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    /// External input feeds the torque setpoint directly.
    Torque,
    /// Closed velocity loop; external input feeds the velocity setpoint.
    Velocity,
    /// Full cascade: position error drives the velocity loop.
    #[default]
    Position,
}

impl ControlMode {
    /// Whether this mode runs the velocity loop.
    #[inline]
    pub const fn has_velocity_loop(self) -> bool {
        matches!(self, ControlMode::Velocity | ControlMode::Position)
    }

    /// Whether this mode runs the position loop.
    #[inline]
    pub const fn has_position_loop(self) -> bool {
        matches!(self, ControlMode::Position)
    }
}

/// How raw external input commands are shaped into setpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    /// Setpoints hold their last value; external inputs are ignored.
    Inactive,
    /// External inputs copy straight into the setpoints.
    #[default]
    Passthrough,
    /// Velocity setpoint slews toward the input at the velocity ramp rate.
    VelRamp,
    /// Position input is tracked through the second-order input filter.
    PosFilter,
    /// Position input starts a trapezoidal trajectory move.
    TrapTraj,
    /// Torque setpoint slews toward the input at the torque ramp rate.
    TorqueRamp,
    /// Setpoints track another axis's setpoints scaled by the mirror ratio.
    Mirror,
}

/// Validated, mutable controller parameter bundle.
///
/// Commit new values through
/// [`Controller::apply_config`](crate::control::Controller::apply_config);
/// on validation failure the previous configuration stays active.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Outer-loop control mode.
    pub control_mode: ControlMode,

    /// Input shaping mode.
    pub input_mode: InputMode,

    /// Position gain [(turn/s) / turn].
    pub pos_gain: f32,

    /// Velocity gain [Nm/(turn/s)].
    pub vel_gain: f32,

    /// Velocity integrator gain [Nm/((turn/s)·s)].
    pub vel_integrator_gain: f32,

    /// Velocity limit [turn/s].
    pub vel_limit: TurnsPerSec,

    /// Overspeed threshold as a ratio of `vel_limit`.
    pub vel_limit_tolerance: f32,

    /// Velocity setpoint ramp rate [(turn/s)/s]; also bounds trajectory
    /// acceleration.
    pub vel_ramp_rate: TurnsPerSecSquared,

    /// Torque setpoint and output ramp rate [Nm/s].
    pub torque_ramp_rate: NewtonMetersPerSec,

    /// Interpret position setpoints on a circle instead of a line.
    pub circular_setpoints: bool,

    /// Wrap range for circular setpoints [turn].
    pub circular_setpoint_range: Turns,

    /// Inertia feed-forward coefficient [Nm/(turn/s²)].
    pub inertia: f32,

    /// Second-order input filter bandwidth [1/s].
    pub input_filter_bandwidth: Hertz,

    /// Homing sweep speed, consumed by the owning axis [turn/s].
    pub homing_speed: TurnsPerSec,

    /// Anticogging compensation and calibration parameters.
    pub anticogging: AnticoggingConfig,

    /// Velocity-error width over which the position gain blends up [turn/s].
    pub gain_scheduling_width: TurnsPerSec,

    /// Enable velocity-error-based position gain scheduling.
    pub enable_gain_scheduling: bool,

    /// Clamp the velocity setpoint to ±`vel_limit`.
    pub enable_vel_limit: bool,

    /// Latch an overspeed fault past `vel_limit × vel_limit_tolerance`.
    pub enable_overspeed_error: bool,

    /// Enforce the velocity limit in torque control mode (requires a valid
    /// velocity estimate).
    pub enable_torque_mode_vel_limit: bool,

    /// Axis whose setpoints this axis mirrors, if any.
    pub mirror_axis: Option<u8>,

    /// Scale applied to mirrored setpoints.
    pub mirror_ratio: f32,

    /// Estimator source index; `None` selects the sensorless estimator.
    pub load_encoder: Option<u8>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            control_mode: ControlMode::Position,
            input_mode: InputMode::Passthrough,
            pos_gain: 20.0,
            vel_gain: 1.0 / 6.0,
            vel_integrator_gain: 2.0 / 6.0,
            vel_limit: TurnsPerSec(2.0),
            vel_limit_tolerance: 1.2,
            vel_ramp_rate: TurnsPerSecSquared(1.0),
            torque_ramp_rate: NewtonMetersPerSec(0.01),
            circular_setpoints: false,
            circular_setpoint_range: Turns(1.0),
            inertia: 0.0,
            input_filter_bandwidth: Hertz(2.0),
            homing_speed: TurnsPerSec(0.25),
            anticogging: AnticoggingConfig::default(),
            gain_scheduling_width: TurnsPerSec(10.0),
            enable_gain_scheduling: false,
            enable_vel_limit: true,
            enable_overspeed_error: true,
            enable_torque_mode_vel_limit: true,
            mirror_axis: None,
            mirror_ratio: 1.0,
            load_encoder: None,
        }
    }
}
