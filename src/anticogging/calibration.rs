//! Anticogging calibration sweep.
//!
//! Drives the learning procedure for the cogging table: the controller runs a
//! closed velocity loop at the sweep velocity while this state machine bins
//! the loop's torque demand by position, filters the velocity-error
//! magnitude, and ramps the sweep velocity and integrator gain from their
//! start values toward their end values as the error decays. Calibration
//! completes when the filtered error stays below the configured tolerance
//! for one full mechanical turn.

use libm::{fabsf, floorf};

use crate::config::{AnticoggingConfig, ControlMode, InputMode};

use super::table::CoggingTable;

/// First-order filter bandwidth applied to |velocity error| [rad/s].
const ERROR_FILTER_BANDWIDTH: f32 = 0.4;

/// Calibration procedure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationState {
    /// No sweep running and none finished.
    #[default]
    Idle,
    /// Sweep in progress.
    Calibrating,
    /// Sweep converged; the table is valid.
    Done,
    /// Sweep ended without converging; the table is not valid.
    Aborted,
}

/// Outcome of one calibration tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationProgress {
    /// No sweep is running.
    Inactive,
    /// Sweep still converging.
    Running,
    /// Sweep converged this tick; restore the saved modes.
    Finished,
    /// Sweep lost its estimates this tick; restore and latch the fault.
    Aborted,
}

/// Resumable anticogging calibration state machine.
#[derive(Debug, Clone)]
pub struct CoggingCalibration {
    state: CalibrationState,

    /// Filtered |velocity error| [turn/s].
    vel_error_filtered: f32,
    /// Largest filtered error seen this sweep; anchors the gain ramp.
    error_max: f32,
    /// Position estimate when the sweep started [turn].
    start_pos: f32,
    /// Full turns swept so far.
    turn_count: u32,
    /// Swept distance at which the filtered error last dropped below
    /// tolerance; cleared whenever it rises back above.
    below_tolerance_since: Option<f32>,

    /// Current sweep velocity command [turn/s].
    sweep_vel: f32,
    /// Current velocity integrator gain.
    integrator_gain: f32,

    /// Control mode to restore when the sweep ends.
    saved_control_mode: ControlMode,
    /// Input mode to restore when the sweep ends.
    saved_input_mode: InputMode,
}

impl Default for CoggingCalibration {
    fn default() -> Self {
        Self::new()
    }
}

impl CoggingCalibration {
    /// Create an idle calibration machine.
    pub fn new() -> Self {
        Self {
            state: CalibrationState::Idle,
            vel_error_filtered: 0.0,
            error_max: 0.0,
            start_pos: 0.0,
            turn_count: 0,
            below_tolerance_since: None,
            sweep_vel: 0.0,
            integrator_gain: 0.0,
            saved_control_mode: ControlMode::Position,
            saved_input_mode: InputMode::Passthrough,
        }
    }

    /// Begin a sweep from `start_pos`, remembering the control and input
    /// modes to restore afterwards.
    pub fn begin(
        &mut self,
        config: &AnticoggingConfig,
        saved_control_mode: ControlMode,
        saved_input_mode: InputMode,
        start_pos: f32,
    ) {
        self.state = CalibrationState::Calibrating;
        self.vel_error_filtered = 0.0;
        self.error_max = 0.0;
        self.start_pos = start_pos;
        self.turn_count = 0;
        self.below_tolerance_since = None;
        self.sweep_vel = config.start_vel.value();
        self.integrator_gain = config.start_gain;
        self.saved_control_mode = saved_control_mode;
        self.saved_input_mode = saved_input_mode;

        #[cfg(feature = "defmt")]
        defmt::info!("anticogging sweep started at {} turn/s", self.sweep_vel);
    }

    /// Advance the sweep one tick.
    ///
    /// `torque_sample` is the total torque holding the sweep at this
    /// position (loop demand plus any compensation already applied).
    pub fn tick(
        &mut self,
        config: &AnticoggingConfig,
        table: &mut CoggingTable,
        pos_estimate: Option<f32>,
        vel_error: f32,
        torque_sample: f32,
        dt: f32,
    ) -> CalibrationProgress {
        if self.state != CalibrationState::Calibrating {
            return CalibrationProgress::Inactive;
        }

        let pos = match pos_estimate {
            Some(pos) => pos,
            None => {
                self.state = CalibrationState::Aborted;
                #[cfg(feature = "defmt")]
                defmt::warn!("anticogging sweep aborted: missing position estimate");
                return CalibrationProgress::Aborted;
            }
        };

        // Filter the error magnitude and remember the sweep's worst case.
        let alpha = (ERROR_FILTER_BANDWIDTH * dt).clamp(0.0, 1.0);
        self.vel_error_filtered += (fabsf(vel_error) - self.vel_error_filtered) * alpha;
        self.error_max = self.error_max.max(self.vel_error_filtered);

        let swept = fabsf(pos - self.start_pos);
        self.turn_count = floorf(swept) as u32;

        let bucket = table.bucket_for(pos);
        table.accumulate(bucket, torque_sample, self.turn_count);

        // Ramp velocity and gain from start toward end as the filtered error
        // falls from its peak toward the tolerance.
        let progress = if self.error_max > config.end_tolerance {
            ((self.error_max - self.vel_error_filtered)
                / (self.error_max - config.end_tolerance))
                .clamp(0.0, 1.0)
        } else {
            0.0
        };
        let start_vel = config.start_vel.value();
        let end_vel = config.end_vel.value();
        self.sweep_vel = start_vel + (end_vel - start_vel) * progress;
        self.integrator_gain =
            config.start_gain + (config.end_gain - config.start_gain) * progress;

        // Converged once the filtered error has stayed below tolerance for a
        // full turn.
        if self.vel_error_filtered < config.end_tolerance {
            let since = *self.below_tolerance_since.get_or_insert(swept);
            if swept - since >= 1.0 {
                self.state = CalibrationState::Done;
                #[cfg(feature = "defmt")]
                defmt::info!(
                    "anticogging sweep converged after {} turns",
                    self.turn_count
                );
                return CalibrationProgress::Finished;
            }
        } else {
            self.below_tolerance_since = None;
        }

        CalibrationProgress::Running
    }

    /// Abandon the sweep, discarding partial convergence. Returns to idle.
    pub fn stop(&mut self) {
        #[cfg(feature = "defmt")]
        if self.state == CalibrationState::Calibrating {
            defmt::info!("anticogging sweep stopped");
        }
        self.state = CalibrationState::Idle;
        self.below_tolerance_since = None;
    }

    /// Procedure state.
    #[inline]
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Whether a sweep is in progress.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == CalibrationState::Calibrating
    }

    /// Current sweep velocity command [turn/s].
    #[inline]
    pub fn sweep_vel(&self) -> f32 {
        self.sweep_vel
    }

    /// Current velocity integrator gain for the sweep.
    #[inline]
    pub fn integrator_gain(&self) -> f32 {
        self.integrator_gain
    }

    /// Filtered |velocity error| [turn/s].
    #[inline]
    pub fn average_error(&self) -> f32 {
        self.vel_error_filtered
    }

    /// Full turns swept.
    #[inline]
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Control mode to restore when the sweep ends.
    #[inline]
    pub fn saved_control_mode(&self) -> ControlMode {
        self.saved_control_mode
    }

    /// Input mode to restore when the sweep ends.
    #[inline]
    pub fn saved_input_mode(&self) -> InputMode {
        self.saved_input_mode
    }
}
