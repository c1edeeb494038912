//! Remote-callable command surface.
//!
//! The configuration/telemetry collaborator drives the controller through
//! this trait: fire-and-forget commands whose effect is observed through
//! subsequent state (fault code, completion flags, table contents) rather
//! than a synchronous return value, plus the bounds-checked cogging table
//! accessors.

use crate::anticogging::CalibrationState;
use crate::error::{Fault, Result};

use super::controller::Controller;

/// Command and property surface exposed to the remote collaborator.
pub trait ControlInterface {
    /// Set the external position input [turn].
    fn set_input_pos(&mut self, pos: f32);

    /// Set the external velocity input [turn/s].
    fn set_input_vel(&mut self, vel: f32);

    /// Set the external torque input [Nm].
    fn set_input_torque(&mut self, torque: f32);

    /// Start a trapezoidal move to an absolute goal [turn].
    fn move_to_pos(&mut self, goal: f32);

    /// Start a move displaced from the previous goal or the position
    /// estimate.
    fn move_incremental(&mut self, displacement: f32, from_goal_point: bool);

    /// Start the anticogging calibration sweep.
    fn start_anticogging_calibration(&mut self) -> Result<()>;

    /// Abort a running anticogging calibration sweep.
    fn stop_anticogging_calibration(&mut self);

    /// Read a cogging table bucket (out-of-range indices rejected).
    fn anticogging_get_val(&self, index: u32) -> Result<f32>;

    /// Write a cogging table bucket (out-of-range indices rejected).
    fn anticogging_set_val(&mut self, index: u32, value: f32) -> Result<()>;

    /// Remove the cogging table's net torque bias.
    fn anticogging_remove_bias(&mut self);

    /// The latched fault, if any.
    fn fault(&self) -> Option<Fault>;

    /// Whether the last commanded move has completed.
    fn trajectory_done(&self) -> bool;

    /// Calibration procedure state.
    fn calibration_state(&self) -> CalibrationState;
}

impl ControlInterface for Controller {
    fn set_input_pos(&mut self, pos: f32) {
        Controller::set_input_pos(self, pos);
    }

    fn set_input_vel(&mut self, vel: f32) {
        Controller::set_input_vel(self, vel);
    }

    fn set_input_torque(&mut self, torque: f32) {
        Controller::set_input_torque(self, torque);
    }

    fn move_to_pos(&mut self, goal: f32) {
        Controller::move_to_pos(self, goal);
    }

    fn move_incremental(&mut self, displacement: f32, from_goal_point: bool) {
        Controller::move_incremental(self, displacement, from_goal_point);
    }

    fn start_anticogging_calibration(&mut self) -> Result<()> {
        Controller::start_anticogging_calibration(self)
    }

    fn stop_anticogging_calibration(&mut self) {
        Controller::stop_anticogging_calibration(self);
    }

    fn anticogging_get_val(&self, index: u32) -> Result<f32> {
        Controller::anticogging_get_val(self, index)
    }

    fn anticogging_set_val(&mut self, index: u32, value: f32) -> Result<()> {
        Controller::anticogging_set_val(self, index, value)
    }

    fn anticogging_remove_bias(&mut self) {
        Controller::anticogging_remove_bias(self);
    }

    fn fault(&self) -> Option<Fault> {
        Controller::fault(self)
    }

    fn trajectory_done(&self) -> bool {
        Controller::trajectory_done(self)
    }

    fn calibration_state(&self) -> CalibrationState {
        Controller::calibration_state(self)
    }
}
