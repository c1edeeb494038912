//! Anticogging compensation and calibration parameters.
//!
//! The learned torque-vs-position map itself is runtime state
//! ([`CoggingTable`](crate::anticogging::CoggingTable)) and is persisted
//! through the table's indexed accessors by an external storage collaborator;
//! this bundle carries only the calibration procedure's parameters.

use serde::Deserialize;

use super::units::{NewtonMeters, TurnsPerSec};

/// Anticogging feed-forward and calibration sweep configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnticoggingConfig {
    /// Clamp applied to the per-bucket compensation torque [Nm].
    pub max_torque: NewtonMeters,

    /// The table was calibrated (learned here or restored from storage).
    pub pre_calibrated: bool,

    /// Add the compensation feed-forward term each tick when the table is
    /// valid.
    pub enabled: bool,

    /// Calibration sweep velocity at the start of the procedure [turn/s].
    pub start_vel: TurnsPerSec,

    /// Calibration sweep velocity once converged [turn/s].
    pub end_vel: TurnsPerSec,

    /// Velocity integrator gain at the start of the sweep.
    pub start_gain: f32,

    /// Velocity integrator gain once converged.
    pub end_gain: f32,

    /// Mean absolute velocity error below which a full sweep completes
    /// calibration [turn/s].
    pub end_tolerance: f32,
}

impl Default for AnticoggingConfig {
    fn default() -> Self {
        Self {
            max_torque: NewtonMeters(0.15),
            pre_calibrated: false,
            enabled: true,
            start_vel: TurnsPerSec(0.5),
            end_vel: TurnsPerSec(0.05),
            start_gain: 25.0,
            end_gain: 5.0,
            end_tolerance: 0.1,
        }
    }
}
