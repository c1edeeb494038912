//! Anticogging compensation for servo-control.
//!
//! Provides the learned torque-vs-position table and the calibration sweep
//! that fills it.

mod calibration;
mod table;

pub use calibration::{CalibrationProgress, CalibrationState, CoggingCalibration};
pub use table::{CoggingTable, COGGING_MAP_LEN};
