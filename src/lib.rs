//! # servo-control
//!
//! Cascaded outer-loop servo control for motor drives: position → velocity →
//! torque, executed once per fixed-period control tick.
//!
//! ## Features
//!
//! - **Cascaded control loop**: position, velocity and torque modes, each a
//!   superset of the one below, with velocity limiting and integral control
//! - **Trajectory planning**: trapezoidal moves with nonzero entry velocity
//!   and atomic supersede
//! - **Anticogging**: per-position feed-forward table with a closed-loop
//!   calibration sweep
//! - **Input shaping**: second-order input filter, velocity/torque ramps,
//!   cross-axis mirroring
//! - **Deterministic ticks**: no allocation, no blocking; faults latch and
//!   the tick always completes
//! - **no_std compatible**: the core library works without the standard
//!   library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use servo_control::{AxisContext, Controller, load_config};
//!
//! // Load and commit a validated configuration
//! let config = load_config("axis0.toml")?;
//! let mut controller = Controller::new(AxisContext::single_axis(), 1.0 / 8000.0);
//! controller.apply_config(config)?;
//!
//! // Each control tick: estimates in, ramp-limited torque out
//! controller.pos_estimate_linear.write(pos_estimate);
//! controller.vel_estimate.write(vel_estimate);
//! controller.update(None);
//! let torque = controller.torque_output.read();
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `alloc`: Enables heap allocation for no_std with allocator
//! - `defmt`: Enables defmt logging for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod anticogging;
pub mod config;
pub mod control;
pub mod error;
pub mod filter;
pub mod gain_scheduling;
pub mod trajectory;

// Re-exports for ergonomic API
pub use anticogging::{CalibrationState, CoggingTable, COGGING_MAP_LEN};
pub use config::{validate_config, AnticoggingConfig, ControlMode, ControllerConfig, InputMode};
pub use control::{AxisContext, ControlInterface, Controller, Setpoints, ValuePort};
pub use error::{CommandError, ConfigError, Error, Fault, Result};
pub use gain_scheduling::GainScheduler;
pub use trajectory::{TrajectoryPlanner, TrapezoidalProfile};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{
    Hertz, NewtonMeters, NewtonMetersPerSec, Turns, TurnsPerSec, TurnsPerSecSquared,
};
