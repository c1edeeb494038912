//! Configuration module for servo-control.
//!
//! Provides types for loading and validating the controller parameter bundle
//! from TOML files (with `std` feature) or pre-parsed data.

mod anticogging;
mod controller;
#[cfg(feature = "std")]
mod loader;
pub mod units;
mod validation;

pub use anticogging::AnticoggingConfig;
pub use controller::{ControlMode, ControllerConfig, InputMode};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Hertz, NewtonMeters, NewtonMetersPerSec, Turns, TurnsPerSec, TurnsPerSecSquared};
