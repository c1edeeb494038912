//! Control module for servo-control.
//!
//! Provides the per-axis controller, its single-slot value ports, and the
//! remote-callable command surface.

mod controller;
mod interface;
mod ports;

pub use controller::{AxisContext, Controller, Setpoints};
pub use interface::ControlInterface;
pub use ports::ValuePort;
