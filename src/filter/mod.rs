//! Input shaping for servo-control.
//!
//! Provides the second-order input tracking filter and slew-rate limiting.

mod input_filter;
mod ramp;

pub use input_filter::InputFilter;
pub use ramp::{slew_toward, SlewLimiter};
