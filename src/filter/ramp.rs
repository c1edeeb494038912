//! Rate-of-change limiting.
//!
//! `slew_toward` bounds a single step of a setpoint toward its target;
//! [`SlewLimiter`] wraps the same math with held state for the final torque
//! output stage, which is ramp-limited every tick regardless of control mode.

/// Move `current` toward `target` by at most `max_step`.
///
/// `max_step` is the per-tick bound (rate × tick period) and must be
/// non-negative.
#[inline]
pub fn slew_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let full_step = target - current;
    current + full_step.clamp(-max_step, max_step)
}

/// Stateful slew-rate limiter.
///
/// Holds the previously emitted value so that consecutive outputs never
/// differ by more than `rate × dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlewLimiter {
    rate: f32,
    last: f32,
}

impl SlewLimiter {
    /// Create a limiter with the given rate (units per second).
    pub fn new(rate: f32) -> Self {
        Self { rate, last: 0.0 }
    }

    /// Change the rate without disturbing the held output.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    /// Advance one tick toward `target`, returning the limited output.
    pub fn step(&mut self, target: f32, dt: f32) -> f32 {
        self.last = slew_toward(self.last, target, self.rate * dt);
        self.last
    }

    /// Force the held output to `value` (used on reset).
    pub fn reset_to(&mut self, value: f32) {
        self.last = value;
    }

    /// The most recently emitted value.
    #[inline]
    pub fn output(&self) -> f32 {
        self.last
    }
}
