//! Second-order input tracking filter.
//!
//! Shapes a stepped position input into a smooth setpoint trajectory. The
//! filter is critically damped: its acceleration output combines a stiffness
//! term on the position delta with a damping term on the velocity delta, and
//! the caller integrates that acceleration into its velocity and position
//! setpoints each tick.

/// Derived gains of the second-order input filter.
///
/// Gains are a pure function of the configured bandwidth and the tick rate;
/// they are re-derived explicitly whenever the bandwidth changes, never
/// implicitly during the tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputFilter {
    /// Acceleration per unit position delta.
    stiffness: f32,
    /// Acceleration per unit velocity delta.
    damping: f32,
}

impl InputFilter {
    /// Derive filter gains from a bandwidth in 1/s.
    ///
    /// The effective bandwidth is capped at a quarter of the tick rate to
    /// keep the discrete-time filter stable.
    pub fn from_bandwidth(bandwidth: f32, tick_rate: f32) -> Self {
        let bw = if bandwidth < 0.25 * tick_rate {
            bandwidth
        } else {
            0.25 * tick_rate
        };
        let damping = 2.0 * bw;
        let stiffness = 0.25 * damping * damping;
        Self { stiffness, damping }
    }

    /// Acceleration command for the given position and velocity deltas.
    #[inline]
    pub fn accel(&self, delta_pos: f32, delta_vel: f32) -> f32 {
        self.stiffness * delta_pos + self.damping * delta_vel
    }

    /// Stiffness gain (acceleration per unit position delta).
    #[inline]
    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Damping gain (acceleration per unit velocity delta).
    #[inline]
    pub fn damping(&self) -> f32 {
        self.damping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_derivation() {
        let filter = InputFilter::from_bandwidth(2.0, 8000.0);

        // damping = 2·bw, stiffness = 0.25·damping²
        assert!((filter.damping() - 4.0).abs() < 1e-6);
        assert!((filter.stiffness() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_bandwidth_capped_at_quarter_tick_rate() {
        let filter = InputFilter::from_bandwidth(1000.0, 100.0);

        assert!((filter.damping() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_step_response_converges_without_overshoot() {
        let dt = 1.0 / 1000.0;
        let filter = InputFilter::from_bandwidth(20.0, 1000.0);

        let target = 1.0f32;
        let mut pos = 0.0f32;
        let mut vel = 0.0f32;
        let mut max_pos = 0.0f32;

        for _ in 0..5000 {
            let accel = filter.accel(target - pos, 0.0 - vel);
            vel += dt * accel;
            pos += dt * vel;
            max_pos = max_pos.max(pos);
        }

        assert!((pos - target).abs() < 1e-3, "did not converge: {}", pos);
        // Critically damped: no meaningful overshoot.
        assert!(max_pos < target * 1.05, "overshoot: {}", max_pos);
    }
}
