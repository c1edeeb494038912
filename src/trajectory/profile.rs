//! Trapezoidal motion profile calculation.
//!
//! Plans a time-parameterized velocity trapezoid between a start state
//! (position and velocity) and a goal position, honoring independent
//! acceleration/deceleration bounds and a cruise velocity limit. Handles a
//! nonzero entry velocity, including entering faster than the cruise limit
//! or moving away from the goal.

use libm::{copysignf, fabsf, sqrtf};

/// One sample of a planned profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    /// Position [turn].
    pub pos: f32,
    /// Velocity [turn/s].
    pub vel: f32,
    /// Acceleration [turn/s²] (feeds the inertia feed-forward term).
    pub accel: f32,
}

/// Computed trapezoidal profile for one move.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapezoidalProfile {
    start_pos: f32,
    start_vel: f32,
    end_pos: f32,

    /// Signed acceleration during the entry phase.
    accel_rate: f32,
    /// Signed cruise velocity.
    cruise_vel: f32,
    /// Signed deceleration during the exit phase.
    decel_rate: f32,

    t_accel: f32,
    t_cruise: f32,
    t_decel: f32,
    t_total: f32,

    /// Position at the end of the entry phase.
    accel_end_pos: f32,
}

/// Hard sign: returns ±1.0, mapping zero to +1.0.
#[inline]
fn sign_hard(value: f32) -> f32 {
    if value >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

impl TrapezoidalProfile {
    /// Plan a move from `(start_pos, start_vel)` to `goal`.
    ///
    /// `vel_limit`, `accel_limit` and `decel_limit` must be positive;
    /// non-positive bounds degenerate to an immediate hold at the start
    /// position.
    pub fn plan(
        goal: f32,
        start_pos: f32,
        start_vel: f32,
        vel_limit: f32,
        accel_limit: f32,
        decel_limit: f32,
    ) -> Self {
        if vel_limit <= 0.0 || accel_limit <= 0.0 || decel_limit <= 0.0 {
            return Self::hold(start_pos);
        }

        let dx = goal - start_pos;

        // Distance covered by braking to rest from the entry velocity; the
        // move direction must account for it or a fast entry overshoots.
        let stop_dist = (start_vel * start_vel) / (2.0 * decel_limit);
        let dx_stop = copysignf(stop_dist, start_vel);
        let s = sign_hard(dx - dx_stop);

        let mut accel_rate = s * accel_limit;
        let mut cruise_vel = s * vel_limit;
        let decel_rate = -s * decel_limit;

        // Entering faster than cruise: the entry phase decelerates onto it.
        if s * start_vel > s * cruise_vel {
            accel_rate = -accel_rate;
        }

        let mut t_accel = (cruise_vel - start_vel) / accel_rate;
        let mut t_decel = -cruise_vel / decel_rate;
        let dx_min = 0.5 * t_accel * (cruise_vel + start_vel) + 0.5 * t_decel * cruise_vel;

        let t_cruise = if s * dx < s * dx_min {
            // Too short to reach cruise velocity: triangle profile.
            let denom = decel_rate - accel_rate;
            if fabsf(denom) > f32::EPSILON {
                let peak_sq = (decel_rate * start_vel * start_vel
                    + 2.0 * accel_rate * decel_rate * dx)
                    / denom;
                cruise_vel = s * sqrtf(if peak_sq > 0.0 { peak_sq } else { 0.0 });
            } else {
                // Entry and exit rates coincide (decelerating entry); the
                // move collapses to a single braking ramp.
                cruise_vel = start_vel;
            }
            t_accel = ((cruise_vel - start_vel) / accel_rate).max(0.0);
            t_decel = (-cruise_vel / decel_rate).max(0.0);
            0.0
        } else {
            (dx - dx_min) / cruise_vel
        };

        let t_total = t_accel + t_cruise + t_decel;
        let accel_end_pos =
            start_pos + start_vel * t_accel + 0.5 * accel_rate * t_accel * t_accel;

        Self {
            start_pos,
            start_vel,
            end_pos: goal,
            accel_rate,
            cruise_vel,
            decel_rate,
            t_accel,
            t_cruise,
            t_decel,
            t_total,
            accel_end_pos,
        }
    }

    /// A zero-duration profile holding `pos`.
    pub fn hold(pos: f32) -> Self {
        Self {
            start_pos: pos,
            start_vel: 0.0,
            end_pos: pos,
            accel_rate: 0.0,
            cruise_vel: 0.0,
            decel_rate: 0.0,
            t_accel: 0.0,
            t_cruise: 0.0,
            t_decel: 0.0,
            t_total: 0.0,
            accel_end_pos: pos,
        }
    }

    /// Evaluate the profile at time `t` seconds from the start of the move.
    ///
    /// Times past the total duration hold the goal at zero velocity.
    pub fn eval(&self, t: f32) -> ProfilePoint {
        if t < 0.0 {
            ProfilePoint {
                pos: self.start_pos,
                vel: self.start_vel,
                accel: 0.0,
            }
        } else if t < self.t_accel {
            ProfilePoint {
                pos: self.start_pos + self.start_vel * t + 0.5 * self.accel_rate * t * t,
                vel: self.start_vel + self.accel_rate * t,
                accel: self.accel_rate,
            }
        } else if t < self.t_accel + self.t_cruise {
            ProfilePoint {
                pos: self.accel_end_pos + self.cruise_vel * (t - self.t_accel),
                vel: self.cruise_vel,
                accel: 0.0,
            }
        } else if t < self.t_total {
            // Deceleration phase, integrated backward from the goal.
            let td = t - self.t_total;
            ProfilePoint {
                pos: self.end_pos + 0.5 * self.decel_rate * td * td,
                vel: self.decel_rate * td,
                accel: self.decel_rate,
            }
        } else {
            ProfilePoint {
                pos: self.end_pos,
                vel: 0.0,
                accel: 0.0,
            }
        }
    }

    /// Total duration of the move in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.t_total
    }

    /// Goal position of the move.
    #[inline]
    pub fn goal(&self) -> f32 {
        self.end_pos
    }

    /// Whether the profile covers no distance and no time.
    #[inline]
    pub fn is_hold(&self) -> bool {
        self.t_total <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_all_phases(profile: &TrapezoidalProfile, steps: usize) -> Vec<ProfilePoint> {
        let dt = profile.duration() / steps as f32;
        (0..=steps).map(|i| profile.eval(i as f32 * dt)).collect()
    }

    #[test]
    fn test_long_move_reaches_cruise() {
        let profile = TrapezoidalProfile::plan(10.0, 0.0, 0.0, 2.0, 1.0, 1.0);

        // Accelerate 2 s to 2 turn/s (2 turns), cruise, brake 2 s (2 turns):
        // 6 turns at cruise → 3 s of cruise, 7 s total.
        assert!((profile.duration() - 7.0).abs() < 1e-4);

        let mid = profile.eval(3.5);
        assert!((mid.vel - 2.0).abs() < 1e-4);
        assert!(mid.accel.abs() < 1e-6);
    }

    #[test]
    fn test_short_move_is_triangle() {
        let profile = TrapezoidalProfile::plan(1.0, 0.0, 0.0, 10.0, 1.0, 1.0);

        // Peak velocity √(ΔX·a) = 1 turn/s, never reaching the 10 turn/s limit.
        let peak = sample_all_phases(&profile, 100)
            .iter()
            .map(|p| p.vel)
            .fold(0.0f32, f32::max);
        assert!(peak < 1.1);
        assert!((profile.duration() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_negative_direction() {
        let profile = TrapezoidalProfile::plan(-5.0, 0.0, 0.0, 2.0, 1.0, 1.0);

        let mid = profile.eval(profile.duration() * 0.5);
        assert!(mid.vel < 0.0);
        assert!((profile.eval(profile.duration()).pos + 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_entry_velocity_continuity() {
        let profile = TrapezoidalProfile::plan(10.0, 0.0, 1.5, 2.0, 1.0, 1.0);

        let start = profile.eval(0.0);
        assert!((start.pos - 0.0).abs() < 1e-6);
        assert!((start.vel - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_overspeed_entry_decelerates_onto_cruise() {
        // Entering at 4 turn/s with a 2 turn/s limit: the entry phase must
        // brake down to cruise, not accelerate.
        let profile = TrapezoidalProfile::plan(20.0, 0.0, 4.0, 2.0, 1.0, 1.0);

        let early = profile.eval(0.5);
        assert!(early.vel < 4.0);
        assert!(early.accel < 0.0);

        let end = profile.eval(profile.duration());
        assert!((end.pos - 20.0).abs() < 1e-3);
        assert!(end.vel.abs() < 1e-6);
    }

    #[test]
    fn test_phase_continuity() {
        let profile = TrapezoidalProfile::plan(3.0, -1.0, 0.5, 1.5, 2.0, 1.0);
        let samples = sample_all_phases(&profile, 1000);
        let dt = profile.duration() / 1000.0;

        for pair in samples.windows(2) {
            let dpos = fabsf(pair[1].pos - pair[0].pos);
            let dvel = fabsf(pair[1].vel - pair[0].vel);
            // Bounded by the velocity/acceleration limits plus slack.
            assert!(dpos <= 2.0 * dt + 1e-4, "position jump: {}", dpos);
            assert!(dvel <= 2.5 * dt + 1e-4, "velocity jump: {}", dvel);
        }
    }

    #[test]
    fn test_terminal_state() {
        let profile = TrapezoidalProfile::plan(2.5, 0.5, 0.0, 1.0, 0.5, 0.5);
        let end = profile.eval(profile.duration() + 1.0);

        assert!((end.pos - 2.5).abs() < 1e-6);
        assert!(end.vel.abs() < 1e-6);
        assert!(end.accel.abs() < 1e-6);
    }

    #[test]
    fn test_zero_length_move() {
        let profile = TrapezoidalProfile::plan(1.0, 1.0, 0.0, 2.0, 1.0, 1.0);

        assert!(profile.is_hold());
        assert!((profile.eval(0.0).pos - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_limits_degenerate_to_hold() {
        let profile = TrapezoidalProfile::plan(5.0, 1.0, 0.0, 0.0, 1.0, 1.0);

        assert!(profile.is_hold());
        assert!((profile.goal() - 1.0).abs() < 1e-6);
    }
}
