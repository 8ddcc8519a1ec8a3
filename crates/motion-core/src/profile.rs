//! Seven-section, jerk-limited S-curve velocity profile.
//!
//! Every line block decomposes into up to seven sections: a jerk-ramp into
//! acceleration (`t_j1`), constant acceleration (`t_a`), a jerk-ramp out of
//! acceleration (`t_j2`), constant cruise (`t_c`), a jerk-ramp into
//! deceleration (`t_j3`), constant deceleration (`t_d`), and a jerk-ramp back
//! to the exit velocity (`t_j4`). Sections with zero duration simply
//! contribute nothing to the evaluated position/velocity.

#[cfg(not(feature = "std"))]
use libm::{fabsf, fminf, sqrtf};
#[cfg(feature = "std")]
fn fabsf(x: f32) -> f32 {
    x.abs()
}
#[cfg(feature = "std")]
fn fminf(a: f32, b: f32) -> f32 {
    a.min(b)
}
#[cfg(feature = "std")]
fn sqrtf(x: f32) -> f32 {
    x.sqrt()
}

/// Timing and velocity parameters for one block's motion profile.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Profile {
    pub distance: f32,
    pub start_v: f32,
    pub cruise_v: f32,
    pub end_v: f32,
    pub accel: f32,
    pub jerk: f32,
    pub t_j1: f32,
    pub t_a: f32,
    pub t_j2: f32,
    pub t_c: f32,
    pub t_j3: f32,
    pub t_d: f32,
    pub t_j4: f32,
}

impl Profile {
    pub fn new(distance: f32, start_v: f32, cruise_v: f32, end_v: f32, accel: f32, jerk: f32) -> Self {
        let mut p = Self {
            distance,
            start_v,
            cruise_v,
            end_v,
            accel,
            jerk,
            ..Default::default()
        };
        p.recalculate_timing();
        p
    }

    /// Total duration of the profile in seconds.
    pub fn total_time(&self) -> f32 {
        self.t_j1 + self.t_a + self.t_j2 + self.t_c + self.t_j3 + self.t_d + self.t_j4
    }

    /// Recomputes section durations from `distance`/`start_v`/`cruise_v`/`end_v`,
    /// choosing a trapezoid (with a cruise section) or a triangle (cruise
    /// velocity reduced until head and tail consume the whole distance).
    pub fn recalculate_timing(&mut self) {
        let accel_dist = (self.cruise_v * self.cruise_v - self.start_v * self.start_v) / (2.0 * self.accel);
        let decel_dist = (self.cruise_v * self.cruise_v - self.end_v * self.end_v) / (2.0 * self.accel);

        if accel_dist + decel_dist > self.distance {
            // Triangle profile: no cruise.
            self.cruise_v = sqrtf(
                (2.0 * self.accel * self.distance + self.start_v * self.start_v + self.end_v * self.end_v) / 2.0,
            );
            self.t_c = 0.0;
        } else {
            self.t_c = (self.distance - accel_dist - decel_dist) / self.cruise_v.max(1e-9);
        }

        let accel_time = fabsf(self.cruise_v - self.start_v) / self.accel;
        let decel_time = fabsf(self.cruise_v - self.end_v) / self.accel;

        self.t_j1 = fminf(accel_time / 2.0, self.accel / self.jerk);
        self.t_a = accel_time - 2.0 * self.t_j1;
        self.t_j2 = self.t_j1;

        self.t_j3 = fminf(decel_time / 2.0, self.accel / self.jerk);
        self.t_d = decel_time - 2.0 * self.t_j3;
        self.t_j4 = self.t_j3;
    }

    /// Evaluates instantaneous velocity and acceleration at time `t` (seconds)
    /// since the start of the profile, via the seven piecewise sections.
    pub fn velocity_and_accel(&self, t: f32) -> (f32, f32) {
        let j = self.jerk;
        let t1 = self.t_j1;
        let t2 = t1 + self.t_a;
        let t3 = t2 + self.t_j2;
        let t4 = t3 + self.t_c;
        let t5 = t4 + self.t_j3;
        let t6 = t5 + self.t_d;

        if t < t1 {
            (self.start_v + 0.5 * j * t * t, j * t)
        } else if t < t2 {
            (self.start_v + 0.5 * j * t1 * t1 + self.accel * (t - t1), self.accel)
        } else if t < t3 {
            let dt = t3 - t;
            (self.cruise_v - 0.5 * j * dt * dt, j * dt)
        } else if t < t4 {
            (self.cruise_v, 0.0)
        } else if t < t5 {
            let dt = t - t4;
            (self.cruise_v - 0.5 * j * dt * dt, -j * dt)
        } else if t < t6 {
            let dt = t - t5;
            (self.cruise_v - 0.5 * j * self.t_j3 * self.t_j3 - self.accel * dt, -self.accel)
        } else {
            let dt = (self.t_j4 - (t - t6)).max(0.0);
            (self.end_v + 0.5 * j * dt * dt, -j * dt)
        }
    }

    /// `head_length + body_length + tail_length == distance` within float
    /// tolerance: exposed so callers/tests can check the invariant directly.
    pub fn head_body_tail_lengths(&self, samples: u32) -> (f32, f32, f32) {
        let total = self.total_time();
        if total <= 0.0 || samples == 0 {
            return (0.0, self.distance, 0.0);
        }
        let head_end = self.t_j1 + self.t_a + self.t_j2;
        let body_end = head_end + self.t_c;
        let dt = total / samples as f32;
        let (mut head, mut body, mut tail) = (0.0f32, 0.0f32, 0.0f32);
        let mut t = 0.0f32;
        for _ in 0..samples {
            let (v, _) = self.velocity_and_accel(t + dt * 0.5);
            let ds = v * dt;
            if t < head_end {
                head += ds;
            } else if t < body_end {
                body += ds;
            } else {
                tail += ds;
            }
            t += dt;
        }
        (head, body, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapezoid_reaches_cruise_velocity() {
        let p = Profile::new(100.0, 0.0, 20.0, 0.0, 200.0, 50_000.0);
        assert!((p.cruise_v - 20.0).abs() < 1e-3);
        assert!(p.t_c > 0.0);
    }

    #[test]
    fn short_move_degrades_to_triangle() {
        let p = Profile::new(1.0, 0.0, 20.0, 0.0, 200.0, 50_000.0);
        assert_eq!(p.t_c, 0.0);
        assert!(p.cruise_v < 20.0);
    }

    #[test]
    fn velocity_profile_starts_and_ends_at_configured_endpoints() {
        let p = Profile::new(50.0, 2.0, 20.0, 3.0, 200.0, 50_000.0);
        let (v0, _) = p.velocity_and_accel(0.0);
        let (v_end, _) = p.velocity_and_accel(p.total_time());
        assert!((v0 - 2.0).abs() < 0.5);
        assert!((v_end - 3.0).abs() < 0.5);
    }
}
