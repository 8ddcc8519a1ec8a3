//! Cornering velocity ("junction deviation") model.
//!
//! Given the unit vectors of two adjacent line blocks and the junction
//! deviation configured for the axes involved, computes the maximum velocity
//! the machine may carry through the corner without exceeding the implied
//! centripetal acceleration.

#[cfg(not(feature = "std"))]
use libm::{fabsf, sqrtf};
#[cfg(feature = "std")]
fn fabsf(x: f32) -> f32 {
    x.abs()
}
#[cfg(feature = "std")]
fn sqrtf(x: f32) -> f32 {
    x.sqrt()
}

use crate::axis::NUM_AXES;

/// Computes the maximum junction velocity between two unit-vector moves.
///
/// `min_accel` is the smaller of the two blocks' acceleration ceilings;
/// `junction_deviation` is the configured cornering tolerance (mm). A 180°
/// direction reversal (`cos_theta == -1`) drives the result to zero; a
/// straight-through move (`cos_theta == 1`) returns `max_v` unchanged.
pub fn cornering_velocity(
    unit1: &[f32; NUM_AXES],
    unit2: &[f32; NUM_AXES],
    junction_deviation: f32,
    min_accel: f32,
    max_v: f32,
) -> f32 {
    let dot_product: f32 = unit1.iter().zip(unit2.iter()).map(|(a, b)| a * b).sum();
    let cos_theta = dot_product.clamp(-1.0, 1.0);

    // cos_theta == 1.0: collinear, no velocity reduction needed.
    if cos_theta >= 1.0 - 1e-9 {
        return max_v;
    }

    // Classic TinyG-style junction velocity: treat the corner as an arc of
    // radius R such that centripetal acceleration at velocity v equals
    // min_accel, where R is derived from junction_deviation and the half
    // angle between the two unit vectors.
    let sine_half_angle = sqrtf(((1.0 + cos_theta) * 0.5).max(0.0));
    if sine_half_angle < 1e-9 {
        // cos_theta == -1.0: a full reversal, physically requires a stop.
        return 0.0;
    }
    let radius = junction_deviation * sine_half_angle / (1.0 - sine_half_angle).max(1e-6);
    let junction_v = sqrtf(fabsf(min_accel) * radius);

    junction_v.min(max_v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_vec(x: f32, y: f32) -> [f32; NUM_AXES] {
        [x, y, 0.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn collinear_move_keeps_full_speed() {
        let v = cornering_velocity(&axis_vec(1.0, 0.0), &axis_vec(1.0, 0.0), 0.05, 1000.0, 500.0);
        assert!((v - 500.0).abs() < 1e-3);
    }

    #[test]
    fn reversal_forces_full_stop() {
        let v = cornering_velocity(&axis_vec(1.0, 0.0), &axis_vec(-1.0, 0.0), 0.05, 1000.0, 500.0);
        assert!(v < 1e-3);
    }

    #[test]
    fn right_angle_corner_is_capped_below_max() {
        let v = cornering_velocity(&axis_vec(1.0, 0.0), &axis_vec(0.0, 1.0), 0.05, 1000.0, 500.0);
        assert!(v > 0.0 && v < 500.0);
    }

    #[test]
    fn smaller_junction_deviation_lowers_cornering_speed() {
        let v_loose = cornering_velocity(&axis_vec(1.0, 0.0), &axis_vec(0.0, 1.0), 0.2, 1000.0, 500.0);
        let v_tight = cornering_velocity(&axis_vec(1.0, 0.0), &axis_vec(0.0, 1.0), 0.02, 1000.0, 500.0);
        assert!(v_tight < v_loose);
    }
}
