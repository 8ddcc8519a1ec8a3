//! Step-domain position feedback.
//!
//! The step generator only knows integer step counts per motor; this module
//! converts those back into canonical machine-unit coordinates so the
//! runtime/shell can report where the machine actually is, independent of
//! the commanded (`SegmentRuntime`) position.

use crate::axis::{AxisId, NUM_AXES};
use crate::motor::{Motor, NUM_MOTORS};

/// Tracks each motor's step count and projects it back to axis-space.
#[derive(Debug, Default, Clone, Copy)]
pub struct EncoderState {
    steps: [i32; NUM_MOTORS],
}

impl EncoderState {
    pub fn new() -> Self {
        Self { steps: [0; NUM_MOTORS] }
    }

    /// Refreshes every motor's step count from the step generator (e.g.
    /// `StepperController::get_position`).
    pub fn update(&mut self, motor_positions: [i32; NUM_MOTORS]) {
        self.steps = motor_positions;
    }

    pub fn motor_steps(&self, motor: usize) -> Option<i32> {
        self.steps.get(motor).copied()
    }

    /// Projects the tracked step counts back into machine-unit coordinates.
    /// Axes driven by more than one motor (gantry slaving) take the first
    /// mapped motor as authoritative; an axis with no motor maps to 0.
    pub fn position(&self, motors: &[Motor; NUM_MOTORS]) -> [f32; NUM_AXES] {
        let mut position = [0.0f32; NUM_AXES];
        let mut seen = [false; NUM_AXES];
        for (i, motor) in motors.iter().enumerate() {
            let axis_idx = motor.axis.index();
            if seen[axis_idx] {
                continue;
            }
            let spu = motor.steps_per_unit();
            if spu.abs() > 1e-9 {
                position[axis_idx] = self.steps[i] as f32 / spu;
                seen[axis_idx] = true;
            }
        }
        position
    }

    /// Following error between commanded and encoder-derived position for a
    /// single axis, in machine units.
    pub fn following_error(&self, axis: AxisId, commanded: [f32; NUM_AXES], motors: &[Motor; NUM_MOTORS]) -> f32 {
        let actual = self.position(motors);
        actual[axis.index()] - commanded[axis.index()]
    }
}
