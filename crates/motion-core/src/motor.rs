//! Physical motor model: step geometry, polarity, and axis mapping.

use crate::axis::AxisId;
use step_gen::PowerMode;

pub const NUM_MOTORS: usize = 6;
pub const ALLOWED_MICROSTEPS: [u8; 4] = [1, 2, 4, 8];

/// Identifies one of up to six physical motors (the shell's digit tokens `1..6`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MotorId(pub u8);

impl MotorId {
    pub fn from_token(digit: char) -> Option<Self> {
        let d = digit.to_digit(10)?;
        if (1..=NUM_MOTORS as u32).contains(&d) {
            Some(MotorId((d - 1) as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single physical stepper motor: its step geometry and which logical axis
/// it slaves to. Multiple motors may map to the same axis (gantry slaving).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Motor {
    pub axis: AxisId,
    /// Degrees per full step (e.g. 1.8 for a standard NEMA motor).
    pub step_angle: f32,
    pub travel_per_rev: f32,
    pub microsteps: u8,
    /// When true, the direction line sent to the step generator is inverted.
    pub inverted: bool,
    pub power_mode: PowerMode,
}

impl Default for Motor {
    fn default() -> Self {
        Self {
            axis: AxisId::X,
            step_angle: 1.8,
            travel_per_rev: 1.0,
            microsteps: 1,
            inverted: false,
            power_mode: PowerMode::AlwaysOn,
        }
    }
}

impl Motor {
    /// `steps_per_unit = 360 / (step_angle / microsteps) / travel_per_rev`,
    /// recomputed whenever the underlying geometry changes.
    pub fn steps_per_unit(&self) -> f32 {
        let full_steps_per_rev = 360.0 / self.step_angle;
        let microstepped_steps_per_rev = full_steps_per_rev * self.microsteps as f32;
        microstepped_steps_per_rev / self.travel_per_rev
    }

    /// True if `microsteps` is one of the supported hardware divisors; an
    /// unsupported value is still accepted by the setter, only warned about.
    pub fn has_supported_microsteps(&self) -> bool {
        ALLOWED_MICROSTEPS.contains(&self.microsteps)
    }
}
