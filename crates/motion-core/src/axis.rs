//! Logical axis model: units, limits, and the linear/rotary distinction.

#[cfg(not(feature = "std"))]
use core::f32::consts::PI;
#[cfg(feature = "std")]
use std::f32::consts::PI;

pub const NUM_AXES: usize = 6;

/// Identifiers for the six logical machine axes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum AxisId {
    X,
    Y,
    Z,
    A,
    B,
    C,
}

impl AxisId {
    pub const ALL: [AxisId; NUM_AXES] = [
        AxisId::X,
        AxisId::Y,
        AxisId::Z,
        AxisId::A,
        AxisId::B,
        AxisId::C,
    ];

    pub const fn index(self) -> usize {
        match self {
            AxisId::X => 0,
            AxisId::Y => 1,
            AxisId::Z => 2,
            AxisId::A => 3,
            AxisId::B => 4,
            AxisId::C => 5,
        }
    }

    /// Parses the shell's single-letter axis token (`x|y|z|a|b|c`).
    pub fn from_token(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'x' => Some(AxisId::X),
            'y' => Some(AxisId::Y),
            'z' => Some(AxisId::Z),
            'a' => Some(AxisId::A),
            'b' => Some(AxisId::B),
            'c' => Some(AxisId::C),
            _ => None,
        }
    }
}

/// Whether an axis participates in coordinated motion, and how.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum AxisMode {
    Disabled,
    #[default]
    Standard,
    /// Present in the machine but excluded from jerk/junction planning math.
    Inhibited,
    /// A rotary axis whose angular travel is converted to an equivalent
    /// linear distance via its `radius` for planning purposes.
    RadiusRotary,
}

/// Homing switch behavior for an axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum HomingSwitchMode {
    #[default]
    None,
    NormallyOpen,
    NormallyClosed,
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct HomingParams {
    pub search_velocity: f32,
    pub latch_velocity: f32,
    pub backoff: f32,
    pub switch_mode: HomingSwitchMode,
}

impl Default for HomingParams {
    fn default() -> Self {
        Self {
            search_velocity: 0.0,
            latch_velocity: 0.0,
            backoff: 0.0,
            switch_mode: HomingSwitchMode::None,
        }
    }
}

/// Per-axis configuration and kinematic limits. All lengths are stored
/// canonically in millimeters regardless of the shell's active units mode.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Axis {
    pub mode: AxisMode,
    pub velocity_max: f32,
    pub feed_max: f32,
    pub travel_max: f32,
    pub jerk_max: f32,
    pub homing_jerk: f32,
    pub junction_deviation: f32,
    pub homing: HomingParams,
    /// Radius in mm, used only when `mode == RadiusRotary`.
    pub radius: f32,
}

impl Default for Axis {
    fn default() -> Self {
        Self {
            mode: AxisMode::Standard,
            velocity_max: 0.0,
            feed_max: 0.0,
            travel_max: 0.0,
            jerk_max: 0.0,
            homing_jerk: 0.0,
            junction_deviation: 0.05,
            homing: HomingParams::default(),
            radius: 0.0,
        }
    }
}

impl Axis {
    /// `feed_max <= velocity_max`; `jerk_max > 0` whenever the axis is enabled.
    pub fn is_valid(&self) -> bool {
        if self.mode == AxisMode::Disabled {
            return true;
        }
        self.feed_max <= self.velocity_max && self.jerk_max > 0.0
    }

    /// Converts an angular travel (degrees) into its linear equivalent for a
    /// rotary axis in radius mode.
    pub fn angular_to_linear(&self, degrees: f32) -> f32 {
        degrees * self.radius * PI / 180.0
    }
}
