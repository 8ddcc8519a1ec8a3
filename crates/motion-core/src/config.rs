//! Typed configuration token surface.
//!
//! Resolves shell tokens like `xvm`, `1sa`, `ja`, `ct` to typed get/set calls
//! against the axis/motor model. Parsing `"xvm 1000"` out of shell text is
//! the shell's job, not the core's — this module only speaks typed values.

use crate::axis::{Axis, AxisId, NUM_AXES};
use crate::errors::StatError;
use crate::motor::{Motor, MotorId, NUM_MOTORS};

/// A single configuration value, tagged by the kind of storage it targets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConfigValue {
    U8(u8),
    /// A length, velocity, or acceleration value stored canonically in
    /// millimeters (`flu` in the design notes) and converted at the boundary
    /// according to the active [`UnitsMode`].
    FloatLengthUnit(f32),
    /// A float with no unit conversion (ratios, jerk in mm/s^3, etc).
    FloatRaw(f32),
    Int(i32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum UnitsMode {
    #[default]
    Millimeters,
    Inches,
}

const MM_PER_INCH: f32 = 25.4;

/// The full typed configuration space: per-axis limits, per-motor geometry,
/// and a handful of process-wide planner parameters.
pub struct ConfigTable {
    pub axes: [Axis; NUM_AXES],
    pub motors: [Motor; NUM_MOTORS],
    pub units: UnitsMode,
    pub junction_acceleration: f32,
    pub chordal_tolerance: f32,
}

impl Default for ConfigTable {
    fn default() -> Self {
        Self {
            axes: [Axis::default(); NUM_AXES],
            motors: [Motor::default(); NUM_MOTORS],
            units: UnitsMode::default(),
            junction_acceleration: 1000.0,
            chordal_tolerance: 0.01,
        }
    }
}

enum Target {
    AxisVelocityMax(AxisId),
    AxisFeedMax(AxisId),
    AxisTravelMax(AxisId),
    AxisJerkMax(AxisId),
    AxisJunctionDeviation(AxisId),
    MotorStepAngle(MotorId),
    MotorTravelPerRev(MotorId),
    MotorMicrosteps(MotorId),
    JunctionAcceleration,
    ChordalTolerance,
}

fn parse_token(token: &str) -> Result<Target, StatError> {
    let mut chars = token.chars();
    let first = chars.next().ok_or(StatError::ParameterNotFound)?;
    let rest: &str = &token[first.len_utf8()..];

    if let Some(axis) = AxisId::from_token(first) {
        return match rest {
            "vm" => Ok(Target::AxisVelocityMax(axis)),
            "fr" => Ok(Target::AxisFeedMax(axis)),
            "tm" => Ok(Target::AxisTravelMax(axis)),
            "jm" => Ok(Target::AxisJerkMax(axis)),
            "jd" => Ok(Target::AxisJunctionDeviation(axis)),
            _ => Err(StatError::ParameterNotFound),
        };
    }
    if let Some(motor) = MotorId::from_token(first) {
        return match rest {
            "sa" => Ok(Target::MotorStepAngle(motor)),
            "tr" => Ok(Target::MotorTravelPerRev(motor)),
            "mi" => Ok(Target::MotorMicrosteps(motor)),
            _ => Err(StatError::ParameterNotFound),
        };
    }
    match token {
        "ja" => Ok(Target::JunctionAcceleration),
        "ct" => Ok(Target::ChordalTolerance),
        _ => Err(StatError::ParameterNotFound),
    }
}

impl ConfigTable {
    pub fn set_units(&mut self, units: UnitsMode) {
        self.units = units;
    }

    fn to_canonical(&self, v: f32) -> f32 {
        match self.units {
            UnitsMode::Millimeters => v,
            UnitsMode::Inches => v * MM_PER_INCH,
        }
    }

    fn from_canonical(&self, v: f32) -> f32 {
        match self.units {
            UnitsMode::Millimeters => v,
            UnitsMode::Inches => v / MM_PER_INCH,
        }
    }

    pub fn get(&self, token: &str) -> Result<ConfigValue, StatError> {
        let target = parse_token(token)?;
        Ok(match target {
            Target::AxisVelocityMax(a) => ConfigValue::FloatLengthUnit(self.from_canonical(self.axes[a.index()].velocity_max)),
            Target::AxisFeedMax(a) => ConfigValue::FloatLengthUnit(self.from_canonical(self.axes[a.index()].feed_max)),
            Target::AxisTravelMax(a) => ConfigValue::FloatLengthUnit(self.from_canonical(self.axes[a.index()].travel_max)),
            Target::AxisJerkMax(a) => ConfigValue::FloatRaw(self.axes[a.index()].jerk_max),
            Target::AxisJunctionDeviation(a) => ConfigValue::FloatLengthUnit(self.from_canonical(self.axes[a.index()].junction_deviation)),
            Target::MotorStepAngle(m) => ConfigValue::FloatRaw(self.motors[m.index()].step_angle),
            Target::MotorTravelPerRev(m) => ConfigValue::FloatLengthUnit(self.from_canonical(self.motors[m.index()].travel_per_rev)),
            Target::MotorMicrosteps(m) => ConfigValue::U8(self.motors[m.index()].microsteps),
            Target::JunctionAcceleration => ConfigValue::FloatLengthUnit(self.from_canonical(self.junction_acceleration)),
            Target::ChordalTolerance => ConfigValue::FloatLengthUnit(self.from_canonical(self.chordal_tolerance)),
        })
    }

    pub fn set(&mut self, token: &str, value: ConfigValue) -> Result<(), StatError> {
        let target = parse_token(token)?;
        match (target, value) {
            (Target::AxisVelocityMax(a), ConfigValue::FloatLengthUnit(v)) => self.axes[a.index()].velocity_max = self.to_canonical(v),
            (Target::AxisFeedMax(a), ConfigValue::FloatLengthUnit(v)) => self.axes[a.index()].feed_max = self.to_canonical(v),
            (Target::AxisTravelMax(a), ConfigValue::FloatLengthUnit(v)) => self.axes[a.index()].travel_max = self.to_canonical(v),
            (Target::AxisJerkMax(a), ConfigValue::FloatRaw(v)) => self.axes[a.index()].jerk_max = v,
            (Target::AxisJunctionDeviation(a), ConfigValue::FloatLengthUnit(v)) => self.axes[a.index()].junction_deviation = self.to_canonical(v),
            (Target::MotorStepAngle(m), ConfigValue::FloatRaw(v)) => self.motors[m.index()].step_angle = v,
            (Target::MotorTravelPerRev(m), ConfigValue::FloatLengthUnit(v)) => self.motors[m.index()].travel_per_rev = self.to_canonical(v),
            (Target::MotorMicrosteps(m), ConfigValue::U8(v)) => {
                self.motors[m.index()].microsteps = v;
                if !self.motors[m.index()].has_supported_microsteps() {
                    tracing::warn!(motor = m.index(), microsteps = v, "unsupported microstep divisor configured");
                }
            }
            (Target::JunctionAcceleration, ConfigValue::FloatLengthUnit(v)) => self.junction_acceleration = self.to_canonical(v),
            (Target::ChordalTolerance, ConfigValue::FloatLengthUnit(v)) => self.chordal_tolerance = self.to_canonical(v),
            _ => return Err(StatError::InputValueUnsupported),
        }
        Ok(())
    }
}
