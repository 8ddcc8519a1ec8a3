//! Loads a host-side TOML machine description into a [`motion_core::ConfigTable`].

use anyhow::{Context, Result};
use motion_core::{AxisId, ConfigTable, Motor, MotorId, NUM_AXES, NUM_MOTORS};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct MachineConfigFile {
    #[serde(default)]
    pub chordal_tolerance: Option<f32>,
    #[serde(default)]
    pub junction_acceleration: Option<f32>,
    #[serde(default)]
    pub axis: Vec<AxisConfigFile>,
    #[serde(default)]
    pub motor: Vec<MotorConfigFile>,
}

#[derive(Debug, Deserialize)]
pub struct AxisConfigFile {
    /// Single-letter token: x|y|z|a|b|c.
    pub id: String,
    pub velocity_max: f32,
    pub feed_max: f32,
    pub travel_max: f32,
    pub jerk_max: f32,
    #[serde(default = "default_junction_deviation")]
    pub junction_deviation: f32,
}

fn default_junction_deviation() -> f32 {
    0.05
}

#[derive(Debug, Deserialize)]
pub struct MotorConfigFile {
    /// 1-based motor number, matching the shell's digit tokens.
    pub id: u8,
    pub axis: String,
    pub step_angle: f32,
    pub travel_per_rev: f32,
    #[serde(default = "default_microsteps")]
    pub microsteps: u8,
    #[serde(default)]
    pub inverted: bool,
}

fn default_microsteps() -> u8 {
    16
}

impl MachineConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Applies this file's values onto a fresh [`ConfigTable`].
    pub fn apply(&self, table: &mut ConfigTable) -> Result<()> {
        if let Some(ct) = self.chordal_tolerance {
            table.chordal_tolerance = ct;
        }
        if let Some(ja) = self.junction_acceleration {
            table.junction_acceleration = ja;
        }

        for axis_cfg in &self.axis {
            let letter = axis_cfg.id.chars().next().context("axis id must not be empty")?;
            let id = AxisId::from_token(letter).with_context(|| format!("unknown axis token '{}'", axis_cfg.id))?;
            let axis = &mut table.axes[id.index()];
            axis.velocity_max = axis_cfg.velocity_max;
            axis.feed_max = axis_cfg.feed_max;
            axis.travel_max = axis_cfg.travel_max;
            axis.jerk_max = axis_cfg.jerk_max;
            axis.junction_deviation = axis_cfg.junction_deviation;
        }

        for motor_cfg in &self.motor {
            let digit = char::from_digit(motor_cfg.id as u32, 10).context("motor id out of range")?;
            let id = MotorId::from_token(digit).with_context(|| format!("unknown motor token '{}'", motor_cfg.id))?;
            let axis_letter = motor_cfg.axis.chars().next().context("motor axis must not be empty")?;
            let axis_id = AxisId::from_token(axis_letter).with_context(|| format!("unknown axis token '{}'", motor_cfg.axis))?;
            table.motors[id.index()] = Motor {
                axis: axis_id,
                step_angle: motor_cfg.step_angle,
                travel_per_rev: motor_cfg.travel_per_rev,
                microsteps: motor_cfg.microsteps,
                inverted: motor_cfg.inverted,
                ..Motor::default()
            };
        }

        Ok(())
    }
}

/// A config with sane defaults on every axis/motor, for tests and quick runs.
pub fn default_table() -> ConfigTable {
    let mut table = ConfigTable::default();
    for axis in table.axes.iter_mut() {
        axis.velocity_max = 300.0;
        axis.feed_max = 300.0;
        axis.travel_max = 300.0;
        axis.jerk_max = 5.0e6;
    }
    let axis_order = [AxisId::X, AxisId::Y, AxisId::Z];
    for (i, axis) in axis_order.into_iter().enumerate().take(NUM_MOTORS.min(NUM_AXES)) {
        table.motors[i] = Motor {
            axis,
            step_angle: 1.8,
            travel_per_rev: 8.0,
            microsteps: 16,
            ..Motor::default()
        };
    }
    table
}
