//! # Motion Control Core
//!
//! A deterministic trajectory planner and jerk-limited segment runtime for
//! multi-axis Cartesian CNC motion control, usable on both host and MCU
//! (`no_std`-friendly).
//!
//! Provides:
//! - A look-ahead planner queue with junction-deviation cornering velocity
//! - A seven-section S-curve segment runtime that drives [`step_gen`]
//! - An arc-to-lines generator
//! - Feedhold / cycle-start / queue-flush coordination
//! - A typed configuration token surface
//! - Step-domain position feedback

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod arc;
pub mod axis;
pub mod block;
pub mod config;
pub mod control;
pub mod encoder;
pub mod errors;
pub mod junction;
pub mod motor;
pub mod profile;
pub mod runtime;

pub use arc::{ArcDirection, ArcGenerator, ArcPlane};
pub use axis::{Axis, AxisId, AxisMode, NUM_AXES};
pub use block::{Block, BlockState, CommandCallback, MoveType, PlannerQueue, RING_SIZE};
pub use config::{ConfigTable, ConfigValue, UnitsMode};
pub use control::{MotionControl, RunState};
pub use encoder::EncoderState;
pub use errors::{PlannerOutcome, StatCode, StatError, StatResult};
pub use junction::cornering_velocity;
pub use motor::{Motor, MotorId, NUM_MOTORS};
pub use profile::Profile;
pub use runtime::{RuntimeState, SegmentRuntime};

use step_gen::StepperProducer;

/// Top-level state aggregate: the single owner of the planner queue, the
/// segment runtime, the feedhold/cycle-start state machine, the step-domain
/// encoder, and the machine's axis/motor configuration.
///
/// Mirrors the single `init`-owned global the step generator assumes for its
/// own state (one controller, one queue); this is the equivalent aggregate
/// one level up, so callers never juggle the five pieces separately.
pub struct MotionCore<const N: usize = RING_SIZE> {
    pub planner: PlannerQueue<N>,
    pub runtime: SegmentRuntime,
    pub control: MotionControl,
    pub arc: ArcGenerator,
    pub encoder: EncoderState,
    pub config: ConfigTable,
}

impl<const N: usize> Default for MotionCore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MotionCore<N> {
    pub fn new() -> Self {
        Self {
            planner: PlannerQueue::new(),
            runtime: SegmentRuntime::new(),
            control: MotionControl::new(),
            arc: ArcGenerator::new(),
            encoder: EncoderState::new(),
            config: ConfigTable::default(),
        }
    }

    /// Queues a coordinated straight-line move to `target` (machine units,
    /// canonical millimeters).
    pub fn submit_line(&mut self, target: [f32; NUM_AXES], feed_rate: f32, accel: f32) -> StatResult {
        let jd = self
            .config
            .axes
            .iter()
            .map(|a| a.junction_deviation)
            .fold(f32::INFINITY, f32::min);
        self.planner.queue_line(target, feed_rate, accel, jd, &self.config.axes)
    }

    /// Begins decomposing a circular arc into chord lines, fed into the
    /// planner one chord per call to [`MotionCore::pump_arc`].
    #[allow(clippy::too_many_arguments)]
    pub fn submit_arc(
        &mut self,
        start: [f32; NUM_AXES],
        end: [f32; NUM_AXES],
        center_offset: (f32, f32),
        plane: ArcPlane,
        direction: ArcDirection,
        feed_rate: f32,
        accel: f32,
    ) -> StatResult {
        let jd = self
            .config
            .axes
            .iter()
            .map(|a| a.junction_deviation)
            .fold(f32::INFINITY, f32::min);
        self.arc.begin(start, end, center_offset, plane, direction, feed_rate, accel, jd, self.config.chordal_tolerance)
    }

    /// Drives the active arc generator by one chord. A no-op, returning
    /// `Complete`, when no arc is in progress.
    pub fn pump_arc(&mut self) -> StatResult {
        self.arc.step(&mut self.planner, &self.config.axes)
    }

    pub fn submit_dwell(&mut self, seconds: f32) -> StatResult {
        self.planner.queue_dwell(seconds)
    }

    pub fn submit_command(&mut self, callback: CommandCallback, value: [f32; NUM_AXES], flags: [bool; NUM_AXES]) -> StatResult {
        self.planner.queue_command(callback, value, flags)
    }

    /// Legal only while [`MotionControl`] is in `Hold`.
    pub fn flush_planner(&mut self) -> StatResult {
        self.control.queue_flush(&mut self.planner, &self.runtime)
    }

    pub fn set_planner_position(&mut self, position: [f32; NUM_AXES]) {
        self.planner.set_position(position);
    }

    pub fn set_runtime_position(&mut self, position: [f32; NUM_AXES]) {
        self.runtime.set_position(position, &self.config.motors);
    }

    /// Runs one cooperative step of the segment runtime, draining the
    /// planner into step commands on `producer`.
    pub fn exec(&mut self, producer: &mut StepperProducer) -> StatResult {
        self.runtime.exec(&mut self.planner, &self.config.motors, producer)
    }

    /// `!` feedhold.
    pub fn feedhold(&mut self) -> StatResult {
        self.control.feedhold(&mut self.runtime)
    }

    /// `~` cycle-start.
    pub fn cycle_start(&mut self) -> StatResult {
        self.control.cycle_start(&mut self.runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::spsc::Queue;

    #[test]
    fn motion_core_drains_a_submitted_line() {
        let mut core: MotionCore = MotionCore::new();
        for axis in core.config.axes.iter_mut() {
            axis.velocity_max = 100.0;
            axis.feed_max = 100.0;
            axis.jerk_max = 5e6;
        }
        core.config.motors[0].axis = AxisId::X;

        let mut target = [0.0; NUM_AXES];
        target[0] = 10.0;
        core.submit_line(target, 50.0, 500.0).unwrap();

        static mut Q: step_gen::StepperQueue = Queue::new();
        let (mut producer, _consumer) = unsafe {
            #[allow(static_mut_refs)]
            Q.split()
        };

        let mut guard = 0;
        loop {
            let outcome = core.exec(&mut producer).unwrap();
            guard += 1;
            if outcome == PlannerOutcome::Complete || guard > 10_000 {
                break;
            }
        }
        assert!(guard < 10_000);
        assert!((core.runtime.position()[0] - 10.0).abs() < 0.1);
    }
}
