//! Segment-level runtime ("mr"): evaluates the running block's S-curve
//! profile and drives the step generator.
//!
//! Exec owns the only live [`Profile`] at any time. Each call to
//! [`SegmentRuntime::exec`] either promotes the next queued block to running,
//! or advances the in-progress one by one quantum, emitting the individual
//! step pulses that quantum requires directly into the step generator's
//! queue. The hand-off queue between exec and the DDA tick *is* the
//! segment boundary described in the design notes — there is no separate
//! buffer of "segments" sitting between the two, since the existing,
//! already-tested step generator consumes one fully-timed [`StepCommand`]
//! per physical pulse.

use crate::axis::NUM_AXES;
use crate::block::{BlockState, MoveType, PlannerQueue};
use crate::errors::{PlannerOutcome, StatError, StatResult};
use crate::motor::{Motor, NUM_MOTORS};
use crate::profile::Profile;
use step_gen::{StepCommand, StepperProducer};

/// Nominal duration of a DDA quantum, matching the design's ~5ms segment
/// cadence; clamped to the block's remaining time near the end of a move.
pub const NOM_SEGMENT_USEC: u32 = 5_000;
pub const MIN_SEGMENT_USEC: u32 = 200;
/// DDA tick clock the step intervals below are expressed in.
pub const DDA_CLOCK_HZ: f32 = 50_000.0;
/// Sample count for the midpoint-Riemann approximation of a promoted
/// block's head/body/tail split.
const PROFILE_LENGTH_SAMPLES: u32 = 128;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RuntimeState {
    Off,
    New,
    Run,
}

/// Where the active profile came from — distinguishes an ordinary move from
/// a feedhold ramp, so the block isn't released when a decel-to-zero
/// profile's own (short) duration elapses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ExecMode {
    Normal,
    Decelerating,
    Holding,
}

/// Evaluates the active block's profile and distributes steps across motors.
pub struct SegmentRuntime {
    state: RuntimeState,
    mode: ExecMode,
    elapsed: f32,
    profile: Profile,
    unit: [f32; NUM_AXES],
    /// Runtime-model position in mm — authoritative for where the tool
    /// physically is, updated once per emitted quantum.
    position: [f32; NUM_AXES],
    /// Per-motor rounded step position, used to carry residual rounding error
    /// across quanta so the cumulative count stays exact.
    motor_steps: [i64; NUM_MOTORS],
    /// Cached from the active block so a feedhold can rebuild a profile
    /// without re-borrowing it from the planner.
    accel: f32,
    jerk: f32,
    /// Cruise/exit velocity and remaining distance captured at the moment a
    /// feedhold begins, so cycle-start can resume toward the original target.
    resume_cruise_v: f32,
    resume_exit_v: f32,
    remaining_at_hold: f32,
}

impl Default for SegmentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentRuntime {
    pub fn new() -> Self {
        Self {
            state: RuntimeState::Off,
            mode: ExecMode::Normal,
            elapsed: 0.0,
            profile: Profile::default(),
            unit: [0.0; NUM_AXES],
            position: [0.0; NUM_AXES],
            motor_steps: [0; NUM_MOTORS],
            accel: 0.0,
            jerk: 0.0,
            resume_cruise_v: 0.0,
            resume_exit_v: 0.0,
            remaining_at_hold: 0.0,
        }
    }

    /// True once a feedhold ramp has finished decelerating to zero and is
    /// parked mid-block, waiting for cycle-start.
    pub fn is_holding(&self) -> bool {
        self.mode == ExecMode::Holding
    }

    /// Begins an on-the-fly, jerk-limited decel-to-zero within the remainder
    /// of the currently running block. No-op if nothing is running.
    pub fn begin_feedhold(&mut self) -> bool {
        if self.state != RuntimeState::Run || self.mode != ExecMode::Normal {
            return false;
        }
        let (v, _) = self.profile.velocity_and_accel(self.elapsed);
        let remaining = (self.profile.distance - self.profile.distance * (self.elapsed / self.profile.total_time().max(1e-9))).max(0.0);
        self.resume_cruise_v = self.profile.cruise_v;
        self.resume_exit_v = self.profile.end_v;
        self.remaining_at_hold = remaining;
        self.profile = Profile::new(remaining, v, v, 0.0, self.accel, self.jerk);
        self.elapsed = 0.0;
        self.mode = ExecMode::Decelerating;
        true
    }

    /// Resumes normal motion after a feedhold has reached zero velocity.
    /// Returns `false` (no-op) if still decelerating or not holding at all.
    pub fn resume_from_hold(&mut self) -> bool {
        if self.mode != ExecMode::Holding {
            return false;
        }
        self.profile = Profile::new(
            self.remaining_at_hold,
            0.0,
            self.resume_cruise_v,
            self.resume_exit_v,
            self.accel,
            self.jerk,
        );
        self.elapsed = 0.0;
        self.mode = ExecMode::Normal;
        true
    }

    pub fn position(&self) -> [f32; NUM_AXES] {
        self.position
    }

    pub fn set_position(&mut self, position: [f32; NUM_AXES], motors: &[Motor; NUM_MOTORS]) {
        self.position = position;
        for (m, motor) in self.motor_steps.iter_mut().zip(motors.iter()) {
            let axis_val = position[motor.axis.index()];
            *m = (axis_val * motor.steps_per_unit()).round() as i64;
        }
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    /// Runs one cooperative step of the runtime: promotes the next block if
    /// idle, or advances the active profile by one quantum. Returns
    /// `Noop` when the planner has nothing queued.
    pub fn exec<const N: usize>(
        &mut self,
        planner: &mut PlannerQueue<N>,
        motors: &[Motor; NUM_MOTORS],
        producer: &mut StepperProducer,
    ) -> StatResult {
        if self.state == RuntimeState::Off {
            return self.load_next_block(planner, motors);
        }
        self.advance_active_block(planner, motors, producer)
    }

    fn load_next_block<const N: usize>(
        &mut self,
        planner: &mut PlannerQueue<N>,
        motors: &[Motor; NUM_MOTORS],
    ) -> StatResult {
        let block = match planner.start_running() {
            Some(b) => b,
            None => return Ok(PlannerOutcome::Noop),
        };

        match block.move_type {
            MoveType::Line => {
                self.profile = Profile::new(
                    block.length,
                    block.entry_velocity,
                    block.cruise_velocity,
                    block.exit_velocity,
                    block.accel,
                    block.jerk,
                );
                let (head, body, tail) = self.profile.head_body_tail_lengths(PROFILE_LENGTH_SAMPLES);
                block.head_length = head;
                block.body_length = body;
                block.tail_length = tail;
                self.unit = block.unit;
                self.elapsed = 0.0;
                self.accel = block.accel;
                self.jerk = block.jerk;
                self.mode = ExecMode::Normal;
                self.state = RuntimeState::Run;
                Ok(PlannerOutcome::Ok)
            }
            MoveType::Dwell { .. } | MoveType::Command { .. } => {
                // Handled synchronously by the caller via `take_pending_special`.
                self.state = RuntimeState::New;
                Ok(PlannerOutcome::Ok)
            }
        }
        .map(|outcome| {
            let _ = motors; // motors only needed once steps start flowing
            outcome
        })
    }

    /// Call when `state() == RuntimeState::New` to drain a dwell or
    /// synchronous command block without involving the step generator.
    pub fn take_pending_special<const N: usize>(
        &mut self,
        planner: &mut PlannerQueue<N>,
    ) -> Option<MoveType> {
        if self.state != RuntimeState::New {
            return None;
        }
        let move_type = planner.running()?.move_type;
        match move_type {
            MoveType::Dwell { .. } | MoveType::Command { .. } => {
                planner.release_running();
                self.state = RuntimeState::Off;
                Some(move_type)
            }
            MoveType::Line => None,
        }
    }

    fn advance_active_block<const N: usize>(
        &mut self,
        planner: &mut PlannerQueue<N>,
        motors: &[Motor; NUM_MOTORS],
        producer: &mut StepperProducer,
    ) -> StatResult {
        if self.mode == ExecMode::Holding {
            // Parked mid-block at zero velocity; nothing to advance until
            // cycle-start calls `resume_from_hold`.
            return Ok(PlannerOutcome::Noop);
        }

        let total_time = self.profile.total_time();
        let quantum = if total_time <= 0.0 {
            0.0
        } else {
            (NOM_SEGMENT_USEC as f32 / 1_000_000.0).min(total_time - self.elapsed)
        };
        if quantum <= 0.0 {
            return match self.mode {
                ExecMode::Normal => {
                    planner.release_running();
                    self.state = RuntimeState::Off;
                    Ok(PlannerOutcome::Complete)
                }
                ExecMode::Decelerating => {
                    self.mode = ExecMode::Holding;
                    Ok(PlannerOutcome::Ok)
                }
                ExecMode::Holding => Ok(PlannerOutcome::Noop),
            };
        }

        let t_mid = self.elapsed + quantum * 0.5;
        let (v, _) = self.profile.velocity_and_accel(t_mid);
        let ds = (v * quantum).max(0.0);
        self.elapsed += quantum;

        let mut new_position = self.position;
        for i in 0..NUM_AXES {
            new_position[i] += self.unit[i] * ds;
        }

        let mut direction_mask: u8 = 0;
        let mut max_delta: i64 = 0;
        let mut per_motor_delta = [0i64; NUM_MOTORS];
        for (i, motor) in motors.iter().enumerate() {
            let axis_idx = motor.axis.index();
            let new_steps = (new_position[axis_idx] * motor.steps_per_unit()).round() as i64;
            let delta = new_steps - self.motor_steps[i];
            per_motor_delta[i] = delta;
            if delta != 0 {
                if delta > 0 {
                    direction_mask |= 1 << i;
                }
                max_delta = max_delta.max(delta.abs());
            }
        }

        self.position = new_position;
        for i in 0..NUM_MOTORS {
            self.motor_steps[i] += per_motor_delta[i];
        }

        if max_delta == 0 {
            // No motor crossed an integer step boundary this quantum; still
            // legal (very low velocity near the very start of a ramp).
            return Ok(PlannerOutcome::Ok);
        }

        // Clamped to 1: the step generator cannot honor a sub-tick interval,
        // and a literal 0 would read as "step immediately, forever".
        let interval_ticks = if v > 1e-6 {
            ((DDA_CLOCK_HZ * quantum) as u32 / max_delta as u32)
                .max(1)
                .min(u16::MAX as u32) as u16
        } else {
            u16::MAX
        };

        // Bresenham-style DDA: each motor accumulates its own step count per
        // tick and fires only on the ticks where it overflows `max_delta`,
        // so a motor needing fewer steps than the quantum's busiest motor
        // gets exactly its own delta, not the busiest motor's.
        let mut error = [0i64; NUM_MOTORS];
        for _ in 0..max_delta {
            let mut submask: u8 = 0;
            for i in 0..NUM_MOTORS {
                let delta = per_motor_delta[i].abs();
                if delta == 0 {
                    continue;
                }
                error[i] += delta;
                if error[i] >= max_delta {
                    error[i] -= max_delta;
                    submask |= 1 << i;
                }
            }
            if submask != 0 {
                producer
                    .enqueue(StepCommand::new(submask, direction_mask, interval_ticks))
                    .map_err(|_| StatError::StepperAssertionFailure)?;
            }
        }

        Ok(PlannerOutcome::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{Axis, AxisId};
    use heapless::spsc::Queue;

    fn motors() -> [Motor; NUM_MOTORS] {
        let mut m = [Motor::default(); NUM_MOTORS];
        m[0].axis = AxisId::X;
        m[0].step_angle = 1.8;
        m[0].microsteps = 1;
        m[0].travel_per_rev = 1.0; // 200 steps/mm
        m[1].axis = AxisId::Y;
        m[1].step_angle = 1.8;
        m[1].microsteps = 1;
        m[1].travel_per_rev = 1.0;
        m
    }

    fn axes(feed_max: f32, jerk_max: f32) -> [Axis; NUM_AXES] {
        let mut a = [Axis::default(); NUM_AXES];
        for axis in a.iter_mut() {
            axis.velocity_max = feed_max;
            axis.feed_max = feed_max;
            axis.jerk_max = jerk_max;
        }
        a
    }

    #[test]
    fn exec_drains_a_queued_line_into_step_commands() {
        let mut planner: PlannerQueue = PlannerQueue::new();
        let ax = axes(50.0, 5e6);
        let mut target = [0.0; NUM_AXES];
        target[0] = 10.0;
        planner.queue_line(target, 20.0, 500.0, 0.05, &ax).unwrap();

        let mut runtime = SegmentRuntime::new();
        let mot = motors();
        static mut Q: step_gen::StepperQueue = Queue::new();
        let (mut producer, _consumer) = unsafe {
            #[allow(static_mut_refs)]
            Q.split()
        };

        let mut guard = 0;
        loop {
            let outcome = runtime.exec(&mut planner, &mot, &mut producer).unwrap();
            guard += 1;
            if outcome == PlannerOutcome::Complete || guard > 10_000 {
                break;
            }
        }
        assert!(guard < 10_000, "runtime never completed the block");
        assert!((runtime.position()[0] - 10.0).abs() < 0.05);
    }
}
