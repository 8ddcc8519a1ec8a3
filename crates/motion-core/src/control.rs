//! Feedhold / cycle-start / queue-flush state machine.

use crate::block::PlannerQueue;
use crate::errors::{PlannerOutcome, StatError, StatResult};
use crate::runtime::SegmentRuntime;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunState {
    Run,
    Hold,
    Stop,
}

/// Coordinates feedhold (`!`), cycle-start (`~`) and queue-flush (`%`)
/// across the runtime and planner.
pub struct MotionControl {
    state: RunState,
}

impl Default for MotionControl {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionControl {
    pub fn new() -> Self {
        Self { state: RunState::Run }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// `!` — begins a jerk-limited decelerate-to-zero within the block
    /// currently running. Idempotent while already in `Hold`.
    pub fn feedhold(&mut self, runtime: &mut SegmentRuntime) -> StatResult {
        if self.state != RunState::Run {
            return Ok(PlannerOutcome::Noop);
        }
        runtime.begin_feedhold();
        self.state = RunState::Hold;
        Ok(PlannerOutcome::Ok)
    }

    /// `~` — resumes motion toward the block's original target. Returns
    /// `Eagain` if the decel ramp has not yet reached zero velocity.
    pub fn cycle_start(&mut self, runtime: &mut SegmentRuntime) -> StatResult {
        if self.state != RunState::Hold {
            return Ok(PlannerOutcome::Noop);
        }
        if !runtime.is_holding() {
            return Ok(PlannerOutcome::Eagain);
        }
        runtime.resume_from_hold();
        self.state = RunState::Run;
        Ok(PlannerOutcome::Ok)
    }

    /// `%` — legal only in `Hold`: discards every queued block and
    /// resynchronizes the planner model to the runtime's current position.
    pub fn queue_flush<const N: usize>(
        &mut self,
        planner: &mut PlannerQueue<N>,
        runtime: &SegmentRuntime,
    ) -> StatResult {
        if self.state != RunState::Hold {
            return Err(StatError::InputValueUnsupported);
        }
        if !runtime.is_holding() {
            return Ok(PlannerOutcome::Eagain);
        }
        planner.flush();
        planner.set_position(runtime.position());
        self.state = RunState::Stop;
        Ok(PlannerOutcome::Ok)
    }
}
