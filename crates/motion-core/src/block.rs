//! The planner queue: a fixed-size ring of motion blocks with look-ahead
//! velocity recalculation.
//!
//! Neighbor access is computed from `(head, len)` rather than stored as
//! explicit `nx`/`pv` links — the ring only needs O(1) indexed access, not
//! pointer-stable addresses, so the extra bookkeeping of a linked structure
//! buys nothing here.

#[cfg(not(feature = "std"))]
use libm::sqrtf;
#[cfg(feature = "std")]
fn sqrtf(x: f32) -> f32 {
    x.sqrt()
}

use crate::axis::{Axis, NUM_AXES};
use crate::errors::{PlannerOutcome, StatError, StatResult};
use crate::junction::cornering_velocity;

/// Number of block slots in the look-ahead ring.
pub const RING_SIZE: usize = 28;
/// Lines shorter than this are still queued, but run as a single segment.
pub const MIN_LINE_LENGTH_MM: f32 = 1e-4;

pub type CommandCallback = fn(value: &[f32; NUM_AXES], flags: &[bool; NUM_AXES]);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockState {
    Empty,
    Queued,
    Pending,
    Running,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MoveType {
    Line,
    Dwell { seconds: f32 },
    Command { callback: CommandCallback, value: [f32; NUM_AXES], flags: [bool; NUM_AXES] },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Block {
    pub state: BlockState,
    pub move_type: MoveType,
    pub target: [f32; NUM_AXES],
    pub unit: [f32; NUM_AXES],
    pub length: f32,
    pub jerk: f32,
    pub accel: f32,
    pub entry_velocity: f32,
    pub cruise_velocity: f32,
    pub exit_velocity: f32,
    pub entry_vmax: f32,
    pub cruise_vmax: f32,
    pub exit_vmax: f32,
    /// Max entry velocity from which this block could still decelerate down
    /// to its resolved `exit_velocity` over `length`. Recomputed by
    /// [`PlannerQueue::replan`]'s backward pass each time it runs; zero until
    /// the block has gone through at least one replan.
    pub braking_vmax: f32,
    /// Distance covered by the profile's head (jerk-in/accel/jerk-out)
    /// section. Zero until the block has been promoted to running and its
    /// [`crate::profile::Profile`] evaluated.
    pub head_length: f32,
    /// Distance covered by the cruise section.
    pub body_length: f32,
    /// Distance covered by the tail (jerk-in/decel/jerk-out) section.
    pub tail_length: f32,
    pub junction_deviation: f32,
    pub replannable: bool,
}

impl Default for Block {
    fn default() -> Self {
        Self {
            state: BlockState::Empty,
            move_type: MoveType::Line,
            target: [0.0; NUM_AXES],
            unit: [0.0; NUM_AXES],
            length: 0.0,
            jerk: 0.0,
            accel: 0.0,
            entry_velocity: 0.0,
            cruise_velocity: 0.0,
            exit_velocity: 0.0,
            entry_vmax: 0.0,
            cruise_vmax: 0.0,
            exit_vmax: 0.0,
            braking_vmax: 0.0,
            head_length: 0.0,
            body_length: 0.0,
            tail_length: 0.0,
            junction_deviation: 0.05,
            replannable: false,
        }
    }
}

/// The look-ahead planner queue ("mb" in the TinyG-derived design notes).
pub struct PlannerQueue<const N: usize = RING_SIZE> {
    slots: [Block; N],
    /// Index of the oldest (running, if any) occupied slot.
    head: usize,
    /// Number of occupied slots starting at `head`.
    len: usize,
    /// Planner-model position: where the tip of the queued chain will end up.
    position: [f32; NUM_AXES],
}

impl<const N: usize> Default for PlannerQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PlannerQueue<N> {
    pub fn new() -> Self {
        Self {
            slots: [Block::default(); N],
            head: 0,
            len: 0,
            position: [0.0; NUM_AXES],
        }
    }

    pub fn free_slots(&self) -> usize {
        N - self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn position(&self) -> [f32; NUM_AXES] {
        self.position
    }

    /// Resynchronizes the planner model to `position` without touching the
    /// ring itself (used by `set_planner_position`).
    pub fn set_position(&mut self, position: [f32; NUM_AXES]) {
        self.position = position;
    }

    fn index(&self, offset: usize) -> usize {
        (self.head + offset) % N
    }

    /// The currently running block, if any.
    pub fn running(&self) -> Option<&Block> {
        if self.len == 0 {
            None
        } else {
            Some(&self.slots[self.head])
        }
    }

    /// Promotes the oldest queued block to running, returning it. The caller
    /// (segment runtime) owns it until it reports completion via
    /// [`PlannerQueue::release_running`].
    pub fn start_running(&mut self) -> Option<&mut Block> {
        if self.len == 0 {
            return None;
        }
        let idx = self.head;
        if self.slots[idx].state == BlockState::Queued || self.slots[idx].state == BlockState::Pending {
            self.slots[idx].state = BlockState::Running;
            self.slots[idx].replannable = false;
        }
        Some(&mut self.slots[idx])
    }

    /// Frees the running block back to the empty pool. No-op if nothing is
    /// running.
    pub fn release_running(&mut self) -> PlannerOutcome {
        if self.len == 0 {
            return PlannerOutcome::Noop;
        }
        self.slots[self.head] = Block::default();
        self.head = (self.head + 1) % N;
        self.len -= 1;
        PlannerOutcome::Ok
    }

    /// Discards every queued block (used by queue flush). The running block,
    /// if any, is included — callers must already be in `HOLD` before calling
    /// this, matching the contract that flush is only legal at a standstill.
    pub fn flush(&mut self) {
        self.slots = [Block::default(); N];
        self.head = 0;
        self.len = 0;
    }

    fn push(&mut self, block: Block) -> StatResult {
        if self.len == N {
            return Err(StatError::BufferFullFatal);
        }
        let idx = self.index(self.len);
        self.slots[idx] = block;
        self.len += 1;
        Ok(PlannerOutcome::Ok)
    }

    /// Queues a coordinated line move. `axes` supplies per-axis velocity and
    /// jerk limits; `feed_rate` and `accel` are the move's requested cruise
    /// speed and acceleration ceiling.
    pub fn queue_line(
        &mut self,
        target: [f32; NUM_AXES],
        feed_rate: f32,
        accel: f32,
        junction_deviation: f32,
        axes: &[Axis; NUM_AXES],
    ) -> StatResult {
        if self.len == N {
            return Err(StatError::BufferFullFatal);
        }

        let mut delta = [0.0f32; NUM_AXES];
        let mut length_sq = 0.0f32;
        for i in 0..NUM_AXES {
            delta[i] = target[i] - self.position[i];
            if axes[i].mode != crate::axis::AxisMode::Inhibited {
                length_sq += delta[i] * delta[i];
            }
        }
        let length = sqrtf(length_sq);
        if length < 1e-9 {
            return Err(StatError::ZeroLengthMove);
        }

        let mut unit = [0.0f32; NUM_AXES];
        let mut cruise_vmax = feed_rate;
        let mut min_jerk = f32::INFINITY;
        for i in 0..NUM_AXES {
            unit[i] = delta[i] / length;
            if unit[i].abs() > 1e-9 && axes[i].mode != crate::axis::AxisMode::Disabled {
                let axis_speed_limit = axes[i].feed_max / unit[i].abs();
                cruise_vmax = cruise_vmax.min(axis_speed_limit);
                if axes[i].jerk_max > 0.0 {
                    min_jerk = min_jerk.min(axes[i].jerk_max);
                }
            }
        }
        if !min_jerk.is_finite() {
            min_jerk = 1.0;
        }

        let block = Block {
            state: BlockState::Queued,
            move_type: MoveType::Line,
            target,
            unit,
            length,
            jerk: min_jerk,
            accel,
            entry_velocity: 0.0,
            cruise_velocity: cruise_vmax,
            exit_velocity: 0.0,
            entry_vmax: cruise_vmax,
            cruise_vmax,
            exit_vmax: cruise_vmax,
            // Recomputed by `replan` from the block's actual resolved exit
            // velocity; zero until the first replan pass touches it.
            braking_vmax: 0.0,
            head_length: 0.0,
            body_length: 0.0,
            tail_length: 0.0,
            junction_deviation,
            replannable: true,
        };

        self.push(block)?;
        self.position = target;
        self.replan();
        Ok(PlannerOutcome::Ok)
    }

    pub fn queue_dwell(&mut self, seconds: f32) -> StatResult {
        if seconds <= 0.0 {
            return Err(StatError::InputValueUnsupported);
        }
        let block = Block {
            state: BlockState::Queued,
            move_type: MoveType::Dwell { seconds },
            replannable: false,
            ..Block::default()
        };
        self.push(block)
    }

    pub fn queue_command(
        &mut self,
        callback: CommandCallback,
        value: [f32; NUM_AXES],
        flags: [bool; NUM_AXES],
    ) -> StatResult {
        let block = Block {
            state: BlockState::Queued,
            move_type: MoveType::Command { callback, value, flags },
            replannable: false,
            ..Block::default()
        };
        self.push(block)
    }

    /// Re-derives entry/exit velocities across every replannable block in the
    /// ring: a backward pass (newest to oldest) bounds each block's entry by
    /// what its successor chain can decelerate into from, and a forward pass
    /// propagates `exit[i] == entry[i+1]` while respecting each block's own
    /// acceleration ceiling. The running block (if any) is never rewritten.
    pub fn replan(&mut self) {
        if self.len < 2 {
            return;
        }

        // Junction velocities between every adjacent Line/Line pair.
        let mut junction_v = [0.0f32; N];
        for i in 0..self.len.saturating_sub(1) {
            let a = self.slots[self.index(i)];
            let b = self.slots[self.index(i + 1)];
            if a.move_type != MoveType::Line || b.move_type != MoveType::Line {
                junction_v[i] = 0.0;
                continue;
            }
            let min_accel = a.accel.min(b.accel);
            let max_v = a.cruise_vmax.min(b.cruise_vmax);
            junction_v[i] = cornering_velocity(&a.unit, &b.unit, a.junction_deviation.min(b.junction_deviation), min_accel, max_v);
        }

        // Backward pass: propagate a maximum entry velocity from the final
        // block (required exit, by default 0) back toward the oldest
        // replannable block.
        let last = self.len - 1;
        if self.slots[self.index(last)].replannable {
            self.slots[self.index(last)].exit_velocity = 0.0;
        }
        for i in (0..last).rev() {
            let idx = self.index(i);
            if !self.slots[idx].replannable {
                continue;
            }
            let next_idx = self.index(i + 1);
            let jv = junction_v[i];
            let exit_v = jv.min(self.slots[next_idx].entry_velocity);
            self.slots[idx].exit_velocity = exit_v.min(self.slots[idx].exit_vmax);
            let reachable_entry = sqrtf(self.slots[idx].exit_velocity * self.slots[idx].exit_velocity
                + 2.0 * self.slots[idx].accel * self.slots[idx].length);
            self.slots[idx].braking_vmax = reachable_entry.min(self.slots[idx].cruise_vmax);
            self.slots[idx].entry_velocity = reachable_entry.min(self.slots[idx].entry_vmax);
        }

        // Forward pass: entry[i+1] must not exceed what block i's exit
        // actually allows, and each block's own acceleration ceiling caps how
        // fast it can still be going by its own exit point.
        for i in 0..last {
            let idx = self.index(i);
            let next_idx = self.index(i + 1);
            if self.slots[idx].replannable {
                let reachable_exit = sqrtf(self.slots[idx].entry_velocity * self.slots[idx].entry_velocity
                    + 2.0 * self.slots[idx].accel * self.slots[idx].length);
                self.slots[idx].exit_velocity = self.slots[idx].exit_velocity.min(reachable_exit);
            }
            if self.slots[next_idx].replannable {
                self.slots[next_idx].entry_velocity = self.slots[next_idx].entry_velocity.min(self.slots[idx].exit_velocity);
            }
            self.slots[idx].cruise_velocity = self.slots[idx].cruise_vmax;
        }
        let last_idx = self.index(last);
        if self.slots[last_idx].replannable {
            self.slots[last_idx].cruise_velocity = self.slots[last_idx].cruise_vmax;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;

    fn test_axes(feed_max: f32, jerk_max: f32) -> [Axis; NUM_AXES] {
        let mut axes = [Axis::default(); NUM_AXES];
        for a in axes.iter_mut() {
            a.velocity_max = feed_max;
            a.feed_max = feed_max;
            a.jerk_max = jerk_max;
        }
        axes
    }

    #[test]
    fn zero_length_move_is_rejected() {
        let mut q: PlannerQueue = PlannerQueue::new();
        let axes = test_axes(1000.0, 5e7);
        let err = q.queue_line([0.0; NUM_AXES], 500.0, 2000.0, 0.05, &axes).unwrap_err();
        assert_eq!(err, StatError::ZeroLengthMove);
    }

    #[test]
    fn straight_line_clamps_to_axis_feed_max() {
        let mut q: PlannerQueue = PlannerQueue::new();
        let axes = test_axes(1000.0, 5e7);
        let mut target = [0.0; NUM_AXES];
        target[0] = 100.0;
        q.queue_line(target, 2000.0, 2000.0, 0.05, &axes).unwrap();
        let b = q.running().unwrap();
        assert!((b.cruise_vmax - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn full_reversal_forces_zero_junction_velocity() {
        let mut q: PlannerQueue = PlannerQueue::new();
        let axes = test_axes(1000.0, 5e7);
        let mut t1 = [0.0; NUM_AXES];
        t1[0] = 10.0;
        q.queue_line(t1, 1000.0, 2000.0, 0.05, &axes).unwrap();
        let mut t2 = [0.0; NUM_AXES];
        t2[0] = 0.0;
        q.queue_line(t2, 1000.0, 2000.0, 0.05, &axes).unwrap();
        let first = q.running().unwrap();
        assert!(first.exit_velocity < 1e-2);
    }

    #[test]
    fn buffer_full_is_fatal() {
        let mut q: PlannerQueue<2> = PlannerQueue::new();
        let axes = test_axes(1000.0, 5e7);
        let mut target = [0.0; NUM_AXES];
        for i in 0..3 {
            target[0] = (i + 1) as f32 * 10.0;
            let r = q.queue_line(target, 100.0, 1000.0, 0.05, &axes);
            if i < 2 {
                assert!(r.is_ok());
            } else {
                assert_eq!(r.unwrap_err(), StatError::BufferFullFatal);
            }
        }
    }

    #[test]
    fn flush_empties_ring_and_keeps_position() {
        let mut q: PlannerQueue = PlannerQueue::new();
        let axes = test_axes(1000.0, 5e7);
        let mut target = [0.0; NUM_AXES];
        target[0] = 10.0;
        q.queue_line(target, 500.0, 1000.0, 0.05, &axes).unwrap();
        assert!(!q.is_empty());
        let pos_before = q.position();
        q.flush();
        assert!(q.is_empty());
        assert_eq!(q.position(), pos_before);
    }
}
