//! Arc generator: decomposes a circular arc into chord-approximating line
//! blocks, submitted into the planner a segment at a time so it can pause and
//! resume when the queue is momentarily full.

#[cfg(not(feature = "std"))]
use libm::{acosf, atan2f, ceilf, cosf, fabsf, sinf, sqrtf};
#[cfg(feature = "std")]
fn acosf(x: f32) -> f32 {
    x.acos()
}
#[cfg(feature = "std")]
fn atan2f(y: f32, x: f32) -> f32 {
    y.atan2(x)
}
#[cfg(feature = "std")]
fn ceilf(x: f32) -> f32 {
    x.ceil()
}
#[cfg(feature = "std")]
fn cosf(x: f32) -> f32 {
    x.cos()
}
#[cfg(feature = "std")]
fn fabsf(x: f32) -> f32 {
    x.abs()
}
#[cfg(feature = "std")]
fn sinf(x: f32) -> f32 {
    x.sin()
}
#[cfg(feature = "std")]
fn sqrtf(x: f32) -> f32 {
    x.sqrt()
}

use crate::axis::{Axis, NUM_AXES};
use crate::block::PlannerQueue;
use crate::errors::{PlannerOutcome, StatError, StatResult};

const TWO_PI: f32 = 2.0 * core::f32::consts::PI;
/// Never decompose a non-degenerate arc into fewer than this many chords.
const MIN_ARC_SEGMENTS: u32 = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArcPlane {
    Xy,
    Xz,
    Yz,
}

impl ArcPlane {
    fn axes(self) -> (usize, usize, usize) {
        // (u, v, linear) indices into the NUM_AXES position vector.
        match self {
            ArcPlane::Xy => (0, 1, 2),
            ArcPlane::Xz => (0, 2, 1),
            ArcPlane::Yz => (1, 2, 0),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

struct ArcState {
    center_u: f32,
    center_v: f32,
    radius: f32,
    sweep: f32,
    angle_step: f32,
    segments_remaining: u32,
    current_angle: f32,
    plane: ArcPlane,
    linear_start: f32,
    linear_per_segment: f32,
    target_tail: [f32; NUM_AXES],
    feed_rate: f32,
    accel: f32,
    junction_deviation: f32,
}

/// A cooperative, restartable arc-to-lines decomposer.
#[derive(Default)]
pub struct ArcGenerator {
    active: Option<ArcState>,
}

impl ArcGenerator {
    pub fn new() -> Self {
        Self { active: None }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Begins decomposing an arc. `center_offset` is `(u, v)` relative to
    /// `start`, in the arc's plane. Returns `ArcSpecificationError` if the
    /// implied radius at `end` disagrees with the radius at `start` beyond
    /// numerical tolerance.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &mut self,
        start: [f32; NUM_AXES],
        end: [f32; NUM_AXES],
        center_offset: (f32, f32),
        plane: ArcPlane,
        direction: ArcDirection,
        feed_rate: f32,
        accel: f32,
        junction_deviation: f32,
        chordal_tolerance: f32,
    ) -> StatResult {
        let (ui, vi, li) = plane.axes();
        let center_u = start[ui] + center_offset.0;
        let center_v = start[vi] + center_offset.1;

        let r_start = sqrtf((start[ui] - center_u).powi(2) + (start[vi] - center_v).powi(2));
        let r_end = sqrtf((end[ui] - center_u).powi(2) + (end[vi] - center_v).powi(2));
        if r_start < 1e-6 {
            return Err(StatError::ArcSpecificationError);
        }
        if fabsf(r_start - r_end) > r_start * 1e-2 + 1e-4 {
            return Err(StatError::ArcSpecificationError);
        }

        let start_angle = atan2f(start[vi] - center_v, start[ui] - center_u);
        let mut end_angle = atan2f(end[vi] - center_v, end[ui] - center_u);

        let mut sweep = match direction {
            ArcDirection::CounterClockwise => {
                if end_angle <= start_angle {
                    end_angle += TWO_PI;
                }
                end_angle - start_angle
            }
            ArcDirection::Clockwise => {
                if end_angle >= start_angle {
                    end_angle -= TWO_PI;
                }
                end_angle - start_angle
            }
        };
        if fabsf(sweep) < 1e-6 {
            sweep = match direction {
                ArcDirection::CounterClockwise => TWO_PI,
                ArcDirection::Clockwise => -TWO_PI,
            };
        }

        let tol = chordal_tolerance.max(1e-4).min(r_start * 0.9);
        let max_chord_len = 2.0 * sqrtf((r_start * r_start - (r_start - tol).powi(2)).max(0.0));
        let max_chord_angle = 2.0 * acosf(((r_start - tol) / r_start).clamp(-1.0, 1.0));

        let arc_len = fabsf(sweep) * r_start;
        let by_length = if max_chord_len > 1e-6 {
            ceilf(arc_len / max_chord_len) as u32
        } else {
            MIN_ARC_SEGMENTS
        };
        let by_angle = if max_chord_angle > 1e-6 {
            ceilf(fabsf(sweep) / max_chord_angle) as u32
        } else {
            MIN_ARC_SEGMENTS
        };
        let segments = by_length.max(by_angle).max(MIN_ARC_SEGMENTS);

        self.active = Some(ArcState {
            center_u,
            center_v,
            radius: r_start,
            sweep,
            angle_step: sweep / segments as f32,
            segments_remaining: segments,
            current_angle: start_angle,
            plane,
            linear_start: start[li],
            linear_per_segment: (end[li] - start[li]) / segments as f32,
            target_tail: end,
            feed_rate,
            accel,
            junction_deviation,
        });
        Ok(PlannerOutcome::Ok)
    }

    /// Submits one more chord to the planner, or finishes the arc if the
    /// queue has no room — in which case the caller should call again later.
    pub fn step<const N: usize>(
        &mut self,
        planner: &mut PlannerQueue<N>,
        axes: &[Axis; NUM_AXES],
    ) -> StatResult {
        let state = match self.active.as_mut() {
            Some(s) => s,
            None => return Ok(PlannerOutcome::Complete),
        };

        if planner.free_slots() == 0 {
            return Ok(PlannerOutcome::Eagain);
        }

        let (ui, vi, li) = state.plane.axes();
        state.segments_remaining -= 1;
        let is_last = state.segments_remaining == 0;

        let mut target = planner.position();
        if is_last {
            target = state.target_tail;
        } else {
            state.current_angle += state.angle_step;
            target[ui] = state.center_u + state.radius * cosf(state.current_angle);
            target[vi] = state.center_v + state.radius * sinf(state.current_angle);
            let traveled_segments =
                ((state.sweep / state.angle_step) as i64 - state.segments_remaining as i64).max(1) as f32;
            target[li] = state.linear_start + state.linear_per_segment * traveled_segments;
        }

        let feed_rate = state.feed_rate;
        let accel = state.accel;
        let junction_deviation = state.junction_deviation;
        let done = is_last;

        let result = planner.queue_line(target, feed_rate, accel, junction_deviation, axes);
        match result {
            Ok(_) => {
                if done {
                    self.active = None;
                    Ok(PlannerOutcome::Complete)
                } else {
                    Ok(PlannerOutcome::Ok)
                }
            }
            Err(StatError::ZeroLengthMove) if done => {
                self.active = None;
                Ok(PlannerOutcome::Complete)
            }
            Err(e) => Err(e),
        }
    }
}
