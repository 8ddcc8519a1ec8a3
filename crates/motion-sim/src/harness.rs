//! Drives an in-process [`MotionCore`] to completion and records the step
//! commands it emits, for golden-trace regression testing and manual replay.

use crate::trace::StepTrace;
use anyhow::{bail, Result};
use heapless::spsc::Queue;
use motion_core::{ArcDirection, ArcPlane, ConfigTable, MotionCore, PlannerOutcome, RuntimeState, NUM_AXES};
use step_gen::{StepperConsumer, StepperProducer, StepperQueue};
use tracing::{debug, info, instrument};

/// Upper bound on exec() iterations per run, guarding against a simulation
/// that never drains (misconfigured axis limits, a stuck feedhold, etc).
const DEFAULT_MAX_ITERATIONS: u32 = 200_000;

pub struct SimHarness {
    core: MotionCore,
    producer: StepperProducer,
    consumer: StepperConsumer,
    trace: StepTrace,
}

impl SimHarness {
    pub fn new(config: ConfigTable) -> Self {
        let mut core = MotionCore::new();
        core.config = config;
        let queue: &'static mut StepperQueue = Box::leak(Box::new(Queue::new()));
        let (producer, consumer) = queue.split();
        Self { core, producer, consumer, trace: StepTrace::default() }
    }

    pub fn submit_line(&mut self, target: [f32; NUM_AXES], feed_rate: f32, accel: f32) -> Result<()> {
        self.core.submit_line(target, feed_rate, accel)?;
        Ok(())
    }

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
    ) -> Result<()> {
        self.core.submit_arc(start, end, center_offset, plane, direction, feed_rate, accel)?;
        Ok(())
    }

    pub fn submit_dwell(&mut self, seconds: f32) -> Result<()> {
        self.core.submit_dwell(seconds)?;
        Ok(())
    }

    pub fn feedhold(&mut self) -> Result<()> {
        self.core.feedhold()?;
        Ok(())
    }

    pub fn cycle_start(&mut self) -> Result<()> {
        self.core.cycle_start()?;
        Ok(())
    }

    pub fn position(&self) -> [f32; NUM_AXES] {
        self.core.runtime.position()
    }

    pub fn trace(&self) -> &StepTrace {
        &self.trace
    }

    /// Pumps the arc generator and segment runtime until both the planner
    /// queue and runtime go idle, recording every emitted step command.
    #[instrument(skip(self))]
    pub fn run_to_completion(&mut self) -> Result<()> {
        self.run_to_completion_with_limit(DEFAULT_MAX_ITERATIONS)
    }

    pub fn run_to_completion_with_limit(&mut self, max_iterations: u32) -> Result<()> {
        info!("running simulation to completion");
        for _ in 0..max_iterations {
            if self.core.arc.is_active() {
                match self.core.pump_arc() {
                    Ok(PlannerOutcome::Eagain) | Ok(_) => {}
                    Err(e) => bail!("arc generator error: {e}"),
                }
            }

            let outcome = self.core.exec(&mut self.producer)?;
            debug!(?outcome, "runtime quantum advanced");

            if self.core.runtime.state() == RuntimeState::New {
                self.core.runtime.take_pending_special(&mut self.core.planner);
            }

            while let Some(cmd) = self.consumer.dequeue() {
                self.trace.push(cmd.motor_mask, cmd.direction_mask, cmd.interval_ticks);
            }

            let idle = self.core.planner.is_empty()
                && self.core.runtime.state() == RuntimeState::Off
                && !self.core.arc.is_active();
            if idle {
                info!(steps = self.trace.entries.len(), "simulation reached completion");
                return Ok(());
            }
        }
        bail!("simulation did not reach completion within {max_iterations} iterations")
    }
}
