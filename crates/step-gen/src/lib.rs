#![deny(clippy::all)]
#![deny(warnings)]
#![no_std]

//! # Low-Latency DDA Step Pulse Generator
//!
//! This crate is the bottom of the motion stack: given a segment's per-motor
//! step counts and duration, it emits step pulses to up to six stepper motors
//! with sub-tick timing accuracy. It is a generalized Bresenham-style Digital
//! Differential Analyzer, pipelined for minimum interrupt latency.
//!
//! ## Pipelined Architecture for Lower Latency
//!
//! `StepperController` maintains a `next_command` fetched from the SPSC queue
//! *ahead of time*. When the timer interrupt fires:
//!
//! 1. **(Immediate)** `next_command` is executed instantly: fast GPIO register
//!    writes for step pins.
//! 2. **(Immediate)** The `interval_ticks` from the *just-executed* command is
//!    used to schedule the *next* timer interrupt.
//! 3. **(Deferred)** The controller dequeues the *following* command, updates
//!    direction pins only if they changed, and stores it in `next_command`.
//!
//! The time between interrupt trigger and step pulse is therefore minimal and
//! deterministic: queue operations and conditional logic are never on the
//! critical path.
//!
//! ## Safety
//!
//! - **Lock-free:** communication is via `heapless::spsc::Queue`.
//! - **No heap allocation:** fully `#![no_std]`.
//! - **Atomic GPIO:** `AtomicGpioPort` maps to hardware features like STM32's
//!   BSRR register for single-instruction, interrupt-safe pin manipulation.

use core::cell::RefCell;
use critical_section::Mutex;
use heapless::spsc::{Consumer, Producer, Queue};

/// Maximum number of physical motors a single controller can drive.
pub const MAX_MOTORS: usize = 6;

/// Depth of the step command queue shared between the exec interrupt (producer)
/// and the DDA timer interrupt (consumer).
pub const COMMAND_QUEUE_DEPTH: usize = 256;

/// A single step command to be executed by the `StepperController`.
///
/// Kept small to maximize how many commands fit in the queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct StepCommand {
    /// Bitmask of motors that should step (bit i = motor i).
    pub motor_mask: u8,
    /// Bitmask of the logical direction of each motor, before polarity is applied.
    pub direction_mask: u8,
    /// Timer ticks to wait *after* this step before the next one.
    pub interval_ticks: u16,
}

impl StepCommand {
    pub const fn new(motor_mask: u8, direction_mask: u8, interval_ticks: u16) -> Self {
        Self {
            motor_mask,
            direction_mask,
            interval_ticks,
        }
    }
}

/// A handle for enqueuing step commands from the segment runtime ("exec").
pub type StepperProducer = Producer<'static, StepCommand, COMMAND_QUEUE_DEPTH>;
/// A handle consumed by the DDA timer interrupt.
pub type StepperConsumer = Consumer<'static, StepCommand, COMMAND_QUEUE_DEPTH>;
/// Backing storage for the command queue; declare one `static mut` per controller.
pub type StepperQueue = Queue<StepCommand, COMMAND_QUEUE_DEPTH>;

/// Per-motor power management policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PowerMode {
    /// Motor stays energized indefinitely once enabled.
    AlwaysOn,
    /// Motor is de-energized after `idle_ticks` have elapsed since its last step.
    IdleTimeout { idle_ticks: u32 },
}

/// The main stepper controller: pipelined, low-latency, multi-motor.
pub struct StepperController<const N: usize> {
    command_consumer: StepperConsumer,
    positions: [i32; N],
    /// Caches the post-polarity direction of all motors, to avoid redundant GPIO writes.
    current_directions: u8,
    /// Per-motor direction-invert mask, XORed into every `direction_mask` before use.
    direction_polarity: u8,
    /// The next command to execute, fetched ahead of time.
    next_command: Option<StepCommand>,
    power_modes: [PowerMode; N],
    idle_countdown: [u32; N],
    energized: u8,
}

impl<const N: usize> StepperController<N> {
    /// Creates a new controller. `direction_polarity` bit `i` set inverts motor `i`'s
    /// direction line relative to the logical direction bit in each `StepCommand`.
    pub fn new(command_consumer: StepperConsumer, direction_polarity: u8) -> Self {
        assert!(N <= MAX_MOTORS, "StepperController supports at most {} motors", MAX_MOTORS);
        Self {
            command_consumer,
            positions: [0; N],
            current_directions: 0,
            direction_polarity,
            next_command: None,
            power_modes: [PowerMode::AlwaysOn; N],
            idle_countdown: [0; N],
            energized: 0,
        }
    }

    pub fn set_power_mode(&mut self, motor: usize, mode: PowerMode) {
        if let Some(slot) = self.power_modes.get_mut(motor) {
            *slot = mode;
        }
    }

    /// Primes the pipeline by loading the first command and starts the timer.
    ///
    /// Call after enqueuing the initial set of moves, before the first
    /// interrupt is expected.
    pub fn start<DIR_PORT, TIMER>(
        &mut self,
        dir_port: &Mutex<RefCell<DIR_PORT>>,
        timer: &Mutex<RefCell<TIMER>>,
    ) where
        DIR_PORT: AtomicGpioPort,
        TIMER: Timer,
    {
        critical_section::with(|cs| {
            self.prepare_next_command_internal(dir_port, cs);
            if let Some(cmd) = self.next_command {
                let timer = &mut *timer.borrow(cs).borrow_mut();
                timer.schedule_next(cmd.interval_ticks.max(100));
            }
        });
    }

    /// The DDA tick: the core interrupt handler, designed for minimum latency.
    ///
    /// **Must be called from the high-priority hardware timer interrupt.**
    #[inline(always)]
    pub fn on_timer_interrupt<STEP_PORT, ENABLE_PORT, DIR_PORT, TIMER>(
        &mut self,
        step_port: &Mutex<RefCell<STEP_PORT>>,
        enable_port: &Mutex<RefCell<ENABLE_PORT>>,
        dir_port: &Mutex<RefCell<DIR_PORT>>,
        timer: &Mutex<RefCell<TIMER>>,
    ) where
        STEP_PORT: AtomicGpioPort,
        ENABLE_PORT: AtomicGpioPort,
        DIR_PORT: AtomicGpioPort,
        TIMER: Timer,
    {
        critical_section::with(|cs| {
            // --- CRITICAL PATH START ---
            if let Some(cmd_to_execute) = self.next_command.take() {
                let step_port = &mut *step_port.borrow(cs).borrow_mut();
                let timer = &mut *timer.borrow(cs).borrow_mut();

                step_port.set_and_clear_atomic(cmd_to_execute.motor_mask, cmd_to_execute.motor_mask);

                if cmd_to_execute.interval_ticks > 0 {
                    timer.schedule_next(cmd_to_execute.interval_ticks);
                } else {
                    timer.trigger_now();
                }
                // --- CRITICAL PATH END ---

                self.energize(cmd_to_execute.motor_mask, enable_port, cs);
                self.update_positions(cmd_to_execute.motor_mask, cmd_to_execute.direction_mask);
                self.reset_idle_countdown(cmd_to_execute.motor_mask);
                self.prepare_next_command_internal(dir_port, cs);

                if self.next_command.is_none() {
                    timer.stop();
                }
            } else {
                let timer = &mut *timer.borrow(cs).borrow_mut();
                timer.stop();
            }
        });
    }

    /// Advances idle-power countdowns by `elapsed_ticks` (called from a lower-rate
    /// periodic source, not the DDA tick itself) and de-energizes any motor whose
    /// countdown reaches zero.
    pub fn tick_idle_power<ENABLE_PORT>(
        &mut self,
        elapsed_ticks: u32,
        enable_port: &Mutex<RefCell<ENABLE_PORT>>,
    ) where
        ENABLE_PORT: AtomicGpioPort,
    {
        let mut to_clear: u8 = 0;
        for i in 0..N {
            if let PowerMode::IdleTimeout { .. } = self.power_modes[i] {
                if self.energized & (1 << i) != 0 {
                    self.idle_countdown[i] = self.idle_countdown[i].saturating_sub(elapsed_ticks);
                    if self.idle_countdown[i] == 0 {
                        to_clear |= 1 << i;
                    }
                }
            }
        }
        if to_clear != 0 {
            critical_section::with(|cs| {
                let enable_port = &mut *enable_port.borrow(cs).borrow_mut();
                enable_port.set_and_clear_atomic(0, to_clear);
            });
            self.energized &= !to_clear;
        }
    }

    fn energize<ENABLE_PORT>(
        &mut self,
        motor_mask: u8,
        enable_port: &Mutex<RefCell<ENABLE_PORT>>,
        cs: critical_section::CriticalSection<'_>,
    ) where
        ENABLE_PORT: AtomicGpioPort,
    {
        let newly = motor_mask & !self.energized;
        if newly != 0 {
            let enable_port = &mut *enable_port.borrow(cs).borrow_mut();
            enable_port.set_and_clear_atomic(newly, 0);
            self.energized |= newly;
        }
    }

    fn reset_idle_countdown(&mut self, motor_mask: u8) {
        for i in 0..N {
            if motor_mask & (1 << i) != 0 {
                if let PowerMode::IdleTimeout { idle_ticks } = self.power_modes[i] {
                    self.idle_countdown[i] = idle_ticks;
                }
            }
        }
    }

    /// Internal helper: dequeue and prepare the next command, writing direction
    /// pins ahead of the step pulse they precede.
    fn prepare_next_command_internal<DIR_PORT>(
        &mut self,
        dir_port: &Mutex<RefCell<DIR_PORT>>,
        cs: critical_section::CriticalSection<'_>,
    ) where
        DIR_PORT: AtomicGpioPort,
    {
        if let Some(cmd) = self.command_consumer.dequeue() {
            let physical_direction = cmd.direction_mask ^ self.direction_polarity;
            let direction_changes = self.current_directions ^ physical_direction;
            if direction_changes != 0 {
                let dir_port = &mut *dir_port.borrow(cs).borrow_mut();
                dir_port.write(physical_direction);
                self.current_directions = physical_direction;
            }
            self.next_command = Some(cmd);
        } else {
            self.next_command = None;
        }
    }

    #[inline]
    fn update_positions(&mut self, motor_mask: u8, direction_mask: u8) {
        for i in 0..N {
            if (motor_mask >> i) & 1 != 0 {
                if (direction_mask >> i) & 1 != 0 {
                    self.positions[i] = self.positions[i].wrapping_add(1);
                } else {
                    self.positions[i] = self.positions[i].wrapping_sub(1);
                }
            }
        }
    }

    pub fn get_position(&self, motor_index: usize) -> Option<i32> {
        self.positions.get(motor_index).copied()
    }
}

// --- Hardware Abstraction Traits ---

/// A GPIO port supporting atomic bit set/clear, mapping to features like
/// STM32's BSRR register for single-instruction, interrupt-safe writes.
pub trait AtomicGpioPort {
    /// Atomically sets some pins and clears others on the port.
    fn set_and_clear_atomic(&mut self, set_mask: u8, clear_mask: u8);
    /// Writes a full mask to the port.
    fn write(&mut self, mask: u8);
}

/// A hardware timer that can be rescheduled from within the ISR it drives.
pub trait Timer {
    fn schedule_next(&mut self, ticks: u16);
    fn trigger_now(&mut self);
    fn stop(&mut self);
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct MockAtomicGpioPort {
        state: u8,
        set_clear_calls: u32,
        write_calls: u32,
    }

    impl AtomicGpioPort for MockAtomicGpioPort {
        fn set_and_clear_atomic(&mut self, set_mask: u8, clear_mask: u8) {
            self.state |= set_mask;
            self.state &= !clear_mask;
            self.set_clear_calls += 1;
        }
        fn write(&mut self, mask: u8) {
            self.state = mask;
            self.write_calls += 1;
        }
    }

    #[derive(Debug, Default)]
    struct MockTimer {
        scheduled_ticks: u16,
        triggered_now: bool,
        stopped: bool,
    }

    impl Timer for MockTimer {
        fn schedule_next(&mut self, ticks: u16) {
            self.scheduled_ticks = ticks;
            self.triggered_now = false;
            self.stopped = false;
        }
        fn trigger_now(&mut self) {
            self.triggered_now = true;
            self.stopped = false;
        }
        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    static mut TEST_QUEUE: StepperQueue = Queue::new();

    #[test]
    fn test_pipelined_execution_flow() {
        let (mut producer, consumer) = unsafe {
            #[allow(static_mut_refs)]
            {
                TEST_QUEUE.clear();
                TEST_QUEUE.split()
            }
        };
        let mut controller = StepperController::<4>::new(consumer, 0);

        let step_port = Mutex::new(RefCell::new(MockAtomicGpioPort::default()));
        let enable_port = Mutex::new(RefCell::new(MockAtomicGpioPort::default()));
        let dir_port = Mutex::new(RefCell::new(MockAtomicGpioPort::default()));
        let timer = Mutex::new(RefCell::new(MockTimer::default()));

        let cmd1 = StepCommand::new(0b0001, 0b0001, 1000);
        let cmd2 = StepCommand::new(0b0010, 0b0000, 500);
        producer.enqueue(cmd1).unwrap();
        producer.enqueue(cmd2).unwrap();

        controller.start(&dir_port, &timer);

        assert_eq!(controller.next_command, Some(cmd1));
        critical_section::with(|cs| {
            assert_eq!(dir_port.borrow(cs).borrow().state, 0b0001);
            assert_eq!(timer.borrow(cs).borrow().scheduled_ticks, 1000);
        });
        assert_eq!(controller.get_position(0), Some(0));

        controller.on_timer_interrupt(&step_port, &enable_port, &dir_port, &timer);

        assert_eq!(controller.get_position(0), Some(1));
        assert_eq!(controller.get_position(1), Some(0));
        critical_section::with(|cs| {
            assert_eq!(step_port.borrow(cs).borrow().set_clear_calls, 1);
            assert_eq!(enable_port.borrow(cs).borrow().state & 0b0001, 0b0001);
        });

        assert_eq!(controller.next_command, Some(cmd2));
        critical_section::with(|cs| {
            assert_eq!(dir_port.borrow(cs).borrow().state, 0b0000);
            assert_eq!(timer.borrow(cs).borrow().scheduled_ticks, 1000);
        });

        controller.on_timer_interrupt(&step_port, &enable_port, &dir_port, &timer);

        assert_eq!(controller.get_position(0), Some(1));
        assert_eq!(controller.get_position(1), Some(-1));

        assert!(controller.next_command.is_none());
        critical_section::with(|cs| {
            assert_eq!(timer.borrow(cs).borrow().scheduled_ticks, 500);
            assert!(timer.borrow(cs).borrow().stopped);
        });
    }

    #[test]
    fn test_direction_polarity_inverts_physical_line() {
        let (mut producer, consumer) = unsafe {
            #[allow(static_mut_refs)]
            {
                TEST_QUEUE.clear();
                TEST_QUEUE.split()
            }
        };
        // Invert motor 0's direction line.
        let mut controller = StepperController::<2>::new(consumer, 0b0001);
        let dir_port = Mutex::new(RefCell::new(MockAtomicGpioPort::default()));
        let timer = Mutex::new(RefCell::new(MockTimer::default()));

        producer.enqueue(StepCommand::new(0b0001, 0b0001, 100)).unwrap();
        controller.start(&dir_port, &timer);

        critical_section::with(|cs| {
            // Logical direction bit 1 becomes physical 0 after polarity invert.
            assert_eq!(dir_port.borrow(cs).borrow().state, 0b0000);
        });
    }

    #[test]
    fn test_idle_power_timeout_deenergizes_motor() {
        let (mut producer, consumer) = unsafe {
            #[allow(static_mut_refs)]
            {
                TEST_QUEUE.clear();
                TEST_QUEUE.split()
            }
        };
        let mut controller = StepperController::<1>::new(consumer, 0);
        controller.set_power_mode(0, PowerMode::IdleTimeout { idle_ticks: 10 });

        let step_port = Mutex::new(RefCell::new(MockAtomicGpioPort::default()));
        let enable_port = Mutex::new(RefCell::new(MockAtomicGpioPort::default()));
        let dir_port = Mutex::new(RefCell::new(MockAtomicGpioPort::default()));
        let timer = Mutex::new(RefCell::new(MockTimer::default()));

        producer.enqueue(StepCommand::new(0b1, 0b1, 100)).unwrap();
        controller.start(&dir_port, &timer);
        controller.on_timer_interrupt(&step_port, &enable_port, &dir_port, &timer);

        critical_section::with(|cs| {
            assert_eq!(enable_port.borrow(cs).borrow().state & 0b1, 0b1);
        });

        controller.tick_idle_power(5, &enable_port);
        critical_section::with(|cs| {
            assert_eq!(enable_port.borrow(cs).borrow().state & 0b1, 0b1, "not yet idle");
        });
        controller.tick_idle_power(5, &enable_port);
        critical_section::with(|cs| {
            assert_eq!(enable_port.borrow(cs).borrow().state & 0b1, 0, "motor should be de-energized");
        });
    }
}
