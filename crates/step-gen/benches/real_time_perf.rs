use core::cell::RefCell;
use criterion::{criterion_group, criterion_main, Criterion};
use critical_section::Mutex;
use heapless::spsc::Queue;
use step_gen::{AtomicGpioPort, StepCommand, StepperController, Timer};

struct MockPort;
impl AtomicGpioPort for MockPort {
    fn set_and_clear_atomic(&mut self, _set_mask: u8, _clear_mask: u8) {}
    fn write(&mut self, _mask: u8) {}
}
struct MockTimer;
impl Timer for MockTimer {
    fn schedule_next(&mut self, _ticks: u16) {}
    fn trigger_now(&mut self) {}
    fn stop(&mut self) {}
}

static STEP_PORT: Mutex<RefCell<MockPort>> = Mutex::new(RefCell::new(MockPort));
static ENABLE_PORT: Mutex<RefCell<MockPort>> = Mutex::new(RefCell::new(MockPort));
static DIR_PORT: Mutex<RefCell<MockPort>> = Mutex::new(RefCell::new(MockPort));
static TIMER: Mutex<RefCell<MockTimer>> = Mutex::new(RefCell::new(MockTimer));
static mut COMMAND_QUEUE: Queue<StepCommand, 256> = Queue::new();

/// Worst-case execution time of the DDA tick, the function called directly
/// from the high-priority timer interrupt.
fn bench_stepper_isr_wcet(c: &mut Criterion) {
    let (_producer, consumer) = unsafe {
        #[allow(static_mut_refs)]
        COMMAND_QUEUE.split()
    };
    let mut controller = StepperController::<8>::new(consumer, 0);
    controller.start(&DIR_PORT, &TIMER);

    c.bench_function("stepper_isr_wcet", |b| {
        b.iter(|| {
            controller.on_timer_interrupt(&STEP_PORT, &ENABLE_PORT, &DIR_PORT, &TIMER);
        })
    });
}

criterion_group!(benches, bench_stepper_isr_wcet);
criterion_main!(benches);
