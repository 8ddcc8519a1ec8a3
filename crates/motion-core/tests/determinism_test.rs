//! Regression tests for the planner/runtime pipeline's determinism.

use heapless::spsc::Queue;
use motion_core::{Axis, AxisId, Motor, PlannerOutcome, PlannerQueue, RuntimeState, SegmentRuntime, NUM_AXES, NUM_MOTORS};

fn axes(feed_max: f32, jerk_max: f32) -> [Axis; NUM_AXES] {
    let mut a = [Axis::default(); NUM_AXES];
    for axis in a.iter_mut() {
        axis.velocity_max = feed_max;
        axis.feed_max = feed_max;
        axis.jerk_max = jerk_max;
    }
    a
}

fn motors() -> [Motor; NUM_MOTORS] {
    let mut m = [Motor::default(); NUM_MOTORS];
    m[0].axis = AxisId::X;
    m[0].travel_per_rev = 1.0; // 200 steps/mm @ 1.8deg full step
    m[1].axis = AxisId::Y;
    m[1].travel_per_rev = 1.0;
    m
}

#[test]
fn diagonal_move_produces_a_deterministic_step_trace() {
    let mut planner: PlannerQueue = PlannerQueue::new();
    let ax = axes(800.0, 2.0e6);
    let mut target = [0.0; NUM_AXES];
    target[0] = 10.0;
    target[1] = 10.0;
    planner.queue_line(target, 800.0, 1000.0, 0.05, &ax).unwrap();

    let mut runtime = SegmentRuntime::new();
    let mot = motors();
    static mut Q: step_gen::StepperQueue = Queue::new();
    let (mut producer, mut consumer) = unsafe {
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
    assert!((runtime.position()[1] - 10.0).abs() < 0.05);

    // Both motors stepped forward from the very first emitted command.
    let first = consumer.dequeue().expect("at least one step command emitted");
    assert_eq!(first.motor_mask & 0b11, 0b11);
    assert_eq!(first.direction_mask & 0b11, 0b11);

    // Intervals shrink while accelerating, then a cruise plateau is reached.
    let mut min_interval = first.interval_ticks;
    let mut saw_shorter_than_first = false;
    while let Some(cmd) = consumer.dequeue() {
        if cmd.interval_ticks < first.interval_ticks {
            saw_shorter_than_first = true;
        }
        min_interval = min_interval.min(cmd.interval_ticks);
    }
    assert!(saw_shorter_than_first, "expected intervals to shrink during acceleration");
    assert!(min_interval < first.interval_ticks);
}

#[test]
fn unequal_steps_per_unit_steps_each_motor_its_own_count() {
    // X and Y travel the same distance but have different steps_per_unit
    // (200 vs 77), so a correct DDA must fire each motor a different
    // number of times within any given quantum. A planner that reuses one
    // shared mask per quantum (stepping every active motor the busiest
    // motor's count of times) would over-step Y here.
    let mut planner: PlannerQueue = PlannerQueue::new();
    let ax = axes(800.0, 2.0e6);
    let mut target = [0.0; NUM_AXES];
    target[0] = 10.0;
    target[1] = 10.0;
    planner.queue_line(target, 800.0, 1000.0, 0.05, &ax).unwrap();

    let mut runtime = SegmentRuntime::new();
    let mut mot = motors();
    mot[1].travel_per_rev = 2.6; // steps_per_unit = 200 / 2.6 ~= 76.9

    static mut Q2: step_gen::StepperQueue = Queue::new();
    let (mut producer, mut consumer) = unsafe {
        #[allow(static_mut_refs)]
        Q2.split()
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

    let mut per_motor_pulses = [0u32; NUM_MOTORS];
    let mut saw_mismatched_submask = false;
    while let Some(cmd) = consumer.dequeue() {
        if cmd.motor_mask != 0b11 {
            saw_mismatched_submask = true;
        }
        for i in 0..NUM_MOTORS {
            if cmd.motor_mask & (1 << i) != 0 {
                per_motor_pulses[i] += 1;
            }
        }
    }

    assert!(saw_mismatched_submask, "expected per-tick submasks to differ between the two motors");

    for (i, motor) in mot.iter().enumerate() {
        let expected = (target[motor.axis.index()] * motor.steps_per_unit()).round() as u32;
        if expected == 0 {
            continue;
        }
        assert_eq!(per_motor_pulses[i], expected, "motor {i} pulse count mismatch");
    }
}

#[test]
fn promoted_block_head_body_tail_lengths_sum_to_block_length() {
    let mut planner: PlannerQueue = PlannerQueue::new();
    let ax = axes(100.0, 5e6);
    let mut target = [0.0; NUM_AXES];
    target[0] = 40.0;
    planner.queue_line(target, 100.0, 500.0, 0.05, &ax).unwrap();

    let mut runtime = SegmentRuntime::new();
    let mot = motors();
    static mut Q3: step_gen::StepperQueue = Queue::new();
    let (mut producer, _consumer) = unsafe {
        #[allow(static_mut_refs)]
        Q3.split()
    };

    // One `exec` call while idle promotes the queued block to running and
    // evaluates its profile's head/body/tail split.
    assert_eq!(runtime.state(), RuntimeState::Off);
    runtime.exec(&mut planner, &mot, &mut producer).unwrap();
    assert_eq!(runtime.state(), RuntimeState::Run);

    let block = planner.running().expect("block promoted to running");
    let sum = block.head_length + block.body_length + block.tail_length;
    assert!(
        (sum - block.length).abs() < block.length * 0.01,
        "head+body+tail ({sum}) should match block length ({})",
        block.length
    );
}
