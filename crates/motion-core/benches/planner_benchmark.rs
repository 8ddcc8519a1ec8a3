use criterion::{black_box, criterion_group, criterion_main, Criterion};
use motion_core::{Axis, PlannerQueue, NUM_AXES};

fn axes(feed_max: f32, jerk_max: f32) -> [Axis; NUM_AXES] {
    let mut a = [Axis::default(); NUM_AXES];
    for axis in a.iter_mut() {
        axis.velocity_max = feed_max;
        axis.feed_max = feed_max;
        axis.jerk_max = jerk_max;
    }
    a
}

/// Cost of queuing a move and running the bidirectional look-ahead
/// recalculation across a nearly-full ring.
fn benchmark_queue_and_replan(c: &mut Criterion) {
    let ax = axes(400.0, 5e7);

    c.bench_function("queue_line_with_replan", |b| {
        b.iter(|| {
            let mut planner: PlannerQueue = PlannerQueue::new();
            let mut target = [0.0; NUM_AXES];
            for i in 1..motion_core::RING_SIZE {
                target[0] = i as f32 * 5.0;
                target[1] = (i as f32 * 0.3).sin() * 5.0;
                planner.queue_line(black_box(target), 100.0, 1500.0, 0.05, black_box(&ax)).unwrap();
            }
        })
    });
}

criterion_group!(benches, benchmark_queue_and_replan);
criterion_main!(benches);
