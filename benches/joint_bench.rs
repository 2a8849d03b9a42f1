use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use jointworks::*;
use std::hint::black_box;

const DT: f32 = 1.0 / 60.0;

/// Independent pendulums, each hanging from the world on its own hinge.
fn prepare_world(joint_count: usize) -> JointEngine {
    let mut engine = JointEngine::new(DT);
    for i in 0..joint_count {
        let anchor = Vec3::new(0.0, 0.0, i as f32 * 2.0);
        let bob = engine.add_body(RigidBody::default().with_position(anchor + Vec3::X));
        let _ = engine.attach(
            HingeJoint::new(HingeSettings::default()),
            None,
            bob,
            Frame::from_front(Vec3::Z, anchor),
            JointSettings::default(),
        );
    }
    engine
}

fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    for &count in &[128usize, 512, 2048] {
        group.bench_with_input(
            BenchmarkId::new("sequential", count),
            &count,
            |b, &count| {
                let mut engine = prepare_world(count);
                engine.set_parallel_enabled(false);
                b.iter(|| {
                    engine.step(black_box(DT));
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, &count| {
            let mut engine = prepare_world(count);
            engine.set_parallel_enabled(true);
            b.iter(|| {
                engine.step(black_box(DT));
            });
        });
    }
    group.finish();
}

fn bench_curve_tracking(c: &mut Criterion) {
    let mut group = c.benchmark_group("curve_tracking");

    let points: Vec<Vec3> = (0..256)
        .map(|i| {
            let theta = std::f32::consts::TAU * i as f32 / 256.0;
            Vec3::new(10.0 * theta.cos(), 0.0, 10.0 * theta.sin())
        })
        .collect();
    let curve = Curve::new(points, true);
    let samples: Vec<Vec3> = (0..1000)
        .map(|i| {
            let theta = 0.005 * i as f32;
            Vec3::new(10.2 * theta.cos(), 0.1, 10.2 * theta.sin())
        })
        .collect();

    group.bench_function("locate_by_point", |b| {
        b.iter(|| {
            for sample in &samples {
                let _ = black_box(curve.locate_by_point(*sample));
            }
        })
    });

    group.bench_function("locate_near_previous", |b| {
        b.iter(|| {
            let mut distance = 0.0;
            for sample in &samples {
                if let Ok(location) = curve.locate_near_previous(distance, *sample) {
                    distance = location.distance;
                }
            }
            black_box(distance)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_world_step, bench_curve_tracking);
criterion_main!(benches);
