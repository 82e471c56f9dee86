use criterion::{black_box, criterion_group, criterion_main, Criterion};
use motion::planner::{Config, Planner};
use motion::trapq::TrapQ;
use motion::Position;

fn config() -> Config {
    Config::new(
        100.0,
        1500.0,
        5.0,
        Position { x: -1e6, y: -1e6, z: -1e6, e: -1e6 },
        Position { x: 1e6, y: 1e6, z: 1e6, e: 1e6 },
    )
}

fn benchmark_planner(c: &mut Criterion) {
    c.bench_function("plan_and_flush_long_move", |b| {
        b.iter(|| {
            let mut trapq = TrapQ::new();
            let mut planner = Planner::new(config(), Position::ZERO);
            planner
                .plan_move(&mut trapq, black_box(Position { x: 150.0, y: 50.0, z: 20.0, e: 0.0 }), black_box(100.0))
                .unwrap();
            planner.flush(&mut trapq).unwrap();
        })
    });

    c.bench_function("lookahead_through_ten_corners", |b| {
        b.iter(|| {
            let mut trapq = TrapQ::new();
            let mut planner = Planner::new(config(), Position::ZERO);
            for i in 0..10 {
                let target = if i % 2 == 0 {
                    Position { x: 10.0 * (i as f64 + 1.0), y: 0.0, z: 0.0, e: 0.0 }
                } else {
                    Position { x: 10.0 * (i as f64), y: 10.0, z: 0.0, e: 0.0 }
                };
                planner.plan_move(&mut trapq, black_box(target), black_box(80.0)).unwrap();
            }
            planner.flush(&mut trapq).unwrap();
        })
    });
}

criterion_group!(benches, benchmark_planner);
criterion_main!(benches);
