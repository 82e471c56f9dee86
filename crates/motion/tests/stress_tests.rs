#![cfg(test)]

use motion::itersolve::StepperKinematics;
use motion::kinematics::Axis;
use motion::planner::{Config, Planner};
use motion::trapq::TrapQ;
use motion::{MotionError, Position};

fn config() -> Config {
    Config::new(
        2500.0,
        62500.0,
        5.0,
        Position { x: -1e6, y: -1e6, z: -1e6, e: -1e6 },
        Position { x: 1e6, y: 1e6, z: 1e6, e: 1e6 },
    )
}

#[test]
fn lookahead_ring_drains_instead_of_erroring_under_sustained_load() {
    // Planning far more moves than LOOKAHEAD_SIZE must never error: the
    // planner eagerly drains into the trapq long before the ring fills.
    let mut trapq = TrapQ::new();
    let mut planner = Planner::new(config(), Position::ZERO);

    for i in 1..=100 {
        let target = Position { x: i as f64 * 1.0, y: 0.0, z: 0.0, e: 0.0 };
        planner.plan_move(&mut trapq, target, 10.0).unwrap();
    }
    planner.flush(&mut trapq).unwrap();
    assert_eq!(planner.commanded_position().x, 100.0);
}

#[test]
fn trapq_reports_full_once_capacity_is_exceeded_without_flushing() {
    let mut trapq = TrapQ::new();
    let mut planner = Planner::new(config(), Position::ZERO);

    // Queue moves one at a time without ever flushing the trapq itself;
    // the planner's own eager-drain keeps pushing into trapq, so eventually
    // trapq's 32-slot capacity is exhausted and plan_move surfaces that as
    // MotionError::QueueFull rather than silently dropping the move.
    let mut last_err = None;
    for i in 1..=200 {
        let target = Position { x: i as f64 * 0.5, y: 0.0, z: 0.0, e: 0.0 };
        if let Err(e) = planner.plan_move(&mut trapq, target, 10.0) {
            last_err = Some(e);
            break;
        }
    }
    assert_eq!(last_err, Some(MotionError::QueueFull));
}

#[test]
fn high_velocity_move_never_emits_a_zero_interval_step() {
    let mut trapq = TrapQ::new();
    let mut planner = Planner::new(config(), Position::ZERO);
    planner.plan_move(&mut trapq, Position { x: 200.0, y: 0.0, z: 0.0, e: 0.0 }, 2500.0).unwrap();
    planner.flush(&mut trapq).unwrap();

    let mv = *trapq.last_active().unwrap();
    let mut sk = StepperKinematics::new(Axis::X, 80.0);
    let mut out = heapless::Deque::<motion::StepEvent, 4096>::new();
    sk.generate_steps(&mv, 0.0, &mut out).unwrap();

    let mut last = None;
    for ev in out.iter() {
        if let Some(prev) = last {
            assert_ne!(ev.time_us, prev, "two steps must not share a timestamp");
        }
        last = Some(ev.time_us);
    }
    assert!(!out.is_empty());
}

#[test]
fn many_small_segments_around_a_circle_rarely_come_to_a_full_stop() {
    let mut trapq = TrapQ::new();
    let mut planner = Planner::new(config(), Position::ZERO);
    let segments = 64;
    let radius = 50.0;

    let mut stops = 0;
    for i in 1..=segments {
        let angle = (i as f64 / segments as f64) * 2.0 * core::f64::consts::PI;
        let target = Position { x: radius * angle.cos(), y: radius * angle.sin(), z: 0.0, e: 0.0 };
        planner.plan_move(&mut trapq, target, 100.0).unwrap();
    }
    planner.flush(&mut trapq).unwrap();

    // Junction-velocity smoothing across a near-circular path should keep
    // entry speed away from zero for all but (at most) the very first move.
    if let Some(first) = trapq.move_at(0.0) {
        if first.start_v <= 1e-6 {
            stops += 1;
        }
    }
    assert!(stops <= 1, "unexpectedly stopped {stops} times on a smooth near-circular path");
}
