//! End-to-end determinism checks across planner -> trapq -> itersolve.

use motion::itersolve::StepperKinematics;
use motion::kinematics::Axis;
use motion::planner::{Config, Planner};
use motion::trapq::TrapQ;
use motion::Position;

fn config() -> Config {
    Config::new(
        150.0,
        1500.0,
        5.0,
        Position { x: -1.0, y: -1.0, z: -1.0, e: -1e6 },
        Position { x: 300.0, y: 300.0, z: 300.0, e: 1e6 },
    )
}

#[test]
fn diagonal_move_generates_identical_steps_on_repeated_runs() {
    let run = || {
        let mut trapq = TrapQ::new();
        let mut planner = Planner::new(config(), Position::ZERO);
        planner.plan_move(&mut trapq, Position { x: 10.0, y: 10.0, z: 0.0, e: 0.0 }, 100.0).unwrap();
        planner.flush(&mut trapq).unwrap();

        let mv = *trapq.last_active().unwrap();
        let mut sk = StepperKinematics::new(Axis::X, 80.0);
        let mut out = heapless::Deque::<motion::StepEvent, 256>::new();
        sk.generate_steps(&mv, 0.0, &mut out).unwrap();
        out.iter().copied().collect::<heapless::Vec<_, 256>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn diagonal_move_emits_800_steps_at_80_steps_per_mm() {
    let mut trapq = TrapQ::new();
    let mut planner = Planner::new(config(), Position::ZERO);
    planner.plan_move(&mut trapq, Position { x: 10.0, y: 10.0, z: 0.0, e: 0.0 }, 100.0).unwrap();
    planner.flush(&mut trapq).unwrap();

    let mv = *trapq.last_active().unwrap();
    let mut sk = StepperKinematics::new(Axis::X, 80.0);
    let mut out = heapless::Deque::<motion::StepEvent, 256>::new();
    sk.generate_steps(&mv, 0.0, &mut out).unwrap();
    assert_eq!(out.len(), 800);
}

#[test]
fn step_times_are_strictly_non_decreasing() {
    let mut trapq = TrapQ::new();
    let mut planner = Planner::new(config(), Position::ZERO);
    planner.plan_move(&mut trapq, Position { x: 20.0, y: 0.0, z: 0.0, e: 0.0 }, 120.0).unwrap();
    planner.flush(&mut trapq).unwrap();

    let mv = *trapq.last_active().unwrap();
    let mut sk = StepperKinematics::new(Axis::X, 80.0);
    let mut out = heapless::Deque::<motion::StepEvent, 256>::new();
    sk.generate_steps(&mv, 0.0, &mut out).unwrap();

    let mut last = 0u32;
    for ev in out.iter() {
        assert!(ev.time_us >= last);
        last = ev.time_us;
    }
}

/// The junction velocity a 90-degree corner caps both legs to, given this
/// test's `max_accel=1500`/`square_corner_velocity=5.0` config.
fn expected_corner_junction_v() -> f64 {
    let max_accel = 1500.0;
    let square_corner_velocity = 5.0;
    let sin_half_theta = 0.5f64.sqrt();
    let deviation = square_corner_velocity * square_corner_velocity / max_accel;
    (max_accel * deviation / sin_half_theta).sqrt()
}

#[test]
fn right_angle_corner_slows_the_junction_below_either_legs_cruise() {
    let mut trapq = TrapQ::new();
    let mut planner = Planner::new(config(), Position::ZERO);
    planner.plan_move(&mut trapq, Position { x: 50.0, y: 0.0, z: 0.0, e: 0.0 }, 100.0).unwrap();
    planner.plan_move(&mut trapq, Position { x: 50.0, y: 50.0, z: 0.0, e: 0.0 }, 100.0).unwrap();
    planner.flush(&mut trapq).unwrap();

    assert_eq!(trapq.active_len(), 2);

    let moves: heapless::Vec<motion::trapq::Move, 8> = trapq.active_moves().copied().collect();
    let first = &moves[0];
    let second = &moves[1];

    // velocity at the end of a move's decel phase: cruise_v - 2*half_accel*decel_t.
    let first_end_v = first.cruise_v - 2.0 * first.half_accel * first.decel_t;
    let expected = expected_corner_junction_v();

    assert!((first_end_v - expected).abs() < 0.01, "move 0 end_v {first_end_v} != expected junction {expected}");
    assert!((second.start_v - expected).abs() < 0.01, "move 1 start_v {} != expected junction {expected}", second.start_v);
    assert!(first_end_v < first.cruise_v - 1.0, "corner should slow well below either leg's ~100mm/s cruise");
    assert!(second.start_v < second.cruise_v - 1.0, "corner should slow well below either leg's ~100mm/s cruise");
}
