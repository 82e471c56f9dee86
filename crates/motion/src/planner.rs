//! Two-pass lookahead planner: turns a stream of target positions and feed
//! rates into trapezoidal move segments appended to a [`TrapQ`].
//!
//! A short ring of not-yet-finalized moves is kept so that, once a few moves
//! are queued, a reverse pass can propagate braking constraints backwards
//! (move N can't demand a higher entry speed than move N+1 can actually
//! decelerate to) before a forward pass commits each move's concrete
//! `start_v`/`cruise_v`/`end_v`.

use crate::kinematics::{direction, distance};
use crate::sqrt;
use crate::trapq::{Move, TrapQ};
use crate::{MotionError, Position};

/// Depth of the pending-move lookahead ring.
pub const LOOKAHEAD_SIZE: usize = 16;

const MIN_MOVE_DISTANCE: f64 = 0.000001;

/// Machine-wide motion limits the planner enforces.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub max_velocity: f64,
    pub max_accel: f64,
    /// Junction deviation parameter ("square corner velocity"): the speed at
    /// which a 90-degree corner could be taken without exceeding `max_accel`.
    pub square_corner_velocity: f64,
    /// Accel magnitude used when decelerating toward a move's end velocity;
    /// may differ from `max_accel`, defaulting to the same value unless the
    /// caller overrides it.
    pub max_accel_to_decel: f64,
    pub min_pos: Position,
    pub max_pos: Position,
}

impl Config {
    pub fn new(max_velocity: f64, max_accel: f64, square_corner_velocity: f64, min_pos: Position, max_pos: Position) -> Self {
        Self {
            max_velocity,
            max_accel,
            square_corner_velocity,
            max_accel_to_decel: max_accel,
            min_pos,
            max_pos,
        }
    }
}

/// A move still in the lookahead ring: a target endpoint and the planner's
/// best current guess at its entry/cruise/exit speeds, refined as later
/// moves are pushed.
#[derive(Debug, Clone, Copy)]
struct PendingMove {
    start_pos: Position,
    end_pos: Position,
    axes_r: Position,
    distance: f64,
    max_v: f64,
    start_v: f64,
    cruise_v: f64,
    end_v: f64,
    max_start_v: f64,
    max_end_v: f64,
    max_cruise_v: f64,
}

/// Accepts target positions at a feed rate, smooths junction velocities
/// across a short lookahead window, and emits finished [`Move`]s into a
/// [`TrapQ`].
pub struct Planner {
    config: Config,
    // A plain Vec, not a Deque: `process()` needs indexed random access (the
    // reverse pass walks back-to-front) as well as mutation in place, which
    // heapless::Deque does not support. Popping the front is an O(n) shift,
    // acceptable at LOOKAHEAD_SIZE's small depth.
    ring: heapless::Vec<PendingMove, LOOKAHEAD_SIZE>,
    /// Position already committed to the lookahead ring (distinct from the
    /// `TrapQ`'s own notion of "current" position, which lags behind by
    /// however many moves are still unflushed).
    commanded_position: Position,
    print_time: f64,
}

impl Planner {
    pub fn new(config: Config, start_position: Position) -> Self {
        Self {
            config,
            ring: heapless::Vec::new(),
            commanded_position: start_position,
            print_time: 0.0,
        }
    }

    pub fn commanded_position(&self) -> Position {
        self.commanded_position
    }

    pub fn print_time(&self) -> f64 {
        self.print_time
    }

    pub fn has_pending_moves(&self) -> bool {
        !self.ring.is_empty()
    }

    /// Overwrites one axis of the commanded position without queuing a move.
    ///
    /// Grounded in `toolhead_home`'s `s_commanded_pos[axis] = 0` once an
    /// endstop trips: homing establishes a new origin directly rather than
    /// by moving there.
    pub fn set_commanded_position_axis(&mut self, axis: crate::kinematics::Axis, value: f64) {
        self.commanded_position.set(axis, value);
    }

    /// Queues a linear move from the planner's current commanded position to
    /// `target` at `speed` (mm/s, clamped to `max_velocity`).
    ///
    /// Distance/bounds are checked up front, and `commanded_position` is
    /// advanced only once the move is actually accepted into the ring. If
    /// the ring is full, one reverse+forward pass plus a flush is attempted
    /// to drain it before retrying once; a still-full ring after that is
    /// reported to the caller as an error rather than silently dropped.
    pub fn plan_move(&mut self, trapq: &mut TrapQ, target: Position, speed: f64) -> Result<(), MotionError> {
        self.plan_move_inner(trapq, target, speed, true)
    }

    /// Same as [`Self::plan_move`] but skips the axis travel-limit check.
    ///
    /// Grounded in `toolhead_home`, which explicitly disables limit checking
    /// for the duration of a homing seek (the seek target is deliberately
    /// placed past `min_pos`/`max_pos` so the axis keeps moving until its
    /// endstop trips). Not exposed to G-code dispatch; only the firmware's
    /// homing state machine uses it.
    pub fn plan_move_unbounded(&mut self, trapq: &mut TrapQ, target: Position, speed: f64) -> Result<(), MotionError> {
        self.plan_move_inner(trapq, target, speed, false)
    }

    fn plan_move_inner(&mut self, trapq: &mut TrapQ, target: Position, speed: f64, check_bounds: bool) -> Result<(), MotionError> {
        if check_bounds {
            for axis in crate::kinematics::Axis::ALL {
                let v = target.get(axis);
                if v < self.config.min_pos.get(axis) || v > self.config.max_pos.get(axis) {
                    return Err(MotionError::OutOfBounds);
                }
            }
        }

        let start_pos = self.commanded_position;
        let dist = distance(start_pos, target);
        if dist < MIN_MOVE_DISTANCE {
            return Err(MotionError::ZeroLengthMove);
        }

        let max_v = speed.min(self.config.max_velocity);
        let axes_r = direction(start_pos, target);
        let mv = PendingMove {
            start_pos,
            end_pos: target,
            axes_r,
            distance: dist,
            max_v,
            start_v: 0.0,
            cruise_v: max_v,
            end_v: 0.0,
            max_start_v: max_v,
            max_end_v: max_v,
            max_cruise_v: max_v,
        };

        if self.ring.push(mv).is_err() {
            self.process();
            self.flush(trapq)?;
            self.ring.push(mv).map_err(|_| MotionError::LookaheadFull)?;
        }
        self.commanded_position = target;

        // Drain eagerly once the ring is nearly full, keeping a couple of
        // slots free for a junction-velocity pass to still have neighbors
        // to look at.
        if self.ring.len() >= LOOKAHEAD_SIZE - 2 {
            self.process();
            while self.ring.len() > 2 {
                self.flush_one(trapq)?;
            }
        }
        Ok(())
    }

    /// Reverse pass then forward pass over the whole ring, settling each
    /// pending move's `start_v`/`cruise_v`/`end_v`. Grounded in
    /// `lookahead_process`.
    fn process(&mut self) {
        let len = self.ring.len();
        if len == 0 {
            return;
        }

        // Reverse pass: propagate braking constraints backwards.
        let mut next_max_start_v = 0.0f64;
        let mut next_axes_r: Option<Position> = None;
        for i in (0..len).rev() {
            let (distance, max_v, axes_r) = {
                let mv = &self.ring[i];
                (mv.distance, mv.max_v, mv.axes_r)
            };
            // The junction between this move and its successor caps this
            // move's exit speed (max_end_v) and the successor's entry speed
            // (already folded into next_max_start_v below) — not this move's
            // own entry speed, which is capped by its own predecessor on a
            // later loop iteration.
            let junction_v = match next_axes_r {
                Some(next_r) => junction_velocity(axes_r, next_r, self.config.square_corner_velocity, self.config.max_accel, max_v),
                None => max_v,
            };
            let max_end_v = (if i == len - 1 { 0.0 } else { next_max_start_v }).min(junction_v);
            let max_start_v_unclamped = sqrt(max_end_v * max_end_v + 2.0 * self.config.max_accel * distance);
            let max_start_v = max_start_v_unclamped.min(max_v);

            {
                let mv = &mut self.ring[i];
                mv.max_end_v = max_end_v;
                mv.max_start_v = max_start_v;
            }
            next_max_start_v = max_start_v;
            next_axes_r = Some(axes_r);
        }

        // Forward pass: commit concrete start/cruise/end speeds.
        let mut prev_end_v = 0.0f64;
        for i in 0..len {
            let mv = &mut self.ring[i];
            mv.start_v = prev_end_v.min(mv.max_start_v);
            let max_cruise_v_sq = mv.start_v * mv.start_v + 2.0 * self.config.max_accel * mv.distance;
            mv.cruise_v = sqrt(max_cruise_v_sq).min(mv.max_v);
            let max_end_v_sq = mv.cruise_v * mv.cruise_v - 2.0 * self.config.max_accel_to_decel * mv.distance;
            let max_end_v = if max_end_v_sq > 0.0 { sqrt(max_end_v_sq) } else { 0.0 };
            mv.end_v = max_end_v.min(mv.max_end_v);
            prev_end_v = mv.end_v;
        }
    }

    /// Pops and finalizes every pending move into `trapq`. Call [`process`]
    /// first so velocities are settled.
    pub fn flush(&mut self, trapq: &mut TrapQ) -> Result<(), MotionError> {
        self.process();
        while !self.ring.is_empty() {
            self.flush_one(trapq)?;
        }
        Ok(())
    }

    fn flush_one(&mut self, trapq: &mut TrapQ) -> Result<(), MotionError> {
        if self.ring.is_empty() {
            return Ok(());
        }
        let mv = self.ring.remove(0);
        let profile = trapezoidal_profile(mv.distance, mv.start_v, mv.cruise_v, mv.end_v, self.config.max_accel);

        let finished = Move {
            print_time: self.print_time,
            start_v: mv.start_v,
            half_accel: 0.5 * profile.accel,
            cruise_v: profile.cruise_v,
            accel_t: profile.accel_t,
            cruise_t: profile.cruise_t,
            decel_t: profile.decel_t,
            start_pos: mv.start_pos,
            axes_r: mv.axes_r,
        };

        trapq.append(finished).map_err(|_| MotionError::QueueFull)?;
        self.print_time += finished.move_t();
        Ok(())
    }
}

struct TrapezoidalProfile {
    accel: f64,
    cruise_v: f64,
    accel_t: f64,
    cruise_t: f64,
    decel_t: f64,
}

/// Builds the accel/cruise/decel split for a move of `distance` mm from
/// `start_v` to `end_v`, cruising at up to `cruise_v`, limited to `accel`
/// mm/s^2. Falls back to a triangle profile (no cruise phase) when the
/// requested cruise speed can't be reached in the available distance.
///
/// Grounded in `calc_trapezoidal_profile`.
fn trapezoidal_profile(distance: f64, start_v: f64, cruise_v: f64, end_v: f64, accel: f64) -> TrapezoidalProfile {
    let accel_dist = (cruise_v * cruise_v - start_v * start_v) / (2.0 * accel);
    let decel_dist = (cruise_v * cruise_v - end_v * end_v) / (2.0 * accel);
    let cruise_dist = distance - accel_dist - decel_dist;

    if cruise_dist < 0.0 {
        let peak_v_sq = (start_v * start_v + end_v * end_v) * 0.5 + accel * distance;
        let peak_v = sqrt(peak_v_sq.max(0.0)).max(start_v).max(end_v);
        let accel_t = (peak_v - start_v) / accel;
        let decel_t = (peak_v - end_v) / accel;
        TrapezoidalProfile { accel, cruise_v: peak_v, accel_t, cruise_t: 0.0, decel_t }
    } else {
        let accel_t = (cruise_v - start_v) / accel;
        let decel_t = (cruise_v - end_v) / accel;
        let cruise_t = cruise_dist / cruise_v;
        TrapezoidalProfile { accel, cruise_v, accel_t, cruise_t, decel_t }
    }
}

/// Maximum entry speed for the corner between two unit direction vectors,
/// given the configured square-corner-velocity and acceleration limit.
///
/// Grounded in `calc_junction_velocity`: a near-180-degree turn (`dot <
/// -0.999`) is treated as a full stop, a near-straight continuation (`dot >
/// 0.999`) is unrestricted, and everything in between uses the
/// curvature-deviation formula `v_j = sqrt(accel * deviation / sin(theta/2))`.
fn junction_velocity(prev_r: Position, next_r: Position, square_corner_velocity: f64, accel: f64, max_v: f64) -> f64 {
    let dot = prev_r.x * next_r.x + prev_r.y * next_r.y + prev_r.z * next_r.z + prev_r.e * next_r.e;
    if dot < -0.999 {
        return 0.0;
    }
    if dot > 0.999 {
        return max_v;
    }
    let sin_half_theta = sqrt((1.0 - dot) * 0.5);
    let deviation = square_corner_velocity * square_corner_velocity / accel;
    sqrt(accel * deviation / sin_half_theta).min(max_v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::new(100.0, 1000.0, 5.0, Position { x: -200.0, y: -200.0, z: -10.0, e: -1e6 }, Position { x: 200.0, y: 200.0, z: 200.0, e: 1e6 })
    }

    #[test]
    fn straight_line_move_reaches_cruise_speed() {
        let mut trapq = TrapQ::new();
        let mut planner = Planner::new(test_config(), Position::ZERO);
        planner.plan_move(&mut trapq, Position { x: 50.0, y: 0.0, z: 0.0, e: 0.0 }, 50.0).unwrap();
        planner.flush(&mut trapq).unwrap();
        let mv = trapq.last_active().unwrap();
        assert!((mv.cruise_v - 50.0).abs() < 1e-6 || mv.cruise_t == 0.0);
    }

    #[test]
    fn short_move_falls_back_to_triangle_profile() {
        let mut trapq = TrapQ::new();
        let mut planner = Planner::new(test_config(), Position::ZERO);
        planner.plan_move(&mut trapq, Position { x: 0.01, y: 0.0, z: 0.0, e: 0.0 }, 100.0).unwrap();
        planner.flush(&mut trapq).unwrap();
        let mv = trapq.last_active().unwrap();
        assert_eq!(mv.cruise_t, 0.0);
    }

    #[test]
    fn zero_length_move_is_rejected() {
        let mut trapq = TrapQ::new();
        let mut planner = Planner::new(test_config(), Position::ZERO);
        let err = planner.plan_move(&mut trapq, Position::ZERO, 50.0).unwrap_err();
        assert_eq!(err, MotionError::ZeroLengthMove);
    }

    #[test]
    fn out_of_bounds_target_is_rejected() {
        let mut trapq = TrapQ::new();
        let mut planner = Planner::new(test_config(), Position::ZERO);
        let err = planner.plan_move(&mut trapq, Position { x: 9999.0, y: 0.0, z: 0.0, e: 0.0 }, 50.0).unwrap_err();
        assert_eq!(err, MotionError::OutOfBounds);
    }

    #[test]
    fn commanded_position_advances_only_after_successful_queueing() {
        let mut trapq = TrapQ::new();
        let mut planner = Planner::new(test_config(), Position::ZERO);
        let before = planner.commanded_position();
        let _ = planner.plan_move(&mut trapq, Position { x: 9999.0, y: 0.0, z: 0.0, e: 0.0 }, 50.0);
        assert_eq!(planner.commanded_position(), before);
    }

    #[test]
    fn right_angle_corner_caps_junction_velocity() {
        // cos(theta) = 0 exactly at a right angle, so sin(theta/2) = sqrt(0.5).
        let prev_r = Position { x: 1.0, y: 0.0, z: 0.0, e: 0.0 };
        let next_r = Position { x: 0.0, y: 1.0, z: 0.0, e: 0.0 };
        let v = junction_velocity(prev_r, next_r, 5.0, 1000.0, 100.0);
        // deviation = 25/1000 = 0.025, v_j = sqrt(1000*0.025/sqrt(0.5)) ~= 5.95
        assert!((v - 5.95).abs() < 0.05, "v = {v}");
    }

    #[test]
    fn collinear_moves_are_unrestricted() {
        let r = Position { x: 1.0, y: 0.0, z: 0.0, e: 0.0 };
        assert_eq!(junction_velocity(r, r, 5.0, 1000.0, 42.0), 42.0);
    }

    #[test]
    fn reversal_forces_full_stop() {
        let r = Position { x: 1.0, y: 0.0, z: 0.0, e: 0.0 };
        let rev = Position { x: -1.0, y: 0.0, z: 0.0, e: 0.0 };
        assert_eq!(junction_velocity(r, rev, 5.0, 1000.0, 42.0), 0.0);
    }
}
