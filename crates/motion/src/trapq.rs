//! The trapezoidal move queue: a bounded history of finished move segments
//! plus the segments still active (not yet guaranteed to never be revisited
//! by the step generator).
//!
//! Each move carries its own `start_pos`/`axes_r` direction vector and the
//! three trapezoid phase durations; the queue keeps two lists (`active`,
//! `history`) rather than one. Each [`Move`] is a small `Copy` value and the
//! two lists are [`heapless::Deque`]s of values, sidestepping the
//! pointer-stability problem an intrusive linked list of pool slots would
//! otherwise need to solve with lifetimes.

use crate::Position;

/// Upper bound on how many moves may be in flight (active + history)
/// simultaneously.
pub const TRAPQ_MAX_MOVES: usize = 32;

/// One finished trapezoidal move segment: constant acceleration, then
/// (optionally zero-length) cruise, then constant deceleration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    /// Absolute time this move starts, in seconds from firmware boot.
    pub print_time: f64,
    /// Starting speed in mm/s along the move's direction vector.
    pub start_v: f64,
    /// Half the (signed) acceleration used during the accel phase; the decel
    /// phase uses the same magnitude with the sign implied by `cruise_v`.
    pub half_accel: f64,
    /// Cruise speed in mm/s.
    pub cruise_v: f64,
    /// Duration of the acceleration phase, in seconds.
    pub accel_t: f64,
    /// Duration of the constant-speed cruise phase, in seconds. Zero for a
    /// pure triangle profile.
    pub cruise_t: f64,
    /// Duration of the deceleration phase, in seconds.
    pub decel_t: f64,
    /// Position at the start of the move.
    pub start_pos: Position,
    /// Unit direction vector the move travels along.
    pub axes_r: Position,
}

impl Move {
    /// Total duration of this move.
    pub fn move_t(&self) -> f64 {
        self.accel_t + self.cruise_t + self.decel_t
    }

    /// Distance traveled along `axes_r` at time `t` after `print_time`,
    /// clamped to `[0, move_t()]`.
    pub fn distance_at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, self.move_t());
        if t <= self.accel_t {
            self.start_v * t + self.half_accel * t * t
        } else if t <= self.accel_t + self.cruise_t {
            let accel_dist = self.start_v * self.accel_t + self.half_accel * self.accel_t * self.accel_t;
            accel_dist + self.cruise_v * (t - self.accel_t)
        } else {
            let accel_dist = self.start_v * self.accel_t + self.half_accel * self.accel_t * self.accel_t;
            let cruise_dist = accel_dist + self.cruise_v * self.cruise_t;
            let dt = t - self.accel_t - self.cruise_t;
            cruise_dist + self.cruise_v * dt - self.half_accel * dt * dt
        }
    }

    /// Absolute 4-axis position at time `t` after `print_time`.
    pub fn position_at(&self, t: f64) -> Position {
        let d = self.distance_at(t);
        Position {
            x: self.start_pos.x + self.axes_r.x * d,
            y: self.start_pos.y + self.axes_r.y * d,
            z: self.start_pos.z + self.axes_r.z * d,
            e: self.start_pos.e + self.axes_r.e * d,
        }
    }

    /// `true` if absolute time `t` falls within this move's span.
    pub fn covers(&self, t: f64) -> bool {
        t >= self.print_time && t <= self.print_time + self.move_t()
    }
}

/// Error returned when the active queue has no room for another move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapQFull;

/// The move queue: an `active` deque of moves the step generator may still
/// need, and a `history` deque of moves already fully stepped but kept
/// around briefly so `position_at` queries slightly in the past still
/// resolve (a one-second retention window).
pub struct TrapQ {
    active: heapless::Deque<Move, TRAPQ_MAX_MOVES>,
    history: heapless::Deque<Move, TRAPQ_MAX_MOVES>,
}

impl TrapQ {
    pub const fn new() -> Self {
        Self {
            active: heapless::Deque::new(),
            history: heapless::Deque::new(),
        }
    }

    /// Appends a freshly planned move to the active queue.
    pub fn append(&mut self, mv: Move) -> Result<(), TrapQFull> {
        self.active.push_back(mv).map_err(|_| TrapQFull)
    }

    /// Moves every active move whose span ends at or before `upto` into
    /// history, in order. Grounded in `trapq_finalize_moves`: once the step
    /// generator has produced every step for a move, it is "finalized" and
    /// no longer needs to be re-scanned by `find_move_at_time`.
    pub fn finalize_upto(&mut self, upto: f64) {
        while let Some(mv) = self.active.front() {
            if mv.print_time + mv.move_t() > upto {
                break;
            }
            let mv = self.active.pop_front().expect("front just checked Some");
            if self.history.is_full() {
                self.history.pop_front();
            }
            let _ = self.history.push_back(mv);
        }
    }

    /// Drops history entries that ended before `before`.
    pub fn free_before(&mut self, before: f64) {
        while let Some(mv) = self.history.front() {
            if mv.print_time + mv.move_t() >= before {
                break;
            }
            self.history.pop_front();
        }
    }

    /// The absolute position at time `t`, searching active moves first (most
    /// likely to contain `t`) then history. Returns `None` if `t` falls
    /// outside every known move's span.
    pub fn position_at(&self, t: f64) -> Option<Position> {
        self.active
            .iter()
            .find(|mv| mv.covers(t))
            .or_else(|| self.history.iter().find(|mv| mv.covers(t)))
            .map(|mv| mv.position_at(t - mv.print_time))
    }

    /// Finds the active move covering absolute time `t`, if any. Used by the
    /// step generator to locate the segment it should currently be stepping.
    pub fn move_at(&self, t: f64) -> Option<&Move> {
        self.active.iter().find(|mv| mv.covers(t))
    }

    pub fn has_active_moves(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn last_active(&self) -> Option<&Move> {
        self.active.back()
    }

    /// Iterates the active queue in append order. Used by the firmware's
    /// step generator to discover moves newly appended by [`crate::Planner`]
    /// since its own watermark, without the planner itself having to hand
    /// back every flushed move.
    pub fn active_moves(&self) -> impl Iterator<Item = &Move> {
        self.active.iter()
    }
}

impl Default for TrapQ {
    fn default() -> Self {
        Self::new()
    }
}
