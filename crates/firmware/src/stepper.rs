//! Per-axis pulse queue: turns [`motion::itersolve`]'s relative step times
//! into absolute scheduler instants and drains them against the [`Hal`].
//!
//! `itersolve::StepperKinematics::generate_steps` returns times relative to
//! whatever `epoch_time` it's given, encoded as a `u32` microsecond count —
//! so this module always passes a move's own `print_time` as that epoch
//! (never the firmware's absolute uptime), keeping every offset bounded to a
//! single move's duration regardless of how long the printer has been
//! running, then re-bases each offset onto the [`scheduler::Instant`] that
//! move actually started at.

use heapless::Deque;
use motion::{Axis, Move, StepperKinematics};
use scheduler::Instant;

use crate::hal::Hal;

const PENDING_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedStep {
    at: Instant,
    dir: i8,
}

/// One axis's stepper: the kinematics model tracking commanded step
/// position, and a queue of not-yet-emitted pulses.
pub struct StepperAxis {
    axis: Axis,
    kinematics: StepperKinematics,
    pending: Deque<QueuedStep, PENDING_CAPACITY>,
}

impl StepperAxis {
    pub fn new(axis: Axis, steps_per_mm: f64) -> Self {
        Self { axis, kinematics: StepperKinematics::new(axis, steps_per_mm), pending: Deque::new() }
    }

    pub fn set_commanded_position(&mut self, position: f64) {
        self.kinematics.set_commanded_position(position);
    }

    pub fn commanded_position(&self) -> f64 {
        self.kinematics.commanded_position()
    }

    /// Generates every step `mv` demands on this axis and appends them to
    /// the pending queue, converting the solver's move-relative offsets into
    /// absolute instants anchored at `move_start`.
    pub fn enqueue_move(&mut self, mv: &Move, move_start: Instant) -> Result<(), motion::MotionError> {
        let mut relative: Deque<motion::StepEvent, PENDING_CAPACITY> = Deque::new();
        self.kinematics.generate_steps(mv, mv.print_time, &mut relative)?;
        while let Some(ev) = relative.pop_front() {
            self.pending.push_back(QueuedStep { at: move_start.wrapping_add(ev.time_us), dir: ev.dir }).map_err(|_| motion::MotionError::StepQueueFull)?;
        }
        Ok(())
    }

    /// The instant the next pending pulse is due, if any.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.front().map(|s| s.at)
    }

    /// If a pulse is due at or before `now`, drives it through `hal` and
    /// returns the instant it fired at. Only ever emits one pulse per call
    /// so the caller can re-check the scheduler between pulses.
    pub fn emit_due(&mut self, now: Instant, hal: &mut impl Hal) -> Option<Instant> {
        let due = matches!(self.pending.front(), Some(s) if scheduler::before_eq(s.at, now));
        if !due {
            return None;
        }
        let step = self.pending.pop_front()?;
        hal.set_direction(self.axis, step.dir > 0);
        hal.step(self.axis);
        Some(step.at)
    }

    /// Drops every unfired pulse and the kinematics' internal step counter's
    /// notion of "where it thinks it is" is left as-is — callers that abort
    /// a move (homing's emergency stop on endstop trigger) must also call
    /// [`Self::set_commanded_position`] afterward to reconcile it with
    /// wherever the axis actually ended up.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}
