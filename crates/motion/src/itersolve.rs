//! Iterative step-time solver: inverts a move's position-vs-time function to
//! find the instants individual steps should be emitted.
//!
//! A hybrid Newton-Raphson/bisection root finder locates each step boundary
//! crossing time; [`generate_steps`] then walks integer step boundaries and
//! pushes a [`StepEvent`] for each one.

use crate::kinematics::{axis_step_position, Axis};
use crate::trapq::Move;
use crate::MotionError;

const MAX_ITERATIONS: u32 = 50;
const TOLERANCE: f64 = 1e-9;
const FINITE_DIFF_DT: f64 = 1e-6;

/// A single step pulse to emit: microseconds since the move queue's epoch,
/// and the direction to drive the axis (`+1` or `-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct StepEvent {
    pub time_us: u32,
    pub dir: i8,
}

/// Finds the time (relative to `mv.print_time`) at which `axis` reaches
/// `target_step_pos` steps, searching within `[low, high]`.
///
/// This is a direct port of `itersolve_find_step_time`'s hybrid solver: a
/// Newton step using a centered finite-difference derivative, falling back
/// to bisection whenever the derivative is too small to trust or the Newton
/// step would leave the bracket.
pub fn find_step_time(mv: &Move, axis: Axis, steps_per_mm: f64, target_step_pos: f64, mut low: f64, mut high: f64) -> Option<f64> {
    let f = |t: f64| axis_step_position(axis, mv.start_pos, mv.axes_r, mv.distance_at(t), steps_per_mm) - target_step_pos;

    let mut f_low = f(low);
    let f_high = f(high);
    // Target not bracketed: the step boundary isn't actually crossed in this
    // window (can happen at a move's very first/last step).
    if f_low == 0.0 {
        return Some(low);
    }
    if f_high == 0.0 {
        return Some(high);
    }
    if (f_low > 0.0) == (f_high > 0.0) {
        return None;
    }

    let mut time = (low + high) * 0.5;
    for _ in 0..MAX_ITERATIONS {
        let f_time = f(time);
        if f_time.abs() < TOLERANCE {
            return Some(time);
        }

        if (f_time > 0.0) == (f_low > 0.0) {
            low = time;
            f_low = f_time;
        } else {
            high = time;
        }

        let derivative = (f(time + FINITE_DIFF_DT) - f(time - FINITE_DIFF_DT)) / (2.0 * FINITE_DIFF_DT);
        let next = if derivative.abs() < 1e-12 {
            (low + high) * 0.5
        } else {
            time - f_time / derivative
        };

        time = if next > low && next < high { next } else { (low + high) * 0.5 };
    }
    Some(time)
}

/// Per-axis stepper state: how far along the axis has already been stepped,
/// and the axis's steps-per-mm scale.
pub struct StepperKinematics {
    pub axis: Axis,
    pub steps_per_mm: f64,
    /// The step position (in whole steps) already emitted up to and
    /// including the most recent call to [`generate_steps`].
    commanded_step_pos: i64,
}

impl StepperKinematics {
    pub fn new(axis: Axis, steps_per_mm: f64) -> Self {
        Self { axis, steps_per_mm, commanded_step_pos: 0 }
    }

    pub fn set_commanded_position(&mut self, position: f64) {
        self.commanded_step_pos = (position * self.steps_per_mm).round() as i64;
    }

    pub fn commanded_position(&self) -> f64 {
        self.commanded_step_pos as f64 / self.steps_per_mm
    }

    /// Walks every integer step boundary this axis crosses during `mv`,
    /// appending a [`StepEvent`] (in absolute microseconds since epoch) for
    /// each to `out`. Mirrors `itersolve_generate_steps`'s
    /// `floor(pos)+1`/`ceil(pos)-1`-per-direction walk, but actually queues
    /// the step instead of discarding it.
    pub fn generate_steps(&mut self, mv: &Move, epoch_time: f64, out: &mut heapless::Deque<StepEvent, 256>) -> Result<(), MotionError> {
        let move_t = mv.move_t();
        let start_step_pos = axis_step_position(self.axis, mv.start_pos, mv.axes_r, 0.0, self.steps_per_mm);
        let end_step_pos = axis_step_position(self.axis, mv.start_pos, mv.axes_r, mv.distance_at(move_t), self.steps_per_mm);

        if (end_step_pos - start_step_pos).abs() < 1e-9 {
            return Ok(());
        }

        let dir: i8 = if end_step_pos > start_step_pos { 1 } else { -1 };
        let mut target = if dir > 0 {
            (self.commanded_step_pos as f64).floor() + 1.0
        } else {
            (self.commanded_step_pos as f64).ceil() - 1.0
        };

        loop {
            let reached_end = if dir > 0 { target > end_step_pos } else { target < end_step_pos };
            if reached_end {
                break;
            }

            if let Some(t) = find_step_time(mv, self.axis, self.steps_per_mm, target, 0.0, move_t) {
                let abs_time = mv.print_time + t - epoch_time;
                let time_us = (abs_time * 1_000_000.0).max(0.0) as u32;
                out.push_back(StepEvent { time_us, dir }).map_err(|_| MotionError::StepQueueFull)?;
                self.commanded_step_pos += dir as i64;
            }
            target += dir as f64;
        }
        Ok(())
    }
}
