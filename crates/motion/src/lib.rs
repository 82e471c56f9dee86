//! # Motion Control Crate
//!
//! A deterministic motion queue, iterative step-time solver, Cartesian
//! kinematics, and two-pass lookahead planner, usable on both host and MCU
//! (`no_std`-friendly).
//!
//! Pipeline: [`Planner`] accepts target positions and feed rates, smooths
//! junction velocities across a short lookahead window, and emits finished
//! trapezoidal segments into a [`TrapQ`]. Each axis's [`StepperKinematics`]
//! then asks the [`itersolve`] solver to invert that segment's position
//! function into the times at which individual steps occur.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod errors;
pub mod itersolve;
pub mod kinematics;
pub mod planner;
pub mod trapq;

pub use errors::MotionError;
pub use itersolve::{StepEvent, StepperKinematics};
pub use kinematics::Axis;
pub use planner::Planner;
pub use trapq::{Move, TrapQ};

/// A position in the machine's 4 independently-driven axes.
/// Linear units are millimeters; `e` is the extruder's filament axis.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub e: f64,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0, z: 0.0, e: 0.0 };

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::E => self.e,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
            Axis::E => self.e = value,
        }
    }
}

#[cfg(feature = "std")]
pub(crate) fn sqrt(v: f64) -> f64 {
    v.sqrt()
}

#[cfg(not(feature = "std"))]
pub(crate) fn sqrt(v: f64) -> f64 {
    libm::sqrt(v)
}
