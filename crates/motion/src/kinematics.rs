//! Cartesian kinematics: axis identity and the position/direction maths the
//! iterative solver and planner build on.
//!
//! This firmware drives a plain Cartesian (not CoreXY) machine, so each
//! stepper axis maps 1:1 onto a Cartesian coordinate; the only per-axis
//! transform is the `steps_per_mm` scale factor. CoreXY is out of scope, so
//! there is no `Kinematics` trait with multiple implementations here.

use crate::sqrt;
use crate::Position;

/// One of the four independently-driven axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    E,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::E];
}

/// Straight-line distance between two positions across all 4 axes, folding
/// the extruder's `e` axis into the same distance metric as X/Y/Z.
pub fn distance(from: Position, to: Position) -> f64 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let dz = to.z - from.z;
    let de = to.e - from.e;
    sqrt(dx * dx + dy * dy + dz * dz + de * de)
}

/// Unit direction vector from `from` to `to`. Zero-length moves yield the
/// zero vector; callers must reject zero-distance moves before this point.
pub fn direction(from: Position, to: Position) -> Position {
    let d = distance(from, to);
    if d <= 0.0 {
        return Position::ZERO;
    }
    Position {
        x: (to.x - from.x) / d,
        y: (to.y - from.y) / d,
        z: (to.z - from.z) / d,
        e: (to.e - from.e) / d,
    }
}

/// Position along `axis`, in steps, for `start_pos + axes_r * distance_along`
/// scaled by `steps_per_mm`.
///
/// The Cartesian transform itself is the identity map, unlike CoreXY's
/// mixed A/B transform.
pub fn axis_step_position(axis: Axis, start_pos: Position, axes_r: Position, distance_along: f64, steps_per_mm: f64) -> f64 {
    (start_pos.get(axis) + axes_r.get(axis) * distance_along) * steps_per_mm
}
