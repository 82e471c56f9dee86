//! Microsecond clock type and overflow-safe comparisons.
//!
//! The firmware's notion of "now" is a free-running 32-bit microsecond
//! counter that wraps roughly every 71 minutes. Comparisons have to go
//! through a signed difference rather than `<`/`>` directly, or a wrap would
//! make a timer that is merely far in the future look like it's already due.

/// A point in time, in microseconds since an arbitrary epoch (wraps at 2^32).
pub type Instant = u32;

/// `true` if `a` is strictly before `b`, correctly handling `u32` wraparound.
pub fn before(a: Instant, b: Instant) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

/// `true` if `a` is at or before `b`.
pub fn before_eq(a: Instant, b: Instant) -> bool {
    (a.wrapping_sub(b) as i32) <= 0
}
