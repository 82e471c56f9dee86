//! Error types for the motion crate.

/// Errors that can occur while planning or queuing motion.
#[derive(Debug, PartialEq, Clone, Copy, thiserror::Error)]
pub enum MotionError {
    /// The TrapQ has no room for another segment; the planner must drain by
    /// emission before retrying.
    #[error("trapq is full")]
    QueueFull,
    /// The lookahead ring has no room for another pending move.
    #[error("lookahead queue is full")]
    LookaheadFull,
    /// The requested move has (near-)zero distance and was dropped.
    #[error("move distance is below the minimum threshold")]
    ZeroLengthMove,
    /// The requested end position is outside the configured axis limits.
    #[error("target position is outside the configured travel limits")]
    OutOfBounds,
    /// A per-axis step event queue overflowed.
    #[error("step event queue is full")]
    StepQueueFull,
}
