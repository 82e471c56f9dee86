//! Firmware-level errors: the things [`crate::machine::Machine`] itself can
//! fail at, distinct from a single G-code line's [`gcode::GcodeError`].

/// Errors [`crate::machine::Machine::home`] and the `MotionBackend` impl can
/// surface up through the G-code dispatcher as `"error: execution failed"`.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum FirmwareError {
    #[error("motion queue rejected the move")]
    Motion(#[from] motion::MotionError),
    /// No endstop triggered within `HOMING_TIMEOUT_S` of starting the seek.
    #[error("homing timed out waiting for an endstop")]
    HomingTimeout,
}
