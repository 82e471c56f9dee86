//! Dispatch-level errors: everything [`crate::parser::parse_line`] itself
//! can't already catch.

/// What went wrong handling one line, as reported back over the serial link.
///
/// A parse failure and an unrecognized command get distinct messages, but
/// every *execution* failure downstream (motion queue full, out-of-bounds
/// target, homing timeout, …) collapses to one generic "execution failed"
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GcodeError {
    #[error("line is not a valid G/M command")]
    ParseInvalid,
    #[error("unsupported G/M command")]
    UnknownCommand,
    #[error("command execution failed")]
    ExecutionFailed,
}
