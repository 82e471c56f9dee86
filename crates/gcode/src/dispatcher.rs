//! Coordinate-mode state and command routing.
//!
//! Dispatches parsed G/M codes (G0/G1/G28/G90/G91/M104/M106/M107/M109/M112/M114)
//! synchronously against trait objects the firmware crate implements over its
//! own `Planner`/`Heater`/fan types, rather than holding an async, shared-state
//! dispatcher.
//!
//! M109 never busy-waits inside `dispatch` — it reports
//! [`DispatchOutcome::AwaitTemperature`] and expects the caller to keep
//! pumping its scheduler and re-issuing `M109` (or re-polling) until the
//! heater reports at-target. M114 is formatted with plain `{:.2}`.

use core::fmt::Write as _;

use crate::errors::GcodeError;
use crate::parser::{parse_line, Letter, ParseError, ParsedCommand};

/// Default feed rate in mm/min, matching `s_feedrate`'s `3000.0f` initializer.
pub const DEFAULT_FEED_RATE_MM_PER_MIN: f64 = 3000.0;

/// Absolute vs. relative interpretation of X/Y/Z/E parameters on a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordMode {
    #[default]
    Absolute,
    Relative,
}

/// A snapshot of the 4-axis commanded position, as reported by `M114` and
/// consulted to resolve relative moves.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub e: f64,
}

/// A resolved move target: each axis is `Some` only if this line specified
/// it (so an unspecified axis holds still, in both coordinate modes).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveTarget {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub e: Option<f64>,
}

/// Which axes a `G28` should home. An all-`false` selection (no axis letter
/// given) is expanded to "home everything" by the dispatcher before it ever
/// reaches [`MotionBackend::home`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisSelect {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisSelect {
    pub const fn all() -> Self {
        Self { x: true, y: true, z: true }
    }

    pub fn is_empty(&self) -> bool {
        !self.x && !self.y && !self.z
    }
}

/// The motion subsystem's capabilities, as the dispatcher needs them.
/// Implemented by the firmware crate's `Machine` over its `Planner`/`TrapQ`.
pub trait MotionBackend {
    type Error;
    fn move_linear(&mut self, target: MoveTarget, feed_rate_mm_per_s: f64) -> Result<(), Self::Error>;
    fn home(&mut self, axes: AxisSelect) -> Result<(), Self::Error>;
    fn position(&self) -> Position4;
}

/// The hotend heater's capabilities, as the dispatcher needs them.
pub trait HeaterBackend {
    fn set_target(&mut self, target_celsius: f64);
    fn is_at_target(&self) -> bool;
}

/// The part-cooling fan's capabilities, as the dispatcher needs them.
pub trait FanBackend {
    /// `speed` is already normalized to `0.0..=1.0`.
    fn set_speed(&mut self, speed: f64);
}

/// What the caller should do after a line dispatched successfully.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    /// Nothing further to do; respond "ok".
    Ok,
    /// `M109` is still waiting for the hotend to reach its target. The
    /// caller should keep running its scheduler/heater ticks and retry
    /// before sending "ok" — this never blocks inside `dispatch`.
    AwaitTemperature,
    /// `M104`/`M109`'s target temperature was set below or at 0, or an
    /// `M114` position query: `current` holds the 4-axis position to report
    /// (only meaningful for `M114`; otherwise ignore the payload).
    PositionReport(Position4),
    /// `M112`: emergency stop. The caller must halt all motion and heaters
    /// immediately and stop processing further lines.
    Halt,
}

/// Holds the two bits of cross-line state a line-oriented G-code stream
/// needs (coordinate mode and the last commanded feed rate) and turns parsed
/// commands into calls against the motion/heater/fan backends.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    mode: CoordMode,
    feed_rate_mm_per_min: f64,
}

impl Dispatcher {
    pub const fn new() -> Self {
        Self { mode: CoordMode::Absolute, feed_rate_mm_per_min: DEFAULT_FEED_RATE_MM_PER_MIN }
    }

    pub fn coord_mode(&self) -> CoordMode {
        self.mode
    }

    pub fn feed_rate_mm_per_min(&self) -> f64 {
        self.feed_rate_mm_per_min
    }

    /// Parses and executes one line. A blank line or a trailing comment is a
    /// silent no-op success, matching `gcode_process`'s `GCODE_ERR_EMPTY`/
    /// `GCODE_ERR_COMMENT` -> `"ok"` mapping.
    pub fn dispatch<M, H, F>(&mut self, line: &str, motion: &mut M, heater: &mut H, fan: &mut F) -> Result<DispatchOutcome, GcodeError>
    where
        M: MotionBackend,
        H: HeaterBackend,
        F: FanBackend,
    {
        let cmd = match parse_line(line) {
            Ok(cmd) => cmd,
            Err(ParseError::Empty) | Err(ParseError::Comment) => return Ok(DispatchOutcome::Ok),
            Err(ParseError::Invalid) => return Err(GcodeError::ParseInvalid),
        };

        match cmd.letter {
            Some(Letter::G) => self.dispatch_g(&cmd, motion),
            Some(Letter::M) => self.dispatch_m(&cmd, motion, heater, fan),
            None => Err(GcodeError::UnknownCommand),
        }
    }

    fn dispatch_g<M: MotionBackend>(&mut self, cmd: &ParsedCommand, motion: &mut M) -> Result<DispatchOutcome, GcodeError> {
        match cmd.code {
            0 | 1 => {
                if let Some(f) = cmd.f {
                    self.feed_rate_mm_per_min = f;
                }
                let target = match self.mode {
                    CoordMode::Absolute => MoveTarget { x: cmd.x, y: cmd.y, z: cmd.z, e: cmd.e },
                    CoordMode::Relative => {
                        let pos = motion.position();
                        MoveTarget {
                            x: cmd.x.map(|v| pos.x + v),
                            y: cmd.y.map(|v| pos.y + v),
                            z: cmd.z.map(|v| pos.z + v),
                            e: cmd.e.map(|v| pos.e + v),
                        }
                    }
                };
                let feed_rate_mm_per_s = self.feed_rate_mm_per_min / 60.0;
                motion.move_linear(target, feed_rate_mm_per_s).map_err(|_| GcodeError::ExecutionFailed)?;
                Ok(DispatchOutcome::Ok)
            }
            28 => {
                let mut axes = AxisSelect { x: cmd.x.is_some(), y: cmd.y.is_some(), z: cmd.z.is_some() };
                if axes.is_empty() {
                    axes = AxisSelect::all();
                }
                motion.home(axes).map_err(|_| GcodeError::ExecutionFailed)?;
                Ok(DispatchOutcome::Ok)
            }
            90 => {
                self.mode = CoordMode::Absolute;
                Ok(DispatchOutcome::Ok)
            }
            91 => {
                self.mode = CoordMode::Relative;
                Ok(DispatchOutcome::Ok)
            }
            _ => Err(GcodeError::UnknownCommand),
        }
    }

    fn dispatch_m<M, H, F>(&mut self, cmd: &ParsedCommand, motion: &mut M, heater: &mut H, fan: &mut F) -> Result<DispatchOutcome, GcodeError>
    where
        M: MotionBackend,
        H: HeaterBackend,
        F: FanBackend,
    {
        match cmd.code {
            104 => {
                if let Some(s) = cmd.s {
                    heater.set_target(s);
                }
                Ok(DispatchOutcome::Ok)
            }
            109 => {
                if let Some(s) = cmd.s {
                    heater.set_target(s);
                }
                if heater.is_at_target() {
                    Ok(DispatchOutcome::Ok)
                } else {
                    Ok(DispatchOutcome::AwaitTemperature)
                }
            }
            106 => {
                // S ranges 0..=255; clamp rather than reject an out-of-range value.
                let speed = cmd.s.map(|s| (s / 255.0).clamp(0.0, 1.0)).unwrap_or(1.0);
                fan.set_speed(speed);
                Ok(DispatchOutcome::Ok)
            }
            107 => {
                fan.set_speed(0.0);
                Ok(DispatchOutcome::Ok)
            }
            112 => Ok(DispatchOutcome::Halt),
            114 => Ok(DispatchOutcome::PositionReport(motion.position())),
            _ => Err(GcodeError::UnknownCommand),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the exact response text for a dispatch result, including
/// `M114`'s `X:.. Y:.. Z:.. E:..` line. Callers append their own line
/// terminator; this only produces the message body.
pub fn response_text(result: &Result<DispatchOutcome, GcodeError>, buf: &mut heapless::String<64>) {
    buf.clear();
    let _ = match result {
        Ok(DispatchOutcome::Ok) | Ok(DispatchOutcome::AwaitTemperature) | Ok(DispatchOutcome::Halt) => write!(buf, "ok"),
        Ok(DispatchOutcome::PositionReport(pos)) => write!(buf, "X:{:.2} Y:{:.2} Z:{:.2} E:{:.2}", pos.x, pos.y, pos.z, pos.e),
        Err(GcodeError::ParseInvalid) => write!(buf, "error: invalid command"),
        Err(GcodeError::UnknownCommand) => write!(buf, "error: unknown command"),
        Err(GcodeError::ExecutionFailed) => write!(buf, "error: execution failed"),
    };
}
