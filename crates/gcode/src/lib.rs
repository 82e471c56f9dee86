//! # G-code parsing and dispatch
//!
//! A single-line G-code parser and command dispatcher for a `no_std` 3D
//! printer MCU firmware: `parser` turns one line of serial input into a
//! [`ParsedCommand`](parser::ParsedCommand), and [`Dispatcher`] holds the
//! small amount of state a line-oriented G-code stream carries across
//! lines (coordinate mode, last commanded feed rate) and routes parsed
//! commands to whatever implements the motion/heater/fan capability traits.
//!
//! A backend-agnostic, synchronous parser and dispatcher usable directly on
//! the MCU: no async runtime, no shared-state locking, just a line in and a
//! response string out.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod dispatcher;
pub mod errors;
pub mod parser;

pub use dispatcher::{
    response_text, AxisSelect, CoordMode, DispatchOutcome, Dispatcher, FanBackend, HeaterBackend, MotionBackend, MoveTarget, Position4,
};
pub use errors::GcodeError;
pub use parser::{parse_line, Letter, ParseError, ParsedCommand};
