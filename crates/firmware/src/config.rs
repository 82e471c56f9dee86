//! Compile-time machine configuration: motion limits, PID gains, homing
//! parameters, and timer periods. Pin assignments themselves live in
//! whatever concrete [`crate::hal::Hal`] implementation maps them to real
//! GPIOs.

use motion::Position;

/// Steps-per-mm for each of the 4 axes, `[X, Y, Z, E]`.
pub const STEPS_PER_MM: [f64; 4] = [80.0, 80.0, 400.0, 93.0];

pub const MAX_VELOCITY_MM_S: f64 = 200.0;
pub const MAX_ACCEL_MM_S2: f64 = 3000.0;

/// A conservative starting point for a newly configured machine.
pub const SQUARE_CORNER_VELOCITY_MM_S: f64 = 5.0;

pub const AXIS_MIN: Position = Position { x: 0.0, y: 0.0, z: 0.0, e: f64::NEG_INFINITY };
pub const AXIS_MAX: Position = Position { x: 220.0, y: 220.0, z: 250.0, e: f64::INFINITY };

pub const HOTEND_PID_KP: f64 = 22.2;
pub const HOTEND_PID_KI: f64 = 1.08;
pub const HOTEND_PID_KD: f64 = 114.0;

/// Absolute ceiling the runaway monitor shuts the heater down above.
pub const HOTEND_SAFETY_MAX_TEMP_C: f64 = 280.0;
/// Minimum temperature rise expected within `HOTEND_SAFETY_MIN_HEAT_GAIN_TIME_S`
/// while the heater is on, or the monitor assumes a broken heater/sensor.
pub const HOTEND_SAFETY_MIN_HEAT_GAIN_C: f64 = 5.0;
pub const HOTEND_SAFETY_MIN_HEAT_GAIN_TIME_S: f64 = 20.0;
/// Maximum steady-state deviation from setpoint before the monitor warns.
pub const HOTEND_SAFETY_MAX_DEVIATION_C: f64 = 15.0;

pub const SERIAL_BAUD: u32 = 115_200;

/// `HOMING_SPEED` (mm/s); the fast-seek pass runs at twice this.
pub const HOMING_SPEED_MM_S: f64 = 10.0;
pub const HOMING_RETRACT_MM: f64 = 5.0;
pub const HOMING_TIMEOUT_S: f64 = 30.0;

/// `ENDSTOP_SAMPLE_INTERVAL`: endstops are polled roughly every 1ms.
pub const ENDSTOP_POLL_INTERVAL_US: u32 = 1_000;

/// The heater PID loop's tick period: a 100ms cadence.
pub const HEATER_TICK_INTERVAL_US: u32 = 100_000;

/// Builds the [`motion::planner::Config`] this firmware's planner runs with.
pub fn motion_config() -> motion::planner::Config {
    motion::planner::Config::new(MAX_VELOCITY_MM_S, MAX_ACCEL_MM_S2, SQUARE_CORNER_VELOCITY_MM_S, AXIS_MIN, AXIS_MAX)
}

/// Builds the [`thermal::SafetyLimits`] the hotend's runaway monitor runs
/// with.
pub fn hotend_safety_limits() -> thermal::SafetyLimits<f64> {
    thermal::SafetyLimits {
        max_temp: HOTEND_SAFETY_MAX_TEMP_C,
        min_heat_gain_temp: HOTEND_SAFETY_MIN_HEAT_GAIN_C,
        min_heat_gain_time_s: HOTEND_SAFETY_MIN_HEAT_GAIN_TIME_S,
        max_deviation: HOTEND_SAFETY_MAX_DEVIATION_C,
    }
}
