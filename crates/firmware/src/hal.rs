//! The hardware capability trait this firmware is built against.
//!
//! Every hardware access point — stepper pulse/direction/enable lines,
//! endstop inputs, thermistor ADC, heater/fan PWM — is collected into a
//! single object-safe-friendly trait: one concrete type implements [`Hal`]
//! for a real board, another (`sim::FakeHal`) implements it entirely in
//! memory for host-side tests.

use motion::Axis;

/// Everything [`crate::machine::Machine`] needs from the board: stepper
/// pulse/direction/enable lines, endstop inputs, the hotend thermistor ADC,
/// and the heater/fan PWM outputs.
pub trait Hal {
    /// Free-running microsecond clock. Wraps at `u32::MAX`; every consumer
    /// in this firmware compares times with [`scheduler::before`]/`before_eq`
    /// rather than by subtracting and assuming the result fits `u32`.
    fn now_us(&self) -> scheduler::Instant;

    /// Drives `axis`'s direction pin. `true` is the positive direction.
    fn set_direction(&mut self, axis: Axis, forward: bool);

    /// Drives `axis`'s enable pin. `true` energizes the motor.
    fn set_enabled(&mut self, axis: Axis, enabled: bool);

    /// Pulses `axis`'s step pin once (the rising edge a stepper driver
    /// latches on). Callers set direction before stepping.
    fn step(&mut self, axis: Axis);

    /// Reads `axis`'s endstop input, already polarity-corrected so `true`
    /// always means "triggered" regardless of the switch's wiring. Only
    /// X/Y/Z have endstops in this firmware; `Axis::E` reads as never
    /// triggered.
    fn read_endstop(&self, axis: Axis) -> bool;

    /// Raw hotend thermistor ADC reading, 0..=4095, or a negative value for
    /// a disconnected/shorted sensor (fed straight to
    /// [`thermal::NtcLookupTable::adc_to_celsius`]).
    fn read_hotend_adc(&self) -> i32;

    /// Sets the hotend heater's PWM duty, `0.0..=1.0`.
    fn set_heater_duty(&mut self, duty: f64);

    /// Sets the part-cooling fan's PWM duty, `0.0..=1.0`.
    fn set_fan_duty(&mut self, duty: f64);
}
