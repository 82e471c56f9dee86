//! Closed-loop heater: NTC readout, PID duty, setpoint bookkeeping, the
//! invalid-sensor safety interlock, and a thermal-runaway monitor, combining
//! the pieces [`crate::pid::Pid`], [`crate::ntc::NtcLookupTable`], and
//! [`crate::safety::HeaterSafety`] implement on their own.

use crate::ntc::NtcLookupTable;
use crate::pid::Pid;
use crate::safety::{HeaterSafety, SafetyLimits, ThermalState};

/// A setpoint change larger than this resets the integral/derivative history.
pub const TARGET_CHANGE_RESET_THRESHOLD: f64 = 10.0;

/// `is_at_target` tolerance in degrees Celsius.
pub const AT_TARGET_TOLERANCE: f64 = 3.0;

/// Result of one [`Heater::tick`] call: what the caller should do with the
/// PWM channel this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Duty cycle to write to the heater's PWM channel this tick.
    pub duty: f64,
    /// Whether the PWM channel itself should be enabled.
    pub pwm_enabled: bool,
    /// `false` if the ADC reading was out of range and the PID loop was
    /// skipped this tick (the sensor-invalid interlock).
    pub sensor_valid: bool,
    /// The thermal-runaway monitor's verdict for this tick. A `Shutdown`
    /// latches: every later tick reports `duty: 0.0`/`pwm_enabled: false`
    /// regardless of target, until the heater is rebuilt.
    pub thermal_state: ThermalState,
}

/// One closed-loop heater: ADC→temperature via an NTC table, PID duty
/// control, the target/safety interlock state machine, and a thermal-runaway
/// monitor layered on top.
#[derive(Debug, Clone, Copy)]
pub struct Heater {
    ntc: NtcLookupTable,
    pid: Pid<f64>,
    safety: HeaterSafety<f64>,
    elapsed_s: f64,
    current_temp: f64,
    target_temp: f64,
    last_output: f64,
    initialized: bool,
    pwm_enabled: bool,
    /// Latched once the runaway monitor reports `Shutdown`; only clears by
    /// building a new `Heater`.
    shutdown: bool,
}

impl Heater {
    /// Builds a heater with the given PID gains, the default 33-entry NTC
    /// table, and a thermal-runaway monitor governed by `safety_limits`.
    /// `max_power` clamps the PID output's upper bound (always 1.0 in this
    /// firmware's config).
    pub fn new(kp: f64, ki: f64, kd: f64, max_power: f64, safety_limits: SafetyLimits<f64>) -> Self {
        let mut pid = Pid::new(kp, ki, kd, 0.0);
        pid.output_max = max_power;
        Self {
            ntc: NtcLookupTable::default(),
            pid,
            safety: HeaterSafety::new(safety_limits),
            elapsed_s: 0.0,
            current_temp: 0.0,
            target_temp: 0.0,
            last_output: 0.0,
            initialized: true,
            pwm_enabled: false,
            shutdown: false,
        }
    }

    pub fn current_temp(&self) -> f64 {
        self.current_temp
    }

    pub fn target_temp(&self) -> f64 {
        self.target_temp
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Sets a new target temperature. Grounded in `heater_set_temp`: a large
    /// enough change resets the PID history, and a non-positive target turns
    /// the heater fully off and clears state.
    pub fn set_target(&mut self, target: f64) {
        let diff = (target - self.target_temp).abs();
        self.target_temp = target;

        if diff > TARGET_CHANGE_RESET_THRESHOLD {
            self.pid.reset();
        }

        if target <= 0.0 {
            self.pid.reset();
            self.last_output = 0.0;
            self.pwm_enabled = false;
        } else {
            self.pwm_enabled = true;
        }
    }

    /// `true` once the current temperature is within tolerance of the
    /// target, or the target is non-positive (heater considered "off and at
    /// rest"). Matches P6/`heater_is_at_target`.
    pub fn is_at_target(&self) -> bool {
        self.target_temp <= 0.0 || (self.current_temp - self.target_temp).abs() <= AT_TARGET_TOLERANCE
    }

    /// Runs one 100ms PID tick given a raw ADC reading (0..=4095, or
    /// negative for a sensor fault). An invalid reading forces the PWM duty
    /// to zero and skips both the PID math and the runaway check for this
    /// tick (there's no new temperature to evaluate). Otherwise
    /// `current_temp` is updated, the runaway monitor is run first, and a
    /// `Shutdown` verdict latches and zeroes output before the PID ever
    /// runs; a non-positive target still forces duty to zero but keeps the
    /// monitor running so an already-hot block is still watched while idle.
    pub fn tick(&mut self, adc_reading: i32, dt: f64) -> TickOutcome {
        self.elapsed_s += dt;

        if self.shutdown {
            self.last_output = 0.0;
            return TickOutcome { duty: 0.0, pwm_enabled: false, sensor_valid: true, thermal_state: ThermalState::Shutdown };
        }

        let Some(temp) = self.ntc.adc_to_celsius(adc_reading) else {
            self.last_output = 0.0;
            return TickOutcome { duty: 0.0, pwm_enabled: false, sensor_valid: false, thermal_state: ThermalState::Ok };
        };
        self.current_temp = temp;

        let heater_on = self.pwm_enabled && self.target_temp > 0.0;
        let state = self.safety.update(self.elapsed_s, self.current_temp, self.target_temp, heater_on);
        if state == ThermalState::Shutdown {
            self.shutdown = true;
            self.pwm_enabled = false;
            self.last_output = 0.0;
            return TickOutcome { duty: 0.0, pwm_enabled: false, sensor_valid: true, thermal_state: state };
        }

        if self.target_temp <= 0.0 {
            self.last_output = 0.0;
            return TickOutcome { duty: 0.0, pwm_enabled: false, sensor_valid: true, thermal_state: state };
        }

        self.pid.setpoint = self.target_temp;
        let duty = self.pid.update(self.current_temp, dt);
        self.last_output = duty;
        TickOutcome { duty, pwm_enabled: self.pwm_enabled, sensor_valid: true, thermal_state: state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generous enough that ordinary PID-behavior tests never trip the
    /// runaway monitor; matches the values used in the host-side simulation
    /// example.
    fn test_safety_limits() -> SafetyLimits<f64> {
        SafetyLimits {
            max_temp: 280.0,
            min_heat_gain_temp: 5.0,
            min_heat_gain_time_s: 20.0,
            max_deviation: 15.0,
        }
    }

    #[test]
    fn invalid_adc_forces_zero_duty_and_skips_pid() {
        let mut h = Heater::new(22.2, 1.08, 114.0, 1.0, test_safety_limits());
        h.set_target(200.0);
        let out = h.tick(-1, 0.1);
        assert_eq!(out.duty, 0.0);
        assert!(!out.pwm_enabled);
        assert!(!out.sensor_valid);
    }

    #[test]
    fn zero_target_disables_output_and_pwm() {
        let mut h = Heater::new(22.2, 1.08, 114.0, 1.0, test_safety_limits());
        h.set_target(200.0);
        h.tick(1000, 0.1);
        h.set_target(0.0);
        let out = h.tick(1000, 0.1);
        assert_eq!(out.duty, 0.0);
        assert!(!out.pwm_enabled);
        assert!(h.is_at_target());
    }

    #[test]
    fn large_target_change_resets_integral_history() {
        // Small ki and a generous output ceiling so the *integral*'s own
        // [-100, 100] clamp (not the PID output clamp) is what saturates
        // first.
        let mut h = Heater::new(0.0, 0.01, 0.0, 1000.0, test_safety_limits());
        h.set_target(50.0);
        for _ in 0..20 {
            h.tick(4000, 0.1); // cold reading (-20C), large sustained error
        }
        let saturated_output = h.last_output();
        assert!(saturated_output > 0.5);
        // Jump target by > 10C: integral history must be cleared.
        h.set_target(80.0);
        let out = h.tick(4000, 0.1);
        // With a freshly-reset integral, one 0.1s tick contributes far less
        // than 20 ticks' worth of accumulated integral would have.
        assert!(out.duty < saturated_output);
    }

    #[test]
    fn is_at_target_within_tolerance() {
        let mut h = Heater::new(1.0, 0.0, 0.0, 1.0, test_safety_limits());
        h.set_target(200.0);
        // adc 311 -> 200.0C exactly (table entry).
        h.tick(311, 0.1);
        assert!(h.is_at_target());
    }

    #[test]
    fn negative_target_is_treated_as_off() {
        let mut h = Heater::new(1.0, 0.0, 0.0, 1.0, test_safety_limits());
        h.set_target(-5.0);
        assert!(h.is_at_target());
        let out = h.tick(3000, 0.1);
        assert_eq!(out.duty, 0.0);
    }

    #[test]
    fn exceeding_max_temp_latches_a_shutdown() {
        let limits = SafetyLimits { max_temp: 50.0, min_heat_gain_temp: 5.0, min_heat_gain_time_s: 20.0, max_deviation: 15.0 };
        let mut h = Heater::new(1.0, 0.0, 0.0, 1.0, limits);
        h.set_target(200.0);
        // adc 311 -> 200.0C, well past the 50C ceiling.
        let out = h.tick(311, 0.1);
        assert_eq!(out.thermal_state, ThermalState::Shutdown);
        assert_eq!(out.duty, 0.0);
        assert!(!out.pwm_enabled);

        // Shutdown latches: a later tick stays off even with a cool reading.
        let out = h.tick(3000, 0.1);
        assert_eq!(out.thermal_state, ThermalState::Shutdown);
        assert!(!out.pwm_enabled);
    }
}
