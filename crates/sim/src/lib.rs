//! # In-Process Simulation Harness
//!
//! A [`firmware::Hal`] implementation that lives entirely in memory: no Unix
//! socket, no separate MCU process, no wire protocol. Host and MCU are the
//! same firmware binary here, so there's no separate host/MCU split to
//! simulate over a socket. `FakeHal` stands in for the four hardware
//! capabilities `firmware::Hal` exposes directly, so a host-side test can
//! drive `firmware::Machine` exactly as real silicon would: advance a
//! scripted clock, read back captured pulses/PWM duties, and schedule
//! endstop triggers.

use std::cell::Cell;

use firmware::Hal;
use motion::Axis;
use scheduler::Instant;
use tracing::{debug, trace};

/// Every [`Hal::now_us`] read nudges the clock forward by this much, the way
/// polling a real clock register costs a few cycles of wall time. Without
/// this, code that busy-loops on `now_us()` without a test driving
/// [`FakeHal::advance`] itself (homing, `M109`) would never see time pass.
const AUTO_ADVANCE_US: u32 = 50;

fn axis_index(axis: Axis) -> usize {
    match axis {
        Axis::X => 0,
        Axis::Y => 1,
        Axis::Z => 2,
        Axis::E => 3,
    }
}

/// One pulse `FakeHal` recorded, for assertions that want the exact order
/// pins were driven in rather than just final state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEvent {
    pub at: Instant,
    pub axis: Axis,
    pub forward: bool,
}

/// An in-memory stand-in for real hardware: a scripted microsecond clock,
/// per-axis step/direction/enable capture, scriptable endstops, a scriptable
/// ADC reading, and captured heater/fan PWM duty.
///
/// [`FakeHal::advance`] lets a test move simulated time forward by an exact
/// amount between assertions; every [`Hal::now_us`] read also nudges the
/// clock forward by [`AUTO_ADVANCE_US`], so firmware code that busy-polls
/// the clock internally (homing, `M109`) still sees time pass without the
/// test driving it.
pub struct FakeHal {
    now: Cell<Instant>,
    step_counts: [i64; 4],
    last_direction: [Option<bool>; 4],
    enabled: [bool; 4],
    endstop: [Cell<bool>; 3],
    /// Once `now` reaches this instant the endstop latches `true` and stays
    /// there, mirroring a real switch that doesn't un-trigger mid-homing.
    endstop_trigger_at: [Option<Instant>; 3],
    adc_reading: i32,
    heater_duty: f64,
    heater_log: std::vec::Vec<f64>,
    fan_duty: f64,
    steps: std::vec::Vec<StepEvent>,
}

impl FakeHal {
    /// Starts the simulated clock at 0 with the hotend ADC reading a plausible
    /// room-temperature value (ADC 3018 ~= 10.0C on the default NTC table) so
    /// a test that never calls [`Self::set_adc_reading`] still sees a valid
    /// sensor rather than an immediate safety-interlock fault.
    pub fn new() -> Self {
        Self {
            now: Cell::new(0),
            step_counts: [0; 4],
            last_direction: [None; 4],
            enabled: [false; 4],
            endstop: [Cell::new(false), Cell::new(false), Cell::new(false)],
            endstop_trigger_at: [None; 3],
            adc_reading: 3018,
            heater_duty: 0.0,
            heater_log: std::vec::Vec::new(),
            fan_duty: 0.0,
            steps: std::vec::Vec::new(),
        }
    }

    /// Advances the simulated clock by `us` microseconds, latching any
    /// endstop whose scripted trigger time has now passed.
    pub fn advance(&mut self, us: u32) {
        let now = self.now.get().wrapping_add(us);
        self.now.set(now);
        self.latch_due_endstops();
        trace!(now, "sim clock advanced");
    }

    /// Latches any endstop whose scripted trigger time has passed as of the
    /// current clock reading. Called both from [`Self::advance`] and from
    /// every [`Hal::read_endstop`]/`now_us` poll, so a trigger scheduled
    /// with [`Self::trigger_endstop_after`] still fires even when nothing
    /// but the firmware's own busy-loop is advancing the clock.
    fn latch_due_endstops(&self) {
        let now = self.now.get();
        for axis_idx in 0..3 {
            if let Some(t) = self.endstop_trigger_at[axis_idx] {
                if scheduler::before_eq(t, now) {
                    self.endstop[axis_idx].set(true);
                }
            }
        }
    }

    /// Directly sets an endstop's triggered state (bypassing the scheduled
    /// trigger mechanism below).
    pub fn set_endstop(&mut self, axis: Axis, triggered: bool) {
        if let Some(idx) = endstop_index(axis) {
            self.endstop[idx].set(triggered);
        }
    }

    /// Schedules `axis`'s endstop to latch triggered once the clock passes
    /// `at_us` microseconds from now. Used by homing tests to simulate a
    /// switch closing partway through a seek move.
    pub fn trigger_endstop_after(&mut self, axis: Axis, at_us: u32) {
        if let Some(idx) = endstop_index(axis) {
            self.endstop_trigger_at[idx] = Some(self.now.get().wrapping_add(at_us));
        }
    }

    pub fn set_adc_reading(&mut self, adc: i32) {
        self.adc_reading = adc;
    }

    pub fn heater_duty(&self) -> f64 {
        self.heater_duty
    }

    pub fn fan_duty(&self) -> f64 {
        self.fan_duty
    }

    pub fn step_count(&self, axis: Axis) -> i64 {
        self.step_counts[axis_index(axis)]
    }

    pub fn is_enabled(&self, axis: Axis) -> bool {
        self.enabled[axis_index(axis)]
    }

    /// Every pulse recorded so far, in the order `Machine::tick` emitted
    /// them.
    pub fn steps(&self) -> &[StepEvent] {
        &self.steps
    }

    /// The duty written on every heater tick, in call order — useful for
    /// asserting PID convergence over time rather than just the final
    /// value.
    pub fn heater_log(&self) -> &[f64] {
        &self.heater_log
    }
}

impl Default for FakeHal {
    fn default() -> Self {
        Self::new()
    }
}

fn endstop_index(axis: Axis) -> Option<usize> {
    match axis {
        Axis::X => Some(0),
        Axis::Y => Some(1),
        Axis::Z => Some(2),
        Axis::E => None,
    }
}

impl Hal for FakeHal {
    fn now_us(&self) -> Instant {
        let now = self.now.get().wrapping_add(AUTO_ADVANCE_US);
        self.now.set(now);
        self.latch_due_endstops();
        now
    }

    fn set_direction(&mut self, axis: Axis, forward: bool) {
        self.last_direction[axis_index(axis)] = Some(forward);
    }

    fn set_enabled(&mut self, axis: Axis, enabled: bool) {
        self.enabled[axis_index(axis)] = enabled;
    }

    fn step(&mut self, axis: Axis) {
        let idx = axis_index(axis);
        let forward = self.last_direction[idx].unwrap_or(true);
        self.step_counts[idx] += if forward { 1 } else { -1 };
        self.steps.push(StepEvent { at: self.now.get(), axis, forward });
        debug!(?axis, forward, total = self.step_counts[idx], "sim step");
    }

    fn read_endstop(&self, axis: Axis) -> bool {
        self.latch_due_endstops();
        endstop_index(axis).map(|idx| self.endstop[idx].get()).unwrap_or(false)
    }

    fn read_hotend_adc(&self) -> i32 {
        self.adc_reading
    }

    fn set_heater_duty(&mut self, duty: f64) {
        self.heater_duty = duty;
        self.heater_log.push(duty);
    }

    fn set_fan_duty(&mut self, duty: f64) {
        self.fan_duty = duty;
    }
}
