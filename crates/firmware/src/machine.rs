//! The whole printer, wired together: planner + step generators + heater +
//! fan + G-code dispatcher, all driven by one cooperative [`Machine::tick`].
//!
//! A bounded main loop (scheduler tick, G-code line processing, heater
//! tick) driven from a single thread rather than split across
//! interrupts or async tasks, built on [`scheduler::Scheduler`].

use heapless::Vec as HVec;
use motion::{Axis, Move, Planner, TrapQ};
use scheduler::{Instant, NextWake, Scheduler};
use thermal::{Heater, ThermalState};

use crate::config;
use crate::errors::FirmwareError;
use crate::hal::Hal;
use crate::stepper::StepperAxis;

const MAX_NEW_MOVES_PER_REFILL: usize = motion::trapq::TRAPQ_MAX_MOVES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    HeaterTick,
    EndstopPoll,
}

fn axis_index(axis: Axis) -> usize {
    match axis {
        Axis::X => 0,
        Axis::Y => 1,
        Axis::Z => 2,
        Axis::E => 3,
    }
}

/// Index into the 3-entry endstop arrays below (`E` has no endstop).
fn endstop_index(axis: Axis) -> Option<usize> {
    match axis {
        Axis::X => Some(0),
        Axis::Y => Some(1),
        Axis::Z => Some(2),
        Axis::E => None,
    }
}

pub struct Machine {
    scheduler: Scheduler<TimerKind, 2>,
    planner: Planner,
    trapq: TrapQ,
    axes: [StepperAxis; 4],
    heater: Heater,
    fan_duty: f64,
    dispatcher: gcode::Dispatcher,
    /// The hal-clock instant corresponding to `planner.print_time() == 0.0`.
    start_us: Instant,
    /// The highest `Move::print_time` already staged into the per-axis
    /// pulse queues, so [`Self::refill_steps`] only processes moves the
    /// planner has flushed since the last call.
    last_synced_print_time: f64,
    /// Whether homing currently cares about each endstop (X, Y, Z); polling
    /// still samples the level every tick, but only an armed axis latches.
    endstop_armed: [bool; 3],
    /// The level seen on the previous poll, to detect a 0->1 transition
    /// rather than re-latching on every poll the switch stays closed.
    endstop_level_prev: [bool; 3],
    /// Set on the first rising edge seen while armed; cleared when disarmed.
    endstop_latched: [bool; 3],
}

impl Machine {
    pub fn new(hal: &impl Hal) -> Self {
        let mut scheduler = Scheduler::new();
        let start_us = hal.now_us();
        let _ = scheduler.register(TimerKind::HeaterTick, start_us.wrapping_add(config::HEATER_TICK_INTERVAL_US));
        let _ = scheduler.register(TimerKind::EndstopPoll, start_us.wrapping_add(config::ENDSTOP_POLL_INTERVAL_US));

        Self {
            scheduler,
            planner: Planner::new(config::motion_config(), motion::Position::ZERO),
            trapq: TrapQ::new(),
            axes: [
                StepperAxis::new(Axis::X, config::STEPS_PER_MM[0]),
                StepperAxis::new(Axis::Y, config::STEPS_PER_MM[1]),
                StepperAxis::new(Axis::Z, config::STEPS_PER_MM[2]),
                StepperAxis::new(Axis::E, config::STEPS_PER_MM[3]),
            ],
            heater: Heater::new(config::HOTEND_PID_KP, config::HOTEND_PID_KI, config::HOTEND_PID_KD, 1.0, config::hotend_safety_limits()),
            fan_duty: 0.0,
            dispatcher: gcode::Dispatcher::new(),
            start_us,
            last_synced_print_time: 0.0,
            endstop_armed: [false; 3],
            endstop_level_prev: [false; 3],
            endstop_latched: [false; 3],
        }
    }

    pub fn commanded_position(&self) -> motion::Position {
        self.planner.commanded_position()
    }

    /// Converts a planner timestamp (seconds since `print_time == 0`) into
    /// the hal-clock instant it corresponds to. Casting through `u64` first
    /// keeps this a wraparound, not a saturating, truncation — matching how
    /// the real hardware tick register overflows.
    fn instant_for(&self, print_time: f64) -> Instant {
        self.start_us.wrapping_add(((print_time * 1_000_000.0).max(0.0) as u64) as u32)
    }

    /// Stages every move the planner has newly flushed into `trapq` onto
    /// each axis's pulse queue.
    fn refill_steps(&mut self) -> Result<(), motion::MotionError> {
        let mut new_moves: HVec<Move, MAX_NEW_MOVES_PER_REFILL> = HVec::new();
        for mv in self.trapq.active_moves() {
            if mv.print_time > self.last_synced_print_time {
                let _ = new_moves.push(*mv);
            }
        }
        for mv in new_moves.iter() {
            let move_start = self.instant_for(mv.print_time);
            for axis in &mut self.axes {
                axis.enqueue_move(mv, move_start)?;
            }
            self.last_synced_print_time = mv.print_time;
        }
        Ok(())
    }

    /// Runs one cooperative iteration: fires any due stepper pulses, runs
    /// the heater PID tick if it's due, and flushes trailing planner moves
    /// so a gap in incoming G-code doesn't strand them un-stepped. Should be
    /// called continuously from the firmware's main loop.
    pub fn tick(&mut self, hal: &mut impl Hal) {
        let now = hal.now_us();

        for axis in &mut self.axes {
            while axis.emit_due(now, hal).is_some() {}
        }

        let mut heater_due = false;
        let mut endstop_poll_due = false;
        self.scheduler.run_due(now, |kind, _t| match kind {
            TimerKind::HeaterTick => {
                heater_due = true;
                NextWake::At(now.wrapping_add(config::HEATER_TICK_INTERVAL_US))
            }
            TimerKind::EndstopPoll => {
                endstop_poll_due = true;
                NextWake::At(now.wrapping_add(config::ENDSTOP_POLL_INTERVAL_US))
            }
        });
        if heater_due {
            let dt = config::HEATER_TICK_INTERVAL_US as f64 / 1_000_000.0;
            let outcome = self.heater.tick(hal.read_hotend_adc(), dt);
            hal.set_heater_duty(if outcome.pwm_enabled { outcome.duty } else { 0.0 });
            if outcome.thermal_state == ThermalState::Shutdown {
                self.emergency_halt(hal);
            }
        }
        if endstop_poll_due {
            self.poll_endstops(hal);
        }

        if self.planner.has_pending_moves() {
            let _ = self.planner.flush(&mut self.trapq);
            let _ = self.refill_steps();
        }
        self.trapq.finalize_upto(self.planner.print_time());
        self.trapq.free_before(self.planner.print_time() - 1.0);
    }

    /// `true` once every stepper axis has drained its pulse queue and the
    /// planner has no moves left to flush.
    fn is_settled(&self) -> bool {
        !self.planner.has_pending_moves() && self.axes.iter().all(StepperAxis::is_idle)
    }

    /// Samples every endstop and latches rising edges on armed axes,
    /// stopping that axis's stepper the moment its switch closes rather
    /// than waiting for the caller to next check.
    fn poll_endstops(&mut self, hal: &impl Hal) {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let idx = endstop_index(axis).expect("X/Y/Z always map to an endstop slot");
            let level = hal.read_endstop(axis);
            if self.endstop_armed[idx] && level && !self.endstop_level_prev[idx] {
                self.endstop_latched[idx] = true;
                self.axes[axis_index(axis)].clear_pending();
            }
            self.endstop_level_prev[idx] = level;
        }
    }

    /// Arms polling for the given axes' endstops and clears any stale latch
    /// from a previous homing pass before a new seek begins.
    fn arm_endstops(&mut self, axes: gcode::AxisSelect) {
        for (axis, want) in [(Axis::X, axes.x), (Axis::Y, axes.y), (Axis::Z, axes.z)] {
            if want {
                let idx = endstop_index(axis).expect("X/Y/Z always map to an endstop slot");
                self.endstop_armed[idx] = true;
                self.endstop_level_prev[idx] = false;
                self.endstop_latched[idx] = false;
            }
        }
    }

    fn disarm_endstops(&mut self, axes: gcode::AxisSelect) {
        for (axis, want) in [(Axis::X, axes.x), (Axis::Y, axes.y), (Axis::Z, axes.z)] {
            if want {
                let idx = endstop_index(axis).expect("X/Y/Z always map to an endstop slot");
                self.endstop_armed[idx] = false;
            }
        }
    }

    /// Processes one line of serial input, executing it against this
    /// machine's own motion/heater/fan state.
    ///
    /// `G28` is intercepted here rather than reaching [`gcode::Dispatcher`]:
    /// homing needs live endstop polling through `hal`, a seam the
    /// dispatcher's [`gcode::MotionBackend`] trait doesn't carry (every
    /// other command only touches planner/heater/fan state).
    ///
    /// `M109`'s [`gcode::DispatchOutcome::AwaitTemperature`] is turned into
    /// real cooperative blocking here: this call keeps pumping [`Self::tick`]
    /// (which is what drives the heater's own PID ticks) until the hotend
    /// reports at-target, rather than returning the "still waiting" outcome
    /// to the caller. `M112` halts every subsystem before the outcome is
    /// handed back.
    pub fn process_line(&mut self, line: &str, hal: &mut impl Hal) -> Result<gcode::DispatchOutcome, gcode::GcodeError> {
        match gcode::parse_line(line) {
            Ok(cmd) if matches!(cmd.letter, Some(gcode::Letter::G)) && cmd.code == 28 => {
                let mut axes = gcode::AxisSelect { x: cmd.x.is_some(), y: cmd.y.is_some(), z: cmd.z.is_some() };
                if axes.is_empty() {
                    axes = gcode::AxisSelect::all();
                }
                self.home(axes, hal).map_err(|_| gcode::GcodeError::ExecutionFailed)?;
                return Ok(gcode::DispatchOutcome::Ok);
            }
            _ => {}
        }

        let Self { dispatcher, planner, trapq, heater, fan_duty, .. } = self;
        let mut motion = MotionAdapter { planner, trapq };
        let mut heater_backend = HeaterAdapter { heater };
        let mut fan_backend = FanAdapter { duty: fan_duty, hal };
        let outcome = dispatcher.dispatch(line, &mut motion, &mut heater_backend, &mut fan_backend)?;
        let _ = self.refill_steps();

        match outcome {
            gcode::DispatchOutcome::AwaitTemperature => {
                while !self.heater.is_at_target() {
                    self.tick(hal);
                }
                Ok(gcode::DispatchOutcome::Ok)
            }
            gcode::DispatchOutcome::Halt => {
                self.emergency_halt(hal);
                Ok(outcome)
            }
            other => Ok(other),
        }
    }

    /// `M112`/a fatal condition: drops every queued step and planned move,
    /// disables the heater's PWM, and de-energizes every stepper.
    fn emergency_halt(&mut self, hal: &mut impl Hal) {
        hal.set_heater_duty(0.0);
        self.heater.set_target(0.0);
        hal.set_fan_duty(0.0);
        self.fan_duty = 0.0;
        for axis in Axis::ALL {
            self.axes[axis_index(axis)].clear_pending();
            hal.set_enabled(axis, false);
        }
        self.trapq = TrapQ::new();
        self.planner = Planner::new(config::motion_config(), self.planner.commanded_position());
    }

    /// Homes the given axes: fast-seeks toward the negative limit at twice
    /// `HOMING_SPEED`, waits for any of their endstops to trigger (or for
    /// `HOMING_TIMEOUT_S` to elapse), zeroes the triggered axes' commanded
    /// position, then retracts `HOMING_RETRACT_MM`.
    ///
    /// This call blocks the caller, pumping [`Self::tick`] in a spin loop
    /// until an endstop trips or the timeout expires. The endstop itself is
    /// watched by a ~1ms scheduler-driven poll ([`Self::poll_endstops`]) that
    /// latches on a 0->1 transition and stops that axis's stepper
    /// immediately, rather than this loop sampling the raw level itself; an
    /// aborted seek also clears each homed axis's queued pulses before
    /// re-zeroing its kinematics, so a tripped switch doesn't leave stale
    /// steps to fire afterward.
    pub fn home(&mut self, axes: gcode::AxisSelect, hal: &mut impl Hal) -> Result<(), FirmwareError> {
        self.arm_endstops(axes);

        let mut target = self.planner.commanded_position();
        if axes.x {
            target.x = config::AXIS_MIN.x - 10.0;
        }
        if axes.y {
            target.y = config::AXIS_MIN.y - 10.0;
        }
        if axes.z {
            target.z = config::AXIS_MIN.z - 10.0;
        }
        self.queue_unbounded_move(target, config::HOMING_SPEED_MM_S * 2.0)?;

        let deadline = self.planner.print_time() + config::HOMING_TIMEOUT_S;
        let mut triggered = false;
        while self.planner.print_time() < deadline {
            self.tick(hal);
            if (axes.x && self.endstop_latched[0]) || (axes.y && self.endstop_latched[1]) || (axes.z && self.endstop_latched[2]) {
                triggered = true;
                break;
            }
            if self.is_settled() {
                break;
            }
        }

        self.stop_homed_axes(axes);
        self.disarm_endstops(axes);

        if !triggered {
            return Err(FirmwareError::HomingTimeout);
        }

        if axes.x {
            self.zero_axis(Axis::X);
        }
        if axes.y {
            self.zero_axis(Axis::Y);
        }
        if axes.z {
            self.zero_axis(Axis::Z);
        }

        let mut retract_target = self.planner.commanded_position();
        if axes.x {
            retract_target.x = config::HOMING_RETRACT_MM;
        }
        if axes.y {
            retract_target.y = config::HOMING_RETRACT_MM;
        }
        if axes.z {
            retract_target.z = config::HOMING_RETRACT_MM;
        }
        self.queue_unbounded_move(retract_target, config::HOMING_SPEED_MM_S)?;
        while !self.is_settled() {
            self.tick(hal);
        }

        Ok(())
    }

    /// Plans and immediately flushes a move that may fall outside the
    /// configured travel limits — only valid for homing's seek/retract legs.
    fn queue_unbounded_move(&mut self, target: motion::Position, speed: f64) -> Result<(), FirmwareError> {
        let distance = motion::kinematics::distance(self.planner.commanded_position(), target);
        if distance < 1e-6 {
            return Ok(());
        }
        self.planner.plan_move_unbounded(&mut self.trapq, target, speed)?;
        let _ = self.planner.flush(&mut self.trapq);
        self.refill_steps()?;
        Ok(())
    }

    /// Clears unfired pulses on every axis this homing pass was driving, so
    /// a seek aborted by an endstop trip doesn't keep stepping past it.
    fn stop_homed_axes(&mut self, axes: gcode::AxisSelect) {
        for axis in Axis::ALL {
            let relevant = match axis {
                Axis::X => axes.x,
                Axis::Y => axes.y,
                Axis::Z => axes.z,
                Axis::E => false,
            };
            if relevant {
                self.axes[axis_index(axis)].clear_pending();
            }
        }
    }

    fn zero_axis(&mut self, axis: Axis) {
        self.planner.set_commanded_position_axis(axis, 0.0);
        self.axes[axis_index(axis)].set_commanded_position(0.0);
    }
}

struct MotionAdapter<'a> {
    planner: &'a mut Planner,
    trapq: &'a mut TrapQ,
}

impl gcode::MotionBackend for MotionAdapter<'_> {
    type Error = motion::MotionError;

    fn move_linear(&mut self, target: gcode::MoveTarget, feed_rate_mm_per_s: f64) -> Result<(), Self::Error> {
        let pos = self.planner.commanded_position();
        let resolved = motion::Position {
            x: target.x.unwrap_or(pos.x),
            y: target.y.unwrap_or(pos.y),
            z: target.z.unwrap_or(pos.z),
            e: target.e.unwrap_or(pos.e),
        };
        self.planner.plan_move(self.trapq, resolved, feed_rate_mm_per_s)
    }

    fn home(&mut self, _axes: gcode::AxisSelect) -> Result<(), Self::Error> {
        // `Machine::process_line` intercepts G28 before it ever reaches this
        // adapter (homing needs hal access this trait doesn't carry), so
        // this impl only exists to satisfy `MotionBackend` and is never
        // actually invoked.
        unreachable!("G28 is handled directly by Machine::process_line")
    }

    fn position(&self) -> gcode::Position4 {
        let p = self.planner.commanded_position();
        gcode::Position4 { x: p.x, y: p.y, z: p.z, e: p.e }
    }
}

struct HeaterAdapter<'a> {
    heater: &'a mut Heater,
}

impl gcode::HeaterBackend for HeaterAdapter<'_> {
    fn set_target(&mut self, target_celsius: f64) {
        self.heater.set_target(target_celsius);
    }
    fn is_at_target(&self) -> bool {
        self.heater.is_at_target()
    }
}

struct FanAdapter<'a, H: Hal> {
    duty: &'a mut f64,
    hal: &'a mut H,
}

impl<H: Hal> gcode::FanBackend for FanAdapter<'_, H> {
    fn set_speed(&mut self, speed: f64) {
        *self.duty = speed;
        self.hal.set_fan_duty(speed);
    }
}
