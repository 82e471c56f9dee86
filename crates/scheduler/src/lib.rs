//! # Cooperative timer-list scheduler
//!
//! A single-threaded, interrupt-free scheduler built around one ordered list
//! of pending wake times. There is no preemption and no async runtime: the
//! main loop calls [`Scheduler::run_due`] repeatedly, and each due timer's
//! callback either returns the next time it wants to run or is dropped.
//!
//! This is deliberately the simplest thing that could work for a firmware
//! with a handful of known timer producers (stepper pulse timing, endstop
//! debounce polling, the heater PID tick). Callers identify a timer by a
//! small `Copy` "kind" value (typically an enum) rather than by holding onto
//! a handle, since every kind in this firmware is a singleton.
#![no_std]

mod time;

pub use time::{before, before_eq, Instant};

/// What a timer callback wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextWake {
    /// Re-register this timer to fire again at the given instant.
    At(Instant),
    /// Don't reschedule; the timer is done until something explicitly
    /// re-registers it.
    Never,
}

/// Scheduler is full and a timer could not be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerFull;

struct Timer<K> {
    kind: K,
    waketime: Instant,
    seq: u32,
}

/// An ordered list of up to `N` pending timers, identified by kind `K`.
///
/// Mutation (`register`/`cancel`) and the pop-if-due check in `run_due` run
/// inside `critical_section::with`, even though this firmware has no real
/// interrupts preempting the main loop — it keeps the scheduler safe to
/// reuse verbatim on a target where a timer is armed from an ISR.
pub struct Scheduler<K, const N: usize> {
    timers: heapless::Vec<Timer<K>, N>,
    seq: u32,
}

impl<K: Copy + PartialEq, const N: usize> Scheduler<K, N> {
    pub const fn new() -> Self {
        Self {
            timers: heapless::Vec::new(),
            seq: 0,
        }
    }

    /// Registers (or re-registers) a timer for `kind` to fire at `waketime`.
    /// If `kind` already has a pending timer, it is replaced.
    pub fn register(&mut self, kind: K, waketime: Instant) -> Result<(), SchedulerFull> {
        critical_section::with(|_| {
            self.timers.retain(|t| t.kind != kind);
            let seq = self.seq;
            self.seq = self.seq.wrapping_add(1);
            let pos = self
                .timers
                .iter()
                .position(|t| {
                    before(waketime, t.waketime)
                        || (waketime == t.waketime && before(seq, t.seq))
                })
                .unwrap_or(self.timers.len());
            self.timers
                .insert(pos, Timer { kind, waketime, seq })
                .map_err(|_| SchedulerFull)
        })
    }

    /// Cancels any pending timer for `kind`. No-op if none is pending.
    pub fn cancel(&mut self, kind: K) {
        critical_section::with(|_| {
            self.timers.retain(|t| t.kind != kind);
        });
    }

    /// `true` if `kind` has a timer currently pending.
    pub fn is_pending(&self, kind: K) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    /// Runs every timer that is due at or before `now`, in wake-time order,
    /// calling `callback(kind, waketime)` for each and re-registering it if
    /// the callback asks to. Returns the number of timers that fired.
    pub fn run_due(&mut self, now: Instant, mut callback: impl FnMut(K, Instant) -> NextWake) -> usize {
        let mut fired = 0;
        loop {
            let due = critical_section::with(|_| match self.timers.first() {
                Some(t) if before_eq(t.waketime, now) => Some(self.timers.remove(0)),
                _ => None,
            });
            let Some(timer) = due else { break };
            fired += 1;
            match callback(timer.kind, timer.waketime) {
                NextWake::At(t) => {
                    let _ = self.register(timer.kind, t);
                }
                NextWake::Never => {}
            }
        }
        fired
    }

    /// The earliest pending wake time, if any timer is registered.
    pub fn next_waketime(&self) -> Option<Instant> {
        self.timers.first().map(|t| t.waketime)
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }
}

impl<K: Copy + PartialEq, const N: usize> Default for Scheduler<K, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        A,
        B,
        C,
    }

    #[test]
    fn fires_in_waketime_order() {
        let mut s: Scheduler<Kind, 8> = Scheduler::new();
        s.register(Kind::A, 300).unwrap();
        s.register(Kind::B, 100).unwrap();
        s.register(Kind::C, 200).unwrap();

        let mut order = heapless::Vec::<Kind, 8>::new();
        s.run_due(1_000, |k, _t| {
            order.push(k).unwrap();
            NextWake::Never
        });
        assert_eq!(&order[..], &[Kind::B, Kind::C, Kind::A]);
        assert!(s.is_empty());
    }

    #[test]
    fn does_not_fire_future_timers() {
        let mut s: Scheduler<Kind, 8> = Scheduler::new();
        s.register(Kind::A, 500).unwrap();
        let fired = s.run_due(100, |_, _| NextWake::Never);
        assert_eq!(fired, 0);
        assert!(s.is_pending(Kind::A));
    }

    #[test]
    fn reschedules_on_next_wake() {
        let mut s: Scheduler<Kind, 8> = Scheduler::new();
        s.register(Kind::A, 0).unwrap();
        let mut ticks = 0;
        s.run_due(0, |_, t| {
            ticks += 1;
            if ticks < 3 {
                NextWake::At(t + 10)
            } else {
                NextWake::Never
            }
        });
        assert_eq!(ticks, 1);
        assert_eq!(s.next_waketime(), Some(10));

        s.run_due(100, |_, t| {
            ticks += 1;
            if ticks < 3 {
                NextWake::At(t + 10)
            } else {
                NextWake::Never
            }
        });
        assert_eq!(ticks, 3);
        assert!(s.is_empty());
    }

    #[test]
    fn time_comparison_handles_wraparound() {
        let near_wrap = u32::MAX - 5;
        assert!(before(near_wrap, 5));
        assert!(!before(5, near_wrap));
    }

    #[test]
    fn registering_same_kind_replaces_prior_timer() {
        let mut s: Scheduler<Kind, 8> = Scheduler::new();
        s.register(Kind::A, 1000).unwrap();
        s.register(Kind::A, 50).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.next_waketime(), Some(50));
    }

    #[test]
    fn full_scheduler_rejects_new_timers() {
        let mut s: Scheduler<Kind, 2> = Scheduler::new();
        s.register(Kind::A, 1).unwrap();
        s.register(Kind::B, 2).unwrap();
        assert_eq!(s.register(Kind::C, 3), Err(SchedulerFull));
    }
}
