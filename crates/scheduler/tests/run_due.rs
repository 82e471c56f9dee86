use scheduler::{NextWake, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Heater,
    EndstopPoll,
}

#[test]
fn periodic_timer_survives_many_ticks() {
    let mut sched: Scheduler<TimerKind, 4> = Scheduler::new();
    sched.register(TimerKind::EndstopPoll, 0).unwrap();

    let mut now: u32 = 0;
    let mut polls = 0;
    for _ in 0..500 {
        now += 200;
        sched.run_due(now, |kind, waketime| {
            assert_eq!(kind, TimerKind::EndstopPoll);
            polls += 1;
            NextWake::At(waketime + 1000)
        });
    }
    // ~100000us / 1000us period, give or take the coarse 200us step.
    assert!(polls >= 90 && polls <= 110, "polls = {polls}");
}

#[test]
fn independent_kinds_do_not_interfere() {
    let mut sched: Scheduler<TimerKind, 4> = Scheduler::new();
    sched.register(TimerKind::Heater, 100).unwrap();
    sched.register(TimerKind::EndstopPoll, 50).unwrap();

    let mut seen = vec![];
    sched.run_due(100, |kind, _| {
        seen.push(kind);
        NextWake::Never
    });
    assert_eq!(seen, vec![TimerKind::EndstopPoll, TimerKind::Heater]);
}
