//! Cost of one PID tick and one NTC lookup: both run every 100ms from the
//! scheduler's heater timer, so their combined cost bounds how cheap that
//! tick has to be to stay well inside the heater timer's period.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use thermal::ntc::NtcLookupTable;
use thermal::pid::Pid;

fn bench_pid_update(c: &mut Criterion) {
    c.bench_function("pid_update_steady_state", |b| {
        b.iter(|| {
            let mut pid: Pid<f64> = Pid::new(22.2, 1.08, 114.0, 200.0);
            let mut temp = 25.0;
            for _ in 0..100 {
                let out = pid.update(black_box(temp), black_box(0.1));
                temp += out * 0.5;
            }
            temp
        })
    });
}

fn bench_ntc_lookup(c: &mut Criterion) {
    let ntc = NtcLookupTable::default();
    c.bench_function("ntc_adc_to_celsius", |b| {
        b.iter(|| ntc.adc_to_celsius(black_box(1670)));
    });
}

criterion_group!(benches, bench_pid_update, bench_ntc_lookup);
criterion_main!(benches);
