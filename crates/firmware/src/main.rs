//! On-device entry point. Built only under the `mcu-target` feature, which
//! pulls in `cortex-m-rt`/`defmt-rtt`/`panic-probe`; a plain `cargo test` on
//! the host never compiles this file.
//!
//! TODO: wire up a concrete board's `Hal` impl (GPIO/ADC/PWM pin mapping).
//! That's per-board bring-up work outside this crate's scope — `firmware`
//! stops at the [`firmware::Hal`] trait boundary.
#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

#[cortex_m_rt::entry]
fn main() -> ! {
    defmt::info!("firmware boot (no board Hal wired up yet)");
    loop {
        cortex_m::asm::wfi();
    }
}
