#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feeds arbitrary byte slices into the G-code line parser. The goal is
    // to ensure that no input can cause a panic, crash, or undefined
    // behavior, regardless of how malformed it is.

    let Ok(line) = core::str::from_utf8(data) else {
        return;
    };

    // parse_line is designed to return Ok(_) or Err(_) on any input, never
    // panic; the fuzzer detects panics on its own.
    let _ = gcode::parse_line(line);
});
