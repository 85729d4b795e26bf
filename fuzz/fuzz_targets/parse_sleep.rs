/*
 * fuzz_targets/parse_sleep.rs
 *
 * fuzz target for --sleep parsing. parse_sleep_micros must never panic
 * and must never accept a value below the 1ms floor.
 *
 * edge cases: "", "+1000", "-0", "1e9", "99999999999999999999", unicode digits
 */

#![no_main]

use libfuzzer_sys::fuzz_target;
use run_fast_or_hide::config::{MIN_SLEEP_MICROS, parse_sleep_micros};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = core::str::from_utf8(data)
        && let Ok(us) = parse_sleep_micros(s)
    {
        assert!(us >= MIN_SLEEP_MICROS);
    }
});
