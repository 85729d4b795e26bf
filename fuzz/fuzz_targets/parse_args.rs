/*
 * fuzz_targets/parse_args.rs
 *
 * fuzz target for CLI argument parsing and validation. neither clap nor
 * into_config_with may panic on arbitrary argument combinations.
 *
 * edge cases: "-vs", "--unknown", "-s" (missing value), "-n -", "--" alone,
 * embedded values (-s1000), very long args
 */

#![no_main]

use clap::Parser;
use libfuzzer_sys::fuzz_target;
use run_fast_or_hide::{Args, SupervisorError};

fuzz_target!(|data: &[u8]| {
    /* split input on null bytes to simulate multiple arguments */
    let mut argv: Vec<String> = vec!["run-fast-or-hide".to_string()];
    argv.extend(
        data.split(|&b| b == 0)
            .filter_map(|chunk| core::str::from_utf8(chunk).ok())
            .filter(|s| !s.is_empty())
            .map(String::from),
    );

    /* no real account lookups from the fuzzer */
    if let Ok(args) = Args::try_parse_from(&argv) {
        let _ = args.into_config_with(|_| Err(SupervisorError::Identity("invalid user".into())));
    }
});
