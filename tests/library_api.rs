/*
 * library_api.rs
 *
 * integration-style tests exercising run-fast-or-hide as a library.
 *
 * goal: ensure the public API is usable without shelling out to the CLI.
 */

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use run_fast_or_hide::error::exit_codes;
use run_fast_or_hide::{
    Args, Config, DeadlineWaiter, ExitOutcome, SupervisorError, supervise, translate_exit_code,
};

fn config(parts: &[&str], timeout_micros: u64) -> Config {
    Config::new(
        parts.iter().map(|s| (*s).to_string()).collect(),
        timeout_micros,
        None,
        0,
        false,
    )
    .expect("valid config")
}

/* =========================================================================
 * SUPERVISE
 * ========================================================================= */

#[test]
fn library_supervise_completes() {
    let outcome = supervise(&config(&["sh", "-c", "exit 0"], 2_000_000)).unwrap();
    match outcome {
        ExitOutcome::ChildCompleted(status) => assert_eq!(status.code(), Some(0)),
        ExitOutcome::TimedOut => panic!("expected ChildCompleted, got TimedOut"),
    }
}

#[test]
fn library_supervise_nonzero_exit() {
    let outcome = supervise(&config(&["sh", "-c", "exit 42"], 2_000_000)).unwrap();
    assert_eq!(outcome.exit_code(), 42);
}

#[test]
fn library_supervise_times_out() {
    let start = Instant::now();
    let outcome = supervise(&config(&["sleep", "2"], 100_000)).unwrap();
    assert!(outcome.timed_out());
    assert_eq!(outcome.exit_code(), exit_codes::STILL_RUNNING);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn library_supervise_child_finishing_late_in_window() {
    /* exits at ~300ms of a 900ms window: a completion, not a detach */
    let outcome = supervise(&config(&["sh", "-c", "sleep 0.3; exit 3"], 900_000)).unwrap();
    assert!(!outcome.timed_out());
    assert_eq!(outcome.exit_code(), 3);
}

#[test]
fn library_supervise_timed_out_child_keeps_running() {
    /* TimedOut leaves the child alone; it runs to completion in the background */
    let marker = std::env::temp_dir().join(format!("rfoh_lib_reap_{}", std::process::id()));
    let _ = std::fs::remove_file(&marker);
    let script = format!("sleep 0.2; touch {}", marker.display());

    let outcome = supervise(&config(&["sh", "-c", &script], 50_000)).unwrap();
    assert!(outcome.timed_out());

    thread::sleep(Duration::from_millis(800));
    assert!(marker.exists(), "detached child did not finish");
    let _ = std::fs::remove_file(&marker);
}

#[test]
fn library_supervise_remaps_250() {
    let outcome = supervise(&config(&["sh", "-c", "exit 250"], 2_000_000)).unwrap();
    assert_eq!(outcome.exit_code(), exit_codes::REMAPPED_STILL_RUNNING);
}

#[test]
fn library_supervise_nul_in_command() {
    let err = supervise(&config(&["echo", "a\0b"], 2_000_000)).unwrap_err();
    assert_eq!(err, SupervisorError::InvalidCommand);
    assert_eq!(err.exit_code(), exit_codes::FAILURE);
}

#[test]
fn library_supervise_concurrent_threads() {
    /* each supervise call only sees its own child */
    let handles: Vec<_> = (0u8..6)
        .map(|i| {
            thread::spawn(move || {
                let script = format!("exit {}", 20 + i);
                let outcome = supervise(&config(&["sh", "-c", &script], 3_000_000)).unwrap();
                assert_eq!(outcome.exit_code(), 20 + i);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

/* =========================================================================
 * CONFIG / ARGS
 * ========================================================================= */

#[test]
fn library_config_rejects_sub_millisecond() {
    let err = Config::new(vec!["true".into()], 500, None, 0, false).unwrap_err();
    assert_eq!(err.to_string(), "invalid sleep time");
}

#[test]
fn library_args_to_config() {
    let args = Args::try_parse_from(["run-fast-or-hide", "-s", "3000", "--", "true"]).unwrap();
    let config = args.into_config().unwrap();
    assert_eq!(config.timeout(), Duration::from_millis(3));
    assert_eq!(config.program(), "true");
}

#[test]
fn library_args_unknown_user() {
    let args =
        Args::try_parse_from(["run-fast-or-hide", "-u", "no_such_user_rfoh_99", "true"]).unwrap();
    let err = args.into_config().unwrap_err();
    assert!(matches!(err, SupervisorError::Identity(_)));
    assert_eq!(err.exit_code(), 127);
}

/* =========================================================================
 * BUILDING BLOCKS
 * ========================================================================= */

#[test]
fn library_translate_exit_code() {
    assert_eq!(translate_exit_code(250), 251);
    assert_eq!(translate_exit_code(0), 0);
    assert_eq!(translate_exit_code(127), 127);
}

#[test]
fn library_deadline_waiter_ignores_unrelated_wakeups() {
    /*
     * Hammer the process with signals while waiting. With a no-op
     * handler installed, the waiter must still run its full course.
     */
    extern "C" fn noop(_: libc::c_int) {}

    // SAFETY: installing a plain handler for SIGUSR1; noop is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGUSR1, noop as extern "C" fn(libc::c_int) as libc::sighandler_t);
    }

    let (_tx, rx) = mpsc::channel::<u8>();
    let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let stop_flag = stop.clone();
    let pid = std::process::id() as libc::pid_t;
    let noise = thread::spawn(move || {
        while !stop_flag.load(std::sync::atomic::Ordering::Relaxed) {
            // SAFETY: signalling our own pid with a handled signal.
            unsafe {
                libc::kill(pid, libc::SIGUSR1);
            }
            thread::sleep(Duration::from_millis(5));
        }
    });

    let start = Instant::now();
    let result = DeadlineWaiter::new(Duration::from_millis(120)).wait(&rx);
    let elapsed = start.elapsed();

    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    noise.join().unwrap();

    assert!(result.is_none());
    assert!(elapsed >= Duration::from_millis(105), "woke early: {elapsed:?}");
}
