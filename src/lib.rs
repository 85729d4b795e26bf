/*
 * lib.rs
 *
 * Exists mostly for testing. Integration tests need our types, doc tests
 * need a lib. You could use this as a library but honestly just shell out.
 */

//! # run-fast-or-hide
//!
//! Start a command, wait a bounded time for it, and detach it if it's
//! still running. Exit codes: the child's own code if it finished in time,
//! 250 if it didn't (251 if the child itself exited 250), 127 on failure.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use run_fast_or_hide::{Config, supervise};
//!
//! let config = Config::new(vec!["true".into()], 100_000, None, 0, false).unwrap();
//! let outcome = supervise(&config).unwrap();
//! std::process::exit(i32::from(outcome.exit_code()));
//! ```

pub mod args;
pub mod config;
pub mod deadline;
pub mod error;
pub mod identity;
pub mod io;
pub mod launcher;
pub mod process;
pub mod status;
pub mod supervisor;
pub mod time_math;
pub mod watcher;

pub use args::Args;
pub use config::{Config, Identity};
pub use deadline::DeadlineWaiter;
pub use error::{Result, SupervisorError, exit_codes};
pub use status::{RawExitStatus, translate_exit_code};
pub use supervisor::{ExitOutcome, supervise};
