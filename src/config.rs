/*
 * config.rs
 *
 * The validated run parameters. Built once in main, read-only after that.
 *
 * Sleep is in microseconds because that's what every caller of this tool
 * already passes. Below 1ms is scheduler noise, so we refuse it.
 */

use std::time::Duration;

use crate::error::{Result, SupervisorError};

/// Default wait before detaching. 100ms is plenty for the fast jobs this
/// tool is meant for.
pub const DEFAULT_SLEEP_MICROS: u64 = 100_000;

/// Smallest accepted `--sleep` value.
pub const MIN_SLEEP_MICROS: u64 = 1_000;

/// Account the child switches to before exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub uid: libc::uid_t,
    pub gid: libc::gid_t,
    pub home_dir: String,
    /// Supplementary groups, primary gid included
    pub groups: Vec<libc::gid_t>,
}

/// Everything the supervisor needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    command: Vec<String>,
    timeout_micros: u64,
    identity: Option<Identity>,
    nice_delta: i32,
    verbose: bool,
}

impl Config {
    /// Validate and build. `command[0]` is the program, looked up in PATH.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the command is empty or the timeout is below
    /// [`MIN_SLEEP_MICROS`].
    pub fn new(
        command: Vec<String>,
        timeout_micros: u64,
        identity: Option<Identity>,
        nice_delta: i32,
        verbose: bool,
    ) -> Result<Self> {
        if timeout_micros < MIN_SLEEP_MICROS {
            return Err(invalid_sleep());
        }
        if command.is_empty() {
            return Err(SupervisorError::InvalidArgument(
                "command is missing".to_string(),
            ));
        }
        Ok(Self {
            command,
            timeout_micros,
            identity,
            nice_delta,
            verbose,
        })
    }

    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    #[must_use]
    pub fn program(&self) -> &str {
        /* non-empty by construction */
        &self.command[0]
    }

    #[must_use]
    pub const fn timeout_micros(&self) -> u64 {
        self.timeout_micros
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_micros(self.timeout_micros)
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub const fn nice_delta(&self) -> i32 {
        self.nice_delta
    }

    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }
}

fn invalid_sleep() -> SupervisorError {
    SupervisorError::InvalidArgument("invalid sleep time".to_string())
}

/// Parse a `--sleep` value: plain non-negative integer microseconds,
/// at least [`MIN_SLEEP_MICROS`].
///
/// # Examples
///
/// ```
/// use run_fast_or_hide::config::parse_sleep_micros;
///
/// assert_eq!(parse_sleep_micros("100000").unwrap(), 100_000);
/// assert_eq!(parse_sleep_micros(" 1000 ").unwrap(), 1_000);
/// assert!(parse_sleep_micros("500").is_err());
/// assert!(parse_sleep_micros("1s").is_err());
/// ```
///
/// # Errors
///
/// `InvalidArgument("invalid sleep time")` for anything else.
pub fn parse_sleep_micros(input: &str) -> Result<u64> {
    let input = input.trim();
    /* u64::from_str takes a leading '+', we don't */
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid_sleep());
    }
    let micros: u64 = input.parse().map_err(|_| invalid_sleep())?;
    if micros < MIN_SLEEP_MICROS {
        return Err(invalid_sleep());
    }
    Ok(micros)
}

/// Parse a `--nice` value as a signed increment.
///
/// # Errors
///
/// `InvalidArgument("invalid nice level")` if it isn't an `i32`.
pub fn parse_nice_delta(input: &str) -> Result<i32> {
    input
        .trim()
        .parse()
        .map_err(|_| SupervisorError::InvalidArgument("invalid nice level".to_string()))
}
