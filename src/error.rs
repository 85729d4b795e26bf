/*
 * error.rs
 *
 * Exit codes are the whole user interface of this tool. Schedulers branch
 * on them. 0 = done, 250 = still running (detached), 127 = we failed or
 * exec failed, 251 = child really exited with 250.
 *
 * Don't change them.
 */

use std::fmt;

/// exit codes callers depend on. don't change these.
pub mod exit_codes {
    /// Child exited normally before the timeout
    pub const SUCCESS: u8 = 0;
    /// Bad invocation, unknown user, or the command could not be launched
    pub const FAILURE: u8 = 127;
    /// Child still running at the timeout; it was detached
    pub const STILL_RUNNING: u8 = 250;
    /// Child exited with 250 before the timeout; remapped so it can't be
    /// mistaken for STILL_RUNNING
    pub const REMAPPED_STILL_RUNNING: u8 = 251;
}

/* everything that can go wrong on the supervisor side */
#[derive(Debug, PartialEq, Eq)]
pub enum SupervisorError {
    /// Bad option value or missing command
    InvalidArgument(String),
    /// Username not in the account database
    Identity(String),
    /// Command or argument contains an interior NUL byte
    InvalidCommand,
    SpawnError(i32), // errno from fork
    WatcherError(i32), // errno from waitpid / thread spawn
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(s) | Self::Identity(s) => f.write_str(s),
            Self::InvalidCommand => write!(f, "command contains a NUL byte"),
            Self::SpawnError(errno) => write!(f, "cannot fork: errno {errno}"),
            Self::WatcherError(errno) => write!(f, "cannot watch child: errno {errno}"),
        }
    }
}

impl std::error::Error for SupervisorError {}

impl SupervisorError {
    /*
     * Every failure is 127, so "bad invocation" and "exec failed" look the
     * same to the caller. Known ambiguity, kept for compatibility.
     */
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgument(_)
            | Self::Identity(_)
            | Self::InvalidCommand
            | Self::SpawnError(_)
            | Self::WatcherError(_) => exit_codes::FAILURE,
        }
    }
}

pub type Result<T> = core::result::Result<T, SupervisorError>;
