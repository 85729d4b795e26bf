/*
 * supervisor.rs
 *
 * fork, arm the watcher, wait out the deadline. Whichever finishes first
 * decides the exit code:
 *
 *   watcher first  -> ChildCompleted(status), exit with the translated code
 *   deadline first -> TimedOut, exit 250, child keeps running re-parented
 *
 * The losing side is simply abandoned: the watcher thread dies with the
 * process, the deadline loop is never re-entered.
 */

use crate::config::Config;
use crate::deadline::DeadlineWaiter;
use crate::error::{Result, exit_codes};
use crate::launcher::LaunchPlan;
use crate::process::{self, ChildHandle};
use crate::status::RawExitStatus;
use crate::watcher;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Child exited before the deadline
    ChildCompleted(RawExitStatus),
    /// Deadline passed first; the child was left running
    TimedOut,
}

impl ExitOutcome {
    /// The code this process should exit with.
    ///
    /// # Examples
    ///
    /// ```
    /// use run_fast_or_hide::status::RawExitStatus;
    /// use run_fast_or_hide::supervisor::ExitOutcome;
    ///
    /// assert_eq!(ExitOutcome::TimedOut.exit_code(), 250);
    /// let exited_250 = RawExitStatus::from_raw(250 << 8);
    /// assert_eq!(ExitOutcome::ChildCompleted(exited_250).exit_code(), 251);
    /// ```
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::ChildCompleted(status) => status.translated(),
            Self::TimedOut => exit_codes::STILL_RUNNING,
        }
    }

    #[must_use]
    pub const fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// Run the configured command and wait for it, at most the configured
/// timeout.
///
/// Launch failures inside the child (bad credentials, exec failure) are not
/// errors here: the child exits 127 and that comes back as
/// `ChildCompleted`.
///
/// On `TimedOut` nothing is cleaned up. The child keeps running, and the
/// watcher thread stays parked in `waitpid` until the child exits, then
/// reaps it. The binary exits right away so this never matters there; a
/// long-lived caller keeps one parked thread per timed-out child until
/// that child finishes. If SIGCHLD is ignored by the caller it is reset to
/// the default before fork (see [`crate::process::spawn`]).
///
/// # Errors
///
/// `InvalidCommand` for NUL bytes in the command, `SpawnError` if fork
/// fails.
pub fn supervise(config: &Config) -> Result<ExitOutcome> {
    let plan = LaunchPlan::new(config)?;
    let waiter = DeadlineWaiter::new(config.timeout());

    let child = process::spawn(&plan)?;
    log::debug!(
        "spawned {} (pid {}), waiting up to {}us",
        config.program(),
        child.pid(),
        config.timeout_micros()
    );

    let outcome = match watcher::arm(child) {
        Ok(completion) => match waiter.wait(&completion) {
            Some(status) => ExitOutcome::ChildCompleted(status),
            None => ExitOutcome::TimedOut,
        },
        Err(e) => {
            log::warn!("{e}; falling back to a single check at the deadline");
            wait_without_watcher(&waiter, child)
        }
    };

    report(&outcome, child);
    Ok(outcome)
}

/* no watcher thread: sleep the full timeout, then look once */
fn wait_without_watcher(waiter: &DeadlineWaiter, child: ChildHandle) -> ExitOutcome {
    let (_tx, never) = std::sync::mpsc::channel::<RawExitStatus>();
    let _ = waiter.wait(&never);
    match child.try_wait() {
        Ok(Some(status)) => ExitOutcome::ChildCompleted(status),
        Ok(None) | Err(_) => ExitOutcome::TimedOut,
    }
}

fn report(outcome: &ExitOutcome, child: ChildHandle) {
    match outcome {
        ExitOutcome::ChildCompleted(status) => {
            if let Some(sig) = status.signal() {
                log::warn!(
                    "pid {} was killed by signal {}; reporting exit bits {}",
                    child.pid(),
                    sig,
                    status.translated()
                );
            } else {
                log::debug!("pid {} exited, reporting {}", child.pid(), status.translated());
            }
        }
        ExitOutcome::TimedOut => {
            log::debug!("pid {} still running, detaching", child.pid());
        }
    }
}
