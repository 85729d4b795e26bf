/*
 * deadline.rs
 *
 * Sleep for the timeout, unless the child finishes first.
 *
 * "Sleep" is a recv_timeout on the completion channel, so a finished child
 * wakes us immediately. Everything else that can cut a sleep short (EINTR,
 * spurious wakeups, a platform sleep that rounds down) must NOT end the wait
 * early: we measure against CLOCK_MONOTONIC taken at entry and go back to
 * sleep for whatever is left, until we're within SLACK of the target.
 *
 * Always sleeps at least once, so a 1ms timeout with 10ms slack still waits.
 *
 * If the watcher hangs up without sending (it failed to wait on the child),
 * the channel is useless; we finish the timeout with plain sleeps rather
 * than returning early.
 */

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::time_math::{
    duration_to_ns, elapsed_ns, monotonic_now_ns, ns_to_duration, remaining_ns, within_slack,
};

/// How close to the target counts as "slept long enough".
pub const DEFAULT_SLACK: Duration = Duration::from_millis(10);

/* one sleep's worth of outcome */
enum Wake<T> {
    Completed(T),
    Slept,
    Disconnected,
}

/// Bounded wait that a completion message can cut short.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineWaiter {
    timeout: Duration,
    slack: Duration,
}

impl DeadlineWaiter {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            slack: DEFAULT_SLACK,
        }
    }

    #[must_use]
    pub const fn with_slack(mut self, slack: Duration) -> Self {
        self.slack = slack;
        self
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait up to the timeout for a value on `completion`.
    ///
    /// Returns `Some` as soon as a value arrives, `None` once the timeout
    /// has elapsed (within the slack).
    pub fn wait<T>(&self, completion: &Receiver<T>) -> Option<T> {
        let target_ns = duration_to_ns(self.timeout);
        let slack_ns = duration_to_ns(self.slack);

        let Some(start_ns) = monotonic_now_ns() else {
            log::debug!("monotonic clock unavailable, single sleep of {:?}", self.timeout);
            return match sleep_or_receive(completion, self.timeout, false) {
                Wake::Completed(value) => Some(value),
                Wake::Slept | Wake::Disconnected => completion.try_recv().ok(),
            };
        };

        let mut remaining = target_ns;
        let mut hung_up = false;
        loop {
            match sleep_or_receive(completion, ns_to_duration(remaining), hung_up) {
                Wake::Completed(value) => return Some(value),
                Wake::Disconnected => hung_up = true,
                Wake::Slept => {}
            }

            /* clock went away or backwards mid-wait: stop, like a plain sleep would */
            let Some(elapsed) = monotonic_now_ns().and_then(|now| elapsed_ns(start_ns, now))
            else {
                break;
            };
            if within_slack(elapsed, target_ns, slack_ns) {
                break;
            }
            remaining = remaining_ns(elapsed, target_ns);
        }

        /* a completion that landed while we were deciding still wins */
        completion.try_recv().ok()
    }
}

fn sleep_or_receive<T>(completion: &Receiver<T>, dur: Duration, hung_up: bool) -> Wake<T> {
    if hung_up {
        thread::sleep(dur);
        return Wake::Slept;
    }
    match completion.recv_timeout(dur) {
        Ok(value) => Wake::Completed(value),
        Err(RecvTimeoutError::Timeout) => Wake::Slept,
        Err(RecvTimeoutError::Disconnected) => Wake::Disconnected,
    }
}
