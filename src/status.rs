/*
 * status.rs
 *
 * Raw waitpid status -> the code we exit with.
 *
 * The policy is one line: take the exit-code bits, and if they say 250
 * turn them into 251. 250 is ours. A fast child that happens to exit 250
 * must not look like a timeout.
 *
 * A child killed by a signal has zero exit-code bits, so it reports 0.
 * Known limitation: we log it, we don't reinterpret it.
 */

use crate::error::exit_codes;

/// Status word as filled in by waitpid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawExitStatus {
    status: i32,
}

impl RawExitStatus {
    #[inline]
    #[must_use]
    pub const fn from_raw(status: i32) -> Self {
        Self { status }
    }

    #[inline]
    #[must_use]
    pub const fn into_raw(self) -> i32 {
        self.status
    }

    /// Exit-code bits (WEXITSTATUS), whether or not the child exited normally
    #[inline]
    #[must_use]
    pub const fn exit_bits(&self) -> u8 {
        ((self.status >> 8) & 0xFF) as u8
    }

    /// Returns the exit code if the process exited normally
    #[inline]
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        if self.exited_normally() {
            Some((self.status >> 8) & 0xFF)
        } else {
            None
        }
    }

    /// Returns the signal number if the process was killed by a signal
    #[inline]
    #[must_use]
    pub const fn signal(&self) -> Option<i32> {
        if self.signaled() {
            Some(self.status & 0x7F)
        } else {
            None
        }
    }

    #[inline]
    const fn exited_normally(&self) -> bool {
        (self.status & 0x7F) == 0
    }

    /* WIFSIGNALED: the i8 cast keeps 0x7f (stopped) from counting */
    #[inline]
    const fn signaled(&self) -> bool {
        (((self.status & 0x7F) + 1) as i8 >> 1) > 0
    }

    /// The code to exit with for this child.
    #[inline]
    #[must_use]
    pub const fn translated(&self) -> u8 {
        translate_exit_code(self.exit_bits())
    }
}

/// 250 -> 251, everything else unchanged.
///
/// # Examples
///
/// ```
/// use run_fast_or_hide::status::translate_exit_code;
///
/// assert_eq!(translate_exit_code(0), 0);
/// assert_eq!(translate_exit_code(42), 42);
/// assert_eq!(translate_exit_code(250), 251);
/// assert_eq!(translate_exit_code(251), 251);
/// ```
#[inline]
#[must_use]
pub const fn translate_exit_code(code: u8) -> u8 {
    if code == exit_codes::STILL_RUNNING {
        exit_codes::REMAPPED_STILL_RUNNING
    } else {
        code
    }
}
