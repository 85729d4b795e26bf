/*
 * process.rs
 *
 * fork + the handle to the one child we ever create.
 *
 * Not posix_spawn: we need setgid/setgroups/setuid/chdir/nice in the child
 * and posix_spawn can't do credentials portably. So plain fork, and the
 * child side is LaunchPlan::launch, which never returns.
 *
 * Must be called while the process is single-threaded (the watcher thread
 * is started after fork). The child only runs async-signal-safe code, but
 * keeping it single-threaded means no lock can be held at fork time either.
 *
 * SIGCHLD: an ignored disposition (or SA_NOCLDWAIT) is inherited from
 * whoever started us, and makes the kernel reap the child on its own. The
 * watcher's waitpid would then get ECHILD and a fast child would look like
 * a timeout. So before fork we put SIGCHLD back to SIG_DFL if, and only
 * if, it is set up that way. A real handler installed by a library caller
 * is left alone.
 */

use core::ptr;

use crate::error::{Result, SupervisorError};
use crate::io::last_errno;
use crate::launcher::LaunchPlan;
use crate::status::RawExitStatus;

/// The spawned child. Exactly one per run; its pid is never reused by us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildHandle {
    pid: libc::pid_t,
}

impl ChildHandle {
    /// Get the process ID
    #[inline]
    #[must_use]
    pub const fn pid(&self) -> libc::pid_t {
        self.pid
    }

    /// Block until this child exits. Retries on EINTR; stop events are not
    /// reported (no WUNTRACED).
    ///
    /// # Errors
    ///
    /// `WatcherError(errno)` if waitpid fails, e.g. ECHILD when someone else
    /// already reaped it.
    pub fn wait(&self) -> Result<RawExitStatus> {
        let mut status: i32 = 0;
        loop {
            // SAFETY: pid came from fork, status is a valid out-pointer.
            let ret = unsafe { libc::waitpid(self.pid, &raw mut status, 0) };
            if ret == self.pid {
                return Ok(RawExitStatus::from_raw(status));
            }
            let errno = last_errno();
            if ret < 0 && errno == libc::EINTR {
                continue;
            }
            return Err(SupervisorError::WatcherError(errno));
        }
    }

    /// Non-blocking check, Ok(None) while still running.
    ///
    /// # Errors
    ///
    /// `WatcherError(errno)` if waitpid fails.
    pub fn try_wait(&self) -> Result<Option<RawExitStatus>> {
        let mut status: i32 = 0;
        // SAFETY: pid came from fork, status is a valid out-pointer.
        let ret = unsafe { libc::waitpid(self.pid, &raw mut status, libc::WNOHANG) };
        match ret {
            0 => Ok(None),
            r if r == self.pid => Ok(Some(RawExitStatus::from_raw(status))),
            _ => Err(SupervisorError::WatcherError(last_errno())),
        }
    }
}

/// Fork; the child runs `plan` and never comes back here.
///
/// # Errors
///
/// `SpawnError(errno)` if fork fails (EAGAIN, ENOMEM).
pub fn spawn(plan: &LaunchPlan) -> Result<ChildHandle> {
    restore_child_reaping();

    // SAFETY: the child branch below only calls LaunchPlan::launch, which
    // uses pre-built data and async-signal-safe syscalls before exec/_exit.
    let pid = unsafe { libc::fork() };
    match pid {
        -1 => Err(SupervisorError::SpawnError(last_errno())),
        0 => plan.launch(),
        pid => Ok(ChildHandle { pid }),
    }
}

/* SIGCHLD -> SIG_DFL when it would make the kernel auto-reap our child */
fn restore_child_reaping() {
    // SAFETY: sigaction is plain data; all-zero is a valid (empty) value.
    let mut current: libc::sigaction = unsafe { core::mem::zeroed() };
    // SAFETY: null act only queries; current is a valid out-pointer.
    if unsafe { libc::sigaction(libc::SIGCHLD, ptr::null(), &raw mut current) } != 0 {
        return;
    }
    let ignored = current.sa_sigaction == libc::SIG_IGN;
    let no_wait = current.sa_flags & libc::SA_NOCLDWAIT != 0;
    if !ignored && !no_wait {
        return;
    }

    // SAFETY: as above, all-zero is a valid sigaction.
    let mut default: libc::sigaction = unsafe { core::mem::zeroed() };
    default.sa_sigaction = libc::SIG_DFL;
    // SAFETY: sa_mask is a field of a live, writable sigaction.
    unsafe {
        libc::sigemptyset(&raw mut default.sa_mask);
    }
    // SAFETY: default is fully initialised; old action not requested.
    if unsafe { libc::sigaction(libc::SIGCHLD, &raw const default, ptr::null_mut()) } != 0 {
        log::warn!(
            "cannot reset SIGCHLD (errno {}); the child may be reaped behind our back",
            last_errno()
        );
        return;
    }
    log::debug!("SIGCHLD was ignored by the caller, reset to default before fork");
}

/*
 * These fork real processes. Skipped under Miri, which can't run fork or
 * waitpid. Integration tests cover the full CLI.
 */
