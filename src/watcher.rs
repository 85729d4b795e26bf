/*
 * watcher.rs
 *
 * Reaps our child the moment it exits and hands the status to the
 * supervisor.
 *
 * A dedicated thread blocks in waitpid(pid) on exactly our child, so no
 * SIGCHLD handler, no global "which pid is ours" variable, and no chance
 * of eating some other child's status. The pid travels into the thread
 * by value.
 *
 * The thread is never joined. If the deadline wins, the process exits
 * with the thread still parked in waitpid, and the child is re-parented.
 */

use std::sync::mpsc::{self, Receiver};
use std::thread;

use crate::error::{Result, SupervisorError};
use crate::process::ChildHandle;
use crate::status::RawExitStatus;

/// Start watching `child`. The receiver yields one status when it exits.
///
/// If waitpid fails the sender is dropped without sending; the receiver
/// then reports disconnection.
///
/// # Errors
///
/// `WatcherError` if the thread can't be started.
pub fn arm(child: ChildHandle) -> Result<Receiver<RawExitStatus>> {
    /* capacity 1: the single send never blocks, even if nobody is listening */
    let (tx, rx) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name("completion-watcher".into())
        .spawn(move || match child.wait() {
            Ok(status) => {
                log::debug!("reaped pid {}: raw status {:#x}", child.pid(), status.into_raw());
                let _ = tx.send(status);
            }
            Err(e) => log::warn!("lost track of pid {}: {}", child.pid(), e),
        })
        .map_err(|e| SupervisorError::WatcherError(e.raw_os_error().unwrap_or(0)))?;

    Ok(rx)
}
