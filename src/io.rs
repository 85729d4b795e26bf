/*
 * io.rs
 *
 * stderr for the forked child. direct write(2), no locks, no allocation.
 *
 * Between fork and exec we are a copy of a process that may have had other
 * threads holding the stdio lock or the allocator lock. std's eprintln!
 * could deadlock there. write(2) is async-signal-safe, and core::fmt into
 * a fixed writer doesn't allocate for the integers and byte strings we
 * print.
 *
 * no buffering - each write is a syscall. fine for one error line.
 */

use core::fmt::{self, Write};

const STDERR: i32 = 2;

/// Write bytes to stderr, retrying on EINTR and short writes.
#[inline]
pub fn write_stderr(mut s: &[u8]) {
    while !s.is_empty() {
        // SAFETY: s is a valid byte slice for s.len() bytes, STDERR is a
        // plain fd number (write just fails with EBADF if it's closed).
        let n = unsafe { libc::write(STDERR, s.as_ptr().cast(), s.len()) };
        if n < 0 {
            if last_errno() == libc::EINTR {
                continue;
            }
            return;
        }
        let Ok(n) = usize::try_from(n) else { return };
        if n == 0 {
            return;
        }
        s = &s[n..];
    }
}

/// errno of the last failed libc call on this thread.
#[inline]
#[must_use]
pub fn last_errno() -> i32 {
    /* Os variant: reading errno, no allocation */
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// A writer that outputs to stderr via direct syscall.
/// Implements core::fmt::Write for use with write!/writeln! macros.
pub struct StderrWriter;

impl Write for StderrWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        write_stderr(s.as_bytes());
        Ok(())
    }
}

/// Print to stderr with newline, safe between fork and exec
#[macro_export]
macro_rules! raw_eprintln {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::io::StderrWriter, $($arg)*);
        $crate::io::write_stderr(b"\n");
    }};
}
