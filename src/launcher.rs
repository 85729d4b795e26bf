/*
 * launcher.rs
 *
 * What the child does between fork and exec.
 *
 * Everything that allocates happens in LaunchPlan::new, in the parent.
 * After fork the child only touches pre-built CStrings and integers and
 * makes raw syscalls, then execs or _exits. Never returns.
 *
 * Order matters:
 *   nice           best-effort, result ignored
 *   setgid         must come before setuid - once we drop to the user
 *   setgroups      we no longer have the privilege to change groups
 *   setuid
 *   chdir home     after setuid, so we only enter dirs the user can
 *   /dev/null      unless verbose; a detached child must not hold our
 *                  caller's pipes open or scribble on its terminal
 *   execvp
 * Any failure before exec: message on stderr, _exit(127).
 */

use std::ffi::{CString, c_char};
use std::ptr;

use crate::config::{Config, Identity};
use crate::error::{Result, SupervisorError, exit_codes};
use crate::io::last_errno;
use crate::raw_eprintln;

const DEV_NULL: &[u8] = b"/dev/null\0";

/* credentials, pre-converted for the child */
#[derive(Debug)]
struct Credentials {
    uid: libc::uid_t,
    gid: libc::gid_t,
    groups: Vec<libc::gid_t>,
    home: CString,
}

impl Credentials {
    fn from_identity(identity: &Identity) -> Result<Self> {
        Ok(Self {
            uid: identity.uid,
            gid: identity.gid,
            groups: identity.groups.clone(),
            home: CString::new(identity.home_dir.as_str())
                .map_err(|_| SupervisorError::InvalidCommand)?,
        })
    }
}

/// Everything the child needs, built before fork.
#[derive(Debug)]
pub struct LaunchPlan {
    program: CString,
    /* owns the strings argv points into */
    args: Vec<CString>,
    argv: Vec<*const c_char>,
    credentials: Option<Credentials>,
    nice_delta: i32,
    verbose: bool,
}

impl LaunchPlan {
    /// Convert the config into C strings and pointer arrays.
    ///
    /// # Errors
    ///
    /// `InvalidCommand` if any argument (or the home dir) has a NUL byte.
    pub fn new(config: &Config) -> Result<Self> {
        let args = config
            .command()
            .iter()
            .map(|a| CString::new(a.as_str()).map_err(|_| SupervisorError::InvalidCommand))
            .collect::<Result<Vec<_>>>()?;
        let program = args
            .first()
            .cloned()
            .ok_or_else(|| SupervisorError::InvalidArgument("command is missing".to_string()))?;

        /* [args..., NULL]; CString heap buffers don't move when the Vec does */
        let mut argv: Vec<*const c_char> = Vec::with_capacity(args.len() + 1);
        argv.extend(args.iter().map(|a| a.as_ptr()));
        argv.push(ptr::null());

        let credentials = config
            .identity()
            .map(Credentials::from_identity)
            .transpose()?;

        Ok(Self {
            program,
            args,
            argv,
            credentials,
            nice_delta: config.nice_delta(),
            verbose: config.verbose(),
        })
    }

    #[must_use]
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    /// Become the target command. Only meaningful in a freshly forked child.
    pub fn launch(&self) -> ! {
        if self.nice_delta != 0 {
            // SAFETY: nice has no memory preconditions. Failure (e.g. EPERM on
            // a negative delta) is deliberately ignored.
            let _ = unsafe { libc::nice(self.nice_delta) };
        }

        if let Some(creds) = &self.credentials {
            drop_privileges(creds);
        }

        if !self.verbose {
            silence_stdio();
        }

        reset_signals();

        // SAFETY: program and every argv entry are NUL-terminated strings
        // owned by self; argv ends with a null pointer. execvp only returns
        // on failure.
        unsafe {
            libc::execvp(self.program.as_ptr(), self.argv.as_ptr());
        }

        let errno = last_errno();
        let name = core::str::from_utf8(self.program.to_bytes()).unwrap_or("command");
        raw_eprintln!("ERROR: cannot execute {}: errno {}", name, errno);
        child_exit()
    }
}

fn drop_privileges(creds: &Credentials) {
    // SAFETY: setgid takes a plain integer.
    if unsafe { libc::setgid(creds.gid) } != 0 {
        die_with_errno("cannot set gid", last_errno());
    }
    // SAFETY: groups is a live Vec of groups.len() gid_t values.
    if unsafe { libc::setgroups(creds.groups.len() as _, creds.groups.as_ptr()) } != 0 {
        die_with_errno("cannot init group list", last_errno());
    }
    // SAFETY: setuid takes a plain integer.
    if unsafe { libc::setuid(creds.uid) } != 0 {
        die_with_errno("cannot set uid", last_errno());
    }
    // SAFETY: home is a NUL-terminated CString owned by creds.
    if unsafe { libc::chdir(creds.home.as_ptr()) } != 0 {
        die_with_errno("cannot change directory", last_errno());
    }
}

/* stdin/stdout/stderr -> /dev/null */
fn silence_stdio() {
    // SAFETY: DEV_NULL is a NUL-terminated path literal.
    let fd = unsafe { libc::open(DEV_NULL.as_ptr().cast(), libc::O_RDWR) };
    if fd < 0 {
        die_with_errno("cannot open /dev/null", last_errno());
    }
    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        // SAFETY: fd was just opened; dup2 onto a standard fd number is
        // always a valid request.
        if unsafe { libc::dup2(fd, target) } < 0 {
            /* stderr may already point at /dev/null, message is best-effort */
            die_with_errno("cannot redirect standard streams", last_errno());
        }
    }
    if fd > libc::STDERR_FILENO {
        // SAFETY: fd is ours and no longer needed; 0-2 now hold duplicates.
        unsafe {
            libc::close(fd);
        }
    }
}

/*
 * The Rust runtime ignores SIGPIPE in our process, and ignored dispositions
 * survive exec. Put it back so `cmd | head` behaves in the child.
 */
fn reset_signals() {
    // SAFETY: SIG_DFL is always a valid disposition for SIGPIPE.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

fn die_with_errno(what: &str, errno: i32) -> ! {
    raw_eprintln!("ERROR: {}: errno {}", what, errno);
    child_exit()
}

fn child_exit() -> ! {
    // SAFETY: _exit skips atexit handlers and stdio flushing, which belong
    // to the parent's copy of this address space.
    unsafe { libc::_exit(i32::from(exit_codes::FAILURE)) }
}
