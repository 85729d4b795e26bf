/*
 * identity.rs
 *
 * username -> uid, gid, home, supplementary groups.
 *
 * All of this runs in the parent, before fork. getpwnam and friends go
 * through NSS (files, LDAP, sssd...) which may allocate, lock, or open
 * sockets. None of that is safe after fork, so the child only ever gets
 * plain numbers and an already-built group list.
 */

use std::ffi::{CStr, CString};
use std::io;
use std::ptr;

use crate::config::Identity;
use crate::error::{Result, SupervisorError};

/* starting buffer for getpwnam_r string fields; grown on ERANGE */
const PW_BUF_INITIAL: usize = 1024;
const PW_BUF_MAX: usize = 1 << 20;

/* starting guess for getgrouplist */
const GROUPS_INITIAL: usize = 32;
const GROUPS_MAX: usize = 65_536;

fn invalid_user() -> SupervisorError {
    SupervisorError::Identity("invalid user".to_string())
}

/// Resolve `username` to the identity the child will run as.
///
/// # Errors
///
/// `Identity("invalid user")` if the account doesn't exist or the lookup
/// fails.
pub fn lookup_user(username: &str) -> Result<Identity> {
    let name = CString::new(username).map_err(|_| invalid_user())?;

    let mut buf: Vec<libc::c_char> = vec![0; PW_BUF_INITIAL];
    loop {
        // SAFETY: libc::passwd is a plain C struct; all-zero is a valid value
        // that getpwnam_r overwrites before we read it.
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = ptr::null_mut();

        // SAFETY: name is NUL-terminated, pwd/result are valid out-pointers,
        // buf is a live allocation of buf.len() bytes.
        let ret = unsafe {
            libc::getpwnam_r(
                name.as_ptr(),
                &raw mut pwd,
                buf.as_mut_ptr(),
                buf.len(),
                &raw mut result,
            )
        };

        if ret == libc::ERANGE && buf.len() < PW_BUF_MAX {
            let grown = buf.len() * 2;
            buf.resize(grown, 0);
            continue;
        }
        if ret != 0 {
            log::debug!("getpwnam_r({username}) failed: errno {ret}");
            return Err(invalid_user());
        }
        if result.is_null() {
            return Err(invalid_user());
        }

        // SAFETY: getpwnam_r succeeded, so pw_dir points to a NUL-terminated
        // string inside buf, which is still alive.
        let home_dir = unsafe { CStr::from_ptr(pwd.pw_dir) }
            .to_string_lossy()
            .into_owned();

        let groups = supplementary_groups(&name, pwd.pw_gid)?;

        return Ok(Identity {
            username: username.to_string(),
            uid: pwd.pw_uid,
            gid: pwd.pw_gid,
            home_dir,
            groups,
        });
    }
}

/*
 * getgrouplist: returns -1 and updates ngroups when the buffer is too small.
 * Some libcs don't update ngroups, so we also double on our own.
 */
fn supplementary_groups(name: &CStr, gid: libc::gid_t) -> Result<Vec<libc::gid_t>> {
    let mut groups: Vec<libc::gid_t> = vec![0; GROUPS_INITIAL];
    loop {
        let mut ngroups = libc::c_int::try_from(groups.len()).map_err(|_| invalid_user())?;

        // SAFETY: name is NUL-terminated, groups has room for ngroups entries,
        // ngroups is a valid in/out pointer.
        let ret = unsafe {
            libc::getgrouplist(
                name.as_ptr(),
                gid as _,
                groups.as_mut_ptr().cast(),
                &raw mut ngroups,
            )
        };

        let reported = usize::try_from(ngroups).unwrap_or(0);
        if ret >= 0 {
            groups.truncate(reported);
            return Ok(groups);
        }
        if groups.len() >= GROUPS_MAX {
            log::debug!(
                "getgrouplist gave up at {} groups: {}",
                groups.len(),
                io::Error::last_os_error()
            );
            return Err(SupervisorError::Identity(
                "cannot read group list".to_string(),
            ));
        }
        let next = reported.max(groups.len() * 2).min(GROUPS_MAX);
        groups.resize(next, 0);
    }
}
