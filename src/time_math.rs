/*
 * time_math.rs
 *
 * Monotonic clock + the little bit of nanosecond arithmetic the deadline
 * loop needs. Kept separate so it can be checked without sleeping.
 *
 * CLOCK_MONOTONIC, never the wall clock. gettimeofday jumps when NTP or an
 * admin sets the time, and a jump backwards would make us sleep forever
 * (or a jump forward detach instantly).
 *
 * The clock read returns Option: if clock_gettime ever fails we don't
 * abort, the waiter degrades to one plain sleep.
 */

use core::time::Duration;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Current CLOCK_MONOTONIC reading in nanoseconds, or None if the clock
/// can't be read.
#[inline]
#[must_use]
pub fn monotonic_now_ns() -> Option<u64> {
    // SAFETY: timespec is plain integers (plus padding on some targets);
    // all-zero is a valid value.
    let mut ts: libc::timespec = unsafe { core::mem::zeroed() };
    // SAFETY: ts is a valid, writable timespec; CLOCK_MONOTONIC is a
    // supported clock id on every unix we build for.
    let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &raw mut ts) };
    if ret != 0 {
        return None;
    }
    let secs = u64::try_from(ts.tv_sec).ok()?;
    let nanos = u64::try_from(ts.tv_nsec).ok()?;
    Some(advance_ns(secs.saturating_mul(NANOS_PER_SEC), nanos))
}

/*
 * now - start. None if now < start: the clock went backwards or the
 * arguments are swapped. Callers treat that as "stop trusting the clock".
 */
#[inline]
#[must_use]
pub const fn elapsed_ns(start_ns: u64, now_ns: u64) -> Option<u64> {
    now_ns.checked_sub(start_ns)
}

/* target - elapsed, clamped to 0. overshoot is normal, not a bug */
#[inline]
#[must_use]
pub const fn remaining_ns(elapsed_ns: u64, target_ns: u64) -> u64 {
    target_ns.saturating_sub(elapsed_ns)
}

/* saturating: a deadline that overflows means "never", not "soon" */
#[inline]
#[must_use]
pub const fn advance_ns(base_ns: u64, offset_ns: u64) -> u64 {
    base_ns.saturating_add(offset_ns)
}

/*
 * Done once elapsed is within slack of the target. Sleeping the last few
 * ms again isn't worth a wakeup.
 */
#[inline]
#[must_use]
pub const fn within_slack(elapsed_ns: u64, target_ns: u64, slack_ns: u64) -> bool {
    advance_ns(elapsed_ns, slack_ns) >= target_ns
}

#[inline]
#[must_use]
pub const fn duration_to_ns(d: Duration) -> u64 {
    advance_ns(
        d.as_secs().saturating_mul(NANOS_PER_SEC),
        d.subsec_nanos() as u64,
    )
}

#[inline]
#[must_use]
pub const fn ns_to_duration(ns: u64) -> Duration {
    Duration::from_nanos(ns)
}

/* -------------------------------------------------------------------------- */
/*                              kani proofs                                   */
/* -------------------------------------------------------------------------- */

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /*
     * remaining_ns never underflows and is exact when not overshot.
     */
    #[kani::proof]
    fn verify_remaining_ns_saturates_to_zero() {
        let elapsed: u64 = kani::any();
        let target: u64 = kani::any();

        let result = remaining_ns(elapsed, target);

        if elapsed >= target {
            kani::assert(result == 0, "remaining_ns should be 0 past the target");
        } else {
            kani::assert(result == target - elapsed, "remaining_ns should be exact");
        }
    }

    /*
     * within_slack is monotonic: once true, more elapsed time keeps it true.
     * the deadline loop relies on this to terminate.
     */
    #[kani::proof]
    fn verify_within_slack_monotonic() {
        let elapsed: u64 = kani::any();
        let extra: u64 = kani::any();
        let target: u64 = kani::any();
        let slack: u64 = kani::any();

        if within_slack(elapsed, target, slack) {
            kani::assert(
                within_slack(advance_ns(elapsed, extra), target, slack),
                "within_slack must stay true as time advances",
            );
        }
    }

    /*
     * if not within slack, there's more than slack left to sleep.
     */
    #[kani::proof]
    fn verify_not_within_slack_means_remaining() {
        let elapsed: u64 = kani::any();
        let target: u64 = kani::any();
        let slack: u64 = kani::any();

        if !within_slack(elapsed, target, slack) {
            kani::assert(
                remaining_ns(elapsed, target) > slack,
                "remaining time must exceed slack",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_now_advances() {
        let a = monotonic_now_ns().expect("CLOCK_MONOTONIC readable");
        std::thread::sleep(Duration::from_millis(2));
        let b = monotonic_now_ns().expect("CLOCK_MONOTONIC readable");
        assert!(b > a, "clock did not advance: {a} -> {b}");
        assert!(elapsed_ns(a, b).unwrap() >= 2_000_000);
    }

    #[test]
    fn test_elapsed_ns() {
        assert_eq!(elapsed_ns(100, 150), Some(50));
        assert_eq!(elapsed_ns(100, 100), Some(0));
        assert_eq!(elapsed_ns(150, 100), None);
    }

    #[test]
    fn test_remaining_ns() {
        assert_eq!(remaining_ns(30, 100), 70);
        assert_eq!(remaining_ns(100, 100), 0);
        /* overshoot clamps */
        assert_eq!(remaining_ns(150, 100), 0);
    }

    #[test]
    fn test_advance_ns_overflow() {
        assert_eq!(advance_ns(100, 50), 150);
        assert_eq!(advance_ns(u64::MAX - 10, 100), u64::MAX);
    }

    #[test]
    fn test_within_slack() {
        let ms = 1_000_000;
        /* 100ms target, 10ms slack */
        assert!(!within_slack(0, 100 * ms, 10 * ms));
        assert!(!within_slack(89 * ms, 100 * ms, 10 * ms));
        assert!(within_slack(90 * ms, 100 * ms, 10 * ms));
        assert!(within_slack(150 * ms, 100 * ms, 10 * ms));
        /* slack bigger than target: done immediately */
        assert!(within_slack(0, 5 * ms, 10 * ms));
    }

    #[test]
    fn test_duration_conversions() {
        assert_eq!(duration_to_ns(Duration::from_micros(1500)), 1_500_000);
        assert_eq!(duration_to_ns(Duration::MAX), u64::MAX);
        assert_eq!(ns_to_duration(2_000_000), Duration::from_millis(2));
    }
}
