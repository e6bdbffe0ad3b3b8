//! Process hardening
//!
//! Decrypted root keys live in memory while a request is served. Core dumps
//! are turned off at start so a crash cannot write them to disk. Failure is
//! logged and ignored: containers and unprivileged users may not be allowed
//! to change the limit.

use std::sync::OnceLock;

static CORE_DUMPS_DISABLED: OnceLock<bool> = OnceLock::new();

/// Disable core dumps for this process. Returns whether they are off.
///
/// Only the first call touches the limit; later calls report its outcome.
pub fn disable_core_dumps() -> bool {
    *CORE_DUMPS_DISABLED.get_or_init(|| {
        let ok = platform::disable_core_dumps();
        if ok {
            log::debug!("core dumps disabled");
        } else {
            log::warn!("could not disable core dumps");
        }
        ok
    })
}

#[cfg(unix)]
mod platform {
    pub fn disable_core_dumps() -> bool {
        let limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: setrlimit only reads the struct passed by reference
        unsafe { libc::setrlimit(libc::RLIMIT_CORE, &limit) == 0 }
    }

    #[cfg(test)]
    pub fn core_limit() -> Option<libc::rlim_t> {
        let mut limit = libc::rlimit {
            rlim_cur: 1,
            rlim_max: 1,
        };
        // SAFETY: getrlimit writes into the struct passed by reference
        let rc = unsafe { libc::getrlimit(libc::RLIMIT_CORE, &mut limit) };
        (rc == 0).then_some(limit.rlim_cur)
    }
}

#[cfg(not(unix))]
mod platform {
    pub fn disable_core_dumps() -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_calls_report_first_outcome() {
        let first = disable_core_dumps();
        assert_eq!(disable_core_dumps(), first);
        assert_eq!(CORE_DUMPS_DISABLED.get(), Some(&first));
    }

    #[cfg(unix)]
    #[test]
    fn test_core_limit_is_zero_when_disabled() {
        if disable_core_dumps() {
            assert_eq!(platform::core_limit(), Some(0));
        }
    }
}
