//! Async-safe signal relay for the supervising parent
//!
//! Every catchable signal except `SIGCHLD` is forwarded to the one child
//! recorded in [`SupervisorState`]. The handler only performs an atomic load,
//! a raw `write(2)` and `kill(2)`: no allocations, no locks, no `log`.

use crate::config::types::{CgexecError, Result};
use crate::utils::signal_safe::StderrLine;
use log::{debug, info};
use nix::errno::Errno;
use nix::unistd::Pid;
use std::sync::atomic::{AtomicI32, Ordering};

/// Pid of the supervised child; 0 while no child exists.
static CHILD_PID: AtomicI32 = AtomicI32::new(0);

/// Signals that are never intercepted: child notification, plus the two
/// that cannot be caught at all.
pub const EXCLUDED_SIGNALS: [libc::c_int; 3] = [libc::SIGCHLD, libc::SIGKILL, libc::SIGSTOP];

/// Process-wide record of the supervised child.
///
/// Written once by the main flow, read from signal context afterwards.
pub struct SupervisorState;

impl SupervisorState {
    /// Record the child pid. Fails if a child was already recorded.
    pub fn record_child(child: Pid) -> Result<()> {
        if child.as_raw() <= 0 {
            return Err(CgexecError::Process(format!(
                "refusing to record invalid child pid {}",
                child
            )));
        }

        CHILD_PID
            .compare_exchange(0, child.as_raw(), Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|existing| {
                CgexecError::Process(format!(
                    "child {} already recorded, cannot supervise {}",
                    existing, child
                ))
            })
    }

    /// Currently recorded child, if any.
    pub fn child() -> Option<Pid> {
        match CHILD_PID.load(Ordering::SeqCst) {
            pid if pid > 0 => Some(Pid::from_raw(pid)),
            _ => None,
        }
    }
}

/// Every signal number from 1 through `SIGRTMAX` minus [`EXCLUDED_SIGNALS`].
pub fn forwardable_signals() -> impl Iterator<Item = libc::c_int> {
    (1..=libc::SIGRTMAX()).filter(|sig| !EXCLUDED_SIGNALS.contains(sig))
}

/// Install the relay handler for all forwardable signals.
///
/// Signals the C library reserves for itself are rejected with `EINVAL`
/// and skipped. Returns the number of handlers installed.
pub fn install_relay_handlers() -> Result<usize> {
    let mut installed = 0;

    for sig in forwardable_signals() {
        // SAFETY: all-zero is a valid `sigaction`; the fields that matter are
        // set below before use.
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = relay_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART;

        // SAFETY: `action` is a valid, exclusively borrowed sigaction, and the
        // handler only calls async-signal-safe functions.
        let rc = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(sig, &action, std::ptr::null_mut())
        };

        if rc == 0 {
            installed += 1;
            continue;
        }

        match Errno::last() {
            Errno::EINVAL => debug!("Signal {} is reserved, not relaying it", sig),
            e => {
                return Err(CgexecError::Signal(format!(
                    "Failed to install relay handler for signal {}: {}",
                    sig, e
                )))
            }
        }
    }

    info!("Signal relay installed for {} signals", installed);
    Ok(installed)
}

/// Forward `sig` to the recorded child, if there is one.
extern "C" fn relay_signal(sig: libc::c_int) {
    // SAFETY: __errno_location returns this thread's errno slot.
    let saved_errno = unsafe { *libc::__errno_location() };

    let pid = CHILD_PID.load(Ordering::SeqCst);
    if pid > 0 {
        let mut line = StderrLine::new();
        line.push_str("cgexec: forwarding signal ")
            .push_int(i64::from(sig))
            .push_str(" to child ")
            .push_int(i64::from(pid))
            .push_str("\n");
        line.write_to_stderr();

        // SAFETY: kill(2) is async-signal-safe.
        unsafe {
            libc::kill(pid, sig);
        }
    }

    unsafe {
        *libc::__errno_location() = saved_errno;
    }
}
