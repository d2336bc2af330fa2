//! Supervising parent: relay signals, wait for the child, translate status.

use crate::config::types::{CgexecError, Result, RunOutcome};
use crate::kernel::signal::install_relay_handlers;
use nix::errno::Errno;
use nix::unistd::Pid;

/// How the child ended, as observed by `waitpid(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildTermination {
    /// Exited normally with this status
    Exited(i32),
    /// Killed by this signal number
    Signaled(i32),
}

impl ChildTermination {
    /// Decode a raw wait status. `None` for stop/continue notifications.
    ///
    /// Works on the raw integer so realtime signals are decoded too.
    pub fn from_raw_status(status: libc::c_int) -> Option<Self> {
        if libc::WIFEXITED(status) {
            Some(ChildTermination::Exited(libc::WEXITSTATUS(status)))
        } else if libc::WIFSIGNALED(status) {
            Some(ChildTermination::Signaled(libc::WTERMSIG(status)))
        } else {
            None
        }
    }

    /// Only a normal exit with status 0 counts as success.
    pub fn outcome(self) -> RunOutcome {
        match self {
            ChildTermination::Exited(0) => RunOutcome::Success,
            ChildTermination::Exited(_) | ChildTermination::Signaled(_) => RunOutcome::Failure,
        }
    }
}

/// Owns the rest of the parent's life once the child is running.
pub struct SignalRelaySupervisor {
    child: Pid,
}

impl SignalRelaySupervisor {
    /// The child must already be recorded in `SupervisorState`.
    pub fn new(child: Pid) -> Self {
        Self { child }
    }

    /// Install the relay, then block until the child terminates.
    pub fn supervise(self) -> Result<ChildTermination> {
        // The child is already running; it must still be waited for even if
        // the relay cannot be set up.
        if let Err(e) = install_relay_handlers() {
            log::error!("{}; signals will not reach child {}", e, self.child);
        }

        let termination = self.wait_for_exit()?;
        match termination {
            ChildTermination::Exited(code) => {
                log::info!("Child {} exited with status {}", self.child, code)
            }
            ChildTermination::Signaled(sig) => {
                log::info!("Child {} terminated by signal {}", self.child, sig)
            }
        }
        Ok(termination)
    }

    /// Blocking wait with no timeout; interrupted waits are resumed.
    fn wait_for_exit(&self) -> Result<ChildTermination> {
        loop {
            let mut status: libc::c_int = 0;
            // SAFETY: `status` is a valid out-pointer for the duration of the call.
            let rc = unsafe { libc::waitpid(self.child.as_raw(), &mut status, 0) };

            match Errno::result(rc) {
                Ok(_) => {
                    if let Some(termination) = ChildTermination::from_raw_status(status) {
                        return Ok(termination);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    return Err(CgexecError::Process(format!(
                        "waitpid({}) failed: {}",
                        self.child, e
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Linux wait status encoding
    fn exited(code: i32) -> libc::c_int {
        (code & 0xff) << 8
    }

    fn signaled(sig: i32) -> libc::c_int {
        sig & 0x7f
    }

    #[test]
    fn test_zero_exit_is_success() {
        let t = ChildTermination::from_raw_status(exited(0)).unwrap();
        assert_eq!(t, ChildTermination::Exited(0));
        assert_eq!(t.outcome(), RunOutcome::Success);
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        for code in [1, 2, 127, 255] {
            let t = ChildTermination::from_raw_status(exited(code)).unwrap();
            assert_eq!(t, ChildTermination::Exited(code));
            assert_eq!(t.outcome(), RunOutcome::Failure);
        }
    }

    #[test]
    fn test_signal_death_is_failure() {
        for sig in [libc::SIGTERM, libc::SIGKILL, libc::SIGRTMIN() + 2] {
            let t = ChildTermination::from_raw_status(signaled(sig)).unwrap();
            assert_eq!(t, ChildTermination::Signaled(sig));
            assert_eq!(t.outcome(), RunOutcome::Failure);
        }
    }

    #[test]
    fn test_stop_status_is_not_termination() {
        // WIFSTOPPED: low byte 0x7f, stop signal in the next byte
        let stopped = (libc::SIGSTOP << 8) | 0x7f;
        assert_eq!(ChildTermination::from_raw_status(stopped), None);
    }

    #[test]
    fn test_wait_on_unknown_child_fails() {
        let supervisor = SignalRelaySupervisor::new(Pid::from_raw(i32::MAX));
        assert!(matches!(
            supervisor.wait_for_exit(),
            Err(CgexecError::Process(_))
        ));
    }
}
