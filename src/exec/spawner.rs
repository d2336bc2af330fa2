//! Atomic spawn-into-cgroup
//!
//! One clone3 call produces two continuations: the new process execs the
//! command, the original process records the child and supervises it.

use crate::config::types::{CgexecError, CommandSpec, Result, RunOutcome};
use crate::exec::supervisor::{ChildTermination, SignalRelaySupervisor};
use crate::kernel::cgroup::CgroupTarget;
use crate::kernel::clone::{clone_into_cgroup, SpawnContext};
use crate::kernel::signal::SupervisorState;
use crate::utils::signal_safe::StderrLine;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use std::os::fd::AsFd;

/// Exit status of the new process when exec fails.
///
/// Distinct from the generic failure code so a launch failure is never
/// confused with the program's own exit.
pub const LAUNCH_FAILURE_STATUS: libc::c_int = 127;

/// Result of one spawn-and-supervise cycle.
#[derive(Debug)]
pub enum SpawnOutcome {
    /// Child ran and exited with status 0
    ChildSucceeded,
    /// Child exited nonzero, was killed, or could not exec
    ChildFailed(ChildTermination),
    /// clone3 itself failed; no child exists
    SpawnFailed(CgexecError),
}

impl SpawnOutcome {
    pub fn run_outcome(&self) -> RunOutcome {
        match self {
            SpawnOutcome::ChildSucceeded => RunOutcome::Success,
            SpawnOutcome::ChildFailed(_) | SpawnOutcome::SpawnFailed(_) => RunOutcome::Failure,
        }
    }
}

pub struct AtomicCgroupSpawner;

impl AtomicCgroupSpawner {
    /// Launch `command` born inside `target` and supervise it until it exits.
    ///
    /// `Err` is only returned for supervision failures in the parent; spawn
    /// failures are reported as [`SpawnOutcome::SpawnFailed`].
    pub fn spawn_into(target: &CgroupTarget, command: &CommandSpec) -> Result<SpawnOutcome> {
        // Built before clone3: the new process must not allocate.
        let argv = command.argv_ptrs();

        log::info!(
            "Spawning {:?} into cgroup {}",
            command.args(),
            target.path().display()
        );

        // SAFETY: the NewProcess branch only calls exec_in_new_process, which
        // restricts itself to async-signal-safe operations.
        let context = match unsafe { clone_into_cgroup(target.as_fd()) } {
            Ok(context) => context,
            Err(e) => {
                log::error!("{} (cgroup {})", e, target.path().display());
                return Ok(SpawnOutcome::SpawnFailed(e));
            }
        };

        match context {
            SpawnContext::NewProcess => exec_in_new_process(command, &argv),
            SpawnContext::Original { child } => supervise_child(child),
        }
    }
}

fn supervise_child(child: Pid) -> Result<SpawnOutcome> {
    log::debug!("Child {} created", child);

    if let Err(e) = SupervisorState::record_child(child) {
        // Without a recorded pid the relay would target the wrong process.
        let _ = kill(child, Signal::SIGKILL);
        let _ = waitpid(child, None);
        return Err(e);
    }

    let termination = SignalRelaySupervisor::new(child).supervise()?;
    Ok(match termination.outcome() {
        RunOutcome::Success => SpawnOutcome::ChildSucceeded,
        RunOutcome::Failure => SpawnOutcome::ChildFailed(termination),
    })
}

/// Replace the new process image; on failure `_exit` without running any
/// of the parent's exit paths.
fn exec_in_new_process(command: &CommandSpec, argv: &[*const libc::c_char]) -> ! {
    // SAFETY: signal(2) is async-signal-safe. The Rust runtime ignores
    // SIGPIPE and an ignored disposition survives exec. argv is
    // NULL-terminated and its strings are owned by `command`, which outlives
    // this call.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        libc::execvp(command.program_cstr().as_ptr(), argv.as_ptr());
    }

    let errno = nix::errno::Errno::last() as i32;
    let mut line = StderrLine::new();
    line.push_str("cgexec: exec of ")
        .push_str(command.program())
        .push_str(" failed (errno ")
        .push_int(i64::from(errno))
        .push_str(")\n");
    line.write_to_stderr();

    // SAFETY: _exit(2) is async-signal-safe and skips atexit handlers and
    // stdio flushing inherited from the parent.
    unsafe { libc::_exit(LAUNCH_FAILURE_STATUS) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::cgroup::CgroupHandle;
    use std::fs::File;
    use std::io::Read;
    use std::os::fd::FromRawFd;

    fn command(args: &[&str]) -> CommandSpec {
        CommandSpec::new(args.iter().map(|a| a.to_string()).collect()).unwrap()
    }

    /// Run the exec side of a spawn in a plain fork, without any cgroup.
    /// Returns how the new process ended and what it wrote to stderr.
    fn exec_in_forked_child(command: &CommandSpec) -> (ChildTermination, String) {
        let argv = command.argv_ptrs();
        let mut fds = [0 as libc::c_int; 2];
        assert_eq!(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) }, 0);

        let pid = unsafe { libc::fork() };
        assert!(pid >= 0, "fork failed: {}", nix::errno::Errno::last());
        if pid == 0 {
            // New process: only async-signal-safe calls until exec or _exit.
            unsafe {
                libc::dup2(fds[1], libc::STDERR_FILENO);
                libc::close(fds[0]);
            }
            exec_in_new_process(command, &argv);
        }

        unsafe { libc::close(fds[1]) };
        let mut stderr = String::new();
        let mut reader = unsafe { File::from_raw_fd(fds[0]) };
        reader.read_to_string(&mut stderr).unwrap();

        let mut status: libc::c_int = 0;
        assert_eq!(unsafe { libc::waitpid(pid, &mut status, 0) }, pid);
        let termination = ChildTermination::from_raw_status(status).unwrap();
        (termination, stderr)
    }

    #[test]
    fn test_missing_executable_exits_with_launch_failure_status() {
        let missing = "/nonexistent/cgexec-no-such-binary";
        let (termination, stderr) = exec_in_forked_child(&command(&[missing]));

        assert_eq!(termination, ChildTermination::Exited(LAUNCH_FAILURE_STATUS));
        assert_eq!(
            stderr,
            format!("cgexec: exec of {} failed (errno {})\n", missing, libc::ENOENT)
        );
    }

    #[test]
    fn test_new_process_starts_with_default_sigpipe() {
        let (termination, stderr) =
            exec_in_forked_child(&command(&["sh", "-c", "kill -PIPE $$; exit 0"]));

        assert_eq!(termination, ChildTermination::Signaled(libc::SIGPIPE), "{}", stderr);
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(SpawnOutcome::ChildSucceeded.run_outcome(), RunOutcome::Success);
        assert_eq!(
            SpawnOutcome::ChildFailed(ChildTermination::Exited(1)).run_outcome(),
            RunOutcome::Failure
        );
        assert_eq!(
            SpawnOutcome::ChildFailed(ChildTermination::Exited(LAUNCH_FAILURE_STATUS))
                .run_outcome(),
            RunOutcome::Failure
        );
        assert_eq!(
            SpawnOutcome::SpawnFailed(CgexecError::Spawn(nix::errno::Errno::EBADF)).run_outcome(),
            RunOutcome::Failure
        );
    }

    #[test]
    fn test_spawn_into_plain_directory_fails_without_child() {
        let root = tempfile::tempdir().unwrap();
        let marker = root.path().join("ran");
        let target = CgroupHandle::prepare(&root.path().join("not-a-cgroup")).unwrap();
        let command = CommandSpec::new(vec![
            "touch".to_string(),
            marker.to_string_lossy().into_owned(),
        ])
        .unwrap();

        let outcome = AtomicCgroupSpawner::spawn_into(&target, &command).unwrap();
        assert!(matches!(outcome, SpawnOutcome::SpawnFailed(CgexecError::Spawn(_))));
        assert!(SupervisorState::child().is_none());
        assert!(!marker.exists());
        target.close().unwrap();
    }
}
