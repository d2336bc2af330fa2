//! clone3(2) with `CLONE_INTO_CGROUP`
//!
//! The kernel creates the new process already attached to the target cgroup,
//! so there is no window in which it runs elsewhere. Requires Linux 5.7+ and
//! a cgroup v2 directory fd. There is deliberately no fork-then-move fallback.

use crate::config::types::{CgexecError, Result};
use nix::errno::Errno;
use nix::unistd::Pid;
use std::os::fd::{AsRawFd, BorrowedFd};

/// Place the child in the cgroup given by `CloneArgs::cgroup` (linux/sched.h).
pub const CLONE_INTO_CGROUP: u64 = 0x2_0000_0000;

/// `struct clone_args` as of CLONE_ARGS_SIZE_VER2 (88 bytes).
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct CloneArgs {
    pub flags: u64,
    pub pidfd: u64,
    pub child_tid: u64,
    pub parent_tid: u64,
    pub exit_signal: u64,
    pub stack: u64,
    pub stack_size: u64,
    pub tls: u64,
    pub set_tid: u64,
    pub set_tid_size: u64,
    pub cgroup: u64,
}

impl CloneArgs {
    /// fork-like clone born into `cgroup`, signalling `SIGCHLD` on exit.
    pub fn into_cgroup(cgroup: BorrowedFd<'_>) -> Self {
        Self {
            flags: CLONE_INTO_CGROUP,
            exit_signal: libc::SIGCHLD as u64,
            cgroup: cgroup.as_raw_fd() as u64,
            ..Self::default()
        }
    }
}

/// Which side of the clone the caller is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnContext {
    /// Inside the freshly created process
    NewProcess,
    /// In the original process; `child` is the new process
    Original { child: Pid },
}

/// Create a new process directly inside the cgroup referred to by `cgroup`.
///
/// Either the process exists already placed in the cgroup, or nothing was
/// created and the kernel error is returned.
///
/// # Safety
///
/// Same contract as `fork(2)`: on [`SpawnContext::NewProcess`] the caller may
/// only use async-signal-safe operations until it execs or `_exit`s.
pub unsafe fn clone_into_cgroup(cgroup: BorrowedFd<'_>) -> Result<SpawnContext> {
    let mut args = CloneArgs::into_cgroup(cgroup);

    let rc = libc::syscall(
        libc::SYS_clone3,
        &mut args as *mut CloneArgs,
        std::mem::size_of::<CloneArgs>(),
    );

    match rc {
        -1 => Err(CgexecError::Spawn(Errno::last())),
        0 => Ok(SpawnContext::NewProcess),
        pid => Ok(SpawnContext::Original {
            child: Pid::from_raw(pid as libc::pid_t),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsFd;

    #[test]
    fn test_clone_args_layout() {
        assert_eq!(std::mem::size_of::<CloneArgs>(), 88);
        assert_eq!(std::mem::align_of::<CloneArgs>(), 8);
    }

    #[test]
    fn test_into_cgroup_args() {
        let dir = std::fs::File::open("/").unwrap();
        let args = CloneArgs::into_cgroup(dir.as_fd());

        assert_eq!(args.flags, CLONE_INTO_CGROUP);
        assert_eq!(args.exit_signal, libc::SIGCHLD as u64);
        assert_eq!(args.cgroup, dir.as_raw_fd() as u64);
        assert_eq!(args.stack, 0);
        assert_eq!(args.pidfd, 0);
    }

    #[test]
    fn test_non_cgroup_directory_is_rejected() {
        // A plain directory is not a cgroup; nothing may be created.
        let dir = tempfile::tempdir().unwrap();
        let handle = std::fs::File::open(dir.path()).unwrap();

        match unsafe { clone_into_cgroup(handle.as_fd()) } {
            Err(CgexecError::Spawn(_)) => {}
            Ok(SpawnContext::NewProcess) => unsafe { libc::_exit(0) },
            other => panic!("expected spawn failure, got {:?}", other),
        }
    }
}
