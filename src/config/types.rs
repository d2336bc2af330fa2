//! Shared type definitions and the crate error type.

use nix::errno::Errno;
use std::ffi::{CStr, CString};
use std::path::PathBuf;
use thiserror::Error;

/// Executable plus arguments, with the C argv prepared up front.
///
/// The `CString`s are built at construction time so the new process never
/// has to allocate between clone3 and exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    args: Vec<String>,
    cargs: Vec<CString>,
}

impl CommandSpec {
    /// Build a command from its executable and arguments.
    ///
    /// Fails on an empty vector or an element with an interior NUL byte.
    pub fn new(args: Vec<String>) -> Result<Self> {
        if args.is_empty() {
            return Err(CgexecError::Usage("command must name an executable".to_string()));
        }

        let mut cargs = Vec::with_capacity(args.len());
        for arg in &args {
            let c = CString::new(arg.as_str()).map_err(|_| {
                CgexecError::Usage(format!("command argument contains NUL byte: {:?}", arg))
            })?;
            cargs.push(c);
        }

        Ok(Self { args, cargs })
    }

    /// Executable name or path, resolved through `PATH` at exec time.
    pub fn program(&self) -> &str {
        &self.args[0]
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn program_cstr(&self) -> &CStr {
        self.cargs[0].as_c_str()
    }

    /// NULL-terminated pointer vector suitable for `execvp(3)`.
    ///
    /// The pointers borrow from `self` and stay valid while it lives.
    pub(crate) fn argv_ptrs(&self) -> Vec<*const libc::c_char> {
        self.cargs
            .iter()
            .map(|c| c.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect()
    }
}

/// Final success/failure of one invocation.
///
/// Only success vs. failure is reported; the child's exact exit code or
/// terminating signal is not propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure,
}

impl RunOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Success => libc::EXIT_SUCCESS,
            RunOutcome::Failure => libc::EXIT_FAILURE,
        }
    }
}

/// Custom error types for cgexec
#[derive(Error, Debug)]
pub enum CgexecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Failed to create cgroup directory {}: {source}", .path.display())]
    CgroupCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open cgroup directory {}: {source}", .path.display())]
    CgroupOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("clone3 into cgroup failed: {0}")]
    Spawn(Errno),

    #[error("Signal error: {0}")]
    Signal(String),

    #[error("Process error: {0}")]
    Process(String),
}

/// Result type alias for cgexec operations
pub type Result<T> = std::result::Result<T, CgexecError>;
