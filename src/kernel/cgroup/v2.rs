//! Cgroup v2 directory handling
//!
//! Makes sure the target cgroup directory exists and opens it as a
//! placement target for clone3.

use crate::config::types::{CgexecError, Result};
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::ErrorKind;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

/// Permissions for newly created cgroup directories
const CGROUP_DIR_MODE: u32 = 0o755;

/// How `ensure` found or produced the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupCreation {
    /// Directory was already there
    AlreadyPresent,
    /// This call created it
    Created,
    /// Another process created it between our check and our mkdir
    CreatedConcurrently,
}

/// Resolves and opens cgroup directories
pub struct CgroupHandle;

impl CgroupHandle {
    /// Make sure `path` exists, creating it with mode 0755 if absent.
    ///
    /// Losing a creation race to a cooperating process is success.
    pub fn ensure(path: &Path) -> Result<CgroupCreation> {
        // A non-directory at `path` is reported by `open`.
        if fs::metadata(path).is_ok() {
            return Ok(CgroupCreation::AlreadyPresent);
        }

        match DirBuilder::new().mode(CGROUP_DIR_MODE).create(path) {
            Ok(()) => {
                log::info!("Created cgroup {}", path.display());
                Ok(CgroupCreation::Created)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::warn!(
                    "cgroup {} was just created by another process, concurrently",
                    path.display()
                );
                Ok(CgroupCreation::CreatedConcurrently)
            }
            Err(source) => Err(CgexecError::CgroupCreate {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Open `path` read-only as a directory.
    pub fn open(path: &Path) -> Result<CgroupTarget> {
        let dir = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_DIRECTORY)
            .open(path)
            .map_err(|source| CgexecError::CgroupOpen {
                path: path.to_path_buf(),
                source,
            })?;

        log::debug!("Opened cgroup {} as fd {}", path.display(), dir.as_raw_fd());

        Ok(CgroupTarget {
            fd: OwnedFd::from(dir),
            path: path.to_path_buf(),
        })
    }

    /// `ensure` followed by `open`.
    pub fn prepare(path: &Path) -> Result<CgroupTarget> {
        Self::ensure(path)?;
        Self::open(path)
    }
}

/// Open directory fd of a cgroup, owned exclusively by this process.
///
/// The fd is close-on-exec. It is released exactly once: by `close`, or by
/// drop on early-return paths.
#[derive(Debug)]
pub struct CgroupTarget {
    fd: OwnedFd,
    path: PathBuf,
}

impl CgroupTarget {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the handle, reporting any error from `close(2)`.
    pub fn close(self) -> Result<()> {
        let raw = self.fd.into_raw_fd();
        nix::unistd::close(raw).map_err(|e| CgexecError::Io(e.into()))
    }
}

impl AsFd for CgroupTarget {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}
