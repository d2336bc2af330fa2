//! Invocation configuration
//!
//! Resolves a cgroup name against the cgroup v2 mount point and carries the
//! command to launch.

pub mod types;

use self::types::{CgexecError, CommandSpec, Result};
use std::path::{Component, Path, PathBuf};

/// Default cgroup v2 mount point.
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Everything one `cgexec` invocation needs.
#[derive(Debug, Clone)]
pub struct CgexecConfig {
    pub cgroup_root: PathBuf,
    pub cgroup_name: String,
    pub command: CommandSpec,
}

impl CgexecConfig {
    /// Validate the cgroup name and build the config.
    ///
    /// No filesystem access happens here.
    pub fn new(
        cgroup_root: impl Into<PathBuf>,
        cgroup_name: impl Into<String>,
        command: CommandSpec,
    ) -> Result<Self> {
        let cgroup_name = cgroup_name.into();
        validate_cgroup_name(&cgroup_name)?;

        Ok(Self {
            cgroup_root: cgroup_root.into(),
            cgroup_name,
            command,
        })
    }

    /// Absolute path of the target cgroup directory.
    pub fn cgroup_path(&self) -> PathBuf {
        self.cgroup_root.join(&self.cgroup_name)
    }
}

/// Cgroup names are relative paths below the root; no `..`, `.` or
/// absolute components.
fn validate_cgroup_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CgexecError::Usage("cgroup name must not be empty".to_string()));
    }

    let path = Path::new(name);
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(CgexecError::Usage(format!(
                    "cgroup name must be a relative path below the cgroup root: {}",
                    name
                )))
            }
        }
    }

    Ok(())
}
