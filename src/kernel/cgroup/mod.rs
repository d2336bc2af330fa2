//! Cgroup placement targets
//!
//! Only cgroup v2 is supported: `CLONE_INTO_CGROUP` takes a directory fd on
//! the unified hierarchy.

pub mod v2;

// Re-export commonly used items
pub use v2::{CgroupCreation, CgroupHandle, CgroupTarget};
