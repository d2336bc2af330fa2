//! cgexec: run a command born directly inside a cgroup v2 group
//!
//! The child is created with `clone3(CLONE_INTO_CGROUP)`, so it never runs
//! outside the target cgroup, not even briefly. The parent then acts as a
//! transparent wrapper: it relays signals to the child, waits for it, and
//! exits 0 only if the child exited 0.
//!
//! # Architecture
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::cgroup`]: Cgroup directory creation and placement handles
//! - [`kernel::clone`]: clone3 with `CLONE_INTO_CGROUP`
//! - [`kernel::signal`]: Supervisor state and the async-safe signal relay
//!
//! ## Execution Control ([`exec`])
//! - [`exec::spawner`]: Atomic spawn-into-cgroup and the exec side of the clone
//! - [`exec::supervisor`]: Wait for the child and translate its status
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: Command spec, outcomes and the error type
//!
//! ## Utilities ([`utils`])
//! - [`utils::signal_safe`]: Allocation-free stderr diagnostics

#[cfg(not(target_os = "linux"))]
compile_error!("cgexec requires Linux (clone3 with CLONE_INTO_CGROUP)");

// Kernel Primitives
pub mod kernel;

// Execution Control
pub mod exec;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the cgexec binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::*;
pub use config::{CgexecConfig, DEFAULT_CGROUP_ROOT};
