//! Execution control
//!
//! Spawns the command inside its cgroup and supervises it until exit.

pub mod spawner;
pub mod supervisor;

pub use spawner::{AtomicCgroupSpawner, SpawnOutcome, LAUNCH_FAILURE_STATUS};
pub use supervisor::{ChildTermination, SignalRelaySupervisor};
