use crate::config::types::{CommandSpec, RunOutcome};
use crate::config::{CgexecConfig, DEFAULT_CGROUP_ROOT};
use crate::exec::{AtomicCgroupSpawner, SpawnOutcome};
use crate::kernel::cgroup::CgroupHandle;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run a command born directly inside a cgroup v2 group",
    long_about = None
)]
struct Cli {
    /// Mount point of the cgroup v2 hierarchy
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CGROUP_ROOT)]
    cgroup_root: PathBuf,
    /// Cgroup name, relative to the cgroup root; created if missing
    #[arg(value_name = "CGROUP")]
    cgroup: String,
    /// Command and arguments to execute
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

/// Parse arguments, run the command in its cgroup and report the outcome.
///
/// Missing arguments make clap print usage and exit with status 2 before
/// anything touches the filesystem.
pub fn run() -> Result<RunOutcome> {
    env_logger::init();

    let cli = Cli::parse();
    let command = CommandSpec::new(cli.command)?;
    let config = CgexecConfig::new(cli.cgroup_root, cli.cgroup, command)?;

    execute(&config)
}

/// Ensure and open the cgroup, spawn into it, supervise, release the handle.
pub fn execute(config: &CgexecConfig) -> Result<RunOutcome> {
    let path = config.cgroup_path();
    let target = CgroupHandle::prepare(&path)?;

    let spawned = AtomicCgroupSpawner::spawn_into(&target, &config.command);

    // Released on every outcome, after the child is gone.
    if let Err(e) = target.close() {
        log::warn!("Failed to close cgroup handle {}: {}", path.display(), e);
    }

    match spawned.context("supervising child")? {
        SpawnOutcome::SpawnFailed(e) => Err(e).with_context(|| {
            format!(
                "cannot start {} in cgroup {}",
                config.command.program(),
                path.display()
            )
        }),
        outcome => Ok(outcome.run_outcome()),
    }
}
