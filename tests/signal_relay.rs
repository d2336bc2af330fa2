//! Signal relay integration test
//!
//! Lives in its own test binary: the supervisor state is process-wide and
//! write-once, and the relay handlers stay installed for the whole process.

use cgexec::kernel::signal::{install_relay_handlers, SupervisorState};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::Command;

#[test]
fn test_relay_forwards_to_recorded_child_only() {
    let mut child = Command::new("sleep").arg("30").spawn().expect("Failed to spawn sleep");
    let mut bystander = Command::new("sleep")
        .arg("30")
        .spawn()
        .expect("Failed to spawn bystander");

    assert_eq!(SupervisorState::child(), None);

    let pid = Pid::from_raw(child.id() as i32);
    SupervisorState::record_child(pid).unwrap();
    assert_eq!(SupervisorState::child(), Some(pid));

    // Write-once: a second child cannot replace the first.
    let other = Pid::from_raw(bystander.id() as i32);
    assert!(SupervisorState::record_child(other).is_err());
    assert_eq!(SupervisorState::child(), Some(pid));

    let installed = install_relay_handlers().unwrap();
    assert!(installed >= 28, "only {} handlers installed", installed);

    // SIGUSR1 would terminate this test process if it were not relayed.
    let rc = unsafe { libc::raise(libc::SIGUSR1) };
    assert_eq!(rc, 0);

    let status = child.wait().unwrap();
    assert_eq!(status.signal(), Some(libc::SIGUSR1));

    assert!(
        bystander.try_wait().unwrap().is_none(),
        "bystander must not receive the relayed signal"
    );
    bystander.kill().unwrap();
    bystander.wait().unwrap();
}
