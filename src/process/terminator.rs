//! # Process-group terminator.
//!
//! [`GroupTerminator`] sends `SIGKILL` to the whole process group led by the child
//! (`killpg(pid)`, i.e. `kill(-pid)`), then waits for the leader to be reaped.
//! Targets without process groups fall back to killing the leader only.
//!
//! ## Rules
//! - The signal is forceful; there is no graceful phase.
//! - A delivery failure is reported as [`ProcessError::Termination`]; deciding
//!   whether it is harmless (process already gone) is the caller's job.

use async_trait::async_trait;

use crate::error::ProcessError;
use crate::process::ChildProcess;

/// Capability to terminate a child and all its descendants.
#[async_trait]
pub trait Terminate: Send + Sync + 'static {
    /// Kills the process group of `child`, reaps the leader and returns its pid.
    async fn terminate(&self, child: &mut ChildProcess) -> Result<u32, ProcessError>;
}

/// `SIGKILL`-the-group terminator.
#[derive(Clone, Copy, Debug, Default)]
pub struct GroupTerminator;

#[async_trait]
impl Terminate for GroupTerminator {
    async fn terminate(&self, child: &mut ChildProcess) -> Result<u32, ProcessError> {
        let pid = child.pid();
        signal_group(child)?;
        child
            .wait()
            .await
            .map_err(|e| ProcessError::Termination {
                pid,
                reason: format!("reap failed: {e}"),
            })?;
        Ok(pid)
    }
}

#[cfg(unix)]
fn signal_group(child: &mut ChildProcess) -> Result<(), ProcessError> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pid = child.pid();
    let pgid = i32::try_from(pid).map_err(|_| ProcessError::Termination {
        pid,
        reason: "pid does not fit a process group id".to_string(),
    })?;
    killpg(Pid::from_raw(pgid), Signal::SIGKILL).map_err(|errno| ProcessError::Termination {
        pid,
        reason: errno.desc().to_string(),
    })
}

#[cfg(not(unix))]
fn signal_group(child: &mut ChildProcess) -> Result<(), ProcessError> {
    let pid = child.pid();
    child.start_kill().map_err(|e| ProcessError::Termination {
        pid,
        reason: e.to_string(),
    })
}
