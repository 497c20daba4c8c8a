//! # Handle to one spawned child process.
//!
//! [`ChildProcess`] owns a [`tokio::process::Child`] that leads its own process
//! group, plus the piped stdout/stderr streams. The pid is captured at spawn time
//! because `Child::id` returns `None` once the process has been reaped.

use std::io;
use std::process::ExitStatus;

use tokio::process::{Child, ChildStderr, ChildStdout};

/// One generation's child process.
///
/// Streams are handed out once through [`take_stdout`](Self::take_stdout) and
/// [`take_stderr`](Self::take_stderr); they close when the process group exits.
#[derive(Debug)]
pub struct ChildProcess {
    pid: u32,
    command: String,
    args: Vec<String>,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl ChildProcess {
    pub(crate) fn new(
        child: Child,
        pid: u32,
        command: impl Into<String>,
        args: Vec<String>,
        stdout: ChildStdout,
        stderr: ChildStderr,
    ) -> Self {
        Self {
            pid,
            command: command.into(),
            args,
            child,
            stdout: Some(stdout),
            stderr: Some(stderr),
        }
    }

    /// OS process identifier, also the process-group identifier.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Command the process was started with.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Arguments passed to the command.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Takes the stdout stream (once).
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Takes the stderr stream (once).
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Waits for the process to exit and reaps it.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Returns `true` if the process is known to have exited.
    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    /// Sends a kill signal to the leader process only (not its group).
    pub fn start_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }
}
