//! # Command executor.
//!
//! [`ShellExecutor`] runs a command through a shell in a fresh process group so the
//! group, not only the leader, can be torn down later.
//!
//! The command string is the shell script prefix; arguments are passed as
//! positional parameters and expanded with `"$@"`, so they reach the command
//! without being re-parsed by the shell:
//!
//! ```text
//! /bin/sh -c 'task "$@"' task --dir web dev
//!             └──┬───┘   └┬─┘ └─────┬────┘
//!              script     $0     $1..$n
//! ```

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::ProcessError;
use crate::process::ChildProcess;

/// Default shell used to run commands.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Starts one command as the leader of a new process group.
///
/// ### Contract
/// - empty `command` or absent `args` → [`ProcessError::InvalidArgument`], nothing spawned
/// - OS spawn failure or missing output pipe → [`ProcessError::Spawn`]
/// - on success the process is already running; the caller must reap it
pub trait Spawn: Send + Sync + 'static {
    /// Spawns `command` with `args` in `workdir`.
    fn spawn(
        &self,
        command: &str,
        args: Option<&[String]>,
        workdir: &Path,
    ) -> Result<ChildProcess, ProcessError>;
}

/// Shell-backed [`Spawn`] implementation.
#[derive(Clone, Debug)]
pub struct ShellExecutor {
    shell: PathBuf,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl ShellExecutor {
    /// Creates an executor that runs commands through `shell -c`.
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    fn command(&self, command: &str, args: &[String], workdir: &Path) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(format!("{command} \"$@\""))
            .arg(command)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

impl Spawn for ShellExecutor {
    fn spawn(
        &self,
        command: &str,
        args: Option<&[String]>,
        workdir: &Path,
    ) -> Result<ChildProcess, ProcessError> {
        if command.trim().is_empty() {
            return Err(ProcessError::InvalidArgument {
                reason: "no command to execute".to_string(),
            });
        }
        let args = args.ok_or_else(|| ProcessError::InvalidArgument {
            reason: format!("argument list for `{command}` is absent"),
        })?;

        let spawn_err = |reason: String| ProcessError::Spawn {
            command: command.to_string(),
            reason,
        };

        let mut child = self
            .command(command, args, workdir)
            .spawn()
            .map_err(|e| spawn_err(e.to_string()))?;

        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        match (pid, stdout, stderr) {
            (Some(pid), Some(stdout), Some(stderr)) => Ok(ChildProcess::new(
                child,
                pid,
                command,
                args.to_vec(),
                stdout,
                stderr,
            )),
            _ => {
                // Dropping `child` lets the runtime reap the killed leader.
                let _ = child.start_kill();
                Err(spawn_err("output streams could not be attached".to_string()))
            }
        }
    }
}
