//! Error types used by the reloadvisor runtime and its process primitives.
//!
//! This module defines two main error enums:
//!
//! - [`ProcessError`] — errors raised while spawning or terminating a child process group.
//! - [`RuntimeError`] — errors raised by the worker runtime itself.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging,
//! and [`ProcessError::is_retryable`] tells the run loop which failures it may absorb.

use std::path::PathBuf;
use thiserror::Error;

/// # Errors produced by the process primitives.
///
/// `InvalidArgument` is a programmer error, `Spawn` is transient and
/// retried by the run loop, `Termination` needs classification by the caller
/// (the process may already be gone).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Malformed spawn request (empty command or absent argument list).
    #[error("invalid spawn request: {reason}")]
    InvalidArgument {
        /// What was wrong with the request.
        reason: String,
    },

    /// The OS refused to start the process, or its output pipes could not be attached.
    #[error("failed to spawn `{command}`: {reason}")]
    Spawn {
        /// The command that was being spawned.
        command: String,
        /// The underlying failure.
        reason: String,
    },

    /// The termination signal could not be delivered to the process group.
    #[error("failed to terminate process group {pid}: {reason}")]
    Termination {
        /// Process (and process-group) identifier.
        pid: u32,
        /// The underlying failure.
        reason: String,
    },
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use reloadvisor::ProcessError;
    ///
    /// let err = ProcessError::InvalidArgument { reason: "empty command".into() };
    /// assert_eq!(err.as_label(), "process_invalid_argument");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::InvalidArgument { .. } => "process_invalid_argument",
            ProcessError::Spawn { .. } => "process_spawn_failed",
            ProcessError::Termination { .. } => "process_termination_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ProcessError::InvalidArgument { reason } => format!("invalid argument: {reason}"),
            ProcessError::Spawn { command, reason } => format!("spawn `{command}`: {reason}"),
            ProcessError::Termination { pid, reason } => format!("terminate pid={pid}: {reason}"),
        }
    }

    /// Indicates whether the run loop may retry after this error.
    ///
    /// Only [`ProcessError::Spawn`] is retryable.
    ///
    /// # Example
    /// ```
    /// use reloadvisor::ProcessError;
    ///
    /// let spawn = ProcessError::Spawn { command: "task".into(), reason: "EAGAIN".into() };
    /// assert!(spawn.is_retryable());
    ///
    /// let kill = ProcessError::Termination { pid: 42, reason: "EPERM".into() };
    /// assert!(!kill.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcessError::Spawn { .. })
    }
}

/// # Errors produced by the worker runtime.
///
/// `ToolNotFound` is returned from [`Worker::run`](crate::Worker::run) before any
/// process is started. `Termination` ends the run loop: the state of the child's
/// process group is unknown and the worker refuses to continue from it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The configured build tool is not on the search path.
    #[error("build tool `{program}` not found on PATH: {reason}")]
    ToolNotFound {
        /// Program name that was looked up.
        program: String,
        /// Lookup failure details.
        reason: String,
    },

    /// `run()` was called on a worker whose loop is already started.
    #[error("worker for {workdir:?} is already running")]
    AlreadyRunning {
        /// Working directory of the worker.
        workdir: PathBuf,
    },

    /// The executor rejected the command itself; retrying cannot help.
    #[error("generation {generation}: {source}")]
    InvalidSpawn {
        /// Generation that was being started.
        generation: u64,
        /// The executor failure.
        #[source]
        source: ProcessError,
    },

    /// A live process group could not be torn down; it may be leaked.
    #[error("generation {generation}: {source}; process group may be leaked")]
    Termination {
        /// Generation whose child could not be terminated.
        generation: u64,
        /// The terminator failure.
        #[source]
        source: ProcessError,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use reloadvisor::RuntimeError;
    ///
    /// let err = RuntimeError::ToolNotFound { program: "task".into(), reason: "missing".into() };
    /// assert_eq!(err.as_label(), "runtime_tool_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ToolNotFound { .. } => "runtime_tool_not_found",
            RuntimeError::AlreadyRunning { .. } => "runtime_already_running",
            RuntimeError::InvalidSpawn { .. } => "runtime_invalid_spawn",
            RuntimeError::Termination { .. } => "runtime_termination_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::ToolNotFound { program, reason } => {
                format!("tool `{program}` not found: {reason}")
            }
            RuntimeError::AlreadyRunning { workdir } => {
                format!("already running in {}", workdir.display())
            }
            RuntimeError::InvalidSpawn { generation, source }
            | RuntimeError::Termination { generation, source } => {
                format!("generation={generation} {}", source.as_message())
            }
        }
    }

    /// Returns `true` for errors that must end the supervising program.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RuntimeError::ToolNotFound { .. } | RuntimeError::Termination { .. }
        )
    }
}
