//! # Worker configuration.
//!
//! Provides [`Config`], the centralized settings for one worker.
//!
//! ## Sentinel values
//! - `drain_timeout = 0s` → wait for output streams to close without limit
//! - `subcommand = ""` → no subcommand token is appended

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Default build tool resolved on `PATH`.
pub const DEFAULT_PROGRAM: &str = "task";
/// Default subcommand token appended to every invocation.
pub const DEFAULT_SUBCOMMAND: &str = "dev";

/// Configuration for a [`Worker`](crate::Worker).
///
/// ## Field semantics
/// - `program`: build tool, checked on `PATH` by `run()`
/// - `subcommand`: token appended after the base args
/// - `shell`: shell used by the default executor (`shell -c`)
/// - `debounce`: pause between a natural exit and the next spawn
/// - `spawn_backoff`: delays between failed spawn attempts
/// - `drain_timeout`: how long output forwarding may outlive the child (`0s` = forever)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `exit_on_fatal` / `fatal_exit_code`: what a failed teardown does to the program
#[derive(Clone, Debug)]
pub struct Config {
    /// Build tool to run.
    pub program: String,

    /// Subcommand token appended after the base arguments.
    pub subcommand: String,

    /// Shell used to run the command.
    pub shell: String,

    /// Pause between a natural child exit and the next spawn.
    pub debounce: Duration,

    /// Delay policy for spawn retries.
    pub spawn_backoff: BackoffPolicy,

    /// Maximum wait for a generation's output streams to close after the child is gone.
    ///
    /// A descendant that inherited the pipes can keep them open; forwarding is
    /// aborted after this timeout so the next generation can start.
    pub drain_timeout: Duration,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,

    /// Exit the whole program when a live process group cannot be torn down.
    ///
    /// When `false`, the run loop ends with [`RuntimeError::Termination`](crate::RuntimeError)
    /// and the decision is left to the caller of [`Worker::wait`](crate::Worker::wait).
    pub exit_on_fatal: bool,

    /// Exit status used when `exit_on_fatal` fires.
    pub fatal_exit_code: i32,
}

impl Config {
    /// Arguments for one spawn: base args followed by the subcommand.
    pub fn spawn_args(&self, base: &[String]) -> Vec<String> {
        let mut args = base.to_vec();
        if !self.subcommand.is_empty() {
            args.push(self.subcommand.clone());
        }
        args
    }

    /// Returns the drain timeout as an `Option` (`None` = no limit).
    #[inline]
    pub fn drain_limit(&self) -> Option<Duration> {
        if self.drain_timeout == Duration::ZERO {
            None
        } else {
            Some(self.drain_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `program = "task"`, `subcommand = "dev"`, `shell = "/bin/sh"`
    /// - `debounce = 500ms`
    /// - `spawn_backoff = BackoffPolicy::default()` (constant 500ms)
    /// - `drain_timeout = 2s`
    /// - `bus_capacity = 1024`
    /// - `exit_on_fatal = true`, `fatal_exit_code = 1`
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            subcommand: DEFAULT_SUBCOMMAND.to_string(),
            shell: crate::process::DEFAULT_SHELL.to_string(),
            debounce: Duration::from_millis(500),
            spawn_backoff: BackoffPolicy::default(),
            drain_timeout: Duration::from_secs(2),
            bus_capacity: 1024,
            exit_on_fatal: true,
            fatal_exit_code: 1,
        }
    }
}
