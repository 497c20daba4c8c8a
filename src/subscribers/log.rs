//! # LogWriter: status events as `tracing` records
//!
//! Renders every [`Event`] through `tracing` with structured fields, so the
//! host application decides formatting (colors, JSON, filtering) by installing
//! its own subscriber.
//!
//! ## Example output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO reloadvisor: hot reload running command="task" args=["dev"]
//! INFO reloadvisor: running process generation=1 pid=4242 command="task" args=["dev"]
//! INFO reloadvisor: reload requested generation=1
//! INFO reloadvisor: killing process group generation=1 pid=4242
//! INFO reloadvisor: process group killed generation=1 pid=4242
//! WARN reloadvisor: spawn failed, retrying generation=2 attempt=1 delay_ms=500 err="..."
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "reloadvisor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or_default();
        match e.kind {
            EventKind::WorkerStarted => {
                info!(target: TARGET, command = ?e.command, args = ?e.args, "hot reload running");
            }
            EventKind::ProcessSpawned => {
                info!(
                    target: TARGET,
                    generation = ?e.generation,
                    pid = ?e.pid,
                    command = ?e.command,
                    args = ?e.args,
                    "running process"
                );
            }
            EventKind::SpawnFailed => {
                warn!(
                    target: TARGET,
                    generation = ?e.generation,
                    attempt = ?e.attempt,
                    delay_ms = ?e.delay_ms,
                    err = reason,
                    "spawn failed, retrying"
                );
            }
            EventKind::ProcessExited => {
                info!(
                    target: TARGET,
                    generation = ?e.generation,
                    pid = ?e.pid,
                    code = ?e.exit_code,
                    status = reason,
                    "process exited"
                );
            }
            EventKind::ReloadRequested => {
                info!(target: TARGET, generation = ?e.generation, "reload requested");
            }
            EventKind::TerminationStarted => {
                info!(target: TARGET, generation = ?e.generation, pid = ?e.pid, "killing process group");
            }
            EventKind::TerminationCompleted => {
                info!(
                    target: TARGET,
                    generation = ?e.generation,
                    pid = ?e.pid,
                    note = reason,
                    "process group killed"
                );
            }
            EventKind::TerminationFailed => {
                error!(
                    target: TARGET,
                    generation = ?e.generation,
                    pid = ?e.pid,
                    err = reason,
                    "process group could not be killed"
                );
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, "shutdown requested");
            }
            EventKind::WorkerStopped => {
                info!(target: TARGET, generation = ?e.generation, reason, "hot reload stopped");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
