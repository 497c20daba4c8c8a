//! # WorkerLoop: the supervising control loop.
//!
//! Owns the current child and drives the state machine for one worker:
//! spawn a generation, supervise it, tear it down on reload, respawn.
//!
//! ## Architecture
//! ```text
//! Worker::run() ──► tokio::spawn(WorkerLoop::run())
//!
//! loop {
//!   ├─► Starting: spawner.spawn(program, base args + subcommand)
//!   │       ├─ Err(Spawn)           ──► publish SpawnFailed, sleep(backoff) (cancellable), retry
//!   │       └─ Err(InvalidArgument) ──► publish SpawnFailed, break with InvalidSpawn
//!   ├─► generation += 1, publish ProcessSpawned
//!   ├─► run_generation(child, generation, seen)
//!   │       ├─ Exited            ─► sleep(debounce) (cancellable), continue
//!   │       ├─ Reloaded{epoch}   ─► seen = epoch, continue (no debounce)
//!   │       ├─ Shutdown          ─► break
//!   │       └─ Err(Termination)  ─► break with error (fatal)
//! }
//! publish WorkerStopped
//! ```
//!
//! ## Rules
//! - Generations run **sequentially**: the next spawn happens only after the
//!   previous child is reaped and its output forwarding has finished.
//! - The generation counter **increments on each successful spawn**.
//! - Retryable spawn failures are retried without limit; only shutdown ends the retries.
//!   A rejected command (`InvalidArgument`) ends the loop with `InvalidSpawn`.

use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::{select, time};

use crate::{
    core::{
        config::Config,
        output::Output,
        runner::{Outcome, run_generation},
        state::{Shared, WorkerState},
    },
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    process::{ChildProcess, Spawn, Terminate},
};

/// Everything the run loop needs, moved into its task.
pub(crate) struct WorkerLoop {
    pub(crate) cfg: Config,
    pub(crate) workdir: PathBuf,
    pub(crate) args: Vec<String>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) bus: Bus,
    pub(crate) spawner: Arc<dyn Spawn>,
    pub(crate) terminator: Arc<dyn Terminate>,
    pub(crate) output: Output,
}

impl WorkerLoop {
    /// Runs generations until shutdown, a rejected command or a fatal teardown failure.
    pub(crate) async fn run(self) -> Result<(), RuntimeError> {
        let spawn_args = self.cfg.spawn_args(&self.args);
        self.bus.publish(
            Event::new(EventKind::WorkerStarted).with_command(&self.cfg.program, &spawn_args),
        );

        // Epoch 0: a reload requested before the first spawn still counts.
        let mut seen: u64 = 0;
        let res = loop {
            let mut child = match self.start(&spawn_args).await {
                Ok(Some(child)) => child,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };
            let generation = self.shared.next_generation();
            self.bus.publish(
                Event::new(EventKind::ProcessSpawned)
                    .with_generation(generation)
                    .with_pid(child.pid())
                    .with_command(child.command(), child.args()),
            );

            match run_generation(&self, &mut child, generation, seen).await {
                Ok(Outcome::Exited) => {
                    self.shared.set_state(WorkerState::Starting);
                    if !self.pause(self.cfg.debounce).await {
                        break Ok(());
                    }
                }
                Ok(Outcome::Reloaded { epoch }) => seen = epoch,
                Ok(Outcome::Shutdown) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.shared.set_state(WorkerState::Stopped);
        let mut ev = Event::new(EventKind::WorkerStopped).with_generation(self.shared.generation());
        if let Err(e) = &res {
            ev = ev.with_reason(e.to_string());
        }
        self.bus.publish(ev);
        res
    }

    /// `Starting`: spawns the next child, retrying retryable failures with backoff.
    ///
    /// Returns `Ok(None)` if shutdown was requested first, and
    /// [`RuntimeError::InvalidSpawn`] if the executor rejected the command.
    async fn start(&self, spawn_args: &[String]) -> Result<Option<ChildProcess>, RuntimeError> {
        let mut failures: u32 = 0;
        loop {
            if self.shared.shutdown.is_cancelled() {
                return Ok(None);
            }
            self.shared.set_state(WorkerState::Starting);

            let err = match self
                .spawner
                .spawn(&self.cfg.program, Some(spawn_args), &self.workdir)
            {
                Ok(child) => return Ok(Some(child)),
                Err(err) => err,
            };

            let generation = self.shared.generation() + 1;
            failures = failures.saturating_add(1);
            let failed = Event::new(EventKind::SpawnFailed)
                .with_generation(generation)
                .with_command(&self.cfg.program, spawn_args)
                .with_attempt(failures)
                .with_reason(err.to_string());

            if !err.is_retryable() {
                self.bus.publish(failed);
                return Err(RuntimeError::InvalidSpawn {
                    generation,
                    source: err,
                });
            }

            let delay = self.cfg.spawn_backoff.next(failures - 1);
            self.bus.publish(failed.with_delay(delay));
            if !self.pause(delay).await {
                return Ok(None);
            }
        }
    }

    /// Sleeps for `d`; returns `false` if shutdown interrupted the sleep.
    async fn pause(&self, d: Duration) -> bool {
        let sleep = time::sleep(d);
        tokio::pin!(sleep);
        select! {
            _ = &mut sleep => true,
            _ = self.shared.shutdown.cancelled() => false,
        }
    }
}
