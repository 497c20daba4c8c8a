//! # Run a single generation of the supervised command.
//!
//! Takes a freshly spawned child through `Running` (and `Stopping` when
//! interrupted), publishing lifecycle events to the [`Bus`](crate::Bus).
//!
//! ## Event flow
//!
//! ```text
//! Natural exit:
//!   child.wait() → publish ProcessExited                     → Outcome::Exited
//!
//! Wait failure (leader state unknown):
//!   child.wait() Err → publish ProcessExited{reason} → terminate() → Outcome::Exited
//!
//! Reload / shutdown:
//!   reload fired → publish TerminationStarted → terminate()
//!                  ├─ Ok                       → TerminationCompleted → Outcome::Reloaded
//!                  ├─ Err, child already gone  → TerminationCompleted → Outcome::Reloaded
//!                  └─ Err, child alive         → TerminationFailed    → RuntimeError::Termination
//! ```
//!
//! ## Rules
//! - The race is biased: shutdown, then reload, then natural exit.
//! - Reloads triggered before the teardown finished are consumed by it.
//! - Output forwarding of this generation is joined before returning.
//! - A failed `wait()` is never treated as an exit: the group is torn down first.

use crate::{
    core::{actor::WorkerLoop, output::Forwarders, state::WorkerState},
    error::RuntimeError,
    events::{Event, EventKind},
    process::ChildProcess,
};

/// How a generation ended.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The child exited on its own.
    Exited,
    /// The child was killed for a reload; all triggers up to `epoch` are consumed.
    Reloaded { epoch: u64 },
    /// The child was killed because the worker is stopping.
    Shutdown,
}

enum Interrupt {
    Reload,
    Shutdown,
    WaitFailed,
}

/// Supervises `child` until it exits or is torn down.
///
/// `seen` is the last reload epoch already acted upon; a trigger that
/// arrived after it (even before this generation was spawned) interrupts
/// this generation immediately.
pub(crate) async fn run_generation(
    wl: &WorkerLoop,
    child: &mut ChildProcess,
    generation: u64,
    seen: u64,
) -> Result<Outcome, RuntimeError> {
    let forwarders = Forwarders::spawn(child, &wl.output);
    wl.shared.set_state(WorkerState::Running);
    let reload = wl.shared.reload.subscribe_since(seen);

    let interrupt = tokio::select! {
        biased;
        _ = wl.shared.shutdown.cancelled() => Interrupt::Shutdown,
        _ = reload.fired() => Interrupt::Reload,
        status = child.wait() => {
            let ev = Event::new(EventKind::ProcessExited)
                .with_generation(generation)
                .with_pid(child.pid());
            match status {
                Ok(status) => {
                    wl.bus.publish(ev.with_exit(status));
                    drain(wl, forwarders, generation).await;
                    return Ok(Outcome::Exited);
                }
                Err(e) => {
                    wl.bus.publish(ev.with_reason(format!("wait failed: {e}")));
                    Interrupt::WaitFailed
                }
            }
        }
    };

    wl.shared.set_state(WorkerState::Stopping);
    if let Err(e) = teardown(wl, child, generation).await {
        forwarders.abort();
        return Err(e);
    }
    drain(wl, forwarders, generation).await;

    Ok(match interrupt {
        Interrupt::Shutdown => Outcome::Shutdown,
        Interrupt::WaitFailed => Outcome::Exited,
        Interrupt::Reload => Outcome::Reloaded {
            epoch: wl.shared.reload.epoch(),
        },
    })
}

/// Joins output forwarding; streams still open after `drain_timeout` are cut.
async fn drain(wl: &WorkerLoop, forwarders: Forwarders, generation: u64) {
    let aborted = forwarders.join(wl.cfg.drain_limit()).await;
    if aborted > 0 {
        tracing::warn!(
            target: "reloadvisor",
            generation,
            aborted,
            "output still open after drain timeout, forwarding cut"
        );
    }
}

/// Kills the child's process group and classifies a failure.
async fn teardown(
    wl: &WorkerLoop,
    child: &mut ChildProcess,
    generation: u64,
) -> Result<(), RuntimeError> {
    let pid = child.pid();
    wl.bus.publish(
        Event::new(EventKind::TerminationStarted)
            .with_generation(generation)
            .with_pid(pid),
    );

    match wl.terminator.terminate(child).await {
        Ok(pid) => {
            wl.bus.publish(
                Event::new(EventKind::TerminationCompleted)
                    .with_generation(generation)
                    .with_pid(pid),
            );
            Ok(())
        }
        Err(err) if child.has_exited() => {
            wl.bus.publish(
                Event::new(EventKind::TerminationCompleted)
                    .with_generation(generation)
                    .with_pid(pid)
                    .with_reason(format!("already exited: {err}")),
            );
            Ok(())
        }
        Err(err) => {
            wl.bus.publish(
                Event::new(EventKind::TerminationFailed)
                    .with_generation(generation)
                    .with_pid(pid)
                    .with_reason(err.to_string()),
            );
            Err(RuntimeError::Termination {
                generation,
                source: err,
            })
        }
    }
}
