//! # OS termination signals for [`Worker::serve`](crate::Worker::serve).
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`. **Other targets:** Ctrl-C.
//!
//! `SIGHUP` is not handled here; hosts usually map it to `Worker::reload`.

/// Completes when the process receives a termination signal.
///
/// Returns `Err` if the signal handlers cannot be registered.
#[cfg(unix)]
pub(crate) async fn termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Completes when the process receives Ctrl-C.
#[cfg(not(unix))]
pub(crate) async fn termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
