//! # Example: dev_reload
//!
//! Runs a development command under [`Worker`] and restarts it on `SIGHUP`.
//!
//! Shows how to:
//! - Configure the build tool and subcommand through [`Config`].
//! - Map an external trigger (here `SIGHUP`) onto [`Worker::reload`].
//! - Stop cleanly on Ctrl-C with [`Worker::shutdown`] + [`Worker::wait`].
//!
//! ## Flow
//! ```text
//! Worker::run()
//!   ├─► spawn `sh -c 'task dev'` (generation 1)
//!   ├─► kill -HUP <pid of this demo>
//!   │     └─► Worker::reload() ─► killpg ─► spawn (generation 2)
//!   └─► Ctrl-C ─► Worker::shutdown() ─► killpg ─► Stopped
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example dev_reload -- [program] [subcommand]
//! # e.g. a stand-in for `task dev`:
//! cargo run --example dev_reload -- top ""
//! ```

use std::sync::Arc;

use anyhow::Context;
use reloadvisor::{Config, LogWriter, Worker};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Status events are rendered through tracing; RUST_LOG=reloadvisor=debug for more.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Program and subcommand from the command line, defaults otherwise.
    let mut argv = std::env::args().skip(1);
    let mut cfg = Config::default();
    if let Some(program) = argv.next() {
        cfg.program = program;
    }
    if let Some(subcommand) = argv.next() {
        cfg.subcommand = subcommand;
    }
    // Keep the demo alive on a teardown failure so the error is printed below.
    cfg.exit_on_fatal = false;

    // 3. Build the worker for the current directory.
    let cwd = std::env::current_dir().context("reading current directory")?;
    let worker = Worker::builder(cwd, Vec::new())
        .with_config(cfg)
        .with_subscribers(vec![Arc::new(LogWriter)])
        .build();
    worker.run().context("starting worker")?;

    // 4. SIGHUP → reload.
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut hup = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;
        let w = Arc::clone(&worker);
        tokio::spawn(async move {
            while hup.recv().await.is_some() {
                w.reload();
            }
        });
    }

    // 5. Ctrl-C → shutdown.
    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    worker.shutdown();
    worker.wait().await?;

    println!("stopped after {} generation(s)", worker.generation());
    Ok(())
}
