//! # Output forwarding.
//!
//! Each generation gets two forwarding tasks that copy the child's stdout and
//! stderr into sinks produced by an [`Output`]. The run loop joins both tasks
//! before the next spawn, so two generations never interleave their output.
//!
//! ```text
//! ChildStdout ──copy──► (Output::stdout)()   e.g. tokio::io::stdout()
//! ChildStderr ──copy──► (Output::stderr)()   e.g. tokio::io::stderr()
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};

use crate::process::ChildProcess;

/// Boxed async writer receiving one generation's output stream.
pub type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// Produces a fresh sink for every generation.
pub type SinkFactory = Arc<dyn Fn() -> Sink + Send + Sync>;

/// Destinations for child output.
///
/// The default forwards to the supervising process's own stdout/stderr.
#[derive(Clone)]
pub struct Output {
    stdout: SinkFactory,
    stderr: SinkFactory,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

impl Default for Output {
    fn default() -> Self {
        Self {
            stdout: Arc::new(|| -> Sink { Box::new(tokio::io::stdout()) }),
            stderr: Arc::new(|| -> Sink { Box::new(tokio::io::stderr()) }),
        }
    }
}

impl Output {
    /// Creates an output with custom sink factories.
    pub fn new(stdout: SinkFactory, stderr: SinkFactory) -> Self {
        Self { stdout, stderr }
    }

    /// Discards everything the child writes.
    pub fn discard() -> Self {
        Self {
            stdout: Arc::new(|| -> Sink { Box::new(tokio::io::sink()) }),
            stderr: Arc::new(|| -> Sink { Box::new(tokio::io::sink()) }),
        }
    }
}

/// Forwarding tasks of one generation.
pub(crate) struct Forwarders {
    handles: Vec<JoinHandle<io::Result<u64>>>,
}

impl Forwarders {
    /// Starts forwarding whatever streams `child` still owns.
    pub(crate) fn spawn(child: &mut ChildProcess, output: &Output) -> Self {
        let mut handles = Vec::with_capacity(2);
        if let Some(stdout) = child.take_stdout() {
            handles.push(tokio::spawn(pump(stdout, (output.stdout)())));
        }
        if let Some(stderr) = child.take_stderr() {
            handles.push(tokio::spawn(pump(stderr, (output.stderr)())));
        }
        Self { handles }
    }

    /// Waits until every stream is closed; past `limit`, aborts the rest.
    ///
    /// Returns the number of aborted tasks. All tasks have finished on return.
    pub(crate) async fn join(self, limit: Option<Duration>) -> usize {
        let deadline = limit.map(|d| Instant::now() + d);
        let mut aborted = 0;
        for mut handle in self.handles {
            let Some(deadline) = deadline else {
                let _ = handle.await;
                continue;
            };
            if timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                let _ = handle.await;
                aborted += 1;
            }
        }
        aborted
    }

    /// Aborts all forwarding immediately.
    pub(crate) fn abort(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

async fn pump<R>(mut from: R, mut to: Sink) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let n = tokio::io::copy(&mut from, &mut to).await?;
    to.flush().await?;
    Ok(n)
}
