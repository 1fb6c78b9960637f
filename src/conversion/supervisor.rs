//! Single-slot ownership of the conversion process.
//!
//! At most one conversion runs at a time. Starting a new one terminates and
//! reaps the current one before the replacement is spawned, and the slot
//! lock is held across both steps so two starts can never interleave.
//!
//! Each process is owned by its own exit watcher task. The slot only keeps
//! the watcher's stop token and exit channel, so waiting for a process to
//! finish on its own never holds the lock.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::ConversionError;
use super::transcoder::Transcoder;

/// How long to wait for the stderr reader after the process is gone.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Identifies one started conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConversionId(pub(crate) u64);

impl fmt::Display for ConversionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proof of having started a conversion. Must be handed back through
/// [`ConversionSupervisor::release`].
#[derive(Debug)]
pub struct ConversionTicket {
    id: ConversionId,
    pid: Option<u32>,
    source: PathBuf,
}

impl ConversionTicket {
    pub fn id(&self) -> ConversionId {
        self.id
    }

    /// OS process id, while the process was alive at start.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// A freshly started conversion and its output pipe.
#[derive(Debug)]
pub struct StartedConversion {
    pub ticket: ConversionTicket,
    pub output: ChildStdout,
}

/// What [`ConversionSupervisor::release`] found.
#[derive(Debug)]
pub enum Release {
    /// The conversion was still current; it has been reaped.
    Exited(ExitStatus),
    /// A newer conversion or shutdown already terminated and reaped it.
    Superseded,
    /// Waiting on the process failed, so its exit status is unknown.
    Lost(String),
}

/// Snapshot of the running conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveConversion {
    pub id: ConversionId,
    pub pid: Option<u32>,
    pub source: PathBuf,
}

#[derive(Debug, Clone)]
enum Exit {
    Status(ExitStatus),
    Lost(String),
}

type ExitReceiver = watch::Receiver<Option<Exit>>;

struct Tracked {
    id: ConversionId,
    pid: Option<u32>,
    source: PathBuf,
    stop: CancellationToken,
    exit: ExitReceiver,
}

impl Tracked {
    /// Kill, then wait until the watcher has reaped the process.
    async fn terminate(self) {
        self.stop.cancel();
        wait_exit(self.exit).await;
    }

    fn snapshot(&self) -> ActiveConversion {
        ActiveConversion {
            id: self.id,
            pid: self.pid,
            source: self.source.clone(),
        }
    }
}

/// Owner of the single conversion slot.
pub struct ConversionSupervisor {
    transcoder: Arc<dyn Transcoder>,
    slot: Mutex<Option<Tracked>>,
    next_id: AtomicU64,
}

impl ConversionSupervisor {
    pub fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            transcoder,
            slot: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start converting `source`, terminating whatever is running first.
    ///
    /// On return the previous process has exited and been reaped, and the
    /// new one is recorded as current.
    pub async fn acquire_and_start(
        &self,
        source: &Path,
    ) -> Result<StartedConversion, ConversionError> {
        let mut slot = self.slot.lock().await;

        if let Some(previous) = slot.take() {
            info!(
                conversion_id = %previous.id,
                source = %previous.source.display(),
                "Stopping active conversion to start a new one"
            );
            previous.terminate().await;
        }

        let mut cmd = self.transcoder.command(source);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| ConversionError::start_failure(self.transcoder.name(), e.to_string()))?;

        let (output, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(output), Some(stderr)) => (output, stderr),
            _ => {
                let _ = child.kill().await;
                return Err(ConversionError::start_failure(
                    self.transcoder.name(),
                    "process pipes unavailable",
                ));
            }
        };

        let id = ConversionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let pid = child.id();
        let stderr_task = tokio::spawn(drain_stderr(id, stderr));
        let stop = CancellationToken::new();
        let (exit_tx, exit) = watch::channel(None);
        tokio::spawn(watch_process(id, child, stop.clone(), stderr_task, exit_tx));

        info!(
            conversion_id = %id,
            pid = ?pid,
            source = %source.display(),
            "Started {}",
            self.transcoder.name()
        );

        *slot = Some(Tracked {
            id,
            pid,
            source: source.to_path_buf(),
            stop,
            exit,
        });

        Ok(StartedConversion {
            ticket: ConversionTicket {
                id,
                pid,
                source: source.to_path_buf(),
            },
            output,
        })
    }

    /// Signal the ticket's process to stop. Does nothing if it is no
    /// longer current. Reaping happens in [`release`](Self::release).
    pub async fn kill(&self, ticket: &ConversionTicket) {
        let slot = self.slot.lock().await;
        if let Some(tracked) = slot.as_ref().filter(|t| t.id == ticket.id) {
            tracked.stop.cancel();
        }
    }

    /// Wait for the ticket's process to exit and clear the slot if it is
    /// still current.
    pub async fn release(&self, ticket: ConversionTicket) -> Release {
        let exit = {
            let slot = self.slot.lock().await;
            match slot.as_ref().filter(|t| t.id == ticket.id) {
                Some(tracked) => tracked.exit.clone(),
                None => {
                    debug!(conversion_id = %ticket.id, "Conversion already superseded");
                    return Release::Superseded;
                }
            }
        };

        let exit = wait_exit(exit).await;

        let mut slot = self.slot.lock().await;
        if !slot.as_ref().is_some_and(|t| t.id == ticket.id) {
            debug!(conversion_id = %ticket.id, "Conversion superseded while exiting");
            return Release::Superseded;
        }
        *slot = None;

        match exit {
            Exit::Status(status) => Release::Exited(status),
            Exit::Lost(message) => Release::Lost(message),
        }
    }

    /// The conversion currently holding the slot.
    pub async fn active(&self) -> Option<ActiveConversion> {
        self.slot.lock().await.as_ref().map(Tracked::snapshot)
    }

    /// Terminate the running conversion, if any.
    pub async fn shutdown(&self) {
        let tracked = self.slot.lock().await.take();
        if let Some(tracked) = tracked {
            info!(conversion_id = %tracked.id, "Stopping conversion for shutdown");
            tracked.terminate().await;
        }
    }
}

async fn wait_exit(mut exit: ExitReceiver) -> Exit {
    let seen = match exit.wait_for(Option::is_some).await {
        Ok(seen) => (*seen).clone(),
        Err(_) => None,
    };
    seen.unwrap_or_else(|| Exit::Lost("exit watcher ended without a status".to_string()))
}

/// Own the process until it exits or `stop` fires, then publish how it ended.
async fn watch_process(
    id: ConversionId,
    mut child: Child,
    stop: CancellationToken,
    stderr_task: JoinHandle<()>,
    exit_tx: watch::Sender<Option<Exit>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = stop.cancelled() => {
            match child.kill().await {
                Ok(()) => debug!(conversion_id = %id, "Conversion process killed"),
                Err(e) => warn!(conversion_id = %id, "Failed to kill conversion process: {}", e),
            }
            // kill() only waits on success; make sure the process is reaped either way
            child.wait().await
        }
    };
    finish_stderr(id, stderr_task).await;

    let exit = match status {
        Ok(status) => {
            debug!(conversion_id = %id, %status, "Conversion process exited");
            Exit::Status(status)
        }
        Err(e) => {
            warn!(conversion_id = %id, "Failed to wait on conversion process: {}", e);
            Exit::Lost(e.to_string())
        }
    };
    let _ = exit_tx.send(Some(exit));
}

async fn finish_stderr(id: ConversionId, mut task: JoinHandle<()>) {
    if tokio::time::timeout(STDERR_DRAIN_TIMEOUT, &mut task)
        .await
        .is_err()
    {
        debug!(conversion_id = %id, "Stderr reader still busy, aborting it");
        task.abort();
    }
}

/// Forward encoder diagnostics to the log until the pipe closes.
async fn drain_stderr(id: ConversionId, stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if !line.is_empty() {
                    warn!(target: "stromboli::conversion::ffmpeg", conversion_id = %id, "{}", line);
                }
            }
            Err(e) => {
                debug!(conversion_id = %id, "Stopped reading conversion stderr: {}", e);
                break;
            }
        }
    }
}
