//! Streaming one conversion to one client.
//!
//! The copy runs in its own task and races against the request's
//! cancellation token, so a client going away stops the encoder without
//! waiting for the next write to fail. The response head is held back until
//! the first output chunk arrives, which lets an encoder that dies early
//! still be reported as an error instead of an empty success.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::process::ChildStdout;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::ReaderStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use super::error::{ConversionError, ErrorKind};
use super::supervisor::{ConversionId, ConversionSupervisor, Release, StartedConversion};

/// Read size for encoder output.
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the copy task and the response body.
const BODY_BUFFER: usize = 16;

/// How a conversion stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The encoder finished successfully and everything was delivered.
    Completed { bytes: u64 },
    /// The client went away; the encoder was stopped.
    ClientDisconnected { bytes: u64 },
    /// A newer conversion took the slot.
    Preempted { bytes: u64 },
    /// Anything else.
    Failed(ErrorKind),
}

/// A conversion whose first output has not been seen yet.
///
/// Dropping this, or the [`ConversionStream`] it becomes, cancels the
/// conversion.
pub struct PendingConversion {
    head: oneshot::Receiver<Result<(), ConversionError>>,
    body: mpsc::Receiver<Bytes>,
    guard: DropGuard,
}

impl PendingConversion {
    /// Wait until output starts flowing or the conversion fails.
    ///
    /// A conversion that exits successfully without output yields an empty
    /// stream.
    pub async fn ready(self) -> Result<ConversionStream, ConversionError> {
        let PendingConversion { head, body, guard } = self;

        match head.await {
            Ok(Ok(())) => Ok(ConversionStream {
                inner: ReceiverStream::new(body),
                _guard: guard,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ConversionError::StreamingFailure {
                bytes: 0,
                message: "conversion task ended without a result".to_string(),
            }),
        }
    }
}

/// Body of a conversion response.
pub struct ConversionStream {
    inner: ReceiverStream<Bytes>,
    _guard: DropGuard,
}

impl Stream for ConversionStream {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx).map(|chunk| chunk.map(Ok))
    }
}

/// Start converting `source` for one client.
pub fn start(supervisor: Arc<ConversionSupervisor>, source: PathBuf) -> PendingConversion {
    let cancel = CancellationToken::new();
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(BODY_BUFFER);

    let token = cancel.clone();
    tokio::spawn(async move {
        let outcome = run(supervisor, source, head_tx, body_tx, token).await;
        debug!(?outcome, "Conversion stream ended");
    });

    PendingConversion {
        head: head_rx,
        body: body_rx,
        guard: cancel.drop_guard(),
    }
}

enum Copied {
    Finished,
    Cancelled,
    ReadFailed(std::io::Error),
}

async fn run(
    supervisor: Arc<ConversionSupervisor>,
    source: PathBuf,
    head_tx: oneshot::Sender<Result<(), ConversionError>>,
    body_tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
) -> StreamOutcome {
    let StartedConversion { ticket, output } = match supervisor.acquire_and_start(&source).await {
        Ok(started) => started,
        Err(e) => {
            error!(source = %source.display(), "Conversion failed to start: {}", e);
            let kind = e.kind();
            let _ = head_tx.send(Err(e));
            return StreamOutcome::Failed(kind);
        }
    };

    let mut head_tx = Some(head_tx);
    let mut bytes = 0u64;

    let copied = tokio::select! {
        biased;
        _ = cancel.cancelled() => Copied::Cancelled,
        copied = copy_output(output, &body_tx, &mut head_tx, &mut bytes) => copied,
    };

    match &copied {
        Copied::Finished => {}
        Copied::Cancelled => {
            info!(
                conversion_id = %ticket.id(),
                bytes,
                "Client disconnected, stopping conversion"
            );
            supervisor.kill(&ticket).await;
        }
        Copied::ReadFailed(e) => {
            warn!(conversion_id = %ticket.id(), bytes, "Reading conversion output failed: {}", e);
            supervisor.kill(&ticket).await;
        }
    }

    let id = ticket.id();
    let released = supervisor.release(ticket).await;
    let (outcome, failure) = settle(id, copied, released, bytes);

    // Only reachable before any byte went out; afterwards the response is
    // already committed and the body just ends early.
    if let Some(head_tx) = head_tx {
        let _ = head_tx.send(failure.map_or(Ok(()), Err));
    }

    // body_tx drops here, after release, so the body ends once cleanup is done
    drop(body_tx);
    outcome
}

/// Decide how the stream ended and what, if anything, the client should see
/// when no output has been sent yet.
fn settle(
    id: ConversionId,
    copied: Copied,
    released: Release,
    bytes: u64,
) -> (StreamOutcome, Option<ConversionError>) {
    match (copied, released) {
        (Copied::Cancelled, _) => (StreamOutcome::ClientDisconnected { bytes }, None),
        (Copied::ReadFailed(e), _) => (
            StreamOutcome::Failed(ErrorKind::StreamingFailure),
            Some(ConversionError::StreamingFailure {
                bytes,
                message: e.to_string(),
            }),
        ),
        (Copied::Finished, Release::Exited(status)) if status.success() => {
            info!(conversion_id = %id, bytes, "Conversion finished");
            (StreamOutcome::Completed { bytes }, None)
        }
        (Copied::Finished, Release::Exited(status)) => {
            error!(conversion_id = %id, bytes, %status, "Conversion process failed");
            (
                StreamOutcome::Failed(ErrorKind::ProcessExitFailure),
                Some(ConversionError::exit_failure(status.to_string())),
            )
        }
        (Copied::Finished, Release::Lost(message)) => {
            error!(conversion_id = %id, bytes, "Conversion exit status unknown: {}", message);
            (
                StreamOutcome::Failed(ErrorKind::ProcessExitFailure),
                Some(ConversionError::exit_failure(message)),
            )
        }
        (Copied::Finished, Release::Superseded) => {
            info!(conversion_id = %id, bytes, "Conversion stopped by a newer request");
            (
                StreamOutcome::Preempted { bytes },
                Some(ConversionError::exit_failure("stopped by a newer conversion")),
            )
        }
    }
}

async fn copy_output(
    output: ChildStdout,
    body: &mpsc::Sender<Bytes>,
    head: &mut Option<oneshot::Sender<Result<(), ConversionError>>>,
    bytes: &mut u64,
) -> Copied {
    let mut chunks = ReaderStream::with_capacity(output, CHUNK_SIZE);
    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Copied::ReadFailed(e),
        };
        if let Some(head) = head.take() {
            let _ = head.send(Ok(()));
        }
        let len = chunk.len() as u64;
        if body.send(chunk).await.is_err() {
            return Copied::Cancelled;
        }
        *bytes += len;
    }
    Copied::Finished
}
