//! Streaming conversion API: job events as a cancellable stream.
//!
//! ## Why stream?
//!
//! The manager's callback surface fits UI controllers; everything else —
//! async state machines, tests, services — composes better against a
//! `Stream`. This module runs the same worker and assembly as the manager
//! but yields typed [`JobEvent`]s instead of invoking callbacks, and hands
//! back a [`JobHandle`] whose `cancel` has the same queue-boundary
//! semantics as [`crate::PipelineManager::cancel`].
//!
//! The ordering contract carries over: progress events in order, then
//! exactly one terminal event, then the stream ends.

use crate::config::JobConfig;
use crate::error::Img2PdfError;
use crate::event::{InputImage, ProgressEvent, WorkerCommand, WorkerEvent};
use crate::output::ConversionOutput;
use crate::worker;
use std::pin::Pin;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream};
use tracing::warn;

/// A boxed stream of job events.
pub type JobStream = Pin<Box<dyn Stream<Item = JobEvent> + Send>>;

/// Events yielded by [`convert_stream`].
#[derive(Debug)]
pub enum JobEvent {
    /// One image is about to be processed.
    Progress(ProgressEvent),
    /// Terminal: the finished document and its stats.
    Complete(ConversionOutput),
    /// Terminal: cancellation observed at a queue boundary.
    Cancelled,
    /// Terminal: the job failed as a whole.
    Failed(Img2PdfError),
}

/// Handle for cancelling a streaming job.
pub struct JobHandle {
    commands: mpsc::UnboundedSender<WorkerCommand>,
}

impl JobHandle {
    /// Request cooperative cancellation; takes effect at the next queue
    /// boundary. Safe to call after the job finished.
    pub fn cancel(&self) {
        let _ = self.commands.send(WorkerCommand::Cancel);
    }
}

/// Convert images to a PDF, yielding progress as a stream.
///
/// # Errors
/// Rejects an empty file list synchronously; everything later arrives as a
/// terminal [`JobEvent`] on the stream.
pub fn convert_stream(
    files: Vec<InputImage>,
    config: JobConfig,
) -> Result<(JobStream, JobHandle), Img2PdfError> {
    if files.is_empty() {
        return Err(Img2PdfError::EmptyJob);
    }

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    tokio::spawn(worker::run(cmd_rx, evt_tx));
    cmd_tx
        .send(WorkerCommand::Start {
            files,
            config: config.clone(),
        })
        .map_err(|_| Img2PdfError::WorkerFault("worker refused start command".into()))?;

    let handle = JobHandle {
        commands: cmd_tx,
    };

    tokio::spawn(async move {
        let started = Instant::now();
        loop {
            match evt_rx.recv().await {
                Some(WorkerEvent::Progress(p)) => {
                    if out_tx.send(JobEvent::Progress(p)).is_err() {
                        // Stream consumer is gone; keep draining so the
                        // worker still reaches its terminal event.
                        warn!("Job stream dropped mid-run");
                    }
                }
                Some(WorkerEvent::Complete(payload)) => {
                    let event =
                        match crate::manager::settle_completion(payload, &config, started).await {
                            Ok(output) => JobEvent::Complete(output),
                            Err(e) => JobEvent::Failed(e),
                        };
                    let _ = out_tx.send(event);
                    break;
                }
                Some(WorkerEvent::Cancelled) => {
                    let _ = out_tx.send(JobEvent::Cancelled);
                    break;
                }
                Some(WorkerEvent::Error { message }) => {
                    let _ = out_tx.send(JobEvent::Failed(Img2PdfError::WorkerFault(message)));
                    break;
                }
                None => {
                    let _ = out_tx.send(JobEvent::Failed(Img2PdfError::WorkerFault(
                        "worker channel closed without a terminal event".into(),
                    )));
                    break;
                }
            }
        }
    });

    Ok((Box::pin(UnboundedReceiverStream::new(out_rx)), handle))
}

