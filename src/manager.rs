//! The pipeline manager: worker lifecycle, event relay, final assembly,
//! and delivery.
//!
//! One manager owns at most one active job. `start` spawns a fresh worker
//! task plus an event-loop task; the event loop relays progress to the
//! registered callbacks, and on the worker's completion payload performs
//! assembly and delivery on the orchestrating side. Whatever the outcome —
//! complete, cancelled, error, or a dead worker channel — the manager fires
//! exactly one terminal callback and resets itself to idle.
//!
//! The manager is an explicit instance: whoever composes the pipeline
//! constructs it with its delivery strategy and owns it. There is no
//! global singleton to leak state between jobs.

use crate::config::JobConfig;
use crate::delivery::DeliveryStrategy;
use crate::error::Img2PdfError;
use crate::event::{CompletionPayload, InputImage, ProgressEvent, WorkerCommand, WorkerEvent};
use crate::output::{ConversionOutput, JobOutput, JobStats};
use crate::pipeline::assemble;
use crate::worker;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// The manager's externally visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Processing,
}

type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync + 'static>;
type CompleteFn = Arc<dyn Fn(JobOutput) + Send + Sync + 'static>;
type ErrorFn = Arc<dyn Fn(Img2PdfError) + Send + Sync + 'static>;
type CancelFn = Arc<dyn Fn() + Send + Sync + 'static>;

/// Single-slot callback registry: setting a callback replaces the previous
/// one, mirroring how a UI controller rebinds handlers between screens.
#[derive(Default)]
struct Callbacks {
    progress: Mutex<Option<ProgressFn>>,
    complete: Mutex<Option<CompleteFn>>,
    error: Mutex<Option<ErrorFn>>,
    cancel: Mutex<Option<CancelFn>>,
}

impl Callbacks {
    fn fire_progress(&self, event: ProgressEvent) {
        let cb = self.progress.lock().unwrap().clone();
        if let Some(cb) = cb {
            cb(event);
        }
    }

    fn fire_complete(&self, output: JobOutput) {
        let cb = self.complete.lock().unwrap().clone();
        if let Some(cb) = cb {
            cb(output);
        }
    }

    fn fire_error(&self, error: Img2PdfError) {
        let cb = self.error.lock().unwrap().clone();
        match cb {
            Some(cb) => cb(error),
            None => warn!("Unobserved job error: {error}"),
        }
    }

    fn fire_cancel(&self) {
        let cb = self.cancel.lock().unwrap().clone();
        if let Some(cb) = cb {
            cb();
        }
    }
}

/// Orchestrates image-to-PDF jobs. See the [module docs](self).
///
/// Cloning is cheap and shares the same underlying manager, so a UI layer
/// can hand clones to whatever needs to observe or cancel the job.
#[derive(Clone)]
pub struct PipelineManager {
    delivery: Arc<dyn DeliveryStrategy>,
    callbacks: Arc<Callbacks>,
    // Some(sender) while a job is active; the sender is the only handle to
    // the worker, so clearing the slot is the teardown.
    slot: Arc<Mutex<Option<UnboundedSender<WorkerCommand>>>>,
}

impl PipelineManager {
    /// Create a manager with the host-selected delivery strategy.
    pub fn new(delivery: Arc<dyn DeliveryStrategy>) -> Self {
        Self {
            delivery,
            callbacks: Arc::new(Callbacks::default()),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Current machine state.
    pub fn state(&self) -> PipelineState {
        if self.slot.lock().unwrap().is_some() {
            PipelineState::Processing
        } else {
            PipelineState::Idle
        }
    }

    /// Start a job. Must be called within a Tokio runtime.
    ///
    /// Buffer ownership moves to the worker; the caller keeps nothing.
    ///
    /// # Errors
    /// [`Img2PdfError::AlreadyProcessing`] when a job is active — the
    /// pipeline fails fast rather than queueing. [`Img2PdfError::EmptyJob`]
    /// for an empty file list.
    pub fn start(&self, files: Vec<InputImage>, config: JobConfig) -> Result<(), Img2PdfError> {
        if files.is_empty() {
            return Err(Img2PdfError::EmptyJob);
        }

        let mut slot = self.slot.lock().unwrap();
        if slot.is_some() {
            return Err(Img2PdfError::AlreadyProcessing);
        }

        let total = files.len();
        info!("Starting job: {} images", total);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (evt_tx, evt_rx) = mpsc::unbounded_channel();

        // Fresh worker per job: no state survives into the next run.
        tokio::spawn(worker::run(cmd_rx, evt_tx));
        cmd_tx
            .send(WorkerCommand::Start { files, config: config.clone() })
            .map_err(|_| Img2PdfError::WorkerFault("worker refused start command".into()))?;
        *slot = Some(cmd_tx);
        drop(slot);

        tokio::spawn(event_loop(
            evt_rx,
            Arc::clone(&self.callbacks),
            Arc::clone(&self.delivery),
            Arc::clone(&self.slot),
            config,
            Instant::now(),
        ));
        Ok(())
    }

    /// Request cooperative cancellation of the active job. No-op when idle.
    ///
    /// The job's terminal event will be the cancel callback — never the
    /// complete callback — once the worker observes the request at a queue
    /// boundary.
    pub fn cancel(&self) {
        let slot = self.slot.lock().unwrap();
        if let Some(tx) = slot.as_ref() {
            debug!("Cancel requested");
            let _ = tx.send(WorkerCommand::Cancel);
        }
    }

    /// Register the progress callback, replacing any previous one.
    pub fn on_progress(&self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> &Self {
        *self.callbacks.progress.lock().unwrap() = Some(Arc::new(cb));
        self
    }

    /// Register the completion callback, replacing any previous one.
    pub fn on_complete(&self, cb: impl Fn(JobOutput) + Send + Sync + 'static) -> &Self {
        *self.callbacks.complete.lock().unwrap() = Some(Arc::new(cb));
        self
    }

    /// Register the error callback, replacing any previous one.
    pub fn on_error(&self, cb: impl Fn(Img2PdfError) + Send + Sync + 'static) -> &Self {
        *self.callbacks.error.lock().unwrap() = Some(Arc::new(cb));
        self
    }

    /// Register the cancellation callback, replacing any previous one.
    pub fn on_cancel(&self, cb: impl Fn() + Send + Sync + 'static) -> &Self {
        *self.callbacks.cancel.lock().unwrap() = Some(Arc::new(cb));
        self
    }
}

/// Relay worker events to callbacks until the terminal one, then finish
/// the job and reset the manager. Runs as its own task so callbacks are
/// always invoked from the manager's context, never the caller's.
async fn event_loop(
    mut events: UnboundedReceiver<WorkerEvent>,
    callbacks: Arc<Callbacks>,
    delivery: Arc<dyn DeliveryStrategy>,
    slot: Arc<Mutex<Option<UnboundedSender<WorkerCommand>>>>,
    config: JobConfig,
    started: Instant,
) {
    let terminal = loop {
        match events.recv().await {
            Some(WorkerEvent::Progress(p)) => callbacks.fire_progress(p),
            Some(other) => break other,
            // The worker died without a terminal event — transport-level
            // failure, surfaced as a job error.
            None => {
                break WorkerEvent::Error {
                    message: "worker channel closed without a terminal event".into(),
                }
            }
        }
    };

    match terminal {
        WorkerEvent::Complete(payload) => {
            match finish_job(payload, &delivery, &config, started).await {
                Ok(output) => {
                    info!(
                        "Job complete: {} pages, {} bytes, {}ms",
                        output.stats.page_count, output.stats.pdf_bytes, output.stats.total_duration_ms
                    );
                    callbacks.fire_complete(output);
                }
                Err(e) => callbacks.fire_error(e),
            }
        }
        WorkerEvent::Cancelled => {
            info!("Job cancelled");
            callbacks.fire_cancel();
        }
        WorkerEvent::Error { message } => {
            callbacks.fire_error(Img2PdfError::WorkerFault(message));
        }
        WorkerEvent::Progress(_) => unreachable!("progress is not terminal"),
    }

    // Teardown on every exit path: dropping the sender ends the worker,
    // clearing the slot returns the manager to idle.
    *slot.lock().unwrap() = None;
}

/// Validate the completion payload and assemble the document.
///
/// Shared by the manager's completion path and the streaming frontend —
/// assembly happens on the orchestrating side, not in the worker: the
/// worker's contract ends at normalized images, and lopdf work is
/// CPU-bound, so it takes the same blocking-pool hop the codecs do.
pub(crate) async fn settle_completion(
    payload: CompletionPayload,
    config: &JobConfig,
    started: Instant,
) -> Result<ConversionOutput, Img2PdfError> {
    if !payload.is_consistent() {
        return Err(Img2PdfError::MalformedResult {
            expected: payload.total,
            got: payload.images.len() + payload.faults.len(),
        });
    }
    if payload.images.is_empty() {
        let first_fault = payload
            .faults
            .first()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no faults recorded".into());
        return Err(Img2PdfError::AllImagesFailed {
            total: payload.total,
            first_fault,
        });
    }

    let CompletionPayload {
        images,
        mut faults,
        total,
    } = payload;
    let processed = images.len();
    let normalize_duration_ms = started.elapsed().as_millis() as u64;

    let assembly_start = Instant::now();
    let cfg = config.clone();
    let assembled = tokio::task::spawn_blocking(move || assemble::build_document(images, &cfg))
        .await
        .map_err(|e| Img2PdfError::Internal(format!("assembly task panicked: {e}")))??;
    faults.extend(assembled.faults);

    Ok(ConversionOutput {
        stats: JobStats {
            total_images: total,
            processed_images: processed,
            skipped_images: total - processed,
            page_count: assembled.page_count,
            pdf_bytes: assembled.pdf.len(),
            normalize_duration_ms,
            assembly_duration_ms: assembly_start.elapsed().as_millis() as u64,
            total_duration_ms: started.elapsed().as_millis() as u64,
        },
        pdf: assembled.pdf,
        faults,
    })
}

/// Settle the payload, deliver the document, schedule any release guard.
async fn finish_job(
    payload: CompletionPayload,
    delivery: &Arc<dyn DeliveryStrategy>,
    config: &JobConfig,
    started: Instant,
) -> Result<JobOutput, Img2PdfError> {
    let output = settle_completion(payload, config, started).await?;
    let file_name = config.resolved_file_name(output.stats.processed_images);
    let ConversionOutput {
        pdf,
        faults,
        mut stats,
    } = output;

    let delivery = Arc::clone(delivery);
    let name = file_name.clone();
    let mut receipt = tokio::task::spawn_blocking(move || delivery.deliver(pdf, &name))
        .await
        .map_err(|e| Img2PdfError::Internal(format!("delivery task panicked: {e}")))??;

    // Transient artifacts are released after the strategy's grace period —
    // long enough for the host to grab the file, never leaked.
    if let Some((guard, grace)) = receipt.release.take() {
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            drop(guard);
        });
    }

    stats.total_duration_ms = started.elapsed().as_millis() as u64;
    Ok(JobOutput {
        file_name,
        delivered: receipt.delivered,
        faults,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::StandardDownload;

    fn manager_with_tempdir() -> (PipelineManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let manager = PipelineManager::new(Arc::new(StandardDownload::new(dir.path())));
        (manager, dir)
    }

    #[tokio::test]
    async fn empty_job_is_rejected_synchronously() {
        let (manager, _dir) = manager_with_tempdir();
        let err = manager.start(vec![], JobConfig::default()).unwrap_err();
        assert!(matches!(err, Img2PdfError::EmptyJob));
        assert_eq!(manager.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn cancel_when_idle_is_a_noop() {
        let (manager, _dir) = manager_with_tempdir();
        manager.cancel();
        assert_eq!(manager.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn setting_a_callback_replaces_the_previous_one() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (manager, _dir) = manager_with_tempdir();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&first);
        manager.on_progress(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = Arc::clone(&second);
        manager.on_progress(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        manager.callbacks.fire_progress(ProgressEvent::for_image(1, 1, "x"));
        assert_eq!(first.load(Ordering::SeqCst), 0, "replaced callback must not fire");
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
