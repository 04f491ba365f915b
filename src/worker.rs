//! The per-job worker task: sequential queue walk with cooperative
//! cancellation.
//!
//! ## Why one worker per job?
//!
//! A fresh task per job guarantees no state leaks between runs — the exact
//! bug class a pooled worker invites. The manager spawns the task, sends a
//! single `Start` command carrying the whole queue (buffer ownership moves
//! with it), and tears the task down after the terminal event regardless of
//! outcome.
//!
//! ## Why sequential?
//!
//! Images are processed strictly in input order, one at a time. Peak memory
//! stays bounded at one decoded image, progress is monotonic by
//! construction, and output page order trivially matches input order.
//! Decode/encode work runs on the blocking pool (`spawn_blocking`) so the
//! async executor is never stalled.
//!
//! ## Cancellation
//!
//! `Cancel` is polled from the command channel between images, not
//! preemptively mid-image: an in-flight image may finish its work, but no
//! partial output is ever emitted, and the `Cancelled` event is guaranteed
//! terminal.

use crate::config::JobConfig;
use crate::event::{CompletionPayload, InputImage, ProgressEvent, WorkerCommand, WorkerEvent};
use crate::pipeline::normalize;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Run one worker: wait for `Start`, walk the queue, emit exactly one
/// terminal event.
///
/// Never panics across its boundary — a panic inside an image's
/// normalization is caught at the `spawn_blocking` join and reported as a
/// terminal `Error` event.
pub(crate) async fn run(
    mut commands: UnboundedReceiver<WorkerCommand>,
    events: UnboundedSender<WorkerEvent>,
) {
    match commands.recv().await {
        Some(WorkerCommand::Start { files, config }) => {
            process_queue(files, config, &mut commands, &events).await;
        }
        Some(WorkerCommand::Cancel) => {
            // Cancelled before any work started.
            let _ = events.send(WorkerEvent::Cancelled);
        }
        None => {
            debug!("Worker channel closed before start; nothing to do");
        }
    }
}

async fn process_queue(
    files: Vec<InputImage>,
    config: JobConfig,
    commands: &mut UnboundedReceiver<WorkerCommand>,
    events: &UnboundedSender<WorkerEvent>,
) {
    let total = files.len();
    let mut images = Vec::with_capacity(total);
    let mut faults = Vec::new();

    for (i, file) in files.into_iter().enumerate() {
        if cancel_requested(commands) {
            debug!("Cancel observed at image {}/{}", i, total);
            let _ = events.send(WorkerEvent::Cancelled);
            return;
        }

        let _ = events.send(WorkerEvent::Progress(ProgressEvent::for_image(
            i + 1,
            total,
            &file.name,
        )));

        let cfg = config.clone();
        match tokio::task::spawn_blocking(move || normalize::normalize_image(file, &cfg)).await {
            Ok(Ok(normalized)) => images.push(normalized),
            Ok(Err(fault)) => {
                warn!("Skipping image: {}", fault);
                faults.push(fault);
            }
            Err(join_err) => {
                // A panic inside the codec is a worker-level failure, but it
                // must surface as a typed event, never as an unwound task.
                let _ = events.send(WorkerEvent::Error {
                    message: format!("image task failed: {join_err}"),
                });
                return;
            }
        }
    }

    // A cancel that raced the last image still wins: the terminal event is
    // `Cancelled` and the results are discarded.
    if cancel_requested(commands) {
        let _ = events.send(WorkerEvent::Cancelled);
        return;
    }

    debug!(
        "Queue complete: {}/{} normalized, {} faults",
        images.len(),
        total,
        faults.len()
    );
    let _ = events.send(WorkerEvent::Complete(CompletionPayload {
        images,
        faults,
        total,
    }));
}

/// Drain pending commands, reporting whether a cancel arrived.
fn cancel_requested(commands: &mut UnboundedReceiver<WorkerCommand>) -> bool {
    loop {
        match commands.try_recv() {
            Ok(WorkerCommand::Cancel) => return true,
            Ok(WorkerCommand::Start { .. }) => {
                // A second start on a running worker is a protocol error;
                // ignore it rather than corrupting the active queue.
                warn!("Ignoring start command on a busy worker");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use tokio::sync::mpsc;

    fn png_input(name: &str) -> InputImage {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        InputImage::new(name, "image/png", buf.into_inner())
    }

    async fn collect_events(
        files: Vec<InputImage>,
        pre_commands: Vec<WorkerCommand>,
    ) -> Vec<WorkerEvent> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();

        cmd_tx
            .send(WorkerCommand::Start {
                files,
                config: JobConfig::default(),
            })
            .unwrap();
        for c in pre_commands {
            cmd_tx.send(c).unwrap();
        }

        run(cmd_rx, evt_tx).await;
        let mut events = Vec::new();
        while let Ok(e) = evt_rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[test]
    fn progress_counts_every_image_including_faulted() {
        let events = tokio_test::block_on(collect_events(
            vec![
                png_input("a.png"),
                InputImage::new("bad.png", "image/png", vec![1, 2, 3]),
                png_input("c.png"),
            ],
            vec![],
        ));

        let progress: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                WorkerEvent::Progress(p) => Some(p.current),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3]);

        match events.last().unwrap() {
            WorkerEvent::Complete(payload) => {
                assert_eq!(payload.total, 3);
                assert_eq!(payload.images.len(), 2);
                assert_eq!(payload.faults.len(), 1);
                assert!(payload.is_consistent());
                assert_eq!(payload.faults[0].image_name(), "bad.png");
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn cancel_before_start_is_terminal() {
        let events = tokio_test::block_on(async {
            let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
            let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
            cmd_tx.send(WorkerCommand::Cancel).unwrap();
            run(cmd_rx, evt_tx).await;
            let mut events = Vec::new();
            while let Ok(e) = evt_rx.try_recv() {
                events.push(e);
            }
            events
        });
        assert!(matches!(events.as_slice(), [WorkerEvent::Cancelled]));
    }

    #[test]
    fn cancel_queued_before_processing_stops_the_queue() {
        // Cancel is already in the channel when the queue starts, so the
        // boundary check fires before image 1.
        let events = tokio_test::block_on(collect_events(
            vec![png_input("a.png"), png_input("b.png")],
            vec![WorkerCommand::Cancel],
        ));
        assert!(matches!(events.as_slice(), [WorkerEvent::Cancelled]));
    }

    #[test]
    fn completion_preserves_input_order() {
        let events = tokio_test::block_on(collect_events(
            vec![png_input("first.png"), png_input("second.png")],
            vec![],
        ));
        match events.last().unwrap() {
            WorkerEvent::Complete(payload) => {
                let names: Vec<&str> =
                    payload.images.iter().map(|i| i.name.as_str()).collect();
                assert_eq!(names, vec!["first.png", "second.png"]);
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }
}
