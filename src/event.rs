//! Typed messages exchanged between the pipeline manager and its worker.
//!
//! The worker is a plain tokio task, so these enums travel over mpsc
//! channels rather than a serialized boundary — but they all derive serde
//! with a `type`/`data` envelope so a host bridge (IPC, WebSocket, logs)
//! can forward them verbatim.
//!
//! Ordering contract: within one job, [`WorkerEvent::Progress`] events are
//! strictly ordered with `current` increasing 1..=total, and exactly one
//! terminal event (`Complete`, `Cancelled`, or `Error`) is sent last.
//! Nothing follows a terminal event.

use crate::config::JobConfig;
use crate::error::ImageFault;
use crate::output::NormalizedImage;
use serde::{Deserialize, Serialize};

/// One raw input image submitted to the pipeline.
///
/// `bytes` ownership moves into the worker at job start; the caller keeps
/// no copy. `media_type` is the caller-declared MIME type — decoding sniffs
/// the real format from the bytes, so a wrong declaration is harmless and
/// only affects logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputImage {
    pub name: String,
    pub media_type: String,
    #[serde(with = "serde_bytes_b64")]
    pub bytes: Vec<u8>,
}

impl InputImage {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// Commands sent from the manager to the worker.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum WorkerCommand {
    /// Begin processing the queue. Sent exactly once per worker.
    Start {
        files: Vec<InputImage>,
        config: JobConfig,
    },
    /// Request cooperative cancellation; observed at the next queue
    /// boundary.
    Cancel,
}

/// Events sent from the worker back to the manager.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum WorkerEvent {
    /// One image is about to be processed.
    Progress(ProgressEvent),
    /// Terminal: the queue is exhausted; carries everything the assembly
    /// step needs.
    Complete(CompletionPayload),
    /// Terminal: a cancel request was observed at a queue boundary.
    Cancelled,
    /// Terminal: the worker failed as a whole (never a single bad image).
    Error { message: String },
}

/// Per-image progress, emitted as each image begins processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 1-based index of the image being processed.
    pub current: usize,
    /// Total images in the queue.
    pub total: usize,
    /// `round(current / total * 100)`.
    pub percentage: u8,
    /// Human-readable status line, e.g. `processing photo.png`.
    pub message: String,
}

impl ProgressEvent {
    pub(crate) fn for_image(current: usize, total: usize, name: &str) -> Self {
        debug_assert!(current >= 1 && current <= total);
        Self {
            current,
            total,
            percentage: ((current as f64 / total as f64) * 100.0).round() as u8,
            message: format!("processing {name}"),
        }
    }
}

/// The worker's completion payload: every submitted image ends up either in
/// `images` (normalized, in input order) or in `faults`.
///
/// The manager checks that accounting (`images + faults == total`) before
/// assembling; a mismatch means results were lost in transit and the job
/// fails rather than silently shipping a short document.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub images: Vec<NormalizedImage>,
    pub faults: Vec<ImageFault>,
    pub total: usize,
}

impl CompletionPayload {
    /// `true` when every submitted image is accounted for.
    pub fn is_consistent(&self) -> bool {
        self.images.len() + self.faults.len() == self.total
    }
}

/// Base64 (de)serialization for raw image buffers.
///
/// Raw bytes serialize as a JSON array of numbers by default, which is
/// useless for IPC payload sizes. Base64 matches what browser and Electron
/// hosts expect for binary fields.
pub(crate) mod serde_bytes_b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percentage_rounds() {
        let e = ProgressEvent::for_image(1, 3, "a.png");
        assert_eq!(e.percentage, 33);
        let e = ProgressEvent::for_image(2, 3, "b.png");
        assert_eq!(e.percentage, 67);
        let e = ProgressEvent::for_image(3, 3, "c.png");
        assert_eq!(e.percentage, 100);
    }

    #[test]
    fn commands_use_type_envelope() {
        let json = serde_json::to_value(&WorkerCommand::Cancel).unwrap();
        assert_eq!(json["type"], "cancel");

        let start = WorkerCommand::Start {
            files: vec![InputImage::new("a.png", "image/png", vec![1, 2, 3])],
            config: crate::JobConfig::default(),
        };
        let json = serde_json::to_value(&start).unwrap();
        assert_eq!(json["type"], "start");
        assert!(json["data"]["files"].is_array());
    }

    #[test]
    fn input_bytes_round_trip_as_base64() {
        let img = InputImage::new("x", "image/png", vec![0, 1, 2, 250, 251, 252, 253]);
        let json = serde_json::to_string(&img).unwrap();
        assert!(json.contains("\"bytes\":\""), "expected string field: {json}");
        let back: InputImage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bytes, img.bytes);
    }

    #[test]
    fn payload_consistency_accounting() {
        let p = CompletionPayload {
            images: vec![],
            faults: vec![],
            total: 0,
        };
        assert!(p.is_consistent());
        let p = CompletionPayload {
            images: vec![],
            faults: vec![],
            total: 2,
        };
        assert!(!p.is_consistent());
    }
}
