//! Delivery strategies: the final handoff of the produced document to the
//! user's environment.
//!
//! ## Why a trait instead of environment sniffing?
//!
//! The two real-world delivery paths need fundamentally different handling:
//! hosts with a dependable save path get a persistent file; constrained
//! hosts (mobile web views and friends) mishandle direct saves and must be
//! navigated to the artifact instead, with the file held alive just long
//! enough for the host to pick it up. Which path applies is a property of
//! the host, so the host adapter picks the strategy and injects it at
//! manager construction — the pipeline itself stays platform-agnostic and
//! testable without any real host.

use crate::error::DeliveryError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info};

/// Where the delivery strategy put the document.
#[derive(Debug, Clone)]
pub enum Delivered {
    /// Persistently saved; the file belongs to the user now.
    Saved { path: PathBuf },
    /// Handed to the host viewer via a transient file that will be
    /// released after the grace period.
    Opened { path: PathBuf },
}

impl Delivered {
    /// Path of the delivered artifact.
    pub fn path(&self) -> &Path {
        match self {
            Delivered::Saved { path } | Delivered::Opened { path } => path,
        }
    }
}

/// Keeps a transient artifact alive until the host had a chance to read it.
///
/// Dropping the guard deletes the file. The manager holds it for the
/// strategy's grace period, so release is always eventual and bounded.
#[derive(Debug)]
pub struct ReleaseGuard {
    _temp: TempPath,
}

/// Outcome of one delivery attempt.
#[derive(Debug)]
pub struct Receipt {
    pub delivered: Delivered,
    /// Present for transient artifacts; `None` for persistent saves.
    pub release: Option<(ReleaseGuard, Duration)>,
}

/// A way to hand the finished document to the user. Exactly one delivery
/// attempt is made per completed job.
pub trait DeliveryStrategy: Send + Sync {
    fn deliver(&self, document: Vec<u8>, file_name: &str) -> Result<Receipt, DeliveryError>;
}

/// Persistent save into a target directory (the desktop download path).
///
/// Writes atomically — temp file in the same directory, then rename — so a
/// crash mid-write never leaves a truncated PDF with the final name.
pub struct StandardDownload {
    dir: PathBuf,
}

impl StandardDownload {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DeliveryStrategy for StandardDownload {
    fn deliver(&self, document: Vec<u8>, file_name: &str) -> Result<Receipt, DeliveryError> {
        let path = self.dir.join(file_name);
        let io_err = |source| DeliveryError::Io {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        let tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        std::fs::write(tmp.path(), &document).map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        info!("Saved {} bytes to {}", document.len(), path.display());
        Ok(Receipt {
            delivered: Delivered::Saved { path },
            release: None,
        })
    }
}

/// Transient handoff for hosts that cannot save directly: write a temp
/// file, ask the host to open it, keep it alive for a grace period.
///
/// The opener returns `false` when the host refused (the popup-blocker
/// case); that surfaces as [`DeliveryError::Blocked`] with an instruction
/// the caller can show the user.
pub struct OpenInViewer {
    opener: Box<dyn Fn(&Path) -> bool + Send + Sync>,
    grace: Duration,
}

impl OpenInViewer {
    pub fn new(opener: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        Self {
            opener: Box::new(opener),
            grace: Duration::from_secs(60),
        }
    }

    /// Override how long the transient file outlives the handoff.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl DeliveryStrategy for OpenInViewer {
    fn deliver(&self, document: Vec<u8>, file_name: &str) -> Result<Receipt, DeliveryError> {
        let tmp = NamedTempFile::with_suffix(".pdf").map_err(|e| DeliveryError::Io {
            path: PathBuf::from(file_name),
            source: e,
        })?;
        std::fs::write(tmp.path(), &document).map_err(|e| DeliveryError::Io {
            path: tmp.path().to_path_buf(),
            source: e,
        })?;

        let temp_path = tmp.into_temp_path();
        let path = temp_path.to_path_buf();

        if !(self.opener)(&path) {
            // The temp file is dropped (deleted) right here; there is
            // nothing for the user to fish out of a dead handoff.
            return Err(DeliveryError::Blocked {
                hint: format!("the viewer refused to open '{file_name}'; save the file manually"),
            });
        }

        debug!(
            "Opened {} in viewer; releasing in {:?}",
            path.display(),
            self.grace
        );
        Ok(Receipt {
            delivered: Delivered::Opened { path },
            release: Some((ReleaseGuard { _temp: temp_path }, self.grace)),
        })
    }
}
