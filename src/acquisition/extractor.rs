use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::action::{AcquisitionAction, AcquisitionContext};
use super::slot::RawSlot;
use super::watcher::{DetectionMode, DownloadWatcher};
use crate::error::PipelineResult;
use crate::execution::PipelineUnit;
use crate::observability::{PipelineObserver, Severity};
use crate::types::{RawArtifact, UnitOutcome};

/// A parameterless acquisition unit for one source.
///
/// `run_extraction` never fails: every internal error is reported as an unsuccessful
/// [`UnitOutcome`].
pub trait Extractor {
    fn source_id(&self) -> &str;
    fn run_extraction(&mut self) -> UnitOutcome;
}

/// The one extractor shape every source uses: an acquisition action, a detection mode and a
/// raw-store slot.
pub struct SourceExtractor {
    action: Box<dyn AcquisitionAction>,
    mode: DetectionMode,
    watcher: DownloadWatcher,
    slot: RawSlot,
    observer: Arc<dyn PipelineObserver>,
}

impl SourceExtractor {
    pub fn new(
        action: Box<dyn AcquisitionAction>,
        mode: DetectionMode,
        watcher: DownloadWatcher,
        slot: RawSlot,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            action,
            mode,
            watcher,
            slot,
            observer,
        }
    }

    pub fn slot(&self) -> &RawSlot {
        &self.slot
    }

    fn raw_dir(&self) -> PathBuf {
        let path = self.slot.path();
        path.parent().map(Path::to_path_buf).unwrap_or_default()
    }

    fn try_extract(&mut self) -> PipelineResult<RawArtifact> {
        let raw_dir = self.raw_dir();
        if !raw_dir.as_os_str().is_empty() {
            fs::create_dir_all(&raw_dir)?;
        }
        fs::create_dir_all(self.watcher.dir())?;

        if self.slot.clear()? {
            tracing::debug!(source = self.slot.source_id(), "previous raw file removed");
        }

        let detection = self.watcher.prepare(self.mode)?;
        let ctx = AcquisitionContext {
            source_id: self.slot.source_id(),
            download_dir: self.watcher.dir(),
            partial_suffix: self.watcher.options().partial_suffix(),
        };
        self.action.acquire(&ctx)?;

        let detected = self.watcher.wait(&detection)?;
        self.slot.publish(&detected)
    }
}

impl fmt::Debug for SourceExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceExtractor")
            .field("source_id", &self.slot.source_id())
            .field("mode", &self.mode)
            .field("download_dir", &self.watcher.dir())
            .field("slot", &self.slot.path())
            .finish()
    }
}

impl Extractor for SourceExtractor {
    fn source_id(&self) -> &str {
        self.slot.source_id()
    }

    fn run_extraction(&mut self) -> UnitOutcome {
        match self.try_extract() {
            Ok(artifact) => {
                let message = format!(
                    "saved {} ({} bytes)",
                    artifact.file_path.display(),
                    artifact.byte_size
                );
                self.observer.on_event(Severity::Info, self.slot.source_id(), &message);
                UnitOutcome::ok(message)
            }
            Err(e) => {
                let message = e.to_string();
                self.observer.on_event(Severity::Error, self.slot.source_id(), &message);
                UnitOutcome::failed(message)
            }
        }
    }
}

impl PipelineUnit for SourceExtractor {
    fn name(&self) -> &str {
        self.source_id()
    }

    fn run(&mut self) -> PipelineResult<UnitOutcome> {
        Ok(self.run_extraction())
    }
}
