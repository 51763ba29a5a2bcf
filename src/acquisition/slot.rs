use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::PipelineResult;
use crate::types::RawArtifact;

/// A source's fixed-name slot in the raw store.
///
/// The slot is cleared right before a download is triggered and only written by
/// [`RawSlot::publish`], after the watcher confirmed the download is complete. A reader sees
/// either no file, the previous complete file or the new complete file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSlot {
    source_id: String,
    dir: PathBuf,
    file_name: String,
    partial_suffix: String,
}

impl RawSlot {
    pub fn new(
        source_id: impl Into<String>,
        dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
        partial_suffix: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            dir: dir.into(),
            file_name: file_name.into(),
            partial_suffix: partial_suffix.into(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Full path of the slot file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Delete the slot file if present. Returns whether a file was removed.
    pub fn clear(&self) -> PipelineResult<bool> {
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Move a completed download into the slot, replacing any previous occupant.
    pub fn publish(&self, detected: &Path) -> PipelineResult<RawArtifact> {
        let target = self.path();
        if detected != target {
            if let Err(rename_err) = fs::rename(detected, &target) {
                // Typically a download directory on another filesystem.
                tracing::debug!(
                    from = %detected.display(),
                    to = %target.display(),
                    error = %rename_err,
                    "rename failed, copying into place"
                );
                self.copy_into_place(detected, &target)?;
            }
        }

        let meta = fs::metadata(&target)?;
        Ok(RawArtifact {
            source_id: self.source_id.clone(),
            file_path: target,
            acquired_at: Utc::now(),
            byte_size: meta.len(),
        })
    }

    fn copy_into_place(&self, from: &Path, target: &Path) -> PipelineResult<()> {
        let staging = self
            .dir
            .join(format!("{}{}", self.file_name, self.partial_suffix));
        if let Err(e) = fs::copy(from, &staging).and_then(|_| fs::rename(&staging, target)) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        fs::remove_file(from)?;
        Ok(())
    }
}
