//! Download-completion detection.
//!
//! A browser or HTTP client drops files into a shared directory asynchronously. The
//! [`DownloadWatcher`] polls that directory until a completed file shows up or the deadline
//! passes.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// How a watcher decides which file is "the" new download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMode {
    /// Newest entry by creation time, if it is younger than the freshness window.
    LatestFresh,
    /// First entry absent from a listing taken before the download was triggered.
    SnapshotDiff,
}

const DEFAULT_PARTIAL_SUFFIX: &str = ".crdownload";

/// Timing and filtering options for a [`DownloadWatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Sleep between directory polls.
    pub poll_interval: Duration,
    /// Upper bound on the whole wait.
    pub deadline: Duration,
    /// Maximum age of a latest-fresh candidate.
    pub freshness_window: Duration,
    /// File-name suffixes marking in-progress transfers.
    pub partial_suffixes: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            deadline: Duration::from_secs(60),
            freshness_window: Duration::from_secs(60),
            partial_suffixes: vec![DEFAULT_PARTIAL_SUFFIX.to_string()],
        }
    }
}

impl WatchOptions {
    /// Suffix used for files this crate writes before they are complete.
    pub fn partial_suffix(&self) -> &str {
        self.partial_suffixes
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_PARTIAL_SUFFIX)
    }

    /// True when `path` carries one of the in-progress suffixes, including the write suffix.
    pub fn is_partial(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        name.ends_with(self.partial_suffix())
            || self.partial_suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }
}

/// Directory listing captured before a download is triggered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    entries: BTreeSet<PathBuf>,
}

impl Baseline {
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains(path)
    }
}

/// What to wait for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    LatestFresh,
    SnapshotDiff(Baseline),
}

impl Detection {
    pub fn mode(&self) -> DetectionMode {
        match self {
            Self::LatestFresh => DetectionMode::LatestFresh,
            Self::SnapshotDiff(_) => DetectionMode::SnapshotDiff,
        }
    }
}

/// Polls a directory for a completed download.
#[derive(Debug, Clone)]
pub struct DownloadWatcher {
    dir: PathBuf,
    opts: WatchOptions,
}

impl DownloadWatcher {
    pub fn new(dir: impl Into<PathBuf>, opts: WatchOptions) -> Self {
        Self {
            dir: dir.into(),
            opts,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn options(&self) -> &WatchOptions {
        &self.opts
    }

    /// Capture every entry currently in the directory, partial files included.
    pub fn snapshot(&self) -> PipelineResult<Baseline> {
        Ok(Baseline {
            entries: self.list_entries()?,
        })
    }

    /// Prepare the detection for `mode`. Snapshot-diff captures its baseline here, so this must
    /// run before the download is triggered.
    pub fn prepare(&self, mode: DetectionMode) -> PipelineResult<Detection> {
        match mode {
            DetectionMode::LatestFresh => Ok(Detection::LatestFresh),
            DetectionMode::SnapshotDiff => self.snapshot().map(Detection::SnapshotDiff),
        }
    }

    /// Block until a completed file is detected, or fail with [`PipelineError::Timeout`].
    pub fn wait(&self, detection: &Detection) -> PipelineResult<PathBuf> {
        let start = Instant::now();
        loop {
            if let Some(found) = self.poll_once(detection)? {
                tracing::debug!(
                    dir = %self.dir.display(),
                    file = %found.display(),
                    mode = ?detection.mode(),
                    waited = ?start.elapsed(),
                    "download detected"
                );
                return Ok(found);
            }

            let elapsed = start.elapsed();
            if elapsed >= self.opts.deadline {
                return Err(PipelineError::Timeout {
                    dir: self.dir.clone(),
                    waited: elapsed,
                });
            }
            std::thread::sleep(self.opts.poll_interval.min(self.opts.deadline - elapsed));
        }
    }

    /// One polling round.
    pub fn poll_once(&self, detection: &Detection) -> PipelineResult<Option<PathBuf>> {
        match detection {
            Detection::LatestFresh => self.latest_fresh(),
            Detection::SnapshotDiff(baseline) => self.first_new(baseline),
        }
    }

    fn latest_fresh(&self) -> PipelineResult<Option<PathBuf>> {
        let newest = self
            .list_entries()?
            .into_iter()
            .filter(|p| !self.opts.is_partial(p))
            .filter_map(|p| {
                let meta = fs::metadata(&p).ok().filter(|m| m.is_file())?;
                let created = meta.created().or_else(|_| meta.modified()).ok()?;
                Some((created, meta.len(), p))
            })
            .max_by_key(|(created, _, _)| *created);

        let Some((created, size, path)) = newest else {
            return Ok(None);
        };

        let age = SystemTime::now()
            .duration_since(created)
            .unwrap_or(Duration::ZERO);
        if age < self.opts.freshness_window && size > 0 {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    fn first_new(&self, baseline: &Baseline) -> PipelineResult<Option<PathBuf>> {
        for path in self.list_entries()? {
            if baseline.contains(&path) || self.opts.is_partial(&path) {
                continue;
            }
            let complete = fs::metadata(&path)
                .map(|m| m.is_file() && m.len() > 0)
                .unwrap_or(false);
            if complete {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    fn list_entries(&self) -> PipelineResult<BTreeSet<PathBuf>> {
        let dir = self.dir.to_str().ok_or_else(|| {
            PipelineError::config(format!(
                "download dir is not valid UTF-8: {}",
                self.dir.display()
            ))
        })?;
        let pattern = format!("{}/*", glob::Pattern::escape(dir));
        let paths = glob::glob(&pattern)
            .map_err(|e| PipelineError::config(format!("invalid watch pattern '{pattern}': {e}")))?;

        let mut out = BTreeSet::new();
        for entry in paths {
            out.insert(entry.map_err(|e| e.into_error())?);
        }
        Ok(out)
    }
}
