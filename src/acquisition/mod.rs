//! Source acquisition: trigger a download, detect its completion, publish it into the raw store.
//!
//! - [`DownloadWatcher`]: polls a download directory (latest-fresh or snapshot-diff).
//! - [`RawSlot`]: atomic replacement of a source's fixed-name raw file.
//! - [`AcquisitionAction`]: what actually causes a file to appear.
//! - [`SourceExtractor`]: the three above wired together for one source.

pub mod action;
mod extractor;
mod slot;
mod watcher;

pub use action::{
    AcquisitionAction, AcquisitionContext, ExternalCommand, HttpDownload, SbsHistoryQuery,
};
pub use extractor::{Extractor, SourceExtractor};
pub use slot::RawSlot;
pub use watcher::{Baseline, Detection, DetectionMode, DownloadWatcher, WatchOptions};
