//! `rate-curves` acquires interest-rate curve files from sources that only offer interactive
//! downloads, and normalizes them into one canonical record schema:
//! `{Date, Tenor, Rate, CurveType, Classification?}`.
//!
//! A run has two phases separated by a hard barrier:
//!
//! 1. **Extraction** ([`acquisition`]): per source, clear its raw slot, trigger the download,
//!    wait for the file to finish arriving ([`acquisition::DownloadWatcher`]), then move it into
//!    the slot ([`acquisition::RawSlot`]).
//! 2. **Transformation** ([`processing`]): per source, read the raw file ([`ingestion`]), apply
//!    its [`processing::SchemaMapping`] and replace the gold output ([`processing::GoldStore`]).
//!
//! Both phases are run by an [`execution::Orchestrator`]: units run one after the other, and a
//! unit that fails, errors or panics becomes a failed [`types::UnitResult`] without stopping the
//! rest.
//!
//! ## Raw formats
//!
//! - **CSV**: `.csv`
//! - **HTML tables**: `.html`, `.htm`, and `.xls` files whose content is actually HTML (the SBS
//!   exports)
//! - **Excel/workbooks** (requires the Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! ## Quick example: run the built-in pipeline
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rate_curves::config::PipelineConfig;
//! use rate_curves::execution::PipelineController;
//! use rate_curves::observability::TracingObserver;
//! use rate_curves::sources;
//!
//! # fn main() -> rate_curves::PipelineResult<()> {
//! let config = PipelineConfig::from_env()?;
//! let observer = Arc::new(TracingObserver);
//! let extractors = sources::extraction_units(&config, observer.clone())?;
//! let summary = PipelineController::from_config(&config, observer.clone())
//!     .run(extractors, || sources::transform_units(&config, observer.clone()))?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`acquisition`]: download detection, raw-store publishing and acquisition actions
//! - [`ingestion`]: raw file readers producing [`types::RawTable`]
//! - [`processing`]: schema mappings, normalization and the gold store
//! - [`execution`]: orchestrators, unit registry and the pipeline controller
//! - [`observability`]: the explicit logging handle passed to every component
//! - [`config`]: configuration from the environment and an optional JSON file
//! - [`sources`]: the built-in sources
//! - [`error`]: error types used across the pipeline

pub mod acquisition;
pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod logging;
pub mod observability;
pub mod processing;
pub mod sources;
pub mod types;

pub use error::{PipelineError, PipelineResult};
