use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::execution::PipelineUnit;
use crate::ingestion::{read_raw_table, ReadOptions};
use crate::observability::{PipelineObserver, Severity};
use crate::types::{CanonicalTable, UnitOutcome};

use super::gold::GoldStore;
use super::mapping::SchemaMapping;
use super::normalize::normalize;

/// Normalizes one source's raw file into the gold store.
pub struct SourceNormalizer {
    mapping: SchemaMapping,
    raw_dir: PathBuf,
    gold: GoldStore,
    observer: Arc<dyn PipelineObserver>,
}

impl SourceNormalizer {
    pub fn new(
        mapping: SchemaMapping,
        raw_dir: impl Into<PathBuf>,
        gold: GoldStore,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            mapping,
            raw_dir: raw_dir.into(),
            gold,
            observer,
        }
    }

    pub fn mapping(&self) -> &SchemaMapping {
        &self.mapping
    }

    pub fn raw_path(&self) -> PathBuf {
        self.raw_dir.join(&self.mapping.raw_file)
    }

    /// Read and normalize a raw file without publishing anything.
    pub fn normalize_file(&self, path: &Path) -> PipelineResult<CanonicalTable> {
        if !path.is_file() {
            return Err(PipelineError::MissingTable {
                message: format!("raw file not found: {}", path.display()),
            });
        }
        let options = ReadOptions {
            header_row: self.mapping.header_row,
            ..ReadOptions::default()
        };
        let table = read_raw_table(path, &options)?;
        normalize(&table, &self.mapping)
    }

    fn try_process(&self) -> PipelineResult<(PathBuf, usize)> {
        let table = self.normalize_file(&self.raw_path())?;
        let written = self.gold.publish(&self.mapping.gold_name, &table)?;
        Ok((written, table.row_count()))
    }

    /// Normalize the raw file and publish it. Failure details go to the observer.
    pub fn process(&self) -> bool {
        let source = self.mapping.source_id.as_str();
        match self.try_process() {
            Ok((path, records)) => {
                self.observer.on_event(
                    Severity::Info,
                    source,
                    &format!("{} written with {records} records", path.display()),
                );
                true
            }
            Err(e) => {
                self.observer.on_event(Severity::Error, source, &e.to_string());
                false
            }
        }
    }
}

impl fmt::Debug for SourceNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceNormalizer")
            .field("source_id", &self.mapping.source_id)
            .field("raw_dir", &self.raw_dir)
            .field("gold", &self.gold)
            .finish()
    }
}

impl PipelineUnit for SourceNormalizer {
    fn name(&self) -> &str {
        &self.mapping.source_id
    }

    fn run(&mut self) -> PipelineResult<UnitOutcome> {
        let gold_name = &self.mapping.gold_name;
        Ok(if self.process() {
            UnitOutcome::ok(format!("{gold_name} processed and saved"))
        } else {
            UnitOutcome::failed(format!("{gold_name} failed"))
        })
    }
}
