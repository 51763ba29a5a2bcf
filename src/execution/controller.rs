use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::observability::{NoopObserver, PipelineObserver, Severity};
use crate::types::{Phase, PhaseReport, PipelineSummary};

use super::{Orchestrator, OrchestratorOptions, UnitRegistry, WorkdirGuard};

const COMPONENT: &str = "pipeline";

/// Runs extraction to completion, then transformation.
///
/// Transformation units are only built once extraction is over, so nothing of the second phase
/// exists while the first one runs.
pub struct PipelineController {
    extraction_order: Vec<String>,
    transform_order: Vec<String>,
    extraction_cooldown: Duration,
    transform_cooldown: Duration,
    extraction_workdir: Option<PathBuf>,
    observer: Arc<dyn PipelineObserver>,
}

impl PipelineController {
    pub fn new(extraction_order: Vec<String>, transform_order: Vec<String>) -> Self {
        Self {
            extraction_order,
            transform_order,
            extraction_cooldown: Duration::from_secs(1),
            transform_cooldown: Duration::ZERO,
            extraction_workdir: None,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn from_config(config: &PipelineConfig, observer: Arc<dyn PipelineObserver>) -> Self {
        Self {
            extraction_order: config.extraction_units.clone(),
            transform_order: config.transform_units.clone(),
            extraction_cooldown: Duration::from_millis(config.cooldown_ms),
            transform_cooldown: Duration::from_millis(config.transform_cooldown_ms),
            extraction_workdir: config.extraction_workdir.clone(),
            observer,
        }
    }

    pub fn with_cooldowns(mut self, extraction: Duration, transform: Duration) -> Self {
        self.extraction_cooldown = extraction;
        self.transform_cooldown = transform;
        self
    }

    /// Run the extraction phase with `dir` as the process working directory.
    pub fn with_extraction_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extraction_workdir = Some(dir.into());
        self
    }

    /// Run both phases.
    ///
    /// Unit failures never abort the run. An error is only returned when a phase cannot start:
    /// the extraction working directory cannot be entered, or `build_transform` fails.
    pub fn run<F>(
        &self,
        mut extractors: UnitRegistry,
        build_transform: F,
    ) -> PipelineResult<PipelineSummary>
    where
        F: FnOnce() -> PipelineResult<UnitRegistry>,
    {
        let start = Instant::now();
        self.observer.on_event(Severity::Info, COMPONENT, "pipeline started");

        let extraction = self.run_extraction(&mut extractors)?;

        let mut transforms = build_transform().map_err(|e| {
            self.observer.on_event(
                Severity::Critical,
                COMPONENT,
                &format!("transformation setup failed: {e}"),
            );
            e
        })?;
        let transformation = Orchestrator::new(
            OrchestratorOptions::new(Phase::Transformation).with_cooldown(self.transform_cooldown),
        )
        .with_observer(Arc::clone(&self.observer))
        .run(&mut transforms, &self.transform_order);

        let summary = PipelineSummary {
            extraction,
            transformation,
            duration: start.elapsed(),
        };
        self.observer.on_run_finished(&summary);
        Ok(summary)
    }

    fn run_extraction(&self, extractors: &mut UnitRegistry) -> PipelineResult<PhaseReport> {
        let _workdir = match &self.extraction_workdir {
            Some(dir) => Some(WorkdirGuard::enter(dir).map_err(|e| {
                let message = format!("cannot enter extraction directory {}: {e}", dir.display());
                self.observer.on_event(Severity::Critical, COMPONENT, &message);
                PipelineError::config(message)
            })?),
            None => None,
        };

        Ok(Orchestrator::new(
            OrchestratorOptions::new(Phase::Extraction).with_cooldown(self.extraction_cooldown),
        )
        .with_observer(Arc::clone(&self.observer))
        .run(extractors, &self.extraction_order))
    }
}
