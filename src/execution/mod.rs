//! Phase execution with failure isolation.
//!
//! This module sits "above" [`crate::acquisition`] and [`crate::processing`] and provides:
//!
//! - [`PipelineUnit`]: the uniform face of an extractor or a normalizer
//! - [`UnitRegistry`]: name → unit lookup, so phases are driven by a list of names
//! - [`Orchestrator`]: runs a phase sequentially, turning errors and panics into results
//! - [`PipelineController`]: extraction, then transformation, with an optional working-directory
//!   switch for the extraction phase

mod controller;
mod registry;
mod workdir;

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{PipelineError, PipelineResult};
use crate::observability::{NoopObserver, PipelineObserver, Severity};
use crate::types::{Phase, PhaseReport, UnitOutcome, UnitResult};

pub use controller::PipelineController;
pub use registry::UnitRegistry;
pub use workdir::WorkdirGuard;

/// A named step of a phase.
///
/// Returning `Err` (or panicking) is a crash; a unit that ran but did not succeed returns
/// `Ok` with an unsuccessful [`UnitOutcome`].
pub trait PipelineUnit {
    fn name(&self) -> &str;
    fn run(&mut self) -> PipelineResult<UnitOutcome>;
}

/// Configuration for an [`Orchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorOptions {
    pub phase: Phase,
    /// Pause between two consecutive units (not after the last one).
    pub cooldown: Duration,
}

impl OrchestratorOptions {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            cooldown: Duration::from_secs(1),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Runs the units of one phase in order; one unit's failure never stops the others.
pub struct Orchestrator {
    opts: OrchestratorOptions,
    observer: Arc<dyn PipelineObserver>,
}

impl Orchestrator {
    pub fn new(opts: OrchestratorOptions) -> Self {
        Self {
            opts,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attach an observer for phase and unit events.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run every unit named in `order`. Always returns one result per name.
    pub fn run<S: AsRef<str>>(&self, registry: &mut UnitRegistry, order: &[S]) -> PhaseReport {
        let phase = self.opts.phase;
        let start = Instant::now();
        self.observer.on_phase_started(phase);

        let mut results = Vec::with_capacity(order.len());
        let mut crashes = 0;

        for (i, name) in order.iter().enumerate() {
            let name = name.as_ref();
            if i > 0 && !self.opts.cooldown.is_zero() {
                std::thread::sleep(self.opts.cooldown);
            }

            tracing::debug!(%phase, unit = name, "running unit");
            let (result, severity) = match registry.get_mut(name) {
                Some(unit) => run_isolated(name, unit),
                None => crashed(
                    name,
                    "missing operation: no unit registered under this name".to_string(),
                ),
            };
            if severity == Severity::Critical {
                crashes += 1;
            }

            self.observer.on_unit_finished(phase, severity, &result);
            results.push(result);
        }

        let report = PhaseReport {
            phase,
            results,
            crashes,
            elapsed: start.elapsed(),
        };
        self.observer.on_phase_finished(&report);
        report
    }
}

fn run_isolated(name: &str, unit: &mut dyn PipelineUnit) -> (UnitResult, Severity) {
    match catch_unwind(AssertUnwindSafe(|| unit.run())) {
        Ok(Ok(outcome)) => {
            let severity = if outcome.success { Severity::Info } else { Severity::Error };
            let result = UnitResult {
                unit_name: name.to_string(),
                success: outcome.success,
                message: outcome.message,
            };
            (result, severity)
        }
        Ok(Err(e)) => crashed(name, e.to_string()),
        Err(payload) => crashed(name, format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn crashed(name: &str, message: String) -> (UnitResult, Severity) {
    let err = PipelineError::Crash {
        unit: name.to_string(),
        message,
    };
    let result = UnitResult {
        unit_name: name.to_string(),
        success: false,
        message: err.to_string(),
    };
    (result, Severity::Critical)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
