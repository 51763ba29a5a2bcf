//! Run logging.
//!
//! Components receive an `Arc<dyn PipelineObserver>` from the controller instead of reaching
//! for a global logger. The default handle fans out to [`TracingObserver`] (console, via
//! `tracing`) and [`FileObserver`] (a dated log file).

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;

use crate::types::{Phase, PhaseReport, PipelineSummary, UnitResult};

/// Severity classification for pipeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// A unit reported that it failed.
    Error,
    /// A unit crashed, or the run itself could not continue.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("INFO"),
            Self::Warning => f.write_str("WARNING"),
            Self::Error => f.write_str("ERROR"),
            Self::Critical => f.write_str("CRITICAL"),
        }
    }
}

/// Observer interface for pipeline progress.
///
/// Every method has a no-op default so implementors only override what they record.
pub trait PipelineObserver: Send + Sync {
    /// Free-form event from a component (e.g. a normalizer explaining a failure).
    fn on_event(&self, _severity: Severity, _component: &str, _message: &str) {}

    /// Called when a phase starts.
    fn on_phase_started(&self, _phase: Phase) {}

    /// Called once per unit, after it finished, failed or crashed.
    fn on_unit_finished(&self, _phase: Phase, _severity: Severity, _result: &UnitResult) {}

    /// Called when every unit of a phase has run.
    fn on_phase_finished(&self, _report: &PhaseReport) {}

    /// Called once at the end of a completed run.
    fn on_run_finished(&self, _summary: &PipelineSummary) {}
}

/// Observer that records nothing.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_event(&self, severity: Severity, component: &str, message: &str) {
        for o in &self.observers {
            o.on_event(severity, component, message);
        }
    }

    fn on_phase_started(&self, phase: Phase) {
        for o in &self.observers {
            o.on_phase_started(phase);
        }
    }

    fn on_unit_finished(&self, phase: Phase, severity: Severity, result: &UnitResult) {
        for o in &self.observers {
            o.on_unit_finished(phase, severity, result);
        }
    }

    fn on_phase_finished(&self, report: &PhaseReport) {
        for o in &self.observers {
            o.on_phase_finished(report);
        }
    }

    fn on_run_finished(&self, summary: &PipelineSummary) {
        for o in &self.observers {
            o.on_run_finished(summary);
        }
    }
}

/// Forwards events to `tracing`.
///
/// `Critical` has no tracing level of its own: it is emitted at `ERROR` with `critical = true`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, severity: Severity, component: &str, message: &str) {
        match severity {
            Severity::Info => tracing::info!(component, "{message}"),
            Severity::Warning => tracing::warn!(component, "{message}"),
            Severity::Error => tracing::error!(component, "{message}"),
            Severity::Critical => tracing::error!(component, critical = true, "{message}"),
        }
    }

    fn on_phase_started(&self, phase: Phase) {
        tracing::info!(%phase, "phase started");
    }

    fn on_unit_finished(&self, phase: Phase, severity: Severity, result: &UnitResult) {
        let unit = result.unit_name.as_str();
        let message = result.message.as_str();
        match severity {
            Severity::Info => tracing::info!(%phase, unit, "ok: {message}"),
            Severity::Warning => tracing::warn!(%phase, unit, "{message}"),
            Severity::Error => tracing::error!(%phase, unit, "failed: {message}"),
            Severity::Critical => {
                tracing::error!(%phase, unit, critical = true, "crash: {message}")
            }
        }
    }

    fn on_phase_finished(&self, report: &PhaseReport) {
        let failures = report.failure_count();
        if failures == 0 {
            tracing::info!(
                phase = %report.phase,
                units = report.results.len(),
                elapsed = ?report.elapsed,
                "phase completed without errors"
            );
        } else {
            tracing::warn!(
                phase = %report.phase,
                failures,
                crashes = report.crashes,
                elapsed = ?report.elapsed,
                "phase completed with errors"
            );
        }
    }

    fn on_run_finished(&self, summary: &PipelineSummary) {
        tracing::info!(
            duration = ?summary.duration,
            failures = summary.total_failures(),
            "pipeline finished"
        );
    }
}

/// Appends pipeline events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// A file observer writing to `<dir>/pipeline_run_YYYYMMDD.log` for today's date.
    pub fn dated(dir: impl AsRef<Path>) -> Self {
        let name = format!("pipeline_run_{}.log", Local::now().format("%Y%m%d"));
        Self::new(dir.as_ref().join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, severity: Severity, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(
                f,
                "[{}] [{severity}] {line}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_event(&self, severity: Severity, component: &str, message: &str) {
        self.append_line(severity, &format!("{component}: {message}"));
    }

    fn on_phase_started(&self, phase: Phase) {
        self.append_line(Severity::Info, &format!(">>> phase {phase} started"));
    }

    fn on_unit_finished(&self, phase: Phase, severity: Severity, result: &UnitResult) {
        let status = match severity {
            Severity::Critical => "CRASH",
            _ if result.success => "OK",
            _ => "FAILED",
        };
        self.append_line(
            severity,
            &format!("{phase} {status} {}: {}", result.unit_name, result.message),
        );
    }

    fn on_phase_finished(&self, report: &PhaseReport) {
        let failures = report.failure_count();
        let severity = if failures == 0 { Severity::Info } else { Severity::Warning };
        self.append_line(
            severity,
            &format!(
                "phase {} finished: units={} failures={} crashes={} elapsed={:?}",
                report.phase,
                report.results.len(),
                failures,
                report.crashes,
                report.elapsed
            ),
        );
    }

    fn on_run_finished(&self, summary: &PipelineSummary) {
        self.append_line(Severity::Info, &format!("pipeline finished: {summary}"));
    }
}
