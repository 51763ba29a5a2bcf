use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use rate_curves::config::PipelineConfig;
use rate_curves::execution::PipelineController;
use rate_curves::observability::{
    CompositeObserver, FileObserver, PipelineObserver, TracingObserver,
};
use rate_curves::{logging, sources, PipelineResult};

fn run() -> PipelineResult<()> {
    let config = PipelineConfig::from_env()?;

    let mut observers: Vec<Arc<dyn PipelineObserver>> = vec![Arc::new(TracingObserver)];
    match fs::create_dir_all(&config.log_dir) {
        Ok(()) => observers.push(Arc::new(FileObserver::dated(&config.log_dir))),
        Err(e) => tracing::warn!(dir = %config.log_dir.display(), error = %e, "file log disabled"),
    }
    let observer: Arc<dyn PipelineObserver> = Arc::new(CompositeObserver::new(observers));

    let extractors = sources::extraction_units(&config, Arc::clone(&observer))?;
    let controller = PipelineController::from_config(&config, Arc::clone(&observer));
    let summary = controller.run(extractors, || {
        sources::transform_units(&config, Arc::clone(&observer))
    })?;

    tracing::info!(%summary, "done");
    Ok(())
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(critical = true, "pipeline aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
