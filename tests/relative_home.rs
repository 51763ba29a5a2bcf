//! Changes the process working directory, so it lives in its own test binary.

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rate_curves::acquisition::{
    AcquisitionContext, DetectionMode, DownloadWatcher, RawSlot, SourceExtractor, WatchOptions,
};
use rate_curves::config::PipelineConfig;
use rate_curves::execution::{PipelineController, UnitRegistry};
use rate_curves::observability::{NoopObserver, PipelineObserver};
use rate_curves::{sources, PipelineResult};

#[test]
fn raw_files_published_under_a_switched_workdir_reach_the_normalizers() {
    let home = tempfile::tempdir().unwrap();
    env::set_current_dir(home.path()).unwrap();
    fs::create_dir("legacy").unwrap();
    fs::write(
        "pipeline.json",
        r#"{
            "extraction_workdir": "legacy",
            "gold_format": "csv",
            "cooldown_ms": 0,
            "extraction_units": ["curva_dolares"],
            "transform_units": ["curva_dolares"]
        }"#,
    )
    .unwrap();

    let config = PipelineConfig::load(None, Some(Path::new("pipeline.json"))).unwrap();
    assert!(config.raw_dir.is_absolute());
    let observer: Arc<dyn PipelineObserver> = Arc::new(NoopObserver);

    let export = fs::read(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/curva_dolares.xls"),
    )
    .unwrap();
    let opts = WatchOptions {
        poll_interval: Duration::from_millis(10),
        deadline: Duration::from_secs(5),
        ..WatchOptions::default()
    };
    let mut extractors = UnitRegistry::new();
    extractors.register(Box::new(SourceExtractor::new(
        Box::new(move |ctx: &AcquisitionContext<'_>| -> PipelineResult<()> {
            fs::write(ctx.download_dir.join("Curvas_Consulta_Historica.xls"), &export)?;
            Ok(())
        }),
        DetectionMode::LatestFresh,
        DownloadWatcher::new(&config.download_dir, opts),
        RawSlot::new("curva_dolares", &config.raw_dir, "curva_dolares.xls", ".crdownload"),
        Arc::clone(&observer),
    )));

    let summary = PipelineController::from_config(&config, Arc::clone(&observer))
        .run(extractors, || sources::transform_units(&config, Arc::clone(&observer)))
        .unwrap();

    assert_eq!(summary.total_failures(), 0);
    let cwd = env::current_dir().unwrap();
    assert!(cwd.join("data/raw/curva_dolares.xls").exists());
    assert!(cwd.join("data/gold/Curva_Dolares_Processed.csv").exists());
    assert!(!cwd.join("legacy/data").exists());
}
