use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rate_curves::acquisition::{
    AcquisitionContext, DetectionMode, DownloadWatcher, RawSlot, SourceExtractor, WatchOptions,
};
use rate_curves::config::PipelineConfig;
use rate_curves::execution::{PipelineController, UnitRegistry};
use rate_curves::observability::{PipelineObserver, Severity};
use rate_curves::processing::GoldFormat;
use rate_curves::types::{Phase, UnitResult};
use rate_curves::{sources, PipelineError, PipelineResult};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[derive(Default)]
struct UnitLog(Mutex<Vec<(Phase, String, Severity)>>);

impl PipelineObserver for UnitLog {
    fn on_unit_finished(&self, phase: Phase, severity: Severity, result: &UnitResult) {
        self.0
            .lock()
            .unwrap()
            .push((phase, result.unit_name.clone(), severity));
    }
}

fn config(home: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::load(Some(home), None).unwrap();
    config.gold_format = GoldFormat::Csv;
    config.cooldown_ms = 0;
    config.extraction_units = vec![
        "treasury".to_string(),
        "sbs_soberana".to_string(),
        "sbs_bcrp".to_string(),
        "curva_dolares".to_string(),
    ];
    config
}

/// Extractor driven by a local action instead of a real download.
fn fake_extractor<F>(
    config: &PipelineConfig,
    id: &str,
    slot: &str,
    observer: Arc<dyn PipelineObserver>,
    action: F,
) -> SourceExtractor
where
    F: FnMut(&AcquisitionContext<'_>) -> PipelineResult<()> + 'static,
{
    let opts = WatchOptions {
        poll_interval: Duration::from_millis(10),
        deadline: Duration::from_secs(5),
        ..WatchOptions::default()
    };
    SourceExtractor::new(
        Box::new(action),
        DetectionMode::LatestFresh,
        DownloadWatcher::new(&config.download_dir, opts),
        RawSlot::new(id, &config.raw_dir, slot, ".crdownload"),
        observer,
    )
}

fn download(
    bytes: Vec<u8>,
    download_name: &'static str,
) -> impl FnMut(&AcquisitionContext<'_>) -> PipelineResult<()> {
    move |ctx: &AcquisitionContext<'_>| {
        fs::write(ctx.download_dir.join(download_name), &bytes)?;
        Ok(())
    }
}

fn soberana_latin1_export() -> Vec<u8> {
    let mut html = b"<html><body><table>\
        <tr><td colspan=\"4\">Spreads - Consulta Historica</td></tr>\
        <tr><th>Fecha de Proceso</th><th>Tipo de Curva</th><th>Indice de Spread</th><th>Clasificaci"
        .to_vec();
    html.push(0xf3);
    html.extend_from_slice(
        b"n</th></tr>\
        <tr><td>02/01/2025</td><td>Soberana Soles</td><td>1.85</td><td>BBB</td></tr>\
        </table></body></html>",
    );
    html
}

#[test]
fn raw_files_flow_through_to_gold_and_failures_stay_isolated() {
    let home = tempfile::tempdir().unwrap();
    let config = config(home.path());
    let log = Arc::new(UnitLog::default());
    let observer: Arc<dyn PipelineObserver> = log.clone();

    let mut extractors = UnitRegistry::new();
    extractors.register(Box::new(fake_extractor(
        &config,
        "treasury",
        "Treasury.csv",
        Arc::clone(&observer),
        download(fs::read(fixture("treasury_2025.csv")).unwrap(), "daily-treasury-rates.csv"),
    )));
    extractors.register(Box::new(fake_extractor(
        &config,
        "sbs_soberana",
        "sbs_soberana.xls",
        Arc::clone(&observer),
        download(soberana_latin1_export(), "Spreads_Consulta_Historica.xls"),
    )));
    extractors.register(Box::new(fake_extractor(
        &config,
        "sbs_bcrp",
        "sbs_bcrp.xls",
        Arc::clone(&observer),
        |_: &AcquisitionContext<'_>| -> PipelineResult<()> {
            Err(PipelineError::Action {
                message: "curve code not offered".to_string(),
            })
        },
    )));
    extractors.register(Box::new(fake_extractor(
        &config,
        "curva_dolares",
        "curva_dolares.xls",
        Arc::clone(&observer),
        download(fs::read(fixture("curva_dolares.xls")).unwrap(), "Curvas_Consulta_Historica.xls"),
    )));

    let summary = PipelineController::from_config(&config, Arc::clone(&observer))
        .run(extractors, || sources::transform_units(&config, Arc::clone(&observer)))
        .unwrap();

    assert_eq!(summary.extraction.results.len(), 4);
    assert_eq!(summary.extraction.failure_count(), 1);
    assert_eq!(summary.extraction.crashes, 0);
    assert_eq!(summary.transformation.results.len(), 4);
    assert_eq!(summary.transformation.failure_count(), 1);
    assert!(!summary.transformation.results[2].success);

    let mut raw: Vec<String> = fs::read_dir(&config.raw_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    raw.sort();
    assert_eq!(raw, vec!["Treasury.csv", "curva_dolares.xls", "sbs_soberana.xls"]);

    let treasury = fs::read_to_string(config.gold_dir.join("Treasury_Processed.csv")).unwrap();
    let lines: Vec<&str> = treasury.lines().collect();
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[0], "Date,Tenor,Rate,CurveType");
    assert_eq!(lines[1], "2025-01-02,1 Mo,4.45,Treasury_USD");
    assert_eq!(lines[5], "2025-01-02,10 Yr,4.57,Treasury_USD");
    assert_eq!(lines[6], "2025-01-03,1 Mo,4.31,Treasury_USD");

    let soberana = fs::read_to_string(config.gold_dir.join("SBS_Soberana_Processed.csv")).unwrap();
    assert_eq!(
        soberana,
        "Date,Tenor,Rate,CurveType,Classification\n2025-01-02,Soberana Soles,1.85,SBS_Soberana_Soles,BBB\n"
    );

    let dolares = fs::read_to_string(config.gold_dir.join("Curva_Dolares_Processed.csv")).unwrap();
    assert_eq!(
        dolares,
        "Date,Tenor,Rate,CurveType\n\
         2025-01-02,30,4.312,Curva_Dolares_CCSDF\n\
         2025-01-02,90,4.2875,Curva_Dolares_CCSDF\n\
         2025-01-03,30,,Curva_Dolares_CCSDF\n"
    );

    assert!(!config.gold_dir.join("SBS_BCRP_Processed.csv").exists());

    let units = log.0.lock().unwrap();
    assert_eq!(units.len(), 8);
    assert_eq!(units[2], (Phase::Extraction, "sbs_bcrp".to_string(), Severity::Error));
    assert_eq!(units[6], (Phase::Transformation, "sbs_bcrp".to_string(), Severity::Error));
}

#[test]
fn second_run_replaces_gold_output() {
    let home = tempfile::tempdir().unwrap();
    let mut config = config(home.path());
    config.extraction_units = vec!["curva_dolares".to_string()];
    config.transform_units = vec!["curva_dolares".to_string()];
    let observer: Arc<dyn PipelineObserver> = Arc::new(UnitLog::default());

    let gold = config.gold_dir.join("Curva_Dolares_Processed.csv");
    fs::create_dir_all(&config.gold_dir).unwrap();
    fs::write(&gold, "Date,Tenor,Rate,CurveType\n1999-01-01,1,1,stale\n").unwrap();

    let mut extractors = UnitRegistry::new();
    extractors.register(Box::new(fake_extractor(
        &config,
        "curva_dolares",
        "curva_dolares.xls",
        Arc::clone(&observer),
        download(fs::read(fixture("curva_dolares.xls")).unwrap(), "export.xls"),
    )));
    let summary = PipelineController::from_config(&config, Arc::clone(&observer))
        .run(extractors, || sources::transform_units(&config, Arc::clone(&observer)))
        .unwrap();

    assert_eq!(summary.total_failures(), 0);
    let text = fs::read_to_string(&gold).unwrap();
    assert!(!text.contains("stale"));
    assert_eq!(text.lines().count(), 4);
}
