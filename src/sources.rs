//! The built-in sources, wired from configuration.

use std::sync::Arc;

use chrono::{Datelike, Local};

use crate::acquisition::action::treasury_url;
use crate::acquisition::{
    AcquisitionAction, DetectionMode, DownloadWatcher, ExternalCommand, HttpDownload, RawSlot,
    SbsHistoryQuery, SourceExtractor,
};
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::execution::UnitRegistry;
use crate::observability::PipelineObserver;
use crate::processing::{mapping, GoldStore, SourceNormalizer};

/// Identity, raw-store slot and detection mode of a built-in source.
struct SourceDef {
    id: &'static str,
    slot: &'static str,
    mode: DetectionMode,
}

const TREASURY: SourceDef = SourceDef {
    id: "treasury",
    slot: "Treasury.csv",
    mode: DetectionMode::LatestFresh,
};
const SBS_SOBERANA: SourceDef = SourceDef {
    id: "sbs_soberana",
    slot: "sbs_soberana.xls",
    mode: DetectionMode::LatestFresh,
};
const SBS_BCRP: SourceDef = SourceDef {
    id: "sbs_bcrp",
    slot: "sbs_bcrp.xls",
    mode: DetectionMode::LatestFresh,
};
const CURVA_DOLARES: SourceDef = SourceDef {
    id: "curva_dolares",
    slot: "curva_dolares.xls",
    mode: DetectionMode::LatestFresh,
};
const SURA_FONDO: SourceDef = SourceDef {
    id: "sura_fondo",
    slot: "sura_fondo.xls",
    mode: DetectionMode::SnapshotDiff,
};

fn boxed(action: impl AcquisitionAction + 'static) -> Box<dyn AcquisitionAction> {
    Box::new(action)
}

/// One extractor per built-in source, fund quotes included.
pub fn extraction_units(
    config: &PipelineConfig,
    observer: Arc<dyn PipelineObserver>,
) -> PipelineResult<UnitRegistry> {
    let src = &config.sources;
    let year = src.year.unwrap_or_else(|| Local::now().year());
    let timeout = src.http_timeout();

    let actions: Vec<(SourceDef, Box<dyn AcquisitionAction>)> = vec![
        (
            TREASURY,
            boxed(HttpDownload::new(
                treasury_url(&src.treasury_url_template, year),
                format!("daily-treasury-rates-{year}.csv"),
                timeout,
            )?),
        ),
        (
            SBS_SOBERANA,
            boxed(SbsHistoryQuery::new(
                &src.sbs_spreads_url,
                &src.soberana_curve_code,
                year,
                "Spreads_Consulta_Historica.xls",
                timeout,
            )?),
        ),
        (
            SBS_BCRP,
            boxed(SbsHistoryQuery::new(
                &src.sbs_curves_url,
                &src.bcrp_curve_code,
                year,
                format!("Curvas_Consulta_Historica_{}.xls", src.bcrp_curve_code),
                timeout,
            )?),
        ),
        (
            CURVA_DOLARES,
            boxed(SbsHistoryQuery::new(
                &src.sbs_curves_url,
                &src.dolares_curve_code,
                year,
                format!("Curvas_Consulta_Historica_{}.xls", src.dolares_curve_code),
                timeout,
            )?),
        ),
        (
            SURA_FONDO,
            boxed(ExternalCommand::new(src.fund_command.clone(), src.fund_args.clone())),
        ),
    ];

    let watch = config.watch.to_options();
    let mut registry = UnitRegistry::new();
    for (def, action) in actions {
        let slot = RawSlot::new(def.id, &config.raw_dir, def.slot, watch.partial_suffix());
        let watcher = DownloadWatcher::new(&config.download_dir, watch.clone());
        registry.register(Box::new(SourceExtractor::new(
            action,
            def.mode,
            watcher,
            slot,
            Arc::clone(&observer),
        )));
    }
    Ok(registry)
}

/// One normalizer per mapping (built-in, then overrides from `mappings_path`).
///
/// Fails when the gold directory cannot be created or the mapping file is unusable.
pub fn transform_units(
    config: &PipelineConfig,
    observer: Arc<dyn PipelineObserver>,
) -> PipelineResult<UnitRegistry> {
    let gold = GoldStore::new(&config.gold_dir, config.gold_format);
    gold.ensure_dir()?;

    let overrides = match &config.mappings_path {
        Some(path) => mapping::load_mappings(path)?,
        None => Vec::new(),
    };

    let mut registry = UnitRegistry::new();
    for m in mapping::merge(mapping::builtin(), overrides) {
        registry.register(Box::new(SourceNormalizer::new(
            m,
            &config.raw_dir,
            gold.clone(),
            Arc::clone(&observer),
        )));
    }
    Ok(registry)
}
