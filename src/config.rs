//! Pipeline configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is a valid
//! configuration. Relative paths are resolved against the pipeline home directory.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquisition::WatchOptions;
use crate::error::{PipelineError, PipelineResult};
use crate::processing::GoldFormat;

/// Base directory for all relative paths. Defaults to the current directory.
pub const HOME_ENV: &str = "RATE_CURVES_HOME";
/// Optional JSON configuration file.
pub const CONFIG_ENV: &str = "RATE_CURVES_CONFIG";

/// Download-watcher timings, in config-file units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_ms: u64,
    pub freshness_window_secs: u64,
    pub deadline_secs: u64,
    pub partial_suffixes: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let d = WatchOptions::default();
        Self {
            poll_interval_ms: d.poll_interval.as_millis() as u64,
            freshness_window_secs: d.freshness_window.as_secs(),
            deadline_secs: d.deadline.as_secs(),
            partial_suffixes: d.partial_suffixes,
        }
    }
}

impl WatchConfig {
    pub fn to_options(&self) -> WatchOptions {
        WatchOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            deadline: Duration::from_secs(self.deadline_secs),
            freshness_window: Duration::from_secs(self.freshness_window_secs),
            partial_suffixes: self.partial_suffixes.clone(),
        }
    }
}

/// Per-source acquisition parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Year to download; the current year when unset.
    pub year: Option<i32>,
    pub http_timeout_secs: u64,
    /// Treasury CSV URL; `{year}` is substituted.
    pub treasury_url_template: String,
    pub sbs_spreads_url: String,
    pub sbs_curves_url: String,
    pub soberana_curve_code: String,
    pub bcrp_curve_code: String,
    pub dolares_curve_code: String,
    /// Program that downloads the fund-quote export (it needs a real browser).
    pub fund_command: Option<String>,
    pub fund_args: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            year: None,
            http_timeout_secs: 30,
            treasury_url_template: "https://home.treasury.gov/resource-center/data-chart-center/interest-rates/daily-treasury-rates.csv/{year}/all?type=daily_treasury_yield_curve&field_tdr_date_value={year}&page&_format=csv".to_string(),
            sbs_spreads_url: "https://www.sbs.gob.pe/app/pp/Spreads/Spreads_Consulta_Historica.asp".to_string(),
            sbs_curves_url: "http://www.sbs.gob.pe/app/pp/CurvaSoberana/Curvas_Consulta_Historica.asp".to_string(),
            soberana_curve_code: "CCPSS".to_string(),
            bcrp_curve_code: "CCCDBCRP".to_string(),
            dolares_curve_code: "CCSDF".to_string(),
            fund_command: None,
            fund_args: Vec::new(),
        }
    }
}

impl SourcesConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where acquisition actions drop their files.
    pub download_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub gold_dir: PathBuf,
    pub log_dir: PathBuf,
    pub gold_format: GoldFormat,
    pub watch: WatchConfig,
    /// Pause between extraction units.
    pub cooldown_ms: u64,
    /// Pause between transformation units.
    pub transform_cooldown_ms: u64,
    /// Working directory for the extraction phase only.
    pub extraction_workdir: Option<PathBuf>,
    pub sources: SourcesConfig,
    /// JSON list of schema mappings overriding or extending the built-in ones.
    pub mappings_path: Option<PathBuf>,
    pub extraction_units: Vec<String>,
    pub transform_units: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("data/downloads"),
            raw_dir: PathBuf::from("data/raw"),
            gold_dir: PathBuf::from("data/gold"),
            log_dir: PathBuf::from("logs"),
            gold_format: GoldFormat::default(),
            watch: WatchConfig::default(),
            cooldown_ms: 1_000,
            transform_cooldown_ms: 0,
            extraction_workdir: None,
            sources: SourcesConfig::default(),
            mappings_path: None,
            extraction_units: names(&["treasury", "sbs_soberana", "sbs_bcrp", "curva_dolares"]),
            transform_units: names(&["treasury", "sbs_soberana", "sbs_bcrp", "curva_dolares"]),
        }
    }
}

impl PipelineConfig {
    /// Build the configuration from `RATE_CURVES_HOME` and `RATE_CURVES_CONFIG`.
    pub fn from_env() -> PipelineResult<Self> {
        let home = env::var_os(HOME_ENV).map(PathBuf::from);
        let file = env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load(home.as_deref(), file.as_deref())
    }

    /// Defaults, overlaid with `file` when given, with relative paths resolved against `home`.
    ///
    /// A relative `file` is itself looked up under `home`. Resolved paths are always absolute.
    pub fn load(home: Option<&Path>, file: Option<&Path>) -> PipelineResult<Self> {
        let home = std::path::absolute(home.unwrap_or_else(|| Path::new(".")))?;
        let home = home.as_path();
        let mut config = match file {
            Some(f) => {
                let path = resolve(home, f);
                let text = fs::read_to_string(&path).map_err(|e| {
                    PipelineError::config(format!("cannot read {}: {e}", path.display()))
                })?;
                serde_json::from_str(&text)?
            }
            None => Self::default(),
        };
        config.resolve_paths(home);
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, home: &Path) {
        for dir in [
            &mut self.download_dir,
            &mut self.raw_dir,
            &mut self.gold_dir,
            &mut self.log_dir,
        ] {
            *dir = resolve(home, dir.as_path());
        }
        if let Some(dir) = self.extraction_workdir.as_mut() {
            *dir = resolve(home, dir.as_path());
        }
        if let Some(path) = self.mappings_path.as_mut() {
            *path = resolve(home, path.as_path());
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.watch.poll_interval_ms == 0 {
            return Err(PipelineError::config("watch.poll_interval_ms must be > 0"));
        }
        if self.watch.deadline_secs == 0 {
            return Err(PipelineError::config("watch.deadline_secs must be > 0"));
        }
        if self.watch.partial_suffixes.is_empty() {
            return Err(PipelineError::config("watch.partial_suffixes must not be empty"));
        }
        if self.watch.partial_suffixes.iter().any(|s| s.is_empty()) {
            return Err(PipelineError::config(
                "watch.partial_suffixes must not contain empty strings",
            ));
        }
        if self.sources.http_timeout_secs == 0 {
            return Err(PipelineError::config("sources.http_timeout_secs must be > 0"));
        }
        if self.gold_format == GoldFormat::Xlsx && !cfg!(feature = "excel") {
            return Err(PipelineError::config(
                "gold_format 'xlsx' needs the 'excel' feature",
            ));
        }
        Ok(())
    }
}

fn resolve(home: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use super::PipelineConfig;
    use crate::error::PipelineError;

    #[test]
    fn defaults_resolve_under_home() {
        let config = PipelineConfig::load(Some(Path::new("/srv/curves")), None).unwrap();
        assert_eq!(config.raw_dir, Path::new("/srv/curves/data/raw"));
        assert_eq!(config.gold_dir, Path::new("/srv/curves/data/gold"));
        assert_eq!(config.extraction_units.len(), 4);
        assert_eq!(config.watch.to_options().poll_interval, Duration::from_secs(1));
        assert_eq!(config.sources.soberana_curve_code, "CCPSS");
    }

    #[test]
    fn relative_home_yields_absolute_paths() {
        let config = PipelineConfig::load(Some(Path::new("curves")), None).unwrap();
        for dir in [&config.download_dir, &config.raw_dir, &config.gold_dir, &config.log_dir] {
            assert!(dir.is_absolute(), "{}", dir.display());
        }
        assert!(config.raw_dir.ends_with("curves/data/raw"));
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let home = tempfile::tempdir().unwrap();
        fs::write(
            home.path().join("pipeline.json"),
            r#"{
                "gold_dir": "/abs/gold",
                "gold_format": "csv",
                "watch": { "deadline_secs": 5 },
                "sources": { "year": 2024, "fund_command": "fetch-fund" },
                "extraction_units": ["treasury", "sura_fondo"]
            }"#,
        )
        .unwrap();

        let config =
            PipelineConfig::load(Some(home.path()), Some(Path::new("pipeline.json"))).unwrap();
        assert_eq!(config.gold_dir, Path::new("/abs/gold"));
        assert_eq!(config.raw_dir, home.path().join("data/raw"));
        assert_eq!(config.watch.deadline_secs, 5);
        assert_eq!(config.watch.poll_interval_ms, 1_000);
        assert_eq!(config.sources.year, Some(2024));
        assert_eq!(config.sources.fund_command.as_deref(), Some("fetch-fund"));
        assert_eq!(config.sources.dolares_curve_code, "CCSDF");
        assert_eq!(config.extraction_units, vec!["treasury", "sura_fondo"]);
        assert_eq!(config.transform_units.len(), 4);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let home = tempfile::tempdir().unwrap();
        fs::write(
            home.path().join("bad.json"),
            r#"{ "watch": { "poll_interval_ms": 0 } }"#,
        )
        .unwrap();
        let err = PipelineConfig::load(Some(home.path()), Some(Path::new("bad.json"))).unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));

        fs::write(
            home.path().join("no_suffix.json"),
            r#"{ "watch": { "partial_suffixes": [] } }"#,
        )
        .unwrap();
        let err = PipelineConfig::load(Some(home.path()), Some(Path::new("no_suffix.json")))
            .unwrap_err();
        assert!(err.to_string().contains("partial_suffixes"));

        let err = PipelineConfig::load(Some(home.path()), Some(Path::new("absent.json")))
            .unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
