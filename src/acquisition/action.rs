//! Acquisition actions: whatever makes a source's file appear in the download directory.
//!
//! Actions only *trigger* downloads. Detecting completion and publishing into the raw store
//! is the extractor's job, so every action here writes through a partial-suffixed file and
//! renames it when done, the same way a browser does.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use reqwest::blocking::Client;
use scraper::{Html, Selector};

use crate::error::{PipelineError, PipelineResult};

/// Where and for whom an action downloads.
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionContext<'a> {
    pub source_id: &'a str,
    pub download_dir: &'a Path,
    pub partial_suffix: &'a str,
}

/// Triggers a download into `ctx.download_dir`.
pub trait AcquisitionAction {
    fn acquire(&mut self, ctx: &AcquisitionContext<'_>) -> PipelineResult<()>;
}

impl<F> AcquisitionAction for F
where
    F: FnMut(&AcquisitionContext<'_>) -> PipelineResult<()>,
{
    fn acquire(&mut self, ctx: &AcquisitionContext<'_>) -> PipelineResult<()> {
        self(ctx)
    }
}

/// Stream `body` to `<file_name><partial suffix>` and rename it to `file_name` once complete.
pub fn save_download(
    ctx: &AcquisitionContext<'_>,
    file_name: &str,
    body: &mut dyn Read,
) -> PipelineResult<PathBuf> {
    let final_path = ctx.download_dir.join(file_name);
    let partial = ctx
        .download_dir
        .join(format!("{file_name}{}", ctx.partial_suffix));

    let written = File::create(&partial).and_then(|mut f| io::copy(body, &mut f));
    if let Err(e) = written.and_then(|_| fs::rename(&partial, &final_path)) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }
    Ok(final_path)
}

fn http_client(timeout: Duration) -> PipelineResult<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("rate-curves/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Plain HTTP GET of a file.
#[derive(Debug, Clone)]
pub struct HttpDownload {
    url: String,
    file_name: String,
    client: Client,
}

impl HttpDownload {
    pub fn new(
        url: impl Into<String>,
        file_name: impl Into<String>,
        timeout: Duration,
    ) -> PipelineResult<Self> {
        Ok(Self {
            url: url.into(),
            file_name: file_name.into(),
            client: http_client(timeout)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl AcquisitionAction for HttpDownload {
    fn acquire(&mut self, ctx: &AcquisitionContext<'_>) -> PipelineResult<()> {
        tracing::info!(source = ctx.source_id, url = %self.url, "downloading");
        let mut response = self.client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::action(format!(
                "HTTP {status} while downloading {}",
                self.url
            )));
        }
        save_download(ctx, &self.file_name, &mut response)?;
        Ok(())
    }
}

/// Treasury's yearly par-yield CSV URL for `year`.
pub fn treasury_url(template: &str, year: i32) -> String {
    template.replace("{year}", &year.to_string())
}

/// Historical query form on the SBS curve pages.
///
/// The page lists the available process dates in a `<select id="as_fec_cons">` that depends on
/// the selected curve. The query posts the curve code first to get that list, picks the
/// earliest date of the target year, then submits the query that returns the export.
#[derive(Debug, Clone)]
pub struct SbsHistoryQuery {
    url: String,
    curve_code: String,
    year: i32,
    file_name: String,
    client: Client,
}

impl SbsHistoryQuery {
    pub const CURVE_FIELD: &'static str = "as_tip_curva";
    pub const DATE_FIELD: &'static str = "as_fec_cons";

    pub fn new(
        url: impl Into<String>,
        curve_code: impl Into<String>,
        year: i32,
        file_name: impl Into<String>,
        timeout: Duration,
    ) -> PipelineResult<Self> {
        Ok(Self {
            url: url.into(),
            curve_code: curve_code.into(),
            year,
            file_name: file_name.into(),
            client: http_client(timeout)?,
        })
    }
}

impl AcquisitionAction for SbsHistoryQuery {
    fn acquire(&mut self, ctx: &AcquisitionContext<'_>) -> PipelineResult<()> {
        tracing::info!(source = ctx.source_id, curve = %self.curve_code, "selecting curve");
        let page = self
            .client
            .post(&self.url)
            .form(&[(Self::CURVE_FIELD, self.curve_code.as_str())])
            .send()?
            .error_for_status()?
            .text()?;

        let mut fields = vec![(Self::CURVE_FIELD, self.curve_code.clone())];
        match earliest_date_option(&page, self.year) {
            Some(start) => {
                tracing::info!(source = ctx.source_id, start = %start, "start date selected");
                fields.push((Self::DATE_FIELD, start));
            }
            None => tracing::warn!(
                source = ctx.source_id,
                year = self.year,
                "no process date for the year, using the page default"
            ),
        }
        fields.push(("Consultar", "Consultar".to_string()));

        let mut response = self
            .client
            .post(&self.url)
            .form(&fields)
            .send()?
            .error_for_status()?;
        save_download(ctx, &self.file_name, &mut response)?;
        Ok(())
    }
}

/// The earliest `dd/mm/yyyy` option of `year` in the process-date select, as it appears in
/// the page.
pub fn earliest_date_option(page: &str, year: i32) -> Option<String> {
    let document = Html::parse_document(page);
    let sel = Selector::parse(&format!("select#{} option", SbsHistoryQuery::DATE_FIELD)).ok()?;

    document
        .select(&sel)
        .filter_map(|opt| opt.value().attr("value"))
        .filter_map(|value| {
            let date = NaiveDate::parse_from_str(value.trim(), "%d/%m/%Y").ok()?;
            (date.year() == year).then(|| (date, value.trim().to_string()))
        })
        .min_by_key(|(date, _)| *date)
        .map(|(_, value)| value)
}

/// Runs an external program (typically a browser automation script) that downloads into the
/// directory given in `DOWNLOAD_DIR`.
#[derive(Debug, Clone, Default)]
pub struct ExternalCommand {
    program: Option<String>,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: Option<String>, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

impl AcquisitionAction for ExternalCommand {
    fn acquire(&mut self, ctx: &AcquisitionContext<'_>) -> PipelineResult<()> {
        let program = self.program.as_deref().ok_or_else(|| {
            PipelineError::action(format!(
                "no acquisition command configured for '{}'",
                ctx.source_id
            ))
        })?;

        tracing::info!(source = ctx.source_id, program, "running acquisition command");
        let status = Command::new(program)
            .args(&self.args)
            .env("DOWNLOAD_DIR", ctx.download_dir)
            .env("SOURCE_ID", ctx.source_id)
            .status()?;
        if !status.success() {
            return Err(PipelineError::action(format!("'{program}' exited with {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{
        earliest_date_option, save_download, treasury_url, AcquisitionContext, ExternalCommand,
    };
    use super::AcquisitionAction;

    #[test]
    fn earliest_option_of_the_year_is_selected() {
        let page = r#"<form><select id="as_fec_cons">
            <option value="15/01/2025">15/01/2025</option>
            <option value="31/12/2024">31/12/2024</option>
            <option value="02/01/2025">02/01/2025</option>
            <option value="bogus">bogus</option>
        </select></form>"#;
        assert_eq!(earliest_date_option(page, 2025).as_deref(), Some("02/01/2025"));
        assert_eq!(earliest_date_option(page, 2023), None);
    }

    #[test]
    fn save_download_leaves_only_the_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AcquisitionContext {
            source_id: "treasury",
            download_dir: dir.path(),
            partial_suffix: ".crdownload",
        };
        let mut body: &[u8] = b"Date,1 Mo\n";
        let path = save_download(&ctx, "daily.csv", &mut body).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Date,1 Mo\n");
        assert!(!dir.path().join("daily.csv.crdownload").exists());
    }

    #[test]
    fn treasury_url_substitutes_every_year_placeholder() {
        let url = treasury_url("https://example.test/{year}/all?value={year}", 2025);
        assert_eq!(url, "https://example.test/2025/all?value=2025");
    }

    #[test]
    fn unconfigured_command_fails_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AcquisitionContext {
            source_id: "sura_fondo",
            download_dir: dir.path(),
            partial_suffix: ".crdownload",
        };
        let err = ExternalCommand::default().acquire(&ctx).unwrap_err();
        assert!(err.to_string().contains("no acquisition command configured for 'sura_fondo'"));
    }
}
