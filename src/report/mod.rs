//! Report and export writers.
//!
//! ## Output Layout
//!
//! ```text
//! {reports_dir}/
//! ├── run_YYYYmmdd_HHMMSS.md    # One per successful run
//! └── summary.md                # Global top authors / tags
//! {exports_dir}/
//! └── stats.json                # Global stats
//! ```

pub mod csv;
pub mod export;
pub mod markdown;
pub mod stats;

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::{Config, Quote, ReportConfig};
use crate::pipeline::RunReport;

pub use export::{ExportFormat, ExportRow};
pub use stats::{QuoteStats, Ranked};

/// Paths written by one `write_all` call.
#[derive(Debug, Clone)]
pub struct WrittenReports {
    pub run_report: PathBuf,
    pub stats: PathBuf,
    pub summary: PathBuf,
}

/// Writes reports under the configured directories.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    reports_dir: PathBuf,
    exports_dir: PathBuf,
    settings: ReportConfig,
}

impl ReportWriter {
    pub fn new(config: &Config) -> Self {
        Self {
            reports_dir: config.paths.reports_dir.clone(),
            exports_dir: config.paths.exports_dir.clone(),
            settings: config.report.clone(),
        }
    }

    /// Write the run report, global stats and summary.
    pub async fn write_all(&self, report: &RunReport, quotes: &[Quote]) -> Result<WrittenReports> {
        let run_report = self.write_run_report(report).await?;
        let (stats, summary) = self.write_stats(quotes).await?;
        Ok(WrittenReports {
            run_report,
            stats,
            summary,
        })
    }

    /// Write `run_<timestamp>.md` for a finished run.
    pub async fn write_run_report(&self, report: &RunReport) -> Result<PathBuf> {
        let now = Utc::now();
        let path = self
            .reports_dir
            .join(format!("run_{}.md", now.format("%Y%m%d_%H%M%S")));

        let body = markdown::render_run_report(report, now, self.settings.sample_size);
        write_bytes(&path, body.as_bytes()).await?;

        log::info!("Run report written to {}", path.display());
        Ok(path)
    }

    /// Write `stats.json` and `summary.md` from every stored quotation.
    pub async fn write_stats(&self, quotes: &[Quote]) -> Result<(PathBuf, PathBuf)> {
        let stats = QuoteStats::collect(quotes, self.settings.stats_limit);

        let stats_path = self.exports_dir.join("stats.json");
        write_bytes(&stats_path, &serde_json::to_vec_pretty(&stats)?).await?;

        let summary_path = self.reports_dir.join("summary.md");
        let summary = markdown::render_summary(&stats, self.settings.top_n);
        write_bytes(&summary_path, summary.as_bytes()).await?;

        log::info!(
            "Stats for {} quotes written to {}",
            stats.total_quotes,
            stats_path.display()
        );
        Ok((stats_path, summary_path))
    }
}

/// Export `quotes` to `out` in `format`.
pub async fn export_quotes(quotes: &[Quote], format: ExportFormat, out: &Path) -> Result<()> {
    let body = export::render(quotes, format)?;
    write_bytes(out, body.as_bytes()).await?;
    log::info!("Exported {} quotes as {} to {}", quotes.len(), format, out.display());
    Ok(())
}

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
