//! QuotePulse CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use quote_pulse::{
    error::{AppError, Result},
    models::{Config, RunStatus},
    pipeline::{Engine, RunLedger},
    report::{self, ExportFormat, ReportWriter},
    services::HttpQuoteFetcher,
    storage::{QuoteStore, SqliteStore},
    utils::console::Console,
};

/// QuotePulse - quotation change tracker
#[derive(Parser, Debug)]
#[command(
    name = "quote-pulse",
    version,
    about = "Scrapes quotations and reports what changed between runs"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "quote-pulse.toml")]
    config: PathBuf,

    /// Path to the SQLite database (overrides paths.database)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape all pages and record what changed
    Scrape {
        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Per-navigation timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Directory for failure artifacts
        #[arg(long)]
        failure_dir: Option<PathBuf>,

        /// First page to scrape
        #[arg(long)]
        start_url: Option<String>,
    },

    /// Show the last run
    Report {
        /// Show the last run's summary and report path
        #[arg(long)]
        last: bool,
    },

    /// List recent runs
    Runs {
        /// Number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Export every stored quotation
    Export {
        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: String,

        /// Output file (default: {exports_dir}/quotes.{format})
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    if let Some(db) = &cli.db {
        config.paths.database = db.clone();
    }
    log::debug!("Loaded configuration from {}", cli.config.display());

    let console = Console::new(false);

    match cli.command {
        Command::Scrape {
            max_pages,
            timeout,
            failure_dir,
            start_url,
        } => {
            if let Some(timeout) = timeout {
                config.scraper.timeout_secs = timeout;
            }
            if let Some(dir) = failure_dir {
                config.paths.failure_dir = dir;
            }
            if let Some(url) = start_url {
                config.scraper.start_url = url;
            }
            if max_pages.is_some() {
                config.scraper.max_pages = max_pages;
            }
            config.validate()?;

            scrape(&config, &console).await?;
        }

        Command::Report { last } => {
            if !last {
                return Err(AppError::validation("nothing to show; pass --last"));
            }
            show_last_run(&config, &console)?;
        }

        Command::Runs { limit } => {
            let store = SqliteStore::open(&config.paths.database)?;
            let runs = RunLedger::new(&store).list_runs(limit)?;

            if runs.is_empty() {
                console.info("No runs found in database.");
            }
            for run in runs {
                console.sub_item(&format!(
                    "{}  {:<7}  {}  pages={} seen={}{}",
                    run.run_id,
                    run.status,
                    run.started_at.to_rfc3339(),
                    run.pages_scraped,
                    run.quotes_seen,
                    run.error.map(|e| format!("  error={e}")).unwrap_or_default()
                ));
            }
        }

        Command::Export { format, out } => {
            let format: ExportFormat = format.parse()?;
            let out = out.unwrap_or_else(|| {
                config
                    .paths
                    .exports_dir
                    .join(format!("quotes.{}", format.extension()))
            });

            let store = SqliteStore::open(&config.paths.database)?;
            let quotes = store.all_quotes()?;
            report::export_quotes(&quotes, format, &out).await?;

            console.success(&format!("Exported {} quotes to {}", quotes.len(), out.display()));
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            console.success("Config OK");
        }
    }

    Ok(())
}

/// Run one scrape, then write the run report and refresh global stats.
async fn scrape(config: &Config, console: &Console) -> Result<()> {
    console.header("QuotePulse scrape");
    console.info(&format!(
        "Starting scrape (db={}, start={}, max_pages={})",
        config.paths.database.display(),
        config.scraper.start_url,
        config
            .scraper
            .max_pages
            .map(|n| n.to_string())
            .unwrap_or_else(|| "all".to_string())
    ));

    let store = SqliteStore::open(&config.paths.database)?;
    let fetcher = HttpQuoteFetcher::new(config)?;
    let mut engine = Engine::new(store, config);

    console.step(1, 2, "Scrape - Fetching and classifying quotes");
    let run = engine.run_scrape(fetcher, config.scraper.max_pages).await?;

    console.step(2, 2, "Report - Writing run report and stats");
    let quotes = engine.store().all_quotes()?;
    let written = ReportWriter::new(config).write_all(&run, &quotes).await?;

    console.summary(
        "Scrape complete",
        &[
            ("Run ID", run.run_id.clone()),
            ("Pages scraped", run.pages_scraped.to_string()),
            ("Quotes seen", run.total_seen.to_string()),
            ("New quotes", run.new_quotes.len().to_string()),
            ("Changed quotes", run.changed_quotes.len().to_string()),
            ("Disappeared quotes", run.disappeared_quotes.len().to_string()),
        ],
    );
    if !run.failed_pages.is_empty() {
        log::warn!("Pages with exhausted retries: {:?}", run.failed_pages);
    }
    console.info("Reports saved to:");
    console.sub_item(&written.run_report.display().to_string());
    console.sub_item(&written.summary.display().to_string());
    console.info(&format!("Stats updated: {}", written.stats.display()));

    Ok(())
}

fn show_last_run(config: &Config, console: &Console) -> Result<()> {
    let store = SqliteStore::open(&config.paths.database)?;
    let Some(run) = RunLedger::new(&store).get_last_run()? else {
        console.info("No runs found in database.");
        return Ok(());
    };

    let mut items = vec![
        ("Run ID", run.run_id.clone()),
        ("Status", run.status.to_string()),
        ("Started at", run.started_at.to_rfc3339()),
        ("Pages scraped", run.pages_scraped.to_string()),
        ("Quotes seen", run.quotes_seen.to_string()),
    ];
    if let Some(finished) = run.finished_at {
        items.push(("Finished at", finished.to_rfc3339()));
    }
    if let Some(error) = &run.error {
        items.push(("Error", error.clone()));
    }
    console.summary("Last run", &items);

    if run.status == RunStatus::Success {
        match latest_run_report(&config.paths.reports_dir) {
            Some(path) => console.info(&format!("Report: {}", path.display())),
            None => console.info(&format!(
                "No run report found in {}",
                config.paths.reports_dir.display()
            )),
        }
    }
    Ok(())
}

/// Newest `run_*.md` in `dir`; names sort by their timestamp.
fn latest_run_report(dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("run_") && n.ends_with(".md"))
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "quote-pulse",
            "runs",
            "--config",
            "other.toml",
            "--db",
            "q.db",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert_eq!(cli.db, Some(PathBuf::from("q.db")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Runs { limit: 10 }));
    }

    #[test]
    fn test_global_options_before_subcommand() {
        let cli = Cli::try_parse_from(["quote-pulse", "-c", "x.toml", "validate"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Command::Validate));
    }
}
