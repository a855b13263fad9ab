// src/pipeline/run.rs

//! Run lifecycle: start, paginate, classify, finish.
//!
//! Every started run is finished exactly once. When anything inside the run
//! fails the run is recorded as `fail` with zero counts and the error
//! message, and the original error is returned to the caller. If the
//! `success` write itself fails, that error is returned and no second
//! completion is attempted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, Quote, QuoteEntry, RunCompletion};
use crate::pipeline::context::{RetryPolicy, RunContext};
use crate::pipeline::detect::{ChangeDetector, ChangeSet};
use crate::pipeline::ledger::RunLedger;
use crate::pipeline::paginate::{PaginationOutcome, Paginator};
use crate::services::{FailureCapture, PageFetcher};
use crate::storage::QuoteStore;

/// Result of a successful run, handed to report and export consumers.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub pages_scraped: usize,
    /// Distinct quotations observed by this run
    pub total_seen: usize,
    pub new_quotes: Vec<QuoteEntry>,
    pub changed_quotes: Vec<QuoteEntry>,
    pub disappeared_quotes: Vec<QuoteEntry>,
    /// Unchanged observations; a quotation repeated within the run counts
    /// once per repeat, so this may exceed `total_seen - new - changed`
    pub unchanged_count: usize,
    /// Pages whose attempts were exhausted
    pub failed_pages: Vec<usize>,
    pub skipped_records: usize,
}

impl RunReport {
    /// Package pagination and classification results.
    pub fn assemble(ctx: &RunContext, outcome: &PaginationOutcome, changes: &ChangeSet) -> Self {
        let entries = |quotes: &[Quote]| -> Vec<QuoteEntry> {
            quotes.iter().map(QuoteEntry::from).collect()
        };

        Self {
            run_id: ctx.run_id.clone(),
            started_at: ctx.started_at,
            pages_scraped: outcome.pages_scraped,
            total_seen: changes.seen_count,
            new_quotes: entries(&changes.new),
            changed_quotes: entries(&changes.updated),
            disappeared_quotes: entries(&changes.disappeared),
            unchanged_count: changes.unchanged.len(),
            failed_pages: outcome.failed_pages.clone(),
            skipped_records: outcome.skipped_records,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.change_count() > 0
    }

    pub fn change_count(&self) -> usize {
        self.new_quotes.len() + self.changed_quotes.len() + self.disappeared_quotes.len()
    }
}

/// Scrape engine bound to one store.
pub struct Engine<S: QuoteStore> {
    store: S,
    start_url: String,
    retry: RetryPolicy,
    capture: FailureCapture,
}

impl<S: QuoteStore> Engine<S> {
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store,
            start_url: config.scraper.start_url.clone(),
            retry: RetryPolicy::from_config(&config.scraper),
            capture: FailureCapture::new(config.paths.failure_dir.clone()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute one run with `fetcher`, which is consumed and closed.
    ///
    /// Takes `&mut self` so an engine can only have one run in progress.
    pub async fn run_scrape<F: PageFetcher>(
        &mut self,
        fetcher: F,
        max_pages: Option<usize>,
    ) -> Result<RunReport> {
        let ledger = RunLedger::new(&self.store);
        let run = ledger.start_run()?;
        log::info!("Starting run {}", run.run_id);

        let ctx = RunContext {
            run_id: run.run_id,
            started_at: run.started_at,
            max_pages,
            retry: self.retry,
            capture: self.capture.clone(),
        };

        match self.execute(&ctx, fetcher).await {
            Ok(report) => {
                let completion = RunCompletion::success(report.pages_scraped, report.total_seen);
                if let Err(e) = ledger.finish_run(&ctx.run_id, &completion) {
                    log::error!("Could not record success of run {}: {}", ctx.run_id, e);
                    return Err(e);
                }
                log::info!(
                    "Run {} finished: {} pages, {} quotes seen",
                    report.run_id,
                    report.pages_scraped,
                    report.total_seen
                );
                Ok(report)
            }
            Err(e) => {
                log::error!("Run {} failed: {}", ctx.run_id, e);
                if let Err(ledger_err) =
                    ledger.finish_run(&ctx.run_id, &RunCompletion::failure(e.to_string()))
                {
                    log::error!("Could not record failure of run {}: {}", ctx.run_id, ledger_err);
                }
                Err(e)
            }
        }
    }

    async fn execute<F: PageFetcher>(&self, ctx: &RunContext, fetcher: F) -> Result<RunReport> {
        let mut paginator = Paginator::new(fetcher);
        let outcome = paginator.paginate(ctx, &self.start_url).await?;

        if !outcome.failed_pages.is_empty() {
            log::warn!(
                "Run {}: {} page(s) exhausted their retries",
                ctx.run_id,
                outcome.failed_pages.len()
            );
        }

        let changes = ChangeDetector::new(&self.store).classify(&ctx.run_id, &outcome.records)?;
        Ok(RunReport::assemble(ctx, &outcome, &changes))
    }
}
