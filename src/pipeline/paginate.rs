// src/pipeline/paginate.rs

//! Sequential pagination with bounded retries.
//!
//! Pages are visited one at a time starting from the start url and
//! following each page's next link. A page gets `max_attempts` tries with a
//! fixed backoff in between; when they are all used up the session state is
//! captured and the paginator continues from whatever partial content the
//! fetcher still holds for that url. Without partial content the page
//! yields nothing and pagination stops there.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::ScrapedQuote;
use crate::pipeline::context::RunContext;
use crate::services::{FetchedPage, PageFetcher};

/// What a pagination produced.
#[derive(Debug, Default)]
pub struct PaginationOutcome {
    /// Records in page order, then document order
    pub records: Vec<ScrapedQuote>,
    pub pages_scraped: usize,
    /// 0-based indices of pages whose attempts were exhausted
    pub failed_pages: Vec<usize>,
    /// Records dropped because their markup could not be read
    pub skipped_records: usize,
}

/// Drives a `PageFetcher` across the listing. Owns the fetcher, and with it
/// the fetch session, for its whole lifetime.
pub struct Paginator<F: PageFetcher> {
    fetcher: F,
}

impl<F: PageFetcher> Paginator<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn into_inner(self) -> F {
        self.fetcher
    }

    /// Scrape from `start_url` until no next link or the page cap.
    /// The fetcher is closed on every exit path.
    pub async fn paginate(
        &mut self,
        ctx: &RunContext,
        start_url: &str,
    ) -> Result<PaginationOutcome> {
        let result = self.walk(ctx, start_url).await;
        self.fetcher.close().await;
        result
    }

    async fn walk(&mut self, ctx: &RunContext, start_url: &str) -> Result<PaginationOutcome> {
        let mut outcome = PaginationOutcome::default();
        let mut visited = HashSet::new();
        let mut current = Some(start_url.to_string());

        while let Some(url) = current.take() {
            if ctx.page_limit_reached(outcome.pages_scraped) {
                log::info!("Page limit {:?} reached", ctx.max_pages);
                break;
            }
            if !visited.insert(url.clone()) {
                log::warn!("Next link points back to {}; stopping", url);
                break;
            }

            log::info!("Scraping page: {}", url);
            let page_index = outcome.pages_scraped;

            let page = match self.fetch_with_retry(ctx, &url, page_index).await? {
                Some(page) => page,
                None => {
                    outcome.failed_pages.push(page_index);
                    self.recover(&url).await
                }
            };
            outcome.pages_scraped += 1;

            let mut extracted = 0;
            for record in page.records {
                match record {
                    Ok(quote) => {
                        outcome.records.push(quote);
                        extracted += 1;
                    }
                    Err(e) => {
                        outcome.skipped_records += 1;
                        log::warn!("Error extracting quote on {}: {}", url, e);
                    }
                }
            }
            log::debug!("{} quotes extracted from {}", extracted, url);

            current = page.next_url;
        }

        Ok(outcome)
    }

    /// Try a page up to the attempt budget. `Ok(None)` means every attempt
    /// failed transiently and the failure was captured; non-transient errors
    /// abort the pagination.
    async fn fetch_with_retry(
        &mut self,
        ctx: &RunContext,
        url: &str,
        page_index: usize,
    ) -> Result<Option<FetchedPage>> {
        let attempts = ctx.retry.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.fetcher.fetch_page(url).await {
                Ok(page) => return Ok(Some(page)),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    log::warn!("Attempt {}/{} failed for {}: {}", attempt, attempts, url, e);

                    if attempt == attempts {
                        log::error!("Max retries reached for {}", url);
                        let snapshot = self.fetcher.snapshot(url).await;
                        ctx.capture
                            .capture(&ctx.run_id, page_index, url, &e.to_string(), &snapshot)
                            .await;
                    } else if !ctx.retry.backoff.is_zero() {
                        tokio::time::sleep(ctx.retry.backoff).await;
                    }
                }
            }
        }

        Ok(None)
    }

    /// Best-effort continuation after a page was given up on.
    async fn recover(&mut self, url: &str) -> FetchedPage {
        match self.fetcher.partial_page(url).await {
            Some(page) => {
                log::warn!(
                    "Continuing from partial content of {} ({} records, next link: {})",
                    url,
                    page.records.len(),
                    page.next_url.is_some()
                );
                page
            }
            None => {
                log::warn!("No content recoverable from {}; pagination stops here", url);
                FetchedPage::default()
            }
        }
    }
}
