//! End-to-end run lifecycle tests against a temp-dir SQLite store.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use quote_pulse::error::{AppError, Result};
use quote_pulse::models::{
    Config, Quote, QuoteEntry, Run, RunCompletion, RunStatus, ScrapedQuote,
};
use quote_pulse::pipeline::{Engine, RetryPolicy, RunReport};
use quote_pulse::services::{FetchedPage, PageFetcher, fingerprint};
use quote_pulse::storage::{QuoteRefresh, QuoteStore, SqliteStore};

const START: &str = "https://quotes.example/page/1/";

enum Page {
    Quotes(Vec<ScrapedQuote>, Option<&'static str>),
    Fatal,
}

/// Serves a fixed listing keyed by url.
#[derive(Default)]
struct Listing {
    pages: HashMap<String, VecDeque<Page>>,
}

impl Listing {
    fn page(mut self, url: &str, quotes: Vec<ScrapedQuote>, next: Option<&'static str>) -> Self {
        self.pages
            .entry(url.to_string())
            .or_default()
            .push_back(Page::Quotes(quotes, next));
        self
    }

    fn fatal(mut self, url: &str) -> Self {
        self.pages
            .entry(url.to_string())
            .or_default()
            .push_back(Page::Fatal);
        self
    }
}

#[async_trait]
impl PageFetcher for Listing {
    async fn fetch_page(&mut self, url: &str) -> Result<FetchedPage> {
        match self.pages.get_mut(url).and_then(|p| p.pop_front()) {
            Some(Page::Quotes(quotes, next)) => Ok(FetchedPage::new(
                quotes.into_iter().map(Ok).collect(),
                next.map(String::from),
            )),
            Some(Page::Fatal) => Err(AppError::ledger("store went away")),
            None => Err(AppError::navigation(url, "connection refused")),
        }
    }
}

/// Store wrapper that counts ledger completions and can inject faults.
struct CountingStore {
    inner: SqliteStore,
    completions: Mutex<Vec<(String, RunStatus)>>,
    fail_inserts: bool,
    fail_success: bool,
}

impl CountingStore {
    fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            completions: Mutex::new(Vec::new()),
            fail_inserts: false,
            fail_success: false,
        }
    }

    fn completions(&self) -> Vec<(String, RunStatus)> {
        self.completions.lock().unwrap().clone()
    }
}

impl QuoteStore for CountingStore {
    fn get_quote(&self, quote_id: &str) -> Result<Option<Quote>> {
        self.inner.get_quote(quote_id)
    }
    fn insert_quote(&self, quote: &Quote) -> Result<()> {
        if self.fail_inserts {
            return Err(AppError::ledger("disk full"));
        }
        self.inner.insert_quote(quote)
    }
    fn refresh_quote(&self, quote_id: &str, refresh: &QuoteRefresh<'_>) -> Result<()> {
        self.inner.refresh_quote(quote_id, refresh)
    }
    fn record_observation(&self, run_id: &str, quote_id: &str) -> Result<bool> {
        self.inner.record_observation(run_id, quote_id)
    }
    fn observed_quote_ids(&self, run_id: &str) -> Result<HashSet<String>> {
        self.inner.observed_quote_ids(run_id)
    }
    fn insert_run(&self, run: &Run) -> Result<()> {
        self.inner.insert_run(run)
    }
    fn complete_run(
        &self,
        run_id: &str,
        finished_at: DateTime<Utc>,
        completion: &RunCompletion,
    ) -> Result<bool> {
        self.completions
            .lock()
            .unwrap()
            .push((run_id.to_string(), completion.status));
        if self.fail_success && completion.status == RunStatus::Success {
            return Err(AppError::ledger("database is locked"));
        }
        self.inner.complete_run(run_id, finished_at, completion)
    }
    fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        self.inner.get_run(run_id)
    }
    fn last_run(&self) -> Result<Option<Run>> {
        self.inner.last_run()
    }
    fn previous_successful_run(&self, before: DateTime<Utc>) -> Result<Option<String>> {
        self.inner.previous_successful_run(before)
    }
    fn list_runs(&self, limit: usize) -> Result<Vec<Run>> {
        self.inner.list_runs(limit)
    }
    fn all_quotes(&self) -> Result<Vec<Quote>> {
        self.inner.all_quotes()
    }
}

fn quote(text: &str, author: &str, tags: &[&str]) -> ScrapedQuote {
    ScrapedQuote {
        quote_id: fingerprint(text, author),
        text: text.to_string(),
        author: author.to_string(),
        author_url: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn config(tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.scraper.start_url = START.to_string();
    config.paths.failure_dir = tmp.path().join("failures");
    config
}

fn engine<S: QuoteStore>(tmp: &TempDir, store: S) -> Engine<S> {
    Engine::new(store, &config(tmp)).with_retry(RetryPolicy::new(3, Duration::ZERO))
}

fn sqlite(tmp: &TempDir) -> SqliteStore {
    SqliteStore::open(tmp.path().join("data").join("quotes.db")).unwrap()
}

fn texts(entries: &[QuoteEntry]) -> Vec<&str> {
    entries.iter().map(|q| q.quote_text.as_str()).collect()
}

async fn run(engine: &mut Engine<SqliteStore>, listing: Listing) -> RunReport {
    let report = engine.run_scrape(listing, None).await.unwrap();
    // keep started_at strictly increasing between runs
    tokio::time::sleep(Duration::from_millis(5)).await;
    report
}

#[tokio::test]
async fn test_two_runs_report_new_changed_and_disappeared() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine(&tmp, sqlite(&tmp));

    let a = run(
        &mut engine,
        Listing::default().page(
            START,
            vec![quote("T1", "Au1", &["a"]), quote("T2", "Au2", &["b"])],
            None,
        ),
    )
    .await;
    assert_eq!(a.new_quotes.len(), 2);
    assert!(a.changed_quotes.is_empty());
    assert!(a.disappeared_quotes.is_empty());

    let b = run(
        &mut engine,
        Listing::default().page(START, vec![quote("T1", "Au1", &["a", "c"])], None),
    )
    .await;
    assert!(b.new_quotes.is_empty());
    assert_eq!(texts(&b.changed_quotes), vec!["T1"]);
    assert_eq!(texts(&b.disappeared_quotes), vec!["T2"]);
    assert_eq!(b.total_seen, 1);

    // disappearance is a state, not a removal
    assert_eq!(engine.store().all_quotes().unwrap().len(), 2);
}

#[tokio::test]
async fn test_first_run_has_no_disappearances() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine(&tmp, sqlite(&tmp));

    let report = run(
        &mut engine,
        Listing::default()
            .page(START, vec![quote("T1", "Au1", &[])], Some("/page/2/"))
            .page("/page/2/", vec![quote("T2", "Au1", &[])], None),
    )
    .await;

    assert_eq!(report.pages_scraped, 2);
    assert_eq!(report.new_quotes.len(), 2);
    assert!(report.disappeared_quotes.is_empty());
}

#[tokio::test]
async fn test_failed_run_is_skipped_as_baseline() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine(&tmp, sqlite(&tmp));

    run(
        &mut engine,
        Listing::default().page(START, vec![quote("Q", "A", &[]), quote("K", "A", &[])], None),
    )
    .await;

    // second run dies after its first page
    let err = engine
        .run_scrape(
            Listing::default()
                .page(START, vec![quote("K", "A", &[])], Some("/page/2/"))
                .fatal("/page/2/"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Ledger(_)));
    tokio::time::sleep(Duration::from_millis(5)).await;

    let third = run(
        &mut engine,
        Listing::default().page(START, vec![quote("K", "A", &[])], None),
    )
    .await;
    assert_eq!(texts(&third.disappeared_quotes), vec!["Q"]);
}

#[tokio::test]
async fn test_failure_after_two_pages_finishes_run_once() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine(&tmp, CountingStore::new(sqlite(&tmp)));

    let listing = Listing::default()
        .page(START, vec![quote("T1", "A", &[])], Some("/page/2/"))
        .page("/page/2/", vec![quote("T2", "A", &[])], Some("/page/3/"))
        .fatal("/page/3/");

    let err = engine.run_scrape(listing, None).await.unwrap_err();
    assert!(err.to_string().contains("store went away"));

    let completions = engine.store().completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].1, RunStatus::Fail);

    let failed = engine.store().get_run(&completions[0].0).unwrap().unwrap();
    assert_eq!(failed.status, RunStatus::Fail);
    assert_eq!(failed.pages_scraped, 0);
    assert_eq!(failed.quotes_seen, 0);
    assert!(failed.error.unwrap().contains("store went away"));
    assert!(failed.finished_at.is_some());
}

#[tokio::test]
async fn test_classify_failure_finishes_run_once() {
    let tmp = TempDir::new().unwrap();
    let mut store = CountingStore::new(sqlite(&tmp));
    store.fail_inserts = true;
    let mut engine = engine(&tmp, store);

    let listing = Listing::default().page(START, vec![quote("T1", "A", &["x"])], None);
    let err = engine.run_scrape(listing, None).await.unwrap_err();
    assert!(matches!(&err, AppError::Ledger(m) if m == "disk full"));

    let completions = engine.store().completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].1, RunStatus::Fail);

    let failed = engine.store().get_run(&completions[0].0).unwrap().unwrap();
    assert_eq!(failed.status, RunStatus::Fail);
    assert_eq!(failed.pages_scraped, 0);
    assert_eq!(failed.quotes_seen, 0);
    assert!(failed.error.unwrap().contains("disk full"));
}

#[tokio::test]
async fn test_failed_success_write_is_not_retried_as_fail() {
    let tmp = TempDir::new().unwrap();
    let mut store = CountingStore::new(sqlite(&tmp));
    store.fail_success = true;
    let mut engine = engine(&tmp, store);

    let listing = Listing::default().page(START, vec![quote("T1", "A", &[])], None);
    let err = engine.run_scrape(listing, None).await.unwrap_err();
    assert!(err.to_string().contains("database is locked"));

    let completions = engine.store().completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].1, RunStatus::Success);
}

#[tokio::test]
async fn test_unreachable_pages_still_finish_successfully() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine(&tmp, sqlite(&tmp));

    // the start page never answers
    let report = engine.run_scrape(Listing::default(), None).await.unwrap();
    assert_eq!(report.pages_scraped, 1);
    assert_eq!(report.failed_pages, vec![0]);
    assert_eq!(report.total_seen, 0);

    let run = engine.store().get_run(&report.run_id).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Success);

    let captured = std::fs::read_dir(tmp.path().join("failures").join(&report.run_id))
        .unwrap()
        .count();
    assert!(captured > 0);
}

#[tokio::test]
async fn test_rescrape_keeps_first_seen_and_advances_last_seen() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine(&tmp, sqlite(&tmp));
    let q = quote("Stay hungry.", "Jobs", &["life"]);

    run(&mut engine, Listing::default().page(START, vec![q.clone()], None)).await;
    let before = engine.store().get_quote(&q.quote_id).unwrap().unwrap();

    let second = run(&mut engine, Listing::default().page(START, vec![q.clone()], None)).await;
    let after = engine.store().get_quote(&q.quote_id).unwrap().unwrap();

    assert_eq!(second.unchanged_count, 1);
    assert!(!second.has_changes());
    assert_eq!(after.first_seen_at, before.first_seen_at);
    assert!(after.last_seen_at > before.last_seen_at);
}

#[tokio::test]
async fn test_max_pages_limits_the_run() {
    let tmp = TempDir::new().unwrap();
    let mut engine = engine(&tmp, sqlite(&tmp));

    let listing = Listing::default()
        .page(START, vec![quote("T1", "A", &[])], Some("/page/2/"))
        .page("/page/2/", vec![quote("T2", "A", &[])], None);

    let report = engine.run_scrape(listing, Some(1)).await.unwrap();
    assert_eq!(report.pages_scraped, 1);
    assert_eq!(texts(&report.new_quotes), vec!["T1"]);

    let last = engine.store().last_run().unwrap().unwrap();
    assert_eq!(last.pages_scraped, 1);
    assert_eq!(last.quotes_seen, 1);
}
