//! Storage abstractions for quotation and run persistence.
//!
//! ## Schema
//!
//! ```text
//! quotes              one row per fingerprint, never deleted
//! runs                one row per run, status running -> success | fail
//! quote_observations  (run_id, quote_id) pairs, insert-only
//! ```
//!
//! Every method is its own short unit of work; nothing holds a transaction
//! across page fetches. Two processes scraping into the same database at
//! once is not coordinated and is the caller's responsibility to avoid.

pub mod sqlite;

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Quote, Run, RunCompletion};

// Re-export for convenience
pub use sqlite::SqliteStore;

/// Fields refreshed when a stored quotation is observed again.
#[derive(Debug, Clone)]
pub struct QuoteRefresh<'a> {
    pub last_seen_at: DateTime<Utc>,
    pub tags: &'a [String],
    pub author_url: Option<&'a str>,
}

/// Trait for quotation/run storage backends.
pub trait QuoteStore: Send + Sync {
    /// Point lookup by fingerprint.
    fn get_quote(&self, quote_id: &str) -> Result<Option<Quote>>;

    /// Insert a quotation not stored before.
    fn insert_quote(&self, quote: &Quote) -> Result<()>;

    /// Overwrite the mutable fields of a stored quotation.
    fn refresh_quote(&self, quote_id: &str, refresh: &QuoteRefresh<'_>) -> Result<()>;

    /// Record that a run saw a quotation. Returns `false` if the pair was
    /// already recorded.
    fn record_observation(&self, run_id: &str, quote_id: &str) -> Result<bool>;

    /// Fingerprints observed by a run.
    fn observed_quote_ids(&self, run_id: &str) -> Result<HashSet<String>>;

    /// Insert a new run row.
    fn insert_run(&self, run: &Run) -> Result<()>;

    /// Move a `running` run to its terminal state. Returns `false` if no
    /// running run with that id exists.
    fn complete_run(
        &self,
        run_id: &str,
        finished_at: DateTime<Utc>,
        completion: &RunCompletion,
    ) -> Result<bool>;

    fn get_run(&self, run_id: &str) -> Result<Option<Run>>;

    /// Most recently started run, any status.
    fn last_run(&self) -> Result<Option<Run>>;

    /// Most recent successful run started strictly before `before`;
    /// ties on start time resolve to the greatest run id.
    fn previous_successful_run(&self, before: DateTime<Utc>) -> Result<Option<String>>;

    /// Runs newest first.
    fn list_runs(&self, limit: usize) -> Result<Vec<Run>>;

    /// Full table scan for export and stats.
    fn all_quotes(&self) -> Result<Vec<Quote>>;
}
