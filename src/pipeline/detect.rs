// src/pipeline/detect.rs

//! Change detection between runs.
//!
//! Each observed quotation is upserted by fingerprint and classified as
//! new, updated (tag set differs) or unchanged. Quotations observed by the
//! most recent earlier successful run but not by this one are reported as
//! disappeared. Disappearance is only a report; nothing is deleted.

use std::collections::HashSet;

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::Result;
use crate::models::{Classification, Quote, ScrapedQuote, tag_set};
use crate::pipeline::ledger::RunLedger;
use crate::storage::{QuoteRefresh, QuoteStore};

/// Classified observations of one run.
///
/// `new`, `updated` and `unchanged` hold one entry per observed record, so a
/// quotation repeated within the run appears once as `new` or `updated` and
/// again as `unchanged`. `seen_count` counts distinct fingerprints.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub new: Vec<Quote>,
    pub updated: Vec<Quote>,
    pub unchanged: Vec<Quote>,
    pub disappeared: Vec<Quote>,
    /// Distinct fingerprints observed
    pub seen_count: usize,
}

impl ChangeSet {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.new.is_empty() || !self.updated.is_empty() || !self.disappeared.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.new.len() + self.updated.len() + self.disappeared.len()
    }
}

/// Upserts observations and diffs them against the previous successful run.
pub struct ChangeDetector<'a, S: QuoteStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: QuoteStore + ?Sized> ChangeDetector<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Classify the records observed by `run_id`.
    pub fn classify(&self, run_id: &str, records: &[ScrapedQuote]) -> Result<ChangeSet> {
        let ledger = RunLedger::new(self.store);
        let mut changes = ChangeSet::default();
        let mut seen: HashSet<String> = HashSet::new();

        for record in records {
            // stored timestamps keep microseconds
            let now = Utc::now().trunc_subsecs(6);
            let (classification, stored) = self.upsert(record, now)?;
            ledger.record_observation(run_id, &record.quote_id)?;
            seen.insert(record.quote_id.clone());

            match classification {
                Classification::New => changes.new.push(stored),
                Classification::Updated => changes.updated.push(stored),
                Classification::Unchanged => changes.unchanged.push(stored),
            }
        }
        changes.seen_count = seen.len();

        changes.disappeared = match ledger.get_previous_successful_run(run_id)? {
            Some(previous) => self.disappeared_since(&ledger, &previous, &seen)?,
            None => {
                log::info!("No previous successful run; nothing can have disappeared");
                Vec::new()
            }
        };

        log::info!(
            "Run {}: {} new, {} updated, {} unchanged, {} disappeared ({} seen)",
            run_id,
            changes.new.len(),
            changes.updated.len(),
            changes.unchanged.len(),
            changes.disappeared.len(),
            changes.seen_count
        );

        Ok(changes)
    }

    /// Insert or refresh one record and report how it compares to what was
    /// stored. Only the tag set decides between updated and unchanged.
    pub fn upsert(
        &self,
        record: &ScrapedQuote,
        now: DateTime<Utc>,
    ) -> Result<(Classification, Quote)> {
        let Some(existing) = self.store.get_quote(&record.quote_id)? else {
            let quote = Quote::first_seen(record, now);
            self.store.insert_quote(&quote)?;
            return Ok((Classification::New, quote));
        };

        let classification = if existing.tag_set() != tag_set(&record.tags) {
            Classification::Updated
        } else {
            Classification::Unchanged
        };

        self.store.refresh_quote(
            &record.quote_id,
            &QuoteRefresh {
                last_seen_at: now,
                tags: &record.tags,
                author_url: record.author_url.as_deref(),
            },
        )?;

        let quote = Quote {
            tags: record.tags.clone(),
            author_url: record.author_url.clone(),
            last_seen_at: now,
            ..existing
        };
        Ok((classification, quote))
    }

    fn disappeared_since(
        &self,
        ledger: &RunLedger<'_, S>,
        previous_run_id: &str,
        seen: &HashSet<String>,
    ) -> Result<Vec<Quote>> {
        let previous = ledger.get_observed_identities(previous_run_id)?;

        let mut missing: Vec<&String> = previous.difference(seen).collect();
        missing.sort();

        let mut disappeared = Vec::with_capacity(missing.len());
        for quote_id in missing {
            match self.store.get_quote(quote_id)? {
                Some(quote) => disappeared.push(quote),
                None => log::warn!("Observed quote {} missing from store", quote_id),
            }
        }

        log::debug!(
            "Compared against run {}: {} previously observed, {} disappeared",
            previous_run_id,
            previous.len(),
            disappeared.len()
        );
        Ok(disappeared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunCompletion;
    use crate::services::fingerprint;
    use crate::storage::SqliteStore;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> SqliteStore {
        SqliteStore::open(tmp.path().join("quotes.db")).unwrap()
    }

    fn record(text: &str, author: &str, tags: &[&str]) -> ScrapedQuote {
        ScrapedQuote {
            quote_id: fingerprint(text, author),
            text: text.to_string(),
            author: author.to_string(),
            author_url: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn ids(quotes: &[Quote]) -> Vec<&str> {
        quotes.iter().map(|q| q.quote_text.as_str()).collect()
    }

    /// Start a run, classify `records`, finish it with `success`.
    fn run(store: &SqliteStore, records: &[ScrapedQuote], succeed: bool) -> ChangeSet {
        let ledger = RunLedger::new(store);
        let run = ledger.start_run().unwrap();
        let changes = ChangeDetector::new(store)
            .classify(&run.run_id, records)
            .unwrap();
        let completion = if succeed {
            RunCompletion::success(1, changes.seen_count)
        } else {
            RunCompletion::failure("boom")
        };
        ledger.finish_run(&run.run_id, &completion).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        changes
    }

    #[test]
    fn test_duplicate_record_in_one_run_is_new_then_unchanged() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let ledger = RunLedger::new(&store);
        let run_rec = ledger.start_run().unwrap();

        let q = record("Hello, World!", "Ann", &["x"]);
        let changes = ChangeDetector::new(&store)
            .classify(&run_rec.run_id, &[q.clone(), q.clone()])
            .unwrap();

        assert_eq!(changes.new.len(), 1);
        assert_eq!(changes.unchanged.len(), 1);
        assert_eq!(changes.seen_count, 1);
        assert_eq!(ledger.get_observed_identities(&run_rec.run_id).unwrap().len(), 1);
    }

    #[test]
    fn test_tag_change_is_updated_and_keeps_first_seen() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);

        let first = run(&store, &[record("T", "A", &["life"])], true);
        let original = first.new[0].clone();

        let second = run(&store, &[record("T", "A", &["life", "love"])], true);
        assert_eq!(second.updated.len(), 1);
        assert!(second.new.is_empty());

        let stored = store.get_quote(&original.quote_id).unwrap().unwrap();
        assert_eq!(stored.first_seen_at, original.first_seen_at);
        assert!(stored.last_seen_at > original.last_seen_at);
        assert_eq!(stored.tags, vec!["life", "love"]);
    }

    #[test]
    fn test_tag_reorder_and_author_url_change_are_unchanged() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        run(&store, &[record("T", "A", &["a", "b"])], true);

        let mut again = record("T", "A", &["b", "a"]);
        again.author_url = Some("https://example.com/author/A".to_string());
        let changes = run(&store, &[again.clone()], true);

        assert_eq!(changes.unchanged.len(), 1);
        assert!(changes.updated.is_empty());
        // silently persisted anyway
        let stored = store.get_quote(&again.quote_id).unwrap().unwrap();
        assert_eq!(stored.author_url, again.author_url);
    }

    #[test]
    fn test_bootstrap_has_no_disappearances() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let changes = run(&store, &[record("T1", "A", &[]), record("T2", "B", &[])], true);
        assert_eq!(changes.new.len(), 2);
        assert!(changes.disappeared.is_empty());
    }

    #[test]
    fn test_disappearance_against_previous_success() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        run(&store, &[record("Q", "A", &[]), record("K", "A", &[])], true);

        let second = run(&store, &[record("K", "A", &[])], true);
        assert_eq!(ids(&second.disappeared), vec!["Q"]);

        // Q stays stored
        assert!(store.get_quote(&fingerprint("Q", "A")).unwrap().is_some());
    }

    #[test]
    fn test_failed_run_is_not_a_baseline() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        run(&store, &[record("Q", "A", &[]), record("K", "A", &[])], true);
        // failed run saw only K
        run(&store, &[record("K", "A", &[])], false);

        // Q is measured against run 1, not the failed run 2
        let third = run(&store, &[record("K", "A", &[])], true);
        assert_eq!(ids(&third.disappeared), vec!["Q"]);
    }

    #[test]
    fn test_change_counts() {
        let changes = ChangeSet::default();
        assert!(!changes.has_changes());
        assert_eq!(changes.change_count(), 0);
    }
}
