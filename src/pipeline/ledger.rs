// src/pipeline/ledger.rs

//! Run bookkeeping: run lifecycle and run/quotation observations.

use std::collections::HashSet;

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Run, RunCompletion};
use crate::storage::QuoteStore;

/// Records runs and what each run observed.
pub struct RunLedger<'a, S: QuoteStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: QuoteStore + ?Sized> RunLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create a `running` run with a fresh id.
    pub fn start_run(&self) -> Result<Run> {
        let run = Run::started(Uuid::new_v4().to_string(), Utc::now().trunc_subsecs(6));
        self.store.insert_run(&run)?;
        Ok(run)
    }

    /// Move a running run to its terminal state. Fails if the run is
    /// unknown or already finished.
    pub fn finish_run(&self, run_id: &str, completion: &RunCompletion) -> Result<()> {
        if completion.status.is_terminal() {
            if self.store.complete_run(run_id, Utc::now(), completion)? {
                return Ok(());
            }
            return Err(AppError::ledger(format!(
                "run {run_id} is not running; cannot mark it {}",
                completion.status
            )));
        }
        Err(AppError::ledger(format!(
            "run {run_id} cannot finish with status {}",
            completion.status
        )))
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        self.store.get_run(run_id)
    }

    pub fn get_last_run(&self) -> Result<Option<Run>> {
        self.store.last_run()
    }

    pub fn list_runs(&self, limit: usize) -> Result<Vec<Run>> {
        self.store.list_runs(limit)
    }

    /// Most recent successful run started strictly before `before_run_id`.
    pub fn get_previous_successful_run(&self, before_run_id: &str) -> Result<Option<String>> {
        let run = self
            .store
            .get_run(before_run_id)?
            .ok_or_else(|| AppError::ledger(format!("unknown run {before_run_id}")))?;
        self.store.previous_successful_run(run.started_at)
    }

    pub fn record_observation(&self, run_id: &str, quote_id: &str) -> Result<bool> {
        self.store.record_observation(run_id, quote_id)
    }

    pub fn get_observed_identities(&self, run_id: &str) -> Result<HashSet<String>> {
        self.store.observed_quote_ids(run_id)
    }
}
