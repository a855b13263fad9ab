// src/pipeline/context.rs

//! Per-run context handed explicitly to each pipeline stage.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::ScraperConfig;
use crate::services::FailureCapture;

/// Attempt budget and fixed backoff for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.max_attempts, config.backoff())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Identity and settings of the run in progress.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub max_pages: Option<usize>,
    pub retry: RetryPolicy,
    pub capture: FailureCapture,
}

impl RunContext {
    /// Whether `pages_scraped` has reached the page cap.
    pub fn page_limit_reached(&self, pages_scraped: usize) -> bool {
        self.max_pages.is_some_and(|max| pages_scraped >= max)
    }
}
