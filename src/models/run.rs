//! Run metadata.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Fail,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Fail => "fail",
        }
    }

    /// Whether the run has reached `success` or `fail`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "fail" => Ok(RunStatus::Fail),
            other => Err(AppError::validation(format!("unknown run status '{other}'"))),
        }
    }
}

/// One end-to-end scrape execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Run {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_scraped: usize,
    pub quotes_seen: usize,
    pub status: RunStatus,
    pub error: Option<String>,
}

impl Run {
    /// A freshly started run.
    pub fn started(run_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at,
            finished_at: None,
            pages_scraped: 0,
            quotes_seen: 0,
            status: RunStatus::Running,
            error: None,
        }
    }
}

/// Final figures recorded when a run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCompletion {
    pub pages_scraped: usize,
    pub quotes_seen: usize,
    pub status: RunStatus,
    pub error: Option<String>,
}

impl RunCompletion {
    pub fn success(pages_scraped: usize, quotes_seen: usize) -> Self {
        Self {
            pages_scraped,
            quotes_seen,
            status: RunStatus::Success,
            error: None,
        }
    }

    /// Failed runs always report zero pages and quotations.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            pages_scraped: 0,
            quotes_seen: 0,
            status: RunStatus::Fail,
            error: Some(error.into()),
        }
    }
}
