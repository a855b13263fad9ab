//! SQLite storage implementation.
//!
//! A connection is opened per operation, so every call is an independent,
//! immediately durable unit of work.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::models::{Quote, Run, RunCompletion, RunStatus};
use crate::storage::{QuoteRefresh, QuoteStore};

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS quotes (
        quote_id TEXT PRIMARY KEY,
        quote_text TEXT NOT NULL,
        author_name TEXT NOT NULL,
        author_url TEXT,
        tags_json TEXT NOT NULL DEFAULT '[]',
        first_seen_at TEXT NOT NULL,
        last_seen_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS runs (
        run_id TEXT PRIMARY KEY,
        started_at TEXT NOT NULL,
        finished_at TEXT,
        pages_scraped INTEGER NOT NULL DEFAULT 0,
        quotes_seen INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL,
        error TEXT
    );

    CREATE TABLE IF NOT EXISTS quote_observations (
        run_id TEXT NOT NULL REFERENCES runs(run_id),
        quote_id TEXT NOT NULL REFERENCES quotes(quote_id),
        PRIMARY KEY (run_id, quote_id)
    );

    CREATE INDEX IF NOT EXISTS idx_runs_status_started
        ON runs(status, started_at);
"#;

const QUOTE_COLUMNS: &str =
    "quote_id, quote_text, author_name, author_url, tags_json, first_seen_at, last_seen_at";

const RUN_COLUMNS: &str =
    "run_id, started_at, finished_at, pages_scraped, quotes_seen, status, error";

/// SQLite-backed quotation store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) a store at the given path, creating parent
    /// directories and the schema as needed.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }
}

/// Timestamps are stored as fixed-width RFC 3339 so text order is time order.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn quote_from_row(row: &Row<'_>) -> rusqlite::Result<Quote> {
    let tags_json: String = row.get(4)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(Quote {
        quote_id: row.get(0)?,
        quote_text: row.get(1)?,
        author_name: row.get(2)?,
        author_url: row.get(3)?,
        tags,
        first_seen_at: parse_ts(5, &row.get::<_, String>(5)?)?,
        last_seen_at: parse_ts(6, &row.get::<_, String>(6)?)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<Run> {
    let finished_at: Option<String> = row.get(2)?;
    let status: String = row.get(5)?;

    Ok(Run {
        run_id: row.get(0)?,
        started_at: parse_ts(1, &row.get::<_, String>(1)?)?,
        finished_at: finished_at.map(|s| parse_ts(2, &s)).transpose()?,
        pages_scraped: row.get::<_, i64>(3)?.max(0) as usize,
        quotes_seen: row.get::<_, i64>(4)?.max(0) as usize,
        status: status
            .parse::<RunStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
        error: row.get(6)?,
    })
}

impl QuoteStore for SqliteStore {
    fn get_quote(&self, quote_id: &str) -> Result<Option<Quote>> {
        let conn = self.connect()?;
        let quote = conn
            .query_row(
                &format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE quote_id = ?1"),
                params![quote_id],
                quote_from_row,
            )
            .optional()?;
        Ok(quote)
    }

    fn insert_quote(&self, quote: &Quote) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            &format!("INSERT INTO quotes ({QUOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                quote.quote_id,
                quote.quote_text,
                quote.author_name,
                quote.author_url,
                quote.tags_json(),
                format_ts(quote.first_seen_at),
                format_ts(quote.last_seen_at),
            ],
        )?;
        Ok(())
    }

    fn refresh_quote(&self, quote_id: &str, refresh: &QuoteRefresh<'_>) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE quotes SET last_seen_at = ?1, tags_json = ?2, author_url = ?3 WHERE quote_id = ?4",
            params![
                format_ts(refresh.last_seen_at),
                serde_json::to_string(refresh.tags)?,
                refresh.author_url,
                quote_id,
            ],
        )?;
        Ok(())
    }

    fn record_observation(&self, run_id: &str, quote_id: &str) -> Result<bool> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO quote_observations (run_id, quote_id) VALUES (?1, ?2)",
            params![run_id, quote_id],
        )?;
        Ok(inserted > 0)
    }

    fn observed_quote_ids(&self, run_id: &str) -> Result<HashSet<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT quote_id FROM quote_observations WHERE run_id = ?1")?;
        let ids = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    fn insert_run(&self, run: &Run) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            &format!("INSERT INTO runs ({RUN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                run.run_id,
                format_ts(run.started_at),
                run.finished_at.map(format_ts),
                run.pages_scraped as i64,
                run.quotes_seen as i64,
                run.status.as_str(),
                run.error,
            ],
        )?;
        Ok(())
    }

    fn complete_run(
        &self,
        run_id: &str,
        finished_at: DateTime<Utc>,
        completion: &RunCompletion,
    ) -> Result<bool> {
        let conn = self.connect()?;
        let updated = conn.execute(
            "UPDATE runs
             SET finished_at = ?1, pages_scraped = ?2, quotes_seen = ?3, status = ?4, error = ?5
             WHERE run_id = ?6 AND status = 'running'",
            params![
                format_ts(finished_at),
                completion.pages_scraped as i64,
                completion.quotes_seen as i64,
                completion.status.as_str(),
                completion.error,
                run_id,
            ],
        )?;
        Ok(updated > 0)
    }

    fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        let conn = self.connect()?;
        let run = conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = ?1"),
                params![run_id],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn last_run(&self) -> Result<Option<Run>> {
        Ok(self.list_runs(1)?.into_iter().next())
    }

    fn previous_successful_run(&self, before: DateTime<Utc>) -> Result<Option<String>> {
        let conn = self.connect()?;
        let run_id = conn
            .query_row(
                "SELECT run_id FROM runs
                 WHERE status = 'success' AND started_at < ?1
                 ORDER BY started_at DESC, run_id DESC
                 LIMIT 1",
                params![format_ts(before)],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(run_id)
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<Run>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM runs ORDER BY started_at DESC, run_id DESC LIMIT ?1"
        ))?;
        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    fn all_quotes(&self) -> Result<Vec<Quote>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes ORDER BY first_seen_at, quote_id"
        ))?;
        let quotes = stmt
            .query_map([], quote_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(quotes)
    }
}
