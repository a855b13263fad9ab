// src/services/capture.rs

//! Failure capture.
//!
//! When a page is given up on, whatever the session still shows is written
//! to `{root}/{run_id}/failure_page_{index}_{timestamp}.{html,png,json}` for
//! offline diagnosis. Capturing is best-effort and never fails a run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::services::fetcher::PageSnapshot;

/// Sidecar describing a captured failure.
#[derive(Debug, Clone, Serialize)]
struct CaptureMeta<'a> {
    run_id: &'a str,
    page_index: usize,
    url: &'a str,
    error: &'a str,
    captured_at: DateTime<Utc>,
    has_markup: bool,
    has_image: bool,
}

/// Writes failure artifacts under a root directory.
#[derive(Debug, Clone)]
pub struct FailureCapture {
    root_dir: PathBuf,
}

impl FailureCapture {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Directory holding the artifacts of one run.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    /// Persist a snapshot. Errors are logged and swallowed; returns the
    /// artifact stem on success.
    pub async fn capture(
        &self,
        run_id: &str,
        page_index: usize,
        url: &str,
        error: &str,
        snapshot: &PageSnapshot,
    ) -> Option<PathBuf> {
        match self.write(run_id, page_index, url, error, snapshot).await {
            Ok(stem) => {
                log::info!("Captured failure at {}", stem.display());
                Some(stem)
            }
            Err(e) => {
                log::error!("Failed to capture failure info for page {}: {}", page_index, e);
                None
            }
        }
    }

    async fn write(
        &self,
        run_id: &str,
        page_index: usize,
        url: &str,
        error: &str,
        snapshot: &PageSnapshot,
    ) -> Result<PathBuf> {
        let dir = self.run_dir(run_id);
        tokio::fs::create_dir_all(&dir).await?;

        let now = Utc::now();
        let stem = dir.join(format!("failure_page_{}_{}", page_index, now.timestamp()));

        if let Some(image) = &snapshot.image {
            write_file(&stem.with_extension("png"), image).await?;
        }
        if let Some(markup) = &snapshot.markup {
            write_file(&stem.with_extension("html"), markup.as_bytes()).await?;
        }

        let meta = CaptureMeta {
            run_id,
            page_index,
            url,
            error,
            captured_at: now,
            has_markup: snapshot.markup.is_some(),
            has_image: snapshot.image.is_some(),
        };
        write_file(&stem.with_extension("json"), &serde_json::to_vec_pretty(&meta)?).await?;

        Ok(stem)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}
