// src/services/fetcher.rs

//! The page fetching seam.
//!
//! A `PageFetcher` owns whatever session it needs to load one listing page
//! and turn it into quotation records plus an optional next-page pointer.
//! The paginator drives it strictly sequentially and closes it when done.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ScrapedQuote;

/// One extracted listing page.
#[derive(Debug, Default)]
pub struct FetchedPage {
    /// Records in document order; `Err` marks a record whose markup could not be read
    pub records: Vec<Result<ScrapedQuote>>,

    /// Absolute url of the next page, if the page links to one
    pub next_url: Option<String>,
}

impl FetchedPage {
    pub fn new(records: Vec<Result<ScrapedQuote>>, next_url: Option<String>) -> Self {
        Self { records, next_url }
    }
}

/// Diagnostic state of the session, captured after a page is given up on.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    /// Raw page markup as last received
    pub markup: Option<String>,

    /// Rendered page image (PNG)
    pub image: Option<Vec<u8>>,
}

impl PageSnapshot {
    pub fn is_empty(&self) -> bool {
        self.markup.is_none() && self.image.is_none()
    }
}

/// Source of listing pages.
#[async_trait]
pub trait PageFetcher: Send {
    /// Load and extract a page. Transient failures should surface as
    /// `AppError::Navigation` so the caller can retry them.
    async fn fetch_page(&mut self, url: &str) -> Result<FetchedPage>;

    /// Best-effort read of whatever the session still holds for `url`
    /// after all attempts failed.
    async fn partial_page(&mut self, _url: &str) -> Option<FetchedPage> {
        None
    }

    /// Session state for `url`, captured after its last attempt failed.
    async fn snapshot(&mut self, _url: &str) -> PageSnapshot {
        PageSnapshot::default()
    }

    /// Release the session. Called once on every exit path of a pagination.
    async fn close(&mut self) {}
}
