//! Quotation data structures.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A quotation as extracted from a page, already fingerprinted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapedQuote {
    /// Content fingerprint (see `services::fingerprint`)
    pub quote_id: String,

    /// Quotation text, surrounding quote marks removed
    pub text: String,

    /// Author name exactly as shown on the page
    pub author: String,

    /// Absolute link to the author page, if one was present
    pub author_url: Option<String>,

    /// Tags in page order
    pub tags: Vec<String>,
}

/// A quotation as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub quote_id: String,
    pub quote_text: String,
    pub author_name: String,
    pub author_url: Option<String>,
    pub tags: Vec<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl Quote {
    /// Build the stored form of a quotation first observed at `now`.
    pub fn first_seen(scraped: &ScrapedQuote, now: DateTime<Utc>) -> Self {
        Self {
            quote_id: scraped.quote_id.clone(),
            quote_text: scraped.text.clone(),
            author_name: scraped.author.clone(),
            author_url: scraped.author_url.clone(),
            tags: scraped.tags.clone(),
            first_seen_at: now,
            last_seen_at: now,
        }
    }

    /// Tag set used for change detection; order and duplicates are ignored.
    pub fn tag_set(&self) -> BTreeSet<&str> {
        tag_set(&self.tags)
    }

    /// Serialized tag list as persisted (`tags_json`).
    pub fn tags_json(&self) -> String {
        serde_json::to_string(&self.tags).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Collect tags into an order-insensitive set.
pub fn tag_set(tags: &[String]) -> BTreeSet<&str> {
    tags.iter().map(String::as_str).collect()
}

/// How the change-detection engine classified one observed quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Identity not previously stored
    New,
    /// Stored before, tag set differs
    Updated,
    /// Stored before, tag set identical
    Unchanged,
}

/// Quotation entry handed to report and export consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuoteEntry {
    pub quote_id: String,
    pub quote_text: String,
    pub author_name: String,
    pub author_url: Option<String>,
    pub tags: Vec<String>,
}

impl From<&Quote> for QuoteEntry {
    fn from(quote: &Quote) -> Self {
        Self {
            quote_id: quote.quote_id.clone(),
            quote_text: quote.quote_text.clone(),
            author_name: quote.author_name.clone(),
            author_url: quote.author_url.clone(),
            tags: quote.tags.clone(),
        }
    }
}

impl From<&ScrapedQuote> for QuoteEntry {
    fn from(quote: &ScrapedQuote) -> Self {
        Self {
            quote_id: quote.quote_id.clone(),
            quote_text: quote.text.clone(),
            author_name: quote.author.clone(),
            author_url: quote.author_url.clone(),
            tags: quote.tags.clone(),
        }
    }
}
