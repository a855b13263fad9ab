//! Service layer for the quote scraper.
//!
//! This module contains the business logic for:
//! - Quotation fingerprints (`fingerprint`)
//! - The page fetching seam (`PageFetcher`)
//! - HTTP quotation fetching (`HttpQuoteFetcher`)
//! - Failure artifact capture (`FailureCapture`)

mod capture;
pub mod fetcher;
pub mod fingerprint;
mod quotes;

pub use capture::FailureCapture;
pub use fetcher::{FetchedPage, PageFetcher, PageSnapshot};
pub use fingerprint::fingerprint;
pub use quotes::{Extraction, HttpQuoteFetcher, QuoteExtractor};
