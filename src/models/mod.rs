// src/models/mod.rs

//! Domain models for the quote scraper.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod quote;
mod run;

// Re-export all public types
pub use config::{
    Config, PathsConfig, QuoteSelectors, RendererConfig, ReportConfig, ScraperConfig,
};
pub use quote::{Classification, Quote, QuoteEntry, ScrapedQuote, tag_set};
pub use run::{Run, RunCompletion, RunStatus};
