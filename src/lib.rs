// src/lib.rs

//! QuotePulse Library
//!
//! Scrapes a paginated quotation listing, stores every quotation under a
//! content fingerprint and reports what changed since the last successful
//! run.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod services;
pub mod storage;
pub mod utils;
