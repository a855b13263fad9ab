//! Run pipeline.
//!
//! - `paginate`: walk the listing with bounded retries and failure capture
//! - `detect`: classify observations and find disappearances
//! - `ledger`: run lifecycle and run membership
//! - `run`: the `Engine` tying them together into one run

pub mod context;
pub mod detect;
pub mod ledger;
pub mod paginate;
pub mod run;

pub use context::{RetryPolicy, RunContext};
pub use detect::{ChangeDetector, ChangeSet};
pub use ledger::RunLedger;
pub use paginate::{PaginationOutcome, Paginator};
pub use run::{Engine, RunReport};
