//! Raw layer ingestion
//!
//! Fetches each external source and persists an unmodified copy:
//! - `fetch_file` streams a delimited text download to disk (reusing a
//!   cached copy when present) and loads it permissively
//! - `fetch_paginated_api` requests one page per key, tolerates failed
//!   pages and saves the combined JSON array

mod extractor;

pub use extractor::{load_csv, RawExtractor};
