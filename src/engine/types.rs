//! Engine types
//!
//! Input formats accepted by the query engine and the report returned
//! when an input is registered.

use crate::types::ParsePolicy;

/// Rows sampled for CSV schema inference
pub const CSV_SAMPLE_SIZE: usize = 10_000;

/// Options for reading a delimited text file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Read every column as text instead of inferring types
    pub all_varchar: bool,
    /// Columns read as text while the others are inferred; names absent
    /// from the header are ignored
    pub text_columns: &'static [&'static str],
    /// Handling of malformed rows
    pub policy: ParsePolicy,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            all_varchar: false,
            text_columns: &[],
            policy: ParsePolicy::Permissive,
        }
    }
}

impl CsvOptions {
    /// Create options with inferred types and permissive parsing
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every column as raw text
    #[must_use]
    pub fn all_varchar(mut self) -> Self {
        self.all_varchar = true;
        self
    }

    /// Set the parse policy
    #[must_use]
    pub fn policy(mut self, policy: ParsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Keep `columns` as source text
    #[must_use]
    pub fn text_columns(mut self, columns: &'static [&'static str]) -> Self {
        self.text_columns = columns;
        self
    }
}

/// Layout of a persisted input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// One delimited text file with a header row
    Csv(CsvOptions),
    /// One file holding a JSON array of objects
    JsonArray,
    /// A directory tree of Parquet files (all partitions are read)
    Partitioned,
}

impl InputFormat {
    /// Whether the persisted form is a directory rather than a file
    pub fn is_directory(&self) -> bool {
        matches!(self, InputFormat::Partitioned)
    }

    /// Short label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            InputFormat::Csv(_) => "csv",
            InputFormat::JsonArray => "json",
            InputFormat::Partitioned => "partitioned parquet",
        }
    }
}

/// Result of registering an input with the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputReport {
    /// Rows visible through the registered relation
    pub rows: usize,
    /// Source lines dropped as malformed
    pub rejected_rows: usize,
}
