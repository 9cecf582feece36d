//! Standardized layer
//!
//! Cleans, types and partitions each raw source.
//!
//! # Overview
//!
//! Every entity implements [`Standardizer`]: it names the source columns
//! it needs and the SQL that turns them into the canonical record. The
//! shared driver in [`SilverProcessor`] does the rest for all of them:
//!
//! 1. Register the input (in-memory table or persisted file) with a fresh
//!    [`QueryEngine`]
//! 2. Check that every required source column is present
//! 3. Run the entity's transform and collect the result
//! 4. Replace `<silver_root>/<entity>` with the partitioned result

mod collisions;
mod holidays;
mod weather;

pub use collisions::{
    CollisionsStandardizer, COLLISION_COLUMNS, COLLISION_TEXT_COLUMNS, METRIC_COLUMNS,
};
pub use holidays::HolidaysStandardizer;
pub use weather::WeatherStandardizer;

use crate::config::default_start_date;
use crate::dataset::{Dataset, DatasetInput};
use crate::engine::{InputFormat, QueryEngine};
use crate::error::Result;
use crate::output::{write_partitioned, ParquetWriterConfig};
use crate::types::ParsePolicy;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Relation name the raw input is registered under
pub(crate) const SOURCE: &str = "source";

/// Cleans one raw entity into its standardized form
pub trait Standardizer {
    /// Entity name, also the subdirectory under the silver root
    fn entity(&self) -> &'static str;

    /// How a persisted raw file of this entity is read
    fn input_format(&self, policy: ParsePolicy) -> InputFormat;

    /// Source columns that must be present
    fn required_columns(&self) -> Vec<&'static str>;

    /// Partition columns of the persisted output
    fn partition_by(&self) -> &'static [&'static str];

    /// Query producing the standardized rows from relation `source`
    fn transform_sql(&self, source: &str) -> String;
}

/// Row counts of one standardization run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardizeReport {
    /// Rows read from the input
    pub input_rows: usize,
    /// Malformed source lines skipped while reading
    pub rejected_rows: usize,
    /// Rows in the standardized output
    pub output_rows: usize,
}

impl StandardizeReport {
    /// Rows removed by the transform (filters and deduplication)
    pub fn dropped_rows(&self) -> usize {
        self.input_rows.saturating_sub(self.output_rows)
    }
}

/// Standardized table, its persisted location and the run counts
#[derive(Debug, Clone)]
pub struct StandardizeOutcome {
    /// Standardized table and partition root
    pub dataset: Dataset,
    /// Row counts
    pub report: StandardizeReport,
}

/// Runs the three standardizers against a silver root
#[derive(Debug, Clone)]
pub struct SilverProcessor {
    silver_root: PathBuf,
    policy: ParsePolicy,
    start_date: NaiveDate,
    writer_config: ParquetWriterConfig,
}

impl SilverProcessor {
    /// Create a processor writing under `silver_root`
    pub fn new(silver_root: impl Into<PathBuf>) -> Self {
        Self {
            silver_root: silver_root.into(),
            policy: ParsePolicy::default(),
            start_date: default_start_date(),
            writer_config: ParquetWriterConfig::default(),
        }
    }

    /// Set how malformed rows of persisted text inputs are handled
    #[must_use]
    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the first weather date kept
    #[must_use]
    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    /// Silver root directory
    pub fn silver_root(&self) -> &Path {
        &self.silver_root
    }

    /// Standardize collision records
    pub fn process_collisions(&self, input: &DatasetInput) -> Result<StandardizeOutcome> {
        self.process(&CollisionsStandardizer, input)
    }

    /// Standardize holiday records
    pub fn process_holidays(&self, input: &DatasetInput) -> Result<StandardizeOutcome> {
        self.process(&HolidaysStandardizer, input)
    }

    /// Standardize weather observations
    pub fn process_weather(&self, input: &DatasetInput) -> Result<StandardizeOutcome> {
        self.process(&WeatherStandardizer::new(self.start_date), input)
    }

    /// Standardize any entity
    pub fn process(
        &self,
        standardizer: &dyn Standardizer,
        input: &DatasetInput,
    ) -> Result<StandardizeOutcome> {
        let entity = standardizer.entity();
        info!("Processing {} (raw -> standardized) from {}", entity, input.describe());

        let engine = QueryEngine::new()?;
        let loaded =
            engine.register_input(SOURCE, input, &standardizer.input_format(self.policy))?;
        engine.require_columns(SOURCE, entity, &standardizer.required_columns())?;

        let table = engine.query_table(&standardizer.transform_sql(SOURCE))?;
        let report = StandardizeReport {
            input_rows: loaded.rows,
            rejected_rows: loaded.rejected_rows,
            output_rows: table.num_rows(),
        };
        if report.dropped_rows() > 0 {
            warn!(
                "Dropped {} of {} {} rows during standardization",
                report.dropped_rows(),
                report.input_rows,
                entity
            );
        }

        let root = self.silver_root.join(entity);
        info!("Persisting {} standardized layer to {}", entity, root.display());
        write_partitioned(&table, &root, standardizer.partition_by(), &self.writer_config)?;

        Ok(StandardizeOutcome {
            dataset: Dataset::new(table, root),
            report,
        })
    }
}
