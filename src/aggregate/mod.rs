//! Aggregate layer
//!
//! Enriches standardized collisions with holiday and weather context and
//! rolls them up into daily statistics.
//!
//! # Overview
//!
//! [`GoldProcessor`] registers the three standardized inputs, left-joins
//! holidays and weather onto collisions by date, fills unmatched context
//! with defaults and groups by the full descriptive key. The result is
//! written as a full snapshot to `daily_stats.parquet` and
//! `daily_stats.csv` under the gold root.

use crate::config::default_start_date;
use crate::dataset::{Dataset, DatasetInput, Table};
use crate::engine::sql::{quote_ident, quote_literal};
use crate::engine::{InputFormat, QueryEngine};
use crate::error::Result;
use crate::output::{
    replace_directory, write_table_to_csv, write_table_to_parquet, ParquetWriterConfig,
};
use crate::standardize::METRIC_COLUMNS;
use crate::types::HolidayJoin;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

/// Columnar output file name
pub const PARQUET_FILE: &str = "daily_stats.parquet";

/// Delimited text output file name
pub const CSV_FILE: &str = "daily_stats.csv";

/// Label of collisions on dates without a holiday
pub const NON_HOLIDAY: &str = "Non-Holiday";

/// Holiday tags per impact tier, in output column order
pub const IMPACT_TIERS: [(&str, &[&str]); 3] = [
    ("high_impact_holiday", &["Public", "Bank"]),
    ("partial_impact_holiday", &["School", "Authorities"]),
    ("low_impact_holiday", &["Optional", "Observance"]),
];

const COLLISION_FIELDS: [&str; 4] = ["date", "borough", "zip_code", "is_weekend"];
const HOLIDAY_FIELDS: [&str; 3] = ["date", "holiday_name", "types"];
const WEATHER_FIELDS: [&str; 6] = [
    "date",
    "temp_max_c",
    "temp_min_c",
    "has_rain",
    "has_snow",
    "is_foggy",
];

/// Daily statistics and where they were written
#[derive(Debug, Clone)]
pub struct GoldOutput {
    /// Aggregate table, located at the gold root
    pub dataset: Dataset,
    /// Columnar snapshot
    pub parquet_path: PathBuf,
    /// Delimited text snapshot
    pub csv_path: PathBuf,
}

/// Builds and persists the daily statistics
#[derive(Debug, Clone)]
pub struct GoldProcessor {
    gold_root: PathBuf,
    start_date: NaiveDate,
    holiday_join: HolidayJoin,
    writer_config: ParquetWriterConfig,
}

impl GoldProcessor {
    /// Create a processor writing under `gold_root`
    pub fn new(gold_root: impl Into<PathBuf>) -> Self {
        Self {
            gold_root: gold_root.into(),
            start_date: default_start_date(),
            holiday_join: HolidayJoin::default(),
            writer_config: ParquetWriterConfig::default(),
        }
    }

    /// Set the first collision date kept
    #[must_use]
    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    /// Set how holidays sharing a date are joined
    #[must_use]
    pub fn with_holiday_join(mut self, holiday_join: HolidayJoin) -> Self {
        self.holiday_join = holiday_join;
        self
    }

    /// Gold root directory
    pub fn gold_root(&self) -> &Path {
        &self.gold_root
    }

    /// Build the aggregate and replace the gold snapshot
    pub fn process(
        &self,
        collisions: &DatasetInput,
        holidays: &DatasetInput,
        weather: &DatasetInput,
    ) -> Result<GoldOutput> {
        info!("Processing daily statistics (standardized -> aggregate)");
        let table = self.aggregate(collisions, holidays, weather)?;

        replace_directory(&self.gold_root)?;
        let parquet_path = self.gold_root.join(PARQUET_FILE);
        let csv_path = self.gold_root.join(CSV_FILE);
        write_table_to_parquet(&parquet_path, &table, Some(&self.writer_config))?;
        write_table_to_csv(&csv_path, &table)?;
        info!(
            "Saved {} daily rows to {} and {}",
            table.num_rows(),
            parquet_path.display(),
            csv_path.display()
        );

        Ok(GoldOutput {
            dataset: Dataset::new(table, &self.gold_root),
            parquet_path,
            csv_path,
        })
    }

    /// Build the aggregate without persisting it
    pub fn aggregate(
        &self,
        collisions: &DatasetInput,
        holidays: &DatasetInput,
        weather: &DatasetInput,
    ) -> Result<Table> {
        let engine = QueryEngine::new()?;
        let standardized = InputFormat::Partitioned;

        let report = engine.register_input("collisions", collisions, &standardized)?;
        let mut collision_fields = COLLISION_FIELDS.to_vec();
        collision_fields.extend(METRIC_COLUMNS);
        engine.require_columns("collisions", "collisions", &collision_fields)?;

        engine.register_input("holidays", holidays, &standardized)?;
        engine.require_columns("holidays", "holidays", &HOLIDAY_FIELDS)?;

        engine.register_input("weather", weather, &standardized)?;
        engine.require_columns("weather", "weather", &WEATHER_FIELDS)?;

        engine.execute(&self.holiday_view_sql())?;
        engine.execute(
            "CREATE OR REPLACE TEMP VIEW weather_days AS \
             SELECT date, temp_max_c, temp_min_c, has_rain, has_snow, is_foggy FROM weather",
        )?;

        let table = engine.query_table(&self.daily_stats_sql())?;
        info!(
            "Aggregated {} collisions into {} daily rows",
            report.rows,
            table.num_rows()
        );
        Ok(table)
    }

    fn holiday_view_sql(&self) -> String {
        match self.holiday_join {
            HolidayJoin::Collapse => "CREATE OR REPLACE TEMP VIEW holiday_days AS \
                SELECT \
                    date, \
                    array_to_string(list_sort(list_distinct( \
                        list(holiday_name) FILTER (WHERE holiday_name IS NOT NULL))), ' / ') AS holiday_name, \
                    list_sort(list_distinct(flatten( \
                        list(types) FILTER (WHERE types IS NOT NULL)))) AS types \
                FROM holidays \
                GROUP BY date"
                .to_string(),
            HolidayJoin::FanOut => "CREATE OR REPLACE TEMP VIEW holiday_days AS \
                SELECT date, holiday_name, types FROM holidays"
                .to_string(),
        }
    }

    fn daily_stats_sql(&self) -> String {
        let tiers = IMPACT_TIERS
            .iter()
            .map(|(name, tags)| {
                let tags = tags
                    .iter()
                    .map(|t| quote_literal(t))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("COALESCE(list_has_any(h.types, [{tags}]), false) AS {name}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        let metrics = METRIC_COLUMNS
            .iter()
            .map(|m| format!("CAST(SUM(c.{m}) AS BIGINT) AS {m}", m = quote_ident(m)))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "SELECT \
                c.date, c.borough, c.zip_code, c.is_weekend, \
                COALESCE(h.holiday_name, {non_holiday}) AS holiday_name, \
                {tiers}, \
                COALESCE(w.has_rain, false) AS has_rain, \
                COALESCE(w.has_snow, false) AS has_snow, \
                COALESCE(w.is_foggy, false) AS is_foggy, \
                w.temp_max_c AS max_temp, \
                w.temp_min_c AS min_temp, \
                CAST(COUNT(*) AS BIGINT) AS total_accidents, \
                {metrics} \
             FROM collisions c \
             LEFT JOIN holiday_days h ON c.date = h.date \
             LEFT JOIN weather_days w ON c.date = w.date \
             WHERE c.date >= CAST({start} AS DATE) \
             GROUP BY ALL \
             ORDER BY ALL",
            non_holiday = quote_literal(NON_HOLIDAY),
            start = quote_literal(&self.start_date.format("%Y-%m-%d").to_string()),
        )
    }
}
