//! Daily weather observations

use super::Standardizer;
use crate::engine::sql::{is_one, parse_date, quote_ident, quote_literal, to_double};
use crate::engine::{CsvOptions, InputFormat};
use crate::types::ParsePolicy;
use chrono::NaiveDate;

/// Standardizes station observations
///
/// Raw values are read as text; temperatures and precipitation arrive in
/// tenths of their unit.
#[derive(Debug, Clone, Copy)]
pub struct WeatherStandardizer {
    start_date: NaiveDate,
}

impl WeatherStandardizer {
    /// Keep observations on or after `start_date`
    pub fn new(start_date: NaiveDate) -> Self {
        Self { start_date }
    }
}

impl Standardizer for WeatherStandardizer {
    fn entity(&self) -> &'static str {
        "weather"
    }

    fn input_format(&self, policy: ParsePolicy) -> InputFormat {
        InputFormat::Csv(CsvOptions::new().all_varchar().policy(policy))
    }

    fn required_columns(&self) -> Vec<&'static str> {
        vec!["DATE", "TMAX", "TMIN", "PRCP", "SNOW", "WT01", "WT02"]
    }

    fn partition_by(&self) -> &'static [&'static str] {
        &["year", "month"]
    }

    fn transform_sql(&self, source: &str) -> String {
        let prcp = to_double("\"PRCP\"");
        let snow = to_double("\"SNOW\"");

        format!(
            "SELECT \
                date, temp_max_c, temp_min_c, precipitation_mm, snow_mm, \
                is_foggy, has_rain, has_snow, \
                CAST(year(date) AS INTEGER) AS year, \
                CAST(month(date) AS INTEGER) AS month \
             FROM ( \
                SELECT \
                    {date} AS date, \
                    ROUND({tmax} / 10, 1) AS temp_max_c, \
                    ROUND({tmin} / 10, 1) AS temp_min_c, \
                    {prcp} / 10 AS precipitation_mm, \
                    {snow} AS snow_mm, \
                    ({wt01} OR {wt02}) AS is_foggy, \
                    COALESCE({prcp} > 0, false) AS has_rain, \
                    COALESCE({snow} > 0, false) AS has_snow \
                FROM {source} \
             ) \
             WHERE date IS NOT NULL AND date >= CAST({start} AS DATE)",
            date = parse_date("\"DATE\"", "%Y-%m-%d"),
            tmax = to_double("\"TMAX\""),
            tmin = to_double("\"TMIN\""),
            wt01 = is_one("\"WT01\""),
            wt02 = is_one("\"WT02\""),
            start = quote_literal(&self.start_date.format("%Y-%m-%d").to_string()),
            source = quote_ident(source)
        )
    }
}
