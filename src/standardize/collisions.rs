//! Collision records

use super::Standardizer;
use crate::engine::sql::{parse_date, quote_ident, to_counter};
use crate::engine::{CsvOptions, InputFormat};
use crate::types::ParsePolicy;

/// Source column to canonical column, in output order
pub const COLLISION_COLUMNS: &[(&str, &str)] = &[
    ("CRASH DATE", "crash_date"),
    ("CRASH TIME", "crash_time"),
    ("BOROUGH", "borough"),
    ("ZIP CODE", "zip_code"),
    ("NUMBER OF PERSONS INJURED", "number_of_persons_injured"),
    ("NUMBER OF PERSONS KILLED", "number_of_persons_killed"),
    ("NUMBER OF PEDESTRIANS INJURED", "number_of_pedestrians_injured"),
    ("NUMBER OF PEDESTRIANS KILLED", "number_of_pedestrians_killed"),
    ("NUMBER OF CYCLIST INJURED", "number_of_cyclist_injured"),
    ("NUMBER OF CYCLIST KILLED", "number_of_cyclist_killed"),
    ("NUMBER OF MOTORIST INJURED", "number_of_motorist_injured"),
    ("NUMBER OF MOTORIST KILLED", "number_of_motorist_killed"),
    ("CONTRIBUTING FACTOR VEHICLE 1", "contributing_factor_vehicle_1"),
];

/// Casualty counters, summed by the aggregate layer
pub const METRIC_COLUMNS: [&str; 8] = [
    "number_of_persons_injured",
    "number_of_persons_killed",
    "number_of_pedestrians_injured",
    "number_of_pedestrians_killed",
    "number_of_cyclist_injured",
    "number_of_cyclist_killed",
    "number_of_motorist_injured",
    "number_of_motorist_killed",
];

/// Source columns read as text rather than inferred
pub const COLLISION_TEXT_COLUMNS: &[&str] = &["CRASH TIME", "ZIP CODE"];

const DATE_FORMAT: &str = "%m/%d/%Y";

/// Standardizes raw collision records
///
/// Times and zip codes keep their source spelling. The crash date string is parsed into `date`; rows without a
/// usable date are dropped. Counters never come out null or negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionsStandardizer;

impl Standardizer for CollisionsStandardizer {
    fn entity(&self) -> &'static str {
        "collisions"
    }

    fn input_format(&self, policy: ParsePolicy) -> InputFormat {
        InputFormat::Csv(
            CsvOptions::new()
                .text_columns(COLLISION_TEXT_COLUMNS)
                .policy(policy),
        )
    }

    fn required_columns(&self) -> Vec<&'static str> {
        COLLISION_COLUMNS.iter().map(|(source, _)| *source).collect()
    }

    fn partition_by(&self) -> &'static [&'static str] {
        &["year", "month"]
    }

    fn transform_sql(&self, source: &str) -> String {
        let mut fields = Vec::with_capacity(COLLISION_COLUMNS.len());
        for (raw, canonical) in COLLISION_COLUMNS {
            let column = quote_ident(raw);
            let expr = match *canonical {
                "crash_date" => format!("{} AS date", parse_date(&column, DATE_FORMAT)),
                "borough" => format!(
                    "COALESCE(NULLIF(trim(CAST({column} AS VARCHAR)), ''), 'UNKNOWN') AS borough"
                ),
                "zip_code" => format!("NULLIF(trim(CAST({column} AS VARCHAR)), '') AS zip_code"),
                name if METRIC_COLUMNS.contains(&name) => {
                    format!("{} AS {name}", to_counter(&column))
                }
                name => format!("CAST({column} AS VARCHAR) AS {name}"),
            };
            fields.push(expr);
        }

        format!(
            "SELECT *, \
                isodow(date) >= 6 AS is_weekend, \
                CAST(year(date) AS INTEGER) AS year, \
                CAST(month(date) AS INTEGER) AS month \
             FROM (SELECT {} FROM {}) \
             WHERE date IS NOT NULL",
            fields.join(", "),
            quote_ident(source)
        )
    }
}
