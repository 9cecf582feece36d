//! Holiday calendar records

use super::Standardizer;
use crate::engine::sql::{parse_date, quote_ident};
use crate::engine::InputFormat;
use crate::types::ParsePolicy;

/// Standardizes the holiday API payload
///
/// Output is deduplicated and sorted, so standardizing the same input
/// twice gives the same rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct HolidaysStandardizer;

impl Standardizer for HolidaysStandardizer {
    fn entity(&self) -> &'static str {
        "holidays"
    }

    fn input_format(&self, _policy: ParsePolicy) -> InputFormat {
        InputFormat::JsonArray
    }

    fn required_columns(&self) -> Vec<&'static str> {
        vec!["date", "name", "types"]
    }

    fn partition_by(&self) -> &'static [&'static str] {
        &["year"]
    }

    fn transform_sql(&self, source: &str) -> String {
        format!(
            "SELECT date, holiday_name, types, year, month FROM ( \
                SELECT DISTINCT \
                    date, \
                    holiday_name, \
                    types, \
                    CAST(year(date) AS INTEGER) AS year, \
                    CAST(month(date) AS INTEGER) AS month \
                FROM ( \
                    SELECT \
                        {date} AS date, \
                        CAST(\"name\" AS VARCHAR) AS holiday_name, \
                        CAST(\"types\" AS VARCHAR[]) AS types \
                    FROM {source} \
                ) \
                WHERE date IS NOT NULL \
             ) \
             ORDER BY date, holiday_name, array_to_string(types, ',') NULLS FIRST",
            date = parse_date("\"date\"", "%Y-%m-%d"),
            source = quote_ident(source)
        )
    }
}
