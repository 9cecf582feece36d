//! SQL text helpers
//!
//! Quoting and the expression fragments shared by the layer processors.

use std::path::Path;

/// Quote an identifier (`"name"`)
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal (`'text'`)
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Quote a filesystem path as a string literal
pub fn path_literal(path: &Path) -> String {
    quote_literal(&path.to_string_lossy())
}

/// Expression parsing `expr` into a DATE with a strptime format
///
/// Columns already typed as dates by the CSV sniffer pass through.
/// Anything unparseable yields NULL.
pub fn parse_date(expr: &str, format: &str) -> String {
    format!(
        "COALESCE(TRY_STRPTIME(trim(CAST({expr} AS VARCHAR)), {fmt})::DATE, TRY_CAST({expr} AS DATE))",
        fmt = quote_literal(format)
    )
}

/// Expression converting `expr` to DOUBLE, NULL when non-numeric
pub fn to_double(expr: &str) -> String {
    format!("TRY_CAST(trim(CAST({expr} AS VARCHAR)) AS DOUBLE)")
}

/// Expression converting `expr` to a non-negative INTEGER counter
///
/// Missing or non-numeric values become 0, negative values are clamped.
pub fn to_counter(expr: &str) -> String {
    format!("GREATEST(COALESCE(TRY_CAST({} AS INTEGER), 0), 0)", to_double(expr))
}

/// Expression true when `expr` numerically equals 1, false otherwise
pub fn is_one(expr: &str) -> String {
    format!("COALESCE({} = 1, false)", to_double(expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("CRASH DATE"), "\"CRASH DATE\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_quote_literal_escapes() {
        assert_eq!(quote_literal("New Year's Day"), "'New Year''s Day'");
    }

    #[test]
    fn test_parse_date_mentions_format() {
        let sql = parse_date("\"date\"", "%Y-%m-%d");
        assert!(sql.contains("TRY_STRPTIME"));
        assert!(sql.contains("'%Y-%m-%d'"));
    }
}
