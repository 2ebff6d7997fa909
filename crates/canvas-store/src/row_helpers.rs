use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// Get a required column value from a row, returning CorruptRow on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

pub fn get_opt<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Option<T>, StoreError> {
    get(row, idx, table, column)
}

/// Deserialize a JSON text column.
pub fn parse_json<T: DeserializeOwned>(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: format!("invalid JSON: {e}"),
    })
}

pub fn parse_timestamp(
    raw: &str,
    table: &'static str,
    column: &'static str,
) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            table,
            column,
            detail: format!("invalid timestamp {raw:?}: {e}"),
        })
}

/// Timestamps are written with fixed precision so text order is time order.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_failure() {
        let result: Result<serde_json::Value, _> = parse_json("{nope", "threads", "values_json");
        assert!(matches!(
            result,
            Err(StoreError::CorruptRow { table: "threads", column: "values_json", .. })
        ));
    }

    #[test]
    fn timestamp_roundtrip_and_ordering() {
        let early = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let late = early + chrono::Duration::milliseconds(1500);
        let (a, b) = (format_timestamp(&early), format_timestamp(&late));
        assert!(a < b);
        assert_eq!(parse_timestamp(&a, "t", "c").unwrap(), early);
        assert!(parse_timestamp("yesterday", "t", "c").is_err());
    }
}
