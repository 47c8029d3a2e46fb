//! Row-level access, one module per table group.
//!
//! Free functions take a `&Connection` so the engine can compose them inside
//! a transaction; the `Database` methods wrap the single-statement ones.

pub mod applications;
pub mod credentials;
pub mod drives;
pub mod students;

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::parse_timestamp;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Read a text column through `FromStr` (status enums, roles).
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn json_set_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<Vec<T>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|json| serde_json::from_str(&json).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Serialize an optional set. An empty set is stored as NULL: both mean "no restriction".
pub(crate) fn json_set_value<T: Serialize>(set: &Option<Vec<T>>) -> anyhow::Result<Option<String>> {
    match set {
        Some(values) if !values.is_empty() => Ok(Some(serde_json::to_string(values)?)),
        _ => Ok(None),
    }
}

/// `?start, ?start+1, ...` for an IN list.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}
