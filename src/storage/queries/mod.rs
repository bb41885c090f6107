//! Database query modules for CRUD operations.
//!
//! Each module provides async functions that operate on the database.

pub mod accounts;
pub mod addresses;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

/// Parses an RFC 3339 column value, reporting failures against column `idx`.
fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
