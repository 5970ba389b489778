//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! These are testable in isolation without database access.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use usercache_core::users::{NewUser, User};

/// Convert a SQLite row to a User.
///
/// Expected columns: id, external_id, name, date_added
pub fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let id: i64 = row.get(0)?;
    let external_id: String = row.get(1)?;
    let name: String = row.get(2)?;
    let date_added: String = row.get(3)?;

    Ok(User {
        id: Some(id),
        external_id: parse_uuid(1, &external_id)?,
        name,
        date_added: parse_datetime(3, &date_added)?,
    })
}

/// Flatten rows into the positional parameters of a multi-row INSERT.
///
/// Order per row: external_id, name, date_added.
pub fn new_users_to_params(rows: &[NewUser]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| {
            [
                row.external_id.to_string(),
                row.name.clone(),
                format_datetime(&row.date_added),
            ]
        })
        .collect()
}

/// Format a DateTime for SQLite storage (RFC 3339).
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse a UUID from string.
fn parse_uuid(column: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a datetime from RFC 3339 string.
fn parse_datetime(column: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
