//! SQLite schema definitions and SQL query constants.
//!
//! This module contains all SQL statements used by the SQLite repository,
//! following the Functional Core pattern - pure data, no I/O. Every value
//! reaches SQLite as a bound parameter; only placeholder lists are built at
//! runtime.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    date_added TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_name ON users(name);
"#;

pub const SELECT_ALL_USERS: &str = r#"
SELECT id, external_id, name, date_added
FROM users
ORDER BY id ASC
"#;

pub const SELECT_USER_BY_ID: &str = r#"
SELECT id, external_id, name, date_added
FROM users
WHERE id = ?1
"#;

pub const SELECT_USERS_BY_NAME: &str = r#"
SELECT id, external_id, name, date_added
FROM users
WHERE name = ?1
ORDER BY id ASC
"#;

pub const UPDATE_USER_NAME: &str = r#"
UPDATE users
SET name = ?2
WHERE id = ?1
"#;

pub const DELETE_USER: &str = r#"
DELETE FROM users
WHERE id = ?1
"#;

/// Columns bound per row by [`bulk_insert_users`].
pub const BULK_INSERT_COLUMNS: usize = 3;

/// Rows per multi-row INSERT, keeping each statement under SQLite's
/// historical 999 bound-parameter limit.
pub const BULK_INSERT_CHUNK: usize = 999 / BULK_INSERT_COLUMNS;

/// Builds a multi-row INSERT for `rows` users.
///
/// Produces `INSERT OR IGNORE INTO users (external_id, name, date_added)
/// VALUES (?, ?, ?), (?, ?, ?), ...`. Rows whose `external_id` already
/// exists are ignored, which makes redelivered batches idempotent.
pub fn bulk_insert_users(rows: usize) -> String {
    let placeholders = vec!["(?, ?, ?)"; rows].join(", ");
    format!("INSERT OR IGNORE INTO users (external_id, name, date_added) VALUES {placeholders}")
}
