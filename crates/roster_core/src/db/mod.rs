//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure the SQLite connections that back user sessions.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Sessions must not read/write `users` before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage bootstrap failure.
#[derive(Debug)]
pub enum DbError {
    /// Driver-level failure (open, pragma, or migration statement).
    Sqlite(rusqlite::Error),
    /// The database was written by a newer binary.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema v{db_version} was written by a newer roster; this build reads up to v{latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Self::Sqlite(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
