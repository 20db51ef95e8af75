//! SQLite storage bootstrap for the review store.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections with explicit options.
//! - Wrap transport failures into one storage error type.
//!
//! # Invariants
//! - Connections are configured before any review data is read or written.
//! - Schema for `reviews` is owned by the repository, not by this module.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

mod open;

pub use open::{open_db, open_db_in_memory, open_db_in_memory_with, open_db_with};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Connection options applied right after open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbOptions {
    /// Turns on `PRAGMA foreign_keys`.
    ///
    /// Off by default: `reviews.employee_id` references `employee(id)` while
    /// employee rows live in `employees`, and SQLite refuses child-table
    /// writes when enforcement is on and the parent table is missing.
    pub enforce_foreign_keys: bool,
    /// How long a statement waits on a locked database file.
    pub busy_timeout: Duration,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            enforce_foreign_keys: false,
            busy_timeout: Duration::from_secs(5),
        }
    }
}
