//! Core persistence for employee performance reviews.
//! This crate owns the `reviews` table and the review field invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::{open_db, open_db_in_memory, DbError, DbOptions, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::review::{EmployeeId, Review, ReviewId, ReviewValidationError, MIN_REVIEW_YEAR};
pub use repo::review_repo::{RepoError, RepoResult, ReviewRepository, SqliteReviewRepository};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
