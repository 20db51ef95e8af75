//! Review repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Own the `reviews` table lifecycle (create/drop).
//! - Provide CRUD and lookup APIs over `reviews`.
//! - Track saved reviews in an identity map scoped to the repository value.
//!
//! # Invariants
//! - Reads always return fresh values; the identity map is never consulted
//!   to answer a query.
//! - A review is inserted at most once: saving a persisted value is an error.
//! - Only reviews saved through this repository can be deleted through it.
//! - Read paths reject invalid persisted state instead of masking it,
//!   including rows whose employee no longer exists.

use crate::db::DbError;
use crate::model::review::{EmployeeId, Review, ReviewId, ReviewValidationError};
use log::{info, warn};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const CREATE_REVIEWS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS reviews (
  id INTEGER PRIMARY KEY,
  year INT,
  summary TEXT,
  employee_id INTEGER,
  FOREIGN KEY (employee_id) REFERENCES employee(id)
)";

const DROP_REVIEWS_TABLE_SQL: &str = "DROP TABLE IF EXISTS reviews;";

const REVIEW_SELECT_SQL: &str = "SELECT
    id,
    year,
    summary,
    employee_id
FROM reviews";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for review persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Field input broke a review invariant.
    Validation(ReviewValidationError),
    /// Underlying store failure, passed through untranslated.
    Db(DbError),
    /// No `reviews` row has this id.
    NotFound(ReviewId),
    /// The operation needs a saved review but `id` is unset.
    NotPersisted,
    /// `save` was called on a review that already has an id.
    AlreadyPersisted(ReviewId),
    /// The id is not in this repository's identity map.
    NotTracked(ReviewId),
    /// A stored row cannot be turned back into a valid review.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "review not found: {id}"),
            Self::NotPersisted => write!(f, "review has not been saved"),
            Self::AlreadyPersisted(id) => write!(f, "review {id} is already saved"),
            Self::NotTracked(id) => write!(f, "review {id} is not tracked by this repository"),
            Self::InvalidData(message) => write!(f, "invalid persisted review data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ReviewValidationError> for RepoError {
    fn from(value: ReviewValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for review lifecycle and CRUD operations.
pub trait ReviewRepository {
    /// Creates `reviews` if it does not exist yet.
    fn create_table(&self) -> RepoResult<()>;
    /// Drops `reviews` if it exists.
    fn drop_table(&self) -> RepoResult<()>;
    /// Builds an unsaved review, validating all three fields.
    fn build(&self, year: i64, summary: &str, employee_id: EmployeeId) -> RepoResult<Review>;
    /// Re-points `review` at another employee after checking it exists.
    fn assign_employee(&self, review: &mut Review, employee_id: EmployeeId) -> RepoResult<()>;
    /// Inserts an unsaved review and returns the store-assigned id.
    fn save(&mut self, review: &mut Review) -> RepoResult<ReviewId>;
    /// Writes current field values to the row of a saved review.
    fn update(&mut self, review: &Review) -> RepoResult<()>;
    /// Deletes the row of a tracked review and detaches the value.
    fn delete(&mut self, review: &mut Review) -> RepoResult<()>;
    /// Loads one review by id.
    fn find_by_id(&self, id: ReviewId) -> RepoResult<Option<Review>>;
    /// Loads every review, ordered by id.
    fn get_all(&self) -> RepoResult<Vec<Review>>;
    /// Loads every review written for `employee_id`, ordered by id.
    fn get_by_employee_id(&self, employee_id: EmployeeId) -> RepoResult<Vec<Review>>;
    /// Returns the identity-map snapshot for `id`, if this repository saved it.
    fn tracked(&self, id: ReviewId) -> Option<&Review>;
    /// Ids currently held in the identity map, ascending.
    fn tracked_ids(&self) -> Vec<ReviewId>;

    /// Builds and saves a review in one step.
    fn create(&mut self, year: i64, summary: &str, employee_id: EmployeeId) -> RepoResult<Review> {
        let mut review = self.build(year, summary, employee_id)?;
        self.save(&mut review)?;
        Ok(review)
    }
}

/// SQLite-backed review repository.
///
/// The identity map is dropped together with the repository; a fresh
/// repository over the same connection starts with nothing tracked.
pub struct SqliteReviewRepository<'conn> {
    conn: &'conn Connection,
    identity_map: HashMap<ReviewId, Review>,
}

impl<'conn> SqliteReviewRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            identity_map: HashMap::new(),
        }
    }

    /// Checks `employees` for `employee_id` on every call.
    fn ensure_employee_exists(&self, employee_id: EmployeeId) -> RepoResult<()> {
        let found = self
            .conn
            .query_row(
                "SELECT id FROM employees WHERE id = ?1;",
                [employee_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        if found.is_none() {
            return Err(ReviewValidationError::UnknownEmployee { employee_id }.into());
        }
        Ok(())
    }

    fn query_reviews(&self, sql: &str, bind: Option<i64>) -> RepoResult<Vec<Review>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match bind {
            Some(value) => stmt.query([value])?,
            None => stmt.query([])?,
        };
        let mut reviews = Vec::new();

        while let Some(row) = rows.next()? {
            reviews.push(self.rehydrate(row)?);
        }

        Ok(reviews)
    }

    /// Rebuilds a row into a fresh value, re-running every field check.
    fn rehydrate(&self, row: &Row<'_>) -> RepoResult<Review> {
        let review = parse_review_row(row)?;
        self.ensure_employee_exists(review.employee_id())?;
        Ok(review)
    }
}

impl ReviewRepository for SqliteReviewRepository<'_> {
    fn create_table(&self) -> RepoResult<()> {
        self.conn.execute_batch(CREATE_REVIEWS_TABLE_SQL)?;
        info!("event=table_create module=repo status=ok table=reviews");
        Ok(())
    }

    fn drop_table(&self) -> RepoResult<()> {
        self.conn.execute_batch(DROP_REVIEWS_TABLE_SQL)?;
        info!("event=table_drop module=repo status=ok table=reviews");
        Ok(())
    }

    fn build(&self, year: i64, summary: &str, employee_id: EmployeeId) -> RepoResult<Review> {
        let review = Review::new(year, summary, employee_id)?;
        self.ensure_employee_exists(employee_id)?;
        Ok(review)
    }

    fn assign_employee(&self, review: &mut Review, employee_id: EmployeeId) -> RepoResult<()> {
        self.ensure_employee_exists(employee_id)?;
        review.set_employee_id(employee_id);
        Ok(())
    }

    fn save(&mut self, review: &mut Review) -> RepoResult<ReviewId> {
        if let Some(id) = review.id() {
            warn!("event=review_save module=repo status=rejected reason=already_persisted id={id}");
            return Err(RepoError::AlreadyPersisted(id));
        }

        self.conn.execute(
            "INSERT INTO reviews (year, summary, employee_id) VALUES (?1, ?2, ?3);",
            params![review.year(), review.summary(), review.employee_id()],
        )?;

        let id = self.conn.last_insert_rowid();
        review.set_id(Some(id));
        self.identity_map.insert(id, review.clone());
        info!(
            "event=review_save module=repo status=ok id={id} employee_id={}",
            review.employee_id()
        );
        Ok(id)
    }

    fn update(&mut self, review: &Review) -> RepoResult<()> {
        let id = review.id().ok_or(RepoError::NotPersisted)?;

        let changed = self.conn.execute(
            "UPDATE reviews
             SET year = ?1, summary = ?2, employee_id = ?3
             WHERE id = ?4;",
            params![review.year(), review.summary(), review.employee_id(), id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        if let Some(tracked) = self.identity_map.get_mut(&id) {
            *tracked = review.clone();
        }
        info!("event=review_update module=repo status=ok id={id}");
        Ok(())
    }

    fn delete(&mut self, review: &mut Review) -> RepoResult<()> {
        let id = review.id().ok_or(RepoError::NotPersisted)?;
        if !self.identity_map.contains_key(&id) {
            warn!("event=review_delete module=repo status=rejected reason=not_tracked id={id}");
            return Err(RepoError::NotTracked(id));
        }

        let changed = self
            .conn
            .execute("DELETE FROM reviews WHERE id = ?1;", [id])?;

        // Stale once the row is gone, whoever removed it.
        self.identity_map.remove(&id);
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        review.set_id(None);
        info!("event=review_delete module=repo status=ok id={id}");
        Ok(())
    }

    fn find_by_id(&self, id: ReviewId) -> RepoResult<Option<Review>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REVIEW_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(self.rehydrate(row)?));
        }

        Ok(None)
    }

    fn get_all(&self) -> RepoResult<Vec<Review>> {
        self.query_reviews(&format!("{REVIEW_SELECT_SQL} ORDER BY id ASC;"), None)
    }

    fn get_by_employee_id(&self, employee_id: EmployeeId) -> RepoResult<Vec<Review>> {
        self.query_reviews(
            &format!("{REVIEW_SELECT_SQL} WHERE employee_id = ?1 ORDER BY id ASC;"),
            Some(employee_id),
        )
    }

    fn tracked(&self, id: ReviewId) -> Option<&Review> {
        self.identity_map.get(&id)
    }

    fn tracked_ids(&self) -> Vec<ReviewId> {
        let mut ids: Vec<ReviewId> = self.identity_map.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

fn parse_review_row(row: &Row<'_>) -> RepoResult<Review> {
    let id: ReviewId = row.get("id")?;

    let year = match row.get_ref("year")? {
        ValueRef::Integer(value) => value,
        _ => return Err(ReviewValidationError::NonIntegerYear.into()),
    };

    let summary = row.get::<_, Option<String>>("summary")?.ok_or_else(|| {
        RepoError::InvalidData(format!("reviews.summary for id {id} is NULL"))
    })?;

    let employee_id = row.get::<_, Option<EmployeeId>>("employee_id")?.ok_or_else(|| {
        RepoError::InvalidData(format!("reviews.employee_id for id {id} is NULL"))
    })?;

    Ok(Review::from_stored(id, year, summary, employee_id)?)
}
