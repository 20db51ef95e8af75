//! Review domain model.
//!
//! # Responsibility
//! - Hold one performance review written for one employee.
//! - Validate `year` and `summary` on construction and on every mutation.
//!
//! # Invariants
//! - `year >= MIN_REVIEW_YEAR`.
//! - `summary` is never empty.
//! - `employee_id` is only assigned by the repository, after an existence
//!   check against `employees`.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned primary key of a `reviews` row.
pub type ReviewId = i64;

/// Primary key of a row in the external `employees` table.
pub type EmployeeId = i64;

/// Earliest accepted review year.
pub const MIN_REVIEW_YEAR: i64 = 2000;

/// Field-level validation failure for review input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewValidationError {
    /// `year` is earlier than `MIN_REVIEW_YEAR`.
    YearTooEarly { year: i64 },
    /// `year` was read from the store as something other than an integer.
    NonIntegerYear,
    /// `summary` is the empty string.
    EmptySummary,
    /// No `employees` row has this id.
    UnknownEmployee { employee_id: EmployeeId },
}

impl Display for ReviewValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YearTooEarly { year } => write!(
                f,
                "year must be greater than or equal to {MIN_REVIEW_YEAR}, got {year}"
            ),
            Self::NonIntegerYear => write!(f, "year must be an integer"),
            Self::EmptySummary => write!(f, "summary must be a non-empty string"),
            Self::UnknownEmployee { employee_id } => {
                write!(f, "invalid employee_id: {employee_id}")
            }
        }
    }
}

impl Error for ReviewValidationError {}

/// One performance review row.
///
/// Values are plain snapshots: two `Review`s with the same `id` are
/// independent copies and mutating one never affects the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    id: Option<ReviewId>,
    year: i64,
    summary: String,
    employee_id: EmployeeId,
}

impl Review {
    /// Builds an unsaved review after validating `year` and `summary`.
    ///
    /// `employee_id` is taken as-is; callers outside the crate go through
    /// `ReviewRepository::build`, which checks it against the store.
    pub(crate) fn new(
        year: i64,
        summary: impl Into<String>,
        employee_id: EmployeeId,
    ) -> Result<Self, ReviewValidationError> {
        let summary = summary.into();
        validate_year(year)?;
        validate_summary(&summary)?;
        Ok(Self {
            id: None,
            year,
            summary,
            employee_id,
        })
    }

    /// Rebuilds a persisted review from stored column values.
    pub(crate) fn from_stored(
        id: ReviewId,
        year: i64,
        summary: String,
        employee_id: EmployeeId,
    ) -> Result<Self, ReviewValidationError> {
        let mut review = Self::new(year, summary, employee_id)?;
        review.id = Some(id);
        Ok(review)
    }

    /// Store-assigned id, or `None` when not persisted.
    pub fn id(&self) -> Option<ReviewId> {
        self.id
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    /// Returns whether this value is attached to a stored row.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Replaces `year`, leaving the value untouched on failure.
    pub fn set_year(&mut self, year: i64) -> Result<(), ReviewValidationError> {
        validate_year(year)?;
        self.year = year;
        Ok(())
    }

    /// Replaces `summary`, leaving the value untouched on failure.
    pub fn set_summary(
        &mut self,
        summary: impl Into<String>,
    ) -> Result<(), ReviewValidationError> {
        let summary = summary.into();
        validate_summary(&summary)?;
        self.summary = summary;
        Ok(())
    }

    pub(crate) fn set_employee_id(&mut self, employee_id: EmployeeId) {
        self.employee_id = employee_id;
    }

    pub(crate) fn set_id(&mut self, id: Option<ReviewId>) {
        self.id = id;
    }
}

impl Display for Review {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "<Review {id}: ")?,
            None => write!(f, "<Review None: ")?,
        }
        write!(
            f,
            "{}, {}, Employee: {}>",
            self.year, self.summary, self.employee_id
        )
    }
}

fn validate_year(year: i64) -> Result<(), ReviewValidationError> {
    if year < MIN_REVIEW_YEAR {
        return Err(ReviewValidationError::YearTooEarly { year });
    }
    Ok(())
}

fn validate_summary(summary: &str) -> Result<(), ReviewValidationError> {
    if summary.is_empty() {
        return Err(ReviewValidationError::EmptySummary);
    }
    Ok(())
}
