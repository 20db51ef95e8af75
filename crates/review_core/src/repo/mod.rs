//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for reviews.
//! - Keep SQLite statements out of model and caller code.
//!
//! # Invariants
//! - Checks that need the store (employee existence) run here, as explicit
//!   steps, never inside plain field assignment.
//! - Repository APIs return semantic errors (`NotFound`, `NotTracked`) in
//!   addition to DB transport errors.

pub mod review_repo;
