//! Domain model for the employee review store.
//!
//! # Responsibility
//! - Define the value objects handed to and returned by repositories.
//! - Enforce field invariants that need no storage access.
//!
//! # Invariants
//! - A `Review` with `id == None` has never been saved or has been deleted.
//! - Checks that need the store (employee existence) live in `repo`.

pub mod review;
