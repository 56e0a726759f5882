//! Persisted domain model.
//!
//! # Responsibility
//! - Define the single pregnancy state document and its photo records.
//! - Keep mutation helpers next to the invariants they protect.
//!
//! # Invariants
//! - `currentWeek` stays inside `[1, 42]`.
//! - At most one photo per week after any upsert.
//! - `bornDate` is set if and only if `babyBorn` is true.

pub mod state;
