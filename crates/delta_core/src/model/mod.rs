//! Shared tracking vocabulary for lazy containers.
//!
//! # Responsibility
//! - Define the per-identity change status reported to persistence layers.
//! - Define the identity capability required of collection items.
//! - Define the fetch scope passed to collection fetch functions.
//!
//! # Invariants
//! - `Status::Unchanged` is never reported in a changeset.
//! - Tombstone statuses (`Removed`, `Absent`) never carry a value.

pub mod status;
