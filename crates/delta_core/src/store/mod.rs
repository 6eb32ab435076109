//! Insertion-ordered associative storage backing lazy collections.
//!
//! # Invariants
//! - Iteration order is the order of first insertion.
//! - Updating an existing key keeps its position.
//! - Deleting a key preserves the relative order of the remaining keys.

mod ordered;

pub use ordered::OrderedStore;
