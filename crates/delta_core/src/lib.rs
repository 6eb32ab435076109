//! Lazy loading and delta tracking for aggregate-internal data.
//!
//! Aggregates hold their expensive or large parts in a [`LazyValue`] or a
//! [`LazyCollection`]. Both fetch on first access through a caller-supplied
//! function and remember local edits, so a persistence layer can read
//! [`LazyValue::change`] and [`LazyCollection::changes`] and write only the
//! delta instead of the whole aggregate.
//!
//! This crate performs no I/O itself and is not synchronized: each container
//! belongs to exactly one aggregate, which serializes access to it.

pub mod error;
pub mod lazy;
pub mod logging;
pub mod model;
pub mod store;

pub use error::{DeltaError, DeltaResult};
pub use lazy::collection::{Changes, ItemChange, LazyCollection};
pub use lazy::value::{Change, LazyValue};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::status::{FetchScope, Identifiable, Status};
pub use store::OrderedStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
