//! Lazily loaded, change-tracking containers for aggregate-internal data.
//!
//! # Responsibility
//! - Defer loading of aggregate fields until first access.
//! - Track local edits relative to the last-known baseline so persistence
//!   layers can write only the delta.
//!
//! # Invariants
//! - Fetch failures are never cached; the next access retries.
//! - Reads never mark a container dirty; only local edits do.
//! - Containers are single-owner and unsynchronized. Concurrent mutation
//!   must be serialized by the owning aggregate.

pub mod collection;
pub mod value;
