//! Error types returned by lazy containers.
//!
//! # Invariants
//! - `Fetch` is never cached; the next access retries the fetch.
//! - `NotFound` is recorded as a tombstone and returned until a later `set`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DeltaResult<T, E> = Result<T, DeltaError<E>>;

/// Failure of a lazy container read, generic over the fetch error `E`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaError<E> {
    /// The identity is confirmed absent, by an empty fetch or a local removal.
    NotFound,
    /// The caller-supplied fetch function failed.
    Fetch(E),
}

impl<E> DeltaError<E> {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns the underlying fetch error, if any.
    pub fn into_fetch(self) -> Option<E> {
        match self {
            Self::NotFound => None,
            Self::Fetch(err) => Some(err),
        }
    }
}

impl<E: Display> Display for DeltaError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "item not found"),
            Self::Fetch(err) => write!(f, "fetch failed: {err}"),
        }
    }
}

impl<E: Error + 'static> Error for DeltaError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound => None,
            Self::Fetch(err) => Some(err),
        }
    }
}
