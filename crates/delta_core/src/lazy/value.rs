//! Single deferred value with dirty tracking.

use crate::error::{DeltaError, DeltaResult};
use log::{debug, warn};
use serde::Serialize;
use std::fmt::{Debug, Formatter};
use std::time::Instant;

type ValueFetcher<T, E> = Box<dyn FnMut() -> Result<T, E>>;

/// Pending local edit of a `LazyValue`.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Change<'a, T> {
    pub value: &'a T,
}

/// A value that is fetched on first read and remembers local edits.
///
/// # Invariants
/// - A successful fetch runs at most once; the result is cached and the
///   fetch function is dropped.
/// - A failed fetch leaves the value unloaded, so the next `get` retries.
/// - `set` is the only operation that marks the value dirty.
/// - At least one of `value` and `fetch` is always present.
pub struct LazyValue<T, E> {
    value: Option<T>,
    fetch: Option<ValueFetcher<T, E>>,
    dirty: bool,
}

impl<T, E> LazyValue<T, E> {
    /// Creates an unloaded value backed by `fetch`.
    pub fn new<F>(fetch: F) -> Self
    where
        F: FnMut() -> Result<T, E> + 'static,
    {
        Self {
            value: None,
            fetch: Some(Box::new(fetch)),
            dirty: false,
        }
    }

    /// Creates a loaded, clean value. No fetch is ever needed.
    pub fn eager(value: T) -> Self {
        Self {
            value: Some(value),
            fetch: None,
            dirty: false,
        }
    }

    /// Returns the value, fetching it on first access.
    ///
    /// # Errors
    /// - `DeltaError::Fetch` when the fetch function fails. Nothing is cached.
    pub fn get(&mut self) -> DeltaResult<&T, E> {
        match self.value {
            Some(ref value) => Ok(value),
            None => {
                let fetched = self.run_fetch()?;
                self.fetch = None;
                let value: &T = self.value.insert(fetched);
                Ok(value)
            }
        }
    }

    /// Overwrites the value and marks it dirty. Never fetches.
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
        self.fetch = None;
        self.dirty = true;
    }

    /// Returns the pending edit, if any.
    ///
    /// Does not clear the dirty flag; repeated calls return the same change.
    pub fn change(&self) -> Option<Change<'_, T>> {
        if !self.dirty {
            return None;
        }
        self.value.as_ref().map(|value| Change { value })
    }

    /// Returns the cached value without fetching.
    ///
    /// Always `Some` for eager values.
    pub fn peek(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // Only reached while unloaded, where the constructors guarantee a fetch
    // function; a value with neither answers `NotFound`.
    fn run_fetch(&mut self) -> DeltaResult<T, E> {
        let Some(fetch) = self.fetch.as_mut() else {
            return Err(DeltaError::NotFound);
        };

        let started_at = Instant::now();
        match fetch() {
            Ok(value) => {
                debug!(
                    "event=value_fetch module=lazy status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                warn!(
                    "event=value_fetch module=lazy status=error duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Err(DeltaError::Fetch(err))
            }
        }
    }
}

impl<T: Debug, E> Debug for LazyValue<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyValue")
            .field("value", &self.peek())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::LazyValue;
    use crate::error::DeltaError;

    #[test]
    fn eager_value_is_loaded_and_clean() {
        let value: LazyValue<i32, ()> = LazyValue::eager(1);
        assert!(value.is_loaded());
        assert!(!value.is_dirty());
        assert_eq!(value.peek(), Some(&1));
        assert!(value.change().is_none());
    }

    #[test]
    fn set_marks_dirty_and_change_is_stable() {
        let mut value: LazyValue<i32, ()> = LazyValue::eager(1);
        value.set(2);

        assert_eq!(value.change().map(|change| *change.value), Some(2));
        assert_eq!(value.change().map(|change| *change.value), Some(2));
        assert!(value.is_dirty());
    }

    #[test]
    fn set_on_unloaded_value_never_fetches() {
        let mut value: LazyValue<&str, &str> = LazyValue::new(|| Err("must not run"));
        value.set("local");

        assert_eq!(value.get(), Ok(&"local"));
    }

    #[test]
    fn failed_fetch_leaves_value_unloaded() {
        let mut value: LazyValue<u8, &str> = LazyValue::new(|| Err("offline"));

        assert_eq!(value.get(), Err(DeltaError::Fetch("offline")));
        assert!(!value.is_loaded());
        assert_eq!(value.peek(), None);
    }

    #[test]
    fn first_successful_get_caches_and_drops_fetch() {
        let mut value: LazyValue<u8, &str> = LazyValue::new(|| Ok(7));

        assert_eq!(value.get(), Ok(&7));
        assert!(value.is_loaded());
        assert!(value.fetch.is_none());
        assert_eq!(value.peek(), Some(&7));
        assert!(!value.is_dirty());
    }

    #[test]
    fn debug_elides_fetch_function() {
        let value: LazyValue<u8, ()> = LazyValue::new(|| Ok(1));
        let rendered = format!("{value:?}");
        assert!(rendered.contains("LazyValue"));
        assert!(rendered.contains("dirty: false"));
    }
}
