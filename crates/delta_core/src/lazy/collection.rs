//! Deferred, identity-tracked collection with changeset reporting.
//!
//! # Responsibility
//! - Load the baseline on demand, either in full or one identity at a time.
//! - Merge pending local edits with the baseline when it arrives.
//! - Report every identity whose status differs from `Unchanged`.
//!
//! # Invariants
//! - Every key in the store is the identity of its stored value.
//! - Once fully loaded, an identity missing from the store does not exist.
//! - Removing an `Added` identity leaves no trace; any other removal leaves
//!   a `Removed` tombstone so the persistence layer can issue a delete.
//! - Read views borrow the collection. They reflect live state on every
//!   iteration and are not snapshots.

use crate::error::{DeltaError, DeltaResult};
use crate::model::status::{FetchScope, Identifiable, Status};
use crate::store::OrderedStore;
use log::{debug, trace, warn};
use serde::Serialize;
use std::fmt::{Debug, Formatter};
use std::time::Instant;

type CollectionFetcher<T, E> =
    Box<dyn FnMut(FetchScope<<T as Identifiable>::Id>) -> Result<Vec<T>, E>>;

#[derive(Debug)]
struct Item<T> {
    value: Option<T>,
    status: Status,
}

impl<T> Item<T> {
    fn live(value: T, status: Status) -> Self {
        Self {
            value: Some(value),
            status,
        }
    }

    fn tombstone(status: Status) -> Self {
        Self {
            value: None,
            status,
        }
    }

    fn live_value(&self) -> Option<&T> {
        if self.status.is_tombstone() {
            return None;
        }
        self.value.as_ref()
    }
}

/// One entry of a collection changeset.
///
/// `value` is `None` for tombstones (`Removed`, `Absent`).
#[derive(Debug, PartialEq, Serialize)]
#[serde(bound(serialize = "T: Serialize, T::Id: Serialize"))]
pub struct ItemChange<'a, T: Identifiable> {
    pub id: &'a T::Id,
    pub value: Option<&'a T>,
    pub status: Status,
}

impl<T: Identifiable> Clone for ItemChange<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Identifiable> Copy for ItemChange<'_, T> {}

/// Read view over the pending changes of a `LazyCollection`.
pub struct Changes<'a, T: Identifiable> {
    reset: bool,
    items: &'a OrderedStore<T::Id, Item<T>>,
}

impl<'a, T: Identifiable> Changes<'a, T> {
    /// Whether the whole persisted collection must be replaced.
    pub fn is_reset(&self) -> bool {
        self.reset
    }

    /// Iterates changed entries in insertion order.
    ///
    /// Each call starts a fresh pass over the live store.
    pub fn iter(&self) -> impl Iterator<Item = ItemChange<'a, T>> + 'a {
        let items = self.items;
        items
            .entries()
            .filter(|(_, item)| item.status != Status::Unchanged)
            .map(|(id, item)| ItemChange {
                id,
                value: item.value.as_ref(),
                status: item.status,
            })
    }

    /// Whether the persistence layer has anything to write.
    pub fn has_changes(&self) -> bool {
        self.reset || self.iter().next().is_some()
    }
}

/// A group of identity-keyed values that is fetched on demand and tracks
/// per-identity edits against the persisted baseline.
///
/// Eager collections are built with [`LazyCollection::eager`]; they are
/// fully loaded from the start and never fetch.
pub struct LazyCollection<T: Identifiable, E> {
    loaded: bool,
    reset: bool,
    items: OrderedStore<T::Id, Item<T>>,
    fetch: Option<CollectionFetcher<T, E>>,
}

impl<T: Identifiable, E> LazyCollection<T, E> {
    /// Creates an unloaded collection backed by `fetch`.
    pub fn new<F>(fetch: F) -> Self
    where
        F: FnMut(FetchScope<T::Id>) -> Result<Vec<T>, E> + 'static,
    {
        Self::with_capacity(fetch, 0)
    }

    /// Creates an unloaded collection with a capacity hint for tracked items.
    pub fn with_capacity<F>(fetch: F, capacity: usize) -> Self
    where
        F: FnMut(FetchScope<T::Id>) -> Result<Vec<T>, E> + 'static,
    {
        Self {
            loaded: false,
            reset: false,
            items: OrderedStore::with_capacity(capacity),
            fetch: Some(Box::new(fetch)),
        }
    }

    /// Creates a fully loaded collection whose baseline is `values`.
    ///
    /// Every value starts `Unchanged`.
    pub fn eager(values: impl IntoIterator<Item = T>) -> Self {
        let values = values.into_iter();
        let mut items = OrderedStore::with_capacity(values.size_hint().0);
        for value in values {
            items.put(value.id(), Item::live(value, Status::Unchanged));
        }
        Self {
            loaded: true,
            reset: false,
            items,
            fetch: None,
        }
    }

    /// Returns all live values, fetching the full baseline on first access.
    ///
    /// Pending local edits win over fetched values. A fetched identity that
    /// was added locally is upgraded from `Added` to `Modified`.
    ///
    /// # Errors
    /// - `DeltaError::Fetch` when the fetch fails. The store is left untouched.
    pub fn get_all(&mut self) -> DeltaResult<impl Iterator<Item = &T> + '_, E> {
        if !self.loaded {
            let fetched = self
                .run_fetch(FetchScope::All)
                .map_err(DeltaError::Fetch)?;
            self.merge_baseline(fetched);
            self.loaded = true;
        }
        Ok(self.cached_values())
    }

    /// Returns the live value for `id`, fetching it if it is not tracked yet.
    ///
    /// # Errors
    /// - `DeltaError::NotFound` when the identity is removed, was confirmed
    ///   absent, or is missing from a fully loaded collection.
    /// - `DeltaError::Fetch` when the fetch fails. The store is left untouched.
    pub fn get(&mut self, id: &T::Id) -> DeltaResult<&T, E> {
        let key = if self.items.contains(id) {
            id.clone()
        } else {
            self.lookup(id)?
        };
        self.cached(&key).ok_or(DeltaError::NotFound)
    }

    /// Records `value` as added or modified, keyed by its identity.
    pub fn set(&mut self, value: T) {
        let id = value.id();
        let status = match self.items.get(&id).map(|item| item.status) {
            None | Some(Status::Added) | Some(Status::Absent) => Status::Added,
            Some(Status::Unchanged) | Some(Status::Modified) | Some(Status::Removed) => {
                Status::Modified
            }
        };
        self.items.put(id, Item::live(value, status));
    }

    /// Replaces the whole collection with `values`.
    ///
    /// The previous baseline is discarded and every value is reported as
    /// `Added` under a reset changeset.
    pub fn set_all(&mut self, values: impl IntoIterator<Item = T>) {
        let values = values.into_iter();
        self.items = OrderedStore::with_capacity(values.size_hint().0);
        for value in values {
            self.items.put(value.id(), Item::live(value, Status::Added));
        }
        self.loaded = true;
        self.reset = true;
        debug!(
            "event=collection_reset module=lazy status=ok tracked={}",
            self.items.len()
        );
    }

    /// Empties the collection under a reset changeset.
    pub fn clear(&mut self) {
        self.items.clear();
        self.loaded = true;
        self.reset = true;
        debug!("event=collection_reset module=lazy status=ok tracked=0");
    }

    /// Removes `id`, returning whether it was tracked before the call.
    pub fn remove(&mut self, id: &T::Id) -> bool {
        match self.items.get(id).map(|item| item.status) {
            Some(Status::Added) => self.items.delete(id),
            tracked => {
                self.items.put(id.clone(), Item::tombstone(Status::Removed));
                tracked.is_some()
            }
        }
    }

    pub fn is_reset(&self) -> bool {
        self.reset
    }

    /// Whether a full fetch has completed or the collection started eager.
    pub fn is_fully_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns the pending changeset as a live read view.
    pub fn changes(&self) -> Changes<'_, T> {
        Changes {
            reset: self.reset,
            items: &self.items,
        }
    }

    /// Returns the tracked live value for `id` without fetching.
    ///
    /// For eager collections this is the complete answer.
    pub fn cached(&self, id: &T::Id) -> Option<&T> {
        self.items.get(id).and_then(Item::live_value)
    }

    /// Iterates tracked live values in insertion order without fetching.
    ///
    /// For eager or fully loaded collections this is the complete view.
    pub fn cached_values(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.values().filter_map(Item::live_value)
    }

    fn lookup(&mut self, id: &T::Id) -> DeltaResult<T::Id, E> {
        if self.loaded {
            return Err(DeltaError::NotFound);
        }

        let fetched = self
            .run_fetch(FetchScope::One(id.clone()))
            .map_err(DeltaError::Fetch)?;
        let Some(value) = fetched.into_iter().next() else {
            self.items.put(id.clone(), Item::tombstone(Status::Absent));
            debug!("event=collection_absent module=lazy status=ok");
            return Err(DeltaError::NotFound);
        };

        let key = value.id();
        if key != *id {
            warn!("event=collection_fetch module=lazy status=id_mismatch scope=one");
        }
        if !self.items.contains(&key) {
            self.items.put(key.clone(), Item::live(value, Status::Unchanged));
        }
        Ok(key)
    }

    fn merge_baseline(&mut self, fetched: Vec<T>) {
        let mut reconciled = 0usize;
        for value in fetched {
            let id = value.id();
            match self.items.get_mut(&id) {
                None => self.items.put(id, Item::live(value, Status::Unchanged)),
                Some(item) if item.status == Status::Added => {
                    item.status = Status::Modified;
                    reconciled += 1;
                }
                Some(_) => {}
            }
        }
        trace!(
            "event=collection_merge module=lazy status=ok tracked={} reconciled={}",
            self.items.len(),
            reconciled
        );
    }

    fn run_fetch(&mut self, scope: FetchScope<T::Id>) -> Result<Vec<T>, E> {
        let label = scope.label();
        let Some(fetch) = self.fetch.as_mut() else {
            return Ok(Vec::new());
        };

        let started_at = Instant::now();
        let result = fetch(scope);
        match &result {
            Ok(values) => debug!(
                "event=collection_fetch module=lazy status=ok scope={} fetched={} duration_ms={}",
                label,
                values.len(),
                started_at.elapsed().as_millis()
            ),
            Err(_) => warn!(
                "event=collection_fetch module=lazy status=error scope={} duration_ms={}",
                label,
                started_at.elapsed().as_millis()
            ),
        }
        result
    }
}

impl<T: Identifiable, E> Debug for LazyCollection<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyCollection")
            .field("loaded", &self.loaded)
            .field("reset", &self.reset)
            .field("tracked", &self.items.len())
            .finish_non_exhaustive()
    }
}
