//! Change status, identity capability and fetch scope.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::hash::Hash;

/// Last-known disposition of one identity inside a lazy collection,
/// relative to the persisted baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Matches the baseline.
    Unchanged,
    /// Never existed in any persisted baseline.
    Added,
    /// Existed in the baseline and must be deleted.
    Removed,
    /// Exists in the baseline and carries a local edit.
    Modified,
    /// Looked up and confirmed nonexistent.
    Absent,
}

impl Status {
    /// Stable string form, matching the serialized representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::Absent => "absent",
        }
    }

    /// Returns whether this status marks an identity as not live.
    pub fn is_tombstone(self) -> bool {
        matches!(self, Self::Removed | Self::Absent)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity capability required of items stored in a `LazyCollection`.
///
/// `id()` must be pure: the same item always reports the same identity.
pub trait Identifiable {
    type Id: Eq + Hash + Clone;

    fn id(&self) -> Self::Id;
}

/// What a collection fetch function is asked to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchScope<I> {
    /// Every item that currently exists in the backing store.
    All,
    /// The single item with this identity, or an empty list if none exists.
    One(I),
}

impl<I> FetchScope<I> {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn as_one(&self) -> Option<&I> {
        match self {
            Self::All => None,
            Self::One(id) => Some(id),
        }
    }

    /// Metadata-only label used in log events.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::One(_) => "one",
        }
    }
}
