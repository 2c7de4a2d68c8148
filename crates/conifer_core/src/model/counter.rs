//! Per-category sighting counters.
//!
//! # Responsibility
//! - Hold one non-negative count per catalog entry.
//! - Resolve category names with an explicit, recoverable lookup error.
//!
//! # Invariants
//! - A `CounterSet` has exactly one counter per catalog entry, in catalog
//!   order, with no duplicates and no omissions.
//! - Counts only ever grow; resetting means building a fresh set.

use crate::model::catalog::{TreeCatalog, TreeCategory};
use crate::model::snapshot::{SnapshotCodecError, SnapshotDocument};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Lookup error for counter operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    /// No catalog entry has this common name.
    NotFound(String),
}

impl Display for CounterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "unknown tree category `{name}`"),
        }
    }
}

impl Error for CounterError {}

/// Sighting count for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeCounter {
    category: TreeCategory,
    count: u64,
}

impl TreeCounter {
    pub fn new(category: TreeCategory) -> Self {
        Self { category, count: 0 }
    }

    pub fn category(&self) -> &TreeCategory {
        &self.category
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Adds one sighting and returns the new count.
    pub fn increment(&mut self) -> u64 {
        self.count += 1;
        self.count
    }
}

/// Ordered counters bound to one catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSet {
    catalog: Arc<TreeCatalog>,
    counters: Vec<TreeCounter>,
}

impl CounterSet {
    /// Zeroed counters, one per catalog entry in catalog order.
    pub fn new(catalog: Arc<TreeCatalog>) -> Self {
        let counters = catalog.list().iter().cloned().map(TreeCounter::new).collect();
        Self { catalog, counters }
    }

    /// Builds a set from explicit counts in catalog order.
    ///
    /// Used by snapshot decoding after names have been checked.
    pub(crate) fn from_counts(catalog: Arc<TreeCatalog>, counts: &[u64]) -> Self {
        let mut set = Self::new(catalog);
        for (counter, count) in set.counters.iter_mut().zip(counts) {
            counter.count = *count;
        }
        set
    }

    pub fn catalog(&self) -> &Arc<TreeCatalog> {
        &self.catalog
    }

    pub fn counters(&self) -> &[TreeCounter] {
        &self.counters
    }

    /// Catalog position of `common_name`.
    pub fn position(&self, common_name: &str) -> Result<usize, CounterError> {
        self.catalog
            .position(common_name)
            .ok_or_else(|| CounterError::NotFound(common_name.to_string()))
    }

    /// Adds one sighting to `common_name` and returns its new count.
    pub fn increment(&mut self, common_name: &str) -> Result<u64, CounterError> {
        let index = self.position(common_name)?;
        Ok(self.increment_at(index))
    }

    /// Increments the counter at a position previously returned by
    /// [`CounterSet::position`] on this set.
    pub(crate) fn increment_at(&mut self, index: usize) -> u64 {
        self.counters[index].increment()
    }

    pub fn count(&self, common_name: &str) -> Result<u64, CounterError> {
        let index = self.position(common_name)?;
        Ok(self.counters[index].count)
    }

    /// Counts in catalog order.
    pub fn counts(&self) -> Vec<u64> {
        self.counters.iter().map(TreeCounter::count).collect()
    }

    pub fn total(&self) -> u64 {
        self.counters.iter().map(TreeCounter::count).sum()
    }

    /// Adds every count of `other` into this set.
    ///
    /// Both sets must share a catalog layout; categories unknown to this set
    /// are reported instead of dropped.
    pub fn absorb(&mut self, other: &CounterSet) -> Result<(), CounterError> {
        let mut positions = Vec::with_capacity(other.counters.len());
        for counter in &other.counters {
            positions.push(self.position(&counter.category.common_name)?);
        }
        for (index, counter) in positions.into_iter().zip(&other.counters) {
            self.counters[index].count += counter.count;
        }
        Ok(())
    }

    /// Encodes this set as a versioned JSON snapshot document.
    pub fn serialize(&self) -> Result<Vec<u8>, SnapshotCodecError> {
        SnapshotDocument::from_counter_set(self, None).to_bytes()
    }

    /// Decodes a snapshot document against `catalog`.
    pub fn deserialize(
        catalog: Arc<TreeCatalog>,
        bytes: &[u8],
    ) -> Result<Self, SnapshotCodecError> {
        SnapshotDocument::from_bytes(bytes)?.into_counter_set(catalog)
    }
}
