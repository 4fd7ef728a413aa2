//! Partitions and the balance threshold
//!
//! A partition is one storage root backing the node. The balance threshold
//! is the mean occupied size across all partitions of a run.

use crate::unit::Unit;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::path::{Path, PathBuf};

/// Position of a partition in the externally supplied root list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionId(usize);

impl PartitionId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition-{}", self.0)
    }
}

/// One storage root and the units it holds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partition {
    pub id: PartitionId,
    /// Absolute root path
    pub root: PathBuf,
    /// Units, largest first once sized
    pub units: Vec<Unit>,
    /// Sum of all unit sizes
    pub total_size: u64,
}

impl Partition {
    /// Create an empty partition
    pub fn new(id: PartitionId, root: impl Into<PathBuf>) -> Self {
        Self {
            id,
            root: root.into(),
            units: Vec::new(),
            total_size: 0,
        }
    }

    /// Create a partition from sized units.
    ///
    /// Units are ordered by size, largest first. Ties keep their input order.
    pub fn from_sized_units(id: PartitionId, root: impl Into<PathBuf>, units: Vec<Unit>) -> Self {
        let mut partition = Self {
            id,
            root: root.into(),
            units,
            total_size: 0,
        };
        partition.sort_units();
        partition.recompute_total();
        partition
    }

    /// Re-sort units largest first
    pub fn sort_units(&mut self) {
        self.units.sort_by_key(|u| Reverse(u.size_or_zero()));
    }

    /// Recompute `total_size` from the current units
    pub fn recompute_total(&mut self) {
        self.total_size = self.units.iter().map(Unit::size_or_zero).sum();
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Rewrite `path` from under `from_root` to under `to_root`.
///
/// The remainder of the path below the root is preserved. Returns `None`
/// when `path` does not live under `from_root`.
pub fn rebase_path(path: &Path, from_root: &Path, to_root: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(from_root).ok()?;
    Some(to_root.join(relative))
}

/// Mean partition size, kept as the exact fraction `total / partitions`.
///
/// All comparisons cross-multiply so fractional byte counts are never
/// rounded away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceThreshold {
    /// Sum of all partition totals
    pub total_bytes: u128,
    /// Number of partitions
    pub partitions: u64,
}

impl BalanceThreshold {
    /// Compute the threshold from partition totals.
    ///
    /// Returns `None` for an empty partition set.
    pub fn from_totals<I>(totals: I) -> Option<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let (total_bytes, partitions) = totals
            .into_iter()
            .fold((0u128, 0u64), |(sum, n), t| (sum + t as u128, n + 1));

        if partitions == 0 {
            return None;
        }

        Some(Self {
            total_bytes,
            partitions,
        })
    }

    /// Mean as a float, for display and reporting
    pub fn as_f64(&self) -> f64 {
        self.total_bytes as f64 / self.partitions as f64
    }

    /// `size > mean`
    pub fn has_surplus(&self, size: u64) -> bool {
        self.scaled(size) > self.total_bytes
    }

    /// `size < mean`
    pub fn has_deficit(&self, size: u64) -> bool {
        self.scaled(size) < self.total_bytes
    }

    /// `size >= mean`
    pub fn is_met_by(&self, size: u64) -> bool {
        self.scaled(size) >= self.total_bytes
    }

    /// Whether a partition currently at `current` can receive `incoming`
    /// bytes and still sit strictly under the mean
    pub fn fits_under(&self, current: u64, incoming: u64) -> bool {
        self.has_deficit(current.saturating_add(incoming))
    }

    /// Distance from `size` to the mean, positive when under it
    pub fn deficit_of(&self, size: u64) -> f64 {
        self.as_f64() - size as f64
    }

    fn scaled(&self, size: u64) -> u128 {
        size as u128 * self.partitions as u128
    }
}

impl fmt::Display for BalanceThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_f64())
    }
}
