//! Giver/taker classification
//!
//! Partitions above the threshold give, partitions below it take and
//! partitions sitting exactly on it are left alone. Order follows the
//! inventory, which follows the configured root list.

use intrabal_core::{BalanceThreshold, Partition, PartitionId};
use serde::Serialize;
use tracing::info;

use crate::inventory::Inventory;

/// Role of a partition for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Above the threshold
    Giver,
    /// Below the threshold
    Taker,
    /// Exactly on the threshold
    Balanced,
}

impl Role {
    /// Role of a partition holding `size` bytes
    pub fn of(size: u64, threshold: &BalanceThreshold) -> Self {
        if threshold.has_surplus(size) {
            Role::Giver
        } else if threshold.has_deficit(size) {
            Role::Taker
        } else {
            Role::Balanced
        }
    }
}

/// Givers and takers of a run, in partition order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub givers: Vec<PartitionId>,
    pub takers: Vec<PartitionId>,
    pub balanced: Vec<PartitionId>,
}

impl Classification {
    /// Classify raw partitions against a threshold
    pub fn of_partitions(partitions: &[Partition], threshold: &BalanceThreshold) -> Self {
        let mut classification = Self::default();

        for partition in partitions {
            match Role::of(partition.total_size, threshold) {
                Role::Giver => classification.givers.push(partition.id),
                Role::Taker => classification.takers.push(partition.id),
                Role::Balanced => classification.balanced.push(partition.id),
            }
        }

        classification
    }

    /// Whether there is nothing to plan
    pub fn is_settled(&self) -> bool {
        self.givers.is_empty() || self.takers.is_empty()
    }

    pub fn role_of(&self, id: PartitionId) -> Option<Role> {
        if self.givers.contains(&id) {
            Some(Role::Giver)
        } else if self.takers.contains(&id) {
            Some(Role::Taker)
        } else if self.balanced.contains(&id) {
            Some(Role::Balanced)
        } else {
            None
        }
    }
}

/// Classify every partition of the inventory
pub fn classify(inventory: &Inventory) -> Classification {
    let threshold = inventory.threshold();
    let classification = Classification::of_partitions(inventory.partitions(), &threshold);

    info!(
        threshold = %threshold,
        givers = ?classification.givers,
        takers = ?classification.takers,
        balanced = classification.balanced.len(),
        "Partitions classified"
    );

    classification
}
