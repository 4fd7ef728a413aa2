//! Partition Inventory
//!
//! Sizes every scanned unit, orders each partition largest-first and
//! computes the balance threshold for the run. The threshold is fixed for
//! the whole run; planning never recomputes it.

use intrabal_core::{
    rebase_path, BalanceThreshold, BalancerError, Partition, PartitionId, Result, Unit,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::planner::MovePlan;
use crate::scanner::ScanReport;

/// Sized snapshot of every partition in a run
#[derive(Debug, Clone)]
pub struct Inventory {
    partitions: Vec<Partition>,
    threshold: BalanceThreshold,
}

impl Inventory {
    /// Size every unit of every scanned partition.
    ///
    /// Partition ids follow the order of `reports`.
    #[instrument(skip(reports), fields(partitions = reports.len()))]
    pub fn build(reports: Vec<ScanReport>) -> Result<Self> {
        let mut partitions = Vec::with_capacity(reports.len());

        for (index, report) in reports.into_iter().enumerate() {
            let units = report
                .units
                .into_iter()
                .map(size_unit)
                .collect::<Result<Vec<_>>>()?;

            let partition = Partition::from_sized_units(PartitionId::new(index), report.root, units);
            debug!(
                partition = %partition.id,
                root = %partition.root.display(),
                units = partition.unit_count(),
                total_size = partition.total_size,
                "Partition sized"
            );
            partitions.push(partition);
        }

        let inventory = Self::from_partitions(partitions)?;

        info!(
            partitions = inventory.partitions.len(),
            total_bytes = inventory.total_bytes(),
            threshold = %inventory.threshold,
            "Inventory built"
        );

        Ok(inventory)
    }

    /// Build an inventory from already sized partitions
    pub fn from_partitions(partitions: Vec<Partition>) -> Result<Self> {
        let threshold = BalanceThreshold::from_totals(partitions.iter().map(|p| p.total_size))
            .ok_or_else(|| BalancerError::InvalidPartitionSet("no partitions".to_string()))?;

        Ok(Self {
            partitions,
            threshold,
        })
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn partition(&self, id: PartitionId) -> Option<&Partition> {
        self.partitions.get(id.index())
    }

    pub fn threshold(&self) -> BalanceThreshold {
        self.threshold
    }

    /// Sum of all partition sizes
    pub fn total_bytes(&self) -> u64 {
        self.partitions.iter().map(|p| p.total_size).sum()
    }

    /// State the partitions would be in once `plan` has been applied.
    ///
    /// The threshold is carried over unchanged. Moves whose unit cannot be
    /// found in its source partition are ignored.
    pub fn simulate(&self, plan: &MovePlan) -> Inventory {
        let mut partitions = self.partitions.clone();

        for unit_move in &plan.moves {
            if unit_move.target.index() >= partitions.len() {
                continue;
            }
            let Some(source) = partitions.get_mut(unit_move.source.index()) else {
                continue;
            };
            let Some(pos) = source
                .units
                .iter()
                .position(|u| u.data_path == unit_move.data.src)
            else {
                continue;
            };
            let unit = source.units.remove(pos);

            partitions[unit_move.target.index()].units.push(Unit {
                data_path: unit_move.data.dst.clone(),
                meta_path: unit_move.meta.dst.clone(),
                size: unit.size,
            });
        }

        for partition in &mut partitions {
            partition.sort_units();
            partition.recompute_total();
        }

        Inventory {
            partitions,
            threshold: self.threshold,
        }
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        let units: usize = self.partitions.iter().map(Partition::unit_count).sum();
        format!(
            "{} partitions, {} units, {} bytes, threshold {}",
            self.partitions.len(),
            units,
            self.total_bytes(),
            self.threshold
        )
    }
}

/// Resolve a unit's combined size by stat-ing both of its files
pub fn size_unit(unit: Unit) -> Result<Unit> {
    let data = file_len(&unit.data_path)?;
    let meta = file_len(&unit.meta_path)?;
    Ok(unit.with_size(data + meta))
}

fn file_len(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| BalancerError::UnitSizeError {
            path: path.to_path_buf(),
            source,
        })
}

/// Destination of `path` once moved from `from` to `to`
pub(crate) fn relocate(path: &Path, from: &Partition, to: &Partition) -> Option<PathBuf> {
    rebase_path(path, &from.root, &to.root)
}
