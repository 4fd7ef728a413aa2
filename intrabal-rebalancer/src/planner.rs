//! Rebalance Planner
//!
//! Builds the move plan from a classified inventory using a greedy
//! best-fit pass:
//! - Takers are served in partition order
//! - Giver units are offered largest-first, giver by giver
//! - A unit is accepted only if the taker stays strictly under the
//!   threshold and the giver stays at or above it
//! - Every unit is offered from one shared pool, so it moves at most once

use intrabal_core::{BalanceThreshold, Partition, PartitionId, Unit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::classifier::Classification;
use crate::inventory::{relocate, Inventory};

/// Planner errors
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Unknown partition: {0}")]
    UnknownPartition(PartitionId),

    #[error("Unit path {path:?} is not under partition root {root:?}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

pub type Result<T> = std::result::Result<T, PlannerError>;

/// One file relocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMove {
    pub src: PathBuf,
    pub dst: PathBuf,
}

/// Relocation of a whole unit: data and metadata travel together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitMove {
    pub data: FileMove,
    pub meta: FileMove,
    /// Combined size of both files
    pub size: u64,
    pub source: PartitionId,
    pub target: PartitionId,
}

impl UnitMove {
    /// Plan the move of `unit` from `from` to `to`, keeping its path below the root
    pub fn between(unit: &Unit, from: &Partition, to: &Partition) -> Result<Self> {
        let rebase = |path: &Path| {
            relocate(path, from, to).ok_or_else(|| PlannerError::OutsideRoot {
                path: path.to_path_buf(),
                root: from.root.clone(),
            })
        };

        Ok(Self {
            data: FileMove {
                src: unit.data_path.clone(),
                dst: rebase(&unit.data_path)?,
            },
            meta: FileMove {
                src: unit.meta_path.clone(),
                dst: rebase(&unit.meta_path)?,
            },
            size: unit.size_or_zero(),
            source: from.id,
            target: to.id,
        })
    }
}

/// Observations recorded while planning. None of them fail the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanningNote {
    /// Givers ran out of units that fit; the taker stays short
    Exhausted {
        taker: PartitionId,
        residual_bytes: f64,
    },
    /// Planning stopped at the configured number of moves
    MoveLimitReached { limit: usize },
    /// Some units were left out to respect the byte cap
    ByteLimitReached { limit: u64 },
}

/// Ordered list of unit moves for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MovePlan {
    pub moves: Vec<UnitMove>,
    /// Total bytes to move
    pub total_bytes: u64,
    pub notes: Vec<PlanningNote>,
}

impl MovePlan {
    /// Add a move to the plan
    pub fn add_move(&mut self, unit_move: UnitMove) {
        self.total_bytes += unit_move.size;
        self.moves.push(unit_move);
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Every (src, dst) file pair, data before metadata, in plan order
    pub fn entries(&self) -> Vec<(&Path, &Path)> {
        self.moves
            .iter()
            .flat_map(|m| {
                [
                    (m.data.src.as_path(), m.data.dst.as_path()),
                    (m.meta.src.as_path(), m.meta.dst.as_path()),
                ]
            })
            .collect()
    }

    /// Destination planned for a source file
    pub fn destination_of(&self, src: &Path) -> Option<&Path> {
        self.entries()
            .into_iter()
            .find(|(s, _)| *s == src)
            .map(|(_, d)| d)
    }

    /// Get moves leaving a partition
    pub fn moves_from(&self, id: PartitionId) -> Vec<&UnitMove> {
        self.moves.iter().filter(|m| m.source == id).collect()
    }

    /// Get moves arriving at a partition
    pub fn moves_to(&self, id: PartitionId) -> Vec<&UnitMove> {
        self.moves.iter().filter(|m| m.target == id).collect()
    }

    pub fn source_partitions(&self) -> BTreeSet<PartitionId> {
        self.moves.iter().map(|m| m.source).collect()
    }

    pub fn target_partitions(&self) -> BTreeSet<PartitionId> {
        self.moves.iter().map(|m| m.target).collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> String {
        format!(
            "{} unit moves ({} files), {} bytes, {} source partitions, {} target partitions, {} notes",
            self.moves.len(),
            self.moves.len() * 2,
            self.total_bytes,
            self.source_partitions().len(),
            self.target_partitions().len(),
            self.notes.len()
        )
    }
}

/// Planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Maximum unit moves per run
    pub max_moves: Option<usize>,
    /// Maximum bytes moved per run
    pub max_bytes: Option<u64>,
    /// Residual deficit, as a fraction of the threshold, under which a
    /// taker counts as satisfied
    pub settle_tolerance: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_moves: None,
            max_bytes: None,
            settle_tolerance: 0.01,
        }
    }
}

/// A giver unit on offer
struct Candidate<'a> {
    /// Index into `DonorPool::givers`
    slot: usize,
    unit: &'a Unit,
    size: u64,
}

/// Giver units shared by every taker of a planning pass.
///
/// Candidates are laid out giver by giver, largest first. A consumed unit
/// is never offered again; a skipped one stays on offer.
struct DonorPool<'a> {
    givers: Vec<&'a Partition>,
    candidates: Vec<Candidate<'a>>,
    consumed: Vec<bool>,
    /// Bytes already given away, per giver
    donated: Vec<u64>,
    /// Everything before `head` is consumed
    head: usize,
    threshold: BalanceThreshold,
}

impl<'a> DonorPool<'a> {
    fn new(inventory: &'a Inventory, giver_ids: &[PartitionId]) -> Result<Self> {
        let mut givers = Vec::with_capacity(giver_ids.len());
        let mut candidates = Vec::new();

        for (slot, &id) in giver_ids.iter().enumerate() {
            let giver = lookup(inventory, id)?;
            givers.push(giver);
            candidates.extend(giver.units.iter().map(|unit| Candidate {
                slot,
                unit,
                size: unit.size_or_zero(),
            }));
        }

        Ok(Self {
            consumed: vec![false; candidates.len()],
            donated: vec![0; givers.len()],
            givers,
            candidates,
            head: 0,
            threshold: inventory.threshold(),
        })
    }

    /// First unconsumed candidate at or after `from`
    fn next_open(&self, from: usize) -> Option<usize> {
        (from.max(self.head)..self.candidates.len()).find(|&i| !self.consumed[i])
    }

    /// Whether giving this candidate away keeps its giver at or above the threshold
    fn giver_can_spare(&self, idx: usize) -> bool {
        let candidate = &self.candidates[idx];
        let remaining = self.givers[candidate.slot]
            .total_size
            .saturating_sub(self.donated[candidate.slot]);
        self.threshold
            .is_met_by(remaining.saturating_sub(candidate.size))
    }

    fn take(&mut self, idx: usize) {
        self.consumed[idx] = true;
        let candidate = &self.candidates[idx];
        self.donated[candidate.slot] += candidate.size;

        while self.head < self.consumed.len() && self.consumed[self.head] {
            self.head += 1;
        }
    }
}

/// Move planner
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    /// Create a new planner
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Create a move plan that pulls every taker toward the threshold
    #[instrument(skip(self, inventory, classification))]
    pub fn create_plan(
        &self,
        inventory: &Inventory,
        classification: &Classification,
    ) -> Result<MovePlan> {
        let threshold = inventory.threshold();
        let mut plan = MovePlan::default();

        if classification.is_settled() {
            info!(
                givers = classification.givers.len(),
                takers = classification.takers.len(),
                "Partitions already balanced, nothing to plan"
            );
            return Ok(plan);
        }

        let mut pool = DonorPool::new(inventory, &classification.givers)?;
        let mut byte_cap_hit = false;

        'takers: for &taker_id in &classification.takers {
            let taker = lookup(inventory, taker_id)?;
            let mut stolen = 0u64;
            let mut cursor = 0;

            while let Some(idx) = pool.next_open(cursor) {
                cursor = idx + 1;

                // not even one more byte fits
                if !threshold.fits_under(taker.total_size, stolen.saturating_add(1)) {
                    break;
                }

                let size = pool.candidates[idx].size;
                if size == 0 || !threshold.fits_under(taker.total_size, stolen.saturating_add(size)) {
                    continue;
                }
                if !pool.giver_can_spare(idx) {
                    continue;
                }
                if let Some(max) = self.config.max_bytes {
                    if plan.total_bytes.saturating_add(size) > max {
                        byte_cap_hit = true;
                        continue;
                    }
                }
                if let Some(max) = self.config.max_moves {
                    if plan.len() >= max {
                        debug!("Reached max moves limit");
                        plan.notes.push(PlanningNote::MoveLimitReached { limit: max });
                        break 'takers;
                    }
                }

                let giver = pool.givers[pool.candidates[idx].slot];
                let unit_move = UnitMove::between(pool.candidates[idx].unit, giver, taker)?;
                pool.take(idx);
                stolen += size;

                debug!(
                    giver = %giver.id,
                    taker = %taker.id,
                    data = %unit_move.data.src.display(),
                    size,
                    stolen,
                    "Unit selected"
                );
                plan.add_move(unit_move);
            }

            let residual = threshold.deficit_of(taker.total_size + stolen);
            if residual > self.config.settle_tolerance * threshold.as_f64() {
                warn!(
                    taker = %taker_id,
                    residual_bytes = residual,
                    "Taker deficit left unresolved"
                );
                plan.notes.push(PlanningNote::Exhausted {
                    taker: taker_id,
                    residual_bytes: residual,
                });
            }
        }

        if byte_cap_hit {
            if let Some(limit) = self.config.max_bytes {
                plan.notes.push(PlanningNote::ByteLimitReached { limit });
            }
        }

        info!(summary = %plan.summary(), "Move plan created");

        Ok(plan)
    }
}

fn lookup(inventory: &Inventory, id: PartitionId) -> Result<&Partition> {
    inventory
        .partition(id)
        .ok_or(PlannerError::UnknownPartition(id))
}
