//! Run orchestration
//!
//! One run goes scan, inventory, classify, plan and execute, strictly in
//! that order. Anything structural fails before the first file moves.

use intrabal_core::{BalanceThreshold, BalancerError, PartitionId};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::classifier::{classify, Classification, Role};
use crate::config::{ConfigError, RebalancerConfig};
use crate::executor::{CancelHandle, ExecutionResult, Executor};
use crate::inventory::Inventory;
use crate::planner::{MovePlan, Planner, PlannerError};
use crate::scanner::Scanner;

/// Errors that abort a run before execution
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Balancer(#[from] BalancerError),

    #[error(transparent)]
    Planner(#[from] PlannerError),
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The plan was empty
    NothingToDo,
    /// A plan was built and nothing was moved
    DryRun,
    /// Every planned unit moved
    Completed,
    /// At least one unit failed or was skipped
    PartiallyFailed,
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::NothingToDo | RunOutcome::DryRun | RunOutcome::Completed => 0,
            RunOutcome::PartiallyFailed => 2,
        }
    }
}

/// Per-partition line of a run report
#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    pub id: PartitionId,
    pub root: PathBuf,
    pub units: usize,
    pub total_size: u64,
    pub role: Role,
}

/// Everything a run decided and did
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub threshold: BalanceThreshold,
    /// Threshold in bytes, for display
    pub mean_bytes: f64,
    pub partitions: Vec<PartitionSummary>,
    pub classification: Classification,
    /// Metadata files skipped because their data file is missing
    pub orphans: Vec<PathBuf>,
    /// Extra metadata files left in place for an already claimed data file
    pub duplicates: Vec<PathBuf>,
    pub plan: MovePlan,
    pub execution: Option<ExecutionResult>,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Get summary statistics
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{:?}: threshold {}, {} givers, {} takers, {}",
            self.outcome,
            self.threshold,
            self.classification.givers.len(),
            self.classification.takers.len(),
            self.plan.summary()
        );
        if let Some(execution) = &self.execution {
            summary.push_str("; ");
            summary.push_str(&execution.summary());
        }
        summary
    }
}

/// Intra-node rebalancer
#[derive(Debug)]
pub struct Rebalancer {
    config: RebalancerConfig,
    scanner: Scanner,
    planner: Planner,
    executor: Executor,
}

impl Rebalancer {
    /// Create a rebalancer, rejecting an invalid partition set
    pub fn new(config: RebalancerConfig) -> Result<Self, RunError> {
        config.validate()?;

        Ok(Self {
            scanner: Scanner::new(config.scanner.clone()),
            planner: Planner::new(config.planner.clone()),
            executor: Executor::new(config.executor.clone()),
            config,
        })
    }

    pub fn config(&self) -> &RebalancerConfig {
        &self.config
    }

    /// Handle that stops execution before the next unit
    pub fn cancel_handle(&self) -> CancelHandle {
        self.executor.cancel_handle()
    }

    /// Run one full rebalance pass
    #[instrument(skip(self), fields(partitions = self.config.partitions.len(), dry_run = self.config.dry_run))]
    pub fn run(&self) -> Result<RunReport, RunError> {
        let reports = self.scanner.scan_all(&self.config.partitions)?;
        let orphans: Vec<PathBuf> = reports
            .iter()
            .flat_map(|r| r.orphans.iter().cloned())
            .collect();
        let duplicates: Vec<PathBuf> = reports
            .iter()
            .flat_map(|r| r.duplicates.iter().cloned())
            .collect();

        let inventory = Inventory::build(reports)?;
        let classification = classify(&inventory);
        let plan = self.planner.create_plan(&inventory, &classification)?;

        let (execution, outcome) = if plan.is_empty() {
            info!("Nothing to move");
            (None, RunOutcome::NothingToDo)
        } else if self.config.dry_run {
            info!(summary = %plan.summary(), "Dry run, not moving anything");
            (None, RunOutcome::DryRun)
        } else {
            let execution = self.executor.execute(&plan);
            let outcome = if execution.has_failures() || !execution.skipped.is_empty() {
                warn!(summary = %execution.summary(), "Rebalance finished with failures");
                RunOutcome::PartiallyFailed
            } else {
                RunOutcome::Completed
            };
            (Some(execution), outcome)
        };

        let threshold = inventory.threshold();
        let partitions = inventory
            .partitions()
            .iter()
            .map(|p| PartitionSummary {
                id: p.id,
                root: p.root.clone(),
                units: p.unit_count(),
                total_size: p.total_size,
                role: Role::of(p.total_size, &threshold),
            })
            .collect();

        let report = RunReport {
            threshold,
            mean_bytes: threshold.as_f64(),
            partitions,
            classification,
            orphans,
            duplicates,
            plan,
            execution,
            outcome,
        };

        info!(summary = %report.summary(), "Rebalance run finished");

        Ok(report)
    }
}
