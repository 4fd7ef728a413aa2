//! Intrabal Rebalancer Library
//!
//! Evens out the bytes stored across the partitions of a single node by
//! moving paired data/metadata units from partitions above the mean to
//! partitions below it.
//!
//! A run is a fixed pipeline:
//! - Scanning (find `<data>_<n>.meta` pairs under each root)
//! - Inventory (size units, compute the threshold)
//! - Classification (givers above the threshold, takers below it)
//! - Planning (greedy best-fit move plan)
//! - Execution (rename, or copy then delete across devices)

pub mod classifier;
pub mod config;
pub mod executor;
pub mod inventory;
pub mod planner;
pub mod runner;
pub mod scanner;

// Re-export main types
pub use classifier::{classify, Classification, Role};
pub use config::{ConfigError, RebalancerConfig, DEFAULT_PARTITIONS_KEY};
pub use executor::{
    CancelHandle, ExecutionResult, Executor, ExecutorConfig, ExecutorError, MoveMethod, UnitResult,
};
pub use inventory::Inventory;
pub use planner::{
    FileMove, MovePlan, Planner, PlannerConfig, PlannerError, PlanningNote, UnitMove,
};
pub use runner::{PartitionSummary, Rebalancer, RunError, RunOutcome, RunReport};
pub use scanner::{ScanReport, Scanner, ScannerConfig};
