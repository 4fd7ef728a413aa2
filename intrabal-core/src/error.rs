//! Error types for Intrabal
//!
//! Structural errors raised before any file is moved. Execution-time
//! failures live with the executor, since they never abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for balancer setup operations
pub type Result<T> = std::result::Result<T, BalancerError>;

/// Unified error type for scan and inventory
#[derive(Error, Debug)]
pub enum BalancerError {
    // ===== Scan Errors =====
    #[error("Partition unreadable: {path:?}: {source}")]
    PartitionUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata file has no data companion: {meta_path:?}")]
    OrphanMetadata { meta_path: PathBuf },

    #[error("Data file {data_path:?} is already claimed, extra metadata file: {meta_path:?}")]
    DuplicateMetadata {
        data_path: PathBuf,
        meta_path: PathBuf,
    },

    // ===== Inventory Errors =====
    #[error("Cannot size unit file {path:?}: {source}")]
    UnitSizeError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid partition set: {0}")]
    InvalidPartitionSet(String),
}
