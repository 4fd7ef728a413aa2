//! Intrabal Core Library
//!
//! Core abstractions for balancing paired storage units across the data
//! partitions of a single node.
//! This crate provides:
//! - The paired unit model (data file + `_<n>.meta` companion)
//! - Partitions, partition identifiers and the exact balance threshold
//! - Common error handling

pub mod error;
pub mod partition;
pub mod unit;

pub use error::{BalancerError, Result};
pub use partition::{rebase_path, BalanceThreshold, Partition, PartitionId};
pub use unit::{data_name_for_meta, Unit, META_EXTENSION};
