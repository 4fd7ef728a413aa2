//! Move Executor
//!
//! Applies a move plan one unit at a time:
//! - Creates missing destination directories
//! - Renames when possible, copies then deletes across devices
//! - Never overwrites an existing destination
//! - Keeps going after a failed unit and reports it
//! - Stops between units once cancelled

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::planner::{FileMove, MovePlan, UnitMove};

/// Suffix of the staging file used while copying across devices
const STAGING_SUFFIX: &str = ".intrabal-partial";

/// Executor errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExecutorError {
    #[error("Move failed {src:?} -> {dst:?}: {reason}")]
    MoveFailed {
        src: PathBuf,
        dst: PathBuf,
        reason: String,
    },

    #[error("Destination already exists: {0:?}")]
    DestinationExists(PathBuf),

    #[error("Copy of {path:?} is {actual} bytes, expected {expected}")]
    VerificationFailed {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Pair inconsistent: data now at {data_dst:?} but metadata still at {meta_src:?}: {reason}")]
    PairInconsistent {
        data_dst: PathBuf,
        meta_src: PathBuf,
        reason: String,
    },

    #[error("Executor cancelled")]
    Cancelled,
}

impl ExecutorError {
    fn move_failed(src: &Path, dst: &Path, err: impl std::fmt::Display) -> Self {
        ExecutorError::MoveFailed {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

/// How a single file reached its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveMethod {
    Renamed,
    Copied,
}

/// Result of moving a single unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitResult {
    /// Position of the unit in the plan
    pub index: usize,
    pub data: FileMove,
    pub meta: FileMove,
    pub size: u64,
    pub success: bool,
    pub error: Option<ExecutorError>,
    pub method: Option<MoveMethod>,
    pub duration: Duration,
}

impl UnitResult {
    /// Result for a unit that was never attempted
    fn cancelled(index: usize, unit_move: &UnitMove) -> Self {
        Self {
            index,
            data: unit_move.data.clone(),
            meta: unit_move.meta.clone(),
            size: unit_move.size,
            success: false,
            error: Some(ExecutorError::Cancelled),
            method: None,
            duration: Duration::ZERO,
        }
    }

    /// Whether data and metadata ended up on different partitions
    pub fn is_pair_inconsistent(&self) -> bool {
        matches!(self.error, Some(ExecutorError::PairInconsistent { .. }))
    }
}

/// Overall execution result
#[derive(Debug, Default, Serialize)]
pub struct ExecutionResult {
    /// Units that moved completely
    pub succeeded: Vec<UnitResult>,
    /// Units that failed
    pub failed: Vec<UnitResult>,
    /// Units never attempted because of cancellation
    pub skipped: Vec<UnitResult>,
    /// Bytes moved
    pub moved_bytes: u64,
    /// Total execution time
    pub duration: Duration,
}

impl ExecutionResult {
    /// Success rate as percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.succeeded.len() + self.failed.len();
        if total == 0 {
            100.0
        } else {
            (self.succeeded.len() as f64 / total as f64) * 100.0
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Failed units whose pair is now split across partitions
    pub fn pair_inconsistencies(&self) -> Vec<&UnitResult> {
        self.failed
            .iter()
            .filter(|r| r.is_pair_inconsistent())
            .collect()
    }

    /// Summary string
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed ({} inconsistent pairs), {} skipped, {} bytes in {:?} ({:.1}% success rate)",
            self.succeeded.len(),
            self.failed.len(),
            self.pair_inconsistencies().len(),
            self.skipped.len(),
            self.moved_bytes,
            self.duration,
            self.success_rate()
        )
    }
}

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// fsync copied files before the source is removed
    pub sync_copies: bool,
    /// Compare copied length with the source before the source is removed
    pub verify_copies: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            sync_copies: true,
            verify_copies: true,
        }
    }
}

/// Shared flag used to stop an execution between units
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Move executor
#[derive(Debug, Default)]
pub struct Executor {
    config: ExecutorConfig,
    cancel: CancelHandle,
}

impl Executor {
    /// Create a new executor
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            cancel: CancelHandle::default(),
        }
    }

    /// Handle that stops this executor before its next unit
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        self.cancel.cancel();
        info!("Executor shutdown signaled");
    }

    /// Execute a move plan
    #[instrument(skip(self, plan), fields(moves = plan.len()))]
    pub fn execute(&self, plan: &MovePlan) -> ExecutionResult {
        let start = Instant::now();
        let mut result = ExecutionResult::default();

        if plan.is_empty() {
            info!("No moves to execute");
            return result;
        }

        info!(
            moves = plan.len(),
            total_bytes = plan.total_bytes,
            "Executing move plan"
        );

        for (index, unit_move) in plan.moves.iter().enumerate() {
            if self.cancel.is_cancelled() {
                result.skipped = plan.moves[index..]
                    .iter()
                    .enumerate()
                    .map(|(offset, m)| UnitResult::cancelled(index + offset, m))
                    .collect();
                warn!(skipped = result.skipped.len(), "Execution cancelled");
                break;
            }

            let unit_result = self.execute_unit(index, unit_move);

            if unit_result.success {
                result.moved_bytes += unit_result.size;
                info!(
                    src = %unit_move.data.src.display(),
                    dst = %unit_move.data.dst.display(),
                    size = unit_move.size,
                    moved_bytes = result.moved_bytes,
                    total_bytes = plan.total_bytes,
                    "Unit moved"
                );
                result.succeeded.push(unit_result);
            } else {
                let error = unit_result
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                error!(
                    src = %unit_move.data.src.display(),
                    dst = %unit_move.data.dst.display(),
                    inconsistent = unit_result.is_pair_inconsistent(),
                    error = %error,
                    "Unit move failed"
                );
                result.failed.push(unit_result);
            }
        }

        result.duration = start.elapsed();

        info!(summary = %result.summary(), "Move plan execution complete");

        result
    }

    /// Move one unit: data first, then metadata
    fn execute_unit(&self, index: usize, unit_move: &UnitMove) -> UnitResult {
        let start = Instant::now();

        let outcome = self.preflight(unit_move).and_then(|()| {
            let method = self.move_file(&unit_move.data.src, &unit_move.data.dst)?;
            self.move_file(&unit_move.meta.src, &unit_move.meta.dst)
                .map_err(|e| ExecutorError::PairInconsistent {
                    data_dst: unit_move.data.dst.clone(),
                    meta_src: unit_move.meta.src.clone(),
                    reason: e.to_string(),
                })?;
            Ok(method)
        });

        let (success, error, method) = match outcome {
            Ok(method) => (true, None, Some(method)),
            Err(e) => (false, Some(e), None),
        };

        UnitResult {
            index,
            data: unit_move.data.clone(),
            meta: unit_move.meta.clone(),
            size: unit_move.size,
            success,
            error,
            method,
            duration: start.elapsed(),
        }
    }

    /// Check both halves of the pair before touching either
    fn preflight(&self, unit_move: &UnitMove) -> Result<()> {
        for file in [&unit_move.data, &unit_move.meta] {
            if let Err(e) = fs::symlink_metadata(&file.src) {
                return Err(ExecutorError::move_failed(&file.src, &file.dst, e));
            }
            if exists(&file.dst) {
                return Err(ExecutorError::DestinationExists(file.dst.clone()));
            }
        }
        Ok(())
    }

    /// Move a single file, creating the destination directory on demand
    pub fn move_file(&self, src: &Path, dst: &Path) -> Result<MoveMethod> {
        if exists(dst) {
            return Err(ExecutorError::DestinationExists(dst.to_path_buf()));
        }

        if let Some(parent) = dst.parent() {
            if !parent.is_dir() {
                fs::create_dir_all(parent).map_err(|e| ExecutorError::move_failed(src, dst, e))?;
                debug!(dir = %parent.display(), "Created destination directory");
            }
        }

        let renamed = fs::rename(src, dst);
        self.finish_move(src, dst, renamed)
    }

    /// Settle a move after the rename attempt, copying when it crossed devices
    fn finish_move(&self, src: &Path, dst: &Path, renamed: io::Result<()>) -> Result<MoveMethod> {
        match renamed {
            Ok(()) => Ok(MoveMethod::Renamed),
            Err(e) if is_cross_device(&e) => {
                debug!(src = %src.display(), "Cross-device move, copying");
                self.copy_then_remove(src, dst)?;
                Ok(MoveMethod::Copied)
            }
            Err(e) => Err(ExecutorError::move_failed(src, dst, e)),
        }
    }

    /// Copy `src` to `dst` through a staging file, then remove `src`.
    ///
    /// The source is only removed once the destination is complete. On any
    /// failure the source is left as it was.
    pub(crate) fn copy_then_remove(&self, src: &Path, dst: &Path) -> Result<()> {
        let staging = staging_path(dst);

        if let Err(e) = self.copy_verified(src, &staging) {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        if let Err(e) = fs::rename(&staging, dst) {
            let _ = fs::remove_file(&staging);
            return Err(ExecutorError::move_failed(src, dst, e));
        }

        if self.config.sync_copies {
            if let Err(e) = sync_parent_dir(dst) {
                let _ = fs::remove_file(dst);
                return Err(ExecutorError::move_failed(
                    src,
                    dst,
                    format!("could not sync destination directory: {e}"),
                ));
            }
        }

        if let Err(e) = fs::remove_file(src) {
            // keep a single copy, at the source
            let _ = fs::remove_file(dst);
            return Err(ExecutorError::move_failed(
                src,
                dst,
                format!("copied but could not remove source: {e}"),
            ));
        }

        Ok(())
    }

    fn copy_verified(&self, src: &Path, staging: &Path) -> Result<()> {
        let expected = fs::metadata(src)
            .map_err(|e| ExecutorError::move_failed(src, staging, e))?
            .len();

        let copied = fs::copy(src, staging).map_err(|e| ExecutorError::move_failed(src, staging, e))?;

        if self.config.sync_copies {
            fs::File::open(staging)
                .and_then(|f| f.sync_all())
                .map_err(|e| ExecutorError::move_failed(src, staging, e))?;
        }

        if self.config.verify_copies {
            if copied != expected {
                return Err(ExecutorError::VerificationFailed {
                    path: src.to_path_buf(),
                    expected,
                    actual: copied,
                });
            }
            verify_length(src, staging, expected)?;
        }

        Ok(())
    }
}

/// Check that the staged copy of `src` holds `expected` bytes
fn verify_length(src: &Path, staging: &Path, expected: u64) -> Result<()> {
    let actual = fs::metadata(staging)
        .map_err(|e| ExecutorError::move_failed(src, staging, e))?
        .len();
    if actual != expected {
        return Err(ExecutorError::VerificationFailed {
            path: src.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Persist the directory entry of `path`
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Hidden sibling of `dst` used while a copy is in flight
fn staging_path(dst: &Path) -> PathBuf {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dst.with_file_name(format!(".{name}{STAGING_SUFFIX}"))
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use intrabal_core::PartitionId;
    use tempfile::TempDir;

    fn write(path: &Path, len: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![3u8; len]).unwrap();
    }

    fn make_move(from: &Path, to: &Path, rel: &str, size: u64) -> UnitMove {
        UnitMove {
            data: FileMove {
                src: from.join(rel),
                dst: to.join(rel),
            },
            meta: FileMove {
                src: from.join(format!("{rel}_1001.meta")),
                dst: to.join(format!("{rel}_1001.meta")),
            },
            size,
            source: PartitionId::new(0),
            target: PartitionId::new(1),
        }
    }

    fn plan_of(moves: Vec<UnitMove>) -> MovePlan {
        let mut plan = MovePlan::default();
        for m in moves {
            plan.add_move(m);
        }
        plan
    }

    #[test]
    fn test_executor_config_default() {
        let config = ExecutorConfig::default();
        assert!(config.sync_copies);
        assert!(config.verify_copies);
    }

    #[test]
    fn test_execution_result_success_rate() {
        let mut result = ExecutionResult::default();
        assert_eq!(result.success_rate(), 100.0);

        let unit = UnitResult {
            index: 0,
            data: FileMove {
                src: PathBuf::from("/a/blk_1"),
                dst: PathBuf::from("/b/blk_1"),
            },
            meta: FileMove {
                src: PathBuf::from("/a/blk_1_1.meta"),
                dst: PathBuf::from("/b/blk_1_1.meta"),
            },
            size: 10,
            success: true,
            error: None,
            method: Some(MoveMethod::Renamed),
            duration: Duration::from_millis(1),
        };
        result.succeeded.push(unit.clone());
        result.failed.push(UnitResult {
            success: false,
            error: Some(ExecutorError::DestinationExists(PathBuf::from("/b/blk_1"))),
            method: None,
            ..unit
        });

        assert_eq!(result.success_rate(), 50.0);
        assert!(result.has_failures());
        assert!(result.pair_inconsistencies().is_empty());
    }

    #[test]
    fn test_execute_empty_plan() {
        let executor = Executor::default();
        let result = executor.execute(&MovePlan::default());

        assert!(result.succeeded.is_empty());
        assert!(result.failed.is_empty());
        assert_eq!(result.moved_bytes, 0);
    }

    #[test]
    fn test_execute_creates_missing_directories() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        let rel = "current/finalized/subdir0/blk_1";
        write(&from.path().join(rel), 100);
        write(&from.path().join(format!("{rel}_1001.meta")), 7);

        let plan = plan_of(vec![make_move(from.path(), to.path(), rel, 107)]);
        let result = Executor::default().execute(&plan);

        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(result.moved_bytes, 107);
        assert!(to.path().join("current/finalized/subdir0").is_dir());
        assert!(to.path().join(rel).is_file());
        assert!(to.path().join(format!("{rel}_1001.meta")).is_file());
        assert!(!from.path().join(rel).exists());
        assert!(!from.path().join(format!("{rel}_1001.meta")).exists());
    }

    #[test]
    fn test_missing_source_fails_without_touching_pair() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        // only the metadata exists
        write(&from.path().join("blk_1_1001.meta"), 7);

        let plan = plan_of(vec![make_move(from.path(), to.path(), "blk_1", 7)]);
        let result = Executor::default().execute(&plan);

        assert_eq!(result.failed.len(), 1);
        assert!(matches!(
            result.failed[0].error,
            Some(ExecutorError::MoveFailed { .. })
        ));
        assert!(from.path().join("blk_1_1001.meta").exists());
        assert!(!to.path().join("blk_1_1001.meta").exists());
    }

    #[test]
    fn test_existing_destination_is_not_overwritten() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        write(&from.path().join("blk_1"), 10);
        write(&from.path().join("blk_1_1001.meta"), 1);
        write(&to.path().join("blk_1"), 99);

        let plan = plan_of(vec![make_move(from.path(), to.path(), "blk_1", 11)]);
        let result = Executor::default().execute(&plan);

        assert_eq!(
            result.failed[0].error,
            Some(ExecutorError::DestinationExists(to.path().join("blk_1")))
        );
        assert_eq!(fs::metadata(to.path().join("blk_1")).unwrap().len(), 99);
        assert!(from.path().join("blk_1").exists());
    }

    #[test]
    fn test_failure_does_not_block_other_units() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        write(&from.path().join("blk_2"), 10);
        write(&from.path().join("blk_2_1001.meta"), 1);

        let plan = plan_of(vec![
            make_move(from.path(), to.path(), "blk_1", 11),
            make_move(from.path(), to.path(), "blk_2", 11),
        ]);
        let result = Executor::default().execute(&plan);

        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(result.succeeded[0].index, 1);
        assert!(to.path().join("blk_2").exists());
    }

    #[test]
    fn test_pair_inconsistent_is_reported() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        write(&from.path().join("blk_1"), 10);
        write(&from.path().join("blk_1_1001.meta"), 1);
        // a regular file where the metadata directory should be created
        write(&to.path().join("blocked"), 1);

        let mut unit_move = make_move(from.path(), to.path(), "blk_1", 11);
        unit_move.meta.dst = to.path().join("blocked/blk_1_1001.meta");

        let result = Executor::default().execute(&plan_of(vec![unit_move]));

        assert_eq!(result.failed.len(), 1);
        assert!(result.failed[0].is_pair_inconsistent());
        assert_eq!(result.pair_inconsistencies().len(), 1);
        assert_eq!(result.moved_bytes, 0);
        assert!(to.path().join("blk_1").exists());
        assert!(from.path().join("blk_1_1001.meta").exists());
        assert!(result.summary().contains("1 inconsistent pairs"));
    }

    #[test]
    fn test_cancel_skips_remaining_units() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        write(&from.path().join("blk_1"), 10);
        write(&from.path().join("blk_1_1001.meta"), 1);

        let executor = Executor::default();
        executor.cancel_handle().cancel();

        let plan = plan_of(vec![make_move(from.path(), to.path(), "blk_1", 11)]);
        let result = executor.execute(&plan);

        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].error, Some(ExecutorError::Cancelled));
        assert!(!result.has_failures());
        assert!(result.succeeded.is_empty());
        assert!(from.path().join("blk_1").exists());
    }

    #[test]
    fn test_shutdown_trips_cancel_handle() {
        let executor = Executor::default();
        let handle = executor.cancel_handle();
        assert!(!handle.is_cancelled());

        executor.shutdown();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_copy_then_remove() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        let src = from.path().join("blk_1");
        let dst = to.path().join("blk_1");
        fs::write(&src, b"block payload").unwrap();

        Executor::default().copy_then_remove(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"block payload");
        assert!(!staging_path(&dst).exists());
    }

    #[test]
    fn test_copy_failure_keeps_source() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        let src = from.path().join("blk_1");
        fs::write(&src, b"block payload").unwrap();
        // destination directory does not exist, so the staging copy fails
        let dst = to.path().join("missing/blk_1");

        let err = Executor::default().copy_then_remove(&src, &dst).unwrap_err();

        assert!(matches!(err, ExecutorError::MoveFailed { .. }));
        assert_eq!(fs::read(&src).unwrap(), b"block payload");
        assert!(!dst.exists());
    }

    #[test]
    fn test_copy_then_remove_without_sync() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        let src = from.path().join("blk_1");
        let dst = to.path().join("blk_1");
        fs::write(&src, vec![5u8; 4096]).unwrap();

        let executor = Executor::new(ExecutorConfig {
            sync_copies: false,
            verify_copies: true,
        });
        executor.copy_then_remove(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::metadata(&dst).unwrap().len(), 4096);
    }

    #[test]
    fn test_short_copy_fails_verification() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("blk_1");
        let staging = staging_path(&src);
        fs::write(&src, vec![1u8; 10]).unwrap();
        // a staged copy that lost its tail
        fs::write(&staging, vec![1u8; 4]).unwrap();

        let err = verify_length(&src, &staging, 10).unwrap_err();
        assert_eq!(
            err,
            ExecutorError::VerificationFailed {
                path: src.clone(),
                expected: 10,
                actual: 4,
            }
        );
        assert!(verify_length(&src, &src, 10).is_ok());
    }

    #[test]
    fn test_failed_rename_is_reported_without_copy() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        let src = from.path().join("blk_1");
        let dst = to.path().join("blk_1");
        fs::write(&src, b"payload").unwrap();

        let renamed = Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = Executor::default().finish_move(&src, &dst, renamed).unwrap_err();

        assert!(matches!(err, ExecutorError::MoveFailed { .. }));
        assert!(src.exists());
        assert!(!dst.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_cross_device_rename_falls_back_to_copy() {
        let from = TempDir::new().unwrap();
        let to = TempDir::new().unwrap();
        let src = from.path().join("blk_1");
        let dst = to.path().join("blk_1");
        fs::write(&src, b"payload").unwrap();

        let renamed = Err(io::Error::from_raw_os_error(libc::EXDEV));
        let method = Executor::default().finish_move(&src, &dst, renamed).unwrap();

        assert_eq!(method, MoveMethod::Copied);
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"payload");
        assert!(!staging_path(&dst).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_parent_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("blk_1");
        fs::write(&file, b"x").unwrap();
        sync_parent_dir(&file).unwrap();
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        assert_eq!(
            staging_path(Path::new("/data/p1/current/blk_1")),
            PathBuf::from("/data/p1/current/.blk_1.intrabal-partial")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_cross_device_detection() {
        assert!(is_cross_device(&io::Error::from_raw_os_error(libc::EXDEV)));
        assert!(!is_cross_device(&io::Error::from_raw_os_error(libc::ENOENT)));
    }
}
