//! Unit Scanner
//!
//! Walks a partition root looking for paired units:
//! - Every `<data>_<n>.meta` file names a unit
//! - The data file must sit next to it in the same directory
//! - Metadata files without a data companion are reported as orphans
//! - A data file claimed by several metadata files keeps the first one,
//!   in walk order; the rest are reported as duplicates
//!
//! Sizes are not resolved here; see the inventory.

use intrabal_core::{BalancerError, Result, Unit};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Scanner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Follow symbolic links while walking
    pub follow_links: bool,
    /// Fail the scan on an orphaned or duplicate metadata file instead of
    /// skipping it
    pub strict_orphans: bool,
}

/// Result of scanning one partition root
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Partition root that was walked
    pub root: PathBuf,
    /// Units found, in walk order
    pub units: Vec<Unit>,
    /// Metadata files whose data file is missing
    pub orphans: Vec<PathBuf>,
    /// Extra metadata files for a data file that already has a unit
    pub duplicates: Vec<PathBuf>,
    /// Regular files visited
    pub files_seen: usize,
    /// Walk duration
    pub duration: Duration,
}

impl ScanReport {
    pub fn has_orphans(&self) -> bool {
        !self.orphans.is_empty()
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "Scanned {} files under {} in {:?}: {} units, {} orphaned and {} duplicate metadata files",
            self.files_seen,
            self.root.display(),
            self.duration,
            self.units.len(),
            self.orphans.len(),
            self.duplicates.len()
        )
    }
}

/// Partition scanner
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    /// Create a new scanner
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Scan every root, in order.
    ///
    /// Stops at the first unreadable partition.
    pub fn scan_all(&self, roots: &[PathBuf]) -> Result<Vec<ScanReport>> {
        roots.iter().map(|root| self.scan(root)).collect()
    }

    /// Walk one partition root and collect its units
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn scan(&self, root: &Path) -> Result<ScanReport> {
        let start = Instant::now();

        let metadata = std::fs::metadata(root).map_err(|source| {
            BalancerError::PartitionUnreadable {
                path: root.to_path_buf(),
                source,
            }
        })?;
        if !metadata.is_dir() {
            return Err(BalancerError::PartitionUnreadable {
                path: root.to_path_buf(),
                source: std::io::Error::other("partition root is not a directory"),
            });
        }

        let mut report = ScanReport {
            root: root.to_path_buf(),
            ..Default::default()
        };

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name();
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for entry in walker {
            let entry = entry.map_err(|e| BalancerError::PartitionUnreadable {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf()),
                source: e.into(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            report.files_seen += 1;

            let Some(unit) = Unit::from_meta_path(entry.path()) else {
                continue;
            };

            if !unit.data_path.is_file() {
                if self.config.strict_orphans {
                    return Err(BalancerError::OrphanMetadata {
                        meta_path: unit.meta_path,
                    });
                }
                warn!(
                    meta = %unit.meta_path.display(),
                    "Metadata file has no data companion, skipping"
                );
                report.orphans.push(unit.meta_path);
            } else if claimed.contains(&unit.data_path) {
                if self.config.strict_orphans {
                    return Err(BalancerError::DuplicateMetadata {
                        data_path: unit.data_path,
                        meta_path: unit.meta_path,
                    });
                }
                warn!(
                    data = %unit.data_path.display(),
                    meta = %unit.meta_path.display(),
                    "Data file already has a metadata file, skipping"
                );
                report.duplicates.push(unit.meta_path);
            } else {
                debug!(data = %unit.data_path.display(), "Found unit");
                claimed.insert(unit.data_path.clone());
                report.units.push(unit);
            }
        }

        report.duration = start.elapsed();

        info!(
            units = report.units.len(),
            orphans = report.orphans.len(),
            duplicates = report.duplicates.len(),
            files = report.files_seen,
            "Partition scanned"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, len: usize) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![7u8; len]).unwrap();
    }

    #[test]
    fn test_scan_finds_pairs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "current/blk_1", 100);
        write(dir.path(), "current/blk_1_1001.meta", 7);
        write(dir.path(), "current/sub/blk_2", 50);
        write(dir.path(), "current/sub/blk_2_1002.meta", 7);
        write(dir.path(), "VERSION", 3);

        let report = Scanner::default().scan(dir.path()).unwrap();

        assert_eq!(report.units.len(), 2);
        assert_eq!(report.files_seen, 5);
        assert!(!report.has_orphans());
        assert_eq!(report.units[0].data_path, dir.path().join("current/blk_1"));
        assert_eq!(
            report.units[0].meta_path,
            dir.path().join("current/blk_1_1001.meta")
        );
        assert_eq!(report.units[1].data_path, dir.path().join("current/sub/blk_2"));
        assert!(report.units.iter().all(|u| u.size.is_none()));
    }

    #[test]
    fn test_scan_skips_orphans() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "blk_1", 10);
        write(dir.path(), "blk_1_1.meta", 1);
        write(dir.path(), "blk_9_9.meta", 1);

        let report = Scanner::default().scan(dir.path()).unwrap();

        assert_eq!(report.units.len(), 1);
        assert_eq!(report.orphans, vec![dir.path().join("blk_9_9.meta")]);
        assert!(report.summary().contains("1 orphaned"));
    }

    #[test]
    fn test_scan_strict_orphans_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "blk_9_9.meta", 1);

        let scanner = Scanner::new(ScannerConfig {
            strict_orphans: true,
            ..Default::default()
        });
        let err = scanner.scan(dir.path()).unwrap_err();
        assert!(matches!(err, BalancerError::OrphanMetadata { .. }));
    }

    #[test]
    fn test_scan_keeps_first_metadata_per_data_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "blk_1", 100);
        write(dir.path(), "blk_1_1001.meta", 0);
        write(dir.path(), "blk_1_1002.meta", 0);
        write(dir.path(), "blk_9", 1000);
        write(dir.path(), "blk_9_1001.meta", 0);

        let report = Scanner::default().scan(dir.path()).unwrap();

        let data: Vec<_> = report.units.iter().map(|u| u.data_path.clone()).collect();
        assert_eq!(data, vec![dir.path().join("blk_1"), dir.path().join("blk_9")]);
        assert_eq!(report.units[0].meta_path, dir.path().join("blk_1_1001.meta"));
        assert_eq!(report.duplicates, vec![dir.path().join("blk_1_1002.meta")]);
        assert!(!report.has_orphans());
        assert!(report.summary().contains("1 duplicate"));
    }

    #[test]
    fn test_scan_strict_rejects_duplicate_metadata() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "blk_1", 100);
        write(dir.path(), "blk_1_1001.meta", 0);
        write(dir.path(), "blk_1_1002.meta", 0);

        let scanner = Scanner::new(ScannerConfig {
            strict_orphans: true,
            ..Default::default()
        });
        match scanner.scan(dir.path()).unwrap_err() {
            BalancerError::DuplicateMetadata { data_path, meta_path } => {
                assert_eq!(data_path, dir.path().join("blk_1"));
                assert_eq!(meta_path, dir.path().join("blk_1_1002.meta"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scan_ignores_unpaired_data() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "blk_1", 10);
        write(dir.path(), "blk_2", 10);

        let report = Scanner::default().scan(dir.path()).unwrap();
        assert!(report.units.is_empty());
        assert_eq!(report.files_seen, 2);
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = Scanner::default().scan(&missing).unwrap_err();
        match err {
            BalancerError::PartitionUnreadable { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scan_root_is_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "plain", 1);

        let err = Scanner::default().scan(&dir.path().join("plain")).unwrap_err();
        assert!(matches!(err, BalancerError::PartitionUnreadable { .. }));
    }

    #[test]
    fn test_scan_all_stops_on_unreadable() {
        let good = TempDir::new().unwrap();
        let roots = vec![good.path().to_path_buf(), good.path().join("missing")];

        assert!(Scanner::default().scan_all(&roots).is_err());
        assert_eq!(
            Scanner::default().scan_all(&roots[..1]).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_scan_order_is_deterministic() {
        let dir = TempDir::new().unwrap();
        for name in ["c", "a", "b"] {
            write(dir.path(), &format!("blk_{name}"), 1);
            write(dir.path(), &format!("blk_{name}_1.meta"), 1);
        }

        let report = Scanner::default().scan(dir.path()).unwrap();
        let names: Vec<_> = report
            .units
            .iter()
            .map(|u| u.data_path.file_name().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["blk_a", "blk_b", "blk_c"]);
    }
}
