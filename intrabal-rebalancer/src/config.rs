//! Rebalancer configuration
//!
//! Configuration loaded from environment variables, a TOML file and the
//! command line, in increasing order of precedence.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::executor::ExecutorConfig;
use crate::planner::PlannerConfig;
use crate::scanner::ScannerConfig;

/// Key holding the partition list when none is given
pub const DEFAULT_PARTITIONS_KEY: &str = "balancer.partitions";

/// Environment variable holding a comma-separated partition list
pub const PARTITIONS_ENV: &str = "INTRABAL_PARTITIONS";

/// Environment variable enabling dry-run mode
pub const DRY_RUN_ENV: &str = "INTRABAL_DRY_RUN";

const FILE_SCHEME: &str = "file://";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to read config file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid partition set: {0}")]
    Validation(String),
}

/// Rebalancer configuration
#[derive(Debug, Clone, Default)]
pub struct RebalancerConfig {
    /// Partition roots, in the order partition ids are assigned
    pub partitions: Vec<PathBuf>,

    /// Plan without moving anything
    pub dry_run: bool,

    pub scanner: ScannerConfig,
    pub planner: PlannerConfig,
    pub executor: ExecutorConfig,
}

/// `[balancer]` settings of a config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BalancerSection {
    dry_run: Option<bool>,
    max_moves: Option<usize>,
    max_bytes: Option<u64>,
    sync_copies: Option<bool>,
    verify_copies: Option<bool>,
    strict_orphans: Option<bool>,
    follow_links: Option<bool>,
}

impl RebalancerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let partitions = lookup(PARTITIONS_ENV)
            .map(|v| parse_partition_list(&v))
            .unwrap_or_default();

        let dry_run = match lookup(DRY_RUN_ENV) {
            Some(v) => parse_bool(DRY_RUN_ENV, &v)?,
            None => false,
        };

        Ok(Self {
            partitions,
            dry_run,
            ..Default::default()
        })
    }

    /// Load a config file and layer it over `self`
    pub fn merge_file(&mut self, path: &Path, key: &str) -> Result<(), ConfigError> {
        let doc = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_toml_str(&doc, key)
    }

    /// Layer a TOML document over `self`.
    ///
    /// The partition list is read from the dotted `key`. It may be an array
    /// of paths or a single comma-separated string. Settings under
    /// `[balancer]` override the current ones.
    pub fn merge_toml_str(&mut self, doc: &str, key: &str) -> Result<(), ConfigError> {
        let table: toml::Table = doc
            .parse()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(e.to_string()))?;

        if let Some(value) = lookup_dotted(&table, key) {
            self.partitions = partitions_from_value(key, value)?;
        }

        if let Some(section) = table.get("balancer") {
            let section: BalancerSection = section
                .clone()
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::ParseError(e.to_string()))?;
            self.apply_section(section);
        }

        Ok(())
    }

    fn apply_section(&mut self, section: BalancerSection) {
        if let Some(dry_run) = section.dry_run {
            self.dry_run = dry_run;
        }
        if section.max_moves.is_some() {
            self.planner.max_moves = section.max_moves;
        }
        if section.max_bytes.is_some() {
            self.planner.max_bytes = section.max_bytes;
        }
        if let Some(sync) = section.sync_copies {
            self.executor.sync_copies = sync;
        }
        if let Some(verify) = section.verify_copies {
            self.executor.verify_copies = verify;
        }
        if let Some(strict) = section.strict_orphans {
            self.scanner.strict_orphans = strict;
        }
        if let Some(follow) = section.follow_links {
            self.scanner.follow_links = follow;
        }
    }

    /// Validate the partition set without touching the filesystem
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions.is_empty() {
            return Err(ConfigError::Validation(
                "no partition roots configured".to_string(),
            ));
        }
        if self.partitions.len() < 2 {
            return Err(ConfigError::Validation(
                "at least two partition roots are required".to_string(),
            ));
        }

        for root in &self.partitions {
            if !root.is_absolute() {
                return Err(ConfigError::Validation(format!(
                    "partition root {root:?} is not absolute"
                )));
            }
        }

        for (i, a) in self.partitions.iter().enumerate() {
            for b in &self.partitions[i + 1..] {
                if a == b {
                    return Err(ConfigError::Validation(format!(
                        "partition root {a:?} is listed twice"
                    )));
                }
                if a.starts_with(b) || b.starts_with(a) {
                    return Err(ConfigError::Validation(format!(
                        "partition roots {a:?} and {b:?} are nested"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Split a comma-separated partition list, dropping any `file://` scheme
pub fn parse_partition_list(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| PathBuf::from(s.strip_prefix(FILE_SCHEME).unwrap_or(s)))
        .collect()
}

fn partitions_from_value(key: &str, value: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(parse_partition_list(s)),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                toml::Value::String(s) => Ok(parse_partition_list(s)),
                other => Err(ConfigError::InvalidValue(
                    key.to_string(),
                    format!("expected a path, got {}", other.type_str()),
                )),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|lists| lists.into_iter().flatten().collect()),
        other => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("expected a string or an array, got {}", other.type_str()),
        )),
    }
}

fn lookup_dotted<'a>(table: &'a toml::Table, key: &str) -> Option<&'a toml::Value> {
    let mut parts = key.split('.');
    let mut value = table.get(parts.next()?)?;
    for part in parts {
        value = value.as_table()?.get(part)?;
    }
    Some(value)
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue(name.to_string(), other.to_string())),
    }
}
