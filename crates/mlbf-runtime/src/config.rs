//! Runtime configuration
//!
//! Every field is optional in the file; missing fields fall back to the
//! defaults below.
//!
//! # Config File Format
//!
//! ```toml
//! source_id = "amo-db"
//! collection = "addons-bloomfilters"
//!
//! [paths]
//! blocks = "data/blocks.json"
//! versions = "data/versions.json"
//! legacy = "data/legacy-blocklist.json"
//! output = "out"
//! snapshots = "data/snapshots"
//! state = "data/state.json"
//!
//! [filter]
//! target_fpr = 0.001
//! max_filter_bits = 536870912
//! seed = 0
//! max_salt_attempts = 16
//! memo_capacity = 1024
//!
//! [schedule]
//! interval_secs = 3600
//! rebuild_change_ratio = 0.1
//! max_stash_chain = 50
//!
//! [logging]
//! level = "info"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mlbf_blocklist::{MlbfConfig, MlbfConfigBuilder, SchedulerPolicy, DEFAULT_COLLECTION};
use serde::Deserialize;
use thiserror::Error;
use tracing::Level;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "MLBF_CONFIG";

const DEFAULT_SOURCE_ID: &str = "amo-db";
const DEFAULT_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    source_id: Option<String>,
    collection: Option<String>,
    #[serde(default)]
    paths: PathsFile,
    #[serde(default)]
    filter: FilterFile,
    #[serde(default)]
    schedule: ScheduleFile,
    #[serde(default)]
    logging: LoggingFile,
}

#[derive(Debug, Deserialize, Default)]
struct PathsFile {
    blocks: Option<PathBuf>,
    versions: Option<PathBuf>,
    legacy: Option<PathBuf>,
    output: Option<PathBuf>,
    snapshots: Option<PathBuf>,
    state: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct FilterFile {
    target_fpr: Option<f64>,
    max_filter_bits: Option<usize>,
    seed: Option<u64>,
    max_salt_attempts: Option<u32>,
    memo_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ScheduleFile {
    interval_secs: Option<u64>,
    rebuild_change_ratio: Option<f64>,
    max_stash_chain: Option<usize>,
    max_base_age_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingFile {
    level: Option<String>,
}

/// File locations used by the runtime
#[derive(Debug, Clone, PartialEq)]
pub struct PathsConfig {
    pub blocks: PathBuf,
    pub versions: PathBuf,
    /// Legacy blocklist to import before the first cycle, if any
    pub legacy: Option<PathBuf>,
    pub output: PathBuf,
    pub snapshots: PathBuf,
    pub state: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            blocks: PathBuf::from("data/blocks.json"),
            versions: PathBuf::from("data/versions.json"),
            legacy: None,
            output: PathBuf::from("out"),
            snapshots: PathBuf::from("data/snapshots"),
            state: PathBuf::from("data/state.json"),
        }
    }
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source_id: String,
    pub collection: String,
    pub paths: PathsConfig,
    pub filter: MlbfConfig,
    pub policy: SchedulerPolicy,
    pub interval: Duration,
    pub log_level: Level,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source_id: DEFAULT_SOURCE_ID.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            paths: PathsConfig::default(),
            filter: MlbfConfig::default(),
            policy: SchedulerPolicy::default(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            log_level: Level::INFO,
        }
    }
}

impl RuntimeConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io {
                path: path.display().to_string(),
                error: e.to_string(),
            }),
        }
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let defaults = Self::default();

        let ff = file.filter;
        let filter = MlbfConfigBuilder::new()
            .target_fpr(ff.target_fpr.unwrap_or(defaults.filter.target_fpr))
            .max_filter_bits(ff.max_filter_bits.unwrap_or(defaults.filter.max_filter_bits))
            .seed(ff.seed.unwrap_or(defaults.filter.seed))
            .max_salt_attempts(ff.max_salt_attempts.unwrap_or(defaults.filter.max_salt_attempts))
            .memo_capacity(ff.memo_capacity.unwrap_or(defaults.filter.memo_capacity))
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let sf = file.schedule;
        let policy = SchedulerPolicy {
            rebuild_change_ratio: sf
                .rebuild_change_ratio
                .unwrap_or(defaults.policy.rebuild_change_ratio),
            max_stash_chain: sf.max_stash_chain.unwrap_or(defaults.policy.max_stash_chain),
            max_base_age_ms: match sf.max_base_age_secs {
                Some(secs) => secs.saturating_mul(1000),
                None => defaults.policy.max_base_age_ms,
            },
        };
        if policy.rebuild_change_ratio.is_nan() || policy.rebuild_change_ratio < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "rebuild_change_ratio must be non-negative, got {}",
                policy.rebuild_change_ratio
            )));
        }
        if policy.max_base_age_ms == 0 {
            return Err(ConfigError::Invalid("max_base_age_secs must be positive".to_string()));
        }
        let interval_secs = sf.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(ConfigError::Invalid("interval_secs must be positive".to_string()));
        }

        let log_level = match file.logging.level {
            Some(level) => level
                .parse::<Level>()
                .map_err(|_| ConfigError::Invalid(format!("unknown log level {level:?}")))?,
            None => defaults.log_level,
        };

        let pf = file.paths;
        let dp = defaults.paths;
        let paths = PathsConfig {
            blocks: pf.blocks.unwrap_or(dp.blocks),
            versions: pf.versions.unwrap_or(dp.versions),
            legacy: pf.legacy,
            output: pf.output.unwrap_or(dp.output),
            snapshots: pf.snapshots.unwrap_or(dp.snapshots),
            state: pf.state.unwrap_or(dp.state),
        };

        Ok(Self {
            source_id: file.source_id.unwrap_or(defaults.source_id),
            collection: file.collection.unwrap_or(defaults.collection),
            paths,
            filter,
            policy,
            interval: Duration::from_secs(interval_secs),
            log_level,
        })
    }
}

/// Config path from the first CLI argument, else `MLBF_CONFIG`
pub fn config_path_from_env() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

/// Errors that can occur during config loading
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
