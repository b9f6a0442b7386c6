//! # MLBF Runtime
//!
//! Long-running generation process for the add-on blocklist.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (first CLI argument, else `MLBF_CONFIG`)
//! 2. Initialize logging (`RUST_LOG` overrides the configured level)
//! 3. Import the legacy blocklist, if one is configured
//! 4. Restore the generation state file
//! 5. Run a generation cycle every `interval_secs` until Ctrl+C
//!
//! ## Modules
//!
//! - `config` - TOML configuration with defaults
//! - `orchestrator` - state ownership, cycle timing and the run loop

pub mod config;
pub mod orchestrator;

pub use config::{ConfigError, PathsConfig, RuntimeConfig};
pub use orchestrator::{from_config, import_legacy, Orchestrator};
