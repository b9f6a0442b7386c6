//! Domain Layer - Pure blocklist logic
//!
//! This layer contains:
//! - Block records, the per-GUID registry and version ordering
//! - GUID regex decomposition and legacy record import
//! - Snapshot (entry set) construction
//! - Bloom filter primitives and the two-layer filter
//! - Stash computation, the publication policy and the client view
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - No clock reads; generation times are always passed in

pub mod artifact;
pub mod block;
pub mod bloom_filter;
pub mod client;
pub mod config;
pub mod entries;
pub mod guid_pattern;
pub mod hash_functions;
pub mod legacy_import;
pub mod mlbf;
pub mod parameters;
pub mod scheduler;
pub mod stash;
pub mod version;

pub use artifact::{
    Artifact, Attachment, BaseArtifact, BaseFilterRecord, StashBody, StashRecord, ATTACHMENT_TYPE_BASE,
};
pub use block::{BlockOrigin, BlockRecord, BlockRegistry, UpsertOutcome};
pub use bloom_filter::BloomFilter;
pub use client::ClientBlocklist;
pub use config::{MlbfConfig, MlbfConfigBuilder};
pub use entries::{
    format_key, MlbfEntry, MlbfEntrySet, SkippedGuid, SnapshotReport, VersionCorpus, KEY_FORMAT,
};
pub use guid_pattern::{escape_braces, join_guids_to_regex, split_regex_to_list};
pub use legacy_import::{
    apply_import, import_legacy_file, plan_import, retire_missing_imports, ImportOutcome, ImportReport,
    LegacyImportSummary, LegacyRecord, FIREFOX_GUID,
};
pub use mlbf::{BuildStats, Mlbf, ARTIFACT_FORMAT_VERSION};
pub use parameters::{exclusion_rate, layer_params, LayerParams};
pub use scheduler::{GenerationState, Publication, SchedulerPolicy};
pub use stash::{ChainHead, Stash, StashMetrics};
pub use version::{compare_versions, AddonVersion, VersionRange, MAX_VERSION_ANY, MIN_VERSION_ANY};
