//! # MLBF Blocklist
//!
//! Add-on blocklist generation: block records are turned into a compact
//! two-layer bloom filter ("MLBF") that clients query offline, with small
//! incremental stashes published between full rebuilds.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure business logic, no I/O
//!   - `BlockRecord` / `BlockRegistry`: one blocked version range per GUID
//!   - `split_regex_to_list`: legacy GUID regex decomposition
//!   - `MlbfEntrySet`: blocked / not-blocked snapshot for one generation
//!   - `Mlbf`: two-layer filter with no false negatives over the snapshot
//!   - `Stash`: added / removed delta between generations
//!   - `SchedulerPolicy`: base vs stash decision
//!   - `ClientBlocklist`: how a client combines a base with stashes
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `MlbfApi`: Driving port (inbound API)
//!   - `BlockStore`, `VersionResolver`, `ArtifactPublisher`, `SnapshotStore`:
//!     Driven ports
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `MlbfGenerationService`: runs one generation cycle, implements `MlbfApi`
//!
//! - **Adapters Layer** (`adapters/`): In-memory and JSON-file port
//!   implementations
//!
//! ## Invariants
//!
//! - **No false negatives**: every blocked entry of a snapshot tests blocked
//!   against the filter built from it
//! - **Stash algebra**: `(old ∪ added) − removed == new`, `added ∩ removed = ∅`
//! - **Chain continuity**: a stash is only computed against the published
//!   chain head, from the same version source, for a strictly later time
//! - **Determinism**: the same snapshot and config give byte-identical filters
//!
//! ## Usage Example
//!
//! ```ignore
//! use mlbf_blocklist::{MlbfConfig, MlbfEntry, MlbfEntrySet, Mlbf};
//!
//! let snapshot = MlbfEntrySet::from_parts(
//!     1_700_000_000_000,
//!     "amo-db",
//!     vec![MlbfEntry::new("ext1@x", "1.0")],
//!     vec![MlbfEntry::new("ext1@x", "2.0")],
//! );
//! let (filter, stats) = Mlbf::build(&snapshot, &MlbfConfig::default())?;
//! assert!(filter.is_blocked("ext1@x", "1.0"));
//! assert!(!filter.is_blocked("ext1@x", "2.0"));
//! ```
//!
//! ## Wiring
//!
//! ```ignore
//! use mlbf_blocklist::adapters::{DirectoryPublisher, JsonBlockFile, JsonSnapshotStore, JsonVersionFile};
//! use mlbf_blocklist::{GenerationState, MlbfGenerationService};
//! use std::sync::Arc;
//!
//! let service = MlbfGenerationService::new(
//!     Arc::new(JsonBlockFile::new("blocks.json")),
//!     Arc::new(JsonVersionFile::new("versions.json", "amo-db")),
//!     Arc::new(DirectoryPublisher::new("out")),
//!     Arc::new(JsonSnapshotStore::new("snapshots")),
//! );
//! let mut state = GenerationState::default();
//! service.run_cycle(&mut state, now_millis).await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use domain::{
    Artifact, BlockOrigin, BlockRecord, BlockRegistry, ClientBlocklist, GenerationState, LegacyRecord, Mlbf,
    MlbfConfig, MlbfConfigBuilder, MlbfEntry, MlbfEntrySet, Publication, SchedulerPolicy, Stash, VersionCorpus,
};
pub use error::{BlockConflict, ClientError, DataError, FilterError, ServiceError, StashError};
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use ports::{ArtifactPublisher, BlockStore, MlbfApi, SnapshotStore, VersionResolver};
pub use service::{CycleOutcome, MlbfGenerationService, DEFAULT_COLLECTION};
