//! Outbound Ports (Driven Ports)
//!
//! Collaborators the generation service depends on. All of them may fail
//! transiently; adapters report that through `DataError::is_retryable`.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::{Artifact, BlockRecord, MlbfEntrySet};
use crate::error::DataError;

/// Source of the current block records
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Records that should be published, one per GUID
    async fn published_records(&self) -> Result<Vec<BlockRecord>, DataError>;
}

/// Resolves add-on GUIDs to the versions that exist for them
///
/// The source id identifies the underlying database. Snapshots built from
/// different sources must never be diffed against each other.
#[async_trait]
pub trait VersionResolver: Send + Sync {
    fn source_id(&self) -> &str;

    /// Every GUID that has at least one eligible version
    async fn known_guids(&self) -> Result<BTreeSet<String>, DataError>;

    /// Versions of one add-on. `NotFound` for unknown GUIDs.
    async fn versions_for(&self, guid: &str) -> Result<Vec<String>, DataError>;
}

/// Publishes artifacts to the remote collection clients read from
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    async fn publish(&self, artifact: &Artifact, collection: &str) -> Result<(), DataError>;

    /// Remove every record from `collection`. Called before a new base goes out.
    async fn delete_all(&self, collection: &str) -> Result<(), DataError>;
}

/// Persistence for snapshots, keyed by generation time
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, generation_time: u64) -> Result<Option<MlbfEntrySet>, DataError>;

    async fn save(&self, snapshot: &MlbfEntrySet) -> Result<(), DataError>;
}
