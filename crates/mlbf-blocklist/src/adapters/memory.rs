//! In-memory adapters
//!
//! Used by tests and by embedders that already hold the data in process.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    apply_import, plan_import, Artifact, BlockRecord, BlockRegistry, ImportReport, LegacyRecord, MlbfEntrySet,
    UpsertOutcome,
};
use crate::error::{BlockConflict, DataError};
use crate::ports::{ArtifactPublisher, BlockStore, SnapshotStore, VersionResolver};

/// Block store backed by a `BlockRegistry`
#[derive(Default)]
pub struct InMemoryBlockStore {
    registry: RwLock<BlockRegistry>,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: BlockRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
        }
    }

    pub async fn upsert(&self, record: BlockRecord) -> Result<UpsertOutcome, BlockConflict> {
        self.registry.write().await.upsert(record)
    }

    pub async fn remove(&self, guid: &str) -> Option<BlockRecord> {
        self.registry.write().await.remove(guid)
    }

    /// Plan and apply one legacy record against `corpus_guids`
    pub async fn import_legacy(&self, record: &LegacyRecord, corpus_guids: &BTreeSet<String>) -> ImportReport {
        let outcome = plan_import(record, corpus_guids);
        apply_import(&mut *self.registry.write().await, &record.id, &outcome)
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn published_records(&self) -> Result<Vec<BlockRecord>, DataError> {
        Ok(self.registry.read().await.published().cloned().collect())
    }
}

/// Version resolver over a fixed map, with switchable failures
pub struct InMemoryVersionResolver {
    source_id: String,
    versions: RwLock<BTreeMap<String, Vec<String>>>,
    failures: RwLock<BTreeMap<String, DataError>>,
    unavailable: AtomicBool,
}

impl InMemoryVersionResolver {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            versions: RwLock::new(BTreeMap::new()),
            failures: RwLock::new(BTreeMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub async fn set_versions<I, S>(&self, guid: &str, versions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let versions = versions.into_iter().map(Into::into).collect();
        self.versions.write().await.insert(guid.to_string(), versions);
    }

    pub async fn remove_guid(&self, guid: &str) {
        self.versions.write().await.remove(guid);
    }

    /// Make lookups for `guid` fail with `error`
    pub async fn fail_guid(&self, guid: &str, error: DataError) {
        self.failures.write().await.insert(guid.to_string(), error);
    }

    /// Make corpus listing fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl VersionResolver for InMemoryVersionResolver {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn known_guids(&self) -> Result<BTreeSet<String>, DataError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DataError::ConnectionError("version database unavailable".to_string()));
        }
        Ok(self.versions.read().await.keys().cloned().collect())
    }

    async fn versions_for(&self, guid: &str) -> Result<Vec<String>, DataError> {
        if let Some(error) = self.failures.read().await.get(guid) {
            return Err(error.clone());
        }
        self.versions
            .read()
            .await
            .get(guid)
            .cloned()
            .ok_or_else(|| DataError::NotFound { guid: guid.to_string() })
    }
}

/// Publisher that keeps every artifact per collection
#[derive(Default)]
pub struct RecordingPublisher {
    collections: RwLock<BTreeMap<String, Vec<Artifact>>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Artifacts currently in `collection`, oldest first
    pub async fn artifacts(&self, collection: &str) -> Vec<Artifact> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), DataError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DataError::ConnectionError("publisher unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactPublisher for RecordingPublisher {
    async fn publish(&self, artifact: &Artifact, collection: &str) -> Result<(), DataError> {
        self.check()?;
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(artifact.clone());
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<(), DataError> {
        self.check()?;
        self.collections.write().await.remove(collection);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<BTreeMap<u64, MlbfEntrySet>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self, generation_time: u64) -> Result<Option<MlbfEntrySet>, DataError> {
        Ok(self.snapshots.read().await.get(&generation_time).cloned())
    }

    async fn save(&self, snapshot: &MlbfEntrySet) -> Result<(), DataError> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.generation_time(), snapshot.clone());
        Ok(())
    }
}
