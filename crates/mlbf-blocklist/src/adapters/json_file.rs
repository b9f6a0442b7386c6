//! JSON file adapters
//!
//! File layouts:
//! - block file: JSON array of `BlockRecord`
//! - version file: JSON object `{ "<guid>": ["<version>", ...] }`
//! - publisher: one directory per collection; a base writes
//!   `<time>-base.json` plus its attachment, a stash writes `<time>-stash.json`
//! - snapshot store: `snapshot-<time>.json`
//!
//! Writes go to a temporary file that is then renamed into place.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::{
    import_legacy_file, Artifact, BlockRecord, BlockRegistry, LegacyImportSummary, LegacyRecord, MlbfEntrySet,
};
use crate::error::DataError;
use crate::ports::{ArtifactPublisher, BlockStore, SnapshotStore, VersionResolver};

fn io_error(path: &Path, error: std::io::Error) -> DataError {
    DataError::QueryError(format!("{}: {}", path.display(), error))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DataError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| DataError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Write `bytes` to a sibling temp file, then rename it over `path`
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| io_error(parent, e))?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes).await.map_err(|e| io_error(&temp_path, e))?;
    fs::rename(&temp_path, path).await.map_err(|e| io_error(path, e))
}

/// Pretty-printed JSON through [`write_atomic`]
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), DataError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| DataError::ParseError(e.to_string()))?;
    write_atomic(path, &bytes).await
}

/// Block records kept in a JSON file
pub struct JsonBlockFile {
    path: PathBuf,
}

impl JsonBlockFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load_registry(&self) -> Result<BlockRegistry, DataError> {
        let records: Vec<BlockRecord> = read_json(&self.path).await?.unwrap_or_default();
        BlockRegistry::from_records(records).map_err(|conflict| DataError::ParseError(conflict.to_string()))
    }

    async fn store_registry(&self, registry: &BlockRegistry) -> Result<(), DataError> {
        let records: Vec<&BlockRecord> = registry.iter().collect();
        write_json(&self.path, &records).await
    }

    /// Import legacy records from `legacy_path` into this file.
    ///
    /// Each record is reconciled against its previous import, so running
    /// the same import twice is a no-op. Blocks of legacy ids missing from
    /// the file are deleted.
    pub async fn import_legacy(
        &self,
        legacy_path: &Path,
        corpus_guids: &BTreeSet<String>,
    ) -> Result<LegacyImportSummary, DataError> {
        let legacy: Vec<LegacyRecord> = read_json(legacy_path).await?.unwrap_or_default();
        let mut registry = self.load_registry().await?;
        let summary = import_legacy_file(&mut registry, &legacy, corpus_guids);
        self.store_registry(&registry).await?;
        info!(
            records = legacy.len(),
            retired = summary.retired.len(),
            path = %legacy_path.display(),
            "Imported legacy blocklist"
        );
        Ok(summary)
    }
}

#[async_trait]
impl BlockStore for JsonBlockFile {
    async fn published_records(&self) -> Result<Vec<BlockRecord>, DataError> {
        Ok(self.load_registry().await?.published().cloned().collect())
    }
}

/// Add-on versions kept in a JSON file, read once per corpus listing
pub struct JsonVersionFile {
    path: PathBuf,
    source_id: String,
    cache: RwLock<Option<BTreeMap<String, Vec<String>>>>,
}

impl JsonVersionFile {
    pub fn new(path: impl Into<PathBuf>, source_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source_id: source_id.into(),
            cache: RwLock::new(None),
        }
    }

    async fn reload(&self) -> Result<BTreeMap<String, Vec<String>>, DataError> {
        let versions: BTreeMap<String, Vec<String>> = read_json(&self.path).await?.ok_or_else(|| {
            DataError::ConnectionError(format!("version file {} not found", self.path.display()))
        })?;
        *self.cache.write().await = Some(versions.clone());
        Ok(versions)
    }
}

#[async_trait]
impl VersionResolver for JsonVersionFile {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn known_guids(&self) -> Result<BTreeSet<String>, DataError> {
        Ok(self.reload().await?.into_keys().collect())
    }

    async fn versions_for(&self, guid: &str) -> Result<Vec<String>, DataError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return cached
                .get(guid)
                .cloned()
                .ok_or_else(|| DataError::NotFound { guid: guid.to_string() });
        }
        self.reload()
            .await?
            .remove(guid)
            .ok_or_else(|| DataError::NotFound { guid: guid.to_string() })
    }
}

/// Publishes artifacts as files under one directory per collection
pub struct DirectoryPublisher {
    root: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }
}

#[async_trait]
impl ArtifactPublisher for DirectoryPublisher {
    async fn publish(&self, artifact: &Artifact, collection: &str) -> Result<(), DataError> {
        let dir = self.collection_dir(collection);
        match artifact {
            Artifact::Base(base) => {
                let time = base.record.generation_time;
                let attachment = dir.join(format!("{}-{}", time, base.attachment.filename));
                write_atomic(&attachment, &base.attachment.data).await?;
                write_json(&dir.join(format!("{time}-base.json")), &base.record).await?;
                info!(
                    generation_time = time,
                    bytes = base.attachment.data.len(),
                    sha256 = %base.attachment.digest(),
                    "Wrote base filter"
                );
            }
            Artifact::Stash(stash) => {
                write_json(&dir.join(format!("{}-stash.json", stash.stash_time)), stash).await?;
                info!(stash_time = stash.stash_time, "Wrote stash");
            }
        }
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<(), DataError> {
        let dir = self.collection_dir(collection);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&dir, e)),
        }
        fs::create_dir_all(&dir).await.map_err(|e| io_error(&dir, e))
    }
}

/// Snapshots as JSON files in one directory
pub struct JsonSnapshotStore {
    dir: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, generation_time: u64) -> PathBuf {
        self.dir.join(format!("snapshot-{generation_time}.json"))
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load(&self, generation_time: u64) -> Result<Option<MlbfEntrySet>, DataError> {
        read_json(&self.path_for(generation_time)).await
    }

    async fn save(&self, snapshot: &MlbfEntrySet) -> Result<(), DataError> {
        write_json(&self.path_for(snapshot.generation_time()), snapshot).await
    }
}
