//! Block records and the per-GUID registry
//!
//! A `BlockRecord` is the canonical unit of a blocking decision: one GUID,
//! one inclusive version range. Records imported from a legacy regex entry
//! are tagged `RegexDerived` so that a later write for a different source
//! cannot silently replace them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::version::{VersionRange, MAX_VERSION_ANY, MIN_VERSION_ANY};
use crate::error::BlockConflict;

/// Where a block record came from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockOrigin {
    /// Created for an explicitly named GUID (reviewer or single-GUID import).
    Explicit { source_id: Option<String> },
    /// Created by expanding a legacy regex entry with the given id.
    RegexDerived { source_id: String },
}

impl BlockOrigin {
    pub fn source_id(&self) -> Option<&str> {
        match self {
            BlockOrigin::Explicit { source_id } => source_id.as_deref(),
            BlockOrigin::RegexDerived { source_id } => Some(source_id),
        }
    }

    pub fn is_regex_derived(&self) -> bool {
        matches!(self, BlockOrigin::RegexDerived { .. })
    }
}

impl Default for BlockOrigin {
    fn default() -> Self {
        BlockOrigin::Explicit { source_id: None }
    }
}

/// One blocked add-on and its blocked version range
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub guid: String,
    #[serde(default = "default_min_version")]
    pub min_version: String,
    #[serde(default = "default_max_version")]
    pub max_version: String,
    #[serde(default)]
    pub origin: BlockOrigin,
    /// Whether this record is published at all
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_min_version() -> String {
    MIN_VERSION_ANY.to_string()
}

fn default_max_version() -> String {
    MAX_VERSION_ANY.to_string()
}

fn default_include() -> bool {
    true
}

impl BlockRecord {
    /// Block every version of `guid`
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            min_version: default_min_version(),
            max_version: default_max_version(),
            origin: BlockOrigin::default(),
            include: true,
        }
    }

    pub fn with_range(mut self, min_version: impl Into<String>, max_version: impl Into<String>) -> Self {
        self.min_version = min_version.into();
        self.max_version = max_version.into();
        self
    }

    pub fn with_origin(mut self, origin: BlockOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_include(mut self, include: bool) -> Self {
        self.include = include;
        self
    }

    pub fn version_range(&self) -> VersionRange {
        VersionRange::new(&self.min_version, &self.max_version)
    }

    pub fn is_version_blocked(&self, version: &str) -> bool {
        self.version_range().contains(version)
    }

    /// Whether `incoming` may replace this record without an explicit override.
    ///
    /// A regex-derived record can only be rewritten by the import that
    /// created it.
    pub fn accepts_update_from(&self, incoming: &BlockOrigin) -> bool {
        match &self.origin {
            BlockOrigin::Explicit { .. } => true,
            BlockOrigin::RegexDerived { source_id } => incoming.source_id() == Some(source_id),
        }
    }
}

/// Result of a registry write
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Exactly one active record per GUID
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockRegistry {
    records: BTreeMap<String, BlockRecord>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = BlockRecord>) -> Result<Self, BlockConflict> {
        let mut registry = Self::new();
        for record in records {
            registry.upsert(record)?;
        }
        Ok(registry)
    }

    /// Insert or update a record, refusing to clobber a regex-derived record
    /// from a different source.
    pub fn upsert(&mut self, record: BlockRecord) -> Result<UpsertOutcome, BlockConflict> {
        if let Some(existing) = self.records.get(&record.guid) {
            if !existing.accepts_update_from(&record.origin) {
                return Err(BlockConflict {
                    guid: record.guid,
                    existing_source: existing.origin.source_id().unwrap_or_default().to_string(),
                    incoming_source: record.origin.source_id().map(str::to_owned),
                });
            }
        }
        Ok(self.replace(record))
    }

    /// Unconditionally store `record`. Use only when the caller has decided
    /// the regex-derived guard does not apply.
    pub fn replace(&mut self, record: BlockRecord) -> UpsertOutcome {
        match self.records.insert(record.guid.clone(), record) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Created,
        }
    }

    pub fn remove(&mut self, guid: &str) -> Option<BlockRecord> {
        self.records.remove(guid)
    }

    /// Remove every record created by the given source id
    pub fn remove_by_source(&mut self, source_id: &str) -> Vec<BlockRecord> {
        let guids: Vec<String> = self
            .records
            .values()
            .filter(|r| r.origin.source_id() == Some(source_id))
            .map(|r| r.guid.clone())
            .collect();
        guids.iter().filter_map(|g| self.records.remove(g)).collect()
    }

    pub fn get(&self, guid: &str) -> Option<&BlockRecord> {
        self.records.get(guid)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record, published or not, in GUID order
    pub fn iter(&self) -> impl Iterator<Item = &BlockRecord> {
        self.records.values()
    }

    /// Records that should be published, in GUID order
    pub fn published(&self) -> impl Iterator<Item = &BlockRecord> {
        self.records.values().filter(|r| r.include)
    }
}
