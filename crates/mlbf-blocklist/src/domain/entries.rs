//! Snapshot of blocked and not-blocked (guid, version) pairs
//!
//! An `MlbfEntrySet` is built fresh for every generation from the published
//! block records and the add-on version corpus. It is never mutated after
//! construction.
//!
//! INVARIANTS:
//! - `blocked` and `not_blocked` are disjoint
//! - a GUID whose versions could not be resolved contributes to neither set

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::block::BlockRecord;
use super::version::VersionRange;
use crate::error::DataError;

/// Documents how an entry is encoded into a filter key.
///
/// Published with every artifact so clients can detect a format change.
pub const KEY_FORMAT: &str = "{guid}:{version}";

const DEFAULT_MEMO_CAPACITY: usize = 1024;

/// One (add-on, version) pair
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MlbfEntry {
    pub guid: String,
    pub version: String,
}

impl MlbfEntry {
    pub fn new(guid: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            version: version.into(),
        }
    }

    /// Filter key per [`KEY_FORMAT`]
    pub fn key(&self) -> String {
        format_key(&self.guid, &self.version)
    }
}

pub fn format_key(guid: &str, version: &str) -> String {
    format!("{}:{}", guid, version)
}

/// Known versions for every add-on, as returned by the version resolver.
///
/// Per-GUID failures are kept alongside successes so the snapshot build can
/// report them instead of aborting.
#[derive(Clone, Debug, Default)]
pub struct VersionCorpus {
    source_id: String,
    versions: BTreeMap<String, Result<Vec<String>, DataError>>,
}

impl VersionCorpus {
    /// `source_id` identifies the resolver; stashes may only be computed
    /// between snapshots that share it.
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            versions: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, guid: impl Into<String>, versions: Result<Vec<String>, DataError>) {
        self.versions.insert(guid.into(), versions);
    }

    pub fn with_versions<I, S>(mut self, guid: &str, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(guid, Ok(versions.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_failure(mut self, guid: &str, error: DataError) -> Self {
        self.insert(guid, Err(error));
        self
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn get(&self, guid: &str) -> Option<&Result<Vec<String>, DataError>> {
        self.versions.get(guid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Result<Vec<String>, DataError>)> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// A GUID left out of the snapshot, with the reason
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedGuid {
    pub guid: String,
    pub error: DataError,
    /// Whether a published block record named this GUID
    pub was_blocked: bool,
}

/// What happened while building a snapshot
#[derive(Clone, Debug, Default)]
pub struct SnapshotReport {
    pub skipped: Vec<SkippedGuid>,
    /// Block records for GUIDs absent from the corpus entirely
    pub unknown_guids: Vec<String>,
    pub memo_hits: usize,
}

/// Blocked / not-blocked entries at one generation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlbfEntrySet {
    generation_time: u64,
    source_id: String,
    blocked: BTreeSet<MlbfEntry>,
    not_blocked: BTreeSet<MlbfEntry>,
}

type RangeKey = (String, String);

impl MlbfEntrySet {
    /// Assemble a snapshot from already-classified entries.
    ///
    /// Anything in both sets is treated as blocked.
    pub fn from_parts(
        generation_time: u64,
        source_id: impl Into<String>,
        blocked: impl IntoIterator<Item = MlbfEntry>,
        not_blocked: impl IntoIterator<Item = MlbfEntry>,
    ) -> Self {
        let blocked: BTreeSet<MlbfEntry> = blocked.into_iter().collect();
        let not_blocked = not_blocked
            .into_iter()
            .filter(|e| !blocked.contains(e))
            .collect();
        Self {
            generation_time,
            source_id: source_id.into(),
            blocked,
            not_blocked,
        }
    }

    /// Classify every version in `corpus` against the published `records`.
    ///
    /// `records` must hold at most one published record per GUID; the block
    /// registry guarantees this. Parsed ranges are memoised per
    /// `(min_version, max_version)` for the duration of this call only.
    pub fn build<'a>(
        generation_time: u64,
        records: impl IntoIterator<Item = &'a BlockRecord>,
        corpus: &VersionCorpus,
        memo_capacity: usize,
    ) -> (Self, SnapshotReport) {
        let capacity = NonZeroUsize::new(memo_capacity)
            .or(NonZeroUsize::new(DEFAULT_MEMO_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        let mut memo: LruCache<RangeKey, Arc<VersionRange>> = LruCache::new(capacity);
        let mut report = SnapshotReport::default();
        let mut blocked = BTreeSet::new();
        let mut not_blocked = BTreeSet::new();

        let mut blocked_guids: BTreeMap<&str, &BlockRecord> = BTreeMap::new();
        for record in records.into_iter().filter(|r| r.include) {
            blocked_guids.insert(record.guid.as_str(), record);
        }

        for (guid, record) in &blocked_guids {
            match corpus.get(guid) {
                None => {
                    debug!(guid = %guid, "Block record names a guid with no known versions");
                    report.unknown_guids.push(guid.to_string());
                }
                Some(Err(error)) => {
                    warn!(guid = %guid, error = %error, "Skipping blocked guid: version lookup failed");
                    report.skipped.push(SkippedGuid {
                        guid: guid.to_string(),
                        error: error.clone(),
                        was_blocked: true,
                    });
                }
                Some(Ok(versions)) => {
                    let key = (record.min_version.clone(), record.max_version.clone());
                    let range = match memo.get(&key) {
                        Some(hit) => {
                            report.memo_hits += 1;
                            Arc::clone(hit)
                        }
                        None => {
                            let range = Arc::new(record.version_range());
                            memo.put(key, Arc::clone(&range));
                            range
                        }
                    };
                    for version in versions {
                        let entry = MlbfEntry::new(*guid, version.as_str());
                        if range.contains(version) {
                            blocked.insert(entry);
                        } else {
                            not_blocked.insert(entry);
                        }
                    }
                }
            }
        }

        for (guid, versions) in corpus.iter() {
            if blocked_guids.contains_key(guid.as_str()) {
                continue;
            }
            match versions {
                Ok(versions) => {
                    not_blocked.extend(versions.iter().map(|v| MlbfEntry::new(guid.as_str(), v.as_str())));
                }
                Err(error) => {
                    debug!(guid = %guid, error = %error, "Omitting unresolved guid from not-blocked set");
                    report.skipped.push(SkippedGuid {
                        guid: guid.clone(),
                        error: error.clone(),
                        was_blocked: false,
                    });
                }
            }
        }

        let set = Self {
            generation_time,
            source_id: corpus.source_id().to_string(),
            blocked,
            not_blocked,
        };
        (set, report)
    }

    pub fn generation_time(&self) -> u64 {
        self.generation_time
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn blocked(&self) -> &BTreeSet<MlbfEntry> {
        &self.blocked
    }

    pub fn not_blocked(&self) -> &BTreeSet<MlbfEntry> {
        &self.not_blocked
    }

    pub fn blocked_keys(&self) -> BTreeSet<String> {
        self.blocked.iter().map(MlbfEntry::key).collect()
    }

    pub fn is_blocked(&self, guid: &str, version: &str) -> bool {
        self.blocked.contains(&MlbfEntry::new(guid, version))
    }
}
