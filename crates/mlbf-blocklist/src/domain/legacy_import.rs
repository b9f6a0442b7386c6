//! Import of legacy blocklist records
//!
//! A legacy record names either one GUID or a `/regex/` over GUIDs. Regex
//! records are first decomposed into an explicit list (exact-match lookup);
//! only when that is unsafe is the regex compiled and run over the corpus.
//! Every record produced from a regex is tagged `RegexDerived` with the
//! legacy id, so later writes from other sources cannot clobber it.
//!
//! Only imports set a record's `source_id`. When a legacy id disappears from
//! the legacy file, every record carrying it is deleted.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::block::{BlockOrigin, BlockRecord, BlockRegistry, UpsertOutcome};
use super::guid_pattern::{escape_braces, split_regex_to_list};
use super::version::{MAX_VERSION_ANY, MIN_VERSION_ANY};
use crate::error::BlockConflict;

/// Application id of Firefox desktop
pub const FIREFOX_GUID: &str = "{ec8030f7-c20a-464f-9b0e-13a3a9e97384}";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetApplication {
    #[serde(default)]
    pub guid: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyVersionRange {
    #[serde(default)]
    pub min_version: Option<String>,
    #[serde(default)]
    pub max_version: Option<String>,
    #[serde(default)]
    pub target_application: Vec<TargetApplication>,
}

/// A record from the legacy blocklist collection
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRecord {
    pub id: String,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub version_range: Vec<LegacyVersionRange>,
}

/// How a legacy record maps onto the corpus
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    MissingGuid,
    NotFirefox { target: String },
    NoMatch,
    Blocks(Vec<BlockRecord>),
    RegexBlocks(Vec<BlockRecord>),
}

impl ImportOutcome {
    pub fn records(&self) -> &[BlockRecord] {
        match self {
            ImportOutcome::Blocks(records) | ImportOutcome::RegexBlocks(records) => records,
            _ => &[],
        }
    }
}

/// Resolve a legacy record against the known GUIDs.
///
/// `corpus_guids` should only contain add-ons with eligible versions; GUIDs
/// outside it never produce a block.
pub fn plan_import(record: &LegacyRecord, corpus_guids: &BTreeSet<String>) -> ImportOutcome {
    let Some(guid) = record.guid.as_deref().filter(|g| !g.is_empty()) else {
        warn!(legacy_id = %record.id, "Legacy record has no guid, skipping");
        return ImportOutcome::MissingGuid;
    };

    let range = record.version_range.first().cloned().unwrap_or_default();
    if let Some(target) = range
        .target_application
        .first()
        .and_then(|t| t.guid.as_deref())
        .filter(|t| *t != FIREFOX_GUID)
    {
        warn!(legacy_id = %record.id, target = %target, "Legacy record targets another application, skipping");
        return ImportOutcome::NotFirefox {
            target: target.to_string(),
        };
    }
    let min_version = range.min_version.unwrap_or_else(|| MIN_VERSION_ANY.to_string());
    let max_version = range.max_version.unwrap_or_else(|| MAX_VERSION_ANY.to_string());

    let (matched, origin): (Vec<&String>, BlockOrigin) = match regex_body(guid) {
        Some(body) => {
            let pattern = escape_braces(body);
            let matched = match split_regex_to_list(&pattern) {
                Some(ids) => {
                    debug!(legacy_id = %record.id, count = ids.len(), "Decomposed regex into guid list");
                    ids.iter().filter_map(|id| corpus_guids.get(id)).collect()
                }
                None => match Regex::new(&pattern) {
                    Ok(re) => {
                        debug!(legacy_id = %record.id, pattern = %pattern, "Matching undecomposable regex against corpus");
                        corpus_guids.iter().filter(|g| re.is_match(g)).collect()
                    }
                    Err(e) => {
                        warn!(legacy_id = %record.id, error = %e, "Legacy regex does not compile");
                        Vec::new()
                    }
                },
            };
            let origin = BlockOrigin::RegexDerived {
                source_id: record.id.clone(),
            };
            (matched, origin)
        }
        None => {
            let matched = corpus_guids.get(guid).into_iter().collect();
            let origin = BlockOrigin::Explicit {
                source_id: Some(record.id.clone()),
            };
            (matched, origin)
        }
    };

    if matched.is_empty() {
        debug!(legacy_id = %record.id, "No add-on matched legacy record");
        return ImportOutcome::NoMatch;
    }

    let records = matched
        .into_iter()
        .map(|g| {
            BlockRecord::new(g.as_str())
                .with_range(min_version.as_str(), max_version.as_str())
                .with_origin(origin.clone())
        })
        .collect();
    if origin.is_regex_derived() {
        ImportOutcome::RegexBlocks(records)
    } else {
        ImportOutcome::Blocks(records)
    }
}

/// `/body/` → `body`
fn regex_body(guid: &str) -> Option<&str> {
    guid.strip_prefix('/')?.strip_suffix('/')
}

/// Effect of applying one import to the registry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub conflicts: Vec<BlockConflict>,
    /// Records from an earlier run of the same import that no longer match
    pub removed: Vec<String>,
}

/// Write an import into the registry and drop stale records from its
/// previous run.
pub fn apply_import(registry: &mut BlockRegistry, source_id: &str, outcome: &ImportOutcome) -> ImportReport {
    let mut report = ImportReport::default();
    let keep: BTreeSet<&str> = outcome.records().iter().map(|r| r.guid.as_str()).collect();

    let stale: Vec<String> = registry
        .iter()
        .filter(|r| r.origin.source_id() == Some(source_id) && !keep.contains(r.guid.as_str()))
        .map(|r| r.guid.clone())
        .collect();
    for guid in stale {
        registry.remove(&guid);
        report.removed.push(guid);
    }

    for record in outcome.records() {
        let guid = record.guid.clone();
        match registry.upsert(record.clone()) {
            Ok(UpsertOutcome::Created) => report.created.push(guid),
            Ok(UpsertOutcome::Updated) => report.updated.push(guid),
            Err(conflict) => {
                warn!(guid = %conflict.guid, existing = %conflict.existing_source, "Import would overwrite regex-derived block");
                report.conflicts.push(conflict);
            }
        }
    }
    report
}

/// Effect of importing a whole legacy file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegacyImportSummary {
    /// Per legacy id, in file order
    pub records: Vec<(String, ImportReport)>,
    /// GUIDs deleted because their legacy id left the file
    pub retired: BTreeMap<String, Vec<String>>,
}

impl LegacyImportSummary {
    pub fn conflict_count(&self) -> usize {
        self.records.iter().map(|(_, r)| r.conflicts.len()).sum()
    }

    pub fn retired_count(&self) -> usize {
        self.retired.values().map(Vec::len).sum()
    }
}

/// Import every record of a legacy file, then delete blocks of legacy ids
/// that are no longer in it.
pub fn import_legacy_file(
    registry: &mut BlockRegistry,
    legacy: &[LegacyRecord],
    corpus_guids: &BTreeSet<String>,
) -> LegacyImportSummary {
    let mut summary = LegacyImportSummary::default();
    for record in legacy {
        let outcome = plan_import(record, corpus_guids);
        let report = apply_import(registry, &record.id, &outcome);
        debug!(
            legacy_id = %record.id,
            created = report.created.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            conflicts = report.conflicts.len(),
            "Applied legacy record"
        );
        summary.records.push((record.id.clone(), report));
    }

    let present: BTreeSet<&str> = legacy.iter().map(|r| r.id.as_str()).collect();
    summary.retired = retire_missing_imports(registry, &present);
    summary
}

/// Delete every imported record whose legacy id is not in `present_ids`
pub fn retire_missing_imports(
    registry: &mut BlockRegistry,
    present_ids: &BTreeSet<&str>,
) -> BTreeMap<String, Vec<String>> {
    let gone: BTreeSet<String> = registry
        .iter()
        .filter_map(|r| r.origin.source_id())
        .filter(|id| !present_ids.contains(id))
        .map(str::to_owned)
        .collect();
    gone.into_iter()
        .map(|id| {
            let guids: Vec<String> = registry.remove_by_source(&id).into_iter().map(|r| r.guid).collect();
            debug!(legacy_id = %id, removed = guids.len(), "Deleted blocks of retired legacy record");
            (id, guids)
        })
        .collect()
}
