//! Client-side view of a published chain
//!
//! A client holds one base filter plus the stashes published on top of it.
//! Stashes are consulted newest first; a key they do not mention falls
//! through to the base filter.

use std::collections::BTreeSet;

use super::artifact::StashRecord;
use super::entries::{format_key, KEY_FORMAT};
use super::mlbf::Mlbf;
use crate::error::{ClientError, FilterError, StashError};

/// Stash contents as the client keeps them
#[derive(Clone, Debug, PartialEq, Eq)]
struct AppliedStash {
    stash_time: u64,
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
}

#[derive(Clone, Debug)]
pub struct ClientBlocklist {
    base: Mlbf,
    stashes: Vec<AppliedStash>,
}

impl ClientBlocklist {
    pub fn new(base: Mlbf) -> Self {
        Self {
            base,
            stashes: Vec::new(),
        }
    }

    /// Generation of the newest artifact applied
    pub fn head_time(&self) -> u64 {
        self.stashes
            .last()
            .map_or_else(|| self.base.generation_time(), |s| s.stash_time)
    }

    pub fn base_time(&self) -> u64 {
        self.base.generation_time()
    }

    pub fn stash_count(&self) -> usize {
        self.stashes.len()
    }

    /// Apply the next stash in the chain.
    ///
    /// `parent_time` is the generation the publisher diffed against; it must
    /// equal the current head or the stash is rejected without side effects.
    pub fn apply_stash(&mut self, parent_time: u64, record: &StashRecord) -> Result<(), ClientError> {
        if record.key_format != KEY_FORMAT {
            return Err(FilterError::KeyFormatMismatch {
                expected: KEY_FORMAT.to_string(),
                found: record.key_format.clone(),
            }
            .into());
        }
        let head = self.head_time();
        if parent_time != head {
            return Err(StashError::ParentMismatch {
                expected: parent_time,
                found: head,
            }
            .into());
        }
        if record.stash_time <= head {
            return Err(StashError::NonMonotonicGeneration {
                old: head,
                new: record.stash_time,
            }
            .into());
        }
        self.stashes.push(AppliedStash {
            stash_time: record.stash_time,
            added: record.stash.added.iter().cloned().collect(),
            removed: record.stash.removed.iter().cloned().collect(),
        });
        Ok(())
    }

    /// Replace the chain with a fresh base
    pub fn reset(&mut self, base: Mlbf) {
        self.base = base;
        self.stashes.clear();
    }

    pub fn is_blocked(&self, guid: &str, version: &str) -> bool {
        let key = format_key(guid, version);
        for stash in self.stashes.iter().rev() {
            if stash.added.contains(&key) {
                return true;
            }
            if stash.removed.contains(&key) {
                return false;
            }
        }
        self.base.contains_key(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::StashBody;
    use crate::domain::config::MlbfConfig;
    use crate::domain::entries::{MlbfEntry, MlbfEntrySet};
    use crate::domain::stash::{ChainHead, Stash};

    fn snapshot(time: u64, blocked: &[&str], not_blocked: &[&str]) -> MlbfEntrySet {
        MlbfEntrySet::from_parts(
            time,
            "amo",
            blocked.iter().map(|g| MlbfEntry::new(*g, "1.0")),
            not_blocked.iter().map(|g| MlbfEntry::new(*g, "1.0")),
        )
    }

    fn client_at(set: &MlbfEntrySet) -> ClientBlocklist {
        let (mlbf, _) = Mlbf::build(set, &MlbfConfig::default()).unwrap();
        ClientBlocklist::new(mlbf)
    }

    fn stash_record(time: u64, added: &[&str], removed: &[&str]) -> StashRecord {
        StashRecord {
            key_format: KEY_FORMAT.to_string(),
            stash_time: time,
            stash: StashBody {
                added: added.iter().map(|g| format_key(g, "1.0")).collect(),
                removed: removed.iter().map(|g| format_key(g, "1.0")).collect(),
            },
        }
    }

    #[test]
    fn test_stash_overrides_base() {
        let base = snapshot(10, &["A", "B"], &["C"]);
        let next = snapshot(20, &["B", "C"], &["A"]);
        let mut client = client_at(&base);

        let head = ChainHead {
            base_generation_time: Some(10),
            last_generation_time: Some(10),
        };
        let stash = Stash::compute(&base, &next, &head).unwrap();
        client.apply_stash(stash.parent_time, &StashRecord::from_stash(&stash)).unwrap();

        assert!(!client.is_blocked("A", "1.0"));
        assert!(client.is_blocked("B", "1.0"));
        assert!(client.is_blocked("C", "1.0"));
        assert_eq!(client.head_time(), 20);
    }

    #[test]
    fn test_newest_stash_wins() {
        let mut client = client_at(&snapshot(10, &["A"], &["B"]));
        client.apply_stash(10, &stash_record(20, &["B"], &[])).unwrap();
        client.apply_stash(20, &stash_record(30, &[], &["B"])).unwrap();
        assert!(!client.is_blocked("B", "1.0"));
        assert!(client.is_blocked("A", "1.0"));
        assert_eq!(client.stash_count(), 2);
    }

    #[test]
    fn test_rejects_parent_mismatch() {
        let mut client = client_at(&snapshot(10, &["A"], &[]));
        let err = client.apply_stash(5, &stash_record(20, &["B"], &[])).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Stash(StashError::ParentMismatch {
                expected: 5,
                found: 10
            })
        ));
        assert_eq!(client.head_time(), 10);
        assert_eq!(client.stash_count(), 0);
    }

    #[test]
    fn test_rejects_foreign_key_format() {
        let mut client = client_at(&snapshot(10, &["A"], &[]));
        let mut record = stash_record(20, &["B"], &[]);
        record.key_format = "{guid}".to_string();
        assert!(matches!(
            client.apply_stash(10, &record),
            Err(ClientError::Filter(FilterError::KeyFormatMismatch { .. }))
        ));
    }

    #[test]
    fn test_reset_drops_stashes() {
        let mut client = client_at(&snapshot(10, &["A"], &[]));
        client.apply_stash(10, &stash_record(20, &["B"], &[])).unwrap();

        let (fresh, _) = Mlbf::build(&snapshot(30, &["C"], &["A", "B"]), &MlbfConfig::default()).unwrap();
        client.reset(fresh);
        assert_eq!(client.head_time(), 30);
        assert!(client.is_blocked("C", "1.0"));
        assert!(!client.is_blocked("B", "1.0"));
    }
}
