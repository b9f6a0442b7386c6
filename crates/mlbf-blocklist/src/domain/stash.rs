//! Incremental stashes between generations
//!
//! A stash lists the keys that became blocked (`added`) and the keys that
//! stopped being blocked (`removed`) since the previous published generation.
//! It is only meaningful on top of that exact generation.
//!
//! INVARIANTS:
//! - added ∩ removed = ∅
//! - (old.blocked ∪ added) − removed == new.blocked

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::entries::MlbfEntrySet;
use crate::error::StashError;

/// Published chain position the stash must extend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    /// Generation of the most recent base filter
    pub base_generation_time: Option<u64>,
    /// Generation of the most recent artifact (base or stash)
    pub last_generation_time: Option<u64>,
}

/// Added/removed key delta between two snapshots
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    /// Generation this stash applies on top of
    pub parent_time: u64,
    pub stash_time: u64,
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

/// Size metrics for the base-vs-stash decision
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StashMetrics {
    pub added: usize,
    pub removed: usize,
    pub old_blocked: usize,
}

impl StashMetrics {
    pub fn change_count(&self) -> usize {
        self.added + self.removed
    }

    /// Changes relative to the old blocked set. An empty old set with any
    /// change counts as unbounded.
    pub fn change_ratio(&self) -> f64 {
        match (self.change_count(), self.old_blocked) {
            (0, _) => 0.0,
            (_, 0) => f64::INFINITY,
            (changes, old) => changes as f64 / old as f64,
        }
    }
}

impl Stash {
    /// Diff `old` → `new`.
    ///
    /// `old` must be the published chain head and both snapshots must come
    /// from the same version source; otherwise applying the stash would
    /// silently corrupt client state.
    pub fn compute(old: &MlbfEntrySet, new: &MlbfEntrySet, head: &ChainHead) -> Result<Self, StashError> {
        if old.source_id() != new.source_id() {
            return Err(StashError::SourceMismatch {
                old: old.source_id().to_string(),
                new: new.source_id().to_string(),
            });
        }
        if head.base_generation_time.is_none() || head.last_generation_time != Some(old.generation_time()) {
            return Err(StashError::BaseMismatch {
                expected: head.last_generation_time,
                found: old.generation_time(),
            });
        }
        if new.generation_time() <= old.generation_time() {
            return Err(StashError::NonMonotonicGeneration {
                old: old.generation_time(),
                new: new.generation_time(),
            });
        }

        let old_keys = old.blocked_keys();
        let new_keys = new.blocked_keys();
        Ok(Self {
            parent_time: old.generation_time(),
            stash_time: new.generation_time(),
            added: new_keys.difference(&old_keys).cloned().collect(),
            removed: old_keys.difference(&new_keys).cloned().collect(),
        })
    }

    /// Size metrics without materialising the key lists
    pub fn metrics(old: &MlbfEntrySet, new: &MlbfEntrySet) -> StashMetrics {
        StashMetrics {
            added: new.blocked().difference(old.blocked()).count(),
            removed: old.blocked().difference(new.blocked()).count(),
            old_blocked: old.blocked().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Apply to a blocked key set that is at `current_time`
    pub fn apply(&self, blocked: &mut BTreeSet<String>, current_time: u64) -> Result<(), StashError> {
        if current_time != self.parent_time {
            return Err(StashError::ParentMismatch {
                expected: self.parent_time,
                found: current_time,
            });
        }
        for key in &self.removed {
            blocked.remove(key);
        }
        blocked.extend(self.added.iter().cloned());
        Ok(())
    }
}
