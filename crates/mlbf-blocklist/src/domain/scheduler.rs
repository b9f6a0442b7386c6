//! Base-vs-stash publication policy
//!
//! The core only measures; this policy is what the orchestrator consults.
//! It reads the chain state it is given and never any global.

use serde::{Deserialize, Serialize};

use super::stash::{ChainHead, StashMetrics};

/// Process-wide generation state owned by the orchestrator
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationState {
    /// Generation of the most recently published artifact
    pub last_generation_time: Option<u64>,
    /// Generation of the most recently published base filter
    pub base_generation_time: Option<u64>,
    /// Stashes published on top of the current base
    pub stash_count: usize,
}

impl GenerationState {
    pub fn chain_head(&self) -> ChainHead {
        ChainHead {
            base_generation_time: self.base_generation_time,
            last_generation_time: self.last_generation_time,
        }
    }

    pub fn record_base(&mut self, generation_time: u64) {
        self.last_generation_time = Some(generation_time);
        self.base_generation_time = Some(generation_time);
        self.stash_count = 0;
    }

    pub fn record_stash(&mut self, generation_time: u64) {
        self.last_generation_time = Some(generation_time);
        self.stash_count += 1;
    }
}

/// Thresholds for abandoning a stash chain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulerPolicy {
    /// Rebuild when changes exceed this fraction of the old blocked set
    pub rebuild_change_ratio: f64,
    /// Rebuild once this many stashes sit on the current base
    pub max_stash_chain: usize,
    /// Rebuild once the current base is this old, in milliseconds
    pub max_base_age_ms: u64,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            rebuild_change_ratio: 0.1,
            max_stash_chain: 50,
            max_base_age_ms: 7 * 24 * 60 * 60 * 1000,
        }
    }
}

/// What to publish this cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Publication {
    Base,
    Stash,
    NoChange,
}

impl SchedulerPolicy {
    /// Decide for a cycle stamped `generation_time`.
    ///
    /// `metrics` is `None` when there is no previous snapshot to diff against.
    /// An aged base is only replaced when there is a change to publish.
    pub fn decide(
        &self,
        state: &GenerationState,
        generation_time: u64,
        metrics: Option<&StashMetrics>,
    ) -> Publication {
        let Some(metrics) = metrics else {
            return Publication::Base;
        };
        let Some(base_time) = state.base_generation_time else {
            return Publication::Base;
        };
        if metrics.change_count() == 0 {
            return Publication::NoChange;
        }
        if generation_time.saturating_sub(base_time) >= self.max_base_age_ms {
            return Publication::Base;
        }
        if metrics.change_ratio() > self.rebuild_change_ratio {
            return Publication::Base;
        }
        if state.stash_count >= self.max_stash_chain {
            return Publication::Base;
        }
        Publication::Stash
    }
}
