//! Inbound Ports (Driving Ports)
//!
//! The synchronous blocklist API. Every operation here is a pure function
//! of its arguments plus the service configuration.

use crate::domain::{
    BlockRecord, BuildStats, ChainHead, GenerationState, Mlbf, MlbfEntrySet, Publication,
    SnapshotReport, Stash, StashMetrics, VersionCorpus,
};
use crate::error::{FilterError, StashError};

/// Primary blocklist API (Driving Port)
pub trait MlbfApi: Send + Sync {
    /// Decompose a `^((id1)|(id2))$` pattern into its literal GUIDs.
    ///
    /// `None` means the pattern must be matched as a regex.
    fn decompose_guid_regex(&self, pattern: &str) -> Option<Vec<String>>;

    /// Build the snapshot for `generation_time` from block records and the
    /// resolved version corpus.
    fn build_snapshot(
        &self,
        generation_time: u64,
        records: &[BlockRecord],
        corpus: &VersionCorpus,
    ) -> (MlbfEntrySet, SnapshotReport);

    /// Build the two-layer filter for a snapshot
    fn build_filter(&self, snapshot: &MlbfEntrySet) -> Result<(Mlbf, BuildStats), FilterError>;

    /// Diff two snapshots on top of the published chain head
    fn compute_stash(
        &self,
        old: &MlbfEntrySet,
        new: &MlbfEntrySet,
        head: &ChainHead,
    ) -> Result<Stash, StashError>;

    /// Decide what to publish given chain state and change metrics
    fn plan_publication(
        &self,
        state: &GenerationState,
        generation_time: u64,
        metrics: Option<&StashMetrics>,
    ) -> Publication;
}
