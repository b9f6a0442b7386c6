//! MLBF Generation Service
//!
//! Runs one generation cycle: read block records, resolve versions, build
//! the snapshot, decide base vs stash, publish, and advance the chain state.
//!
//! The caller owns `GenerationState` and must serialise cycles; the service
//! only mutates the state it is handed after a publish succeeded.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    split_regex_to_list, Artifact, BaseArtifact, BlockRecord, BuildStats, ChainHead, GenerationState,
    Mlbf, MlbfConfig, MlbfEntrySet, Publication, SchedulerPolicy, SnapshotReport, Stash, StashMetrics,
    StashRecord, VersionCorpus,
};
use crate::error::{DataError, FilterError, ServiceError, StashError};
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{ArtifactPublisher, BlockStore, MlbfApi, SnapshotStore, VersionResolver};

/// Remote collection that base filters and stashes are published to
pub const DEFAULT_COLLECTION: &str = "addons-bloomfilters";

/// Result of one generation cycle
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    pub cycle_id: Uuid,
    pub generation_time: u64,
    pub publication: Publication,
    pub blocked_count: usize,
    pub not_blocked_count: usize,
    pub report: SnapshotReport,
    /// Present when a base filter was built
    pub build_stats: Option<BuildStats>,
    /// Present when a stash was published
    pub stash: Option<Stash>,
}

/// Generation service implementation
///
/// Implements the `MlbfApi` port and drives the outbound ports.
pub struct MlbfGenerationService<S, R, P, N>
where
    S: BlockStore,
    R: VersionResolver,
    P: ArtifactPublisher,
    N: SnapshotStore,
{
    blocks: Arc<S>,
    resolver: Arc<R>,
    publisher: Arc<P>,
    snapshots: Arc<N>,
    config: MlbfConfig,
    policy: SchedulerPolicy,
    collection: String,
    metrics: Arc<dyn MetricsRecorder>,
}

impl<S, R, P, N> MlbfGenerationService<S, R, P, N>
where
    S: BlockStore,
    R: VersionResolver,
    P: ArtifactPublisher,
    N: SnapshotStore,
{
    pub fn new(blocks: Arc<S>, resolver: Arc<R>, publisher: Arc<P>, snapshots: Arc<N>) -> Self {
        Self {
            blocks,
            resolver,
            publisher,
            snapshots,
            config: MlbfConfig::default(),
            policy: SchedulerPolicy::default(),
            collection: DEFAULT_COLLECTION.to_string(),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    pub fn with_config(mut self, config: MlbfConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: SchedulerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &MlbfConfig {
        &self.config
    }

    /// Run one cycle for `generation_time`.
    ///
    /// `state` is left untouched unless an artifact was published.
    pub async fn run_cycle(
        &self,
        state: &mut GenerationState,
        generation_time: u64,
    ) -> Result<CycleOutcome, ServiceError> {
        if let Some(last) = state.last_generation_time {
            if generation_time <= last {
                return Err(ServiceError::StaleGeneration {
                    requested: generation_time,
                    last,
                });
            }
        }

        let cycle_id = Uuid::new_v4();
        info!(cycle_id = %cycle_id, generation_time, "Starting generation cycle");

        let result = self.execute_cycle(cycle_id, state, generation_time).await;
        match &result {
            Ok(outcome) => info!(
                cycle_id = %cycle_id,
                generation_time,
                publication = ?outcome.publication,
                blocked = outcome.blocked_count,
                skipped_guids = outcome.report.skipped.len(),
                "Generation cycle finished"
            ),
            Err(e) => {
                self.metrics.record_cycle_failed();
                warn!(
                    cycle_id = %cycle_id,
                    generation_time,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Generation cycle failed"
                );
            }
        }
        result
    }

    async fn execute_cycle(
        &self,
        cycle_id: Uuid,
        state: &mut GenerationState,
        generation_time: u64,
    ) -> Result<CycleOutcome, ServiceError> {
        let records = self.blocks.published_records().await?;
        let corpus = self.resolve_corpus(&records).await?;
        debug!(
            cycle_id = %cycle_id,
            records = records.len(),
            guids = corpus.len(),
            source_id = %corpus.source_id(),
            "Resolved version corpus"
        );

        let (snapshot, report) = self.build_snapshot(generation_time, &records, &corpus);
        if !report.skipped.is_empty() {
            self.metrics.record_guids_skipped(report.skipped.len());
        }

        let previous = self.previous_snapshot(state, &snapshot).await?;
        let change = previous.as_ref().map(|old| Stash::metrics(old, &snapshot));
        let publication = self.plan_publication(state, generation_time, change.as_ref());

        let mut outcome = CycleOutcome {
            cycle_id,
            generation_time,
            publication,
            blocked_count: snapshot.blocked().len(),
            not_blocked_count: snapshot.not_blocked().len(),
            report,
            build_stats: None,
            stash: None,
        };

        match publication {
            Publication::NoChange => {
                self.metrics.record_cycle_skipped();
                info!(cycle_id = %cycle_id, generation_time, "No blocklist changes, nothing to publish");
            }
            Publication::Base => {
                let started = Instant::now();
                let (mlbf, stats) = self.build_filter(&snapshot)?;
                let artifact = Artifact::Base(BaseArtifact::from_filter(&mlbf)?);
                let elapsed = started.elapsed();

                self.snapshots.save(&snapshot).await?;
                self.publish_base(&artifact, generation_time).await?;
                state.record_base(generation_time);

                self.metrics
                    .record_base_built(stats.blocked_count, stats.blocked_bits + stats.exclusion_bits, elapsed);
                info!(
                    cycle_id = %cycle_id,
                    generation_time,
                    blocked = stats.blocked_count,
                    layer1_false_positives = stats.layer1_false_positives,
                    exclusion_attempts = stats.exclusion_attempts,
                    build_ms = elapsed.as_millis() as u64,
                    "Published base filter"
                );
                outcome.build_stats = Some(stats);
            }
            Publication::Stash => {
                let Some(old) = previous.as_ref() else {
                    return Err(StashError::BaseMismatch {
                        expected: state.last_generation_time,
                        found: generation_time,
                    }
                    .into());
                };
                let stash = self.compute_stash(old, &snapshot, &state.chain_head())?;
                let artifact = Artifact::Stash(StashRecord::from_stash(&stash));

                self.snapshots.save(&snapshot).await?;
                self.publisher
                    .publish(&artifact, &self.collection)
                    .await
                    .map_err(|source| ServiceError::Publish {
                        generation_time,
                        source,
                    })?;
                state.record_stash(generation_time);

                self.metrics.record_stash_published(outcome.blocked_count);
                info!(
                    cycle_id = %cycle_id,
                    generation_time,
                    parent_time = stash.parent_time,
                    added = stash.added.len(),
                    removed = stash.removed.len(),
                    chain_length = state.stash_count,
                    "Published stash"
                );
                outcome.stash = Some(stash);
            }
        }
        Ok(outcome)
    }

    /// Resolve versions for every known GUID plus every blocked GUID.
    ///
    /// A failure listing the corpus aborts the cycle; a failure for one GUID
    /// is recorded in the corpus and reported by the snapshot build.
    async fn resolve_corpus(&self, records: &[BlockRecord]) -> Result<VersionCorpus, ServiceError> {
        let mut guids = self.resolver.known_guids().await?;
        let known = guids.len();
        guids.extend(records.iter().map(|r| r.guid.clone()));

        let mut corpus = VersionCorpus::new(self.resolver.source_id());
        for guid in guids {
            match self.resolver.versions_for(&guid).await {
                Ok(versions) => corpus.insert(guid, Ok(versions)),
                Err(DataError::NotFound { .. }) => {
                    // Unknown add-on: the snapshot reports it, it has no entries.
                }
                Err(e) => corpus.insert(guid, Err(e)),
            }
        }
        debug!(known, resolved = corpus.len(), "Version corpus resolved");
        Ok(corpus)
    }

    /// The snapshot at the chain head, if it can be diffed against `current`
    async fn previous_snapshot(
        &self,
        state: &GenerationState,
        current: &MlbfEntrySet,
    ) -> Result<Option<MlbfEntrySet>, ServiceError> {
        let Some(last) = state.last_generation_time else {
            return Ok(None);
        };
        let Some(previous) = self.snapshots.load(last).await? else {
            warn!(last_generation_time = last, "Chain head snapshot missing, forcing base rebuild");
            return Ok(None);
        };
        if previous.source_id() != current.source_id() {
            warn!(
                previous_source = %previous.source_id(),
                current_source = %current.source_id(),
                "Version source changed, forcing base rebuild"
            );
            return Ok(None);
        }
        Ok(Some(previous))
    }

    async fn publish_base(&self, artifact: &Artifact, generation_time: u64) -> Result<(), ServiceError> {
        let publish_err = |source| ServiceError::Publish {
            generation_time,
            source,
        };
        self.publisher.delete_all(&self.collection).await.map_err(publish_err)?;
        self.publisher
            .publish(artifact, &self.collection)
            .await
            .map_err(publish_err)
    }
}

impl<S, R, P, N> MlbfApi for MlbfGenerationService<S, R, P, N>
where
    S: BlockStore,
    R: VersionResolver,
    P: ArtifactPublisher,
    N: SnapshotStore,
{
    fn decompose_guid_regex(&self, pattern: &str) -> Option<Vec<String>> {
        split_regex_to_list(pattern)
    }

    fn build_snapshot(
        &self,
        generation_time: u64,
        records: &[BlockRecord],
        corpus: &VersionCorpus,
    ) -> (MlbfEntrySet, SnapshotReport) {
        MlbfEntrySet::build(generation_time, records, corpus, self.config.memo_capacity)
    }

    fn build_filter(&self, snapshot: &MlbfEntrySet) -> Result<(Mlbf, BuildStats), FilterError> {
        Mlbf::build(snapshot, &self.config)
    }

    fn compute_stash(&self, old: &MlbfEntrySet, new: &MlbfEntrySet, head: &ChainHead) -> Result<Stash, StashError> {
        Stash::compute(old, new, head)
    }

    fn plan_publication(
        &self,
        state: &GenerationState,
        generation_time: u64,
        metrics: Option<&StashMetrics>,
    ) -> Publication {
        self.policy.decide(state, generation_time, metrics)
    }
}
