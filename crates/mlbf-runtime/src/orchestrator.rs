//! Generation orchestrator
//!
//! Owns the process-wide `GenerationState`. Cycles take the state lock for
//! their whole duration, so at most one cycle runs at a time. Once an
//! artifact is live its state is kept in memory even if the state file
//! cannot be written; the write is then retried before the next cycle runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use mlbf_blocklist::adapters::{write_json, DirectoryPublisher, JsonBlockFile, JsonSnapshotStore, JsonVersionFile};
use mlbf_blocklist::domain::LegacyImportSummary;
use mlbf_blocklist::{
    ArtifactPublisher, BlockStore, CycleOutcome, GenerationState, Metrics, MlbfGenerationService, ServiceError,
    SnapshotStore, VersionResolver,
};
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::config::RuntimeConfig;

/// Service wired to the JSON file adapters
pub type FileService = MlbfGenerationService<JsonBlockFile, JsonVersionFile, DirectoryPublisher, JsonSnapshotStore>;

struct HeldState {
    state: GenerationState,
    /// In-memory state is ahead of the state file
    unsaved: bool,
}

pub struct Orchestrator<S, R, P, N>
where
    S: BlockStore,
    R: VersionResolver,
    P: ArtifactPublisher,
    N: SnapshotStore,
{
    service: MlbfGenerationService<S, R, P, N>,
    held: Mutex<HeldState>,
    state_path: PathBuf,
}

impl<S, R, P, N> Orchestrator<S, R, P, N>
where
    S: BlockStore,
    R: VersionResolver,
    P: ArtifactPublisher,
    N: SnapshotStore,
{
    /// Create an orchestrator, restoring chain state from `state_path`
    pub async fn new(service: MlbfGenerationService<S, R, P, N>, state_path: impl Into<PathBuf>) -> Result<Self> {
        let state_path = state_path.into();
        let state = load_state(&state_path).await?;
        info!(
            last_generation_time = ?state.last_generation_time,
            base_generation_time = ?state.base_generation_time,
            stash_count = state.stash_count,
            "Restored generation state"
        );
        Ok(Self {
            service,
            held: Mutex::new(HeldState { state, unsaved: false }),
            state_path,
        })
    }

    pub async fn state(&self) -> GenerationState {
        self.held.lock().await.state.clone()
    }

    /// Run one cycle stamped with `now_ms`.
    ///
    /// The generation time is bumped past the last published one when the
    /// clock has not moved forward. No cycle runs while the state file lags
    /// behind what has been published.
    pub async fn run_once(&self, now_ms: u64) -> Result<CycleOutcome, ServiceError> {
        let mut held = self.held.lock().await;
        if held.unsaved {
            self.persist(&mut held).await?;
        }

        let generation_time = match held.state.last_generation_time {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        };
        let mut working = held.state.clone();
        let outcome = self.service.run_cycle(&mut working, generation_time).await?;
        if working != held.state {
            held.state = working;
            held.unsaved = true;
            self.persist(&mut held).await?;
        }
        Ok(outcome)
    }

    async fn persist(&self, held: &mut HeldState) -> Result<(), ServiceError> {
        let generation_time = held.state.last_generation_time.unwrap_or_default();
        match write_json(&self.state_path, &held.state).await {
            Ok(()) => {
                held.unsaved = false;
                Ok(())
            }
            Err(source) => {
                error!(
                    generation_time,
                    path = %self.state_path.display(),
                    error = %source,
                    "Published generation is not yet recorded in the state file"
                );
                Err(ServiceError::StatePersist {
                    generation_time,
                    source,
                })
            }
        }
    }

    /// Run cycles every `interval` until `shutdown` flips to true
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once(now_millis()).await {
                        Ok(_) => {}
                        Err(e) if e.is_retryable() => {
                            warn!(error = %e, "Cycle failed, will retry next interval");
                        }
                        Err(e) => {
                            error!(error = %e, "Cycle failed");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Generation loop stopping");
                        break;
                    }
                }
            }
        }
    }
}

/// Build the file-backed orchestrator described by `config`
pub async fn from_config(config: &RuntimeConfig, metrics: Arc<Metrics>) -> Result<Orchestrator<JsonBlockFile, JsonVersionFile, DirectoryPublisher, JsonSnapshotStore>> {
    let service: FileService = MlbfGenerationService::new(
        Arc::new(JsonBlockFile::new(&config.paths.blocks)),
        Arc::new(JsonVersionFile::new(&config.paths.versions, config.source_id.clone())),
        Arc::new(DirectoryPublisher::new(&config.paths.output)),
        Arc::new(JsonSnapshotStore::new(&config.paths.snapshots)),
    )
    .with_config(config.filter.clone())
    .with_policy(config.policy.clone())
    .with_collection(config.collection.clone())
    .with_metrics(metrics);
    Orchestrator::new(service, &config.paths.state).await
}

/// Import the configured legacy blocklist into the block file
pub async fn import_legacy(config: &RuntimeConfig) -> Result<LegacyImportSummary> {
    let Some(legacy) = config.paths.legacy.as_deref() else {
        return Ok(LegacyImportSummary::default());
    };
    let resolver = JsonVersionFile::new(&config.paths.versions, config.source_id.clone());
    let corpus = resolver
        .known_guids()
        .await
        .context("listing add-ons for legacy import")?;
    let summary = JsonBlockFile::new(&config.paths.blocks)
        .import_legacy(legacy, &corpus)
        .await
        .with_context(|| format!("importing {}", legacy.display()))?;

    let conflicts = summary.conflict_count();
    if conflicts > 0 {
        warn!(conflicts, "Legacy import left regex-derived records untouched");
    }
    for (legacy_id, guids) in &summary.retired {
        info!(legacy_id = %legacy_id, blocks = guids.len(), "Deleted blocks of removed legacy record");
    }
    info!(
        records = summary.records.len(),
        retired_blocks = summary.retired_count(),
        "Legacy import finished"
    );
    Ok(summary)
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

async fn load_state(path: &Path) -> Result<GenerationState> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).with_context(|| format!("parsing state file {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GenerationState::default()),
        Err(e) => Err(e).with_context(|| format!("reading state file {}", path.display())),
    }
}
