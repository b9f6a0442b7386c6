//! Error types for the MLBF blocklist subsystem

use thiserror::Error;

/// Errors raised while sizing, building or decoding bloom filter artifacts
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid false positive rate: {rate} (must be strictly between 0 and 1)")]
    InvalidErrorRate { rate: f64 },

    #[error("{layer} layer exceeds maximum size: {size} > {max} bits")]
    FilterTooLarge {
        layer: &'static str,
        size: usize,
        max: usize,
    },

    #[error(
        "Exclusion layer for generation {generation_time} still matches a blocked entry after {attempts} salts"
    )]
    ExclusionUnresolved { generation_time: u64, attempts: u32 },

    #[error("Key format mismatch: expected {expected:?}, found {found:?}")]
    KeyFormatMismatch { expected: String, found: String },

    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Errors raised when a stash cannot be computed or applied safely
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StashError {
    #[error("Snapshots come from different version sources: old={old:?}, new={new:?}")]
    SourceMismatch { old: String, new: String },

    #[error("Old snapshot {found} is not the published chain head {expected:?}")]
    BaseMismatch { expected: Option<u64>, found: u64 },

    #[error("Generation time must increase: old={old}, new={new}")]
    NonMonotonicGeneration { old: u64, new: u64 },

    #[error("Stash expects parent generation {expected}, local state is at {found}")]
    ParentMismatch { expected: u64, found: u64 },
}

/// Errors from outbound collaborators (block store, version resolver, publisher)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Versions not found for guid: {guid}")]
    NotFound { guid: String },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl DataError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::ConnectionError(_) | DataError::Timeout)
    }
}

/// A write that would silently replace a regex-derived block record
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Block for {guid} was derived from regex import {existing_source:?}; refusing overwrite from {incoming_source:?}")]
pub struct BlockConflict {
    pub guid: String,
    pub existing_source: String,
    pub incoming_source: Option<String>,
}

/// Errors raised while a client maintains its local chain
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Stash(#[from] StashError),
}

/// Errors surfaced by one generation cycle to the orchestrator
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Generation {requested} is not newer than last published generation {last}")]
    StaleGeneration { requested: u64, last: u64 },

    #[error("Data provider error: {0}")]
    Data(#[from] DataError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Stash error: {0}")]
    Stash(#[from] StashError),

    #[error("Publish failed for generation {generation_time}: {source}")]
    Publish {
        generation_time: u64,
        #[source]
        source: DataError,
    },

    #[error("Generation {generation_time} is published but its state could not be saved: {source}")]
    StatePersist {
        generation_time: u64,
        #[source]
        source: DataError,
    },
}

impl ServiceError {
    /// Transient collaborator failures are retryable; builds are pure, so a
    /// retry with the same snapshot is idempotent. A state save is always
    /// retried before the next cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Data(e) => e.is_retryable(),
            ServiceError::Publish { source, .. } => source.is_retryable(),
            ServiceError::StatePersist { .. } => true,
            _ => false,
        }
    }
}
