//! Two-layer bloom filter ("MLBF") over a blocklist snapshot
//!
//! Layer 1 holds every blocked key. Layer 2 holds the not-blocked keys that
//! layer 1 wrongly reports, so a key is blocked iff it is in layer 1 and not
//! in layer 2. Layer 2 is re-salted until no blocked key tests positive
//! against it, which keeps the combined answer free of false negatives for
//! every key in the snapshot.
//!
//! INVARIANTS:
//! - every blocked entry tests positive on layer 1
//! - every blocked entry tests negative on layer 2
//! - identical (snapshot, config) produce byte-identical artifacts

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::bloom_filter::BloomFilter;
use super::config::MlbfConfig;
use super::entries::{format_key, MlbfEntrySet, KEY_FORMAT};
use super::hash_functions::derive_salt;
use super::parameters::{exclusion_rate, layer_params};
use crate::error::FilterError;

/// Binary layout version of the serialized filter
pub const ARTIFACT_FORMAT_VERSION: u8 = 1;

const BLOCKED_LAYER: u8 = 1;
const EXCLUSION_LAYER: u8 = 2;

/// Published filter: blocked layer plus exclusion layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mlbf {
    format_version: u8,
    key_format: String,
    generation_time: u64,
    blocked: BloomFilter,
    exclusions: BloomFilter,
}

/// Measurements taken while building a filter
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildStats {
    pub blocked_count: usize,
    pub not_blocked_count: usize,
    /// Not-blocked keys that layer 1 reported as blocked
    pub layer1_false_positives: usize,
    /// `layer1_false_positives / not_blocked_count`
    pub measured_fpr: f64,
    /// Salts tried before layer 2 excluded no blocked key
    pub exclusion_attempts: u32,
    pub blocked_bits: usize,
    pub exclusion_bits: usize,
}

fn sized_layer(
    layer: &'static str,
    count: usize,
    rate: f64,
    max_bits: usize,
    salt: u32,
) -> Result<BloomFilter, FilterError> {
    let params = layer_params(count, rate);
    if params.size_bits > max_bits {
        return Err(FilterError::FilterTooLarge {
            layer,
            size: params.size_bits,
            max: max_bits,
        });
    }
    Ok(BloomFilter::new(params.size_bits, params.hash_count, salt))
}

impl Mlbf {
    /// Build the filter for `set`.
    ///
    /// Pure: no clock, no global state. Salts derive from `config.seed`.
    pub fn build(set: &MlbfEntrySet, config: &MlbfConfig) -> Result<(Self, BuildStats), FilterError> {
        config.validate()?;

        let generation_time = set.generation_time();
        let blocked_keys: Vec<String> = set.blocked().iter().map(|e| e.key()).collect();
        let not_blocked_keys: Vec<String> = set.not_blocked().iter().map(|e| e.key()).collect();

        let mut blocked = sized_layer(
            "blocked",
            blocked_keys.len(),
            config.target_fpr,
            config.max_filter_bits,
            derive_salt(config.seed, BLOCKED_LAYER, 0),
        )?;
        for key in &blocked_keys {
            blocked.insert(key.as_bytes());
        }

        let false_positives: Vec<&String> = not_blocked_keys
            .iter()
            .filter(|key| blocked.contains(key.as_bytes()))
            .collect();

        let layer2_rate = exclusion_rate(config.target_fpr, blocked_keys.len());

        let mut exclusions = None;
        let mut attempts = 0;
        for attempt in 0..config.max_salt_attempts {
            attempts = attempt + 1;
            let mut layer = sized_layer(
                "exclusion",
                false_positives.len(),
                layer2_rate,
                config.max_filter_bits,
                derive_salt(config.seed, EXCLUSION_LAYER, attempt),
            )?;
            for key in &false_positives {
                layer.insert(key.as_bytes());
            }
            if blocked_keys.iter().any(|key| layer.contains(key.as_bytes())) {
                debug!(
                    generation_time = generation_time,
                    attempt = attempt,
                    "Exclusion layer collides with a blocked key, re-salting"
                );
                continue;
            }
            exclusions = Some(layer);
            break;
        }
        let exclusions = exclusions.ok_or(FilterError::ExclusionUnresolved {
            generation_time,
            attempts,
        })?;

        let measured_fpr = if not_blocked_keys.is_empty() {
            0.0
        } else {
            false_positives.len() as f64 / not_blocked_keys.len() as f64
        };
        if measured_fpr > config.target_fpr {
            warn!(
                generation_time = generation_time,
                measured_fpr = measured_fpr,
                target_fpr = config.target_fpr,
                "Blocked layer exceeded target false positive rate"
            );
        }

        let stats = BuildStats {
            blocked_count: blocked_keys.len(),
            not_blocked_count: not_blocked_keys.len(),
            layer1_false_positives: false_positives.len(),
            measured_fpr,
            exclusion_attempts: attempts,
            blocked_bits: blocked.size_bits(),
            exclusion_bits: exclusions.size_bits(),
        };

        let mlbf = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            key_format: KEY_FORMAT.to_string(),
            generation_time,
            blocked,
            exclusions,
        };
        Ok((mlbf, stats))
    }

    /// Classify an already-encoded key
    pub fn contains_key(&self, key: &str) -> bool {
        self.blocked.contains(key.as_bytes()) && !self.exclusions.contains(key.as_bytes())
    }

    pub fn is_blocked(&self, guid: &str, version: &str) -> bool {
        self.contains_key(&format_key(guid, version))
    }

    pub fn generation_time(&self) -> u64 {
        self.generation_time
    }

    pub fn key_format(&self) -> &str {
        &self.key_format
    }

    pub fn blocked_layer(&self) -> &BloomFilter {
        &self.blocked
    }

    pub fn exclusion_layer(&self) -> &BloomFilter {
        &self.exclusions
    }

    /// Serialize to the published binary attachment
    pub fn to_bytes(&self) -> Result<Vec<u8>, FilterError> {
        bincode::serialize(self).map_err(|e| FilterError::SerializationError(e.to_string()))
    }

    /// Decode a published attachment, rejecting unknown layouts and key formats
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        let mlbf: Self =
            bincode::deserialize(bytes).map_err(|e| FilterError::SerializationError(e.to_string()))?;
        if mlbf.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(FilterError::SerializationError(format!(
                "unsupported artifact format version {}",
                mlbf.format_version
            )));
        }
        if mlbf.key_format != KEY_FORMAT {
            return Err(FilterError::KeyFormatMismatch {
                expected: KEY_FORMAT.to_string(),
                found: mlbf.key_format,
            });
        }
        if !mlbf.blocked.is_well_formed() || !mlbf.exclusions.is_well_formed() {
            return Err(FilterError::SerializationError(
                "layer header does not match bit array".to_string(),
            ));
        }
        Ok(mlbf)
    }
}
