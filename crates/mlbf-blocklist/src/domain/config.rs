//! MLBF build configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use mlbf_blocklist::domain::MlbfConfigBuilder;
//!
//! let config = MlbfConfigBuilder::new()
//!     .target_fpr(0.001)
//!     .seed(42)
//!     .build()
//!     .expect("Valid config");
//! ```

use crate::error::FilterError;
use serde::{Deserialize, Serialize};

/// Bloom filter build configuration
///
/// The build is a pure function of `(snapshot, config)`; nothing here is
/// read from process state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MlbfConfig {
    /// Target false positive rate for each layer, in (0, 1)
    pub target_fpr: f64,
    /// Upper bound on any single layer's size in bits
    pub max_filter_bits: usize,
    /// Seed from which layer salts are derived
    pub seed: u64,
    /// How many salts to try for the exclusion layer before giving up
    pub max_salt_attempts: u32,
    /// Capacity of the per-build version-range memo
    pub memo_capacity: usize,
}

impl Default for MlbfConfig {
    fn default() -> Self {
        Self {
            target_fpr: 0.001,
            max_filter_bits: 512 * 1024 * 1024, // 64 MiB per layer
            seed: 0,
            max_salt_attempts: 16,
            memo_capacity: 1024,
        }
    }
}

impl MlbfConfig {
    pub fn validate(&self) -> Result<(), FilterError> {
        if !(self.target_fpr > 0.0 && self.target_fpr < 1.0) {
            return Err(FilterError::InvalidErrorRate {
                rate: self.target_fpr,
            });
        }

        if self.max_filter_bits == 0 {
            return Err(FilterError::InvalidParameters(
                "max_filter_bits cannot be 0".to_string(),
            ));
        }

        if self.max_salt_attempts == 0 {
            return Err(FilterError::InvalidParameters(
                "max_salt_attempts cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = fpr;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_filter_bits(mut self, bits: usize) -> Self {
        self.max_filter_bits = bits;
        self
    }
}

/// Builder for MlbfConfig with validation
#[derive(Default)]
pub struct MlbfConfigBuilder {
    target_fpr: Option<f64>,
    max_filter_bits: Option<usize>,
    seed: Option<u64>,
    max_salt_attempts: Option<u32>,
    memo_capacity: Option<usize>,
}

impl MlbfConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set target false positive rate (must be strictly between 0 and 1)
    pub fn target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = Some(fpr);
        self
    }

    pub fn max_filter_bits(mut self, bits: usize) -> Self {
        self.max_filter_bits = Some(bits);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn max_salt_attempts(mut self, attempts: u32) -> Self {
        self.max_salt_attempts = Some(attempts);
        self
    }

    pub fn memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = Some(capacity);
        self
    }

    /// Build the config, validating all parameters
    pub fn build(self) -> Result<MlbfConfig, FilterError> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build without validation; the builder validates again at use
    pub fn build_unchecked(self) -> MlbfConfig {
        let defaults = MlbfConfig::default();

        MlbfConfig {
            target_fpr: self.target_fpr.unwrap_or(defaults.target_fpr),
            max_filter_bits: self.max_filter_bits.unwrap_or(defaults.max_filter_bits),
            seed: self.seed.unwrap_or(defaults.seed),
            max_salt_attempts: self.max_salt_attempts.unwrap_or(defaults.max_salt_attempts),
            memo_capacity: self.memo_capacity.unwrap_or(defaults.memo_capacity),
        }
    }
}
