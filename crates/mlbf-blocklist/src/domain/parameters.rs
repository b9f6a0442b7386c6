//! Layer sizing
//!
//! Each MLBF layer is a plain bloom filter sized from its entry count:
//! bits = ⌈-n·ln(p) / ln²2⌉, hashes = round(bits/n · ln2) clamped to 1..=32.
//! The exclusion layer is probed by every blocked key, so it is sized for a
//! rate divided by the blocked count.

use std::f64::consts::LN_2;

/// Smallest rate a layer is sized for
pub const MIN_LAYER_FPR: f64 = 1e-15;

const MAX_HASHES: usize = 32;

/// Size of one layer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerParams {
    pub size_bits: usize,
    pub hash_count: usize,
    /// Rate predicted for `entries` insertions at this size
    pub expected_fpr: f64,
}

/// Size a layer holding `entries` keys at `rate`.
///
/// No entries gives a one-bit, one-hash layer that rejects everything.
pub fn layer_params(entries: usize, rate: f64) -> LayerParams {
    if entries == 0 {
        return LayerParams {
            size_bits: 1,
            hash_count: 1,
            expected_fpr: 0.0,
        };
    }
    let n = entries as f64;
    let rate = rate.max(MIN_LAYER_FPR);
    let size_bits = (-n * rate.ln() / (LN_2 * LN_2)).ceil().max(1.0) as usize;
    let hash_count = ((size_bits as f64 / n) * LN_2).round().clamp(1.0, MAX_HASHES as f64) as usize;
    LayerParams {
        size_bits,
        hash_count,
        expected_fpr: expected_fpr(size_bits, entries, hash_count),
    }
}

/// Rate for the exclusion layer given `blocked` probing keys
pub fn exclusion_rate(target_fpr: f64, blocked: usize) -> f64 {
    (target_fpr / blocked.max(1) as f64).max(MIN_LAYER_FPR)
}

/// (1 - e^(-kn/m))^k
pub fn expected_fpr(size_bits: usize, entries: usize, hash_count: usize) -> f64 {
    if size_bits == 0 {
        return 1.0;
    }
    let fill = -(hash_count as f64) * (entries as f64) / (size_bits as f64);
    (1.0 - fill.exp()).powi(hash_count as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousand_entries_at_one_percent() {
        // ≈9586 bits, 7 hashes
        let p = layer_params(1_000, 0.01);
        assert!((9_000..=10_000).contains(&p.size_bits), "bits={}", p.size_bits);
        assert_eq!(p.hash_count, 7);
        assert!(p.expected_fpr <= 0.011, "fpr={}", p.expected_fpr);
    }

    #[test]
    fn test_empty_layer() {
        assert_eq!(
            layer_params(0, 0.001),
            LayerParams {
                size_bits: 1,
                hash_count: 1,
                expected_fpr: 0.0
            }
        );
    }

    #[test]
    fn test_hash_count_clamped() {
        assert_eq!(layer_params(3, 1e-30).hash_count, MAX_HASHES);
    }

    #[test]
    fn test_size_grows_with_entries_and_tighter_rate() {
        let base = layer_params(500, 0.01);
        assert!(layer_params(5_000, 0.01).size_bits > base.size_bits);
        assert!(layer_params(500, 0.0001).size_bits > base.size_bits);
    }

    #[test]
    fn test_exclusion_rate_scales_with_blocked() {
        assert!((exclusion_rate(0.001, 0) - 0.001).abs() < f64::EPSILON);
        assert!((exclusion_rate(0.001, 1_000) - 1e-6).abs() < 1e-18);
        assert_eq!(exclusion_rate(1e-10, 1_000_000_000), MIN_LAYER_FPR);
    }
}
