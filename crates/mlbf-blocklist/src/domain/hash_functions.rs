//! Hash functions for the MLBF layers
//!
//! MurmurHash3 with double hashing for bit positions; each layer carries a
//! 32-bit salt derived from the build seed so that layers hash independently
//! and rebuilding with the same seed reproduces the same bits.

use std::io::Cursor;

use sha2::{Digest, Sha256};

/// Hash an element with MurmurHash3 using a seed and salt
pub fn murmur_hash(element: &[u8], seed: u32, salt: u32) -> u64 {
    let combined_seed = seed.wrapping_add(salt);
    let mut cursor = Cursor::new(element);

    // murmur3 128-bit, lower 64 bits
    let hash = murmur3::murmur3_x64_128(&mut cursor, combined_seed).unwrap_or(0);
    hash as u64
}

/// Compute k bit positions for an element
///
/// Double hashing: h(i) = h1 + i * h2
pub fn compute_hash_positions(element: &[u8], k: usize, m: usize, salt: u32) -> Vec<usize> {
    let h1 = murmur_hash(element, 0, salt);
    let h2 = murmur_hash(element, 1, salt);

    (0..k)
        .map(|i| {
            let hash = h1.wrapping_add((i as u64).wrapping_mul(h2));
            (hash % m as u64) as usize
        })
        .collect()
}

/// Derive a layer salt from the build seed.
///
/// SHA-256 over `seed || layer || attempt`, first four bytes little-endian.
/// `attempt` lets a layer be re-salted deterministically when a build has to
/// retry.
pub fn derive_salt(seed: u64, layer: u8, attempt: u32) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update([layer]);
    hasher.update(attempt.to_le_bytes());
    let digest = hasher.finalize();
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}
