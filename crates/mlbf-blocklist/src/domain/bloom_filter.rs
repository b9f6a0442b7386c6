//! One salted bloom layer of an MLBF
//!
//! Bits are stored LSB-first in bytes so the serialized layer is the same
//! on every platform. An inserted key always tests positive.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use super::hash_functions::compute_hash_positions;
use super::parameters::{expected_fpr, layer_params};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    #[serde(with = "bitvec_serde")]
    bits: BitVec<u8, Lsb0>,
    k: usize,
    m: usize,
    /// Keys inserted so far
    n: usize,
    salt: u32,
}

/// `(raw bytes, bit length)`; the length is checked on decode
mod bitvec_serde {
    use bitvec::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bits: &BitVec<u8, Lsb0>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes: Vec<u8> = bits.as_raw_slice().to_vec();
        (bytes, bits.len()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BitVec<u8, Lsb0>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (bytes, len): (Vec<u8>, usize) = Deserialize::deserialize(deserializer)?;
        if len > bytes.len() * 8 {
            return Err(serde::de::Error::custom(format!(
                "bit length {} exceeds {} bytes",
                len,
                bytes.len()
            )));
        }
        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        bits.truncate(len);
        Ok(bits)
    }
}

impl BloomFilter {
    /// Create an empty filter of `m` bits and `k` hash functions
    pub fn new(m: usize, k: usize, salt: u32) -> Self {
        let m = m.max(1);
        Self {
            bits: bitvec![u8, Lsb0; 0; m],
            k: k.max(1),
            m,
            n: 0,
            salt,
        }
    }

    /// Layer sized for `entries` keys at `rate`
    pub fn sized(entries: usize, rate: f64, salt: u32) -> Self {
        let params = layer_params(entries, rate);
        Self::new(params.size_bits, params.hash_count, salt)
    }

    pub fn insert(&mut self, key: &[u8]) {
        for pos in compute_hash_positions(key, self.k, self.m, self.salt) {
            self.bits.set(pos, true);
        }
        self.n += 1;
    }

    /// `false` means never inserted
    pub fn contains(&self, key: &[u8]) -> bool {
        compute_hash_positions(key, self.k, self.m, self.salt)
            .iter()
            .all(|&pos| self.bits[pos])
    }

    /// Predicted false positive rate at the current fill
    pub fn predicted_fpr(&self) -> f64 {
        expected_fpr(self.m, self.n, self.k)
    }

    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn size_bits(&self) -> usize {
        self.m
    }

    pub fn hash_count(&self) -> usize {
        self.k
    }

    pub fn elements_inserted(&self) -> usize {
        self.n
    }

    pub fn salt(&self) -> u32 {
        self.salt
    }

    /// Header fields agree with the bit array (checked after decoding)
    pub(crate) fn is_well_formed(&self) -> bool {
        self.m >= 1 && self.k >= 1 && self.bits.len() == self.m
    }
}
