//! Per-block bloom filter over the addresses and storage keys a block touched.
//!
//! The filter only ever answers "definitely absent" or "possibly present". The cache relies on
//! the first answer alone: a false positive costs a refetch, a false negative would serve stale
//! state, so inserted items must always test present.

use alloy_primitives::hex;
use blake2::{Blake2b, Digest, digest::consts::U32};

type Blake2b256 = Blake2b<U32>;

/// Errors decoding an announced bloom filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BloomError {
    /// The filter bits are not valid hex.
    #[error("invalid bloom filter hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// A bloom filter in the node's block filter layout.
///
/// Each item is hashed with blake2b-256. For hash function `i`, the big-endian pair of digest
/// bytes `2i, 2i + 1` modulo the filter bit length picks the bit to test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    k: usize,
    bits: Vec<u8>,
}

impl BloomFilter {
    /// Maximum number of hash functions; a 32-byte digest yields 16 two-byte indexes.
    pub const MAX_K: usize = 16;

    /// Filter length in bits used by the node.
    pub const DEFAULT_BITS_LENGTH: usize = 2048;

    /// Creates an empty filter of [`Self::DEFAULT_BITS_LENGTH`] bits.
    pub fn new(k: usize) -> Self {
        Self::from_bits(k, vec![0u8; Self::DEFAULT_BITS_LENGTH / 8])
    }

    /// Wraps existing filter bits. `k` is clamped to [`Self::MAX_K`].
    pub fn from_bits(k: usize, bits: Vec<u8>) -> Self {
        Self { k: k.min(Self::MAX_K), bits }
    }

    /// Decodes filter bits from hex, with or without a `0x` prefix.
    pub fn from_hex(bits: &str, k: usize) -> Result<Self, BloomError> {
        Ok(Self::from_bits(k, hex::decode(bits)?))
    }

    /// Picks the number of hash functions for a filter expected to hold `count` items.
    pub fn estimate_k(count: usize) -> usize {
        if count == 0 {
            return Self::MAX_K;
        }
        let k = (Self::DEFAULT_BITS_LENGTH as f64 / count as f64 * std::f64::consts::LN_2).round();
        (k as usize).clamp(1, Self::MAX_K)
    }

    /// Number of hash functions.
    pub const fn k(&self) -> usize {
        self.k
    }

    /// The raw filter bits.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Adds `key` to the filter.
    pub fn insert(&mut self, key: &[u8]) {
        for (index, mask) in self.positions(key) {
            self.bits[index] |= mask;
        }
    }

    /// Returns false only if `key` was definitely never inserted.
    pub fn contains(&self, key: &[u8]) -> bool {
        if self.bits.is_empty() {
            return true;
        }
        self.positions(key).all(|(index, mask)| self.bits[index] & mask == mask)
    }

    /// Membership test for an address or storage key.
    ///
    /// Leading zero bytes are stripped before hashing, matching how the node records touched
    /// addresses and keys. An all-zero value tests the empty byte string.
    pub fn contains_trimmed(&self, key: &[u8]) -> bool {
        self.contains(trim_leading_zeros(key))
    }

    /// Adds an address or storage key in trimmed form.
    pub fn insert_trimmed(&mut self, key: &[u8]) {
        self.insert(trim_leading_zeros(key))
    }

    fn positions(&self, key: &[u8]) -> impl Iterator<Item = (usize, u8)> + use<> {
        let digest = Blake2b256::digest(key);
        let bit_len = self.bits.len() * 8;
        (0..self.k).filter(move |_| bit_len > 0).map(move |i| {
            let d = (((digest[i * 2] as usize) << 8) | digest[i * 2 + 1] as usize) % bit_len;
            (d / 8, 1u8 << (d % 8))
        })
    }
}

fn trim_leading_zeros(key: &[u8]) -> &[u8] {
    let start = key.iter().position(|b| *b != 0).unwrap_or(key.len());
    &key[start..]
}
