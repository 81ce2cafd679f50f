//! Cache sizing.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Sizing of the reversible window and the irreversible store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Number of recent blocks kept in the reversible window. Anything further behind the
    /// newest slot is treated as final.
    pub window_len: NonZeroUsize,
    /// Capacity of the irreversible block cache.
    pub irreversible_blocks: NonZeroUsize,
    /// Capacity of the irreversible transaction cache.
    pub irreversible_txs: NonZeroUsize,
    /// Capacity of the irreversible receipt cache.
    pub irreversible_receipts: NonZeroUsize,
}

impl CacheConfig {
    /// Default reversible window length.
    pub const DEFAULT_WINDOW_LEN: NonZeroUsize = NonZeroUsize::new(12).unwrap();
    /// Default irreversible block capacity.
    pub const DEFAULT_IRREVERSIBLE_BLOCKS: NonZeroUsize = NonZeroUsize::new(256).unwrap();
    /// Default irreversible transaction and receipt capacity.
    pub const DEFAULT_IRREVERSIBLE_TXS: NonZeroUsize = NonZeroUsize::new(512).unwrap();
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            window_len: Self::DEFAULT_WINDOW_LEN,
            irreversible_blocks: Self::DEFAULT_IRREVERSIBLE_BLOCKS,
            irreversible_txs: Self::DEFAULT_IRREVERSIBLE_TXS,
            irreversible_receipts: Self::DEFAULT_IRREVERSIBLE_TXS,
        }
    }
}
