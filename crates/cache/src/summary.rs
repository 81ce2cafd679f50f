//! Whole-value caches for staking and auction lists.
//!
//! These lists are not addressable by the bloom filter, so they are simply refreshed whenever
//! the chain advances past the height they were fetched at.

use crate::BlockNumber;

/// One cached list and the window height it was fetched at.
#[derive(Debug, Clone)]
pub struct SummaryCache<T> {
    value: Option<T>,
    watermark: Option<BlockNumber>,
}

impl<T> Default for SummaryCache<T> {
    fn default() -> Self {
        Self { value: None, watermark: None }
    }
}

impl<T: Clone> SummaryCache<T> {
    /// Returns the cached value if it was fetched at or after `top`.
    ///
    /// `top` is the window's newest block number, `None` on an empty window, which always
    /// misses.
    pub fn get(&self, top: Option<BlockNumber>) -> Option<T> {
        match (top, self.watermark) {
            (Some(top), Some(watermark)) if top <= watermark => self.value.clone(),
            _ => None,
        }
    }

    /// Stores `value` as fetched at `top`, or at height zero on an empty window.
    pub fn set(&mut self, value: T, top: Option<BlockNumber>) {
        self.value = Some(value);
        self.watermark = Some(top.unwrap_or_default());
    }

    /// Height the cached value was fetched at.
    pub const fn watermark(&self) -> Option<BlockNumber> {
        self.watermark
    }
}
