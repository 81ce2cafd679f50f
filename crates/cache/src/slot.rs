//! A single block's worth of cached state inside the reversible window.

use crate::{
    AccountSnapshot, Block, BlockHead, BloomFilter, Receipt, Revision, TiedKey, TiedValue,
    Transaction,
};
use alloy_primitives::{Address, B256, Bytes};
use std::collections::HashMap;

/// Cached state anchored at one recent block.
///
/// Everything held here may be discarded by a fork rollback, so nothing is read from a slot
/// that is not on the path from the window top back to the requested revision.
#[derive(Debug, Clone)]
pub struct Slot {
    /// The block this slot is anchored at.
    pub head: BlockHead,
    /// Addresses and storage keys touched by the block. `None` means anything may have been
    /// touched.
    pub bloom: Option<BloomFilter>,
    /// The full block, once known.
    pub block: Option<Block>,
    /// Account snapshots valid at this block.
    pub accounts: HashMap<Address, AccountSnapshot>,
    /// Transactions included in this block, by id.
    pub txs: HashMap<B256, Transaction>,
    /// Receipts of transactions included in this block, by transaction id.
    pub receipts: HashMap<B256, Receipt>,
    /// Tied entries valid at this block.
    pub tied: HashMap<TiedKey, TiedValue>,
}

impl Slot {
    /// Creates an empty slot for `head`.
    pub fn new(head: BlockHead, bloom: Option<BloomFilter>, block: Option<Block>) -> Self {
        Self {
            head,
            bloom,
            block,
            accounts: HashMap::new(),
            txs: HashMap::new(),
            receipts: HashMap::new(),
            tied: HashMap::new(),
        }
    }

    /// Returns true if this slot is the block `revision` points at.
    pub fn matches(&self, revision: &Revision) -> bool {
        revision.matches(&self.head)
    }

    /// Returns true if the block may have modified `address`.
    ///
    /// Without a bloom filter every address is assumed touched.
    pub fn may_touch(&self, address: &Address) -> bool {
        self.bloom.as_ref().is_none_or(|bloom| bloom.contains_trimmed(address.as_slice()))
    }

    /// Returns true if the block may have modified anything a tied entry depends on.
    ///
    /// Without a bloom filter or a tie list the entry is assumed dirty. An empty tie list never
    /// invalidates.
    pub fn may_touch_any(&self, ties: Option<&[Bytes]>) -> bool {
        match (&self.bloom, ties) {
            (Some(bloom), Some(ties)) => ties.iter().any(|tie| bloom.contains_trimmed(tie)),
            _ => true,
        }
    }
}
