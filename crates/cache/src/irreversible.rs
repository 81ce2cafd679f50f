//! Bounded store for entities that can no longer be rolled back.
//!
//! Blocks, transactions and receipts land here once they fall out of the reversible window, or
//! when a fetch returns something already older than the window. Nothing here is ever
//! invalidated; entries only leave through LRU eviction.

use crate::{Block, BlockNumber, CacheConfig, Receipt, Revision, Transaction};
use alloy_primitives::B256;
use lru::LruCache;

/// LRU caches for final blocks, transactions and receipts.
///
/// Blocks are indexed twice, mirroring the id/number split of the reversible window:
/// - By id: the block payload itself
/// - By number: maps trunk block numbers to ids
#[derive(Debug)]
pub struct IrreversibleStore {
    blocks_by_id: LruCache<B256, Block>,
    blocks_by_number: LruCache<BlockNumber, B256>,
    txs: LruCache<B256, Transaction>,
    receipts: LruCache<B256, Receipt>,
}

impl IrreversibleStore {
    /// Creates a store sized from `config`.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            blocks_by_id: LruCache::new(config.irreversible_blocks),
            blocks_by_number: LruCache::new(config.irreversible_blocks),
            txs: LruCache::new(config.irreversible_txs),
            receipts: LruCache::new(config.irreversible_receipts),
        }
    }

    /// Looks up a block by id or trunk number.
    pub fn get_block(&mut self, revision: &Revision) -> Option<Block> {
        let id = match revision {
            Revision::Id(id) => *id,
            Revision::Number(number) => *self.blocks_by_number.get(number)?,
        };
        self.blocks_by_id.get(&id).cloned()
    }

    /// Inserts a block by id, and by number too when it is on the trunk.
    pub fn insert_block(&mut self, block: Block) {
        if block.is_trunk {
            self.blocks_by_number.put(block.number, block.id);
        }
        self.blocks_by_id.put(block.id, block);
    }

    /// Looks up a transaction by id.
    pub fn get_tx(&mut self, id: &B256) -> Option<Transaction> {
        self.txs.get(id).cloned()
    }

    /// Inserts a transaction.
    pub fn insert_tx(&mut self, id: B256, tx: Transaction) {
        self.txs.put(id, tx);
    }

    /// Looks up a receipt by transaction id.
    pub fn get_receipt(&mut self, id: &B256) -> Option<Receipt> {
        self.receipts.get(id).cloned()
    }

    /// Inserts a receipt keyed by transaction id.
    pub fn insert_receipt(&mut self, id: B256, receipt: Receipt) {
        self.receipts.put(id, receipt);
    }

    /// Entry counts for blocks by id, blocks by number, transactions and receipts.
    pub fn len(&self) -> (usize, usize, usize, usize) {
        (self.blocks_by_id.len(), self.blocks_by_number.len(), self.txs.len(), self.receipts.len())
    }

    /// Returns true if the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.blocks_by_id.is_empty() && self.txs.is_empty() && self.receipts.is_empty()
    }
}
