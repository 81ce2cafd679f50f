//! The fork-aware chain cache.
//!
//! [`ChainCache`] composes the reversible window, the irreversible store and the summary caches.
//! Every accessor takes a `fetch` closure that is only invoked on a miss; its error is returned
//! unchanged.
//!
//! No lock is held while a fetch is awaited. When the fetch resolves the window is locked again
//! and the result is stored into whichever slot matches the fetched payload at that point, which
//! may be none if a rollback happened in the meantime. Locks are always taken window first,
//! irreversible store second.

use crate::{
    AccountSnapshot, Account, Auction, AuctionSummary, Block, BlockHead, BlockNumber, BloomFilter,
    Bucket, CacheConfig, Candidate, HeadBloom, IrreversibleStore, Receipt, ReversibleWindow,
    Revision, Rollback, Slot, Stakeholder, SummaryCache, TiedEntry, TiedKey, Transaction,
};
use alloy_primitives::{Address, B256, Bytes};
use std::future::Future;
use tokio::sync::RwLock;

macro_rules! record {
    ($method:ident, $kind:expr) => {
        #[cfg(feature = "metrics")]
        crate::Metrics::$method($kind);
    };
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// The newest block in the window.
    pub head: Option<BlockHead>,
    /// Number of slots in the reversible window.
    pub window_len: usize,
    /// Maximum number of slots in the reversible window.
    pub window_capacity: usize,
    /// Number of irreversible blocks cached by id.
    pub irreversible_blocks: usize,
    /// Number of irreversible trunk blocks indexed by number.
    pub irreversible_block_numbers: usize,
    /// Number of irreversible transactions cached.
    pub irreversible_txs: usize,
    /// Number of irreversible receipts cached.
    pub irreversible_receipts: usize,
}

/// Fork-aware cache of chain state.
///
/// All accessors take `&self`, so one instance can be shared behind an `Arc` between the head
/// tracker and any number of readers.
#[derive(Debug)]
pub struct ChainCache {
    config: CacheConfig,
    window: RwLock<ReversibleWindow>,
    irreversible: RwLock<IrreversibleStore>,
    candidates: RwLock<SummaryCache<Vec<Candidate>>>,
    buckets: RwLock<SummaryCache<Vec<Bucket>>>,
    stakeholders: RwLock<SummaryCache<Vec<Stakeholder>>>,
    auction: RwLock<SummaryCache<Auction>>,
    auction_summaries: RwLock<SummaryCache<Vec<AuctionSummary>>>,
}

impl Default for ChainCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ChainCache {
    /// Creates an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            window: RwLock::new(ReversibleWindow::new(config.window_len.get())),
            irreversible: RwLock::new(IrreversibleStore::new(&config)),
            candidates: RwLock::default(),
            buckets: RwLock::default(),
            stakeholders: RwLock::default(),
            auction: RwLock::default(),
            auction_summaries: RwLock::default(),
            config,
        }
    }

    /// The configuration the cache was built with.
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The newest block in the window, if any block has been observed.
    pub async fn head(&self) -> Option<BlockHead> {
        self.window.read().await.top().map(|slot| slot.head)
    }

    /// Number of slots currently in the reversible window.
    pub async fn window_len(&self) -> usize {
        self.window.read().await.len()
    }

    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let window = self.window.read().await;
        let irreversible = self.irreversible.read().await;
        let (blocks, numbers, txs, receipts) = irreversible.len();
        CacheStats {
            head: window.top().map(|slot| slot.head),
            window_len: window.len(),
            window_capacity: window.max_len(),
            irreversible_blocks: blocks,
            irreversible_block_numbers: numbers,
            irreversible_txs: txs,
            irreversible_receipts: receipts,
        }
    }

    /// Advances the window to a newly observed head.
    ///
    /// Slots that do not lead to `head` are discarded. If `head` is already in the window
    /// (including the case where the chain moved back to an ancestor) nothing new is pushed.
    /// Slots that fall out of the window move their transactions, receipts and block into the
    /// irreversible store.
    pub async fn handle_new_block(
        &self,
        head: BlockHead,
        bloom: Option<&HeadBloom>,
        block: Option<Block>,
    ) {
        let bloom = bloom.and_then(|bloom| {
            BloomFilter::from_hex(&bloom.bits, bloom.k as usize)
                .inspect_err(|err| {
                    tracing::warn!(
                        target: "cache::engine",
                        number = head.number,
                        id = %head.id,
                        %err,
                        "Ignoring malformed block bloom"
                    );
                })
                .ok()
        });

        let mut window = self.window.write().await;

        #[cfg(feature = "metrics")]
        metrics::counter!(crate::Metrics::NEW_HEADS).increment(1);

        let rollback = window.rollback_to_parent_of(&head);
        if rollback.popped() > 0 {
            tracing::debug!(
                target: "cache::engine",
                number = head.number,
                id = %head.id,
                depth = rollback.popped(),
                "Rolled back forked slots"
            );

            #[cfg(feature = "metrics")]
            metrics::histogram!(crate::Metrics::ROLLBACK_DEPTH).record(rollback.popped() as f64);
        }
        if let Rollback::Known { .. } = rollback {
            tracing::trace!(target: "cache::engine", number = head.number, "Head already known");
            return;
        }

        let evicted = window.push(Slot::new(head, bloom, block));
        if evicted.is_empty() {
            return;
        }

        #[cfg(feature = "metrics")]
        metrics::counter!(crate::Metrics::SLOTS_EVICTED).increment(evicted.len() as u64);

        let mut irreversible = self.irreversible.write().await;
        for slot in evicted {
            tracing::debug!(
                target: "cache::engine",
                number = slot.head.number,
                txs = slot.txs.len(),
                receipts = slot.receipts.len(),
                "Moving slot into irreversible store"
            );
            for (id, tx) in slot.txs {
                irreversible.insert_tx(id, tx);
            }
            for (id, receipt) in slot.receipts {
                irreversible.insert_receipt(id, receipt);
            }
            if let Some(block) = slot.block {
                irreversible.insert_block(block);
            }
        }
    }

    /// Returns the block at `revision`.
    ///
    /// `fetch` is invoked on a miss; a `None` result is returned without being cached.
    pub async fn get_block<E, F, Fut>(
        &self,
        revision: Revision,
        fetch: F,
    ) -> Result<Option<Block>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Block>, E>>,
    {
        let cached = self.irreversible.write().await.get_block(&revision);
        if let Some(block) = cached {
            record!(record_hit, "block");
            tracing::trace!(target: "cache::engine", %revision, "Irreversible block hit");
            return Ok(Some(block));
        }

        let cached = self.window.read().await.find(&revision).and_then(|slot| slot.block.clone());
        if let Some(block) = cached {
            record!(record_hit, "block");
            tracing::trace!(target: "cache::engine", %revision, "Block hit");
            return Ok(Some(block));
        }

        record!(record_miss, "block");
        tracing::trace!(target: "cache::engine", %revision, "Block miss");
        let Some(block) = fetch().await? else {
            return Ok(None);
        };

        let mut window = self.window.write().await;
        if let Some(slot) = window.find_mut(&Revision::Id(block.id)) {
            slot.block = Some(block.clone());
        }
        if window.is_irreversible(block.number) {
            self.irreversible.write().await.insert_block(block.clone());
        }
        Ok(Some(block))
    }

    /// Returns the transaction `id`.
    ///
    /// Every slot of the window is searched, and a fetched transaction is stored in the slot of
    /// the block that includes it.
    pub async fn get_tx<E, F, Fut>(&self, id: B256, fetch: F) -> Result<Option<Transaction>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Transaction>, E>>,
    {
        let cached = self.irreversible.write().await.get_tx(&id);
        if let Some(tx) = cached {
            record!(record_hit, "tx");
            tracing::trace!(target: "cache::engine", %id, "Irreversible transaction hit");
            return Ok(Some(tx));
        }

        let cached =
            self.window.read().await.iter().rev().find_map(|slot| slot.txs.get(&id).cloned());
        if let Some(tx) = cached {
            record!(record_hit, "tx");
            tracing::trace!(target: "cache::engine", %id, "Transaction hit");
            return Ok(Some(tx));
        }

        record!(record_miss, "tx");
        tracing::trace!(target: "cache::engine", %id, "Transaction miss");
        let Some(tx) = fetch().await? else {
            return Ok(None);
        };

        let mut window = self.window.write().await;
        if let Some(slot) = window.find_mut(&Revision::Id(tx.meta.block_id)) {
            slot.txs.insert(id, tx.clone());
        }
        if window.is_irreversible(tx.meta.block_number) {
            self.irreversible.write().await.insert_tx(id, tx.clone());
        }
        Ok(Some(tx))
    }

    /// Returns the receipt of transaction `id`.
    ///
    /// Lookup and population follow [`Self::get_tx`].
    pub async fn get_receipt<E, F, Fut>(&self, id: B256, fetch: F) -> Result<Option<Receipt>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Receipt>, E>>,
    {
        let cached = self.irreversible.write().await.get_receipt(&id);
        if let Some(receipt) = cached {
            record!(record_hit, "receipt");
            tracing::trace!(target: "cache::engine", %id, "Irreversible receipt hit");
            return Ok(Some(receipt));
        }

        let cached =
            self.window.read().await.iter().rev().find_map(|slot| slot.receipts.get(&id).cloned());
        if let Some(receipt) = cached {
            record!(record_hit, "receipt");
            tracing::trace!(target: "cache::engine", %id, "Receipt hit");
            return Ok(Some(receipt));
        }

        record!(record_miss, "receipt");
        tracing::trace!(target: "cache::engine", %id, "Receipt miss");
        let Some(receipt) = fetch().await? else {
            return Ok(None);
        };

        let mut window = self.window.write().await;
        if let Some(slot) = window.find_mut(&Revision::Id(receipt.meta.block_id)) {
            slot.receipts.insert(id, receipt.clone());
        }
        if window.is_irreversible(receipt.meta.block_number) {
            self.irreversible.write().await.insert_receipt(id, receipt.clone());
        }
        Ok(Some(receipt))
    }

    /// Returns the account `address` at `revision`.
    ///
    /// The window is walked back from the revision's slot for as long as each block is known not
    /// to have touched `address`. A snapshot found on the way has its energy projected to the
    /// revision's timestamp and is copied forward into the revision's slot.
    pub async fn get_account<E, F, Fut>(
        &self,
        address: Address,
        revision: Revision,
        fetch: F,
    ) -> Result<Account, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Account, E>>,
    {
        let target = {
            let mut window = self.window.write().await;
            match window.find_index(&revision) {
                Some(target) => {
                    if let Some(account) = copy_account_forward(&mut window, target, &address) {
                        record!(record_hit, "account");
                        tracing::trace!(
                            target: "cache::engine",
                            %address,
                            %revision,
                            "Account hit"
                        );
                        return Ok(account);
                    }
                    window.get(target).map(|slot| (slot.head.id, slot.head.timestamp))
                }
                None => None,
            }
        };

        record!(record_miss, "account");
        tracing::trace!(target: "cache::engine", %address, %revision, "Account miss");
        let account = fetch().await?;

        if let Some((id, timestamp)) = target {
            let mut window = self.window.write().await;
            if let Some(slot) = window.find_mut(&Revision::Id(id)) {
                slot.accounts.insert(address, AccountSnapshot::new(account.clone(), timestamp));
            }
        }
        Ok(account)
    }

    /// Returns the tied entry `key` at `revision`.
    ///
    /// The window is walked back from the revision's slot for as long as each block has a bloom
    /// filter in which every tie tests absent. With `ties` of `None` nothing older than the
    /// revision itself is trusted; an empty tie list never invalidates.
    pub async fn get_tied<T, E, F, Fut>(
        &self,
        key: TiedKey,
        revision: Revision,
        fetch: F,
        ties: Option<&[Bytes]>,
    ) -> Result<T, E>
    where
        T: TiedEntry,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let target = {
            let mut window = self.window.write().await;
            match window.find_index(&revision) {
                Some(target) => {
                    if let Some(value) = copy_tied_forward(&mut window, target, &key, ties) {
                        record!(record_hit, "tied");
                        tracing::trace!(target: "cache::engine", %key, %revision, "Tied hit");
                        return Ok(value);
                    }
                    window.get(target).map(|slot| slot.head.id)
                }
                None => None,
            }
        };

        record!(record_miss, "tied");
        tracing::trace!(target: "cache::engine", %key, %revision, "Tied miss");
        let value = fetch().await?;

        if let Some(id) = target {
            let mut window = self.window.write().await;
            if let Some(slot) = window.find_mut(&Revision::Id(id)) {
                slot.tied.insert(key, value.clone().into_tied());
            }
        }
        Ok(value)
    }

    /// Returns the candidate list, refreshed once per new head.
    pub async fn get_candidates<E, F, Fut>(&self, fetch: F) -> Result<Vec<Candidate>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Candidate>, E>>,
    {
        self.summary(&self.candidates, "candidates", move || async move {
            fetch().await.map(Some)
        })
        .await
        .map(Option::unwrap_or_default)
    }

    /// Returns the bucket list, refreshed once per new head.
    pub async fn get_buckets<E, F, Fut>(&self, fetch: F) -> Result<Vec<Bucket>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Bucket>, E>>,
    {
        self.summary(&self.buckets, "buckets", move || async move {
            fetch().await.map(Some)
        })
        .await
        .map(Option::unwrap_or_default)
    }

    /// Returns the stakeholder list, refreshed once per new head.
    pub async fn get_stakeholders<E, F, Fut>(&self, fetch: F) -> Result<Vec<Stakeholder>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Stakeholder>, E>>,
    {
        self.summary(&self.stakeholders, "stakeholders", move || async move {
            fetch().await.map(Some)
        })
        .await
        .map(Option::unwrap_or_default)
    }

    /// Returns the auction in progress, refreshed once per new head.
    ///
    /// `None` means no auction is running and is not cached.
    pub async fn get_auction<E, F, Fut>(&self, fetch: F) -> Result<Option<Auction>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Auction>, E>>,
    {
        self.summary(&self.auction, "auction", fetch).await
    }

    /// Returns the summaries of past auctions, refreshed once per new head.
    pub async fn get_auction_summaries<E, F, Fut>(
        &self,
        fetch: F,
    ) -> Result<Vec<AuctionSummary>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<AuctionSummary>, E>>,
    {
        self.summary(&self.auction_summaries, "auction_summaries", move || async move {
            fetch().await.map(Some)
        })
        .await
        .map(Option::unwrap_or_default)
    }

    async fn summary<T, E, F, Fut>(
        &self,
        cache: &RwLock<SummaryCache<T>>,
        name: &'static str,
        fetch: F,
    ) -> Result<Option<T>, E>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let top: Option<BlockNumber> = self.window.read().await.top().map(|slot| slot.head.number);

        let cached = cache.read().await.get(top);
        if let Some(value) = cached {
            record!(record_hit, "summary");
            tracing::trace!(target: "cache::engine", summary = name, ?top, "Summary hit");
            return Ok(Some(value));
        }

        record!(record_miss, "summary");
        tracing::trace!(target: "cache::engine", summary = name, ?top, "Summary miss");
        let value = fetch().await?;
        if let Some(value) = &value {
            cache.write().await.set(value.clone(), top);
        }
        Ok(value)
    }
}

/// Walks back from `target` looking for a snapshot of `address`, copying a hit forward.
fn copy_account_forward(
    window: &mut ReversibleWindow,
    target: usize,
    address: &Address,
) -> Option<Account> {
    let timestamp = window.get(target)?.head.timestamp;
    let mut hit = None;
    for index in (0..=target).rev() {
        let slot = window.get(index)?;
        if let Some(snapshot) = slot.accounts.get(address) {
            hit = Some((index, snapshot.clone()));
            break;
        }
        if slot.may_touch(address) {
            break;
        }
    }

    let (index, snapshot) = hit?;
    let account = snapshot.snapshot(timestamp);
    if index != target {
        window.get_mut(target)?.accounts.insert(*address, snapshot);
    }
    Some(account)
}

/// Walks back from `target` looking for the tied entry `key`, copying a hit forward.
fn copy_tied_forward<T: TiedEntry>(
    window: &mut ReversibleWindow,
    target: usize,
    key: &TiedKey,
    ties: Option<&[Bytes]>,
) -> Option<T> {
    let mut hit = None;
    for index in (0..=target).rev() {
        let slot = window.get(index)?;
        if let Some(value) = slot.tied.get(key).and_then(T::from_tied) {
            hit = Some((index, value));
            break;
        }
        if slot.may_touch_any(ties) {
            break;
        }
    }

    let (index, value) = hit?;
    if index != target {
        window.get_mut(target)?.tied.insert(*key, value.clone().into_tied());
    }
    Some(value)
}
