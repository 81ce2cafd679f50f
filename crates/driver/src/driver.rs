//! A chain source with every query routed through the fork-aware cache.

use crate::{
    ChainSource, DriverError, EventFilter, ExplainArg, TransferFilter, filter::cache_key,
};
use alloy_primitives::{Address, B256, Bytes};
use meter_cache::{
    Account, Auction, AuctionSummary, Block, BlockHead, Bucket, Candidate, ChainCache, Code,
    EventLog, Receipt, Revision, Stakeholder, Storage, TiedKey, Transaction, TransferLog,
    VmOutput,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Seconds within which a head counts as caught up with wall-clock time.
const SYNCED_WITHIN_SECS: u64 = 30;

/// Cached view of a [`ChainSource`].
///
/// The driver owns the current head. It only moves when [`Driver::advance`] is handed a better
/// block, which also feeds the block to the cache.
#[derive(Debug)]
pub struct Driver<S> {
    source: Arc<S>,
    cache: Arc<ChainCache>,
    genesis: Block,
    head: watch::Sender<BlockHead>,
}

impl<S: ChainSource> Driver<S> {
    /// Creates a driver whose head starts at `initial_head`, or at `genesis` if none is given.
    pub fn new(
        source: Arc<S>,
        cache: Arc<ChainCache>,
        genesis: Block,
        initial_head: Option<BlockHead>,
    ) -> Self {
        let head = initial_head.unwrap_or_else(|| genesis.head());
        let (head, _) = watch::channel(head);
        Self { source, cache, genesis, head }
    }

    /// The genesis block.
    pub const fn genesis(&self) -> &Block {
        &self.genesis
    }

    /// The underlying source.
    pub const fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// The cache queries are routed through.
    pub const fn cache(&self) -> &Arc<ChainCache> {
        &self.cache
    }

    /// The current head.
    pub fn head(&self) -> BlockHead {
        *self.head.borrow()
    }

    /// Subscribes to head changes.
    pub fn subscribe_head(&self) -> watch::Receiver<BlockHead> {
        self.head.subscribe()
    }

    /// Moves the head to `best` if it is a different block at least as high as the current head.
    ///
    /// Returns the new head, or `None` if `best` was not an improvement.
    pub async fn advance(&self, best: Block) -> Option<BlockHead> {
        let current = self.head();
        if best.id == current.id || best.number < current.number {
            tracing::trace!(
                target: "driver::head_tracker",
                number = best.number,
                current = current.number,
                "Best block is not a new head"
            );
            return None;
        }

        let head = best.head();
        self.cache.handle_new_block(head, None, Some(best)).await;
        self.head.send_replace(head);

        #[cfg(feature = "metrics")]
        metrics::gauge!(crate::Metrics::HEAD_NUMBER).set(head.number as f64);

        tracing::debug!(
            target: "driver::head_tracker",
            number = head.number,
            id = %head.id,
            "New head"
        );
        Some(head)
    }

    /// Fraction of chain history the head has caught up with, as of unix time `now`.
    ///
    /// A head less than 30 seconds old counts as fully synced. Returns `None` when the head or
    /// `now` precede genesis.
    pub fn progress(&self, now: u64) -> Option<f64> {
        let head = self.head().timestamp;
        if now.saturating_sub(head) < SYNCED_WITHIN_SECS {
            return Some(1.0);
        }
        let genesis = self.genesis.timestamp;
        if head < genesis || now <= genesis {
            return None;
        }
        Some((head - genesis) as f64 / (now - genesis) as f64)
    }

    /// Returns the block at `revision`.
    pub async fn get_block(
        &self,
        revision: Revision,
    ) -> Result<Option<Block>, DriverError<S::Error>> {
        self.cache
            .get_block(revision, || self.source.block(revision))
            .await
            .map_err(DriverError::Source)
    }

    /// Returns transaction `id`.
    pub async fn get_transaction(
        &self,
        id: B256,
    ) -> Result<Option<Transaction>, DriverError<S::Error>> {
        let head = self.head().id;
        self.cache
            .get_tx(id, || self.source.transaction(id, head))
            .await
            .map_err(DriverError::Source)
    }

    /// Returns the receipt of transaction `id`.
    pub async fn get_receipt(&self, id: B256) -> Result<Option<Receipt>, DriverError<S::Error>> {
        let head = self.head().id;
        self.cache
            .get_receipt(id, || self.source.receipt(id, head))
            .await
            .map_err(DriverError::Source)
    }

    /// Returns account `address` at `revision`.
    pub async fn get_account(
        &self,
        address: Address,
        revision: Revision,
    ) -> Result<Account, DriverError<S::Error>> {
        self.cache
            .get_account(address, revision, || self.source.account(address, revision))
            .await
            .map_err(DriverError::Source)
    }

    /// Returns the code of `address` at `revision`.
    pub async fn get_code(
        &self,
        address: Address,
        revision: Revision,
    ) -> Result<Code, DriverError<S::Error>> {
        let fetch = || self.source.code(address, revision);
        self.cache
            .get_tied(TiedKey::Code(address), revision, fetch, None)
            .await
            .map_err(DriverError::Source)
    }

    /// Returns storage word `key` of `address` at `revision`.
    pub async fn get_storage(
        &self,
        address: Address,
        key: B256,
        revision: Revision,
    ) -> Result<Storage, DriverError<S::Error>> {
        self.cache
            .get_tied(
                TiedKey::Storage(address, key),
                revision,
                || self.source.storage(address, key, revision),
                None,
            )
            .await
            .map_err(DriverError::Source)
    }

    /// Simulates `arg` on top of `revision`.
    ///
    /// With `ties`, a cached result is reused at later blocks that did not touch any of them.
    pub async fn explain(
        &self,
        arg: &ExplainArg,
        revision: Revision,
        ties: Option<&[Bytes]>,
    ) -> Result<Vec<VmOutput>, DriverError<S::Error>> {
        let key = TiedKey::Explain(cache_key(arg).map_err(DriverError::CacheKey)?);
        self.cache
            .get_tied(key, revision, || self.source.explain(arg, revision), ties)
            .await
            .map_err(DriverError::Source)
    }

    /// Returns events matching `filter`, cached per head.
    pub async fn filter_event_logs(
        &self,
        filter: &EventFilter,
    ) -> Result<Vec<EventLog>, DriverError<S::Error>> {
        let key = TiedKey::EventFilter(cache_key(filter).map_err(DriverError::CacheKey)?);
        let head = Revision::Id(self.head().id);
        self.cache
            .get_tied(key, head, || self.source.filter_event_logs(filter), None)
            .await
            .map_err(DriverError::Source)
    }

    /// Returns transfers matching `filter`, cached per head.
    pub async fn filter_transfer_logs(
        &self,
        filter: &TransferFilter,
    ) -> Result<Vec<TransferLog>, DriverError<S::Error>> {
        let key = TiedKey::TransferFilter(cache_key(filter).map_err(DriverError::CacheKey)?);
        let head = Revision::Id(self.head().id);
        self.cache
            .get_tied(key, head, || self.source.filter_transfer_logs(filter), None)
            .await
            .map_err(DriverError::Source)
    }

    /// Returns all staking candidates.
    pub async fn get_candidates(&self) -> Result<Vec<Candidate>, DriverError<S::Error>> {
        self.cache.get_candidates(|| self.source.candidates()).await.map_err(DriverError::Source)
    }

    /// Returns all staking buckets.
    pub async fn get_buckets(&self) -> Result<Vec<Bucket>, DriverError<S::Error>> {
        self.cache.get_buckets(|| self.source.buckets()).await.map_err(DriverError::Source)
    }

    /// Returns all stakeholders.
    pub async fn get_stakeholders(&self) -> Result<Vec<Stakeholder>, DriverError<S::Error>> {
        self.cache
            .get_stakeholders(|| self.source.stakeholders())
            .await
            .map_err(DriverError::Source)
    }

    /// Returns the auction in progress, if any.
    pub async fn get_auction(&self) -> Result<Option<Auction>, DriverError<S::Error>> {
        self.cache.get_auction(|| self.source.auction()).await.map_err(DriverError::Source)
    }

    /// Returns summaries of past auctions.
    pub async fn get_auction_summaries(
        &self,
    ) -> Result<Vec<AuctionSummary>, DriverError<S::Error>> {
        self.cache
            .get_auction_summaries(|| self.source.auction_summaries())
            .await
            .map_err(DriverError::Source)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{FilterOptions, FilterRange, Order, RangeUnit};
    use alloy_primitives::address;
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("source unavailable")]
    pub(crate) struct SourceError;

    mock! {
        #[derive(Debug)]
        pub(crate) Source {}

        #[async_trait::async_trait]
        impl ChainSource for Source {
            type Error = SourceError;

            async fn best_block(&self) -> Result<Block, SourceError>;
            async fn block(&self, revision: Revision) -> Result<Option<Block>, SourceError>;
            async fn transaction(&self, id: B256, head: B256) -> Result<Option<Transaction>, SourceError>;
            async fn receipt(&self, id: B256, head: B256) -> Result<Option<Receipt>, SourceError>;
            async fn account(&self, address: Address, revision: Revision) -> Result<Account, SourceError>;
            async fn code(&self, address: Address, revision: Revision) -> Result<Code, SourceError>;
            async fn storage(&self, address: Address, key: B256, revision: Revision) -> Result<Storage, SourceError>;
            async fn explain(&self, arg: &ExplainArg, revision: Revision) -> Result<Vec<VmOutput>, SourceError>;
            async fn filter_event_logs(&self, filter: &EventFilter) -> Result<Vec<EventLog>, SourceError>;
            async fn filter_transfer_logs(&self, filter: &TransferFilter) -> Result<Vec<TransferLog>, SourceError>;
            async fn candidates(&self) -> Result<Vec<Candidate>, SourceError>;
            async fn buckets(&self) -> Result<Vec<Bucket>, SourceError>;
            async fn stakeholders(&self) -> Result<Vec<Stakeholder>, SourceError>;
            async fn auction(&self) -> Result<Option<Auction>, SourceError>;
            async fn auction_summaries(&self) -> Result<Vec<AuctionSummary>, SourceError>;
        }
    }

    pub(crate) fn block(number: u64) -> Block {
        Block {
            id: B256::with_last_byte(number as u8),
            number,
            parent_id: B256::with_last_byte(number.wrapping_sub(1) as u8),
            timestamp: 1_000 + number * 10,
            is_trunk: true,
            ..Default::default()
        }
    }

    fn driver(source: MockSource) -> Driver<MockSource> {
        Driver::new(Arc::new(source), Arc::new(ChainCache::default()), block(0), None)
    }

    #[tokio::test]
    async fn test_head_starts_at_genesis() {
        let driver = driver(MockSource::new());
        assert_eq!(driver.head(), block(0).head());
        assert_eq!(driver.cache().head().await, None);
    }

    #[tokio::test]
    async fn test_advance() {
        let driver = driver(MockSource::new());
        let mut heads = driver.subscribe_head();

        assert_eq!(driver.advance(block(0)).await, None);
        assert_eq!(driver.advance(block(2)).await, Some(block(2).head()));
        assert!(heads.has_changed().unwrap());
        assert_eq!(*heads.borrow_and_update(), block(2).head());

        // lower blocks never move the head back
        assert_eq!(driver.advance(block(1)).await, None);
        assert_eq!(driver.head(), block(2).head());
        assert_eq!(driver.cache().head().await, Some(block(2).head()));
    }

    #[tokio::test]
    async fn test_block_from_advance_is_cached() {
        let mut source = MockSource::new();
        source.expect_block().never();
        let driver = driver(source);
        driver.advance(block(1)).await;

        let found = driver.get_block(Revision::Number(1)).await.unwrap();
        assert_eq!(found, Some(block(1)));
    }

    #[tokio::test]
    async fn test_code_is_fetched_once_per_head() {
        let mut source = MockSource::new();
        source
            .expect_code()
            .times(1)
            .returning(|_, _| Ok(Code { code: Bytes::from_static(&[0x60]) }));
        let driver = driver(source);
        driver.advance(block(1)).await;
        let addr = address!("0x7567d83b7b8d80addcb281a71d54fc7b3364ffed");

        let first = driver.get_code(addr, Revision::Number(1)).await.unwrap();
        let second = driver.get_code(addr, Revision::Id(block(1).id)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_explain_is_keyed_by_argument() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = MockSource::new();
        let counter = Arc::clone(&calls);
        source.expect_explain().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![VmOutput::default()])
        });
        let driver = driver(source);
        driver.advance(block(1)).await;

        let a = ExplainArg { gas: Some(1), ..Default::default() };
        let b = ExplainArg { gas: Some(2), ..Default::default() };
        driver.explain(&a, Revision::Number(1), Some(&[])).await.unwrap();
        driver.explain(&a, Revision::Number(1), Some(&[])).await.unwrap();
        driver.explain(&b, Revision::Number(1), Some(&[])).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_filters_are_cached_at_head() {
        let mut source = MockSource::new();
        source.expect_filter_transfer_logs().times(2).returning(|_| Ok(Vec::new()));
        let driver = driver(source);
        driver.advance(block(1)).await;
        let filter = TransferFilter {
            range: FilterRange { unit: RangeUnit::Block, from: 0, to: 1 },
            options: FilterOptions { offset: 0, limit: 10 },
            criteria_set: Vec::new(),
            order: Order::Asc,
        };

        driver.filter_transfer_logs(&filter).await.unwrap();
        driver.filter_transfer_logs(&filter).await.unwrap();

        // a new head invalidates the result
        driver.advance(block(2)).await;
        driver.filter_transfer_logs(&filter).await.unwrap();
    }

    #[tokio::test]
    async fn test_transaction_uses_current_head() {
        let mut source = MockSource::new();
        source
            .expect_transaction()
            .withf(|_, head| *head == B256::with_last_byte(3))
            .times(1)
            .returning(|_, _| Ok(None));
        let driver = driver(source);
        driver.advance(block(3)).await;

        assert_eq!(driver.get_transaction(B256::repeat_byte(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let mut source = MockSource::new();
        source.expect_account().returning(|_, _| Err(SourceError));
        let driver = driver(source);

        let err = driver.get_account(Address::ZERO, Revision::Number(0)).await.unwrap_err();
        assert!(matches!(err, DriverError::Source(SourceError)));
        assert!(err.as_source().is_some());
        assert_eq!(err.to_string(), "source unavailable");
    }

    #[tokio::test]
    async fn test_summaries_refresh_per_head() {
        let mut source = MockSource::new();
        source.expect_candidates().times(2).returning(|| Ok(Vec::new()));
        source.expect_auction().times(1).returning(|| Ok(Some(Auction::default())));
        let driver = driver(source);
        driver.advance(block(1)).await;

        driver.get_candidates().await.unwrap();
        driver.get_candidates().await.unwrap();
        assert!(driver.get_auction().await.unwrap().is_some());
        assert!(driver.get_auction().await.unwrap().is_some());

        driver.advance(block(2)).await;
        driver.get_candidates().await.unwrap();
    }

    #[test]
    fn test_progress() {
        let driver = driver(MockSource::new());
        // head is genesis at t = 1000
        assert_eq!(driver.progress(1_010), Some(1.0));
        assert_eq!(driver.progress(3_000), Some(0.0));
        assert_eq!(driver.progress(999), Some(1.0));
        assert_eq!(driver.progress(0), Some(1.0));

        driver.head.send_replace(block(100).head());
        // head at 2000, genesis at 1000
        assert_eq!(driver.progress(3_000), Some(0.5));
    }
}
