//! The boundary a node transport implements.

use crate::{EventFilter, ExplainArg, TransferFilter};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use meter_cache::{
    Account, Auction, AuctionSummary, Block, Bucket, Candidate, Code, EventLog, Receipt, Revision,
    Stakeholder, Storage, Transaction, TransferLog, VmOutput,
};
use std::fmt::Debug;

/// Uncached access to a node's query API.
///
/// `Ok(None)` means the entity does not exist at the requested point; transport failures are
/// reported through [`ChainSource::Error`].
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait ChainSource: Debug + Send + Sync {
    /// Transport error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the node's best block.
    async fn best_block(&self) -> Result<Block, Self::Error>;

    /// Returns the block at `revision`.
    async fn block(&self, revision: Revision) -> Result<Option<Block>, Self::Error>;

    /// Returns transaction `id` as seen from block `head`.
    async fn transaction(&self, id: B256, head: B256) -> Result<Option<Transaction>, Self::Error>;

    /// Returns the receipt of transaction `id` as seen from block `head`.
    async fn receipt(&self, id: B256, head: B256) -> Result<Option<Receipt>, Self::Error>;

    /// Returns account `address` at `revision`.
    async fn account(&self, address: Address, revision: Revision) -> Result<Account, Self::Error>;

    /// Returns the code of `address` at `revision`.
    async fn code(&self, address: Address, revision: Revision) -> Result<Code, Self::Error>;

    /// Returns storage word `key` of `address` at `revision`.
    async fn storage(
        &self,
        address: Address,
        key: B256,
        revision: Revision,
    ) -> Result<Storage, Self::Error>;

    /// Simulates `arg` on top of `revision`.
    async fn explain(
        &self,
        arg: &ExplainArg,
        revision: Revision,
    ) -> Result<Vec<VmOutput>, Self::Error>;

    /// Returns events matching `filter`.
    async fn filter_event_logs(&self, filter: &EventFilter) -> Result<Vec<EventLog>, Self::Error>;

    /// Returns transfers matching `filter`.
    async fn filter_transfer_logs(
        &self,
        filter: &TransferFilter,
    ) -> Result<Vec<TransferLog>, Self::Error>;

    /// Returns all staking candidates.
    async fn candidates(&self) -> Result<Vec<Candidate>, Self::Error>;

    /// Returns all staking buckets.
    async fn buckets(&self) -> Result<Vec<Bucket>, Self::Error>;

    /// Returns all stakeholders.
    async fn stakeholders(&self) -> Result<Vec<Stakeholder>, Self::Error>;

    /// Returns the auction in progress, if any.
    async fn auction(&self) -> Result<Option<Auction>, Self::Error>;

    /// Returns summaries of past auctions.
    async fn auction_summaries(&self) -> Result<Vec<AuctionSummary>, Self::Error>;
}
