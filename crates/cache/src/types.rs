//! Chain entities served through the cache.
//!
//! These mirror the node's query API responses. Field names serialize in camelCase so the
//! types can be decoded straight from the node's JSON bodies by whatever transport feeds the
//! cache.

use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A block number.
pub type BlockNumber = u64;

/// Identity and parent linkage of a block, as announced by the head tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHead {
    /// The block id.
    pub id: B256,
    /// The block number.
    pub number: BlockNumber,
    /// The id of the parent block.
    #[serde(rename = "parentID")]
    pub parent_id: B256,
    /// Block timestamp in seconds.
    pub timestamp: u64,
    /// The epoch the block belongs to.
    pub epoch: u64,
}

impl BlockHead {
    /// Creates a new [`BlockHead`].
    pub const fn new(
        id: B256,
        number: BlockNumber,
        parent_id: B256,
        timestamp: u64,
        epoch: u64,
    ) -> Self {
        Self { id, number, parent_id, timestamp, epoch }
    }
}

/// A full block payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// The block id.
    pub id: B256,
    /// The block number.
    pub number: BlockNumber,
    /// The id of the parent block.
    #[serde(rename = "parentID")]
    pub parent_id: B256,
    /// Block timestamp in seconds.
    pub timestamp: u64,
    /// The epoch the block belongs to.
    pub epoch: u64,
    /// Encoded size in bytes.
    pub size: u64,
    /// Gas limit of the block.
    pub gas_limit: u64,
    /// Gas consumed by all transactions in the block.
    pub gas_used: u64,
    /// Accumulated score of the chain up to this block.
    pub total_score: u64,
    /// Receiver of the block reward.
    pub beneficiary: Address,
    /// Block proposer.
    pub signer: Address,
    /// Root of the transactions trie.
    pub txs_root: B256,
    /// Root of the state trie after applying this block.
    pub state_root: B256,
    /// Root of the receipts trie.
    pub receipts_root: B256,
    /// Whether the block is on the canonical (trunk) chain.
    pub is_trunk: bool,
    /// Ids of the transactions included in the block.
    pub transactions: Vec<B256>,
}

impl Block {
    /// Returns the [`BlockHead`] of this block.
    pub const fn head(&self) -> BlockHead {
        BlockHead::new(self.id, self.number, self.parent_id, self.timestamp, self.epoch)
    }
}

/// A single clause of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Amount transferred.
    pub value: U256,
    /// Call data.
    pub data: Bytes,
}

/// Location of a transaction in the chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMeta {
    /// Id of the including block.
    #[serde(rename = "blockID")]
    pub block_id: B256,
    /// Number of the including block.
    pub block_number: BlockNumber,
    /// Timestamp of the including block.
    pub block_timestamp: u64,
}

/// A transaction as returned by the node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction id.
    pub id: B256,
    /// Last byte of the genesis id.
    pub chain_tag: u8,
    /// Reference to a recent block.
    pub block_ref: Bytes,
    /// Expiration in blocks, counted from `block_ref`.
    pub expiration: u32,
    /// Clauses executed by the transaction.
    pub clauses: Vec<Clause>,
    /// Gas price coefficient.
    pub gas_price_coef: u8,
    /// Gas provided.
    pub gas: u64,
    /// Signer of the transaction.
    pub origin: Address,
    /// Transaction nonce.
    pub nonce: U256,
    /// Id of a transaction this one depends on.
    pub depends_on: Option<B256>,
    /// Encoded size in bytes.
    pub size: u64,
    /// Location of the transaction.
    pub meta: TxMeta,
}

/// An event emitted during execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<B256>,
    /// Non-indexed data.
    pub data: Bytes,
}

/// A value transfer performed during execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Sender of the value.
    pub sender: Address,
    /// Recipient of the value.
    pub recipient: Address,
    /// Amount transferred.
    pub amount: U256,
}

/// Output of a single clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseOutput {
    /// Address of the created contract, if any.
    pub contract_address: Option<Address>,
    /// Emitted events.
    pub events: Vec<Event>,
    /// Performed transfers.
    pub transfers: Vec<Transfer>,
}

/// Location of a receipt in the chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMeta {
    /// Id of the including block.
    #[serde(rename = "blockID")]
    pub block_id: B256,
    /// Number of the including block.
    pub block_number: BlockNumber,
    /// Timestamp of the including block.
    pub block_timestamp: u64,
    /// Id of the transaction.
    #[serde(rename = "txID")]
    pub tx_id: B256,
    /// Signer of the transaction.
    pub tx_origin: Address,
}

/// A transaction receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Gas consumed.
    pub gas_used: u64,
    /// Account that paid for gas.
    pub gas_payer: Address,
    /// Energy paid.
    pub paid: U256,
    /// Reward to the block proposer.
    pub reward: U256,
    /// Whether execution reverted.
    pub reverted: bool,
    /// Per-clause outputs.
    pub outputs: Vec<ClauseOutput>,
    /// Location of the receipt.
    pub meta: ReceiptMeta,
}

/// Account state at a revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Spendable balance.
    pub balance: U256,
    /// Energy (gas token) balance.
    pub energy: U256,
    /// Balance locked in staking buckets.
    #[serde(rename = "boundbalance")]
    pub bound_balance: U256,
    /// Energy locked in staking buckets.
    #[serde(rename = "boundenergy")]
    pub bound_energy: U256,
    /// Whether the account has contract code.
    pub has_code: bool,
}

/// Contract code of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    /// The code bytes.
    pub code: Bytes,
}

/// A single storage value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    /// The stored word.
    pub value: B256,
}

/// Result of simulating one clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmOutput {
    /// Return data.
    pub data: Bytes,
    /// Address of the created contract, if any.
    pub contract_address: Option<Address>,
    /// Emitted events.
    pub events: Vec<Event>,
    /// Performed transfers.
    pub transfers: Vec<Transfer>,
    /// Gas consumed.
    pub gas_used: u64,
    /// Whether execution reverted.
    pub reverted: bool,
    /// VM error message, empty on success.
    pub vm_error: String,
}

/// Where a filtered log was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMeta {
    /// Id of the including block.
    #[serde(rename = "blockID")]
    pub block_id: B256,
    /// Number of the including block.
    pub block_number: BlockNumber,
    /// Timestamp of the including block.
    pub block_timestamp: u64,
    /// Id of the emitting transaction.
    #[serde(rename = "txID")]
    pub tx_id: B256,
    /// Signer of the emitting transaction.
    pub tx_origin: Address,
}

/// An event returned by an event-log filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    /// The event.
    #[serde(flatten)]
    pub event: Event,
    /// Where it was emitted.
    pub meta: LogMeta,
}

/// A transfer returned by a transfer-log filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLog {
    /// The transfer.
    #[serde(flatten)]
    pub transfer: Transfer,
    /// Where it happened.
    pub meta: LogMeta,
}

/// A staking candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Display name.
    pub name: String,
    /// Candidate address.
    pub address: Address,
    /// Consensus public key.
    pub pub_key: String,
    /// Advertised IP address.
    pub ip_addr: String,
    /// Advertised port.
    pub port: u16,
    /// Sum of votes in all buckets pointing at this candidate.
    pub total_votes: U256,
    /// Commission rate.
    pub commission: u64,
    /// Buckets voting for this candidate.
    pub buckets: Vec<B256>,
}

/// A staking bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Bucket id.
    pub id: B256,
    /// Owner of the staked value.
    pub owner: Address,
    /// Staked value.
    pub value: U256,
    /// Token kind.
    pub token: u8,
    /// Creation time in seconds.
    pub create_time: u64,
    /// Voted candidate.
    pub candidate: Address,
    /// Total votes, including bonus.
    pub total_votes: U256,
    /// Whether the bucket has been unbounded.
    pub unbounded: bool,
}

/// Aggregated stake of one holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stakeholder {
    /// Holder address.
    pub holder: Address,
    /// Total staked value.
    pub total_stake: U256,
    /// Owned buckets.
    pub buckets: Vec<B256>,
}

/// A bid placed in an auction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionTx {
    /// Bidder address.
    pub address: Address,
    /// Bid amount.
    pub amount: U256,
    /// Bid count.
    pub count: u64,
    /// Bid nonce.
    pub nonce: u64,
    /// Bid time in seconds.
    pub last_time: u64,
}

/// The auction currently in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    /// Auction id.
    pub auction_id: B256,
    /// First block of the auction.
    pub start_height: BlockNumber,
    /// First epoch of the auction.
    pub start_epoch: u64,
    /// Last block of the auction.
    pub end_height: BlockNumber,
    /// Last epoch of the auction.
    pub end_epoch: u64,
    /// Amount released for sale.
    pub released_mtrg: U256,
    /// Amount reserved.
    pub reserved_mtrg: U256,
    /// Reserve price.
    pub reserved_price: U256,
    /// Total bids received.
    pub received_mtr: U256,
    /// Bids so far.
    pub auction_txs: Vec<AuctionTx>,
}

/// Summary of a finished auction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSummary {
    /// Auction id.
    pub auction_id: B256,
    /// First block of the auction.
    pub start_height: BlockNumber,
    /// Last block of the auction.
    pub end_height: BlockNumber,
    /// Amount released for sale.
    pub released_mtrg: U256,
    /// Amount reserved.
    pub reserved_mtrg: U256,
    /// Reserve price.
    pub reserved_price: U256,
    /// Clearing price.
    pub actual_price: U256,
    /// Amount left unsold.
    pub left_over: U256,
    /// Total bids received.
    pub received_mtr: U256,
}

/// A point in chain history that a query is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Revision {
    /// A block id.
    Id(B256),
    /// A block number.
    Number(BlockNumber),
}

impl Revision {
    /// Returns true if `head` is the block this revision points at.
    pub fn matches(&self, head: &BlockHead) -> bool {
        match self {
            Self::Id(id) => *id == head.id,
            Self::Number(number) => *number == head.number,
        }
    }
}

impl From<B256> for Revision {
    fn from(id: B256) -> Self {
        Self::Id(id)
    }
}

impl From<BlockNumber> for Revision {
    fn from(number: BlockNumber) -> Self {
        Self::Number(number)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// Raw bloom filter announced alongside a new head.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadBloom {
    /// Hex-encoded filter bits, `0x` prefix optional.
    pub bits: String,
    /// Number of hash functions.
    pub k: u32,
}

impl HeadBloom {
    /// Creates a new [`HeadBloom`].
    pub fn new(bits: impl Into<String>, k: u32) -> Self {
        Self { bits: bits.into(), k }
    }
}
