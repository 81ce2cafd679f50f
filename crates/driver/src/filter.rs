//! Arguments of simulated calls and log filters.
//!
//! These are sent to the node as JSON bodies, and the same JSON encoding is hashed into the
//! key the result is cached under. Optional fields are omitted rather than written as `null`.

use alloy_primitives::{Address, B256, Bytes, U256};
use blake2::{Blake2b, Digest, digest::consts::U32};
use meter_cache::Clause;
use serde::{Deserialize, Serialize};

/// A simulated call of one or more clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainArg {
    /// Clauses to execute.
    pub clauses: Vec<Clause>,
    /// Address the call is made from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<Address>,
    /// Gas limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    /// Gas price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

/// Unit a [`FilterRange`] is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeUnit {
    /// Block numbers.
    #[default]
    Block,
    /// Block timestamps.
    Time,
}

/// Inclusive range of blocks a filter scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRange {
    /// Unit of `from` and `to`.
    pub unit: RangeUnit,
    /// First block number or timestamp.
    pub from: u64,
    /// Last block number or timestamp.
    pub to: u64,
}

/// Pagination of filter results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Number of matches to skip.
    pub offset: u64,
    /// Maximum number of matches to return.
    pub limit: u64,
}

/// Order of filter results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Oldest first.
    #[default]
    Asc,
    /// Newest first.
    Desc,
}

/// Matches events by emitting contract and topics. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EventCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic0: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic1: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic2: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic3: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic4: Option<B256>,
}

/// Matches transfers by origin, sender and recipient. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCriteria {
    /// Origin of the transaction carrying the transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_origin: Option<Address>,
    /// Sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    /// Recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Address>,
}

/// Event log filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    /// Blocks to scan.
    pub range: FilterRange,
    /// Pagination.
    pub options: FilterOptions,
    /// An event matches if it matches any of the criteria.
    pub criteria_set: Vec<EventCriteria>,
    /// Result order.
    pub order: Order,
}

/// Transfer log filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFilter {
    /// Blocks to scan.
    pub range: FilterRange,
    /// Pagination.
    pub options: FilterOptions,
    /// A transfer matches if it matches any of the criteria.
    pub criteria_set: Vec<TransferCriteria>,
    /// Result order.
    pub order: Order,
}

/// Digest of the JSON encoding of `arg`.
pub fn cache_key<T: Serialize>(arg: &T) -> Result<B256, serde_json::Error> {
    let json = serde_json::to_vec(arg)?;
    Ok(B256::from_slice(Blake2b::<U32>::digest(&json).as_slice()))
}

/// Byte form of addresses, for use as the ties of a cached call.
pub fn ties_of(addresses: &[Address]) -> Vec<Bytes> {
    addresses.iter().map(|address| Bytes::copy_from_slice(address.as_slice())).collect()
}
