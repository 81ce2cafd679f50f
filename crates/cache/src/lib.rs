#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod types;
pub use types::{
    Account, Auction, AuctionSummary, AuctionTx, Block, BlockHead, BlockNumber, Bucket, Candidate,
    Clause, ClauseOutput, Code, Event, EventLog, HeadBloom, LogMeta, Receipt, ReceiptMeta,
    Revision, Stakeholder, Storage, Transaction, Transfer, TransferLog, TxMeta, VmOutput,
};

mod config;
pub use config::CacheConfig;

mod bloom;
pub use bloom::{BloomError, BloomFilter};

mod energy;
pub use energy::{AccountSnapshot, ENERGY_GROWTH_RATE};

mod irreversible;
pub use irreversible::IrreversibleStore;

mod tied;
pub use tied::{TiedEntry, TiedKey, TiedValue};

mod slot;
pub use slot::Slot;

mod window;
pub use window::{ReversibleWindow, Rollback};

mod summary;
pub use summary::SummaryCache;

mod engine;
pub use engine::{CacheStats, ChainCache};

#[cfg(feature = "metrics")]
mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::Metrics;
