#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::DriverError;

mod filter;
pub use filter::{
    EventCriteria, EventFilter, ExplainArg, FilterOptions, FilterRange, Order, RangeUnit,
    TransferCriteria, TransferFilter, cache_key, ties_of,
};

mod source;
pub use source::ChainSource;

mod driver;
pub use driver::Driver;

mod tracker;
pub use tracker::{HeadTracker, HeadTrackerConfig};

#[cfg(feature = "metrics")]
mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::Metrics;
