//! Metrics for the chain cache.

/// Container for metrics.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of lookups answered from the cache.
    pub const CACHE_HITS: &'static str = "meter_cache_hits_total";

    /// Identifier for the counter of lookups that invoked a fetch.
    pub const CACHE_MISSES: &'static str = "meter_cache_misses_total";

    /// Identifier for the counter of new heads handled.
    pub const NEW_HEADS: &'static str = "meter_cache_new_heads_total";

    /// Identifier for the histogram of slots discarded by a fork rollback.
    pub const ROLLBACK_DEPTH: &'static str = "meter_cache_rollback_depth";

    /// Identifier for the counter of slots moved into the irreversible store.
    pub const SLOTS_EVICTED: &'static str = "meter_cache_slots_evicted_total";

    /// Entity kind label values.
    pub const KINDS: [&'static str; 6] = ["block", "tx", "receipt", "account", "tied", "summary"];

    /// Initializes metrics for the chain cache.
    ///
    /// This does two things:
    /// * Describes various metrics.
    /// * Initializes metrics to 0 so they can be queried immediately.
    pub fn init() {
        Self::describe();
        Self::zero();
    }

    /// Describes metrics used in [`meter_cache`][crate].
    pub fn describe() {
        metrics::describe_counter!(
            Self::CACHE_HITS,
            metrics::Unit::Count,
            "Number of lookups answered from the cache"
        );
        metrics::describe_counter!(
            Self::CACHE_MISSES,
            metrics::Unit::Count,
            "Number of lookups that fetched from the node"
        );
        metrics::describe_counter!(Self::NEW_HEADS, metrics::Unit::Count, "Number of new heads");
        metrics::describe_histogram!(
            Self::ROLLBACK_DEPTH,
            metrics::Unit::Count,
            "Number of slots discarded per fork rollback"
        );
        metrics::describe_counter!(
            Self::SLOTS_EVICTED,
            metrics::Unit::Count,
            "Number of slots moved into the irreversible store"
        );
    }

    /// Initializes metrics to `0` so they can be queried immediately.
    pub fn zero() {
        for kind in Self::KINDS {
            metrics::counter!(Self::CACHE_HITS, "kind" => kind).increment(0);
            metrics::counter!(Self::CACHE_MISSES, "kind" => kind).increment(0);
        }
        metrics::counter!(Self::NEW_HEADS).increment(0);
        metrics::counter!(Self::SLOTS_EVICTED).increment(0);
    }

    pub(crate) fn record_hit(kind: &'static str) {
        metrics::counter!(Self::CACHE_HITS, "kind" => kind).increment(1);
    }

    pub(crate) fn record_miss(kind: &'static str) {
        metrics::counter!(Self::CACHE_MISSES, "kind" => kind).increment(1);
    }
}
