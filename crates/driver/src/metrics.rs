//! Metrics for the driver.

/// Container for metrics.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of failed best block polls.
    pub const HEAD_POLL_ERRORS: &'static str = "meter_driver_head_poll_errors_total";

    /// Identifier for the gauge of the current head number.
    pub const HEAD_NUMBER: &'static str = "meter_driver_head_number";

    /// Initializes metrics for the driver, including those of the cache.
    ///
    /// This does two things:
    /// * Describes various metrics.
    /// * Initializes metrics to 0 so they can be queried immediately.
    pub fn init() {
        Self::describe();
        Self::zero();
        meter_cache::Metrics::init();
    }

    /// Describes metrics used in [`meter_driver`][crate].
    pub fn describe() {
        metrics::describe_counter!(
            Self::HEAD_POLL_ERRORS,
            metrics::Unit::Count,
            "Number of failed best block polls"
        );
        metrics::describe_gauge!(Self::HEAD_NUMBER, "Number of the current head");
    }

    /// Initializes metrics to `0` so they can be queried immediately.
    pub fn zero() {
        metrics::counter!(Self::HEAD_POLL_ERRORS).increment(0);
        metrics::gauge!(Self::HEAD_NUMBER).set(0.0);
    }
}
