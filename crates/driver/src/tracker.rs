//! Polls the node for its best block and feeds new heads to the driver.

use crate::{ChainSource, Driver};
use meter_cache::BlockHead;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Configuration for the [`HeadTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeadTrackerConfig {
    /// Seconds between two polls of the best block.
    pub poll_interval_secs: u64,
}

impl HeadTrackerConfig {
    /// Default poll interval in seconds.
    pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 8;

    /// Time between two polls. Never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Default for HeadTrackerConfig {
    fn default() -> Self {
        Self { poll_interval_secs: Self::DEFAULT_POLL_INTERVAL_SECS }
    }
}

/// Polls the best block and advances the driver's head.
#[derive(Debug)]
pub struct HeadTracker<S> {
    driver: Arc<Driver<S>>,
    config: HeadTrackerConfig,
    cancellation: CancellationToken,
}

impl<S: ChainSource> HeadTracker<S> {
    /// Creates a new [`HeadTracker`].
    pub const fn new(
        driver: Arc<Driver<S>>,
        config: HeadTrackerConfig,
        cancellation: CancellationToken,
    ) -> Self {
        Self { driver, config, cancellation }
    }

    /// Polls until cancelled. The first poll happens immediately.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => {
                    tracing::info!(
                        target: "driver::head_tracker",
                        "Head tracker cancellation requested, stopping polling"
                    );
                    break;
                }
                _ = self.tick(&mut interval) => {}
            }
        }
    }

    async fn tick(&self, interval: &mut Interval) {
        interval.tick().await;
        self.poll().await;
    }

    /// Polls the best block once, returning the new head if it moved.
    ///
    /// Poll failures are logged and otherwise ignored; the next poll retries.
    pub async fn poll(&self) -> Option<BlockHead> {
        match self.driver.source().best_block().await {
            Ok(best) => self.driver.advance(best).await,
            Err(err) => {
                tracing::warn!(target: "driver::head_tracker", %err, "Failed to poll best block");

                #[cfg(feature = "metrics")]
                metrics::counter!(crate::Metrics::HEAD_POLL_ERRORS).increment(1);

                None
            }
        }
    }
}
