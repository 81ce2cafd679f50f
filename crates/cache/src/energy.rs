//! Time-projected energy accrual for cached account snapshots.
//!
//! Energy grows linearly with balance and elapsed time. A snapshot captured at one timestamp can
//! therefore answer for any later timestamp without a refetch, assuming the balance did not
//! change in between.

use crate::Account;
use alloy_primitives::{U256, U512};

/// Energy generated per unit of balance per second, scaled by `1e18`.
pub const ENERGY_GROWTH_RATE: u64 = 5_000_000_000;

const UNIT: u64 = 1_000_000_000_000_000_000;

/// An account as fetched at a known timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    account: Account,
    captured_at: u64,
}

impl AccountSnapshot {
    /// Creates a snapshot of `account` captured at `captured_at`.
    pub const fn new(account: Account, captured_at: u64) -> Self {
        Self { account, captured_at }
    }

    /// The account fields as captured.
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Timestamp the snapshot was captured at.
    pub const fn captured_at(&self) -> u64 {
        self.captured_at
    }

    /// Projected energy at `timestamp`.
    ///
    /// Timestamps before capture return the captured energy; accrual is never negative.
    pub fn energy_at(&self, timestamp: u64) -> U256 {
        if timestamp < self.captured_at {
            return self.account.energy;
        }
        let elapsed = U512::from(timestamp - self.captured_at);
        let accrued = U512::from(self.account.balance) * elapsed * U512::from(ENERGY_GROWTH_RATE) /
            U512::from(UNIT);
        U256::saturating_from(accrued + U512::from(self.account.energy))
    }

    /// The captured account with energy projected to `timestamp`.
    pub fn snapshot(&self, timestamp: u64) -> Account {
        Account { energy: self.energy_at(timestamp), ..self.account.clone() }
    }
}
