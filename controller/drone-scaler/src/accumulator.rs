//! Pending-work accumulator
//!
//! Folds successive queue-depth readings into a single estimate. The rule is
//! asymmetric: a zero reading only decays the estimate by one, while a non-zero
//! reading grows it immediately. The estimate is unsigned and can never go
//! negative.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How a non-zero reading grows the estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IncrementPolicy {
    /// Add the reading itself (absolute queue depth)
    #[default]
    ByValue,
    /// Add one per non-zero reading
    ByOne,
}

/// Hysteretic pending-jobs estimate, owned by the poll loop
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    pending: u64,
    policy: IncrementPolicy,
}

impl Accumulator {
    pub fn new(policy: IncrementPolicy) -> Self {
        Self { pending: 0, policy }
    }

    /// Start from an existing estimate
    pub fn with_pending(policy: IncrementPolicy, pending: u64) -> Self {
        Self { pending, policy }
    }

    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Apply one reading and return the new estimate
    pub fn update(&mut self, reading: u64) -> u64 {
        if reading == 0 {
            self.pending = self.pending.saturating_sub(1);
        } else {
            let step = match self.policy {
                IncrementPolicy::ByValue => reading,
                IncrementPolicy::ByOne => 1,
            };
            self.pending = self.pending.saturating_add(step);
        }
        self.pending
    }
}
