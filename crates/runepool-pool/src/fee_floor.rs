//! Minimal transaction value under zero-confirmation load.
//!
//! `floor(q) = base + step * min(q, max_depth)`. The floor never falls as
//! the queue grows, and stops rising once `max_depth` is reached.

use runepool_types::{ExchangeConfig, ExchangeError, Result, Satoshi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeFloor {
    base: Satoshi,
    step: Satoshi,
    max_depth: u32,
}

impl FeeFloor {
    #[must_use]
    pub fn new(base: Satoshi, step: Satoshi, max_depth: u32) -> Self {
        Self {
            base,
            step,
            max_depth,
        }
    }

    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(
            config.min_tx_value,
            config.queue_floor_step,
            config.max_queue_depth,
        )
    }

    /// Floor for a queue of `queue_len` unconfirmed transactions.
    #[must_use]
    pub fn minimal(&self, queue_len: u32) -> Satoshi {
        let depth = Satoshi::from(queue_len.min(self.max_depth));
        self.base.saturating_add(self.step.saturating_mul(depth))
    }

    /// # Errors
    /// `TooSmallFunds` if `value` is below the floor.
    pub fn check(&self, value: Satoshi, queue_len: u32) -> Result<()> {
        let floor = self.minimal(queue_len);
        if value < floor {
            tracing::warn!(value, floor, queue_len, "Intent below minimal tx value");
            return Err(ExchangeError::TooSmallFunds);
        }
        Ok(())
    }
}
