//! Per-pool reserve conservation.
//!
//! Invariant checked before every commit:
//! ```text
//! ∀ pool, ∀ asset: reserves == Σ(inflow) − Σ(outflow)
//! ```
//!
//! The genesis deposit counts as inflow. A violation means the staged
//! post-state was not produced by the recorded flows and the commit is
//! refused.

use std::collections::HashMap;

use runepool_types::{Address, CoinBalance, ExchangeError, Reserves, Result};

#[derive(Debug, Clone, Default)]
struct Flows {
    inflow: Reserves,
    outflow: Reserves,
}

impl Flows {
    fn with(&self, inflow: &Reserves, outflow: &Reserves) -> Result<Flows> {
        let mut next = self.clone();
        next.inflow.merge(inflow)?;
        next.outflow.merge(outflow)?;
        Ok(next)
    }

    fn expected(&self) -> Result<Reserves> {
        let mut expected = self.inflow.clone();
        let out = std::iter::once(CoinBalance::native(self.outflow.native))
            .chain(self.outflow.coin_balances());
        for coin in out {
            expected.debit(&coin)?;
        }
        Ok(expected)
    }
}

#[derive(Debug, Default)]
pub struct ReserveConservation {
    flows: HashMap<Address, Flows>,
}

impl ReserveConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the recorded flows of `pool` account for.
    pub fn expected_reserves(&self, pool: &str) -> Result<Reserves> {
        self.flows.get(pool).map_or_else(|| Ok(Reserves::new()), Flows::expected)
    }

    /// Check that applying one more (`inflow`, `outflow`) to `pool` yields
    /// exactly `actual`, without recording anything.
    ///
    /// # Errors
    /// `InvalidState` on any mismatch, including an outflow the recorded
    /// inflow cannot cover.
    pub fn check(
        &self,
        pool: &str,
        inflow: &Reserves,
        outflow: &Reserves,
        actual: &Reserves,
    ) -> Result<()> {
        let current = self.flows.get(pool).cloned().unwrap_or_default();
        let expected = current
            .with(inflow, outflow)
            .and_then(|next| next.expected())
            .map_err(|err| violation(pool, &err.to_string()))?;
        if &expected != actual {
            tracing::error!(pool, ?expected, ?actual, "Reserve conservation violated");
            return Err(violation(pool, "reserves diverge from recorded flows"));
        }
        Ok(())
    }

    pub fn record(&mut self, pool: &str, inflow: &Reserves, outflow: &Reserves) -> Result<()> {
        let next = self
            .flows
            .get(pool)
            .cloned()
            .unwrap_or_default()
            .with(inflow, outflow)?;
        self.flows.insert(pool.to_string(), next);
        Ok(())
    }
}

fn violation(pool: &str, reason: &str) -> ExchangeError {
    ExchangeError::InvalidState(format!("conservation violated for pool {pool}: {reason}"))
}
