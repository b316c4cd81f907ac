//! Pool registry: address-keyed committed pool state.
//!
//! The registry only ever holds finalized state. Staged post-states live in
//! the settlement coordinator until [`PoolRegistry::commit`] swaps them in.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use runepool_types::{Address, ExchangeError, PoolInfo, Result, Utxo};

use crate::pool::Pool;

#[derive(Debug, Default)]
pub struct PoolRegistry {
    /// Ordered by address so pagination is a stable walk.
    pools: BTreeMap<Address, Pool>,
    /// Untweaked key hex → address.
    by_key: HashMap<String, Address>,
}

impl PoolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new pool.
    ///
    /// # Errors
    /// `PoolAlreadyExists` if the address or key is taken.
    pub fn register(&mut self, pool: Pool) -> Result<()> {
        let address = pool.address().clone();
        let key = pool.keys().untweaked.clone();
        if self.pools.contains_key(&address) || self.by_key.contains_key(&key) {
            return Err(ExchangeError::PoolAlreadyExists);
        }
        tracing::info!(
            pool = %address,
            name = pool.name(),
            token = %pool.token(),
            "Pool registered"
        );
        self.by_key.insert(key, address.clone());
        self.pools.insert(address, pool);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, address: &str) -> Option<&Pool> {
        self.pools.get(address)
    }

    /// Like [`Self::get`] but failing with `PoolAddressNotFound`.
    pub fn require(&self, address: &str) -> Result<&Pool> {
        self.get(address).ok_or(ExchangeError::PoolAddressNotFound)
    }

    /// Resolve a pool key (untweaked key hex) to its address.
    pub fn address_for_key(&self, key: &str) -> Result<&Address> {
        self.by_key.get(key).ok_or(ExchangeError::PoolAddressNotFound)
    }

    #[must_use]
    pub fn pool_info(&self, address: &str) -> Option<PoolInfo> {
        self.get(address).map(Pool::info)
    }

    /// Page of pools strictly after `from` in address order.
    #[must_use]
    pub fn pool_list(&self, from: Option<&str>, limit: usize) -> Vec<PoolInfo> {
        let lower = from.map_or(Bound::Unbounded, |f| Bound::Excluded(f.to_string()));
        self.pools
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, pool)| pool.info())
            .collect()
    }

    /// Admit a pool's genesis deposit: one token leg and one native leg.
    ///
    /// The legs may come in either order. Their token balances are summed
    /// and must match the pool's declared deposit exactly.
    pub fn deposit(&mut self, address: &str, leg_a: Utxo, leg_b: Utxo) -> Result<()> {
        let pool = self
            .pools
            .get_mut(address)
            .ok_or(ExchangeError::PoolAddressNotFound)?;
        if pool.is_funded() {
            return Err(ExchangeError::InvalidState(format!(
                "pool {address} already funded"
            )));
        }

        if let (Some(a), Some(b)) = (leg_a.rune_id(), leg_b.rune_id()) {
            if a != b {
                return Err(ExchangeError::RuneIdNotMatch(a.to_string(), b.to_string()));
            }
        }
        let expected = pool.token();
        let actual = leg_a
            .rune_id()
            .or(leg_b.rune_id())
            .ok_or(ExchangeError::InvalidInput)?;
        if actual != expected {
            return Err(ExchangeError::RuneIdNotMatch(
                expected.to_string(),
                actual.to_string(),
            ));
        }
        let deposited = runepool_types::ledger::add(leg_a.rune_amount(), leg_b.rune_amount())?;
        if deposited != pool.deposit_amount() {
            return Err(ExchangeError::DepositRuneBalanceIncorrect(
                pool.deposit_amount().to_string(),
                deposited.to_string(),
            ));
        }

        pool.fund(vec![leg_a, leg_b])?;
        tracing::info!(
            pool = %address,
            native = pool.reserves().native,
            token = %expected,
            amount = deposited,
            "Genesis deposit admitted"
        );
        Ok(())
    }

    /// Replace a pool's committed state with a staged post-state.
    ///
    /// # Errors
    /// `InvalidState` if the staged nonce is not exactly one past the
    /// committed nonce or the staged reserves drift from its Utxo set.
    pub fn commit(&mut self, staged: Pool) -> Result<()> {
        let current = self
            .pools
            .get_mut(staged.address())
            .ok_or(ExchangeError::PoolAddressNotFound)?;
        if current.nonce().checked_add(1) != Some(staged.nonce()) {
            return Err(ExchangeError::InvalidState(format!(
                "staged nonce {} does not follow committed nonce {}",
                staged.nonce(),
                current.nonce()
            )));
        }
        staged.check_projection()?;
        *current = staged;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
