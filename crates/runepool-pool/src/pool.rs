//! Committed state of one pool.
//!
//! `reserves` is a cached projection of `utxos`; every transition rechecks
//! that the two agree before the new state is handed out.

use runepool_types::{
    Address, Amount, CoinId, ExchangeError, OutPoint, PoolInfo, PoolKeys, Reserves, Result, Utxo,
};

use crate::utxo_set::UtxoSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    name: String,
    keys: PoolKeys,
    /// Token this pool trades against the native coin.
    token: CoinId,
    /// Token amount the genesis deposit must carry.
    deposit_amount: Amount,
    attributes: String,
    nonce: u64,
    reserves: Reserves,
    utxos: UtxoSet,
}

impl Pool {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        keys: PoolKeys,
        token: CoinId,
        deposit_amount: Amount,
        attributes: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            keys,
            token,
            deposit_amount,
            attributes: attributes.into(),
            nonce: 0,
            reserves: Reserves::new(),
            utxos: UtxoSet::new(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.keys.address
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn keys(&self) -> &PoolKeys {
        &self.keys
    }

    #[must_use]
    pub fn token(&self) -> CoinId {
        self.token
    }

    #[must_use]
    pub fn deposit_amount(&self) -> Amount {
        self.deposit_amount
    }

    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    #[must_use]
    pub fn reserves(&self) -> &Reserves {
        &self.reserves
    }

    #[must_use]
    pub fn utxos(&self) -> &UtxoSet {
        &self.utxos
    }

    /// A pool is funded once its genesis deposit has been admitted.
    #[must_use]
    pub fn is_funded(&self) -> bool {
        !self.utxos.is_empty()
    }

    /// Output carrying the most native value. Receive outputs may bundle
    /// native value with a token, so this is not necessarily native-only.
    #[must_use]
    pub fn native_utxo(&self) -> Option<&Utxo> {
        self.utxos
            .iter()
            .filter(|u| u.sats > 0)
            .max_by_key(|u| (u.sats, u.maybe_rune.is_none()))
    }

    /// Admit the genesis outputs. The nonce is not advanced.
    pub(crate) fn fund(&mut self, legs: Vec<Utxo>) -> Result<()> {
        let mut utxos = self.utxos.clone();
        utxos.receive(legs)?;
        self.reserves = utxos.projected_reserves()?;
        self.utxos = utxos;
        Ok(())
    }

    /// Compute the post-state of a transition without touching `self`.
    ///
    /// The returned pool carries `nonce + 1`; it becomes committed state only
    /// through [`crate::PoolRegistry::commit`].
    pub fn transition(
        &self,
        spend: &[OutPoint],
        receive: Vec<Utxo>,
        post: Reserves,
    ) -> Result<Pool> {
        let mut next = self.clone();
        next.utxos.spend(spend)?;
        next.utxos.receive(receive)?;
        next.reserves = post;
        next.nonce = self.nonce.checked_add(1).ok_or(ExchangeError::Overflow)?;
        next.check_projection()?;
        Ok(next)
    }

    /// Verify the cached reserves equal the projection of the Utxo set.
    pub fn check_projection(&self) -> Result<()> {
        let projected = self.utxos.projected_reserves()?;
        if projected != self.reserves {
            tracing::error!(
                pool = %self.keys.address,
                ?projected,
                cached = ?self.reserves,
                "Reserve projection drift"
            );
            return Err(ExchangeError::InvalidState(format!(
                "pool {} reserves diverge from utxo set",
                self.keys.address
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn info(&self) -> PoolInfo {
        PoolInfo {
            key: self.keys.untweaked.clone(),
            key_derivation_path: self.keys.derivation_path.clone(),
            name: self.name.clone(),
            address: self.keys.address.clone(),
            nonce: self.nonce,
            coin_reserved: self.reserves.coin_balances(),
            btc_reserved: self.reserves.native,
            utxos: self.utxos.to_vec(),
            attributes: self.attributes.clone(),
        }
    }
}
