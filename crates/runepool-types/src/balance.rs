//! Balance ledger: exact unsigned arithmetic over coin and token amounts.
//!
//! Every reserve and account mutation in the workspace routes through
//! [`ledger`]. Nothing wraps: overflow is [`ExchangeError::Overflow`] and
//! an over-debit is [`ExchangeError::InsufficientFunds`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CoinId, ExchangeError, Result};

/// Token amount (Rune balances, rewards).
pub type Amount = u128;

/// Native coin amount.
pub type Satoshi = u64;

/// An amount of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinBalance {
    pub id: CoinId,
    pub value: Amount,
}

impl CoinBalance {
    #[must_use]
    pub fn new(id: CoinId, value: Amount) -> Self {
        Self { id, value }
    }

    #[must_use]
    pub fn native(sats: Satoshi) -> Self {
        Self {
            id: CoinId::Native,
            value: Amount::from(sats),
        }
    }
}

/// Checked arithmetic primitives.
pub mod ledger {
    use super::{Amount, Satoshi};
    use crate::{ExchangeError, Result};

    pub fn add(a: Amount, b: Amount) -> Result<Amount> {
        a.checked_add(b).ok_or(ExchangeError::Overflow)
    }

    pub fn sub(a: Amount, b: Amount) -> Result<Amount> {
        a.checked_sub(b).ok_or(ExchangeError::InsufficientFunds)
    }

    pub fn add_sats(a: Satoshi, b: Satoshi) -> Result<Satoshi> {
        a.checked_add(b).ok_or(ExchangeError::Overflow)
    }

    pub fn sub_sats(a: Satoshi, b: Satoshi) -> Result<Satoshi> {
        a.checked_sub(b).ok_or(ExchangeError::InsufficientFunds)
    }

    /// Narrow a big-integer amount into the native range.
    pub fn to_sats(value: Amount) -> Result<Satoshi> {
        Satoshi::try_from(value).map_err(|_| ExchangeError::NatConvertError(value))
    }

    pub fn sum<I>(values: I) -> Result<Amount>
    where
        I: IntoIterator<Item = Amount>,
    {
        values.into_iter().try_fold(0, add)
    }
}

/// Aggregate holdings: native coin plus one entry per token.
///
/// Token entries that reach zero are removed so two projections of the
/// same holdings compare equal structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub native: Satoshi,
    pub tokens: BTreeMap<CoinId, Amount>,
}

impl Reserves {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount held of `id`, widening native to [`Amount`].
    #[must_use]
    pub fn amount_of(&self, id: &CoinId) -> Amount {
        match id {
            CoinId::Native => Amount::from(self.native),
            rune => self.tokens.get(rune).copied().unwrap_or(0),
        }
    }

    pub fn credit(&mut self, coin: &CoinBalance) -> Result<()> {
        if coin.id.is_native() {
            self.native = ledger::add_sats(self.native, ledger::to_sats(coin.value)?)?;
            return Ok(());
        }
        if coin.value == 0 {
            return Ok(());
        }
        let current = self.amount_of(&coin.id);
        self.tokens.insert(coin.id, ledger::add(current, coin.value)?);
        Ok(())
    }

    pub fn debit(&mut self, coin: &CoinBalance) -> Result<()> {
        if coin.id.is_native() {
            let sats = ledger::to_sats(coin.value).map_err(|_| ExchangeError::InsufficientFunds)?;
            self.native = ledger::sub_sats(self.native, sats)?;
            return Ok(());
        }
        let remaining = ledger::sub(self.amount_of(&coin.id), coin.value)?;
        if remaining == 0 {
            self.tokens.remove(&coin.id);
        } else {
            self.tokens.insert(coin.id, remaining);
        }
        Ok(())
    }

    /// Add every holding of `other` into `self`.
    pub fn merge(&mut self, other: &Reserves) -> Result<()> {
        self.native = ledger::add_sats(self.native, other.native)?;
        for (id, value) in &other.tokens {
            self.credit(&CoinBalance::new(*id, *value))?;
        }
        Ok(())
    }

    /// Token holdings as balances, ascending by id.
    #[must_use]
    pub fn coin_balances(&self) -> Vec<CoinBalance> {
        self.tokens
            .iter()
            .map(|(id, value)| CoinBalance::new(*id, *value))
            .collect()
    }

    /// Every asset held, native first.
    #[must_use]
    pub fn assets(&self) -> Vec<CoinId> {
        std::iter::once(CoinId::Native)
            .chain(self.tokens.keys().copied())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.native == 0 && self.tokens.is_empty()
    }
}
