//! Unspent transaction outputs owned by pools.

use serde::{Deserialize, Serialize};

use crate::{Amount, CoinBalance, CoinId, ExchangeError, OutPoint, Result, Satoshi, Txid};

/// One spendable output: native amount plus at most one token balance.
///
/// A `Utxo` is immutable once observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    pub sats: Satoshi,
    pub maybe_rune: Option<CoinBalance>,
}

impl Utxo {
    /// Build a Utxo, rejecting a "token" leg that names the native coin.
    pub fn new(outpoint: OutPoint, sats: Satoshi, maybe_rune: Option<CoinBalance>) -> Result<Self> {
        if maybe_rune.as_ref().is_some_and(|rune| rune.id.is_native()) {
            return Err(ExchangeError::InvalidRuneId);
        }
        Ok(Self {
            txid: outpoint.txid,
            vout: outpoint.vout,
            sats,
            maybe_rune,
        })
    }

    /// Parse a `"txid:vout"` reference and build the Utxo.
    pub fn try_from_outpoint(
        outpoint: &str,
        sats: Satoshi,
        maybe_rune: Option<CoinBalance>,
    ) -> Result<Self> {
        Self::new(outpoint.parse()?, sats, maybe_rune)
    }

    #[must_use]
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }

    #[must_use]
    pub fn rune_id(&self) -> Option<CoinId> {
        self.maybe_rune.as_ref().map(|rune| rune.id)
    }

    #[must_use]
    pub fn rune_amount(&self) -> Amount {
        self.maybe_rune.as_ref().map_or(0, |rune| rune.value)
    }

    /// Native-only fixture output.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn native(seed: u64, sats: Satoshi) -> Self {
        Self {
            txid: Txid::from_seed(seed),
            vout: 0,
            sats,
            maybe_rune: None,
        }
    }

    /// Fixture output carrying a token balance.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn with_rune(seed: u64, sats: Satoshi, id: CoinId, value: Amount) -> Self {
        Self {
            txid: Txid::from_seed(seed),
            vout: 1,
            sats,
            maybe_rune: Some(CoinBalance::new(id, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_rune_leg_rejected() {
        let op = OutPoint::new(Txid::from_seed(1), 0);
        let err = Utxo::new(op, 546, Some(CoinBalance::native(5))).unwrap_err();
        assert_eq!(err, ExchangeError::InvalidRuneId);
    }

    #[test]
    fn outpoint_roundtrip_through_text() {
        let utxo = Utxo::with_rune(4, 546, CoinId::rune(1, 1), 10);
        let text = utxo.outpoint().to_string();
        let rebuilt = Utxo::try_from_outpoint(&text, 546, utxo.maybe_rune.clone()).unwrap();
        assert_eq!(rebuilt, utxo);
        assert_eq!(rebuilt.rune_amount(), 10);
        assert_eq!(rebuilt.rune_id(), Some(CoinId::rune(1, 1)));
    }
}
