//! Per-pool set of unspent outputs.
//!
//! Keyed by outpoint. `spend` and `receive` are all-or-nothing: every id is
//! checked before the set changes.

use std::collections::{BTreeMap, BTreeSet};

use runepool_types::{ExchangeError, OutPoint, Reserves, Result, Utxo};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    utxos: BTreeMap<OutPoint, Utxo>,
}

impl UtxoSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    #[must_use]
    pub fn get(&self, outpoint: &OutPoint) -> Option<&Utxo> {
        self.utxos.get(outpoint)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        self.utxos.values()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Utxo> {
        self.utxos.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// Insert newly observed outputs.
    ///
    /// # Errors
    /// `InvalidInput` if any outpoint is already present or repeated in `utxos`.
    pub fn receive(&mut self, utxos: Vec<Utxo>) -> Result<()> {
        let mut seen = BTreeSet::new();
        for utxo in &utxos {
            let outpoint = utxo.outpoint();
            if self.contains(&outpoint) || !seen.insert(outpoint) {
                tracing::warn!(%outpoint, "Duplicate utxo rejected");
                return Err(ExchangeError::InvalidInput);
            }
        }
        for utxo in utxos {
            self.utxos.insert(utxo.outpoint(), utxo);
        }
        Ok(())
    }

    /// Remove the named outputs, returning them.
    ///
    /// # Errors
    /// `InvalidInput` if any id is absent or repeated.
    pub fn spend(&mut self, ids: &[OutPoint]) -> Result<Vec<Utxo>> {
        let mut seen = BTreeSet::new();
        for id in ids {
            if !self.contains(id) || !seen.insert(*id) {
                tracing::warn!(outpoint = %id, "Spend of unknown or repeated utxo rejected");
                return Err(ExchangeError::InvalidInput);
            }
        }
        Ok(ids.iter().filter_map(|id| self.utxos.remove(id)).collect())
    }

    /// Aggregate native and per-token totals recomputed from the set.
    pub fn projected_reserves(&self) -> Result<Reserves> {
        let mut reserves = Reserves::new();
        for utxo in self.utxos.values() {
            reserves.native = runepool_types::ledger::add_sats(reserves.native, utxo.sats)?;
            if let Some(rune) = &utxo.maybe_rune {
                reserves.credit(rune)?;
            }
        }
        Ok(reserves)
    }
}

#[cfg(test)]
mod tests {
    use runepool_types::{CoinId, Txid};

    use super::*;

    fn rune_a() -> CoinId {
        CoinId::rune(840_000, 1)
    }

    #[test]
    fn receive_and_project() {
        let mut set = UtxoSet::new();
        set.receive(vec![
            Utxo::native(1, 100),
            Utxo::with_rune(2, 546, rune_a(), 50),
        ])
        .unwrap();
        let reserves = set.projected_reserves().unwrap();
        assert_eq!(reserves.native, 646);
        assert_eq!(reserves.amount_of(&rune_a()), 50);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn duplicate_receive_rejected_atomically() {
        let mut set = UtxoSet::new();
        set.receive(vec![Utxo::native(1, 100)]).unwrap();
        let err = set
            .receive(vec![Utxo::native(3, 5), Utxo::native(1, 100)])
            .unwrap_err();
        assert_eq!(err, ExchangeError::InvalidInput);
        assert_eq!(set.len(), 1, "no partial insert");
    }

    #[test]
    fn spend_unknown_rejected_atomically() {
        let mut set = UtxoSet::new();
        let a = Utxo::native(1, 100);
        set.receive(vec![a.clone()]).unwrap();
        let missing = OutPoint::new(Txid::from_seed(99), 0);
        let err = set.spend(&[a.outpoint(), missing]).unwrap_err();
        assert_eq!(err, ExchangeError::InvalidInput);
        assert!(set.contains(&a.outpoint()));
    }

    #[test]
    fn spend_removes_and_returns() {
        let mut set = UtxoSet::new();
        let a = Utxo::native(1, 100);
        let b = Utxo::native(2, 7);
        set.receive(vec![a.clone(), b.clone()]).unwrap();
        let spent = set.spend(&[a.outpoint()]).unwrap();
        assert_eq!(spent, vec![a]);
        assert_eq!(set.to_vec(), vec![b]);
    }

    #[test]
    fn repeated_spend_id_rejected() {
        let mut set = UtxoSet::new();
        let a = Utxo::native(1, 100);
        set.receive(vec![a.clone()]).unwrap();
        assert!(set.spend(&[a.outpoint(), a.outpoint()]).is_err());
    }
}
