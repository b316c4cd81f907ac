//! Read-only pool views returned across the service boundary.

use serde::{Deserialize, Serialize};

use crate::{Address, CoinBalance, Satoshi, Utxo};

/// Key material derived for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolKeys {
    /// Hex of the untweaked public key.
    pub untweaked: String,
    /// Hex of the tweaked (address-specific) public key.
    pub tweaked: String,
    pub derivation_path: Vec<Vec<u8>>,
    pub address: Address,
}

/// Snapshot of a pool's committed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub key: String,
    pub key_derivation_path: Vec<Vec<u8>>,
    pub name: String,
    pub address: Address,
    pub nonce: u64,
    pub coin_reserved: Vec<CoinBalance>,
    pub btc_reserved: Satoshi,
    pub utxos: Vec<Utxo>,
    pub attributes: String,
}

/// What a participant needs to build a registration transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterInfo {
    pub untweaked_key: String,
    pub tweaked_key: String,
    pub address: Address,
    /// The pool's native output the registration spends.
    pub utxo: Utxo,
    pub register_fee: Satoshi,
    pub nonce: u64,
}
