//! Intentions and the request/response types of the settlement surface.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Address, CoinBalance, ExchangeError, Result};

/// A coin claimed from an external source address into the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCoin {
    pub from: Address,
    pub coin: CoinBalance,
}

/// A coin granted from the pool to a destination address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputCoin {
    pub to: Address,
    pub coin: CoinBalance,
}

/// One leg of a multi-asset transfer against one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intention {
    pub exchange_id: String,
    pub action: String,
    pub action_params: String,
    pub pool_address: Address,
    /// Pool nonce the intent was computed against.
    pub nonce: u64,
    /// Pool-owned outpoints (`"txid:vout"`) this transaction spends.
    pub pool_utxo_spend: Vec<String>,
    /// Outpoints this transaction creates for the pool.
    pub pool_utxo_receive: Vec<String>,
    pub input_coins: Vec<InputCoin>,
    pub output_coins: Vec<OutputCoin>,
}

/// Ordered intentions composing one external transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentionSet {
    pub initiator_address: Address,
    pub intentions: Vec<Intention>,
}

/// The actions a pool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Exchange assets with the pool under the conservation law.
    Swap,
    /// Add assets to the pool; no output grants.
    AddLiquidity,
    /// Pay the registration fee and open a reward account.
    Register,
    /// Pay out a reward account's withdrawable tokens.
    Withdraw,
}

impl FromStr for ActionKind {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "swap" => Ok(Self::Swap),
            "add_liquidity" => Ok(Self::AddLiquidity),
            "register" => Ok(Self::Register),
            "withdraw" => Ok(Self::Withdraw),
            _ => Err(ExchangeError::InvalidInput),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Swap => "swap",
            Self::AddLiquidity => "add_liquidity",
            Self::Register => "register",
            Self::Withdraw => "withdraw",
        })
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteTxArgs {
    /// Hex-encoded signed-transaction payload.
    pub psbt_hex: String,
    pub txid: String,
    pub intention_set: IntentionSet,
    pub intention_index: u32,
    pub zero_confirmed_tx_queue_length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeTxArgs {
    pub txid: String,
    /// Hex of the pool's untweaked key.
    pub pool_key: String,
}

pub type RollbackTxArgs = FinalizeTxArgs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMinimalTxValueArgs {
    pub pool_address: Address,
    pub zero_confirmed_tx_queue_length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPoolInfoArgs {
    pub pool_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPoolListArgs {
    /// Resume strictly after this address.
    pub from: Option<Address>,
    pub limit: u32,
}
