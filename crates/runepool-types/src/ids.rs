//! Identifiers used throughout Runepool.
//!
//! Every identifier has a canonical text form and serializes as that text,
//! so the request/response surface stays protocol neutral.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ExchangeError, Result};

/// Address text of a pool or a participant.
pub type Address = String;

/// Duration in seconds.
pub type Seconds = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

// ---------------------------------------------------------------------------
// Txid
// ---------------------------------------------------------------------------

/// A 32-byte transaction identifier. Text form is 64 lowercase hex chars.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Txid([u8; 32]);

impl Txid {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Double SHA-256 of a raw payload, the way chain transaction ids are formed.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        let first = Sha256::digest(payload);
        let second = Sha256::digest(first);
        Self(second.into())
    }

    /// Deterministic txid for fixtures.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self::from_payload(&seed.to_le_bytes())
    }
}

impl FromStr for Txid {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| ExchangeError::InvalidTxid(s.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ExchangeError::InvalidTxid(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Txid {
    type Error = ExchangeError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Txid> for String {
    fn from(txid: Txid) -> Self {
        txid.to_string()
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({})", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// OutPoint
// ---------------------------------------------------------------------------

/// Reference to one transaction output: `"<txid>:<vout>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutPoint {
    pub txid: Txid,
    pub vout: u32,
}

impl OutPoint {
    #[must_use]
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl FromStr for OutPoint {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        let (txid, vout) = s.split_once(':').ok_or(ExchangeError::InvalidInput)?;
        let txid = txid.parse()?;
        let vout = vout.parse().map_err(|_| ExchangeError::InvalidNumeric)?;
        Ok(Self { txid, vout })
    }
}

impl TryFrom<String> for OutPoint {
    type Error = ExchangeError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<OutPoint> for String {
    fn from(outpoint: OutPoint) -> Self {
        outpoint.to_string()
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

// ---------------------------------------------------------------------------
// CoinId
// ---------------------------------------------------------------------------

/// Asset identifier: the native coin or a Rune etched at `block:tx`.
///
/// Text form is `"block:tx"`. Both `""` and `"0:0"` parse as [`CoinId::Native`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CoinId {
    Native,
    Rune { block: u64, tx: u32 },
}

impl CoinId {
    #[must_use]
    pub fn rune(block: u64, tx: u32) -> Self {
        if block == 0 && tx == 0 {
            Self::Native
        } else {
            Self::Rune { block, tx }
        }
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    /// Big-endian `block ‖ tx`, used as a key-derivation path component.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let (block, tx) = match *self {
            Self::Native => (0, 0),
            Self::Rune { block, tx } => (block, tx),
        };
        let mut bytes = block.to_be_bytes().to_vec();
        bytes.extend_from_slice(&tx.to_be_bytes());
        bytes
    }
}

impl FromStr for CoinId {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::Native);
        }
        let (block, tx) = s.split_once(':').ok_or(ExchangeError::InvalidRuneId)?;
        let block: u64 = block.parse().map_err(|_| ExchangeError::InvalidRuneId)?;
        let tx: u32 = tx.parse().map_err(|_| ExchangeError::InvalidRuneId)?;
        // Runes cannot be etched in the genesis block.
        if block == 0 && tx != 0 {
            return Err(ExchangeError::InvalidRuneId);
        }
        Ok(Self::rune(block, tx))
    }
}

impl TryFrom<String> for CoinId {
    type Error = ExchangeError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CoinId> for String {
    fn from(id: CoinId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("0:0"),
            Self::Rune { block, tx } => write!(f, "{block}:{tx}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
