//! Error types for the Runepool settlement engine.
//!
//! All errors use the `RP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by category:
//! - 1xx: Input malformation
//! - 2xx: State conflict
//! - 3xx: Conservation / funds
//! - 4xx: Account / identity
//! - 5xx: External dependency
//! - 9xx: Escape hatch

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejection code reported by an external collaborator (the rune indexer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionCode {
    NoError,
    SysFatal,
    SysTransient,
    DestinationInvalid,
    CanisterReject,
    CanisterError,
    Unknown,
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoError => "NO_ERROR",
            Self::SysFatal => "SYS_FATAL",
            Self::SysTransient => "SYS_TRANSIENT",
            Self::DestinationInvalid => "DESTINATION_INVALID",
            Self::CanisterReject => "CANISTER_REJECT",
            Self::CanisterError => "CANISTER_ERROR",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Central error enum for every exchange operation.
///
/// Each variant carries exactly the diagnostic payload the caller needs to
/// retry or report: the current nonce for a stale intent, the retry
/// timestamp for a cooldown, the expected/actual pair for a bad deposit.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExchangeError {
    // =================================================================
    // Input malformation (1xx)
    // =================================================================
    #[error("RP_ERR_100: Invalid input")]
    InvalidInput,

    #[error("RP_ERR_101: Invalid numeric value")]
    InvalidNumeric,

    #[error("RP_ERR_102: Invalid PSBT: {0}")]
    InvalidPsbt(String),

    #[error("RP_ERR_103: Invalid txid: {0}")]
    InvalidTxid(String),

    #[error("RP_ERR_104: Invalid rune id")]
    InvalidRuneId,

    // =================================================================
    // State conflict (2xx)
    // =================================================================
    /// The intent was computed against an older nonce. Carries the current one.
    #[error("RP_ERR_200: Pool state expired, current nonce {0}")]
    PoolStateExpired(u64),

    #[error("RP_ERR_201: Pool already exists")]
    PoolAlreadyExists,

    #[error("RP_ERR_202: Invalid state: {0}")]
    InvalidState(String),

    /// No pending transaction matches the finalize request.
    #[error("RP_ERR_203: Last state not found")]
    LastStateNotFound,

    #[error("RP_ERR_204: Pool address not found")]
    PoolAddressNotFound,

    /// The pool already holds an unresolved pending transaction.
    #[error("RP_ERR_205: Pool busy with pending transaction {0}")]
    PoolBusy(String),

    // =================================================================
    // Conservation / funds (3xx)
    // =================================================================
    #[error("RP_ERR_300: Insufficient funds")]
    InsufficientFunds,

    /// Not enough rewards left. Carries the remaining amount.
    #[error("RP_ERR_301: Cookie balance insufficient, remaining {0}")]
    CookieBalanceInsufficient(u128),

    #[error("RP_ERR_302: Too small funds")]
    TooSmallFunds,

    #[error("RP_ERR_303: Invalid liquidity")]
    InvalidLiquidity,

    #[error("RP_ERR_304: Empty pool")]
    EmptyPool,

    /// Deposit token balance mismatch: (expected, actual).
    #[error("RP_ERR_305: Deposit rune balance incorrect: expected {0}, got {1}")]
    DepositRuneBalanceIncorrect(String, String),

    #[error("RP_ERR_306: Rune id does not match: {0} vs {1}")]
    RuneIdNotMatch(String, String),

    #[error("RP_ERR_307: Arithmetic overflow")]
    Overflow,

    /// A big-integer amount did not fit the native 64-bit range.
    #[error("RP_ERR_308: Cannot convert {0} to a native amount")]
    NatConvertError(u128),

    // =================================================================
    // Account / identity (4xx)
    // =================================================================
    #[error("RP_ERR_400: Gamer not found: {0}")]
    GamerNotFound(String),

    #[error("RP_ERR_401: Gamer already exists: {0}")]
    GamerAlreadyExist(String),

    /// (participant, retry-after timestamp in seconds).
    #[error("RP_ERR_402: Gamer {0} cooling down until {1}")]
    GamerCoolingDown(String, u64),

    #[error("RP_ERR_403: Gamer {0} withdrew repeatedly")]
    GamerWithdrawRepeatedly(String),

    // =================================================================
    // External dependency (5xx)
    // =================================================================
    #[error("RP_ERR_500: Rune indexer call failed ({0}): {1}")]
    FetchRuneIndexerError(RejectionCode, String),

    #[error("RP_ERR_501: Rune indexer result error: {0}")]
    RuneIndexerResultError(String),

    #[error("RP_ERR_502: Chain key error")]
    ChainKeyError,

    // =================================================================
    // Escape hatch (9xx)
    // =================================================================
    #[error("RP_ERR_900: {0}")]
    CustomError(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ExchangeError>;

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::CustomError(format!("serialization: {err}"))
    }
}
