//! # runepool-types
//!
//! Shared types, errors, and configuration for the **Runepool** settlement
//! engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`Txid`], [`OutPoint`], [`CoinId`], [`Address`]
//! - **Balance ledger**: [`ledger`], [`CoinBalance`], [`Reserves`]
//! - **Outputs**: [`Utxo`]
//! - **Intent model**: [`Intention`], [`IntentionSet`], [`ActionKind`], request args
//! - **Views**: [`PoolInfo`], [`RegisterInfo`], [`PoolKeys`], [`Account`]
//! - **Configuration**: [`ExchangeConfig`]
//! - **Errors**: [`ExchangeError`] with `RP_ERR_` prefix codes

pub mod account;
pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod intention;
pub mod pool;
pub mod utxo;

pub use account::*;
pub use balance::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use intention::*;
pub use pool::*;
pub use utxo::*;

// Constants are accessed via `runepool_types::constants::FOO`
// (not re-exported to avoid name collisions).
