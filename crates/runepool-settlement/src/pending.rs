//! Staged, not-yet-committed transactions.

use runepool_pool::Pool;
use runepool_types::{Address, Amount, IntentionSet, Reserves, Timestamp, Txid};

/// Lifecycle of a transaction against one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Finalized,
    RolledBack,
}

/// Account change that takes effect only if the transaction finalizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEffect {
    None,
    Register { account: Address },
    Withdraw { account: Address, amount: Amount },
}

impl AccountEffect {
    /// Account this effect touches, if any.
    #[must_use]
    pub fn account(&self) -> Option<&Address> {
        match self {
            Self::None => None,
            Self::Register { account } | Self::Withdraw { account, .. } => Some(account),
        }
    }
}

/// The single outstanding transaction of one pool.
///
/// `staged` is the full post-state; rollback discards it and the committed
/// pool, never mutated, is already the pre-state.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub txid: Txid,
    pub pool_address: Address,
    pub intention_set: IntentionSet,
    pub intention_index: u32,
    /// Signed-transaction payload as submitted.
    pub payload: Vec<u8>,
    pub staged: Pool,
    pub inflow: Reserves,
    pub outflow: Reserves,
    pub effect: AccountEffect,
    pub status: TxStatus,
    pub created_at: Timestamp,
}

impl PendingTransaction {
    /// Nonce the pool will carry once this transaction finalizes.
    #[must_use]
    pub fn staged_nonce(&self) -> u64 {
        self.staged.nonce()
    }
}
