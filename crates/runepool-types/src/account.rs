//! Reward account of one participant.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Seconds, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Address,
    /// Accrued rewards not yet claimed.
    pub reward_balance: Amount,
    /// Claimed rewards awaiting a withdraw intent.
    pub withdrawable: Amount,
    /// Last claim or finalized withdrawal. `None` until the first one.
    pub last_action_at: Option<Timestamp>,
    pub registered_at: Timestamp,
}

impl Account {
    #[must_use]
    pub fn new(id: Address, registered_at: Timestamp) -> Self {
        Self {
            id,
            reward_balance: 0,
            withdrawable: 0,
            last_action_at: None,
            registered_at,
        }
    }

    /// Earliest time the next claim or withdrawal is allowed.
    #[must_use]
    pub fn next_action_at(&self, cooldown: Seconds) -> Option<Timestamp> {
        self.last_action_at.map(|t| t.saturating_add(cooldown))
    }
}
