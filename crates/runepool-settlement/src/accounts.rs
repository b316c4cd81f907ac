//! Reward accounts and the claim/withdraw cooldown.
//!
//! Rewards move `reward_balance → withdrawable` on claim and leave the
//! book through a finalized withdraw intent. Both actions share one
//! cooldown window per account.

use std::collections::BTreeMap;

use runepool_types::{
    Account, Address, Amount, ExchangeConfig, ExchangeError, Result, Seconds, Timestamp, ledger,
};

use crate::pending::AccountEffect;

pub struct AccountBook {
    accounts: BTreeMap<Address, Account>,
    cooldown: Seconds,
    /// Global cap on rewards ever accrued.
    max_rewards: Amount,
    total_accrued: Amount,
}

impl AccountBook {
    #[must_use]
    pub fn new(cooldown: Seconds, max_rewards: Amount) -> Self {
        Self {
            accounts: BTreeMap::new(),
            cooldown,
            max_rewards,
            total_accrued: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(config.claim_cooldown_secs, config.max_rewards)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Account> {
        self.accounts.get(id)
    }

    fn require(&self, id: &str) -> Result<&Account> {
        self.get(id)
            .ok_or_else(|| ExchangeError::GamerNotFound(id.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Rewards that may still be accrued before the global cap.
    #[must_use]
    pub fn remaining_rewards(&self) -> Amount {
        self.max_rewards.saturating_sub(self.total_accrued)
    }

    pub fn ensure_absent(&self, id: &str) -> Result<()> {
        if self.accounts.contains_key(id) {
            return Err(ExchangeError::GamerAlreadyExist(id.to_string()));
        }
        Ok(())
    }

    pub fn open(&mut self, id: &str, now: Timestamp) -> Result<()> {
        self.ensure_absent(id)?;
        self.accounts
            .insert(id.to_string(), Account::new(id.to_string(), now));
        tracing::info!(account = id, "Account opened");
        Ok(())
    }

    /// Credit rewards to an account.
    ///
    /// # Errors
    /// `CookieBalanceInsufficient(remaining)` if the global cap would be exceeded.
    pub fn accrue(&mut self, id: &str, amount: Amount) -> Result<Amount> {
        self.require(id)?;
        let remaining = self.remaining_rewards();
        if amount > remaining {
            return Err(ExchangeError::CookieBalanceInsufficient(remaining));
        }
        let total = ledger::add(self.total_accrued, amount)?;
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| ExchangeError::GamerNotFound(id.to_string()))?;
        account.reward_balance = ledger::add(account.reward_balance, amount)?;
        self.total_accrued = total;
        Ok(account.reward_balance)
    }

    fn check_cooldown(&self, account: &Account, now: Timestamp) -> Result<()> {
        if let Some(next) = account.next_action_at(self.cooldown) {
            if now < next {
                return Err(ExchangeError::GamerCoolingDown(account.id.clone(), next));
            }
        }
        Ok(())
    }

    /// Move the whole reward balance into `withdrawable`.
    pub fn claim(&mut self, id: &str, now: Timestamp) -> Result<Amount> {
        let account = self.require(id)?;
        self.check_cooldown(account, now)?;
        if account.reward_balance == 0 {
            return Err(ExchangeError::CookieBalanceInsufficient(0));
        }
        let mut updated = account.clone();
        let amount = updated.reward_balance;
        updated.withdrawable = ledger::add(updated.withdrawable, amount)?;
        updated.reward_balance = 0;
        updated.last_action_at = Some(now);
        self.accounts.insert(updated.id.clone(), updated);
        tracing::info!(account = id, amount, "Rewards claimed");
        Ok(amount)
    }

    /// A withdraw of `amount` must drain exactly the withdrawable balance.
    pub fn check_withdraw(&self, id: &str, amount: Amount, now: Timestamp) -> Result<()> {
        let account = self.require(id)?;
        self.check_cooldown(account, now)?;
        if account.withdrawable == 0 || amount != account.withdrawable {
            return Err(ExchangeError::CookieBalanceInsufficient(account.withdrawable));
        }
        Ok(())
    }

    /// The account as it would be after `effect`, without storing it.
    pub fn preview(&self, effect: &AccountEffect, now: Timestamp) -> Result<Option<Account>> {
        match effect {
            AccountEffect::None => Ok(None),
            AccountEffect::Register { account } => {
                self.ensure_absent(account)?;
                Ok(Some(Account::new(account.clone(), now)))
            }
            AccountEffect::Withdraw { account, amount } => {
                let mut updated = self.require(account)?.clone();
                updated.withdrawable = ledger::sub(updated.withdrawable, *amount)
                    .map_err(|_| ExchangeError::CookieBalanceInsufficient(updated.withdrawable))?;
                updated.last_action_at = Some(now);
                Ok(Some(updated))
            }
        }
    }

    /// Store an account produced by [`Self::preview`].
    pub fn store(&mut self, account: Account) {
        self.accounts.insert(account.id.clone(), account);
    }
}
