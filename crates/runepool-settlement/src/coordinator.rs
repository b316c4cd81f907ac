//! Settlement coordinator: execute → finalize | rollback.
//!
//! 1. `execute` validates the intention, stages the pool post-state and any
//!    account effect in the pool's pending slot
//! 2. `finalize` checks conservation, commits the staged pool (nonce + 1),
//!    applies the account effect, and logs the outcome
//! 3. `rollback` drops the slot; committed state was never touched
//!
//! Each pool has one pending slot. Repeated finalize/rollback calls are
//! answered from the [`ResolutionLog`].

use std::collections::{BTreeSet, HashMap};

use runepool_pool::{IntentPlan, IntentionValidator, Pool, PoolRegistry};
use runepool_types::{
    ActionKind, Address, Amount, CoinId, ExchangeConfig, ExchangeError, ExecuteTxArgs, Reserves,
    Result, Satoshi, Timestamp, Txid, Utxo,
};

use crate::accounts::AccountBook;
use crate::conservation::ReserveConservation;
use crate::pending::{AccountEffect, PendingTransaction, TxStatus};
use crate::resolution::{Resolution, ResolutionLog};

/// A validated execution, not yet staged.
#[derive(Debug, Clone)]
pub struct PreparedTx {
    pub txid: Txid,
    pub payload: Vec<u8>,
    pub plan: IntentPlan,
    pub effect: AccountEffect,
}

/// What the caller needs to authorize a staged transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedExecution {
    pub txid: Txid,
    pub pool_address: Address,
    /// Untweaked key hex, the handle for finalize/rollback.
    pub pool_key: String,
    pub derivation_path: Vec<Vec<u8>>,
    pub payload: Vec<u8>,
}

pub struct SettlementCoordinator {
    registry: PoolRegistry,
    validator: IntentionValidator,
    accounts: AccountBook,
    /// Pool address → its single outstanding transaction.
    pending: HashMap<Address, PendingTransaction>,
    resolutions: ResolutionLog,
    conservation: ReserveConservation,
}

impl SettlementCoordinator {
    #[must_use]
    pub fn new(
        validator: IntentionValidator,
        accounts: AccountBook,
        resolution_capacity: usize,
    ) -> Self {
        Self {
            registry: PoolRegistry::new(),
            validator,
            accounts,
            pending: HashMap::new(),
            resolutions: ResolutionLog::new(resolution_capacity),
            conservation: ReserveConservation::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(
            IntentionValidator::from_config(config),
            AccountBook::from_config(config),
            config.resolution_log_capacity,
        )
    }

    #[must_use]
    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut AccountBook {
        &mut self.accounts
    }

    #[must_use]
    pub fn conservation(&self) -> &ReserveConservation {
        &self.conservation
    }

    #[must_use]
    pub fn pending(&self, pool: &str) -> Option<&PendingTransaction> {
        self.pending.get(pool)
    }

    #[must_use]
    pub fn minimal_tx_value(&self, queue_len: u32) -> Satoshi {
        self.validator.floor().minimal(queue_len)
    }

    pub fn register_pool(&mut self, pool: Pool) -> Result<()> {
        self.registry.register(pool)
    }

    /// Admit a pool's genesis deposit and record it as inflow.
    pub fn deposit(&mut self, pool: &str, leg_a: Utxo, leg_b: Utxo) -> Result<()> {
        if let Some(busy) = self.pending.get(pool) {
            return Err(ExchangeError::PoolBusy(busy.txid.to_string()));
        }
        self.registry.deposit(pool, leg_a, leg_b).inspect_err(|err| {
            tracing::warn!(pool, %err, "Deposit rejected");
        })?;
        let genesis = self.registry.require(pool)?.reserves().clone();
        self.conservation.record(pool, &genesis, &Reserves::new())
    }

    /// Run every execute-time check without staging anything.
    pub fn prepare(&self, args: &ExecuteTxArgs, now: Timestamp) -> Result<PreparedTx> {
        let payload = decode_payload(&args.psbt_hex)?;
        let txid: Txid = args.txid.parse()?;
        let intention = usize::try_from(args.intention_index)
            .ok()
            .and_then(|i| args.intention_set.intentions.get(i))
            .ok_or(ExchangeError::InvalidInput)?;
        let pool = &intention.pool_address;

        if let Some(busy) = self.pending.get(pool) {
            return Err(ExchangeError::PoolBusy(busy.txid.to_string()));
        }
        if self.resolutions.get(pool, &txid).is_some() {
            return Err(ExchangeError::InvalidState(format!(
                "transaction {txid} already resolved on pool {pool}"
            )));
        }

        let plan = self.validator.validate(
            &self.registry,
            &args.intention_set,
            args.intention_index,
            args.zero_confirmed_tx_queue_length,
        )?;
        let effect = self.account_effect(&plan, now)?;
        Ok(PreparedTx {
            txid,
            payload,
            plan,
            effect,
        })
    }

    /// Staged account effects touching `account`, across all pools.
    fn pending_effects<'a>(&'a self, account: &'a str) -> impl Iterator<Item = &'a AccountEffect> {
        self.pending
            .values()
            .map(|p| &p.effect)
            .filter(move |effect| effect.account().is_some_and(|a| a == account))
    }

    fn account_effect(&self, plan: &IntentPlan, now: Timestamp) -> Result<AccountEffect> {
        let account = &plan.initiator;
        match plan.action {
            ActionKind::Register => {
                self.accounts.ensure_absent(account)?;
                if self.pending_effects(account).next().is_some() {
                    return Err(ExchangeError::GamerAlreadyExist(account.clone()));
                }
                Ok(AccountEffect::Register {
                    account: account.clone(),
                })
            }
            ActionKind::Withdraw => {
                if self
                    .pending_effects(account)
                    .any(|effect| matches!(effect, AccountEffect::Withdraw { .. }))
                {
                    return Err(ExchangeError::GamerWithdrawRepeatedly(account.clone()));
                }
                let amount: Amount = plan.outflow.amount_of(&plan.staged.token());
                self.accounts.check_withdraw(account, amount, now)?;
                Ok(AccountEffect::Withdraw {
                    account: account.clone(),
                    amount,
                })
            }
            ActionKind::Swap | ActionKind::AddLiquidity => Ok(AccountEffect::None),
        }
    }

    /// Re-validate against current state and stage the transaction.
    ///
    /// `confirmed` holds the tokens the rune indexer vouched for; every
    /// token new to the pool must be among them.
    pub fn execute(
        &mut self,
        args: &ExecuteTxArgs,
        confirmed: &BTreeSet<CoinId>,
        now: Timestamp,
    ) -> Result<StagedExecution> {
        let prepared = self.prepare(args, now).inspect_err(|err| {
            tracing::warn!(txid = %args.txid, %err, "execute_tx rejected");
        })?;
        if let Some(missing) = prepared
            .plan
            .unknown_tokens
            .iter()
            .find(|id| !confirmed.contains(id))
        {
            return Err(ExchangeError::RuneIndexerResultError(format!(
                "rune {missing} not found"
            )));
        }

        let PreparedTx {
            txid,
            payload,
            plan,
            effect,
        } = prepared;
        let staged = StagedExecution {
            txid,
            pool_address: plan.staged.address().clone(),
            pool_key: plan.staged.keys().untweaked.clone(),
            derivation_path: plan.staged.keys().derivation_path.clone(),
            payload: payload.clone(),
        };
        tracing::info!(
            pool = %staged.pool_address,
            %txid,
            action = %plan.action,
            nonce = plan.staged.nonce(),
            "Transaction staged"
        );
        self.pending.insert(
            staged.pool_address.clone(),
            PendingTransaction {
                txid,
                pool_address: staged.pool_address.clone(),
                intention_set: args.intention_set.clone(),
                intention_index: args.intention_index,
                payload,
                staged: plan.staged,
                inflow: plan.inflow,
                outflow: plan.outflow,
                effect,
                status: TxStatus::Pending,
                created_at: now,
            },
        );
        Ok(staged)
    }

    /// Commit the pending transaction `txid` of the pool keyed `pool_key`.
    ///
    /// # Errors
    /// - `PoolAddressNotFound` for an unknown key
    /// - `LastStateNotFound` if `txid` is neither pending nor finalized
    /// - `InvalidState` if the staged state fails conservation
    pub fn finalize(&mut self, txid: &str, pool_key: &str, now: Timestamp) -> Result<()> {
        let txid: Txid = txid.parse()?;
        let pool = self.registry.address_for_key(pool_key)?.clone();
        if self.pending.get(&pool).is_some_and(|p| p.txid == txid) {
            return self.commit_pending(&pool, now);
        }
        if self.resolutions.get(&pool, &txid) == Some(Resolution::Finalized) {
            tracing::debug!(%pool, %txid, "Repeated finalize ignored");
            return Ok(());
        }
        tracing::warn!(%pool, %txid, "Finalize of unknown transaction");
        Err(ExchangeError::LastStateNotFound)
    }

    fn commit_pending(&mut self, pool: &str, now: Timestamp) -> Result<()> {
        let pending = self
            .pending
            .get(pool)
            .ok_or(ExchangeError::LastStateNotFound)?;
        self.conservation.check(
            pool,
            &pending.inflow,
            &pending.outflow,
            pending.staged.reserves(),
        )?;
        let account = self.accounts.preview(&pending.effect, now)?;
        self.registry.commit(pending.staged.clone())?;
        self.conservation
            .record(pool, &pending.inflow, &pending.outflow)?;

        if let Some(account) = account {
            self.accounts.store(account);
        }
        if let Some(done) = self.pending.remove(pool) {
            tracing::info!(
                pool,
                txid = %done.txid,
                nonce = done.staged_nonce(),
                "Transaction finalized"
            );
            self.resolutions
                .record((pool.to_string(), done.txid), Resolution::Finalized);
        }
        Ok(())
    }

    /// Discard the pending transaction `txid`.
    ///
    /// Unknown or already rolled-back ids succeed without effect.
    ///
    /// # Errors
    /// `InvalidState` if `txid` already finalized on this pool.
    pub fn rollback(&mut self, txid: &str, pool_key: &str) -> Result<()> {
        let txid: Txid = txid.parse()?;
        let pool = self.registry.address_for_key(pool_key)?.clone();
        if self.pending.get(&pool).is_some_and(|p| p.txid == txid) {
            self.pending.remove(&pool);
            tracing::info!(%pool, %txid, "Transaction rolled back");
            self.resolutions.record((pool, txid), Resolution::RolledBack);
            return Ok(());
        }
        if self.resolutions.get(&pool, &txid) == Some(Resolution::Finalized) {
            tracing::warn!(%pool, %txid, "Rollback of finalized transaction refused");
            return Err(ExchangeError::InvalidState(format!(
                "transaction {txid} already finalized"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn tx_status(&self, pool: &str, txid: &Txid) -> Option<TxStatus> {
        if self.pending.get(pool).is_some_and(|p| &p.txid == txid) {
            return Some(TxStatus::Pending);
        }
        self.resolutions.get(pool, txid).map(|r| match r {
            Resolution::Finalized => TxStatus::Finalized,
            Resolution::RolledBack => TxStatus::RolledBack,
        })
    }

    pub fn claim(&mut self, account: &str, now: Timestamp) -> Result<Amount> {
        self.accounts.claim(account, now).inspect_err(|err| {
            tracing::warn!(account, %err, "Claim rejected");
        })
    }
}

fn decode_payload(psbt_hex: &str) -> Result<Vec<u8>> {
    let payload = hex::decode(psbt_hex).map_err(|e| ExchangeError::InvalidPsbt(e.to_string()))?;
    if payload.is_empty() {
        return Err(ExchangeError::InvalidPsbt("empty payload".into()));
    }
    Ok(payload)
}
