//! Service facade.
//!
//! All state sits behind one `tokio::sync::RwLock`. Calls to the key
//! service and rune indexer are awaited with no lock held; the coordinator
//! re-validates under the write lock before anything is staged, so a call
//! that completed during the wait is never overwritten.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use runepool_pool::{ChainKeyService, LocalKeyService, Pool};
use runepool_settlement::{Clock, SettlementCoordinator, TxStatus};
use runepool_types::{
    Account, Address, Amount, CoinId, ExchangeConfig, ExchangeError, ExecuteTxArgs,
    FinalizeTxArgs, GetMinimalTxValueArgs, GetPoolInfoArgs, GetPoolListArgs, PoolInfo,
    RegisterInfo, RejectionCode, Result, RollbackTxArgs, Satoshi, Seconds, Txid, Utxo,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::oracle::RuneIndexer;

/// Reward economy parameters plus one participant's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub claim_cooldown_secs: Seconds,
    pub register_fee: Satoshi,
    pub max_rewards: Amount,
    pub remaining_rewards: Amount,
    pub account: Option<Account>,
}

struct ExchangeState {
    coordinator: SettlementCoordinator,
    /// Address of the pool created by `init_key`.
    primary: Option<Address>,
}

pub struct Exchange {
    config: ExchangeConfig,
    state: RwLock<ExchangeState>,
    keys: Arc<dyn ChainKeyService>,
    indexer: Arc<dyn RuneIndexer>,
    clock: Arc<dyn Clock>,
}

impl Exchange {
    pub fn new(
        config: ExchangeConfig,
        keys: Arc<dyn ChainKeyService>,
        indexer: Arc<dyn RuneIndexer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let state = ExchangeState {
            coordinator: SettlementCoordinator::from_config(&config),
            primary: None,
        };
        tracing::info!(
            exchange = %config.exchange_id,
            rune = %config.rune_id,
            min_tx_value = config.min_tx_value,
            "Exchange started"
        );
        Ok(Self {
            config,
            state: RwLock::new(state),
            keys,
            indexer,
            clock,
        })
    }

    /// Exchange backed by the seeded [`LocalKeyService`].
    pub fn with_local_keys(
        config: ExchangeConfig,
        indexer: Arc<dyn RuneIndexer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let keys = Arc::new(LocalKeyService::from_config(&config)?);
        Self::new(config, keys, indexer, clock)
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Pools
    // -----------------------------------------------------------------------

    /// Derive the primary pool's keys and register it. One-shot.
    pub async fn init_key(&self) -> Result<Address> {
        if self.state.read().await.primary.is_some() {
            return Err(ExchangeError::InvalidState("key already initialized".into()));
        }
        let keys = self.keys.derive(&[self.config.rune_id.to_bytes()]).await?;
        let address = keys.address.clone();

        let mut state = self.state.write().await;
        if state.primary.is_some() {
            return Err(ExchangeError::InvalidState("key already initialized".into()));
        }
        state.coordinator.register_pool(Pool::new(
            self.config.pool_name.clone(),
            keys,
            self.config.rune_id,
            self.config.deposit_amount,
            "",
        ))?;
        state.primary = Some(address.clone());
        Ok(address)
    }

    /// Register an additional pool keyed by `name`.
    pub async fn create_pool(
        &self,
        name: &str,
        token: CoinId,
        deposit_amount: Amount,
        attributes: &str,
    ) -> Result<Address> {
        if token.is_native() {
            return Err(ExchangeError::InvalidRuneId);
        }
        if name.is_empty() || deposit_amount == 0 {
            return Err(ExchangeError::InvalidInput);
        }
        let keys = self.keys.derive(&[name.as_bytes().to_vec()]).await?;
        let address = keys.address.clone();
        self.state.write().await.coordinator.register_pool(Pool::new(
            name,
            keys,
            token,
            deposit_amount,
            attributes,
        ))?;
        Ok(address)
    }

    pub async fn query_rune_deposit_address(&self) -> Option<Address> {
        self.state.read().await.primary.clone()
    }

    pub async fn query_register_info(&self) -> Result<RegisterInfo> {
        let state = self.state.read().await;
        let address = state
            .primary
            .as_deref()
            .ok_or(ExchangeError::PoolAddressNotFound)?;
        let pool = state.coordinator.registry().require(address)?;
        let utxo = pool.native_utxo().cloned().ok_or(ExchangeError::EmptyPool)?;
        Ok(RegisterInfo {
            untweaked_key: pool.keys().untweaked.clone(),
            tweaked_key: pool.keys().tweaked.clone(),
            address: address.to_string(),
            utxo,
            register_fee: self.config.register_fee,
            nonce: pool.nonce(),
        })
    }

    /// Genesis deposit of a pool: one token leg and one native leg.
    ///
    /// Each declared token balance must agree with the indexer's view of
    /// that output.
    pub async fn deposit(
        &self,
        pool_address: &str,
        utxo_for_rune: Utxo,
        utxo_for_btc: Utxo,
    ) -> Result<()> {
        for leg in [&utxo_for_rune, &utxo_for_btc] {
            if let Some(declared) = &leg.maybe_rune {
                let indexed = self
                    .ask_indexer(self.indexer.get_output_balances(leg.outpoint()))
                    .await?;
                if !indexed.contains(declared) {
                    tracing::warn!(
                        outpoint = %leg.outpoint(),
                        ?declared,
                        ?indexed,
                        "Deposit leg disagrees with indexer"
                    );
                    return Err(ExchangeError::RuneIndexerResultError(format!(
                        "output {} does not hold {} of {}",
                        leg.outpoint(),
                        declared.value,
                        declared.id
                    )));
                }
            }
        }
        self.state
            .write()
            .await
            .coordinator
            .deposit(pool_address, utxo_for_rune, utxo_for_btc)
    }

    // -----------------------------------------------------------------------
    // Settlement
    // -----------------------------------------------------------------------

    /// Validate, stage, and sign. Returns `hex(payload ‖ signature)`.
    pub async fn execute_tx(&self, args: ExecuteTxArgs) -> Result<String> {
        let prepared = self
            .state
            .read()
            .await
            .coordinator
            .prepare(&args, self.clock.now())?;

        let mut confirmed = BTreeSet::new();
        for id in prepared.plan.unknown_tokens {
            match self.ask_indexer(self.indexer.get_rune_entry(id)).await? {
                Some(_) => {
                    confirmed.insert(id);
                }
                None => {
                    return Err(ExchangeError::RuneIndexerResultError(format!(
                        "rune {id} not found"
                    )));
                }
            }
        }

        let staged = self
            .state
            .write()
            .await
            .coordinator
            .execute(&args, &confirmed, self.clock.now())?;

        match self.keys.sign(&staged.derivation_path, &staged.payload).await {
            Ok(signature) => {
                let mut signed = staged.payload;
                signed.extend_from_slice(&signature);
                Ok(hex::encode(signed))
            }
            Err(err) => {
                tracing::error!(
                    txid = %staged.txid,
                    pool = %staged.pool_address,
                    %err,
                    "Signing failed, rolling back"
                );
                // A resolution may have landed while the lock was released;
                // the signing error is still the one the caller sees.
                if let Err(rollback_err) = self
                    .state
                    .write()
                    .await
                    .coordinator
                    .rollback(&args.txid, &staged.pool_key)
                {
                    tracing::error!(
                        txid = %staged.txid,
                        pool = %staged.pool_address,
                        %rollback_err,
                        "Rollback after signing failure refused"
                    );
                }
                Err(err)
            }
        }
    }

    pub async fn finalize_tx(&self, args: FinalizeTxArgs) -> Result<()> {
        self.state.write().await.coordinator.finalize(
            &args.txid,
            &args.pool_key,
            self.clock.now(),
        )
    }

    pub async fn rollback_tx(&self, args: RollbackTxArgs) -> Result<()> {
        self.state
            .write()
            .await
            .coordinator
            .rollback(&args.txid, &args.pool_key)
    }

    pub async fn tx_status(&self, pool_address: &str, txid: &str) -> Result<Option<TxStatus>> {
        let txid: Txid = txid.parse()?;
        Ok(self
            .state
            .read()
            .await
            .coordinator
            .tx_status(pool_address, &txid))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Floor for the given queue depth. Unknown pools get the configured floor.
    pub async fn get_minimal_tx_value(&self, args: GetMinimalTxValueArgs) -> Satoshi {
        self.state
            .read()
            .await
            .coordinator
            .minimal_tx_value(args.zero_confirmed_tx_queue_length)
    }

    pub async fn get_pool_info(&self, args: GetPoolInfoArgs) -> Option<PoolInfo> {
        self.state
            .read()
            .await
            .coordinator
            .registry()
            .pool_info(&args.pool_address)
    }

    pub async fn get_pool_list(&self, args: GetPoolListArgs) -> Vec<PoolInfo> {
        let limit = args.limit.min(self.config.max_page_size);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        self.state
            .read()
            .await
            .coordinator
            .registry()
            .pool_list(args.from.as_deref(), limit)
    }

    // -----------------------------------------------------------------------
    // Rewards
    // -----------------------------------------------------------------------

    pub async fn claim(&self, account: &str) -> Result<Amount> {
        let now = self.clock.now();
        self.state.write().await.coordinator.claim(account, now)
    }

    /// Credit rewards earned outside the pool (game hook).
    pub async fn accrue_rewards(&self, account: &str, amount: Amount) -> Result<Amount> {
        self.state
            .write()
            .await
            .coordinator
            .accounts_mut()
            .accrue(account, amount)
    }

    pub async fn get_account(&self, account: &str) -> AccountView {
        let state = self.state.read().await;
        let book = state.coordinator.accounts();
        AccountView {
            claim_cooldown_secs: self.config.claim_cooldown_secs,
            register_fee: self.config.register_fee,
            max_rewards: self.config.max_rewards,
            remaining_rewards: book.remaining_rewards(),
            account: book.get(account).cloned(),
        }
    }

    async fn ask_indexer<T>(
        &self,
        call: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        let limit = Duration::from_millis(self.config.indexer_timeout_ms);
        if let Ok(result) = tokio::time::timeout(limit, call).await {
            result.inspect_err(|err| tracing::warn!(%err, "Rune indexer call failed"))
        } else {
            tracing::warn!(timeout_ms = self.config.indexer_timeout_ms, "Rune indexer timed out");
            Err(ExchangeError::FetchRuneIndexerError(
                RejectionCode::SysTransient,
                "timeout".into(),
            ))
        }
    }
}
