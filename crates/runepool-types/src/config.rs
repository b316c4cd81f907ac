//! Configuration for a Runepool exchange instance.

use serde::{Deserialize, Serialize};

use crate::{constants, Amount, CoinId, ExchangeError, Result, Satoshi, Seconds};

/// Settings for one exchange: its primary pool, fee floor, reward economy,
/// and collaborator timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Identifier every intention must carry in `exchange_id`.
    pub exchange_id: String,
    /// Human name of the primary pool.
    pub pool_name: String,
    /// Token held by the primary pool.
    pub rune_id: CoinId,
    /// Token amount the primary pool's genesis deposit must carry.
    pub deposit_amount: Amount,
    /// Native fee a `register` intent pays into the pool.
    pub register_fee: Satoshi,
    /// Base floor for native-moving intents.
    pub min_tx_value: Satoshi,
    /// Floor increment per zero-confirmed transaction in the queue.
    pub queue_floor_step: Satoshi,
    /// Queue depth past which the floor stops rising.
    pub max_queue_depth: u32,
    /// Minimum interval between claims or withdrawals of one account.
    pub claim_cooldown_secs: Seconds,
    /// Total rewards that may ever be accrued across all accounts.
    pub max_rewards: Amount,
    pub max_page_size: u32,
    pub indexer_timeout_ms: u64,
    pub resolution_log_capacity: usize,
    /// 32-byte hex seed for the local key service.
    pub key_seed_hex: String,
    /// Prefix of derived pool addresses.
    pub network_hrp: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            exchange_id: constants::DEFAULT_EXCHANGE_ID.to_string(),
            pool_name: "RUNEPOOL•COOKIE".to_string(),
            rune_id: CoinId::rune(840_000, 1),
            deposit_amount: 21_000_000,
            register_fee: constants::DEFAULT_REGISTER_FEE,
            min_tx_value: constants::DEFAULT_MIN_TX_VALUE,
            queue_floor_step: constants::DEFAULT_QUEUE_FLOOR_STEP,
            max_queue_depth: constants::DEFAULT_MAX_QUEUE_DEPTH,
            claim_cooldown_secs: constants::DEFAULT_CLAIM_COOLDOWN_SECS,
            max_rewards: 21_000_000,
            max_page_size: constants::DEFAULT_MAX_PAGE_SIZE,
            indexer_timeout_ms: constants::DEFAULT_INDEXER_TIMEOUT_MS,
            resolution_log_capacity: constants::DEFAULT_RESOLUTION_LOG_CAPACITY,
            key_seed_hex: "00".repeat(32),
            network_hrp: constants::DEFAULT_NETWORK_HRP.to_string(),
        }
    }
}

impl ExchangeConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.exchange_id.is_empty()
            || self.deposit_amount == 0
            || self.max_page_size == 0
            || self.resolution_log_capacity == 0
        {
            return Err(ExchangeError::InvalidInput);
        }
        if self.rune_id.is_native() {
            return Err(ExchangeError::InvalidRuneId);
        }
        self.key_seed()?;
        Ok(())
    }

    /// Decoded key seed.
    pub fn key_seed(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(&self.key_seed_hex).map_err(|_| ExchangeError::ChainKeyError)?;
        bytes.try_into().map_err(|_| ExchangeError::ChainKeyError)
    }
}
