//! Rune indexer seam.
//!
//! The exchange never computes Rune balances itself; it asks an indexer.
//! Upstream failures carry the indexer's [`RejectionCode`] verbatim.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use runepool_types::{CoinBalance, CoinId, ExchangeError, OutPoint, RejectionCode, Result};
use serde::{Deserialize, Serialize};

/// Registry entry of an etched Rune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuneEntry {
    pub id: CoinId,
    pub spaced_rune: String,
    pub divisibility: u8,
    pub symbol: Option<String>,
}

#[async_trait]
pub trait RuneIndexer: Send + Sync {
    /// `None` if no Rune was etched at `id`.
    async fn get_rune_entry(&self, id: CoinId) -> Result<Option<RuneEntry>>;

    /// Rune balances the indexer attributes to `outpoint`.
    async fn get_output_balances(&self, outpoint: OutPoint) -> Result<Vec<CoinBalance>>;
}

/// In-memory indexer with scriptable failures and latency.
#[derive(Default)]
pub struct MockIndexer {
    entries: Mutex<HashMap<CoinId, RuneEntry>>,
    outputs: Mutex<HashMap<OutPoint, Vec<CoinBalance>>>,
    failure: Mutex<Option<ExchangeError>>,
    delay: Mutex<Option<Duration>>,
}

impl MockIndexer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rune(&self, id: CoinId, spaced_rune: &str) {
        let entry = RuneEntry {
            id,
            spaced_rune: spaced_rune.to_string(),
            divisibility: 0,
            symbol: None,
        };
        lock(&self.entries).insert(id, entry);
    }

    pub fn set_output(&self, outpoint: OutPoint, balances: Vec<CoinBalance>) {
        lock(&self.outputs).insert(outpoint, balances);
    }

    /// Every subsequent call fails with `FetchRuneIndexerError(code, message)`.
    pub fn fail_with(&self, code: RejectionCode, message: &str) {
        *lock(&self.failure) = Some(ExchangeError::FetchRuneIndexerError(code, message.into()));
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Every subsequent call sleeps this long before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }

    async fn respond(&self) -> Result<()> {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match lock(&self.failure).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RuneIndexer for MockIndexer {
    async fn get_rune_entry(&self, id: CoinId) -> Result<Option<RuneEntry>> {
        self.respond().await?;
        Ok(lock(&self.entries).get(&id).cloned())
    }

    async fn get_output_balances(&self, outpoint: OutPoint) -> Result<Vec<CoinBalance>> {
        self.respond().await?;
        Ok(lock(&self.outputs).get(&outpoint).cloned().unwrap_or_default())
    }
}

/// A poisoned mock lock only means another test thread panicked.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
