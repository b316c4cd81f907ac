//! Resolution log: how each settled transaction ended.
//!
//! The chain-confirmation notifier delivers at least once, so a repeated
//! `finalize_tx` or `rollback_tx` has to be answered from memory once the
//! pending slot is gone. The log is bounded; when full, the oldest entry is
//! evicted.

use std::collections::{HashMap, VecDeque};

use runepool_types::{Address, Txid};

/// Terminal status of a transaction against one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Finalized,
    RolledBack,
}

/// A transaction may touch several pools; each pool resolves it separately.
pub type ResolutionKey = (Address, Txid);

pub struct ResolutionLog {
    resolved: HashMap<ResolutionKey, Resolution>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<ResolutionKey>,
    max_size: usize,
}

impl ResolutionLog {
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            resolved: HashMap::with_capacity(max_size.min(1024)),
            order: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Record the outcome for `key`. A key is resolved at most once; a
    /// second record keeps the first outcome.
    pub fn record(&mut self, key: ResolutionKey, resolution: Resolution) {
        if self.resolved.contains_key(&key) {
            return;
        }
        if self.resolved.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.resolved.remove(&oldest);
            }
        }
        self.resolved.insert(key.clone(), resolution);
        self.order.push_back(key);
    }

    #[must_use]
    pub fn get(&self, pool: &str, txid: &Txid) -> Option<Resolution> {
        self.resolved.get(&(pool.to_string(), *txid)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}
