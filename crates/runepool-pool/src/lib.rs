//! # runepool-pool
//!
//! **Pool plane**: everything that reads or computes pool state without
//! committing it.
//!
//! 1. **UtxoSet**: outpoint-keyed unspent outputs of one pool
//! 2. **Pool**: committed reserves, Utxo set, and nonce
//! 3. **PoolRegistry**: address-keyed pools, genesis deposits, commits
//! 4. **ChainKeyService**: key derivation and spend signatures
//! 5. **IntentionValidator**: the gate that turns an intention into a staged post-state
//! 6. **FeeFloor**: minimal tx value under zero-confirmation load
//!
//! ## Intent Flow
//!
//! ```text
//! Intention → IntentionValidator.validate() → IntentPlan { staged: Pool }
//!           → (settlement) → PoolRegistry.commit(staged)
//! ```

pub mod fee_floor;
pub mod keys;
pub mod pool;
pub mod registry;
pub mod utxo_set;
pub mod validator;

pub use fee_floor::FeeFloor;
pub use keys::{ChainKeyService, LocalKeyService, verify_signature};
pub use pool::Pool;
pub use registry::PoolRegistry;
pub use utxo_set::UtxoSet;
pub use validator::{IntentPlan, IntentionValidator};
