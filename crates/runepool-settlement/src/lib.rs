//! # runepool-settlement
//!
//! **Finality Plane**: staged execution against pools, commit or discard
//! on chain confirmation, and the reward accounts riding on it.
//!
//! ## Architecture
//!
//! The [`SettlementCoordinator`] owns the [`runepool_pool::PoolRegistry`] and:
//! 1. Stages a validated post-state in the pool's single pending slot
//! 2. Refuses a second execute while the slot is taken (`PoolBusy`)
//! 3. On finalize, checks reserve conservation and commits (nonce + 1)
//! 4. On rollback, drops the slot; committed state is already the pre-state
//! 5. Answers repeated finalize/rollback from the resolution log
//!
//! ## Lifecycle
//!
//! ```text
//! NoPending ──execute──▶ Pending ──finalize──▶ Finalized
//!                           └─────rollback──▶ RolledBack
//! ```

pub mod accounts;
pub mod clock;
pub mod conservation;
pub mod coordinator;
pub mod pending;
pub mod resolution;

pub use accounts::AccountBook;
pub use clock::{Clock, ManualClock, SystemClock};
pub use conservation::ReserveConservation;
pub use coordinator::{PreparedTx, SettlementCoordinator, StagedExecution};
pub use pending::{AccountEffect, PendingTransaction, TxStatus};
pub use resolution::{Resolution, ResolutionLog};
