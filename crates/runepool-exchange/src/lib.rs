//! # runepool-exchange
//!
//! Request/response surface of the Runepool settlement engine.
//!
//! [`Exchange`] wires the settlement coordinator to its external
//! collaborators:
//!
//! - a [`runepool_pool::ChainKeyService`] for pool keys and spend signatures
//! - a [`RuneIndexer`] for Rune registry entries and output balances
//! - a [`runepool_settlement::Clock`] for cooldowns
//!
//! | Operation | Kind |
//! |---|---|
//! | `init_key`, `create_pool`, `deposit` | pool setup |
//! | `execute_tx`, `finalize_tx`, `rollback_tx` | settlement |
//! | `get_pool_info`, `get_pool_list`, `get_minimal_tx_value`, `query_register_info`, `query_rune_deposit_address` | read-only |
//! | `claim`, `accrue_rewards`, `get_account` | rewards |

pub mod exchange;
pub mod oracle;
pub mod telemetry;

pub use exchange::{AccountView, Exchange};
pub use oracle::{MockIndexer, RuneEntry, RuneIndexer};
pub use telemetry::init_tracing;
