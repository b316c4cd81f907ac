//! System-wide constants for the Runepool settlement engine.

/// Base floor for a native-moving intent, in satoshis.
pub const DEFAULT_MIN_TX_VALUE: u64 = 10_000;

/// Floor increment per entry in the zero-confirmation queue.
pub const DEFAULT_QUEUE_FLOOR_STEP: u64 = 1_000;

/// Queue depth beyond which the floor stops rising.
pub const DEFAULT_MAX_QUEUE_DEPTH: u32 = 25;

/// Default registration fee in satoshis.
pub const DEFAULT_REGISTER_FEE: u64 = 10_000;

/// Default minimum interval between claims or withdrawals.
pub const DEFAULT_CLAIM_COOLDOWN_SECS: u64 = 60 * 60;

/// Largest page `get_pool_list` returns.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Upper bound on a rune indexer round trip.
pub const DEFAULT_INDEXER_TIMEOUT_MS: u64 = 5_000;

/// Resolved transaction ids remembered for idempotent finalize/rollback.
pub const DEFAULT_RESOLUTION_LOG_CAPACITY: usize = 100_000;

/// Default exchange identifier intents must carry.
pub const DEFAULT_EXCHANGE_ID: &str = "RUNEPOOL";

/// Default address prefix for derived pool addresses.
pub const DEFAULT_NETWORK_HRP: &str = "tb1p";

/// Domain tag mixed into every key derivation.
pub const KEY_DERIVATION_TAG: &[u8] = b"runepool:key:v1:";

/// Tag for deriving the tweaked key from the untweaked one.
pub const KEY_TWEAK_TAG: &[u8] = b"TapTweak";
