//! End-to-end settlement tests.
//!
//! Genesis deposit -> execute -> finalize | rollback, exercised through the
//! coordinator with pools keyed by the local key service. Covers the
//! conservation, nonce, idempotency, and cooldown properties and the
//! reward register/claim/withdraw cycle.

use std::collections::BTreeSet;

use runepool_pool::{FeeFloor, IntentionValidator, LocalKeyService, Pool};
use runepool_settlement::{AccountBook, SettlementCoordinator, TxStatus};
use runepool_types::*;

const USER: &str = "bc1quser";
const COOLDOWN: u64 = 60;

fn rune_a() -> CoinId {
    CoinId::rune(840_000, 1)
}

/// Coordinator plus the addresses and keys of the pools it holds.
struct Harness {
    coord: SettlementCoordinator,
    keys: LocalKeyService,
    next_seed: u64,
}

impl Harness {
    fn new() -> Self {
        let coord = SettlementCoordinator::new(
            IntentionValidator::new("RUNEPOOL", rune_a(), 10, FeeFloor::new(10, 1, 5)),
            AccountBook::new(COOLDOWN, 1_000),
            64,
        );
        Self {
            coord,
            keys: LocalKeyService::new([3u8; 32], "tb1p"),
            next_seed: 100,
        }
    }

    /// Register and fund a pool with 100 native and 50 of token A.
    fn funded_pool(&mut self, name: &str) -> PoolKeys {
        let keys = self.keys.derive_keys(&[name.as_bytes().to_vec()]);
        self.coord
            .register_pool(Pool::new(name, keys.clone(), rune_a(), 50, ""))
            .unwrap();
        let seed = self.seed();
        self.coord
            .deposit(
                &keys.address,
                Utxo::with_rune(seed, 0, rune_a(), 50),
                Utxo::native(seed + 1, 100),
            )
            .unwrap();
        keys
    }

    fn seed(&mut self) -> u64 {
        self.next_seed += 2;
        self.next_seed
    }

    fn pool(&self, keys: &PoolKeys) -> &Pool {
        self.coord.registry().get(&keys.address).unwrap()
    }

    /// Intent spending every pool output and consolidating into one new output.
    fn intent(
        &mut self,
        keys: &PoolKeys,
        action: &str,
        inputs: Vec<CoinBalance>,
        outputs: Vec<CoinBalance>,
    ) -> ExecuteTxArgs {
        let pool = self.pool(keys);
        let nonce = pool.nonce();
        let spend = pool.utxos().iter().map(|u| u.outpoint().to_string()).collect();
        let seed = self.seed();
        ExecuteTxArgs {
            psbt_hex: hex::encode(seed.to_be_bytes()),
            txid: Txid::from_seed(seed).to_string(),
            intention_set: IntentionSet {
                initiator_address: USER.into(),
                intentions: vec![Intention {
                    exchange_id: "RUNEPOOL".into(),
                    action: action.into(),
                    action_params: String::new(),
                    pool_address: keys.address.clone(),
                    nonce,
                    pool_utxo_spend: spend,
                    pool_utxo_receive: vec![OutPoint::new(Txid::from_seed(seed), 0).to_string()],
                    input_coins: inputs
                        .into_iter()
                        .map(|coin| InputCoin {
                            from: USER.into(),
                            coin,
                        })
                        .collect(),
                    output_coins: outputs
                        .into_iter()
                        .map(|coin| OutputCoin {
                            to: USER.into(),
                            coin,
                        })
                        .collect(),
                }],
            },
            intention_index: 0,
            zero_confirmed_tx_queue_length: 0,
        }
    }

    fn swap(&mut self, keys: &PoolKeys, native_in: u64, token_out: u128) -> ExecuteTxArgs {
        self.intent(
            keys,
            "swap",
            vec![CoinBalance::native(native_in)],
            vec![CoinBalance::new(rune_a(), token_out)],
        )
    }

    fn execute(&mut self, args: &ExecuteTxArgs, now: u64) -> Result<()> {
        self.coord.execute(args, &BTreeSet::new(), now).map(|_| ())
    }

    fn finalize(&mut self, args: &ExecuteTxArgs, keys: &PoolKeys, now: u64) -> Result<()> {
        self.coord.finalize(&args.txid, &keys.untweaked, now)
    }

    fn rollback(&mut self, args: &ExecuteTxArgs, keys: &PoolKeys) -> Result<()> {
        self.coord.rollback(&args.txid, &keys.untweaked)
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn deposit_then_swap() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    assert_eq!(h.pool(&pool).reserves().native, 100);
    assert_eq!(h.pool(&pool).reserves().amount_of(&rune_a()), 50);

    let swap = h.swap(&pool, 10, 5);
    h.execute(&swap, 0).unwrap();
    let staged = h.coord.pending(&pool.address).unwrap();
    assert_eq!(staged.staged.reserves().native, 110);
    assert_eq!(staged.staged.reserves().amount_of(&rune_a()), 45);
    // Reads see committed state only.
    assert_eq!(h.coord.registry().pool_info(&pool.address).unwrap().btc_reserved, 100);

    h.finalize(&swap, &pool, 1).unwrap();
    let info = h.coord.registry().pool_info(&pool.address).unwrap();
    assert_eq!(info.nonce, 1);
    assert_eq!(info.btc_reserved, 110);
    assert_eq!(info.coin_reserved, vec![CoinBalance::new(rune_a(), 45)]);
}

#[test]
fn conflicting_intents_second_is_stale() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    let first = h.swap(&pool, 10, 5);
    let second = h.swap(&pool, 20, 10);
    assert_eq!(
        first.intention_set.intentions[0].nonce,
        second.intention_set.intentions[0].nonce
    );

    h.execute(&first, 0).unwrap();
    h.finalize(&first, &pool, 0).unwrap();

    let before = h.pool(&pool).clone();
    assert_eq!(h.execute(&second, 0), Err(ExchangeError::PoolStateExpired(1)));
    assert_eq!(h.pool(&pool), &before);
    assert!(h.coord.pending(&pool.address).is_none());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn nonce_counts_only_finalizations() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    let mut finalized = 0;
    for round in 0..6u64 {
        let swap = h.swap(&pool, 10 + round, 1);
        h.execute(&swap, 0).unwrap();
        if round % 3 == 1 {
            h.rollback(&swap, &pool).unwrap();
        } else {
            h.finalize(&swap, &pool, 0).unwrap();
            finalized += 1;
        }
    }
    assert_eq!(h.pool(&pool).nonce(), finalized);
}

#[test]
fn conservation_holds_across_finalizations() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    let mut native_in = 0u64;
    let mut token_out = 0u128;
    for (sats, tokens) in [(10, 5), (25, 3), (12, 12)] {
        let swap = h.swap(&pool, sats, tokens);
        h.execute(&swap, 0).unwrap();
        h.finalize(&swap, &pool, 0).unwrap();
        native_in += sats;
        token_out += tokens;
    }
    let reserves = h.pool(&pool).reserves().clone();
    assert_eq!(reserves.native, 100 + native_in);
    assert_eq!(reserves.amount_of(&rune_a()), 50 - token_out);
    assert_eq!(h.pool(&pool).utxos().projected_reserves().unwrap(), reserves);
    assert_eq!(
        h.coord.conservation().expected_reserves(&pool.address).unwrap(),
        reserves
    );
}

#[test]
fn finalize_and_rollback_are_idempotent() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");

    let swap = h.swap(&pool, 10, 5);
    h.execute(&swap, 0).unwrap();
    h.finalize(&swap, &pool, 0).unwrap();
    let once = h.pool(&pool).clone();
    h.finalize(&swap, &pool, 0).unwrap();
    assert_eq!(h.pool(&pool), &once);

    let undone = h.swap(&pool, 10, 5);
    h.execute(&undone, 0).unwrap();
    h.rollback(&undone, &pool).unwrap();
    h.rollback(&undone, &pool).unwrap();
    assert_eq!(h.pool(&pool), &once);
    let txid: Txid = undone.txid.parse().unwrap();
    assert_eq!(h.coord.tx_status(&pool.address, &txid), Some(TxStatus::RolledBack));
}

#[test]
fn rollback_restores_exact_pre_state() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    let before = h.pool(&pool).clone();

    let swap = h.swap(&pool, 40, 20);
    h.execute(&swap, 0).unwrap();
    h.rollback(&swap, &pool).unwrap();

    assert_eq!(h.pool(&pool), &before);
    assert!(h.coord.pending(&pool.address).is_none());
    // The pool accepts a fresh intent against the untouched nonce.
    let retry = h.swap(&pool, 40, 20);
    h.execute(&retry, 0).unwrap();
}

#[test]
fn rejected_execute_leaves_state_untouched() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    let before = h.pool(&pool).clone();
    let greedy = h.swap(&pool, 10, 500);
    assert_eq!(h.execute(&greedy, 0), Err(ExchangeError::InvalidLiquidity));
    let dust = h.swap(&pool, 9, 1);
    assert_eq!(h.execute(&dust, 0), Err(ExchangeError::TooSmallFunds));
    assert_eq!(h.pool(&pool), &before);
    assert!(h.coord.pending(&pool.address).is_none());
}

#[test]
fn pools_settle_independently() {
    let mut h = Harness::new();
    let a = h.funded_pool("ALPHA");
    let b = h.funded_pool("BETA");
    let on_a = h.swap(&a, 10, 5);
    let on_b = h.swap(&b, 20, 5);
    h.execute(&on_a, 0).unwrap();
    h.execute(&on_b, 0).unwrap();
    h.rollback(&on_a, &a).unwrap();
    h.finalize(&on_b, &b, 0).unwrap();
    assert_eq!(h.pool(&a).nonce(), 0);
    assert_eq!(h.pool(&b).nonce(), 1);
    assert_eq!(h.pool(&b).reserves().native, 120);
}

// ---------------------------------------------------------------------------
// Reward accounts
// ---------------------------------------------------------------------------

fn register(h: &mut Harness, pool: &PoolKeys, now: u64) {
    let args = h.intent(pool, "register", vec![CoinBalance::native(10)], vec![]);
    h.execute(&args, now).unwrap();
    assert!(h.coord.accounts().get(USER).is_none(), "account waits for finalize");
    h.finalize(&args, pool, now).unwrap();
}

#[test]
fn register_claim_withdraw_cycle() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    register(&mut h, &pool, 0);
    assert_eq!(h.pool(&pool).reserves().native, 110);

    h.coord.accounts_mut().accrue(USER, 5).unwrap();
    assert_eq!(h.coord.claim(USER, 100).unwrap(), 5);

    let withdraw = h.intent(&pool, "withdraw", vec![], vec![CoinBalance::new(rune_a(), 5)]);
    assert_eq!(
        h.execute(&withdraw, 100 + COOLDOWN - 1),
        Err(ExchangeError::GamerCoolingDown(USER.into(), 100 + COOLDOWN))
    );
    h.execute(&withdraw, 100 + COOLDOWN).unwrap();
    h.finalize(&withdraw, &pool, 200).unwrap();

    let account = h.coord.accounts().get(USER).unwrap();
    assert_eq!(account.withdrawable, 0);
    assert_eq!(account.last_action_at, Some(200));
    assert_eq!(h.pool(&pool).reserves().amount_of(&rune_a()), 45);
}

#[test]
fn duplicate_registration_rejected() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    register(&mut h, &pool, 0);
    let again = h.intent(&pool, "register", vec![CoinBalance::native(10)], vec![]);
    assert_eq!(
        h.execute(&again, 0),
        Err(ExchangeError::GamerAlreadyExist(USER.into()))
    );
}

#[test]
fn rolled_back_withdraw_keeps_rewards() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    register(&mut h, &pool, 0);
    h.coord.accounts_mut().accrue(USER, 7).unwrap();
    h.coord.claim(USER, 0).unwrap();

    let withdraw = h.intent(&pool, "withdraw", vec![], vec![CoinBalance::new(rune_a(), 7)]);
    h.execute(&withdraw, COOLDOWN).unwrap();
    h.rollback(&withdraw, &pool).unwrap();
    assert_eq!(h.coord.accounts().get(USER).unwrap().withdrawable, 7);
}

#[test]
fn second_withdraw_while_pending_rejected() {
    let mut h = Harness::new();
    let a = h.funded_pool("ALPHA");
    let b = h.funded_pool("BETA");
    register(&mut h, &a, 0);
    h.coord.accounts_mut().accrue(USER, 4).unwrap();
    h.coord.claim(USER, 0).unwrap();

    let first = h.intent(&a, "withdraw", vec![], vec![CoinBalance::new(rune_a(), 4)]);
    h.execute(&first, COOLDOWN).unwrap();
    let second = h.intent(&b, "withdraw", vec![], vec![CoinBalance::new(rune_a(), 4)]);
    assert_eq!(
        h.execute(&second, COOLDOWN),
        Err(ExchangeError::GamerWithdrawRepeatedly(USER.into()))
    );
}

#[test]
fn claim_cooldown_boundary() {
    let mut h = Harness::new();
    let pool = h.funded_pool("COOKIE");
    register(&mut h, &pool, 0);
    h.coord.accounts_mut().accrue(USER, 1).unwrap();
    h.coord.claim(USER, 1_000).unwrap();
    h.coord.accounts_mut().accrue(USER, 1).unwrap();
    assert_eq!(
        h.coord.claim(USER, 1_000 + COOLDOWN - 1),
        Err(ExchangeError::GamerCoolingDown(USER.into(), 1_000 + COOLDOWN))
    );
    assert_eq!(h.coord.claim(USER, 1_000 + COOLDOWN), Ok(1));
}
