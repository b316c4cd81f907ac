//! Intention validator: the hard gate in front of the settlement coordinator.
//!
//! Validation is a pure function of committed pool state and the intention.
//! On success it returns an [`IntentPlan`] holding the staged post-state of
//! the pool; nothing in the registry is touched either way.
//!
//! ## Receive-id assignment
//!
//! After the spent outputs are removed, the shortfall between the post
//! reserves and what remains is carried by `pool_utxo_receive` in order:
//! the first new output takes the whole native shortfall plus the first
//! token (ascending id), every further token takes one more output.

use std::str::FromStr;

use runepool_types::{
    ActionKind, Address, CoinBalance, CoinId, ExchangeConfig, ExchangeError, Intention,
    IntentionSet, OutPoint, Reserves, Result, Satoshi, Utxo, ledger,
};

use crate::fee_floor::FeeFloor;
use crate::pool::Pool;
use crate::registry::PoolRegistry;

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentPlan {
    pub action: ActionKind,
    pub initiator: Address,
    /// Pool post-state carrying `nonce + 1`. Not committed.
    pub staged: Pool,
    /// Sum of input coin claims.
    pub inflow: Reserves,
    /// Sum of output coin grants.
    pub outflow: Reserves,
    /// Tokens claimed in that the pool has never held.
    pub unknown_tokens: Vec<CoinId>,
    /// Native value checked against the floor; zero for token-only intents.
    pub tx_value: Satoshi,
}

pub struct IntentionValidator {
    exchange_id: String,
    /// Token rewards are paid in; register and withdraw settle only on
    /// pools of this token.
    reward_token: CoinId,
    register_fee: Satoshi,
    floor: FeeFloor,
}

impl IntentionValidator {
    #[must_use]
    pub fn new(
        exchange_id: impl Into<String>,
        reward_token: CoinId,
        register_fee: Satoshi,
        floor: FeeFloor,
    ) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            reward_token,
            register_fee,
            floor,
        }
    }

    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(
            config.exchange_id.clone(),
            config.rune_id,
            config.register_fee,
            FeeFloor::from_config(config),
        )
    }

    #[must_use]
    pub fn floor(&self) -> &FeeFloor {
        &self.floor
    }

    /// Validate the intention at `index` of `set` against committed state.
    ///
    /// # Errors
    /// The first failing check, in order: input shape, pool lookup, nonce,
    /// outputs and conservation, minimal value.
    pub fn validate(
        &self,
        registry: &PoolRegistry,
        set: &IntentionSet,
        index: u32,
        queue_len: u32,
    ) -> Result<IntentPlan> {
        let intention = usize::try_from(index)
            .ok()
            .and_then(|i| set.intentions.get(i))
            .ok_or(ExchangeError::InvalidInput)?;

        // 0. Envelope
        if intention.exchange_id != self.exchange_id {
            tracing::warn!(
                expected = %self.exchange_id,
                actual = %intention.exchange_id,
                "Intent for a different exchange"
            );
            return Err(ExchangeError::InvalidInput);
        }
        let action = ActionKind::from_str(&intention.action)?;
        for coin in intention
            .input_coins
            .iter()
            .map(|c| &c.coin)
            .chain(intention.output_coins.iter().map(|c| &c.coin))
        {
            check_coin(coin)?;
        }

        // 1. Pool
        let pool = registry.require(&intention.pool_address)?;

        // 2. Optimistic-concurrency guard
        if intention.nonce != pool.nonce() {
            tracing::warn!(
                pool = %intention.pool_address,
                expected = pool.nonce(),
                actual = intention.nonce,
                "Stale intent nonce"
            );
            return Err(ExchangeError::PoolStateExpired(pool.nonce()));
        }

        if !pool.is_funded()
            && (!intention.output_coins.is_empty() || !intention.pool_utxo_spend.is_empty())
        {
            return Err(ExchangeError::EmptyPool);
        }
        self.check_shape(action, intention, &set.initiator_address, pool)?;

        // 3. Outputs and conservation
        let mut inflow = Reserves::new();
        for input in &intention.input_coins {
            inflow.credit(&input.coin)?;
        }
        let mut outflow = Reserves::new();
        for output in &intention.output_coins {
            outflow.credit(&output.coin)?;
        }
        let unknown_tokens = inflow
            .tokens
            .keys()
            .copied()
            .filter(|id| *id != pool.token() && pool.reserves().amount_of(id) == 0)
            .collect();

        let mut post = pool.reserves().clone();
        post.merge(&inflow)?;
        debit_all(&mut post, &outflow)?;

        let spend = parse_outpoints(&intention.pool_utxo_spend)?;
        let receive_ids = parse_outpoints(&intention.pool_utxo_receive)?;
        let mut remaining = pool.utxos().clone();
        remaining.spend(&spend)?;
        let receive = assign_receive(&receive_ids, &remaining.projected_reserves()?, &post)?;
        let staged = pool.transition(&spend, receive, post)?;

        // 4. Minimal value
        let tx_value = inflow.native.max(outflow.native);
        if tx_value > 0 {
            self.floor.check(tx_value, queue_len)?;
        }

        Ok(IntentPlan {
            action,
            initiator: set.initiator_address.clone(),
            staged,
            inflow,
            outflow,
            unknown_tokens,
            tx_value,
        })
    }

    /// Per-action constraints on inputs and outputs.
    fn check_shape(
        &self,
        action: ActionKind,
        intention: &Intention,
        initiator: &str,
        pool: &Pool,
    ) -> Result<()> {
        let inputs = &intention.input_coins;
        let outputs = &intention.output_coins;
        let ok = match action {
            ActionKind::Swap => !inputs.is_empty() && !outputs.is_empty(),
            ActionKind::AddLiquidity => !inputs.is_empty() && outputs.is_empty(),
            ActionKind::Register => {
                pool.token() == self.reward_token
                    && outputs.is_empty()
                    && matches!(inputs.as_slice(), [fee]
                        if fee.from == initiator
                            && fee.coin == CoinBalance::native(self.register_fee))
            }
            ActionKind::Withdraw => {
                pool.token() == self.reward_token
                    && inputs.is_empty()
                    && matches!(outputs.as_slice(), [payout]
                        if payout.to == initiator && payout.coin.id == self.reward_token)
            }
        };
        if !ok {
            tracing::warn!(%action, pool = %intention.pool_address, "Malformed intent shape");
            return Err(ExchangeError::InvalidInput);
        }
        Ok(())
    }
}

fn check_coin(coin: &CoinBalance) -> Result<()> {
    if matches!(coin.id, CoinId::Rune { block: 0, .. }) {
        return Err(ExchangeError::InvalidRuneId);
    }
    if coin.value == 0 {
        return Err(ExchangeError::InvalidInput);
    }
    Ok(())
}

fn debit_all(post: &mut Reserves, outflow: &Reserves) -> Result<()> {
    let grants =
        std::iter::once(CoinBalance::native(outflow.native)).chain(outflow.coin_balances());
    for grant in grants {
        post.debit(&grant).map_err(|err| match err {
            ExchangeError::InsufficientFunds => ExchangeError::InvalidLiquidity,
            other => other,
        })?;
    }
    Ok(())
}

fn parse_outpoints(ids: &[String]) -> Result<Vec<OutPoint>> {
    ids.iter().map(|id| id.parse()).collect()
}

/// Build the new pool outputs that carry `post − remaining`.
fn assign_receive(ids: &[OutPoint], remaining: &Reserves, post: &Reserves) -> Result<Vec<Utxo>> {
    let native = ledger::sub_sats(post.native, remaining.native)
        .map_err(|_| ExchangeError::InvalidLiquidity)?;

    for (id, value) in &remaining.tokens {
        if post.amount_of(id) < *value {
            return Err(ExchangeError::InvalidLiquidity);
        }
    }
    let mut tokens = Vec::new();
    for (id, value) in &post.tokens {
        let short = ledger::sub(*value, remaining.amount_of(id))?;
        if short > 0 {
            tokens.push(CoinBalance::new(*id, short));
        }
    }

    let needed = if native == 0 && tokens.is_empty() {
        0
    } else {
        tokens.len().max(1)
    };
    if ids.len() != needed {
        tracing::warn!(needed, supplied = ids.len(), "Receive ids do not match shortfall");
        return Err(ExchangeError::InvalidInput);
    }

    let mut tokens = tokens.into_iter();
    ids.iter()
        .enumerate()
        .map(|(i, outpoint)| {
            let sats = if i == 0 { native } else { 0 };
            Utxo::new(*outpoint, sats, tokens.next())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use runepool_types::{InputCoin, OutputCoin, Txid};

    use super::*;
    use crate::pool::tests::{funded_pool, rune_a};

    const USER: &str = "bc1quser";

    fn validator() -> IntentionValidator {
        IntentionValidator::new("RUNEPOOL", rune_a(), 10, FeeFloor::new(10, 1, 5))
    }

    fn registry() -> PoolRegistry {
        let mut reg = PoolRegistry::new();
        reg.register(funded_pool("tb1pa")).unwrap();
        reg
    }

    fn new_out(seed: u64) -> String {
        OutPoint::new(Txid::from_seed(seed), 0).to_string()
    }

    /// 10 native in, 5 of token A out, spending both pool outputs.
    fn swap(nonce: u64) -> Intention {
        Intention {
            exchange_id: "RUNEPOOL".into(),
            action: "swap".into(),
            action_params: String::new(),
            pool_address: "tb1pa".into(),
            nonce,
            pool_utxo_spend: vec![
                Utxo::native(1, 100).outpoint().to_string(),
                Utxo::with_rune(2, 0, rune_a(), 50).outpoint().to_string(),
            ],
            pool_utxo_receive: vec![new_out(10)],
            input_coins: vec![InputCoin {
                from: USER.into(),
                coin: CoinBalance::native(10),
            }],
            output_coins: vec![OutputCoin {
                to: USER.into(),
                coin: CoinBalance::new(rune_a(), 5),
            }],
        }
    }

    fn set(intention: Intention) -> IntentionSet {
        IntentionSet {
            initiator_address: USER.into(),
            intentions: vec![intention],
        }
    }

    #[test]
    fn swap_stages_post_state() {
        let reg = registry();
        let plan = validator().validate(&reg, &set(swap(0)), 0, 0).unwrap();
        assert_eq!(plan.action, ActionKind::Swap);
        assert_eq!(plan.staged.nonce(), 1);
        assert_eq!(plan.staged.reserves().native, 110);
        assert_eq!(plan.staged.reserves().amount_of(&rune_a()), 45);
        assert_eq!(plan.staged.utxos().len(), 1);
        assert_eq!(plan.tx_value, 10);
        assert!(plan.unknown_tokens.is_empty());
        // Committed state untouched.
        assert_eq!(reg.get("tb1pa").unwrap().nonce(), 0);
        assert_eq!(reg.get("tb1pa").unwrap().reserves().native, 100);
    }

    #[test]
    fn stale_nonce_reports_current() {
        let err = validator().validate(&registry(), &set(swap(3)), 0, 0).unwrap_err();
        assert_eq!(err, ExchangeError::PoolStateExpired(0));
    }

    #[test]
    fn unknown_pool() {
        let mut intent = swap(0);
        intent.pool_address = "tb1pnowhere".into();
        let err = validator().validate(&registry(), &set(intent), 0, 0).unwrap_err();
        assert_eq!(err, ExchangeError::PoolAddressNotFound);
    }

    #[test]
    fn wrong_exchange_and_bad_index() {
        let mut intent = swap(0);
        intent.exchange_id = "OTHER".into();
        let v = validator();
        let reg = registry();
        assert_eq!(v.validate(&reg, &set(intent), 0, 0), Err(ExchangeError::InvalidInput));
        assert_eq!(v.validate(&reg, &set(swap(0)), 1, 0), Err(ExchangeError::InvalidInput));
    }

    #[test]
    fn unknown_action() {
        let mut intent = swap(0);
        intent.action = "mint".into();
        let err = validator().validate(&registry(), &set(intent), 0, 0).unwrap_err();
        assert_eq!(err, ExchangeError::InvalidInput);
    }

    #[test]
    fn overdrawn_reserves_are_invalid_liquidity() {
        let mut intent = swap(0);
        intent.output_coins[0].coin = CoinBalance::new(rune_a(), 51);
        let err = validator().validate(&registry(), &set(intent), 0, 0).unwrap_err();
        assert_eq!(err, ExchangeError::InvalidLiquidity);
    }

    #[test]
    fn grant_without_spending_the_output_is_invalid_liquidity() {
        let mut intent = swap(0);
        intent.pool_utxo_spend.truncate(1);
        let err = validator().validate(&registry(), &set(intent), 0, 0).unwrap_err();
        assert_eq!(err, ExchangeError::InvalidLiquidity);
    }

    #[test]
    fn spending_foreign_output_rejected() {
        let mut intent = swap(0);
        intent.pool_utxo_spend.push(new_out(77));
        let err = validator().validate(&registry(), &set(intent), 0, 0).unwrap_err();
        assert_eq!(err, ExchangeError::InvalidInput);
    }

    #[test]
    fn receive_count_must_match_shortfall() {
        let mut intent = swap(0);
        intent.pool_utxo_receive.push(new_out(11));
        assert_eq!(
            validator().validate(&registry(), &set(intent), 0, 0),
            Err(ExchangeError::InvalidInput)
        );
        let mut intent = swap(0);
        intent.pool_utxo_receive.clear();
        assert_eq!(
            validator().validate(&registry(), &set(intent), 0, 0),
            Err(ExchangeError::InvalidInput)
        );
    }

    #[test]
    fn malformed_outpoint_rejected() {
        let mut intent = swap(0);
        intent.pool_utxo_receive = vec!["zz:0".into()];
        let err = validator().validate(&registry(), &set(intent), 0, 0).unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidTxid(_)));
    }

    #[test]
    fn below_floor_rejected() {
        let err = validator().validate(&registry(), &set(swap(0)), 0, 1).unwrap_err();
        assert_eq!(err, ExchangeError::TooSmallFunds);
    }

    #[test]
    fn zero_and_malformed_coins() {
        let mut intent = swap(0);
        intent.input_coins[0].coin = CoinBalance::native(0);
        assert_eq!(
            validator().validate(&registry(), &set(intent), 0, 0),
            Err(ExchangeError::InvalidInput)
        );
        let mut intent = swap(0);
        intent.output_coins[0].coin = CoinBalance::new(CoinId::Rune { block: 0, tx: 3 }, 1);
        assert_eq!(
            validator().validate(&registry(), &set(intent), 0, 0),
            Err(ExchangeError::InvalidRuneId)
        );
    }

    #[test]
    fn add_liquidity_with_new_token_reports_it() {
        let other = CoinId::rune(900_000, 2);
        let intent = Intention {
            action: "add_liquidity".into(),
            pool_utxo_spend: vec![],
            input_coins: vec![InputCoin {
                from: USER.into(),
                coin: CoinBalance::new(other, 7),
            }],
            output_coins: vec![],
            ..swap(0)
        };
        let plan = validator().validate(&registry(), &set(intent), 0, 0).unwrap();
        assert_eq!(plan.unknown_tokens, vec![other]);
        assert_eq!(plan.tx_value, 0, "token-only intents are exempt from the floor");
        assert_eq!(plan.staged.reserves().amount_of(&other), 7);
    }

    #[test]
    fn register_requires_exact_fee() {
        let intent = Intention {
            action: "register".into(),
            pool_utxo_spend: vec![Utxo::native(1, 100).outpoint().to_string()],
            input_coins: vec![InputCoin {
                from: USER.into(),
                coin: CoinBalance::native(10),
            }],
            output_coins: vec![],
            ..swap(0)
        };
        let plan = validator().validate(&registry(), &set(intent.clone()), 0, 0).unwrap();
        assert_eq!(plan.staged.reserves().native, 110);

        let mut underpaid = intent;
        underpaid.input_coins[0].coin = CoinBalance::native(9);
        assert_eq!(
            validator().validate(&registry(), &set(underpaid), 0, 0),
            Err(ExchangeError::InvalidInput)
        );
    }

    #[test]
    fn withdraw_must_pay_initiator_in_reward_token() {
        let intent = Intention {
            action: "withdraw".into(),
            pool_utxo_spend: vec![Utxo::with_rune(2, 0, rune_a(), 50).outpoint().to_string()],
            input_coins: vec![],
            ..swap(0)
        };
        let plan = validator().validate(&registry(), &set(intent.clone()), 0, 0).unwrap();
        assert_eq!(plan.outflow.amount_of(&rune_a()), 5);

        let mut elsewhere = intent;
        elsewhere.output_coins[0].to = "bc1qother".into();
        assert_eq!(
            validator().validate(&registry(), &set(elsewhere), 0, 0),
            Err(ExchangeError::InvalidInput)
        );
    }

    #[test]
    fn reward_actions_rejected_on_foreign_token_pool() {
        let side = CoinId::rune(900_000, 4);
        let mut reg = registry();
        let mut pool = Pool::new("SIDE", crate::pool::tests::keys("tb1pside"), side, 50, "");
        pool.fund(vec![Utxo::native(3, 100), Utxo::with_rune(4, 0, side, 50)])
            .unwrap();
        reg.register(pool).unwrap();

        let withdraw = Intention {
            action: "withdraw".into(),
            pool_address: "tb1pside".into(),
            pool_utxo_spend: vec![Utxo::with_rune(4, 0, side, 50).outpoint().to_string()],
            input_coins: vec![],
            output_coins: vec![OutputCoin {
                to: USER.into(),
                coin: CoinBalance::new(side, 8),
            }],
            ..swap(0)
        };
        assert_eq!(
            validator().validate(&reg, &set(withdraw), 0, 0),
            Err(ExchangeError::InvalidInput)
        );

        let register = Intention {
            action: "register".into(),
            pool_address: "tb1pside".into(),
            pool_utxo_spend: vec![Utxo::native(3, 100).outpoint().to_string()],
            input_coins: vec![InputCoin {
                from: USER.into(),
                coin: CoinBalance::native(10),
            }],
            output_coins: vec![],
            ..swap(0)
        };
        assert_eq!(
            validator().validate(&reg, &set(register), 0, 0),
            Err(ExchangeError::InvalidInput)
        );
    }

    #[test]
    fn empty_pool_cannot_pay_out() {
        let mut reg = PoolRegistry::new();
        reg.register(Pool::new(
            "COOKIE",
            crate::pool::tests::keys("tb1pa"),
            rune_a(),
            50,
            "",
        ))
        .unwrap();
        let err = validator().validate(&reg, &set(swap(0)), 0, 0).unwrap_err();
        assert_eq!(err, ExchangeError::EmptyPool);
    }
}
