//! Pass engine.
//!
//! One evaluation/liquidation pass per interval: snapshot assets, prices,
//! and accounts; evaluate; size the best liquidation; submit. Passes run
//! to completion before the next is scheduled (the interval delays missed
//! ticks), a failure inside a pass is caught and logged at the pass
//! boundary, and nothing survives between passes except the injected
//! token-decimals cache.

use anyhow::Result;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::account::{evaluate, AccountSnapshot, EvaluatedAccount};
use crate::actions::{Action, OracleCallMsg};
use crate::asset::{AssetRegistry, LpTokenInfo, LpTokenInfos};
use crate::config::BotConfig;
use crate::error::LiquidationError;
use crate::liquidation::{force_close_action, LiquidationPlan, Sizer};
use crate::margin::{evaluate_margin, withdraw_sweep, MarginPositionSnapshot};
use crate::price::{normalize_pyth, Prices};
use alloy_primitives::U256;
use burrow_chain::{
    AccountSource, AssetSource, PoolSource, PriceSource, TxSubmitter, LIQUIDATION_GAS, ONE_YOCTO,
};
use burrow_dex::{Pool, PoolGraph, TokenDecimalsCache, TokenMetadataSource};

/// Which execution surface a batch of actions targets.
enum ExecKind {
    Regular,
    Margin,
}

/// The component wiring for one agent process.
pub struct Engine {
    accounts: Arc<dyn AccountSource>,
    assets: Arc<dyn AssetSource>,
    prices: Arc<dyn PriceSource>,
    pools: Arc<dyn PoolSource>,
    submitter: Arc<dyn TxSubmitter>,
    metadata: Arc<dyn TokenMetadataSource>,
    decimals_cache: Arc<TokenDecimalsCache>,
    config: BotConfig,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: Arc<dyn AccountSource>,
        assets: Arc<dyn AssetSource>,
        prices: Arc<dyn PriceSource>,
        pools: Arc<dyn PoolSource>,
        submitter: Arc<dyn TxSubmitter>,
        metadata: Arc<dyn TokenMetadataSource>,
        decimals_cache: Arc<TokenDecimalsCache>,
        config: BotConfig,
    ) -> Self {
        Self {
            accounts,
            assets,
            prices,
            pools,
            submitter,
            metadata,
            decimals_cache,
            config,
        }
    }

    /// Run passes on the configured interval until shutdown is signalled.
    ///
    /// Passes never overlap: the next tick is not serviced until the
    /// current pass returns.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.scheduler.loop_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let started = Instant::now();
                    match self.run_pass().await {
                        Ok(()) => info!(
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "evaluation pass completed"
                        ),
                        Err(error) => error!(%error, "evaluation pass failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("shutdown requested, stopping scheduler");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// One full evaluation/liquidation pass.
    #[instrument(skip(self))]
    pub async fn run_pass(&self) -> Result<()> {
        let registry = AssetRegistry::from_views(self.assets.assets().await?);
        let protocol_config = self.assets.protocol_config().await?;
        info!(
            assets = registry.len(),
            pull_oracle = protocol_config.enable_price_oracle,
            "snapshot loaded"
        );

        // Stale prices abort the pass here, before any sizing happens.
        let prices = self
            .fetch_prices(&registry, protocol_config.enable_price_oracle)
            .await?;

        let lp_token_infos = self.fetch_lp_token_infos().await?;
        let evaluated = self.evaluate_accounts(&registry, &prices).await?;

        info!(accounts = evaluated.len(), "accounts evaluated");
        log_riskiest(&evaluated);

        let mut candidates: Vec<&EvaluatedAccount> = evaluated
            .iter()
            .filter(|a| a.discount >= self.config.liquidation.min_discount_dec())
            .collect();
        candidates.sort_by(|a, b| b.discount.cmp(&a.discount));

        self.liquidation_stage(&registry, &prices, &lp_token_infos, &candidates, protocol_config.enable_price_oracle)
            .await?;

        if self.config.liquidation.force_close {
            self.force_close_stage(&candidates, &lp_token_infos, protocol_config.enable_price_oracle)
                .await?;
        }

        if self.config.liquidation.margin {
            self.margin_stage(&registry, &prices, protocol_config.enable_price_oracle)
                .await?;
        }

        Ok(())
    }

    /// Build the price table for this pass from whichever oracle the
    /// protocol is configured to trust.
    async fn fetch_prices(&self, registry: &AssetRegistry, pull_oracle: bool) -> Result<Prices> {
        let now = chrono::Utc::now().timestamp();
        if pull_oracle {
            let data = self.prices.price_data(&registry.token_ids()).await?;
            return Ok(Prices::from_price_data(&data, now)?);
        }

        let max_age = self.config.oracle.pyth_staleness_secs;
        let mut prices = Prices::default();
        for (token_id, info) in self.prices.token_pyth_infos().await? {
            let (quote, derived) = if info.default_price.is_some() {
                (None, None)
            } else {
                let quote = self.prices.pyth_price(&info.price_identifier, max_age).await?;
                let derived = match &info.extra_call {
                    Some(method) => Some(self.prices.derived_rate(&token_id, method).await?),
                    None => None,
                };
                (quote, derived)
            };
            let price = normalize_pyth(
                &token_id,
                &info,
                quote.as_ref(),
                derived.as_deref(),
                now,
                max_age as i64,
            )?;
            prices.insert(token_id, price);
        }
        Ok(prices)
    }

    /// LP-token decompositions with live unit-share amounts.
    async fn fetch_lp_token_infos(&self) -> Result<LpTokenInfos> {
        let mut infos = LpTokenInfos::new();
        for (shadow_token_id, view) in self.assets.lp_token_infos().await? {
            let real_amounts = match LpTokenInfo::pool_id_of(&shadow_token_id) {
                Some(pool_id) => self.pools.unit_share_token_amounts(pool_id).await?,
                None => {
                    warn!(token = %shadow_token_id, "unparsable shadow token id, skipping");
                    continue;
                }
            };
            infos.insert(shadow_token_id, LpTokenInfo::from_view(&view, &real_amounts));
        }
        Ok(infos)
    }

    /// Page through every account and evaluate each lending position.
    /// Accounts referencing unknown assets are skipped with a warning;
    /// zero-debt positions are dropped from candidacy entirely.
    async fn evaluate_accounts(
        &self,
        registry: &AssetRegistry,
        prices: &Prices,
    ) -> Result<Vec<EvaluatedAccount>> {
        let num_accounts = self.accounts.num_accounts().await?;
        let page_size = self.config.scheduler.account_page_size;
        let pages = futures::future::join_all(
            (0..num_accounts)
                .step_by(page_size.max(1) as usize)
                .map(|from_index| self.accounts.accounts_paged(from_index, page_size)),
        )
        .await;

        let mut evaluated = Vec::new();
        for page in pages {
            for view in page? {
                for snapshot in AccountSnapshot::from_view(&view) {
                    match evaluate(&snapshot, registry, prices) {
                        Ok(account) => {
                            if account.health_factor.is_some() {
                                evaluated.push(account);
                            }
                        }
                        Err(error) => {
                            warn!(account = %snapshot.account_id, %error, "skipping account");
                        }
                    }
                }
            }
        }
        evaluated.sort_by(|a, b| a.health_factor.cmp(&b.health_factor));
        Ok(evaluated)
    }

    /// Size every candidate against the liquidator's own account and
    /// submit the single most profitable plan.
    async fn liquidation_stage(
        &self,
        registry: &AssetRegistry,
        prices: &Prices,
        lp_token_infos: &LpTokenInfos,
        candidates: &[&EvaluatedAccount],
        pull_oracle: bool,
    ) -> Result<()> {
        if candidates.is_empty() {
            return Ok(());
        }
        let Some(liquidator) = self.own_account(registry, prices).await? else {
            warn!("liquidator account not found on the protocol, skipping liquidation stage");
            return Ok(());
        };

        let sizer = Sizer {
            assets: registry,
            prices,
            lp_token_infos,
            config: &self.config.liquidation,
        };

        let mut best: Option<LiquidationPlan> = None;
        for candidate in candidates {
            if candidate.account_id == self.config.network.account_id {
                continue;
            }
            if let Some(plan) = sizer.size(candidate, &liquidator) {
                let better = best
                    .as_ref()
                    .map(|b| plan.total_priced_profit > b.total_priced_profit)
                    .unwrap_or(true);
                if better {
                    best = Some(plan);
                }
            }
        }

        let Some(plan) = best else {
            info!("no profitable liquidation this pass");
            return Ok(());
        };
        info!(
            account = %plan.account_id,
            position = %plan.position,
            profit = %plan.real_priced_profit,
            health_before = %plan.orig_health,
            health_after = %plan.new_health,
            "executing liquidation"
        );
        self.submit(ExecKind::Regular, plan.actions, pull_oracle).await
    }

    /// Force-close the first account whose collateral no longer covers its
    /// debt at full value.
    async fn force_close_stage(
        &self,
        candidates: &[&EvaluatedAccount],
        lp_token_infos: &LpTokenInfos,
        pull_oracle: bool,
    ) -> Result<()> {
        let Some(account) = candidates.iter().find(|a| a.is_force_close_eligible()) else {
            return Ok(());
        };
        info!(
            account = %account.account_id,
            position = %account.position,
            collateral = %account.collateral_sum,
            debt = %account.borrowed_sum,
            "executing force close"
        );
        let action = force_close_action(account, lp_token_infos);
        self.submit(ExecKind::Regular, vec![action], pull_oracle).await
    }

    /// Evaluate margin positions, close the most profitable liquidation and
    /// the deepest force-close, then sweep the liquidator's own supplied
    /// balances back out.
    async fn margin_stage(
        &self,
        registry: &AssetRegistry,
        prices: &Prices,
        pull_oracle: bool,
    ) -> Result<()> {
        let margin_config = self.assets.margin_config().await?;
        let graph = self.build_pool_graph().await?;

        let num_accounts = self.accounts.num_margin_accounts().await?;
        let page_size = self.config.scheduler.account_page_size;
        let pages = futures::future::join_all(
            (0..num_accounts)
                .step_by(page_size.max(1) as usize)
                .map(|from_index| self.accounts.margin_accounts_paged(from_index, page_size)),
        )
        .await;

        let mut liquidations = Vec::new();
        let mut force_closes = Vec::new();
        for page in pages {
            for view in page? {
                for snapshot in MarginPositionSnapshot::from_view(&view) {
                    if snapshot.is_locking {
                        continue;
                    }
                    let account_id = snapshot.account_id.clone();
                    match evaluate_margin(snapshot, registry, prices, margin_config.min_safty_buffer)
                    {
                        Ok(position) if position.is_liquidation => liquidations.push(position),
                        Ok(position) if position.is_forceclose => force_closes.push(position),
                        Ok(_) => {}
                        Err(error) => {
                            warn!(account = %account_id, %error, "skipping margin position");
                        }
                    }
                }
            }
        }
        liquidations.sort_by(|a, b| b.profit.cmp(&a.profit));
        force_closes.sort_by(|a, b| b.loss.cmp(&a.loss));

        if let Some(position) = liquidations.first() {
            if position.profit >= self.config.liquidation.min_profit_dec() {
                self.submit_margin_position(position, registry, prices, &graph, pull_oracle)
                    .await?;
            }
        }
        if let Some(position) = force_closes.first() {
            self.submit_margin_position(position, registry, prices, &graph, pull_oracle)
                .await?;
        }

        // Claimed proceeds accumulate as supplied balances; sweep them out.
        if let Some(own) = self
            .accounts
            .margin_account(&self.config.network.account_id)
            .await?
        {
            let supplied: Vec<crate::account::RawPosition> = own
                .supplied
                .iter()
                .filter_map(|s| {
                    Some(crate::account::RawPosition {
                        token_id: s.token_id.clone(),
                        balance: crate::math::parse_amount(&s.balance)?,
                    })
                })
                .collect();
            let sweeps = withdraw_sweep(&supplied, registry, prices, &self.config.margin);
            if !sweeps.is_empty() {
                info!(count = sweeps.len(), "sweeping supplied balances");
                self.submitter
                    .submit(
                        &self.config.network.burrow_contract_id,
                        "margin_execute",
                        serde_json::json!({ "actions": sweeps }),
                        LIQUIDATION_GAS,
                        ONE_YOCTO,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn submit_margin_position(
        &self,
        position: &crate::margin::EvaluatedMarginPosition,
        registry: &AssetRegistry,
        prices: &Prices,
        graph: &PoolGraph,
        pull_oracle: bool,
    ) -> Result<()> {
        match position.build_action(
            registry,
            prices,
            graph,
            &self.config.network.ref_exchange_contract_id,
            &self.config.margin,
        ) {
            Ok(Some(action)) => {
                info!(
                    account = %position.snapshot.account_id,
                    position = %position.snapshot.pos_id,
                    profit = %position.profit,
                    loss = %position.loss,
                    "executing margin close"
                );
                self.submit(ExecKind::Margin, vec![action], pull_oracle).await
            }
            Ok(None) => Ok(()),
            Err(error) => {
                // A missing route skips the candidate, never the pass.
                warn!(
                    account = %position.snapshot.account_id,
                    %error,
                    "margin close not routable"
                );
                Ok(())
            }
        }
    }

    /// Load the pool snapshot and index it for routing.
    async fn build_pool_graph(&self) -> Result<PoolGraph> {
        let rated_views = self.pools.rated_tokens().await?;
        let mut rated: HashMap<String, U256> = rated_views
            .into_iter()
            .filter_map(|(token_id, view)| {
                Some((token_id, U256::from_str_radix(&view.rate_price, 10).ok()?))
            })
            .collect();
        // The wrap token is the implicit 1:1 leg of every rated pool.
        rated.insert(self.config.network.wrap_token_id.clone(), burrow_dex::one_near());

        let total = self
            .pools
            .number_of_pools()
            .await?
            .min(self.config.scheduler.max_pools);
        let page_size = self.config.scheduler.pool_page_size;
        let pages = futures::future::join_all(
            (0..total)
                .step_by(page_size.max(1) as usize)
                .map(|from_index| async move {
                    (from_index, self.pools.pools(from_index, page_size).await)
                }),
        )
        .await;

        let mut pools = Vec::new();
        for (from_index, page) in pages {
            for (offset, view) in page?.iter().enumerate() {
                let index = (from_index + offset as u64) as u32;
                if let Some(pool) = Pool::from_view(
                    index,
                    view,
                    &rated,
                    &self.decimals_cache,
                    self.metadata.as_ref(),
                )
                .await
                {
                    pools.push(pool);
                }
            }
        }
        info!(pools = pools.len(), cached_decimals = self.decimals_cache.len(), "pool graph ready");
        Ok(PoolGraph::new(pools))
    }

    /// The liquidator's own evaluated account (regular position).
    async fn own_account(
        &self,
        registry: &AssetRegistry,
        prices: &Prices,
    ) -> Result<Option<EvaluatedAccount>> {
        let Some(view) = self.accounts.account(&self.config.network.account_id).await? else {
            return Ok(None);
        };
        let snapshot = AccountSnapshot::from_view(&view)
            .into_iter()
            .find(|s| s.is_regular());
        let Some(snapshot) = snapshot else {
            return Ok(None);
        };
        Ok(Some(evaluate(&snapshot, registry, prices)?))
    }

    /// Submit a batch of actions through the oracle call (pull mode) or the
    /// direct push-oracle entry points.
    async fn submit(&self, kind: ExecKind, actions: Vec<Action>, pull_oracle: bool) -> Result<()> {
        let outcome = if pull_oracle {
            let msg = match kind {
                ExecKind::Regular => OracleCallMsg::Execute { actions },
                ExecKind::Margin => OracleCallMsg::MarginExecute { actions },
            };
            self.submitter
                .submit(
                    &self.config.network.price_oracle_contract_id,
                    "oracle_call",
                    serde_json::json!({
                        "receiver_id": self.config.network.burrow_contract_id,
                        "msg": serde_json::to_string(&msg)?,
                    }),
                    LIQUIDATION_GAS,
                    ONE_YOCTO,
                )
                .await?
        } else {
            let method = match kind {
                ExecKind::Regular => "execute_with_pyth",
                ExecKind::Margin => "margin_execute_with_pyth",
            };
            self.submitter
                .submit(
                    &self.config.network.burrow_contract_id,
                    method,
                    serde_json::json!({ "actions": actions }),
                    LIQUIDATION_GAS,
                    ONE_YOCTO,
                )
                .await?
        };

        if outcome.success {
            info!(
                hash = outcome.transaction_hash.as_deref().unwrap_or("unknown"),
                "transaction succeeded"
            );
            Ok(())
        } else {
            Err(LiquidationError::Submission(outcome.failure_messages.join("; ")).into())
        }
    }
}

/// Log the riskiest accounts, mirroring what an operator wants to see at a
/// glance on every pass.
fn log_riskiest(accounts: &[EvaluatedAccount]) {
    let two = BigDecimal::from(2u32);
    for account in accounts
        .iter()
        .filter(|a| a.health_factor.as_ref().is_some_and(|hf| *hf < two))
        .take(20)
    {
        info!(
            account = %account.account_id,
            position = %account.position,
            health = %account.health_factor.as_ref().map(ToString::to_string).unwrap_or_default(),
            discount = %account.discount,
            borrowed = %account.borrowed_sum,
            "at-risk account"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::REGULAR_POSITION;
    use async_trait::async_trait;
    use burrow_chain::views::*;
    use burrow_chain::TxOutcome;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Fixture {
        accounts: Vec<AccountView>,
        assets: Vec<(String, AssetView)>,
        price_data: Option<PriceDataView>,
    }

    struct FixtureSource(Fixture);

    #[async_trait]
    impl AccountSource for FixtureSource {
        async fn num_accounts(&self) -> Result<u64> {
            Ok(self.0.accounts.len() as u64)
        }
        async fn accounts_paged(&self, from_index: u64, limit: u64) -> Result<Vec<AccountView>> {
            Ok(self
                .0
                .accounts
                .iter()
                .skip(from_index as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }
        async fn account(&self, account_id: &str) -> Result<Option<AccountView>> {
            Ok(self
                .0
                .accounts
                .iter()
                .find(|a| a.account_id == account_id)
                .cloned())
        }
        async fn num_margin_accounts(&self) -> Result<u64> {
            Ok(0)
        }
        async fn margin_accounts_paged(&self, _: u64, _: u64) -> Result<Vec<MarginAccountView>> {
            Ok(Vec::new())
        }
        async fn margin_account(&self, _: &str) -> Result<Option<MarginAccountView>> {
            Ok(None)
        }
    }

    #[async_trait]
    impl AssetSource for FixtureSource {
        async fn assets(&self) -> Result<Vec<(String, AssetView)>> {
            Ok(self.0.assets.clone())
        }
        async fn protocol_config(&self) -> Result<ProtocolConfigView> {
            Ok(ProtocolConfigView {
                enable_price_oracle: true,
                oracle_account_id: None,
                pyth_oracle_account_id: None,
            })
        }
        async fn margin_config(&self) -> Result<MarginConfigView> {
            Ok(MarginConfigView { min_safty_buffer: 1000, max_leverage_rate: None })
        }
        async fn lp_token_infos(&self) -> Result<HashMap<String, LpTokenInfoView>> {
            Ok(HashMap::new())
        }
    }

    #[async_trait]
    impl PriceSource for FixtureSource {
        async fn price_data(&self, _asset_ids: &[String]) -> Result<PriceDataView> {
            Ok(self.0.price_data.clone().expect("fixture price data"))
        }
        async fn token_pyth_infos(&self) -> Result<HashMap<String, TokenPythInfoView>> {
            Ok(HashMap::new())
        }
        async fn pyth_price(&self, _: &str, _: u64) -> Result<Option<PythQuoteView>> {
            Ok(None)
        }
        async fn derived_rate(&self, _: &str, _: &str) -> Result<String> {
            Ok("0".to_string())
        }
    }

    #[async_trait]
    impl PoolSource for FixtureSource {
        async fn number_of_pools(&self) -> Result<u64> {
            Ok(0)
        }
        async fn pools(&self, _: u64, _: u64) -> Result<Vec<burrow_dex::PoolView>> {
            Ok(Vec::new())
        }
        async fn rated_tokens(&self) -> Result<HashMap<String, RatedTokenView>> {
            Ok(HashMap::new())
        }
        async fn unit_share_token_amounts(&self, _: u64) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl TokenMetadataSource for FixtureSource {
        async fn fetch_decimals(&self, _: &str) -> Result<u8> {
            Ok(18)
        }
    }

    #[derive(Default)]
    struct RecordingSubmitter {
        calls: Mutex<Vec<(String, String, serde_json::Value)>>,
    }

    #[async_trait]
    impl TxSubmitter for RecordingSubmitter {
        async fn submit(
            &self,
            receiver_id: &str,
            method: &str,
            args: serde_json::Value,
            _gas: u64,
            _deposit: u128,
        ) -> Result<TxOutcome> {
            self.calls.lock().unwrap().push((
                receiver_id.to_string(),
                method.to_string(),
                args,
            ));
            Ok(TxOutcome::success("fixture-hash"))
        }
    }

    fn account_view(
        account_id: &str,
        collateral: &[(&str, &str)],
        borrowed: &[(&str, &str)],
    ) -> AccountView {
        let leg = |(token_id, balance): &(&str, &str)| AssetAmountView {
            token_id: token_id.to_string(),
            shares: None,
            balance: balance.to_string(),
        };
        AccountView {
            account_id: account_id.to_string(),
            positions: HashMap::from([(
                REGULAR_POSITION.to_string(),
                PositionView {
                    collateral: collateral.iter().map(leg).collect(),
                    borrowed: borrowed.iter().map(leg).collect(),
                },
            )]),
            supplied: Vec::new(),
        }
    }

    fn asset_entry(token_id: &str, vol_bps: u32, extra: u8) -> (String, AssetView) {
        (
            token_id.to_string(),
            AssetView {
                config: AssetConfigView {
                    volatility_ratio: vol_bps,
                    extra_decimals: extra,
                    can_borrow: true,
                    can_use_as_collateral: true,
                    can_deposit: true,
                    can_withdraw: true,
                },
                unit_acc_hp_interest: None,
            },
        )
    }

    fn fresh_price_data() -> PriceDataView {
        PriceDataView {
            timestamp: (chrono::Utc::now().timestamp() as i128 * 1_000_000_000).to_string(),
            recency_duration_sec: "90".to_string(),
            prices: vec![
                AssetPriceView {
                    asset_id: "usdc.near".to_string(),
                    price: Some(PriceView { multiplier: "10000".to_string(), decimals: 10 }),
                },
                AssetPriceView {
                    asset_id: "dai.near".to_string(),
                    price: Some(PriceView { multiplier: "10000".to_string(), decimals: 22 }),
                },
            ],
        }
    }

    fn engine_with(fixture: Fixture, submitter: Arc<RecordingSubmitter>) -> Engine {
        let source = Arc::new(FixtureSource(fixture));
        let mut config = BotConfig::default();
        config.network.account_id = "liquidator.near".to_string();
        Engine::new(
            source.clone(),
            source.clone(),
            source.clone(),
            source.clone(),
            submitter,
            source,
            Arc::new(TokenDecimalsCache::new()),
            config,
        )
    }

    #[tokio::test]
    async fn pass_liquidates_the_underwater_account() {
        let fixture = Fixture {
            accounts: vec![
                account_view(
                    "alice.near",
                    &[("usdc.near", "10000000000000000000000")],
                    &[("dai.near", "8500000000000000000000")],
                ),
                account_view(
                    "liquidator.near",
                    &[("usdc.near", "50000000000000000000000")],
                    &[],
                ),
            ],
            assets: vec![
                asset_entry("usdc.near", 8000, 12),
                asset_entry("dai.near", 9500, 0),
            ],
            price_data: Some(fresh_price_data()),
        };
        let submitter = Arc::new(RecordingSubmitter::default());
        let engine = engine_with(fixture, submitter.clone());

        engine.run_pass().await.unwrap();

        let calls = submitter.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (receiver, method, args) = &calls[0];
        assert_eq!(receiver, "priceoracle.near");
        assert_eq!(method, "oracle_call");
        assert_eq!(args["receiver_id"], "contract.main.burrow.near");
        let msg: serde_json::Value =
            serde_json::from_str(args["msg"].as_str().unwrap()).unwrap();
        let actions = msg["Execute"]["actions"].as_array().unwrap();
        assert_eq!(
            actions[0]["Liquidate"]["account_id"].as_str().unwrap(),
            "alice.near"
        );
        // Withdraw follow-up for the claimed collateral.
        assert!(actions[1]["Withdraw"].is_object());
    }

    #[tokio::test]
    async fn stale_prices_abort_the_pass_before_sizing() {
        let fixture = Fixture {
            accounts: vec![account_view(
                "alice.near",
                &[("usdc.near", "10000000000000000000000")],
                &[("dai.near", "8500000000000000000000")],
            )],
            assets: vec![
                asset_entry("usdc.near", 8000, 12),
                asset_entry("dai.near", 9500, 0),
            ],
            price_data: Some(PriceDataView {
                timestamp: "1000000000000000000".to_string(), // ancient
                recency_duration_sec: "90".to_string(),
                prices: Vec::new(),
            }),
        };
        let submitter = Arc::new(RecordingSubmitter::default());
        let engine = engine_with(fixture, submitter.clone());

        let result = engine.run_pass().await;
        assert!(result.is_err());
        assert!(submitter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn healthy_book_submits_nothing() {
        let fixture = Fixture {
            accounts: vec![
                account_view(
                    "bob.near",
                    &[("usdc.near", "10000000000000000000000")],
                    &[("dai.near", "1000000000000000000000")],
                ),
                account_view(
                    "liquidator.near",
                    &[("usdc.near", "50000000000000000000000")],
                    &[],
                ),
            ],
            assets: vec![
                asset_entry("usdc.near", 8000, 12),
                asset_entry("dai.near", 9500, 0),
            ],
            price_data: Some(fresh_price_data()),
        };
        let submitter = Arc::new(RecordingSubmitter::default());
        let engine = engine_with(fixture, submitter.clone());

        engine.run_pass().await.unwrap();
        assert!(submitter.calls.lock().unwrap().is_empty());
    }
}
