//! Margin-position liquidation.
//!
//! A margin position carries three token legs: collateral (C), debt (D),
//! and the traded principal (P). The position is liquidatable when its
//! combined C+P value still covers the debt but has eaten into the safety
//! buffer, and force-closable once the debt exceeds the combined value.
//! Either way the close is settled by swapping the principal (plus the
//! collateral when it is the same token) into the debt token, so sizing
//! here is a single route query instead of the multi-step matching the
//! regular sizer does.

use bigdecimal::BigDecimal;
use num_traits::Zero;
use tracing::debug;

use crate::account::priced_balance;
use crate::actions::{Action, MarginAction, SwapAction, SwapIndication, SwapMessage};
use crate::asset::{AssetRegistry, TokenId};
use crate::config::MarginConfig;
use crate::error::LiquidationError;
use crate::math;
use crate::price::Prices;
use alloy_primitives::U256;
use burrow_chain::views::MarginAccountView;
use burrow_dex::PoolGraph;

/// Interest indices are fixed-point over 10^18.
fn interest_denominator() -> BigDecimal {
    math::pow10(18)
}

/// One margin position, flattened out of its account view.
#[derive(Debug, Clone)]
pub struct MarginPositionSnapshot {
    pub account_id: String,
    pub pos_id: String,
    pub uahpi_at_open: BigDecimal,
    pub debt_cap: BigDecimal,
    pub token_c_id: TokenId,
    pub token_c_balance: u128,
    pub token_d_id: TokenId,
    pub token_d_balance: u128,
    pub token_p_id: TokenId,
    pub token_p_amount: u128,
    pub is_locking: bool,
}

impl MarginPositionSnapshot {
    /// Flatten an account view into one snapshot per open position.
    pub fn from_view(view: &MarginAccountView) -> Vec<Self> {
        view.margin_positions
            .iter()
            .filter_map(|(pos_id, p)| {
                Some(Self {
                    account_id: view.account_id.clone(),
                    pos_id: pos_id.clone(),
                    uahpi_at_open: math::parse_decimal(&p.uahpi_at_open)?,
                    debt_cap: math::parse_decimal(&p.debt_cap)?,
                    token_c_id: p.token_c_info.token_id.clone(),
                    token_c_balance: math::parse_amount(&p.token_c_info.balance)?,
                    token_d_id: p.token_d_info.token_id.clone(),
                    token_d_balance: math::parse_amount(&p.token_d_info.balance)?,
                    token_p_id: p.token_p_id.clone(),
                    token_p_amount: math::parse_amount(&p.token_p_amount)?,
                    is_locking: p.is_locking,
                })
            })
            .collect()
    }
}

/// A margin position with priced legs and derived flags.
#[derive(Debug, Clone)]
pub struct EvaluatedMarginPosition {
    pub snapshot: MarginPositionSnapshot,
    pub token_c_priced: BigDecimal,
    pub token_d_priced: BigDecimal,
    pub token_p_priced: BigDecimal,
    /// Accrued holding fee, in standardized debt-token units
    pub hp_fee: BigDecimal,
    pub hp_fee_priced: BigDecimal,
    pub total_cap: BigDecimal,
    pub total_debt: BigDecimal,
    pub is_liquidation: bool,
    pub is_forceclose: bool,
    /// cap − debt when liquidatable
    pub profit: BigDecimal,
    /// debt − cap when force-closable
    pub loss: BigDecimal,
}

/// Price a margin position and derive its liquidation/force-close flags.
pub fn evaluate_margin(
    snapshot: MarginPositionSnapshot,
    assets: &AssetRegistry,
    prices: &Prices,
    min_safety_buffer_bps: u32,
) -> Result<EvaluatedMarginPosition, LiquidationError> {
    let c_asset = assets.get(&snapshot.token_c_id)?;
    let d_asset = assets.get(&snapshot.token_d_id)?;
    let p_asset = assets.get(&snapshot.token_p_id)?;
    let c_price = prices.get(&snapshot.token_c_id)?;
    let d_price = prices.get(&snapshot.token_d_id)?;
    let p_price = prices.get(&snapshot.token_p_id)?;

    let token_c_priced =
        priced_balance(snapshot.token_c_balance, c_price, c_asset.extra_decimals);
    let token_d_priced =
        priced_balance(snapshot.token_d_balance, d_price, d_asset.extra_decimals);
    let token_p_priced =
        priced_balance(snapshot.token_p_amount, p_price, p_asset.extra_decimals);

    // Holding fee accrued since open, in standardized debt units.
    let accrued = &d_asset.unit_acc_hp_interest - &snapshot.uahpi_at_open;
    let hp_fee = math::div(&(&snapshot.debt_cap * accrued), &interest_denominator());
    let hp_fee_priced = if hp_fee > BigDecimal::zero() {
        let numerator = &hp_fee * BigDecimal::from(d_price.multiplier);
        math::div(
            &numerator,
            &math::pow10(d_price.decimals as u32 + d_asset.extra_decimals as u32),
        )
    } else {
        BigDecimal::zero()
    };

    let total_cap = &token_c_priced + &token_p_priced;
    let total_debt = &token_d_priced + &hp_fee_priced;
    let buffer = math::ratio_from_bps(min_safety_buffer_bps);

    let is_liquidation =
        total_cap >= total_debt && &total_cap - &total_cap * &buffer < total_debt;
    let is_forceclose = total_cap < total_debt;

    let profit = if is_liquidation {
        &total_cap - &total_debt
    } else {
        BigDecimal::zero()
    };
    let loss = if is_forceclose {
        &total_debt - &total_cap
    } else {
        BigDecimal::zero()
    };

    Ok(EvaluatedMarginPosition {
        snapshot,
        token_c_priced,
        token_d_priced,
        token_p_priced,
        hp_fee,
        hp_fee_priced,
        total_cap,
        total_debt,
        is_liquidation,
        is_forceclose,
        profit,
        loss,
    })
}

impl EvaluatedMarginPosition {
    /// Build the margin liquidate / force-close action, routing the
    /// principal-to-debt settlement swap through the pool graph.
    ///
    /// Returns `Ok(None)` when the position turns out not to be actionable
    /// after sizing (liquidation proceeds would not even cover the debt).
    pub fn build_action(
        &self,
        assets: &AssetRegistry,
        prices: &Prices,
        graph: &PoolGraph,
        dex_id: &str,
        config: &MarginConfig,
    ) -> Result<Option<Action>, LiquidationError> {
        if !self.is_liquidation && !self.is_forceclose {
            return Ok(None);
        }
        let snapshot = &self.snapshot;
        let d_asset = assets.get(&snapshot.token_d_id)?;
        let p_asset = assets.get(&snapshot.token_p_id)?;
        let d_price = prices.get(&snapshot.token_d_id)?;

        let same_collateral = snapshot.token_c_id == snapshot.token_d_id;
        // When the collateral is a different token than the debt it rides
        // along with the principal through the settlement swap.
        let token_p_amount = if same_collateral {
            BigDecimal::from(snapshot.token_p_amount)
        } else {
            BigDecimal::from(snapshot.token_p_amount) + BigDecimal::from(snapshot.token_c_balance)
        };
        let swapped_priced = if same_collateral {
            self.token_p_priced.clone()
        } else {
            &self.token_p_priced + &self.token_c_priced
        };

        // Minimum debt proceeds, floored by the configured ratio.
        let d_scale = math::pow10(d_price.decimals as u32 + d_asset.extra_decimals as u32);
        let min_token_d_amount = (&swapped_priced * &d_scale * config.min_amount_ratio_dec()
            / BigDecimal::from(d_price.multiplier))
        .with_scale_round(0, bigdecimal::RoundingMode::Floor);

        if self.is_liquidation {
            let debt_with_fee = BigDecimal::from(snapshot.token_d_balance) + &self.hp_fee;
            if min_token_d_amount <= debt_with_fee {
                debug!(
                    account = %snapshot.account_id,
                    position = %snapshot.pos_id,
                    "liquidation proceeds would not cover debt, skipping"
                );
                return Ok(None);
            }
        }

        // Standardized units down to raw token units for the swap itself.
        let amount_in_raw = math::floor_to_u128(&math::div(
            &token_p_amount,
            &math::pow10(p_asset.extra_decimals as u32),
        ));
        let min_amount_out_raw = math::floor_to_u128(&math::div(
            &min_token_d_amount,
            &math::pow10(d_asset.extra_decimals as u32),
        ));

        let route = graph.best_return(
            &snapshot.token_p_id,
            U256::from(amount_in_raw),
            &snapshot.token_d_id,
        );
        if !route.is_viable() {
            return Err(LiquidationError::InsufficientLiquidity {
                token_in: snapshot.token_p_id.clone(),
                token_out: snapshot.token_d_id.clone(),
                amount: amount_in_raw.to_string(),
            });
        }

        let hops = route.pool_ids.len();
        let swap_message = SwapMessage {
            actions: route
                .pool_ids
                .iter()
                .enumerate()
                .map(|(i, pool_id)| SwapAction {
                    pool_id: *pool_id,
                    token_in: route.path[i].clone(),
                    amount_in: (i == 0).then(|| amount_in_raw.to_string()),
                    token_out: route.path[i + 1].clone(),
                    min_amount_out: if i + 1 == hops {
                        min_amount_out_raw.to_string()
                    } else {
                        "0".to_string()
                    },
                })
                .collect(),
        };
        let swap_action_text = serde_json::to_string(&swap_message)
            .map_err(|e| LiquidationError::MalformedView(e.to_string()))?;

        let args = MarginAction {
            pos_owner_id: snapshot.account_id.clone(),
            pos_id: snapshot.pos_id.clone(),
            token_p_amount: math::floor_to_u128(&token_p_amount).to_string(),
            min_token_d_amount: math::floor_to_u128(&min_token_d_amount).to_string(),
            swap_indication: SwapIndication {
                dex_id: dex_id.to_string(),
                swap_action_text,
            },
        };

        Ok(Some(if self.is_liquidation {
            Action::LiquidateMTPosition(args)
        } else {
            Action::ForceCloseMTPosition(args)
        }))
    }
}

/// Withdraw actions for the liquidator's supplied balances worth more than
/// the configured floor (sweeps claimed proceeds back out).
pub fn withdraw_sweep(
    supplied: &[crate::account::RawPosition],
    assets: &AssetRegistry,
    prices: &Prices,
    config: &MarginConfig,
) -> Vec<Action> {
    let mut actions = Vec::new();
    for leg in supplied {
        let (Ok(asset), Ok(price)) = (assets.get(&leg.token_id), prices.get(&leg.token_id))
        else {
            continue;
        };
        let priced = priced_balance(leg.balance, price, asset.extra_decimals);
        if priced > config.min_swap_amount_dec() {
            actions.push(Action::Withdraw(crate::actions::WithdrawAction {
                token_id: leg.token_id.clone(),
                max_amount: None,
            }));
        }
    }
    actions
}
