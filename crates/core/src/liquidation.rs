//! Liquidation sizing.
//!
//! Computes the largest profitable, health-improving liquidation for an
//! underwater account: repay debt legs, claim discounted collateral legs,
//! stop once the account's health is restored or the configured budget is
//! spent. High-volatility-ratio legs are consumed first on both sides,
//! which preserves the most adjusted-sum headroom for the remaining steps.
//!
//! The emitted amounts are shaved by a small configured margin to absorb
//! price drift between sizing and execution, and the plan is re-priced from
//! the literal emitted amounts before it is accepted: rounding must never
//! manufacture paper profit.

use bigdecimal::BigDecimal;
use num_traits::{One, Zero};
use tracing::{debug, warn};

use crate::account::{priced_balance, EvaluatedAccount};
use crate::actions::{Action, AssetAmount, LiquidateAction, WithdrawAction};
use crate::asset::{AssetRegistry, LpTokenInfos, TokenId};
use crate::config::LiquidationConfig;
use crate::error::LiquidationError;
use crate::math;
use crate::price::Prices;

/// Floor ratio applied to LP constituent minimums, in basis points.
const LP_MIN_AMOUNT_BPS: u32 = 500;

/// A sized, guarded liquidation ready for submission.
#[derive(Debug, Clone)]
pub struct LiquidationPlan {
    pub account_id: String,
    pub position: String,
    /// The liquidate action followed by withdraw actions
    pub actions: Vec<Action>,
    pub total_priced_amount: BigDecimal,
    pub total_priced_profit: BigDecimal,
    /// Profit recomputed from the literal emitted amounts
    pub real_priced_profit: BigDecimal,
    pub orig_health: BigDecimal,
    pub orig_discount: BigDecimal,
    pub new_health: BigDecimal,
}

/// Liquidation sizer for one evaluation pass.
pub struct Sizer<'a> {
    pub assets: &'a AssetRegistry,
    pub prices: &'a Prices,
    pub lp_token_infos: &'a LpTokenInfos,
    pub config: &'a LiquidationConfig,
}

impl Sizer<'_> {
    /// Size a liquidation of `target` funded by `liquidator`.
    ///
    /// Returns `None` when no plan passes the guards; the reason is logged
    /// at debug level so a noisy pass stays readable.
    pub fn size(
        &self,
        target: &EvaluatedAccount,
        liquidator: &EvaluatedAccount,
    ) -> Option<LiquidationPlan> {
        // The liquidator's own account must stay healthy through the repay;
        // checked up front, before any sizing work.
        if liquidator
            .health_factor
            .as_ref()
            .is_some_and(|hf| *hf < BigDecimal::one())
        {
            warn!(
                liquidator = %liquidator.account_id,
                "liquidator account below full health, skipping sizing"
            );
            return None;
        }

        let orig_health = target.health_factor.clone()?;
        let orig_discount = target.discount.clone();

        let mut account = target.clone();
        // Consume high-ratio legs first on both sides.
        account
            .collateral
            .sort_by(|a, b| b.volatility_ratio.cmp(&a.volatility_ratio));
        account
            .borrowed
            .sort_by(|a, b| b.volatility_ratio.cmp(&a.volatility_ratio));

        let discount_mul = BigDecimal::one() - &orig_discount;
        let max_health = self.config.max_health_factor_dec();
        let min_priced = self.config.min_priced_balance_dec();
        let max_liquidation_amount = self.config.max_liquidation_amount_dec();

        let mut collateral_out: Vec<(TokenId, BigDecimal)> = Vec::new();
        let mut borrowed_in: Vec<(TokenId, BigDecimal)> = Vec::new();
        let mut total_priced_profit = BigDecimal::zero();
        let mut total_priced_amount = BigDecimal::zero();

        let mut collateral_index = 0;
        let mut borrowed_index = 0;
        while collateral_index < account.collateral.len()
            && borrowed_index < account.borrowed.len()
            && account
                .health_factor
                .as_ref()
                .is_some_and(|hf| *hf < max_health)
            && total_priced_amount < max_liquidation_amount
        {
            if account.collateral[collateral_index].priced_balance < min_priced {
                collateral_index += 1;
                continue;
            }
            let borrowed = &account.borrowed[borrowed_index];
            if borrowed.priced_balance < min_priced || !borrowed.can_borrow {
                borrowed_index += 1;
                continue;
            }
            let collateral = &account.collateral[collateral_index];

            let discounted_priced_balance = &collateral.priced_balance * &discount_mul;
            let max_priced_amount = math::min(
                math::min(discounted_priced_balance, borrowed.priced_balance.clone()),
                &max_liquidation_amount - &total_priced_amount,
            );

            // The amount x that brings health exactly back to 1:
            //   adjBorSum - adjColSum = x * (1/borVol - colVol/discountMul)
            let denom = math::div(&BigDecimal::one(), &borrowed.volatility_ratio)
                - math::div(&collateral.volatility_ratio, &discount_mul);
            let max_health_amount = if denom > BigDecimal::zero() {
                math::div(
                    &(&account.adjusted_borrowed_sum - &account.adjusted_collateral_sum),
                    &denom,
                )
            } else {
                // Non-binding: this pairing improves health indefinitely.
                &max_priced_amount * BigDecimal::from(2u32)
            };

            let priced_amount = math::min(max_health_amount, max_priced_amount);
            total_priced_amount += &priced_amount;

            let collateral_priced_amount = math::div(&priced_amount, &discount_mul);
            total_priced_profit += &collateral_priced_amount - &priced_amount;

            // Dollar legs back to raw token units, rounded down.
            let collateral_amount = to_token_amount(
                &collateral_priced_amount,
                collateral.price.multiplier,
                collateral.price.decimals,
                collateral.extra_decimals,
            );
            let borrowed_amount = to_token_amount(
                &priced_amount,
                borrowed.price.multiplier,
                borrowed.price.decimals,
                borrowed.extra_decimals,
            );
            merge_amount(&mut collateral_out, &collateral.token_id, collateral_amount);
            merge_amount(&mut borrowed_in, &borrowed.token_id, borrowed_amount);

            let adjusted_collateral_amount =
                &collateral_priced_amount * &collateral.volatility_ratio;
            let adjusted_borrowed_amount =
                math::div(&priced_amount, &borrowed.volatility_ratio);

            // Both legs and their adjusted mirrors move together.
            {
                let collateral = &mut account.collateral[collateral_index];
                collateral.priced_balance -= &collateral_priced_amount;
                collateral.adjusted_priced_balance -= &adjusted_collateral_amount;
            }
            account.adjusted_collateral_sum -= &adjusted_collateral_amount;
            {
                let borrowed = &mut account.borrowed[borrowed_index];
                borrowed.priced_balance -= &priced_amount;
                borrowed.adjusted_priced_balance -= &adjusted_borrowed_amount;
            }
            account.adjusted_borrowed_sum -= &adjusted_borrowed_amount;

            account.recompute_risk();
        }

        let new_health = account
            .health_factor
            .clone()
            .unwrap_or_else(|| BigDecimal::from(1_000_000_000u64));

        // Shave claimed collateral a touch harder than repaid debt so price
        // drift between sizing and execution lands on our side.
        for (_, amount) in &mut collateral_out {
            *amount = math::shave_bps(amount, self.config.collateral_shave_bps);
        }
        for (_, amount) in &mut borrowed_in {
            *amount = math::shave_bps(amount, self.config.debt_shave_bps);
        }

        if total_priced_profit <= self.config.min_profit_dec() {
            debug!(
                account = %target.account_id,
                profit = %total_priced_profit,
                "sized profit below minimum"
            );
            return None;
        }
        if orig_discount <= self.config.min_discount_dec() {
            debug!(account = %target.account_id, discount = %orig_discount, "discount below minimum");
            return None;
        }
        if orig_health >= new_health {
            debug!(account = %target.account_id, "plan does not improve health");
            return None;
        }

        let mut liquidate = LiquidateAction {
            account_id: target.account_id.clone(),
            in_assets: borrowed_in
                .iter()
                .map(|(token_id, amount)| {
                    AssetAmount::new(token_id.clone(), math::floor_to_u128(amount))
                })
                .collect(),
            out_assets: collateral_out
                .iter()
                .map(|(token_id, amount)| {
                    AssetAmount::new(token_id.clone(), math::floor_to_u128(amount))
                })
                .collect(),
            position: Some(target.position.clone()),
            min_token_amounts: None,
        };

        // Final guard: re-price the literal emitted amounts. Intermediate
        // running sums can drift from the integers actually sent.
        let real_priced_profit = match self.real_priced_profit(&mut liquidate, &target.position) {
            Ok(profit) => profit,
            Err(error) => {
                warn!(account = %target.account_id, %error, "profit recomputation failed");
                return None;
            }
        };
        if real_priced_profit <= self.config.min_profit_dec() {
            debug!(
                account = %target.account_id,
                real_profit = %real_priced_profit,
                "recomputed profit below minimum"
            );
            return None;
        }

        let withdraws: Vec<Action> = liquidate
            .out_assets
            .iter()
            .take(self.config.max_withdraw_count)
            .map(|asset| {
                Action::Withdraw(WithdrawAction {
                    token_id: asset.token_id.clone(),
                    max_amount: Some(asset.amount.clone()),
                })
            })
            .collect();

        let mut actions = vec![Action::Liquidate(liquidate)];
        actions.extend(withdraws);

        Some(LiquidationPlan {
            account_id: target.account_id.clone(),
            position: target.position.clone(),
            actions,
            total_priced_amount,
            total_priced_profit,
            real_priced_profit,
            orig_health,
            orig_discount,
            new_health,
        })
    }

    /// Value the action's literal in/out amounts at current prices.
    ///
    /// For LP-token positions the single out-asset is valued through its
    /// constituent tokens, and the action's `min_token_amounts` floors are
    /// filled from the decomposition.
    fn real_priced_profit(
        &self,
        action: &mut LiquidateAction,
        position: &str,
    ) -> Result<BigDecimal, LiquidationError> {
        let in_price = self.value_amounts(&action.in_assets)?;
        if position == crate::asset::REGULAR_POSITION {
            let out_price = self.value_amounts(&action.out_assets)?;
            return Ok(out_price - in_price);
        }

        let lp_leg = action.out_assets.first().ok_or_else(|| {
            LiquidationError::MalformedView("LP liquidation with no out asset".to_string())
        })?;
        let lp_asset = self.assets.get(&lp_leg.token_id)?;
        let lp_info = self.lp_token_infos.get(&lp_leg.token_id).ok_or_else(|| {
            LiquidationError::MalformedView(format!("no LP info for {}", lp_leg.token_id))
        })?;
        let lp_amount = math::parse_decimal(&lp_leg.amount).ok_or_else(|| {
            LiquidationError::MalformedView(format!("bad amount for {}", lp_leg.token_id))
        })?;

        let unit_share = math::pow10(lp_info.decimals as u32);
        let mut min_token_amounts = Vec::with_capacity(lp_info.tokens.len());
        let mut out_price = BigDecimal::zero();
        for unit_token in &lp_info.tokens {
            let token_asset = self.assets.get(&unit_token.token_id)?;
            let price = self.prices.get(&unit_token.token_id)?;
            let token_stdd_amount = BigDecimal::from(unit_token.real_amount)
                * math::pow10(token_asset.extra_decimals as u32);
            let token_balance = math::div(
                &(&token_stdd_amount * &lp_amount),
                &(math::pow10(lp_asset.extra_decimals as u32) * &unit_share),
            );
            let min_amount = math::shave_bps(
                &math::div(
                    &token_balance,
                    &math::pow10(token_asset.extra_decimals as u32),
                ),
                LP_MIN_AMOUNT_BPS,
            );
            min_token_amounts.push(math::floor_to_u128(&min_amount).to_string());
            out_price += priced_balance(
                math::floor_to_u128(&token_balance),
                price,
                token_asset.extra_decimals,
            );
        }
        action.min_token_amounts = Some(min_token_amounts);
        Ok(out_price - in_price)
    }

    fn value_amounts(&self, amounts: &[AssetAmount]) -> Result<BigDecimal, LiquidationError> {
        let mut sum = BigDecimal::zero();
        for asset_amount in amounts {
            let asset = self.assets.get(&asset_amount.token_id)?;
            let price = self.prices.get(&asset_amount.token_id)?;
            let amount = math::parse_amount(&asset_amount.amount).ok_or_else(|| {
                LiquidationError::MalformedView(format!(
                    "bad amount for {}",
                    asset_amount.token_id
                ))
            })?;
            sum += priced_balance(amount, price, asset.extra_decimals);
        }
        Ok(sum)
    }
}

/// Build the force-close action for an account whose collateral no longer
/// covers its debt.
pub fn force_close_action(account: &EvaluatedAccount, lp_token_infos: &LpTokenInfos) -> Action {
    let min_token_amounts = if account.position == crate::asset::REGULAR_POSITION {
        None
    } else {
        // Zero floors: force-close recovers whatever the pool returns.
        let count = lp_token_infos
            .get(&account.position)
            .map(|info| info.tokens.len())
            .unwrap_or(2);
        Some(vec!["0".to_string(); count])
    };
    Action::ForceClose(crate::actions::ForceCloseAction {
        account_id: account.account_id.clone(),
        position: Some(account.position.clone()),
        min_token_amounts,
    })
}

/// Dollar amount to raw token units: `amount / multiplier * 10^(decimals +
/// extra_decimals)`, floored.
fn to_token_amount(
    priced_amount: &BigDecimal,
    multiplier: u128,
    decimals: u8,
    extra_decimals: u8,
) -> BigDecimal {
    let scaled =
        priced_amount * math::pow10(decimals as u32 + extra_decimals as u32);
    math::div(&scaled, &BigDecimal::from(multiplier))
        .with_scale_round(0, bigdecimal::RoundingMode::Floor)
}

fn merge_amount(aggregates: &mut Vec<(TokenId, BigDecimal)>, token_id: &str, amount: BigDecimal) {
    match aggregates.last_mut() {
        Some((last_token, last_amount)) if last_token == token_id => {
            *last_amount += amount;
        }
        _ => aggregates.push((token_id.to_string(), amount)),
    }
}
