//! Account risk evaluation.
//!
//! Raw account views are flattened to one snapshot per lending position
//! (the default position or an LP-token position), then priced: every leg
//! gets a dollar value and a volatility-adjusted value, and the account
//! gets a health factor and a liquidation discount derived from the
//! adjusted sums.
//!
//! Accounts with no debt have no health factor; callers must filter them
//! out before any liquidation candidacy check.

use bigdecimal::BigDecimal;
use num_traits::Zero;
use smallvec::SmallVec;

use crate::asset::{AssetRegistry, TokenId, REGULAR_POSITION};
use crate::error::LiquidationError;
use crate::math;
use crate::price::{Price, Prices};
use burrow_chain::views::{AccountView, AssetAmountView};

/// One leg of an account position before pricing.
#[derive(Debug, Clone)]
pub struct RawPosition {
    pub token_id: TokenId,
    /// Standardized units (metadata decimals + extra decimals)
    pub balance: u128,
}

impl RawPosition {
    fn from_view(view: &AssetAmountView) -> Option<Self> {
        Some(Self {
            token_id: view.token_id.clone(),
            balance: math::parse_amount(&view.balance)?,
        })
    }
}

/// An account flattened to a single lending position.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub account_id: String,
    /// `REGULAR` or the LP-token id backing the position
    pub position: String,
    pub collateral: Vec<RawPosition>,
    pub borrowed: Vec<RawPosition>,
    /// Supplied-but-not-collateral balances (used for the withdraw sweep)
    pub supplied: Vec<RawPosition>,
}

impl AccountSnapshot {
    /// Flatten an account view into one snapshot per position.
    pub fn from_view(view: &AccountView) -> Vec<Self> {
        let supplied: Vec<RawPosition> = view
            .supplied
            .iter()
            .filter_map(RawPosition::from_view)
            .collect();
        view.positions
            .iter()
            .map(|(position, p)| Self {
                account_id: view.account_id.clone(),
                position: position.clone(),
                collateral: p.collateral.iter().filter_map(RawPosition::from_view).collect(),
                borrowed: p.borrowed.iter().filter_map(RawPosition::from_view).collect(),
                supplied: supplied.clone(),
            })
            .collect()
    }

    pub fn is_regular(&self) -> bool {
        self.position == REGULAR_POSITION
    }
}

/// A priced position leg.
#[derive(Debug, Clone)]
pub struct PricedPosition {
    pub token_id: TokenId,
    pub balance: u128,
    pub price: Price,
    pub extra_decimals: u8,
    pub volatility_ratio: BigDecimal,
    pub can_borrow: bool,
    /// Dollar value of the leg
    pub priced_balance: BigDecimal,
    /// Volatility-weighted dollar value
    pub adjusted_priced_balance: BigDecimal,
}

/// Fully evaluated account, ready for candidacy checks and sizing.
#[derive(Debug, Clone)]
pub struct EvaluatedAccount {
    pub account_id: String,
    pub position: String,
    pub collateral: SmallVec<[PricedPosition; 4]>,
    pub borrowed: SmallVec<[PricedPosition; 4]>,
    pub collateral_sum: BigDecimal,
    pub borrowed_sum: BigDecimal,
    pub adjusted_collateral_sum: BigDecimal,
    pub adjusted_borrowed_sum: BigDecimal,
    /// None when the account has no debt
    pub health_factor: Option<BigDecimal>,
    pub discount: BigDecimal,
    pub supplied: Vec<RawPosition>,
}

/// Dollar value of `balance` standardized units at `price`:
/// `balance * multiplier / 10^(price.decimals + extra_decimals)`.
pub fn priced_balance(balance: u128, price: &Price, extra_decimals: u8) -> BigDecimal {
    let numerator = BigDecimal::from(balance) * BigDecimal::from(price.multiplier);
    math::div(
        &numerator,
        &math::pow10(price.decimals as u32 + extra_decimals as u32),
    )
}

/// Price every leg and derive the account's risk figures.
pub fn evaluate(
    snapshot: &AccountSnapshot,
    assets: &AssetRegistry,
    prices: &Prices,
) -> Result<EvaluatedAccount, LiquidationError> {
    let mut account = EvaluatedAccount {
        account_id: snapshot.account_id.clone(),
        position: snapshot.position.clone(),
        collateral: SmallVec::new(),
        borrowed: SmallVec::new(),
        collateral_sum: BigDecimal::zero(),
        borrowed_sum: BigDecimal::zero(),
        adjusted_collateral_sum: BigDecimal::zero(),
        adjusted_borrowed_sum: BigDecimal::zero(),
        health_factor: None,
        discount: BigDecimal::zero(),
        supplied: snapshot.supplied.clone(),
    };

    for leg in &snapshot.collateral {
        let priced = price_leg(leg, assets, prices, Side::Collateral)?;
        account.collateral_sum += &priced.priced_balance;
        account.adjusted_collateral_sum += &priced.adjusted_priced_balance;
        account.collateral.push(priced);
    }
    for leg in &snapshot.borrowed {
        let priced = price_leg(leg, assets, prices, Side::Borrowed)?;
        account.borrowed_sum += &priced.priced_balance;
        account.adjusted_borrowed_sum += &priced.adjusted_priced_balance;
        account.borrowed.push(priced);
    }

    account.recompute_risk();
    Ok(account)
}

enum Side {
    Collateral,
    Borrowed,
}

fn price_leg(
    leg: &RawPosition,
    assets: &AssetRegistry,
    prices: &Prices,
    side: Side,
) -> Result<PricedPosition, LiquidationError> {
    let asset = assets.get(&leg.token_id)?;
    let price = prices.get(&leg.token_id)?.clone();
    let priced = priced_balance(leg.balance, &price, asset.extra_decimals);
    // Collateral capacity shrinks with volatility, debt weight grows with it.
    let adjusted = match side {
        Side::Collateral => &priced * &asset.volatility_ratio,
        Side::Borrowed => math::div(&priced, &asset.volatility_ratio),
    };
    Ok(PricedPosition {
        token_id: leg.token_id.clone(),
        balance: leg.balance,
        price,
        extra_decimals: asset.extra_decimals,
        volatility_ratio: asset.volatility_ratio.clone(),
        can_borrow: asset.can_borrow,
        priced_balance: priced,
        adjusted_priced_balance: adjusted,
    })
}

impl EvaluatedAccount {
    /// Re-derive health factor and discount from the current adjusted sums.
    /// Called after every sizing step mutates the sums.
    pub fn recompute_risk(&mut self) {
        if self.adjusted_borrowed_sum > BigDecimal::zero() {
            self.health_factor = Some(math::div(
                &self.adjusted_collateral_sum,
                &self.adjusted_borrowed_sum,
            ));
            let adjusted_debt = &self.adjusted_borrowed_sum - &self.adjusted_collateral_sum;
            self.discount = if adjusted_debt > BigDecimal::zero() {
                math::div(&adjusted_debt, &self.adjusted_borrowed_sum) / BigDecimal::from(2u32)
            } else {
                BigDecimal::zero()
            };
        } else {
            self.health_factor = None;
            self.discount = BigDecimal::zero();
        }
    }

    /// Liquidatable accounts have debt and a health factor below one.
    pub fn is_underwater(&self) -> bool {
        self.health_factor
            .as_ref()
            .is_some_and(|hf| *hf < BigDecimal::from(1u32))
    }

    /// Force-close eligibility: collateral no longer covers debt at full
    /// value, so no profitable liquidation margin remains.
    pub fn is_force_close_eligible(&self) -> bool {
        self.borrowed_sum > BigDecimal::zero() && self.collateral_sum < self.borrowed_sum
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::asset::AssetRegistry;
    use burrow_chain::views::{AssetConfigView, AssetView};

    pub(crate) fn test_registry(entries: &[(&str, u32, u8, bool)]) -> AssetRegistry {
        AssetRegistry::from_views(
            entries
                .iter()
                .map(|(token_id, vol_bps, extra, can_borrow)| {
                    (
                        token_id.to_string(),
                        AssetView {
                            config: AssetConfigView {
                                volatility_ratio: *vol_bps,
                                extra_decimals: *extra,
                                can_borrow: *can_borrow,
                                can_use_as_collateral: true,
                                can_deposit: true,
                                can_withdraw: true,
                            },
                            unit_acc_hp_interest: None,
                        },
                    )
                })
                .collect(),
        )
    }

    pub(crate) fn test_prices(entries: &[(&str, u128, u8)]) -> Prices {
        let mut prices = Prices::default();
        for (token_id, multiplier, decimals) in entries {
            prices.insert(
                token_id.to_string(),
                Price { multiplier: *multiplier, decimals: *decimals },
            );
        }
        prices
    }

    fn snapshot(
        collateral: &[(&str, u128)],
        borrowed: &[(&str, u128)],
    ) -> AccountSnapshot {
        AccountSnapshot {
            account_id: "alice.near".to_string(),
            position: REGULAR_POSITION.to_string(),
            collateral: collateral
                .iter()
                .map(|(t, b)| RawPosition { token_id: t.to_string(), balance: *b })
                .collect(),
            borrowed: borrowed
                .iter()
                .map(|(t, b)| RawPosition { token_id: t.to_string(), balance: *b })
                .collect(),
            supplied: Vec::new(),
        }
    }

    /// 10,000 USDC collateral at 0.8, 8,500 DAI debt at 0.95, 1:1 prices.
    pub(crate) fn usdc_dai_account() -> (AccountSnapshot, AssetRegistry, Prices) {
        let registry = test_registry(&[
            ("usdc.near", 8000, 12, true),
            ("dai.near", 9500, 0, true),
        ]);
        // Both tokens standardize to 18 decimals with a 1:1 price:
        // priced = balance * 10^4 / 10^(decimals + extra) = balance / 10^18.
        let prices = test_prices(&[
            ("usdc.near", 10_000, 10),
            ("dai.near", 10_000, 22),
        ]);
        let snap = snapshot(
            &[("usdc.near", 10_000_000_000_000_000_000_000u128)], // $10,000
            &[("dai.near", 8_500_000_000_000_000_000_000u128)],   // $8,500
        );
        (snap, registry, prices)
    }

    #[test]
    fn prices_a_simple_account() {
        let (snap, registry, prices) = usdc_dai_account();
        let account = evaluate(&snap, &registry, &prices).unwrap();

        assert_eq!(account.collateral_sum, BigDecimal::from(10_000u32));
        assert_eq!(account.borrowed_sum, BigDecimal::from(8_500u32));
        assert_eq!(account.adjusted_collateral_sum, BigDecimal::from(8_000u32));

        // 8500 / 0.95 = 8947.368...
        let adjusted_borrowed = account.adjusted_borrowed_sum.clone();
        let expected = math::parse_decimal("8947.368").unwrap();
        assert!((adjusted_borrowed - expected).abs() < math::parse_decimal("0.001").unwrap());

        // Health 8000 / 8947.4 = 0.894
        let hf = account.health_factor.clone().unwrap();
        assert!((hf - math::parse_decimal("0.894").unwrap()).abs()
            < math::parse_decimal("0.001").unwrap());
        assert!(account.is_underwater());

        // Discount = (947.4 / 8947.4) / 2 = 0.05294
        assert!((account.discount.clone() - math::parse_decimal("0.0529").unwrap()).abs()
            < math::parse_decimal("0.0002").unwrap());
    }

    #[test]
    fn zero_debt_account_has_no_health_factor() {
        let registry = test_registry(&[("usdc.near", 8000, 12, true)]);
        let prices = test_prices(&[("usdc.near", 10_000, 10)]);
        let snap = snapshot(&[("usdc.near", 1_000_000_000_000_000_000)], &[]);
        let account = evaluate(&snap, &registry, &prices).unwrap();
        assert!(account.health_factor.is_none());
        assert!(!account.is_underwater());
        assert_eq!(account.discount, BigDecimal::zero());
    }

    #[test]
    fn discount_is_zero_when_adjusted_collateral_covers_debt() {
        let registry = test_registry(&[
            ("usdc.near", 9000, 12, true),
            ("dai.near", 9500, 0, true),
        ]);
        let prices = test_prices(&[("usdc.near", 10_000, 10), ("dai.near", 10_000, 22)]);
        let snap = snapshot(
            &[("usdc.near", 10_000_000_000_000_000_000_000)], // $10,000
            &[("dai.near", 1_000_000_000_000_000_000_000)],   // $1,000
        );
        let account = evaluate(&snap, &registry, &prices).unwrap();
        assert_eq!(account.discount, BigDecimal::zero());
        assert!(!account.is_underwater());
        // Discount stays in [0, 0.5) by construction.
        assert!(account.discount < math::parse_decimal("0.5").unwrap());
    }

    #[test]
    fn unknown_token_fails_evaluation() {
        let registry = test_registry(&[("usdc.near", 8000, 12, true)]);
        let prices = test_prices(&[("usdc.near", 10_000, 10)]);
        let snap = snapshot(&[("ghost.near", 100)], &[]);
        assert!(matches!(
            evaluate(&snap, &registry, &prices),
            Err(LiquidationError::UnknownAsset(_))
        ));
    }

    #[test]
    fn force_close_eligibility() {
        let registry = test_registry(&[
            ("usdc.near", 8000, 12, true),
            ("dai.near", 9500, 0, true),
        ]);
        let prices = test_prices(&[("usdc.near", 10_000, 10), ("dai.near", 10_000, 22)]);
        // $90 collateral against $100 debt.
        let snap = snapshot(
            &[("usdc.near", 90_000_000_000_000_000_000)],
            &[("dai.near", 100_000_000_000_000_000_000)],
        );
        let account = evaluate(&snap, &registry, &prices).unwrap();
        assert!(account.is_force_close_eligible());
    }
}
