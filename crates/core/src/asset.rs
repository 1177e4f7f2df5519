//! Asset registry.
//!
//! Decodes per-asset configuration from the lending contract into typed
//! records. The registry is a per-pass snapshot: it is rebuilt wholesale at
//! the start of every evaluation cycle and never mutated in place.

use bigdecimal::BigDecimal;
use num_traits::Zero;
use std::collections::HashMap;

use crate::error::LiquidationError;
use crate::math;
use burrow_chain::views::{AssetView, LpTokenInfoView};

pub type TokenId = String;

/// Position key used for the default (non-LP) lending position.
pub const REGULAR_POSITION: &str = "REGULAR";

/// Typed per-asset configuration.
#[derive(Debug, Clone)]
pub struct Asset {
    pub token_id: TokenId,
    /// Collateral/debt weighting in [0, 1]
    pub volatility_ratio: BigDecimal,
    /// Decimal padding on top of metadata decimals
    pub extra_decimals: u8,
    pub can_borrow: bool,
    pub can_use_as_collateral: bool,
    /// Accumulated holding-position interest index (margin fee accrual)
    pub unit_acc_hp_interest: BigDecimal,
}

impl Asset {
    fn from_view(token_id: TokenId, view: &AssetView) -> Self {
        let unit_acc_hp_interest = view
            .unit_acc_hp_interest
            .as_deref()
            .and_then(math::parse_decimal)
            .unwrap_or_else(BigDecimal::zero);
        Self {
            token_id,
            volatility_ratio: math::ratio_from_bps(view.config.volatility_ratio),
            extra_decimals: view.config.extra_decimals,
            can_borrow: view.config.can_borrow,
            can_use_as_collateral: view.config.can_use_as_collateral,
            unit_acc_hp_interest,
        }
    }
}

/// Snapshot of all assets, keyed by token id.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: HashMap<TokenId, Asset>,
}

impl AssetRegistry {
    /// Decode the `get_assets_paged` result.
    pub fn from_views(views: Vec<(String, AssetView)>) -> Self {
        let assets = views
            .into_iter()
            .map(|(token_id, view)| {
                let asset = Asset::from_view(token_id.clone(), &view);
                (token_id, asset)
            })
            .collect();
        Self { assets }
    }

    pub fn get(&self, token_id: &str) -> Result<&Asset, LiquidationError> {
        self.assets
            .get(token_id)
            .ok_or_else(|| LiquidationError::UnknownAsset(token_id.to_string()))
    }

    pub fn token_ids(&self) -> Vec<TokenId> {
        self.assets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Per-unit-share constituent of an LP token, with the live amount filled
/// in from the exchange contract.
#[derive(Debug, Clone)]
pub struct UnitShareToken {
    pub token_id: TokenId,
    pub real_amount: u128,
}

/// Decomposition of an LP (shadow) token used as collateral.
#[derive(Debug, Clone)]
pub struct LpTokenInfo {
    pub decimals: u8,
    pub tokens: Vec<UnitShareToken>,
}

impl LpTokenInfo {
    /// Combine the lending contract's view with the exchange's live
    /// unit-share amounts (index-aligned).
    pub fn from_view(view: &LpTokenInfoView, real_amounts: &[String]) -> Self {
        let tokens = view
            .tokens
            .iter()
            .enumerate()
            .map(|(i, t)| UnitShareToken {
                token_id: t.token_id.clone(),
                real_amount: real_amounts
                    .get(i)
                    .or(t.real_amount.as_ref())
                    .or(t.amount.as_ref())
                    .and_then(|a| math::parse_amount(a))
                    .unwrap_or(0),
            })
            .collect();
        Self {
            decimals: view.decimals,
            tokens,
        }
    }

    /// Pool id embedded in a shadow token id (`shadow_ref_v1-<pool_id>`).
    pub fn pool_id_of(shadow_token_id: &str) -> Option<u64> {
        shadow_token_id.split('-').nth(1)?.parse().ok()
    }
}

pub type LpTokenInfos = HashMap<TokenId, LpTokenInfo>;

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_chain::views::AssetConfigView;

    fn asset_view(volatility_ratio: u32, extra_decimals: u8, can_borrow: bool) -> AssetView {
        AssetView {
            config: AssetConfigView {
                volatility_ratio,
                extra_decimals,
                can_borrow,
                can_use_as_collateral: true,
                can_deposit: true,
                can_withdraw: true,
            },
            unit_acc_hp_interest: None,
        }
    }

    #[test]
    fn registry_decodes_ratios_from_bps() {
        let registry = AssetRegistry::from_views(vec![
            ("usdc.near".to_string(), asset_view(9500, 12, true)),
            ("wrap.near".to_string(), asset_view(6000, 0, true)),
        ]);
        let usdc = registry.get("usdc.near").unwrap();
        assert_eq!(usdc.volatility_ratio, math::parse_decimal("0.95").unwrap());
        assert_eq!(usdc.extra_decimals, 12);

        let near = registry.get("wrap.near").unwrap();
        assert_eq!(near.volatility_ratio, math::parse_decimal("0.6").unwrap());
    }

    #[test]
    fn unknown_asset_is_an_error() {
        let registry = AssetRegistry::from_views(vec![]);
        assert!(matches!(
            registry.get("ghost.near"),
            Err(LiquidationError::UnknownAsset(_))
        ));
    }

    #[test]
    fn shadow_token_pool_id() {
        assert_eq!(LpTokenInfo::pool_id_of("shadow_ref_v1-4179"), Some(4179));
        assert_eq!(LpTokenInfo::pool_id_of("usdc.near"), None);
    }
}
