//! Typed views of contract state.
//!
//! These mirror the JSON the contracts return; amounts stay stringified
//! u128 values here and are only parsed where the core prices them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-asset risk configuration, as stored by the lending contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfigView {
    /// Collateral/debt weighting in basis points (e.g. 9500 = 0.95)
    pub volatility_ratio: u32,
    /// Decimal padding applied on top of metadata decimals
    pub extra_decimals: u8,
    pub can_borrow: bool,
    #[serde(default)]
    pub can_use_as_collateral: bool,
    #[serde(default)]
    pub can_deposit: bool,
    #[serde(default)]
    pub can_withdraw: bool,
}

/// Asset entry from `get_assets_paged`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetView {
    pub config: AssetConfigView,
    /// Accumulated holding-position interest index (margin fee accrual)
    #[serde(default)]
    pub unit_acc_hp_interest: Option<String>,
}

/// Protocol-level configuration from `get_config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfigView {
    /// true: prices come from the pull oracle; false: from the push oracle
    pub enable_price_oracle: bool,
    #[serde(default)]
    pub oracle_account_id: Option<String>,
    #[serde(default)]
    pub pyth_oracle_account_id: Option<String>,
}

/// Margin-trading configuration from `get_margin_config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginConfigView {
    /// Position safety buffer in basis points (field name as on-chain)
    pub min_safty_buffer: u32,
    #[serde(default)]
    pub max_leverage_rate: Option<u8>,
}

/// A token amount inside an account view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetAmountView {
    pub token_id: String,
    #[serde(default)]
    pub shares: Option<String>,
    pub balance: String,
}

/// One lending position (collateral and borrowed legs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionView {
    #[serde(default)]
    pub collateral: Vec<AssetAmountView>,
    #[serde(default)]
    pub borrowed: Vec<AssetAmountView>,
}

/// Account entry from `get_accounts_paged` / `get_account`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub account_id: String,
    /// Keyed by position: `REGULAR` or an LP-token id
    #[serde(default)]
    pub positions: HashMap<String, PositionView>,
    /// Supplied-but-not-collateral balances (liquidator withdraw sweep)
    #[serde(default)]
    pub supplied: Vec<AssetAmountView>,
}

/// Margin account entry from `get_margin_accounts_paged`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginAccountView {
    pub account_id: String,
    #[serde(default)]
    pub margin_positions: HashMap<String, MarginPositionView>,
    #[serde(default)]
    pub supplied: Vec<AssetAmountView>,
}

/// One margin position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginPositionView {
    /// Accumulated interest index at open
    pub uahpi_at_open: String,
    pub debt_cap: String,
    pub token_c_info: MarginTokenView,
    pub token_d_info: MarginTokenView,
    pub token_p_id: String,
    pub token_p_amount: String,
    #[serde(default)]
    pub is_locking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginTokenView {
    pub token_id: String,
    pub balance: String,
}

/// Price entry: integer multiplier over 10^decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceView {
    pub multiplier: String,
    pub decimals: u8,
}

/// One priced asset from the pull oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPriceView {
    pub asset_id: String,
    pub price: Option<PriceView>,
}

/// `get_price_data` response from the pull oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceDataView {
    /// Nanosecond timestamp of the oracle round
    pub timestamp: String,
    pub recency_duration_sec: String,
    pub prices: Vec<AssetPriceView>,
}

/// Per-token push-oracle wiring from `get_all_token_pyth_infos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPythInfoView {
    pub price_identifier: String,
    /// Token decimals the price applies to
    pub decimals: u8,
    pub fraction_digits: u8,
    /// View method on the token contract yielding a derived-price rate
    #[serde(default)]
    pub extra_call: Option<String>,
    /// Static price bypassing the oracle entirely
    #[serde(default)]
    pub default_price: Option<PriceView>,
}

/// Push-oracle quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythQuoteView {
    pub price: String,
    pub expo: i32,
    pub publish_time: i64,
}

/// Per-unit-share constituent of an LP token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitShareTokenView {
    pub token_id: String,
    #[serde(default)]
    pub amount: Option<String>,
    /// Filled from the exchange's `get_unit_share_token_amounts`
    #[serde(default)]
    pub real_amount: Option<String>,
}

/// LP (shadow) token decomposition from `get_last_lp_token_infos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpTokenInfoView {
    pub decimals: u8,
    pub tokens: Vec<UnitShareTokenView>,
}

/// Rated-token entry from the exchange's `list_rated_tokens`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatedTokenView {
    pub rate_price: String,
}

/// Fungible-token metadata (only the field the agent needs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtMetadataView {
    pub decimals: u8,
}
