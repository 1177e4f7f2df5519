//! Configuration.
//!
//! All tunables live in one serde structure with per-field defaults. A TOML
//! profile file can override any subset (`BOT_PROFILE` points at it), and
//! the handful of operational knobs also accept environment overrides so a
//! deployment can be tuned without editing files.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::math;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub liquidation: LiquidationConfig,

    #[serde(default)]
    pub margin: MarginConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            network: NetworkConfig::default(),
            liquidation: LiquidationConfig::default(),
            margin: MarginConfig::default(),
            oracle: OracleConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Contract ids and the agent's own account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_burrow_contract")]
    pub burrow_contract_id: String,
    #[serde(default = "default_price_oracle_contract")]
    pub price_oracle_contract_id: String,
    #[serde(default = "default_pyth_oracle_contract")]
    pub pyth_oracle_contract_id: String,
    #[serde(default = "default_ref_contract")]
    pub ref_exchange_contract_id: String,
    #[serde(default = "default_wrap_token")]
    pub wrap_token_id: String,
    /// The liquidator's own account id
    #[serde(default)]
    pub account_id: String,
}

fn default_rpc_url() -> String {
    "https://rpc.mainnet.near.org".to_string()
}
fn default_burrow_contract() -> String {
    "contract.main.burrow.near".to_string()
}
fn default_price_oracle_contract() -> String {
    "priceoracle.near".to_string()
}
fn default_pyth_oracle_contract() -> String {
    "pyth-oracle.near".to_string()
}
fn default_ref_contract() -> String {
    "v2.ref-finance.near".to_string()
}
fn default_wrap_token() -> String {
    "wrap.near".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            burrow_contract_id: default_burrow_contract(),
            price_oracle_contract_id: default_price_oracle_contract(),
            pyth_oracle_contract_id: default_pyth_oracle_contract(),
            ref_exchange_contract_id: default_ref_contract(),
            wrap_token_id: default_wrap_token(),
            account_id: String::new(),
        }
    }
}

/// Liquidation sizing and guard thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationConfig {
    /// Minimum dollar profit for a plan to be submitted
    #[serde(default = "default_min_profit")]
    pub min_profit: f64,
    /// Minimum discount for an account to be a candidate
    #[serde(default = "default_min_discount")]
    pub min_discount: f64,
    /// Budget (dollars) for one liquidation's repaid debt
    #[serde(default = "default_max_liquidation_amount")]
    pub max_liquidation_amount: f64,
    /// Claimed collateral tokens to follow up with withdraw actions
    #[serde(default = "default_max_withdraw_count")]
    pub max_withdraw_count: usize,
    /// Sizing stops once health reaches this ceiling
    #[serde(default = "default_max_health_factor")]
    pub max_health_factor: f64,
    /// Legs below this dollar value are skipped as dust
    #[serde(default = "default_min_priced_balance")]
    pub min_priced_balance: f64,
    /// Shave applied to claimed collateral (absorbs price drift)
    #[serde(default = "default_collateral_shave_bps")]
    pub collateral_shave_bps: u32,
    /// Shave applied to repaid debt
    #[serde(default = "default_debt_shave_bps")]
    pub debt_shave_bps: u32,
    /// Enable the force-close scan
    #[serde(default)]
    pub force_close: bool,
    /// Enable the margin-position scan
    #[serde(default)]
    pub margin: bool,
}

fn default_min_profit() -> f64 {
    1.0
}
fn default_min_discount() -> f64 {
    0.05
}
fn default_max_liquidation_amount() -> f64 {
    20_000.0
}
fn default_max_withdraw_count() -> usize {
    5
}
fn default_max_health_factor() -> f64 {
    0.995
}
fn default_min_priced_balance() -> f64 {
    0.01
}
fn default_collateral_shave_bps() -> u32 {
    11
}
fn default_debt_shave_bps() -> u32 {
    10
}

impl Default for LiquidationConfig {
    fn default() -> Self {
        Self {
            min_profit: default_min_profit(),
            min_discount: default_min_discount(),
            max_liquidation_amount: default_max_liquidation_amount(),
            max_withdraw_count: default_max_withdraw_count(),
            max_health_factor: default_max_health_factor(),
            min_priced_balance: default_min_priced_balance(),
            collateral_shave_bps: default_collateral_shave_bps(),
            debt_shave_bps: default_debt_shave_bps(),
            force_close: false,
            margin: false,
        }
    }
}

impl LiquidationConfig {
    pub fn min_profit_dec(&self) -> BigDecimal {
        math::from_f64(self.min_profit)
    }
    pub fn min_discount_dec(&self) -> BigDecimal {
        math::from_f64(self.min_discount)
    }
    pub fn max_liquidation_amount_dec(&self) -> BigDecimal {
        math::from_f64(self.max_liquidation_amount)
    }
    pub fn max_health_factor_dec(&self) -> BigDecimal {
        math::from_f64(self.max_health_factor)
    }
    pub fn min_priced_balance_dec(&self) -> BigDecimal {
        math::from_f64(self.min_priced_balance)
    }
}

/// Margin-pass tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginConfig {
    /// Floor ratio applied to the minimum debt proceeds of the swap
    #[serde(default = "default_min_amount_ratio")]
    pub min_amount_ratio: f64,
    /// Supplied balances above this dollar value are swept out
    #[serde(default = "default_min_swap_amount")]
    pub min_swap_amount: f64,
}

fn default_min_amount_ratio() -> f64 {
    0.95
}
fn default_min_swap_amount() -> f64 {
    1.0
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            min_amount_ratio: default_min_amount_ratio(),
            min_swap_amount: default_min_swap_amount(),
        }
    }
}

impl MarginConfig {
    pub fn min_amount_ratio_dec(&self) -> BigDecimal {
        math::from_f64(self.min_amount_ratio)
    }
    pub fn min_swap_amount_dec(&self) -> BigDecimal {
        math::from_f64(self.min_swap_amount)
    }
}

/// Oracle staleness bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Maximum accepted push-oracle quote age
    #[serde(default = "default_pyth_staleness_secs")]
    pub pyth_staleness_secs: u64,
}

fn default_pyth_staleness_secs() -> u64 {
    60
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            pyth_staleness_secs: default_pyth_staleness_secs(),
        }
    }
}

/// Pass scheduling and paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between evaluation passes (milliseconds)
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
    /// Page size for account listing
    #[serde(default = "default_account_page_size")]
    pub account_page_size: u64,
    /// Page size for pool listing
    #[serde(default = "default_pool_page_size")]
    pub pool_page_size: u64,
    /// Upper bound on pools loaded into the route graph
    #[serde(default = "default_max_pools")]
    pub max_pools: u64,
}

fn default_loop_interval_ms() -> u64 {
    30_000
}
fn default_account_page_size() -> u64 {
    40
}
fn default_pool_page_size() -> u64 {
    250
}
fn default_max_pools() -> u64 {
    10_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: default_loop_interval_ms(),
            account_page_size: default_account_page_size(),
            pool_page_size: default_pool_page_size(),
            max_pools: default_max_pools(),
        }
    }
}

impl SchedulerConfig {
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }
}

impl BotConfig {
    /// Load configuration: defaults, then the TOML profile `BOT_PROFILE`
    /// points at (if any), then environment overrides.
    pub fn from_env() -> Self {
        let mut config = match std::env::var("BOT_PROFILE") {
            Ok(path) => match std::fs::read_to_string(&path) {
                Ok(raw) => match toml::from_str(&raw) {
                    Ok(config) => config,
                    Err(error) => {
                        warn!(%path, %error, "failed to parse profile, using defaults");
                        Self::default()
                    }
                },
                Err(error) => {
                    warn!(%path, %error, "failed to read profile, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RPC_URL") {
            self.network.rpc_url = v;
        }
        if let Ok(v) = std::env::var("ACCOUNT_ID") {
            self.network.account_id = v;
        }
        if let Some(v) = env_parse("MIN_PROFIT") {
            self.liquidation.min_profit = v;
        }
        if let Some(v) = env_parse("MIN_DISCOUNT") {
            self.liquidation.min_discount = v;
        }
        if let Some(v) = env_parse("MAX_LIQUIDATION_AMOUNT") {
            self.liquidation.max_liquidation_amount = v;
        }
        if let Some(v) = env_parse("MAX_WITHDRAW_COUNT") {
            self.liquidation.max_withdraw_count = v;
        }
        if let Some(v) = env_parse("LOOP_INTERVAL") {
            self.scheduler.loop_interval_ms = v;
        }
        if std::env::var("FORCE_CLOSE").is_ok_and(|v| !v.is_empty()) {
            self.liquidation.force_close = true;
        }
        if std::env::var("MARGIN_POSITION").is_ok_and(|v| !v.is_empty()) {
            self.liquidation.margin = true;
        }
    }

    /// Log the operative parameters at startup.
    pub fn log_config(&self) {
        info!(
            profile = %self.profile,
            rpc = %self.network.rpc_url,
            account = %self.network.account_id,
            min_profit = self.liquidation.min_profit,
            min_discount = self.liquidation.min_discount,
            max_liquidation_amount = self.liquidation.max_liquidation_amount,
            collateral_shave_bps = self.liquidation.collateral_shave_bps,
            debt_shave_bps = self.liquidation.debt_shave_bps,
            force_close = self.liquidation.force_close,
            margin = self.liquidation.margin,
            loop_interval_ms = self.scheduler.loop_interval_ms,
            "configuration loaded"
        );
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_operational_profile() {
        let config = BotConfig::default();
        assert_eq!(config.liquidation.min_profit, 1.0);
        assert_eq!(config.liquidation.min_discount, 0.05);
        assert_eq!(config.liquidation.max_liquidation_amount, 20_000.0);
        assert_eq!(config.liquidation.max_withdraw_count, 5);
        assert_eq!(config.liquidation.collateral_shave_bps, 11);
        assert_eq!(config.liquidation.debt_shave_bps, 10);
        assert_eq!(config.oracle.pyth_staleness_secs, 60);
        assert_eq!(config.scheduler.account_page_size, 40);
    }

    #[test]
    fn toml_profile_overrides_subset() {
        let raw = r#"
            profile = "aggressive"

            [liquidation]
            min_profit = 0.25
            force_close = true
        "#;
        let config: BotConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.profile, "aggressive");
        assert_eq!(config.liquidation.min_profit, 0.25);
        assert!(config.liquidation.force_close);
        // Untouched fields keep their defaults.
        assert_eq!(config.liquidation.max_withdraw_count, 5);
        assert_eq!(config.network.wrap_token_id, "wrap.near");
    }

    #[test]
    fn decimal_accessors() {
        let config = LiquidationConfig::default();
        assert_eq!(
            config.max_health_factor_dec(),
            math::parse_decimal("0.995").unwrap()
        );
        assert_eq!(
            config.min_priced_balance_dec(),
            math::parse_decimal("0.01").unwrap()
        );
    }
}
