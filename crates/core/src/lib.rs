//! Liquidation decision core.
//!
//! This crate turns raw protocol snapshots into liquidation decisions:
//! - Asset registry and price normalization (pull and push oracle modes)
//! - Account risk evaluation: priced balances, adjusted sums, health
//!   factor, liquidation discount
//! - Liquidation sizing: the maximal profitable, health-improving plan
//! - Margin-position liquidation and force-close sizing
//! - Action payload types matching the contract wire format
//! - The pass engine scheduling non-overlapping evaluation cycles
//!
//! Everything here is synchronous and deterministic given its inputs;
//! suspension only happens at the source seams defined by `burrow-chain`.

pub mod account;
pub mod actions;
pub mod asset;
pub mod config;
mod engine;
mod error;
pub mod liquidation;
pub mod margin;
pub mod math;
pub mod price;

pub use account::{evaluate, AccountSnapshot, EvaluatedAccount, PricedPosition, RawPosition};
pub use actions::{Action, AssetAmount, LiquidateAction, OracleCallMsg};
pub use asset::{Asset, AssetRegistry, LpTokenInfo, LpTokenInfos, TokenId, REGULAR_POSITION};
pub use config::BotConfig;
pub use engine::Engine;
pub use error::LiquidationError;
pub use liquidation::{force_close_action, LiquidationPlan, Sizer};
pub use margin::{evaluate_margin, EvaluatedMarginPosition, MarginPositionSnapshot};
pub use price::{normalize_pyth, Price, Prices};
