//! Action payloads accepted by the lending contract.
//!
//! One closed sum type per action kind; the dynamic JSON shape only exists
//! at the serialization boundary. Serde's externally-tagged representation
//! matches the contract's expected `{"Liquidate": {...}}` framing, and all
//! amounts are emitted as base-10 integer strings.

use serde::{Deserialize, Serialize};

/// A token amount at the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub token_id: String,
    pub amount: String,
}

impl AssetAmount {
    pub fn new(token_id: impl Into<String>, amount: u128) -> Self {
        Self {
            token_id: token_id.into(),
            amount: amount.to_string(),
        }
    }
}

/// `Liquidate`: repay `in_assets` of the target's debt and claim
/// `out_assets` of its collateral at the discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidateAction {
    pub account_id: String,
    pub in_assets: Vec<AssetAmount>,
    pub out_assets: Vec<AssetAmount>,
    /// Position key; the contract defaults to the regular position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Floors for LP-token collateral decomposition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_token_amounts: Option<Vec<String>>,
}

/// `ForceClose`: unwind an account whose collateral no longer covers debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceCloseAction {
    pub account_id: String,
    pub position: Option<String>,
    pub min_token_amounts: Option<Vec<String>>,
}

/// `Withdraw`: pull claimed collateral out of the supplied balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawAction {
    pub token_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<String>,
}

/// Routing hint carried by margin liquidation actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapIndication {
    pub dex_id: String,
    /// DEX-specific action message, pre-serialized
    pub swap_action_text: String,
}

/// Arguments shared by `LiquidateMTPosition` and `ForceCloseMTPosition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginAction {
    pub pos_owner_id: String,
    pub pos_id: String,
    pub token_p_amount: String,
    pub min_token_d_amount: String,
    pub swap_indication: SwapIndication,
}

/// One hop of the DEX swap message embedded in a margin action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapAction {
    pub pool_id: u32,
    pub token_in: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_in: Option<String>,
    pub token_out: String,
    pub min_amount_out: String,
}

/// Swap message understood by the exchange contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapMessage {
    pub actions: Vec<SwapAction>,
}

/// Every action the agent can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Liquidate(LiquidateAction),
    ForceClose(ForceCloseAction),
    LiquidateMTPosition(MarginAction),
    ForceCloseMTPosition(MarginAction),
    Withdraw(WithdrawAction),
}

impl Action {
    pub fn as_liquidate(&self) -> Option<&LiquidateAction> {
        match self {
            Self::Liquidate(action) => Some(action),
            _ => None,
        }
    }

    pub fn as_liquidate_mut(&mut self) -> Option<&mut LiquidateAction> {
        match self {
            Self::Liquidate(action) => Some(action),
            _ => None,
        }
    }
}

/// Message wrapper for `oracle_call` against the regular execution path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OracleCallMsg {
    Execute { actions: Vec<Action> },
    MarginExecute { actions: Vec<Action> },
}
