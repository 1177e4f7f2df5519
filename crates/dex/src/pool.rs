//! Liquidity pool model.
//!
//! Pools arrive as JSON views from the exchange contract and are decoded into
//! a typed form. Stable and rated pools additionally pre-compute the
//! rate-adjusted 18-decimal balances and the invariant D so that quoting is
//! pure arithmetic afterwards.

use alloy_primitives::U256;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::cache::{TokenDecimalsCache, TokenMetadataSource};
use crate::math;

const SIMPLE_POOL: &str = "SIMPLE_POOL";
const STABLE_SWAP: &str = "STABLE_SWAP";
const RATED_SWAP: &str = "RATED_SWAP";

/// Pool kind as reported by the exchange contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// Constant-product pool
    Simple,
    /// StableSwap pool with a fixed 1:1 target
    Stable,
    /// StableSwap pool over rate-bearing tokens (e.g. liquid staking tokens)
    Rated,
}

impl PoolKind {
    fn from_view(kind: &str) -> Option<Self> {
        match kind {
            SIMPLE_POOL => Some(Self::Simple),
            STABLE_SWAP => Some(Self::Stable),
            RATED_SWAP => Some(Self::Rated),
            _ => None,
        }
    }

    /// Whether this kind prices through the StableSwap invariant.
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Stable | Self::Rated)
    }
}

/// Raw pool view returned by `get_pools`.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolView {
    pub pool_kind: String,
    pub token_account_ids: Vec<String>,
    pub amounts: Vec<String>,
    pub total_fee: u32,
    pub shares_total_supply: String,
    #[serde(default)]
    pub amp: u64,
}

/// Pre-computed state for StableSwap pricing.
#[derive(Debug, Clone)]
pub struct StableState {
    /// Rate-adjusted balances scaled to 18 decimals
    pub c_amounts: Vec<U256>,
    /// Per-token rate multipliers (10^24 denominator)
    pub rates: Vec<U256>,
    /// Per-token metadata decimals
    pub decimals: Vec<u8>,
    /// Fee in basis points (copied from the pool for quoting)
    pub fee: u32,
    /// Amplification coefficient
    pub amp: u64,
    /// amp * n^n
    pub ann: U256,
    /// n^n
    pub nn: U256,
    /// Cached invariant
    pub d: U256,
}

/// A decoded liquidity pool.
#[derive(Debug, Clone)]
pub struct Pool {
    /// Pool id (index in the exchange contract)
    pub index: u32,
    pub kind: PoolKind,
    /// Token account ids, order matches `amounts`
    pub tokens: Vec<String>,
    /// Raw per-token balances
    pub amounts: Vec<U256>,
    /// Fee in basis points
    pub fee: u32,
    pub shares_total_supply: U256,
    /// StableSwap state, present iff `kind.is_stable()`
    pub stable: Option<StableState>,
}

impl Pool {
    /// Construct a stable/rated pool and compute its invariant.
    pub fn new_stable(
        index: u32,
        kind: PoolKind,
        tokens: Vec<String>,
        amounts: Vec<U256>,
        fee: u32,
        shares_total_supply: U256,
        decimals: Vec<u8>,
        rates: Vec<U256>,
        amp: u64,
    ) -> Self {
        let n = amounts.len() as u64;
        let nn = U256::from(n.pow(n as u32));
        let ann = U256::from(amp) * nn;
        let c_amounts: Vec<U256> = amounts
            .iter()
            .zip(decimals.iter())
            .zip(rates.iter())
            .map(|((amount, dec), rate)| {
                math::to_comparable(*amount, *dec) * *rate / crate::one_near()
            })
            .collect();
        let mut state = StableState {
            c_amounts,
            rates,
            decimals,
            fee,
            amp,
            ann,
            nn,
            d: U256::ZERO,
        };
        state.d = math::compute_d(&state);
        Self {
            index,
            kind,
            tokens,
            amounts,
            fee,
            shares_total_supply,
            stable: Some(state),
        }
    }

    /// Decode a pool view. Returns `None` for unsupported kinds, empty pools,
    /// or rated pools missing a token rate (logged, not fatal).
    pub async fn from_view(
        index: u32,
        view: &PoolView,
        rated_tokens: &HashMap<String, U256>,
        decimals_cache: &TokenDecimalsCache,
        metadata: &dyn TokenMetadataSource,
    ) -> Option<Self> {
        let kind = PoolKind::from_view(&view.pool_kind)?;
        let shares_total_supply = parse_u256(&view.shares_total_supply)?;
        if shares_total_supply.is_zero() {
            return None;
        }
        let amounts: Vec<U256> = view
            .amounts
            .iter()
            .map(|a| parse_u256(a))
            .collect::<Option<_>>()?;
        let tokens = view.token_account_ids.clone();

        if !kind.is_stable() {
            return Some(Self {
                index,
                kind,
                tokens,
                amounts,
                fee: view.total_fee,
                shares_total_supply,
                stable: None,
            });
        }

        let mut decimals = Vec::with_capacity(tokens.len());
        for token_id in &tokens {
            decimals.push(decimals_cache.decimals(token_id, metadata).await);
        }

        let rates = match kind {
            PoolKind::Rated => {
                let mut rates = Vec::with_capacity(tokens.len());
                for token_id in &tokens {
                    match rated_tokens.get(token_id) {
                        Some(rate) => rates.push(*rate),
                        None => {
                            warn!(pool = index, token = %token_id, "missing token rate, excluding pool");
                            return None;
                        }
                    }
                }
                rates
            }
            _ => vec![crate::one_near(); tokens.len()],
        };

        Some(Self::new_stable(
            index,
            kind,
            tokens,
            amounts,
            view.total_fee,
            shares_total_supply,
            decimals,
            rates,
            view.amp,
        ))
    }

    /// Index of a token within the pool, if present.
    pub fn token_index(&self, token_id: &str) -> Option<usize> {
        self.tokens.iter().position(|t| t == token_id)
    }

    /// Tokens of the pool other than `token_id`.
    pub fn other_tokens<'a>(&'a self, token_id: &'a str) -> impl Iterator<Item = &'a str> {
        self.tokens
            .iter()
            .map(String::as_str)
            .filter(move |t| *t != token_id)
    }
}

fn parse_u256(s: &str) -> Option<U256> {
    U256::from_str_radix(s, 10).ok()
}
