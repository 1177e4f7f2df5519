//! Ref Finance pool math and swap routing.
//!
//! This crate provides the DEX-side building blocks of the liquidation agent:
//! - Typed liquidity pools decoded from exchange contract views
//! - Constant-product and StableSwap pricing (forward and inverse)
//! - A bounded-depth (direct or two-hop) best-path search over a pool graph
//! - A read-through token-decimals cache shared across evaluation passes
//!
//! All pool math is integer arithmetic on 256-bit values, matching the
//! rounding behavior of the on-chain pools: outputs round down, required
//! inputs round up.

mod cache;
pub mod math;
mod pool;
mod router;

pub use cache::{TokenDecimalsCache, TokenMetadataSource};
pub use pool::{Pool, PoolKind, PoolView, StableState};
pub use router::{PoolGraph, SwapInfo};

/// One unit of the rate denominator used by rated pools (10^24).
pub fn one_near() -> alloy_primitives::U256 {
    math::pow10(24)
}
