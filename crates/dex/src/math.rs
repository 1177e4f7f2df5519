//! Pool pricing math.
//!
//! Constant-product ("simple") pools use the classic `x * y = k` formula with
//! the fee taken from the input side. Stable and rated pools use the
//! StableSwap hybrid invariant, solved iteratively with Newton's method on
//! rate-adjusted 18-decimal balances.
//!
//! Rounding follows the on-chain pools: amounts out are floored, required
//! amounts in are ceiled, and every intermediate division inside the Newton
//! iterations truncates.

use alloy_primitives::U256;

use crate::pool::{Pool, StableState};

/// Fee denominator: fees are expressed in basis points.
pub const FEE_DIVISOR: u32 = 10_000;

/// Iteration cap for the invariant solvers.
const MAX_ITERATIONS: usize = 256;

/// Pre-computed powers of 10 up to 10^38 (largest that fits in u128).
const POW10: [u128; 39] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
    1_000_000_000_000_000,
    10_000_000_000_000_000,
    100_000_000_000_000_000,
    1_000_000_000_000_000_000,
    10_000_000_000_000_000_000,
    100_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000,
    1_000_000_000_000_000_000_000_000_000_000_000_000,
    10_000_000_000_000_000_000_000_000_000_000_000_000,
    100_000_000_000_000_000_000_000_000_000_000_000_000,
];

/// Fast power of 10 lookup.
#[inline]
pub fn pow10(exp: u32) -> U256 {
    if (exp as usize) < POW10.len() {
        U256::from(POW10[exp as usize])
    } else {
        U256::from(10u64).pow(U256::from(exp))
    }
}

/// Scale a raw token amount to the 18-decimal comparable representation.
#[inline]
pub fn to_comparable(amount: U256, decimals: u8) -> U256 {
    if decimals <= 18 {
        amount * pow10(18 - decimals as u32)
    } else {
        amount / pow10(decimals as u32 - 18)
    }
}

/// Scale an 18-decimal comparable amount back to raw token units (floored).
#[inline]
pub fn from_comparable(amount: U256, decimals: u8) -> U256 {
    if decimals <= 18 {
        amount / pow10(18 - decimals as u32)
    } else {
        amount * pow10(decimals as u32 - 18)
    }
}

/// Ceiling division.
#[inline]
fn div_ceil(a: U256, b: U256) -> U256 {
    let q = a / b;
    if q * b < a {
        q + U256::from(1u8)
    } else {
        q
    }
}

/// Quote the output amount for a swap through `pool`.
///
/// Returns `None` when either token is not in the pool or the tokens are
/// equal; returns `Some(0)` for a zero input.
pub fn get_return(pool: &Pool, token_in: &str, amount_in: U256, token_out: &str) -> Option<U256> {
    if amount_in.is_zero() {
        return Some(U256::ZERO);
    }
    let index_in = pool.token_index(token_in)?;
    let index_out = pool.token_index(token_out)?;
    if token_in == token_out {
        return None;
    }
    match &pool.stable {
        Some(state) => stable_get_return(state, index_in, amount_in, index_out),
        None => {
            let balance_in = pool.amounts[index_in];
            let balance_out = pool.amounts[index_out];
            let amount_with_fee = amount_in * U256::from(FEE_DIVISOR - pool.fee);
            Some(
                amount_with_fee * balance_out
                    / (U256::from(FEE_DIVISOR) * balance_in + amount_with_fee),
            )
        }
    }
}

/// Quote the input amount required to receive `amount_out` from `pool`.
///
/// Returns `None` when the pool cannot satisfy the request (unknown token,
/// or the requested output is not below the pool's output balance);
/// returns `Some(0)` for a zero output.
pub fn get_inverse_return(
    pool: &Pool,
    token_out: &str,
    amount_out: U256,
    token_in: &str,
) -> Option<U256> {
    if amount_out.is_zero() {
        return Some(U256::ZERO);
    }
    let index_in = pool.token_index(token_in)?;
    let index_out = pool.token_index(token_out)?;
    if token_in == token_out {
        return None;
    }
    match &pool.stable {
        Some(state) => stable_get_inverse_return(state, index_out, amount_out, index_in),
        None => {
            let balance_in = pool.amounts[index_in];
            let balance_out = pool.amounts[index_out];
            if amount_out >= balance_out {
                return None;
            }
            Some(div_ceil(
                U256::from(FEE_DIVISOR) * balance_in * amount_out,
                U256::from(FEE_DIVISOR - pool.fee) * (balance_out - amount_out),
            ))
        }
    }
}

/// StableSwap forward quote on rate-adjusted comparable balances.
fn stable_get_return(
    state: &StableState,
    index_in: usize,
    amount_in: U256,
    index_out: usize,
) -> Option<U256> {
    if state.d.is_zero() {
        return None;
    }
    let one = U256::from(1u8);
    // The pool keeps one indivisible unit of the input for itself.
    let c_amount_in = to_comparable(amount_in - one, state.decimals[index_in])
        * state.rates[index_in]
        / crate::one_near();

    let y = compute_y(state, state.c_amounts[index_in] + c_amount_in, index_in, index_out)?;

    let dy = state.c_amounts[index_out].checked_sub(y)?;
    let trade_fee = dy * U256::from(state.fee) / U256::from(FEE_DIVISOR);
    let amount_swapped = dy - trade_fee;

    Some(from_comparable(
        amount_swapped * crate::one_near() / state.rates[index_out],
        state.decimals[index_out],
    ))
}

/// StableSwap inverse quote: input needed for a desired output.
fn stable_get_inverse_return(
    state: &StableState,
    index_out: usize,
    amount_out: U256,
    index_in: usize,
) -> Option<U256> {
    if state.d.is_zero() {
        return None;
    }
    let amount_out_with_fee =
        amount_out * U256::from(FEE_DIVISOR) / U256::from(FEE_DIVISOR - state.fee);
    let c_amount_out = to_comparable(amount_out_with_fee, state.decimals[index_out])
        * state.rates[index_out]
        / crate::one_near();

    let reduced = state.c_amounts[index_out].checked_sub(c_amount_out)?;
    let y = compute_y(state, reduced, index_out, index_in)?;
    let c_amount_in = y.checked_sub(state.c_amounts[index_in])?;

    // One unit on top covers the pool's internal rounding.
    Some(
        from_comparable(
            c_amount_in * crate::one_near() / state.rates[index_in],
            state.decimals[index_in],
        ) + U256::from(1u8),
    )
}

/// Compute the StableSwap invariant D for the pool's current balances.
///
/// Newton iteration: `D' = D·(n·prod + Ann·S) / (D·(Ann−1) + prod·(n+1))`
/// where `prod = D^(n+1) / (n^n · ∏x_i)`, run until two successive values
/// differ by at most one unit.
pub fn compute_d(state: &StableState) -> U256 {
    let n = U256::from(state.c_amounts.len() as u64);
    let sum_x = state
        .c_amounts
        .iter()
        .fold(U256::ZERO, |acc, v| acc + *v);
    if sum_x.is_zero() || state.c_amounts.iter().any(|c| c.is_zero()) {
        return U256::ZERO;
    }

    let one = U256::from(1u8);
    let mut d = sum_x;
    for _ in 0..MAX_ITERATIONS {
        let mut d_prod = d;
        for c_amount in &state.c_amounts {
            d_prod = d_prod * d / (*c_amount * n);
        }
        let d_prev = d;

        let leverage = sum_x * state.ann;
        let numerator = d_prev * (d_prod * n + leverage);
        let denominator = d_prev * (state.ann - one) + d_prod * (n + one);
        d = numerator / denominator;

        if d.abs_diff(d_prev) <= one {
            break;
        }
    }
    d
}

/// Solve for the output-side balance `y` given a new input-side balance.
///
/// Approximates the root of `y² + b·y = c` with the same convergence rule
/// as [`compute_d`]. Returns `None` if the iteration denominator collapses,
/// which only happens on degenerate pool states.
fn compute_y(state: &StableState, x_c_amount: U256, index_x: usize, index_y: usize) -> Option<U256> {
    if x_c_amount.is_zero() {
        return None;
    }
    let d = state.d;
    let one = U256::from(1u8);

    let mut s = x_c_amount;
    let mut c = d * d / x_c_amount;
    for (idx, c_amount) in state.c_amounts.iter().enumerate() {
        if idx != index_x && idx != index_y {
            s += *c_amount;
            c = c * d / *c_amount;
        }
    }
    c = c * d / (state.ann * state.nn);
    let b = d / state.ann + s; // d itself is subtracted inside the loop

    let mut y = d;
    for _ in 0..MAX_ITERATIONS {
        let y_prev = y;
        let numerator = y * y + c;
        let denominator = (y * U256::from(2u8) + b).checked_sub(d)?;
        y = numerator / denominator;
        if y.abs_diff(y_prev) <= one {
            break;
        }
    }
    Some(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Pool, PoolKind};

    fn simple_pool(balance_in: u128, balance_out: u128, fee: u32) -> Pool {
        Pool {
            index: 0,
            kind: PoolKind::Simple,
            tokens: vec!["usdt.near".to_string(), "usdc.near".to_string()],
            amounts: vec![U256::from(balance_in), U256::from(balance_out)],
            fee,
            shares_total_supply: U256::from(1u8),
            stable: None,
        }
    }

    fn stable_pool(balances: &[u128], decimals: &[u8], amp: u64, fee: u32) -> Pool {
        let tokens: Vec<String> = (0..balances.len()).map(|i| format!("token{i}.near")).collect();
        let amounts: Vec<U256> = balances.iter().map(|b| U256::from(*b)).collect();
        let rates = vec![crate::one_near(); balances.len()];
        Pool::new_stable(
            1,
            PoolKind::Stable,
            tokens,
            amounts,
            fee,
            U256::from(1u8),
            decimals.to_vec(),
            rates,
            amp,
        )
    }

    #[test]
    fn constant_product_quote() {
        // 1,000,000 / 1,000,000 pool, 30 bps fee, 1,000 in -> ~996 out.
        let pool = simple_pool(1_000_000, 1_000_000, 30);
        let out = get_return(&pool, "usdt.near", U256::from(1000u64), "usdc.near").unwrap();
        assert_eq!(out, U256::from(996u64));
    }

    #[test]
    fn constant_product_inverse_never_favors_caller() {
        let pool = simple_pool(1_000_000, 1_000_000, 30);
        for amount in [100u64, 1_000, 10_000, 250_000] {
            let amount_in = U256::from(amount);
            let out = get_return(&pool, "usdt.near", amount_in, "usdc.near").unwrap();
            let back =
                get_inverse_return(&pool, "usdc.near", out, "usdt.near").unwrap();
            assert!(back <= amount_in, "inverse quote exceeded forward input");
        }
    }

    #[test]
    fn constant_product_inverse_rejects_draining() {
        let pool = simple_pool(1_000_000, 1_000_000, 30);
        assert!(get_inverse_return(&pool, "usdc.near", U256::from(1_000_000u64), "usdt.near")
            .is_none());
    }

    #[test]
    fn invalid_tokens_rejected() {
        let pool = simple_pool(1_000_000, 1_000_000, 30);
        assert!(get_return(&pool, "dai.near", U256::from(100u64), "usdc.near").is_none());
        assert!(get_return(&pool, "usdt.near", U256::from(100u64), "usdt.near").is_none());
    }

    #[test]
    fn stable_invariant_balanced_pool() {
        // Equal balances of 1,000,000, amp 100: D converges to the total.
        let pool = stable_pool(&[1_000_000, 1_000_000], &[18, 18], 100, 30);
        let d = pool.stable.as_ref().unwrap().d;
        assert!(d.abs_diff(U256::from(2_000_000u64)) <= U256::from(1u8));
    }

    #[test]
    fn stable_invariant_converges_across_amplifications() {
        for amp in [1u64, 5, 50, 100, 200] {
            let pool = stable_pool(&[2_000_000, 1_000_000, 500_000], &[18, 18, 18], amp, 25);
            let d = pool.stable.as_ref().unwrap().d;
            // D lands between the sum (amp -> inf) and the product bound.
            assert!(d > U256::ZERO);
            assert!(d <= U256::from(3_500_000u64));
        }
    }

    #[test]
    fn stable_small_swap_close_to_parity() {
        let pool = stable_pool(&[1_000_000_000, 1_000_000_000], &[18, 18], 100, 30);
        let amount_in = U256::from(10_000u64);
        let out = get_return(&pool, "token0.near", amount_in, "token1.near").unwrap();
        // Near parity minus the 30 bps fee and iteration rounding.
        let fee_only = amount_in * U256::from(9_970u64) / U256::from(10_000u64);
        assert!(out <= fee_only);
        assert!(out >= fee_only - U256::from(10u64));
    }

    #[test]
    fn stable_output_monotone_in_input() {
        let pool = stable_pool(&[5_000_000, 5_000_000], &[18, 18], 100, 25);
        let mut prev = U256::ZERO;
        for amount in [1_000u64, 5_000, 20_000, 100_000, 500_000] {
            let out =
                get_return(&pool, "token0.near", U256::from(amount), "token1.near").unwrap();
            assert!(out >= prev, "amountOut decreased as amountIn grew");
            prev = out;
        }
    }

    #[test]
    fn stable_inverse_tracks_forward_within_unit_rounding() {
        // The Newton solves truncate at unit granularity, so the inverse
        // quote can sit a unit or two above the forward input, never more.
        let pool = stable_pool(&[3_000_000, 3_000_000], &[18, 18], 100, 30);
        for amount in [2_000u64, 40_000, 900_000] {
            let amount_in = U256::from(amount);
            let out = get_return(&pool, "token0.near", amount_in, "token1.near").unwrap();
            let back = get_inverse_return(&pool, "token1.near", out, "token0.near").unwrap();
            assert!(back <= amount_in + U256::from(2u8));
            assert!(back + U256::from(100u8) >= amount_in, "inverse badly undershot");
        }
    }

    #[test]
    fn stable_mixed_decimals() {
        // 6-decimal vs 18-decimal legs with equivalent value.
        let pool = stable_pool(&[1_000_000_000_000, 1_000_000_000_000_000_000_000_000], &[6, 18], 100, 30);
        let amount_in = U256::from(1_000_000u64); // 1.0 of the 6-decimal token
        let out = get_return(&pool, "token0.near", amount_in, "token1.near").unwrap();
        // Output is in 18-decimal units: close to 1.0 minus fee.
        let expected = U256::from(997_000_000_000_000_000u128);
        let tolerance = U256::from(2_000_000_000_000_000u128);
        assert!(out.abs_diff(expected) <= tolerance, "out = {out}");
    }

    #[test]
    fn comparable_scaling_roundtrip() {
        let raw = U256::from(123_456u64);
        assert_eq!(from_comparable(to_comparable(raw, 6), 6), raw);
        assert_eq!(to_comparable(U256::from(1u8), 24), U256::ZERO);
        assert_eq!(pow10(24), U256::from(10u64).pow(U256::from(24u64)));
    }
}
