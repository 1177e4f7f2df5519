//! Best-path search over the pool graph.
//!
//! Routes are at most two hops: direct pools are tried first, then paths
//! through a shared intermediate token. Forward search maximizes the output
//! amount, inverse search minimizes the required input.

use alloy_primitives::U256;
use std::collections::HashMap;
use tracing::debug;

use crate::math;
use crate::pool::Pool;

/// A priced route through the pool graph.
#[derive(Debug, Clone)]
pub struct SwapInfo {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: U256,
    pub amount_out: U256,
    /// Pool ids along the path, in hop order
    pub pool_ids: Vec<u32>,
    /// Token path including endpoints
    pub path: Vec<String>,
}

impl SwapInfo {
    fn placeholder(token_in: &str, token_out: &str, amount_in: U256) -> Self {
        Self {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in,
            amount_out: U256::ZERO,
            pool_ids: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Whether the search found any pool path at all. Callers must check
    /// this before acting on the quote.
    pub fn is_viable(&self) -> bool {
        !self.pool_ids.is_empty()
    }
}

/// Indexed view over a pool snapshot.
#[derive(Debug, Default)]
pub struct PoolGraph {
    pools: Vec<Pool>,
    by_token: HashMap<String, Vec<usize>>,
    by_pair: HashMap<(String, String), Vec<usize>>,
}

impl PoolGraph {
    /// Build the graph from decoded pools.
    pub fn new(pools: Vec<Pool>) -> Self {
        let mut by_token: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_pair: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (i, pool) in pools.iter().enumerate() {
            for token in &pool.tokens {
                by_token.entry(token.clone()).or_default().push(i);
                for other in pool.other_tokens(token) {
                    by_pair
                        .entry((token.clone(), other.to_string()))
                        .or_default()
                        .push(i);
                }
            }
        }
        debug!(pools = pools.len(), tokens = by_token.len(), "pool graph built");
        Self { pools, by_token, by_pair }
    }

    pub fn pool(&self, index: usize) -> &Pool {
        &self.pools[index]
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Find the path out of `amount_in` of `token_in` that maximizes the
    /// amount of `token_out` received. Returns a non-viable placeholder when
    /// no pool path exists.
    pub fn best_return(&self, token_in: &str, amount_in: U256, token_out: &str) -> SwapInfo {
        let mut best = SwapInfo::placeholder(token_in, token_out, amount_in);

        for &i in self.by_token.get(token_in).map(Vec::as_slice).unwrap_or(&[]) {
            let pool = &self.pools[i];
            if pool.token_index(token_out).is_some() {
                let amount_out = math::get_return(pool, token_in, amount_in, token_out)
                    .unwrap_or(U256::ZERO);
                if amount_out > best.amount_out {
                    best = SwapInfo {
                        token_in: token_in.to_string(),
                        token_out: token_out.to_string(),
                        amount_in,
                        amount_out,
                        pool_ids: vec![pool.index],
                        path: vec![token_in.to_string(), token_out.to_string()],
                    };
                }
                continue;
            }
            for middle in pool.other_tokens(token_in) {
                let pair = (middle.to_string(), token_out.to_string());
                let Some(second_hops) = self.by_pair.get(&pair) else {
                    continue;
                };
                // First-hop quote is shared by every candidate second pool.
                let Some(middle_amount) = math::get_return(pool, token_in, amount_in, middle)
                else {
                    continue;
                };
                if middle_amount.is_zero() {
                    continue;
                }
                for &j in second_hops {
                    let second = &self.pools[j];
                    let amount_out =
                        math::get_return(second, middle, middle_amount, token_out)
                            .unwrap_or(U256::ZERO);
                    if amount_out > best.amount_out {
                        best = SwapInfo {
                            token_in: token_in.to_string(),
                            token_out: token_out.to_string(),
                            amount_in,
                            amount_out,
                            pool_ids: vec![pool.index, second.index],
                            path: vec![
                                token_in.to_string(),
                                middle.to_string(),
                                token_out.to_string(),
                            ],
                        };
                    }
                }
            }
        }
        best
    }

    /// Find the path that delivers exactly `amount_out` of `token_out` for
    /// the least `token_in`, bounded by `available_in`. Returns a non-viable
    /// placeholder when no pool path can satisfy the request.
    pub fn best_inverse_return(
        &self,
        token_in: &str,
        token_out: &str,
        available_in: U256,
        amount_out: U256,
    ) -> SwapInfo {
        let mut best = SwapInfo::placeholder(token_in, token_out, available_in);

        for &i in self.by_token.get(token_out).map(Vec::as_slice).unwrap_or(&[]) {
            let pool = &self.pools[i];
            if pool.token_index(token_in).is_some() {
                let Some(amount_in) =
                    math::get_inverse_return(pool, token_out, amount_out, token_in)
                else {
                    continue;
                };
                if amount_in < best.amount_in {
                    best = SwapInfo {
                        token_in: token_in.to_string(),
                        token_out: token_out.to_string(),
                        amount_in,
                        amount_out,
                        pool_ids: vec![pool.index],
                        path: vec![token_in.to_string(), token_out.to_string()],
                    };
                }
                continue;
            }
            for middle in pool.other_tokens(token_out) {
                let pair = (middle.to_string(), token_in.to_string());
                let Some(first_hops) = self.by_pair.get(&pair) else {
                    continue;
                };
                let Some(middle_amount) =
                    math::get_inverse_return(pool, token_out, amount_out, middle)
                else {
                    continue;
                };
                if middle_amount.is_zero() {
                    continue;
                }
                for &j in first_hops {
                    let first = &self.pools[j];
                    let Some(amount_in) =
                        math::get_inverse_return(first, middle, middle_amount, token_in)
                    else {
                        continue;
                    };
                    if amount_in < best.amount_in {
                        best = SwapInfo {
                            token_in: token_in.to_string(),
                            token_out: token_out.to_string(),
                            amount_in,
                            amount_out,
                            pool_ids: vec![first.index, pool.index],
                            path: vec![
                                token_in.to_string(),
                                middle.to_string(),
                                token_out.to_string(),
                            ],
                        };
                    }
                }
            }
        }
        best
    }
}
