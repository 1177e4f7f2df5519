//! Error taxonomy for the liquidation core.

use thiserror::Error;

/// Errors produced by evaluation, sizing, and submission.
#[derive(Debug, Error)]
pub enum LiquidationError {
    /// A position references a token with no registered asset or price.
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    /// A price feed is older than the configured bound.
    #[error("stale price for {token_id}: {age_secs}s old, max {max_age_secs}s")]
    StalePrice {
        token_id: String,
        age_secs: i64,
        max_age_secs: i64,
    },

    /// No pool path can satisfy a requested swap.
    #[error("no viable route for {amount} {token_in} -> {token_out}")]
    InsufficientLiquidity {
        token_in: String,
        token_out: String,
        amount: String,
    },

    /// A recomputation from the literal emitted amounts failed a safety bound.
    #[error("profit guard rejected plan: {0}")]
    ProfitGuard(String),

    /// On-chain execution reported a failure.
    #[error("transaction submission failed: {0}")]
    Submission(String),

    /// A contract view returned data the decoder cannot interpret.
    #[error("malformed view data: {0}")]
    MalformedView(String),
}

pub type Result<T, E = LiquidationError> = std::result::Result<T, E>;
