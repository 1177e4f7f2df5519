//! Abstract collaborator interfaces consumed by the core.
//!
//! Each trait maps to one remote collaborator; the core never holds a
//! concrete client. Tests substitute in-memory fixtures behind the same
//! seams.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::views::{
    AccountView, AssetView, LpTokenInfoView, MarginAccountView, MarginConfigView,
    PriceDataView, ProtocolConfigView, PythQuoteView, RatedTokenView, TokenPythInfoView,
};
use burrow_dex::PoolView;

/// Paged account listing and single-account lookup.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn num_accounts(&self) -> Result<u64>;
    async fn accounts_paged(&self, from_index: u64, limit: u64) -> Result<Vec<AccountView>>;
    async fn account(&self, account_id: &str) -> Result<Option<AccountView>>;

    async fn num_margin_accounts(&self) -> Result<u64>;
    async fn margin_accounts_paged(
        &self,
        from_index: u64,
        limit: u64,
    ) -> Result<Vec<MarginAccountView>>;
    async fn margin_account(&self, account_id: &str) -> Result<Option<MarginAccountView>>;
}

/// Asset listing and protocol configuration.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn assets(&self) -> Result<Vec<(String, AssetView)>>;
    async fn protocol_config(&self) -> Result<ProtocolConfigView>;
    async fn margin_config(&self) -> Result<MarginConfigView>;
    async fn lp_token_infos(&self) -> Result<HashMap<String, LpTokenInfoView>>;
}

/// Price quotes from either oracle mode.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Pull-oracle batch quote.
    async fn price_data(&self, asset_ids: &[String]) -> Result<PriceDataView>;

    /// Push-oracle wiring per token.
    async fn token_pyth_infos(&self) -> Result<HashMap<String, TokenPythInfoView>>;

    /// Push-oracle quote no older than `max_age_secs`; `None` when the feed
    /// cannot satisfy the bound.
    async fn pyth_price(
        &self,
        price_identifier: &str,
        max_age_secs: u64,
    ) -> Result<Option<PythQuoteView>>;

    /// Derived-price extra call on a token contract (e.g. an LST rate).
    async fn derived_rate(&self, token_id: &str, method: &str) -> Result<String>;
}

/// Pool listing for the route graph.
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn number_of_pools(&self) -> Result<u64>;
    async fn pools(&self, from_index: u64, limit: u64) -> Result<Vec<PoolView>>;
    async fn rated_tokens(&self) -> Result<HashMap<String, RatedTokenView>>;

    /// Per-unit-share constituent amounts of an LP token's pool.
    async fn unit_share_token_amounts(&self, pool_id: u64) -> Result<Vec<String>>;
}

/// Outcome of a submitted transaction, opaque beyond success and hash.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub success: bool,
    /// Failure statuses collected from receipts, empty on success
    pub failure_messages: Vec<String>,
    pub transaction_hash: Option<String>,
}

impl TxOutcome {
    pub fn success(hash: impl Into<String>) -> Self {
        Self {
            success: true,
            failure_messages: Vec::new(),
            transaction_hash: Some(hash.into()),
        }
    }
}

/// Transaction submission seam.
///
/// The signed-transaction wire format is out of scope here; implementations
/// either delegate to an external signer or, for dry runs, log the payload.
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    async fn submit(
        &self,
        receiver_id: &str,
        method: &str,
        args: serde_json::Value,
        gas: u64,
        deposit: u128,
    ) -> Result<TxOutcome>;
}
