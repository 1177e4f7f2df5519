//! Oracle clients: pull-oracle batch quotes and push-oracle (Pyth) quotes.
//!
//! The push-oracle path needs three contracts: the lending contract for the
//! per-token wiring, the Pyth contract for the quote itself, and the token
//! contract for an optional derived-price rate (liquid staking tokens quote
//! the underlying; the rate converts to the token's own price).

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

use crate::rpc::RpcClient;
use crate::sources::PriceSource;
use crate::views::{PriceDataView, PythQuoteView, TokenPythInfoView};

/// Combined price source over both oracle modes.
#[derive(Debug, Clone)]
pub struct OracleClient {
    rpc: RpcClient,
    price_oracle_id: String,
    pyth_oracle_id: String,
    burrow_id: String,
}

impl OracleClient {
    pub fn new(
        rpc: RpcClient,
        price_oracle_id: impl Into<String>,
        pyth_oracle_id: impl Into<String>,
        burrow_id: impl Into<String>,
    ) -> Self {
        Self {
            rpc,
            price_oracle_id: price_oracle_id.into(),
            pyth_oracle_id: pyth_oracle_id.into(),
            burrow_id: burrow_id.into(),
        }
    }
}

#[async_trait]
impl PriceSource for OracleClient {
    async fn price_data(&self, asset_ids: &[String]) -> Result<PriceDataView> {
        Ok(self
            .rpc
            .view_call(
                &self.price_oracle_id,
                "get_price_data",
                &json!({ "asset_ids": asset_ids }),
            )
            .await?)
    }

    async fn token_pyth_infos(&self) -> Result<HashMap<String, TokenPythInfoView>> {
        Ok(self
            .rpc
            .view_call(&self.burrow_id, "get_all_token_pyth_infos", &json!({}))
            .await?)
    }

    async fn pyth_price(
        &self,
        price_identifier: &str,
        max_age_secs: u64,
    ) -> Result<Option<PythQuoteView>> {
        Ok(self
            .rpc
            .view_call(
                &self.pyth_oracle_id,
                "get_price_no_older_than",
                &json!({ "price_id": price_identifier, "age": max_age_secs }),
            )
            .await?)
    }

    async fn derived_rate(&self, token_id: &str, method: &str) -> Result<String> {
        Ok(self.rpc.view_call(token_id, method, &json!({})).await?)
    }
}
