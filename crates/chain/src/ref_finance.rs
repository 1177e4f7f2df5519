//! Exchange-contract client: pool listing, rated tokens, LP decomposition,
//! and token metadata for the decimals cache.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

use crate::rpc::RpcClient;
use crate::sources::PoolSource;
use crate::views::{FtMetadataView, RatedTokenView};
use burrow_dex::{PoolView, TokenMetadataSource};

/// Views against the exchange contract and token contracts.
#[derive(Debug, Clone)]
pub struct RefExchangeClient {
    rpc: RpcClient,
    contract_id: String,
}

impl RefExchangeClient {
    pub fn new(rpc: RpcClient, contract_id: impl Into<String>) -> Self {
        Self {
            rpc,
            contract_id: contract_id.into(),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }
}

#[async_trait]
impl PoolSource for RefExchangeClient {
    async fn number_of_pools(&self) -> Result<u64> {
        Ok(self
            .rpc
            .view_call(&self.contract_id, "get_number_of_pools", &json!({}))
            .await?)
    }

    async fn pools(&self, from_index: u64, limit: u64) -> Result<Vec<PoolView>> {
        Ok(self
            .rpc
            .view_call(
                &self.contract_id,
                "get_pools",
                &json!({ "from_index": from_index, "limit": limit }),
            )
            .await?)
    }

    async fn rated_tokens(&self) -> Result<HashMap<String, RatedTokenView>> {
        Ok(self
            .rpc
            .view_call(&self.contract_id, "list_rated_tokens", &json!({}))
            .await?)
    }

    async fn unit_share_token_amounts(&self, pool_id: u64) -> Result<Vec<String>> {
        Ok(self
            .rpc
            .view_call(
                &self.contract_id,
                "get_unit_share_token_amounts",
                &json!({ "pool_id": pool_id }),
            )
            .await?)
    }
}

#[async_trait]
impl TokenMetadataSource for RefExchangeClient {
    async fn fetch_decimals(&self, token_id: &str) -> Result<u8> {
        let metadata: FtMetadataView = self
            .rpc
            .view_call(token_id, "ft_metadata", &json!({}))
            .await?;
        Ok(metadata.decimals)
    }
}
