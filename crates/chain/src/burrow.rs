//! Lending-contract client.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;

use crate::rpc::RpcClient;
use crate::sources::{AccountSource, AssetSource};
use crate::views::{
    AccountView, AssetView, LpTokenInfoView, MarginAccountView, MarginConfigView,
    ProtocolConfigView,
};

/// Views against the lending contract.
#[derive(Debug, Clone)]
pub struct BurrowClient {
    rpc: RpcClient,
    contract_id: String,
}

impl BurrowClient {
    pub fn new(rpc: RpcClient, contract_id: impl Into<String>) -> Self {
        Self {
            rpc,
            contract_id: contract_id.into(),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    async fn view<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<T> {
        Ok(self.rpc.view_call(&self.contract_id, method, &args).await?)
    }
}

#[async_trait]
impl AccountSource for BurrowClient {
    async fn num_accounts(&self) -> Result<u64> {
        let count: String = self.view("get_num_accounts", json!({})).await?;
        Ok(count.parse()?)
    }

    async fn accounts_paged(&self, from_index: u64, limit: u64) -> Result<Vec<AccountView>> {
        self.view(
            "get_accounts_paged",
            json!({ "from_index": from_index, "limit": limit }),
        )
        .await
    }

    async fn account(&self, account_id: &str) -> Result<Option<AccountView>> {
        self.view("get_account", json!({ "account_id": account_id }))
            .await
    }

    async fn num_margin_accounts(&self) -> Result<u64> {
        let count: String = self.view("get_num_margin_accounts", json!({})).await?;
        Ok(count.parse()?)
    }

    async fn margin_accounts_paged(
        &self,
        from_index: u64,
        limit: u64,
    ) -> Result<Vec<MarginAccountView>> {
        self.view(
            "get_margin_accounts_paged",
            json!({ "from_index": from_index, "limit": limit }),
        )
        .await
    }

    async fn margin_account(&self, account_id: &str) -> Result<Option<MarginAccountView>> {
        self.view("get_margin_account", json!({ "account_id": account_id }))
            .await
    }
}

#[async_trait]
impl AssetSource for BurrowClient {
    async fn assets(&self) -> Result<Vec<(String, AssetView)>> {
        self.view("get_assets_paged", json!({})).await
    }

    async fn protocol_config(&self) -> Result<ProtocolConfigView> {
        self.view("get_config", json!({})).await
    }

    async fn margin_config(&self) -> Result<MarginConfigView> {
        self.view("get_margin_config", json!({})).await
    }

    async fn lp_token_infos(&self) -> Result<HashMap<String, LpTokenInfoView>> {
        self.view("get_last_lp_token_infos", json!({})).await
    }
}
