//! JSON-RPC view client.
//!
//! Wraps a single HTTP endpoint and exposes typed `call_function` views
//! against the final block. Arguments are JSON, base64-encoded per the RPC
//! protocol; results are the contract's JSON bytes, deserialized directly
//! into the caller's type.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from the RPC boundary.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error from {method}: {message}")]
    Rpc { method: String, message: String },

    #[error("failed to decode {0} response")]
    Decode(String, #[source] serde_json::Error),
}

/// A thin JSON-RPC client for contract views.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<CallFunctionResult>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CallFunctionResult {
    #[serde(default)]
    result: Vec<u8>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BlockResponse {
    result: Option<BlockResult>,
}

#[derive(Debug, Deserialize)]
struct BlockResult {
    header: BlockHeader,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    height: u64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Execute a view call against the final block and deserialize the
    /// contract's JSON result.
    #[instrument(skip(self, args), fields(contract = %contract_id, method = %method_name))]
    pub async fn view_call<T: DeserializeOwned>(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &serde_json::Value,
    ) -> Result<T, RpcError> {
        let args_base64 = BASE64.encode(serde_json::to_vec(args).unwrap_or_default());
        let body = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": "query",
            "params": {
                "request_type": "call_function",
                "finality": "final",
                "account_id": contract_id,
                "method_name": method_name,
                "args_base64": args_base64,
            },
        });

        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(RpcError::Rpc {
                method: method_name.to_string(),
                message: format_error(error),
            });
        }
        let result = response.result.ok_or_else(|| RpcError::Rpc {
            method: method_name.to_string(),
            message: "empty response".to_string(),
        })?;
        if let Some(message) = result.error {
            return Err(RpcError::Rpc {
                method: method_name.to_string(),
                message,
            });
        }

        debug!(bytes = result.result.len(), "view call returned");
        serde_json::from_slice(&result.result)
            .map_err(|e| RpcError::Decode(method_name.to_string(), e))
    }

    /// Height of the final block; used as a connectivity check at startup.
    pub async fn block_height(&self) -> Result<u64, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": "block",
            "params": { "finality": "final" },
        });
        let response: BlockResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        response
            .result
            .map(|r| r.header.height)
            .ok_or_else(|| RpcError::Rpc {
                method: "block".to_string(),
                message: "empty response".to_string(),
            })
    }
}

fn format_error(error: RpcErrorBody) -> String {
    match error.data {
        Some(data) => format!("{} ({data})", error.message),
        None => error.message,
    }
}
