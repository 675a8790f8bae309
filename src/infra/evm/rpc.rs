//! JSON-RPC 2.0 envelopes and the wallet/provider error model.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Provider error codes (EIP-1193 wallet codes and JSON-RPC 2.0 codes).
pub mod codes {
    /// The user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// The requested account or method has not been authorized.
    pub const UNAUTHORIZED: i64 = 4100;
    /// The provider is not connected to any chain.
    pub const DISCONNECTED: i64 = 4900;
    /// `wallet_switchEthereumChain` for a chain the wallet does not know.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;

    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Generic node-side failure (reverts, insufficient funds, ...).
    pub const SERVER_ERROR: i64 = -32000;
    pub const METHOD_NOT_FOUND: i64 = -32601;
}

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: JsonValue,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(method: &'a str, params: JsonValue, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<JsonValue>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

/// An error reported by the wallet or the node behind it.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} (code {code})")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
    pub data: Option<JsonValue>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(codes::USER_REJECTED, message)
    }

    pub fn unrecognized_chain(chain_id: u64) -> Self {
        Self::new(
            codes::UNRECOGNIZED_CHAIN,
            format!(
                "Unrecognized chain ID \"{}\". Try adding the chain using wallet_addEthereumChain first.",
                to_quantity(chain_id)
            ),
        )
    }

    pub fn disconnected() -> Self {
        Self::new(codes::DISCONNECTED, "The provider is disconnected from all chains.")
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == codes::USER_REJECTED
    }

    /// Revert payload attached by the node, if any (`0x`-prefixed hex in `data`).
    pub fn revert_data(&self) -> Option<Vec<u8>> {
        let text = match self.data.as_ref()? {
            JsonValue::String(s) => s.as_str(),
            JsonValue::Object(map) => map.get("data")?.as_str()?,
            _ => return None,
        };
        hex::decode(text.strip_prefix("0x")?).ok()
    }
}

impl From<JsonRpcErrorObject> for ProviderError {
    fn from(e: JsonRpcErrorObject) -> Self {
        Self {
            code: e.code,
            message: e.message,
            data: e.data,
        }
    }
}

/// Hex quantity encoding (`0x7a69`), no leading zeros.
pub fn to_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Parses a hex quantity as used for chain ids, block numbers and statuses.
pub fn parse_quantity(text: &str) -> Result<u64, ProviderError> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| ProviderError::invalid_params(format!("expected hex quantity, got '{}'", text)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|_| ProviderError::invalid_params(format!("expected hex quantity, got '{}'", text)))
}

pub fn to_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn parse_hex_data(text: &str) -> Result<Vec<u8>, ProviderError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|_| ProviderError::invalid_params(format!("invalid hex data '{}'", text)))
}
