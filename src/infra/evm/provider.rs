// Responsible for all communication with the wallet and the ledger node behind it.

use crate::domain::account::Address;
use crate::infra::evm::rpc::{
    codes, parse_quantity, to_quantity, JsonRpcRequest, JsonRpcResponse, ProviderError,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// An EIP-1193 style request channel to a wallet.
///
/// The session manager and the contract binding only ever talk to the ledger
/// through this trait, so a browser bridge, a node-managed account or a test
/// double can sit behind it.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, method: &str, params: JsonValue) -> Result<JsonValue, ProviderError>;

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": to_quantity(chain_id) }]),
        )
        .await
        .map(|_| ())
    }

    async fn add_chain(&self, network: &NetworkParams) -> Result<(), ProviderError> {
        self.request("wallet_addEthereumChain", json!([network]))
            .await
            .map(|_| ())
    }

    /// Prompts for account authorization.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let value = self.request("eth_requestAccounts", json!([])).await?;
        parse_accounts(&value)
    }

    /// Already-authorized accounts. Never prompts.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let value = self.request("eth_accounts", json!([])).await?;
        parse_accounts(&value)
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let value = self.request("eth_chainId", json!([])).await?;
        value
            .as_str()
            .ok_or_else(|| ProviderError::internal("eth_chainId returned a non-string"))
            .and_then(parse_quantity)
    }
}

pub fn parse_accounts(value: &JsonValue) -> Result<Vec<Address>, ProviderError> {
    value
        .as_array()
        .ok_or_else(|| ProviderError::internal("expected a list of accounts"))?
        .iter()
        .map(|v| {
            v.as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ProviderError::internal(format!("invalid account {}", v)))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for NativeCurrency {
    fn default() -> Self {
        Self {
            name: "Ethereum".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

/// Connection parameters of a ledger network, in `wallet_addEthereumChain` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParams {
    #[serde(with = "quantity")]
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub native_currency: NativeCurrency,
}

impl NetworkParams {
    pub fn new(chain_id: u64, chain_name: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            chain_id,
            chain_name: chain_name.into(),
            rpc_urls: vec![rpc_url.into()],
            native_currency: NativeCurrency::default(),
        }
    }

    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }
}

mod quantity {
    use crate::infra::evm::rpc::{parse_quantity, to_quantity};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_quantity(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_quantity(&s).map_err(|e| serde::de::Error::custom(e.message))
    }
}

/// The transaction object passed to `eth_sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
}

/// Stands in for the wallet's confirmation dialogs.
#[async_trait]
pub trait SigningApprover: Send + Sync {
    async fn approve_network(&self, _network: &NetworkParams) -> bool {
        true
    }

    async fn approve_connection(&self, chain_id: u64) -> bool;

    async fn approve_transaction(&self, tx: &TransactionRequest) -> bool;
}

/// Approves everything. For unattended services and tests.
pub struct AutoApprove;

#[async_trait]
impl SigningApprover for AutoApprove {
    async fn approve_connection(&self, _chain_id: u64) -> bool {
        true
    }

    async fn approve_transaction(&self, _tx: &TransactionRequest) -> bool {
        true
    }
}

/// A wallet whose accounts are managed (and signed for) by the ledger node itself.
///
/// It starts out knowing no networks, mirrors a browser wallet's chain registry and
/// account authorization, and forwards everything else to the selected network's
/// RPC endpoint.
pub struct HttpWalletProvider {
    client: Client,
    request_id: AtomicU64,
    networks: RwLock<HashMap<u64, NetworkParams>>,
    selected: RwLock<Option<u64>>,
    authorized: RwLock<Vec<Address>>,
    approver: Arc<dyn SigningApprover>,
}

impl HttpWalletProvider {
    pub fn new(timeout: Duration, approver: Arc<dyn SigningApprover>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_id: AtomicU64::new(1),
            networks: RwLock::new(HashMap::new()),
            selected: RwLock::new(None),
            authorized: RwLock::new(Vec::new()),
            approver,
        })
    }

    /// Pre-registers a network, as if the user had added it earlier.
    pub async fn remember_network(&self, network: NetworkParams) {
        self.networks.write().await.insert(network.chain_id, network);
    }

    /// Revokes account authorization, as a user disconnecting the site would.
    pub async fn disconnect(&self) {
        self.authorized.write().await.clear();
        info!("wallet authorization revoked");
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn selected_rpc_url(&self) -> Result<String, ProviderError> {
        let selected = (*self.selected.read().await).ok_or_else(ProviderError::disconnected)?;
        let networks = self.networks.read().await;
        networks
            .get(&selected)
            .and_then(NetworkParams::rpc_url)
            .map(str::to_string)
            .ok_or_else(ProviderError::disconnected)
    }

    async fn forward(&self, url: &str, method: &str, params: JsonValue) -> Result<JsonValue, ProviderError> {
        let request = JsonRpcRequest::new(method, params, self.next_id());
        debug!(method, url, id = request.id, "rpc request");

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::internal(format!("Cannot connect to {}", url))
                } else {
                    ProviderError::internal(format!("HTTP request failed: {}", e))
                }
            })?;

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::internal(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(error.into());
        }
        Ok(rpc_response.result.unwrap_or(JsonValue::Null))
    }

    async fn endpoint_chain_id(&self, url: &str) -> Result<u64, ProviderError> {
        let value = self.forward(url, "eth_chainId", json!([])).await?;
        value
            .as_str()
            .ok_or_else(|| ProviderError::internal("eth_chainId returned a non-string"))
            .and_then(parse_quantity)
    }

    async fn handle_switch(&self, params: JsonValue) -> Result<JsonValue, ProviderError> {
        let chain_id = params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(JsonValue::as_str)
            .ok_or_else(|| ProviderError::invalid_params("missing chainId"))
            .and_then(parse_quantity)?;

        let url = {
            let networks = self.networks.read().await;
            let network = networks
                .get(&chain_id)
                .ok_or_else(|| ProviderError::unrecognized_chain(chain_id))?;
            network
                .rpc_url()
                .map(str::to_string)
                .ok_or_else(|| ProviderError::internal("network has no RPC URL"))?
        };

        let reported = self.endpoint_chain_id(&url).await?;
        if reported != chain_id {
            return Err(ProviderError::internal(format!(
                "RPC endpoint {} reports chain {}, expected {}",
                url, reported, chain_id
            )));
        }

        *self.selected.write().await = Some(chain_id);
        info!(chain_id, url = %url, "wallet switched network");
        Ok(JsonValue::Null)
    }

    async fn handle_add(&self, params: JsonValue) -> Result<JsonValue, ProviderError> {
        let network: NetworkParams = params
            .get(0)
            .cloned()
            .ok_or_else(|| ProviderError::invalid_params("missing network parameters"))
            .and_then(|v| {
                serde_json::from_value(v)
                    .map_err(|e| ProviderError::invalid_params(format!("invalid network parameters: {}", e)))
            })?;

        let url = network
            .rpc_url()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::invalid_params("rpcUrls must not be empty"))?;

        if !self.approver.approve_network(&network).await {
            return Err(ProviderError::user_rejected("User rejected the request."));
        }

        let reported = self.endpoint_chain_id(&url).await?;
        if reported != network.chain_id {
            return Err(ProviderError::invalid_params(format!(
                "Chain ID returned by RPC URL {} ({}) does not match {}",
                url, reported, network.chain_id
            )));
        }

        info!(chain_id = network.chain_id, name = %network.chain_name, "wallet added network");
        self.networks.write().await.insert(network.chain_id, network);
        Ok(JsonValue::Null)
    }

    async fn handle_request_accounts(&self) -> Result<JsonValue, ProviderError> {
        let url = self.selected_rpc_url().await?;
        let chain_id = (*self.selected.read().await).unwrap_or_default();

        if !self.approver.approve_connection(chain_id).await {
            return Err(ProviderError::user_rejected("User rejected the request."));
        }

        let node_accounts = parse_accounts(&self.forward(&url, "eth_accounts", json!([])).await?)?;
        if node_accounts.is_empty() {
            return Err(ProviderError::new(
                codes::UNAUTHORIZED,
                "The ledger node exposes no accounts to sign with.",
            ));
        }

        *self.authorized.write().await = node_accounts.clone();
        Ok(json!(node_accounts))
    }

    async fn handle_send_transaction(&self, params: JsonValue) -> Result<JsonValue, ProviderError> {
        let tx: TransactionRequest = params
            .get(0)
            .cloned()
            .ok_or_else(|| ProviderError::invalid_params("missing transaction object"))
            .and_then(|v| {
                serde_json::from_value(v)
                    .map_err(|e| ProviderError::invalid_params(format!("invalid transaction: {}", e)))
            })?;

        if !self.authorized.read().await.contains(&tx.from) {
            return Err(ProviderError::new(
                codes::UNAUTHORIZED,
                "The requested account has not been authorized by the user.",
            ));
        }

        if !self.approver.approve_transaction(&tx).await {
            return Err(ProviderError::user_rejected("User denied transaction signature."));
        }

        let url = self.selected_rpc_url().await?;
        self.forward(&url, "eth_sendTransaction", json!([tx])).await
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: JsonValue) -> Result<JsonValue, ProviderError> {
        match method {
            "wallet_switchEthereumChain" => self.handle_switch(params).await,
            "wallet_addEthereumChain" => self.handle_add(params).await,
            "eth_requestAccounts" => self.handle_request_accounts().await,
            "eth_accounts" => Ok(json!(self.authorized.read().await.clone())),
            "eth_sendTransaction" => self.handle_send_transaction(params).await,
            _ => {
                let url = self.selected_rpc_url().await?;
                self.forward(&url, method, params).await
            }
        }
    }
}
