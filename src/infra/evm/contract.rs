//! Typed binding for the on-ledger `ProductVerification` program.
//!
//! Reads go through `eth_call` against the latest block; writes are submitted with
//! `eth_sendTransaction` from the session account and then polled until the receipt
//! has the configured number of confirmations.

use crate::crypto::hashing::{function_selector, ProductHash};
use crate::domain::account::Address;
use crate::domain::product::{ProductAttributes, ProductRecord, ScanLogEntry, UserType};
use crate::infra::evm::abi::{self, AbiError, ParamType, Token};
use crate::infra::evm::provider::{TransactionRequest, WalletProvider};
use crate::infra::evm::rpc::{parse_hex_data, parse_quantity, to_hex_data, to_quantity, ProviderError};
use primitive_types::U256;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Solidity signatures of the contract surface.
pub mod signatures {
    pub const REGISTER_PRODUCT: &str = "registerProduct(string,string,string,string,string,bytes32)";
    pub const GET_PRODUCT: &str = "getProduct(bytes32)";
    pub const VERIFY_PRODUCT: &str = "verifyProduct(bytes32)";
    pub const LOG_SCAN: &str = "logScan(bytes32,string,string)";
    pub const GET_SCAN_LOGS_COUNT: &str = "getScanLogsCount(bytes32)";
    pub const GET_SCAN_LOG: &str = "getScanLog(bytes32,uint256)";
}

pub const GET_PRODUCT_OUTPUT: [ParamType; 8] = [
    ParamType::String,
    ParamType::String,
    ParamType::String,
    ParamType::String,
    ParamType::String,
    ParamType::Address,
    ParamType::Uint,
    ParamType::Bool,
];

pub const GET_SCAN_LOG_OUTPUT: [ParamType; 4] = [
    ParamType::Address,
    ParamType::String,
    ParamType::String,
    ParamType::Uint,
];

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("{}", describe_provider_error(.0))]
    Provider(#[from] ProviderError),
    #[error("could not decode {function} result: {source}")]
    Decode {
        function: &'static str,
        source: AbiError,
    },
    #[error("transaction {tx_hash} reverted{}", .reason.as_ref().map(|r| format!(": {}", r)).unwrap_or_default())]
    Reverted {
        tx_hash: String,
        reason: Option<String>,
    },
    #[error("unexpected ledger response: {0}")]
    Malformed(String),
}

impl ContractError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ContractError::Provider(e) if e.is_user_rejection())
    }
}

fn describe_provider_error(e: &ProviderError) -> String {
    match e.revert_data().as_deref().and_then(abi::decode_revert_reason) {
        Some(reason) => format!("execution reverted: {}", reason),
        None => e.message.clone(),
    }
}

#[derive(Debug, Clone)]
pub struct ContractSettings {
    pub address: Address,
    /// Explicit gas ceiling for registrations, so the wallet never has to estimate.
    pub register_gas_limit: u64,
    pub receipt_poll_interval: Duration,
    pub confirmations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub gas_used: Option<u64>,
}

/// Pulls typed fields out of a decoded tuple in order.
struct Fields {
    function: &'static str,
    tokens: std::vec::IntoIter<Token>,
}

impl Fields {
    fn decode(function: &'static str, types: &[ParamType], data: &[u8]) -> Result<Self, ContractError> {
        let tokens = abi::decode(types, data).map_err(|source| ContractError::Decode { function, source })?;
        Ok(Self {
            function,
            tokens: tokens.into_iter(),
        })
    }

    fn missing(&self, what: &str) -> ContractError {
        ContractError::Malformed(format!("{} result is missing a {} field", self.function, what))
    }

    fn string(&mut self) -> Result<String, ContractError> {
        self.tokens.next().and_then(Token::into_string).ok_or_else(|| self.missing("string"))
    }

    fn address(&mut self) -> Result<Address, ContractError> {
        self.tokens
            .next()
            .and_then(Token::into_address)
            .map(Address)
            .ok_or_else(|| self.missing("address"))
    }

    fn uint(&mut self) -> Result<U256, ContractError> {
        self.tokens.next().and_then(Token::into_uint).ok_or_else(|| self.missing("uint"))
    }

    fn u64(&mut self) -> Result<u64, ContractError> {
        let value = self.uint()?;
        if value > U256::from(u64::MAX) {
            return Err(ContractError::Malformed(format!(
                "{} returned an integer out of range: {}",
                self.function, value
            )));
        }
        Ok(value.low_u64())
    }

    fn bool(&mut self) -> Result<bool, ContractError> {
        self.tokens.next().and_then(Token::into_bool).ok_or_else(|| self.missing("bool"))
    }
}

pub struct ProductRegistry {
    wallet: Arc<dyn WalletProvider>,
    settings: ContractSettings,
}

impl ProductRegistry {
    pub fn new(wallet: Arc<dyn WalletProvider>, settings: ContractSettings) -> Self {
        Self { wallet, settings }
    }

    pub fn address(&self) -> Address {
        self.settings.address
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, ContractError> {
        let params = json!([
            { "to": self.settings.address, "data": to_hex_data(&data) },
            "latest"
        ]);
        let value = self.wallet.request("eth_call", params).await?;
        let text = value
            .as_str()
            .ok_or_else(|| ContractError::Malformed(format!("eth_call returned {}", value)))?;
        Ok(parse_hex_data(text)?)
    }

    pub async fn verify_product(&self, hash: &ProductHash) -> Result<bool, ContractError> {
        let data = abi::encode_call(
            function_selector(signatures::VERIFY_PRODUCT),
            &[Token::FixedBytes32(hash.as_h256())],
        );
        let output = self.call(data).await?;
        Fields::decode("verifyProduct", &[ParamType::Bool], &output)?.bool()
    }

    pub async fn get_product(&self, hash: &ProductHash) -> Result<ProductRecord, ContractError> {
        let data = abi::encode_call(
            function_selector(signatures::GET_PRODUCT),
            &[Token::FixedBytes32(hash.as_h256())],
        );
        let output = self.call(data).await?;
        let mut f = Fields::decode("getProduct", &GET_PRODUCT_OUTPUT, &output)?;
        Ok(ProductRecord {
            name: f.string()?,
            manufacturing_date: f.string()?,
            batch_number: f.string()?,
            location: f.string()?,
            additional_details: f.string()?,
            manufacturer: f.address()?,
            timestamp: f.u64()?,
            registered: f.bool()?,
        })
    }

    pub async fn get_scan_logs_count(&self, hash: &ProductHash) -> Result<u64, ContractError> {
        let data = abi::encode_call(
            function_selector(signatures::GET_SCAN_LOGS_COUNT),
            &[Token::FixedBytes32(hash.as_h256())],
        );
        let output = self.call(data).await?;
        Fields::decode("getScanLogsCount", &[ParamType::Uint], &output)?.u64()
    }

    pub async fn get_scan_log(&self, hash: &ProductHash, index: u64) -> Result<ScanLogEntry, ContractError> {
        let data = abi::encode_call(
            function_selector(signatures::GET_SCAN_LOG),
            &[Token::FixedBytes32(hash.as_h256()), Token::Uint(U256::from(index))],
        );
        let output = self.call(data).await?;
        let mut f = Fields::decode("getScanLog", &GET_SCAN_LOG_OUTPUT, &output)?;
        let scanner = f.address()?;
        let location = f.string()?;
        let user_type: UserType = f
            .string()?
            .parse()
            .map_err(|e| ContractError::Malformed(format!("scan log {}: {}", index, e)))?;
        Ok(ScanLogEntry {
            scanner,
            location,
            user_type,
            timestamp: f.u64()?,
        })
    }

    pub async fn register_product(
        &self,
        from: Address,
        attrs: &ProductAttributes,
        hash: &ProductHash,
    ) -> Result<TransactionReceipt, ContractError> {
        let data = abi::encode_call(
            function_selector(signatures::REGISTER_PRODUCT),
            &[
                Token::String(attrs.name.clone()),
                Token::String(attrs.manufacturing_date.clone()),
                Token::String(attrs.batch_number.clone()),
                Token::String(attrs.location.clone()),
                Token::String(attrs.details_or_empty().to_string()),
                Token::FixedBytes32(hash.as_h256()),
            ],
        );
        self.transact(from, data, Some(self.settings.register_gas_limit)).await
    }

    pub async fn log_scan(
        &self,
        from: Address,
        hash: &ProductHash,
        location: &str,
        user_type: UserType,
    ) -> Result<TransactionReceipt, ContractError> {
        let data = abi::encode_call(
            function_selector(signatures::LOG_SCAN),
            &[
                Token::FixedBytes32(hash.as_h256()),
                Token::String(location.to_string()),
                Token::String(user_type.as_str().to_string()),
            ],
        );
        self.transact(from, data, None).await
    }

    /// Deployed bytecode at the registry address (empty when nothing is deployed).
    pub async fn code(&self) -> Result<Vec<u8>, ContractError> {
        let value = self
            .wallet
            .request("eth_getCode", json!([self.settings.address, "latest"]))
            .await?;
        let text = value
            .as_str()
            .ok_or_else(|| ContractError::Malformed(format!("eth_getCode returned {}", value)))?;
        Ok(parse_hex_data(text)?)
    }

    async fn transact(
        &self,
        from: Address,
        data: Vec<u8>,
        gas: Option<u64>,
    ) -> Result<TransactionReceipt, ContractError> {
        let tx = TransactionRequest {
            from,
            to: self.settings.address,
            data: to_hex_data(&data),
            gas: gas.map(to_quantity),
        };
        let value = self.wallet.request("eth_sendTransaction", json!([tx])).await?;
        let tx_hash = value
            .as_str()
            .ok_or_else(|| ContractError::Malformed(format!("eth_sendTransaction returned {}", value)))?
            .to_string();
        info!(tx_hash = %tx_hash, "transaction submitted");

        self.wait_for_finalization(&tx_hash).await
    }

    async fn wait_for_finalization(&self, tx_hash: &str) -> Result<TransactionReceipt, ContractError> {
        let receipt = loop {
            let value = self
                .wallet
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if !value.is_null() {
                break value;
            }
            debug!(tx_hash, "receipt not yet available");
            tokio::time::sleep(self.settings.receipt_poll_interval).await;
        };

        let block_number = quantity_field(&receipt, "blockNumber")?;
        let status = quantity_field(&receipt, "status")?;
        if status == 0 {
            return Err(ContractError::Reverted {
                tx_hash: tx_hash.to_string(),
                reason: None,
            });
        }

        while self.settings.confirmations > 1 {
            let head = self.wallet.request("eth_blockNumber", json!([])).await?;
            let head = head
                .as_str()
                .ok_or_else(|| ContractError::Malformed(format!("eth_blockNumber returned {}", head)))
                .and_then(|s| parse_quantity(s).map_err(ContractError::from))?;
            if head.saturating_sub(block_number) + 1 >= self.settings.confirmations {
                break;
            }
            tokio::time::sleep(self.settings.receipt_poll_interval).await;
        }

        info!(tx_hash, block_number, "transaction finalized");
        Ok(TransactionReceipt {
            transaction_hash: tx_hash.to_string(),
            block_number,
            gas_used: quantity_field(&receipt, "gasUsed").ok(),
        })
    }
}

fn quantity_field(receipt: &JsonValue, field: &str) -> Result<u64, ContractError> {
    let text = receipt
        .get(field)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ContractError::Malformed(format!("receipt is missing {}", field)))?;
    Ok(parse_quantity(text)?)
}
