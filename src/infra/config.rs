//! Centralized configuration (environment variables + defaults).
//!
//! Defaults target a local development node with the registry at its first
//! deployment address.

use crate::domain::account::Address;
use crate::infra::evm::{ContractSettings, NetworkParams};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_CHAIN_ID: u64 = 31337;
pub const DEFAULT_NETWORK_NAME: &str = "Hardhat Local";
pub const DEFAULT_REGISTRY_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const DEFAULT_REGISTER_GAS_LIMIT: u64 = 500_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Where transactions get signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletMode {
    /// Accounts unlocked on the ledger node sign on our behalf.
    NodeManaged,
    /// No signing capability is installed.
    None,
}

impl FromStr for WalletMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" => Ok(WalletMode::NodeManaged),
            "none" | "off" => Ok(WalletMode::None),
            other => Err(format!("expected 'node' or 'none', got '{}'", other)),
        }
    }
}

fn var_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value,
            reason: e.to_string(),
        }),
        _ => Ok(default),
    }
}

/// Ledger RPC URL the wallet registers for the expected network.
pub fn ledger_rpc_url() -> String {
    std::env::var("LEDGER_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string())
}

pub fn ledger_chain_id() -> Result<u64, ConfigError> {
    var_or("LEDGER_CHAIN_ID", DEFAULT_CHAIN_ID)
}

pub fn ledger_network_name() -> String {
    std::env::var("LEDGER_NETWORK_NAME").unwrap_or_else(|_| DEFAULT_NETWORK_NAME.to_string())
}

/// Address of the deployed product registry.
///
/// Set this to the address printed by your deployment script.
pub fn product_registry_address() -> Result<Address, ConfigError> {
    let default = Address::from_str(DEFAULT_REGISTRY_ADDRESS).unwrap_or_default();
    var_or("PRODUCT_REGISTRY_ADDRESS", default)
}

pub fn register_gas_limit() -> Result<u64, ConfigError> {
    var_or("REGISTER_GAS_LIMIT", DEFAULT_REGISTER_GAS_LIMIT)
}

pub fn receipt_poll_interval() -> Result<Duration, ConfigError> {
    var_or("RECEIPT_POLL_INTERVAL_MS", 500u64).map(Duration::from_millis)
}

/// Confirmations a transaction needs before it counts as final (at least 1).
pub fn confirmations() -> Result<u64, ConfigError> {
    var_or("LEDGER_CONFIRMATIONS", 1u64).map(|v| v.max(1))
}

pub fn rpc_timeout() -> Result<Duration, ConfigError> {
    var_or("RPC_TIMEOUT_SECS", 30u64).map(Duration::from_secs)
}

pub fn wallet_mode() -> Result<WalletMode, ConfigError> {
    var_or("LEDGER_WALLET", WalletMode::NodeManaged)
}

pub fn api_bind_addr() -> String {
    std::env::var("API_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

/// Everything the ledger client needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub network: NetworkParams,
    pub contract: ContractSettings,
    pub rpc_timeout: Duration,
    pub wallet_mode: WalletMode,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            network: NetworkParams::new(ledger_chain_id()?, ledger_network_name(), ledger_rpc_url()),
            contract: ContractSettings {
                address: product_registry_address()?,
                register_gas_limit: register_gas_limit()?,
                receipt_poll_interval: receipt_poll_interval()?,
                confirmations: confirmations()?,
            },
            rpc_timeout: rpc_timeout()?,
            wallet_mode: wallet_mode()?,
        })
    }

    /// Local development defaults, independent of the environment.
    pub fn local_dev() -> Self {
        Self {
            network: NetworkParams::new(DEFAULT_CHAIN_ID, DEFAULT_NETWORK_NAME, DEFAULT_RPC_URL),
            contract: ContractSettings {
                address: Address::from_str(DEFAULT_REGISTRY_ADDRESS).unwrap_or_default(),
                register_gas_limit: DEFAULT_REGISTER_GAS_LIMIT,
                receipt_poll_interval: Duration::from_millis(500),
                confirmations: 1,
            },
            rpc_timeout: Duration::from_secs(30),
            wallet_mode: WalletMode::NodeManaged,
        }
    }
}
