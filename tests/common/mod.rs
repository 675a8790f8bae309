//! In-memory ledger node + wallet used by the integration tests.
//!
//! `MockWallet` answers the same EIP-1193 requests a browser wallet would and runs
//! the product registry contract against in-memory state, decoding calldata with
//! the crate's own ABI codec. Every request is counted, and a handful of faults can
//! be switched on to drive the error paths.

#![allow(dead_code)]

use async_trait::async_trait;
use primitive_types::{H256, U256};
use product_ledger_client::crypto::hashing::{function_selector, keccak256};
use product_ledger_client::evm::abi::{self, ParamType, Token};
use product_ledger_client::evm::contract::signatures;
use product_ledger_client::evm::rpc::{codes, parse_hex_data, parse_quantity, to_hex_data, to_quantity};
use product_ledger_client::evm::{ContractSettings, NetworkParams, ProviderError, WalletProvider};
use product_ledger_client::{Address, LedgerClient, Notice, Notifier, SessionManager};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CHAIN_ID: u64 = 31337;
pub const REGISTRY: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const ACCOUNT_0: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const ACCOUNT_1: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const GENESIS_TIME: u64 = 1_704_067_200;

pub fn network() -> NetworkParams {
    NetworkParams::new(CHAIN_ID, "Hardhat Local", "http://127.0.0.1:8545")
}

pub fn settings() -> ContractSettings {
    ContractSettings {
        address: Address::from_str(REGISTRY).unwrap(),
        register_gas_limit: 500_000,
        receipt_poll_interval: Duration::from_millis(5),
        confirmations: 1,
    }
}

pub fn account(text: &str) -> Address {
    Address::from_str(text).unwrap()
}

/// Switchable misbehaviour.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// `wallet_switchEthereumChain` fails with this code/message (before the known-network check).
    pub switch_error: Option<(i64, String)>,
    /// `wallet_addEthereumChain` fails.
    pub fail_add_chain: bool,
    /// Adding succeeds but the network still cannot be selected afterwards.
    pub switch_fails_after_add: bool,
    /// The user declines the connection prompt.
    pub reject_connection: bool,
    /// The user declines every signature prompt.
    pub reject_signature: bool,
    /// `getScanLog` at this index fails.
    pub fail_scan_log_index: Option<u64>,
    /// Every `eth_call` fails at the transport level.
    pub calls_down: bool,
    /// The node behind the wallet is unreachable: everything except the wallet's own
    /// account methods fails at the transport level.
    pub node_down: bool,
    /// The receipt is reported as pending this many times before it appears.
    pub pending_receipt_polls: usize,
    /// `eth_requestAccounts` takes this long to answer.
    pub connect_delay: Option<Duration>,
}

#[derive(Debug, Clone)]
struct StoredProduct {
    name: String,
    manufacturing_date: String,
    batch_number: String,
    location: String,
    additional_details: String,
    manufacturer: Address,
    timestamp: u64,
}

#[derive(Debug, Clone)]
struct StoredScan {
    scanner: Address,
    location: String,
    user_type: String,
    timestamp: u64,
}

#[derive(Debug)]
struct Receipt {
    block_number: u64,
    status: bool,
    pending_polls: usize,
}

#[derive(Debug)]
struct State {
    known_networks: HashMap<u64, NetworkParams>,
    selected_chain: Option<u64>,
    node_accounts: Vec<Address>,
    authorized: Vec<Address>,
    products: HashMap<H256, StoredProduct>,
    scans: HashMap<H256, Vec<StoredScan>>,
    receipts: HashMap<String, Receipt>,
    block_number: u64,
    clock: u64,
    faults: Faults,
    method_calls: HashMap<String, usize>,
    contract_calls: HashMap<&'static str, usize>,
    sent: Vec<JsonValue>,
}

pub struct MockWallet {
    state: Mutex<State>,
}

impl MockWallet {
    /// A wallet that has not heard of the ledger network yet.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                known_networks: HashMap::new(),
                selected_chain: None,
                node_accounts: vec![account(ACCOUNT_0), account(ACCOUNT_1)],
                authorized: Vec::new(),
                products: HashMap::new(),
                scans: HashMap::new(),
                receipts: HashMap::new(),
                block_number: 0,
                clock: GENESIS_TIME,
                faults: Faults::default(),
                method_calls: HashMap::new(),
                contract_calls: HashMap::new(),
                sent: Vec::new(),
            }),
        }
    }

    /// A wallet that already knows the ledger network.
    pub fn with_network() -> Self {
        let wallet = Self::new();
        wallet.state().known_networks.insert(CHAIN_ID, network());
        wallet
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_faults(&self, faults: Faults) {
        self.state().faults = faults;
    }

    pub fn update_faults(&self, f: impl FnOnce(&mut Faults)) {
        f(&mut self.state().faults);
    }

    pub fn knows_network(&self, chain_id: u64) -> bool {
        self.state().known_networks.contains_key(&chain_id)
    }

    /// Simulates the user moving the wallet to another network.
    pub fn select_chain(&self, chain_id: u64) {
        self.state().selected_chain = Some(chain_id);
    }

    /// Simulates the user revoking the site's account access.
    pub fn revoke_authorization(&self) {
        self.state().authorized.clear();
    }

    /// Puts `accounts` at the front of the node's list, as if the user switched accounts.
    pub fn set_node_accounts(&self, accounts: Vec<Address>) {
        self.state().node_accounts = accounts;
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state().method_calls.get(method).copied().unwrap_or(0)
    }

    /// `eth_call` / `eth_sendTransaction` invocations of one contract function.
    pub fn contract_calls(&self, function: &str) -> usize {
        self.state().contract_calls.get(function).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state().method_calls.values().sum()
    }

    pub fn sent_transactions(&self) -> Vec<JsonValue> {
        self.state().sent.clone()
    }

    /// Writes a product straight into contract storage.
    pub fn seed_product(&self, hash: H256, name: &str, manufacturer: Address) {
        let mut st = self.state();
        let timestamp = st.clock;
        st.products.insert(
            hash,
            StoredProduct {
                name: name.to_string(),
                manufacturing_date: "2024-01-01".to_string(),
                batch_number: "B1".to_string(),
                location: "Factory".to_string(),
                additional_details: String::new(),
                manufacturer,
                timestamp,
            },
        );
    }

    /// Appends a scan straight into contract storage (any user type text is accepted).
    pub fn seed_scan(&self, hash: H256, location: &str, user_type: &str) {
        let mut st = self.state();
        st.clock += 60;
        let timestamp = st.clock;
        let scanner = st.node_accounts[0];
        st.scans.entry(hash).or_default().push(StoredScan {
            scanner,
            location: location.to_string(),
            user_type: user_type.to_string(),
            timestamp,
        });
    }

    fn count(&self, method: &str) {
        *self.state().method_calls.entry(method.to_string()).or_insert(0) += 1;
    }

    fn switch_chain(&self, params: &JsonValue) -> Result<JsonValue, ProviderError> {
        let chain_id = params[0]["chainId"]
            .as_str()
            .ok_or_else(|| ProviderError::invalid_params("missing chainId"))
            .and_then(parse_quantity)?;
        let mut st = self.state();
        if let Some((code, message)) = st.faults.switch_error.clone() {
            return Err(ProviderError::new(code, message));
        }
        if !st.known_networks.contains_key(&chain_id) {
            return Err(ProviderError::unrecognized_chain(chain_id));
        }
        if st.faults.switch_fails_after_add {
            return Err(ProviderError::internal("RPC endpoint is unreachable"));
        }
        st.selected_chain = Some(chain_id);
        Ok(JsonValue::Null)
    }

    fn add_chain(&self, params: &JsonValue) -> Result<JsonValue, ProviderError> {
        let network: NetworkParams = serde_json::from_value(params[0].clone())
            .map_err(|e| ProviderError::invalid_params(e.to_string()))?;
        let mut st = self.state();
        if st.faults.fail_add_chain {
            return Err(ProviderError::user_rejected("User rejected the request."));
        }
        st.known_networks.insert(network.chain_id, network);
        Ok(JsonValue::Null)
    }

    async fn request_accounts(&self) -> Result<JsonValue, ProviderError> {
        let delay = self.state().faults.connect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut st = self.state();
        if st.faults.reject_connection {
            return Err(ProviderError::user_rejected("User rejected the request."));
        }
        if st.selected_chain.is_none() {
            return Err(ProviderError::disconnected());
        }
        st.authorized = st.node_accounts.clone();
        Ok(json!(st.authorized))
    }

    fn eth_call(&self, params: &JsonValue) -> Result<JsonValue, ProviderError> {
        let data = params[0]["data"]
            .as_str()
            .ok_or_else(|| ProviderError::invalid_params("missing data"))
            .and_then(parse_hex_data)?;
        let mut st = self.state();
        if st.faults.calls_down {
            return Err(ProviderError::internal("Cannot connect to http://127.0.0.1:8545"));
        }

        let output = run_view(&mut st, &data)?;
        Ok(json!(to_hex_data(&output)))
    }

    fn send_transaction(&self, params: &JsonValue) -> Result<JsonValue, ProviderError> {
        let tx = params[0].clone();
        let from = tx["from"]
            .as_str()
            .and_then(|s| Address::from_str(s).ok())
            .ok_or_else(|| ProviderError::invalid_params("missing from"))?;
        let data = tx["data"]
            .as_str()
            .ok_or_else(|| ProviderError::invalid_params("missing data"))
            .and_then(parse_hex_data)?;

        let mut st = self.state();
        if !st.authorized.contains(&from) {
            return Err(ProviderError::new(
                codes::UNAUTHORIZED,
                "The requested account has not been authorized by the user.",
            ));
        }
        if st.faults.reject_signature {
            return Err(ProviderError::user_rejected("User denied transaction signature."));
        }
        st.sent.push(tx);

        st.clock += 12;
        st.block_number += 1;
        run_transaction(&mut st, from, &data)?;

        let tx_hash = format!("{:?}", keccak256(format!("tx-{}", st.block_number).as_bytes()));
        let pending_polls = st.faults.pending_receipt_polls;
        let block_number = st.block_number;
        st.receipts.insert(
            tx_hash.clone(),
            Receipt {
                block_number,
                status: true,
                pending_polls,
            },
        );
        Ok(json!(tx_hash))
    }

    fn receipt(&self, params: &JsonValue) -> Result<JsonValue, ProviderError> {
        let tx_hash = params[0].as_str().unwrap_or_default().to_string();
        let mut st = self.state();
        let Some(receipt) = st.receipts.get_mut(&tx_hash) else {
            return Ok(JsonValue::Null);
        };
        if receipt.pending_polls > 0 {
            receipt.pending_polls -= 1;
            return Ok(JsonValue::Null);
        }
        Ok(json!({
            "transactionHash": tx_hash,
            "blockNumber": to_quantity(receipt.block_number),
            "status": if receipt.status { "0x1" } else { "0x0" },
            "gasUsed": to_quantity(21_000),
        }))
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request(&self, method: &str, params: JsonValue) -> Result<JsonValue, ProviderError> {
        self.count(method);
        let node_down = self.state().faults.node_down;
        if node_down && !matches!(method, "eth_accounts" | "eth_requestAccounts") {
            return Err(ProviderError::internal("Cannot connect to http://127.0.0.1:8545"));
        }
        match method {
            "wallet_switchEthereumChain" => self.switch_chain(&params),
            "wallet_addEthereumChain" => self.add_chain(&params),
            "eth_requestAccounts" => self.request_accounts().await,
            "eth_accounts" => Ok(json!(self.state().authorized)),
            "eth_chainId" => {
                let selected = self.state().selected_chain;
                selected
                    .map(|id| json!(to_quantity(id)))
                    .ok_or_else(ProviderError::disconnected)
            }
            "eth_call" => self.eth_call(&params),
            "eth_sendTransaction" => self.send_transaction(&params),
            "eth_getTransactionReceipt" => self.receipt(&params),
            "eth_blockNumber" => Ok(json!(to_quantity(self.state().block_number))),
            "eth_getCode" => Ok(json!("0x6080604052")),
            other => Err(ProviderError::new(
                codes::METHOD_NOT_FOUND,
                format!("the method {} does not exist/is not available", other),
            )),
        }
    }
}

fn revert(reason: &str) -> ProviderError {
    ProviderError::new(codes::SERVER_ERROR, "execution reverted")
        .with_data(json!(to_hex_data(&abi::encode_revert_reason(reason))))
}

fn selector_of(data: &[u8]) -> Option<(&'static str, &'static str)> {
    let table = [
        ("registerProduct", signatures::REGISTER_PRODUCT),
        ("getProduct", signatures::GET_PRODUCT),
        ("verifyProduct", signatures::VERIFY_PRODUCT),
        ("logScan", signatures::LOG_SCAN),
        ("getScanLogsCount", signatures::GET_SCAN_LOGS_COUNT),
        ("getScanLog", signatures::GET_SCAN_LOG),
    ];
    table
        .into_iter()
        .find(|(_, sig)| data.len() >= 4 && data[..4] == function_selector(sig))
}

fn args(signature: &'static str, types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, ProviderError> {
    abi::decode_call(function_selector(signature), types, data)
        .map_err(|e| ProviderError::invalid_params(e.to_string()))
}

fn hash_arg(tokens: &[Token]) -> H256 {
    tokens[0].clone().into_fixed_bytes().unwrap_or_default()
}

fn string_arg(tokens: &[Token], i: usize) -> String {
    tokens[i].clone().into_string().unwrap_or_default()
}

fn run_view(st: &mut State, data: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let (function, signature) = selector_of(data).ok_or_else(|| revert("unknown function"))?;
    *st.contract_calls.entry(function).or_insert(0) += 1;

    match function {
        "verifyProduct" => {
            let a = args(signature, &[ParamType::FixedBytes32], data)?;
            Ok(abi::encode(&[Token::Bool(st.products.contains_key(&hash_arg(&a)))]))
        }
        "getProduct" => {
            let a = args(signature, &[ParamType::FixedBytes32], data)?;
            let product = st.products.get(&hash_arg(&a));
            let text = |f: fn(&StoredProduct) -> &String| Token::String(product.map(f).cloned().unwrap_or_default());
            Ok(abi::encode(&[
                text(|p| &p.name),
                text(|p| &p.manufacturing_date),
                text(|p| &p.batch_number),
                text(|p| &p.location),
                text(|p| &p.additional_details),
                Token::Address(product.map(|p| p.manufacturer.as_h160()).unwrap_or_default()),
                Token::Uint(U256::from(product.map(|p| p.timestamp).unwrap_or(0))),
                Token::Bool(product.is_some()),
            ]))
        }
        "getScanLogsCount" => {
            let a = args(signature, &[ParamType::FixedBytes32], data)?;
            let count = st.scans.get(&hash_arg(&a)).map(Vec::len).unwrap_or(0) as u64;
            Ok(abi::encode(&[Token::Uint(U256::from(count))]))
        }
        "getScanLog" => {
            let a = args(signature, &[ParamType::FixedBytes32, ParamType::Uint], data)?;
            let index = a[1].clone().into_uint().unwrap_or_default().low_u64();
            if st.faults.fail_scan_log_index == Some(index) {
                return Err(ProviderError::internal("HTTP request failed: connection reset"));
            }
            let scan = st
                .scans
                .get(&hash_arg(&a))
                .and_then(|logs| logs.get(index as usize))
                .ok_or_else(|| revert("Index out of bounds"))?;
            Ok(abi::encode(&[
                Token::Address(scan.scanner.as_h160()),
                Token::String(scan.location.clone()),
                Token::String(scan.user_type.clone()),
                Token::Uint(U256::from(scan.timestamp)),
            ]))
        }
        _ => Err(revert("not a view function")),
    }
}

fn run_transaction(st: &mut State, from: Address, data: &[u8]) -> Result<(), ProviderError> {
    let (function, signature) = selector_of(data).ok_or_else(|| revert("unknown function"))?;
    *st.contract_calls.entry(function).or_insert(0) += 1;

    match function {
        "registerProduct" => {
            let a = args(
                signature,
                &[
                    ParamType::String,
                    ParamType::String,
                    ParamType::String,
                    ParamType::String,
                    ParamType::String,
                    ParamType::FixedBytes32,
                ],
                data,
            )?;
            let hash = a[5].clone().into_fixed_bytes().unwrap_or_default();
            if st.products.contains_key(&hash) {
                return Err(revert("Product already registered"));
            }
            let timestamp = st.clock;
            st.products.insert(
                hash,
                StoredProduct {
                    name: string_arg(&a, 0),
                    manufacturing_date: string_arg(&a, 1),
                    batch_number: string_arg(&a, 2),
                    location: string_arg(&a, 3),
                    additional_details: string_arg(&a, 4),
                    manufacturer: from,
                    timestamp,
                },
            );
            Ok(())
        }
        "logScan" => {
            let a = args(
                signature,
                &[ParamType::FixedBytes32, ParamType::String, ParamType::String],
                data,
            )?;
            let hash = hash_arg(&a);
            if !st.products.contains_key(&hash) {
                return Err(revert("Product not registered"));
            }
            let timestamp = st.clock;
            st.scans.entry(hash).or_default().push(StoredScan {
                scanner: from,
                location: string_arg(&a, 1),
                user_type: string_arg(&a, 2),
                timestamp,
            });
            Ok(())
        }
        _ => Err(revert("not a transaction")),
    }
}

/// Collects notices for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub struct Harness {
    pub wallet: Arc<MockWallet>,
    pub notifier: Arc<RecordingNotifier>,
    pub ledger: LedgerClient,
}

pub fn harness(wallet: MockWallet) -> Harness {
    let wallet = Arc::new(wallet);
    let notifier = Arc::new(RecordingNotifier::default());
    let session = SessionManager::new(
        Some(wallet.clone() as Arc<dyn WalletProvider>),
        network(),
        notifier.clone(),
    );
    Harness {
        wallet,
        notifier,
        ledger: LedgerClient::new(session, settings()),
    }
}

/// A client with no wallet installed.
pub fn walletless() -> (Arc<RecordingNotifier>, LedgerClient) {
    let notifier = Arc::new(RecordingNotifier::default());
    let session = SessionManager::new(None, network(), notifier.clone());
    (notifier, LedgerClient::new(session, settings()))
}
