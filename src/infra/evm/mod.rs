//! EVM ledger plumbing: ABI codec, JSON-RPC envelopes, the wallet seam and the
//! product registry binding.

pub mod abi;
pub mod contract;
pub mod provider;
pub mod rpc;

pub use contract::{ContractError, ContractSettings, ProductRegistry, TransactionReceipt};
pub use provider::{
    AutoApprove, HttpWalletProvider, NetworkParams, SigningApprover, TransactionRequest, WalletProvider,
};
pub use rpc::ProviderError;
