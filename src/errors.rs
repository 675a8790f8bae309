use thiserror::Error;

/// Why a ledger session could not be established.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No wallet is available. Install or configure a signing wallet to use this application.")]
    NoWalletAvailable,
    #[error("Failed to add network {network} to the wallet. Please add it manually. ({detail})")]
    NetworkSetupFailed { network: String, detail: String },
    #[error("Failed to switch to network {network}. Make sure your ledger node is running. ({detail})")]
    NetworkMismatch { network: String, detail: String },
    #[error("Failed to authorize a wallet account: {0}")]
    AuthorizationFailed(String),
}

/// Failure of one ledger operation, as reported to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Wallet not connected")]
    WalletNotConnected,
    #[error("Transaction was rejected by user")]
    UserRejected,
    #[error("Product not found or not registered")]
    NotRegistered,
    #[error("{0}")]
    LedgerCallFailed(String),
    #[error("{0}")]
    InvalidScanPayload(String),
}
