//! The ledger client: the four product operations plus wallet connection.
//!
//! Every operation first makes sure a session exists (negotiating one on demand).
//! Without a session it fails with `WalletNotConnected` and never touches the
//! ledger. All failures come back as `LedgerError` values.

use crate::app::scan_log_pager::ScanLogPager;
use crate::app::session::{Notifier, SessionManager};
use crate::crypto::hashing::ProductHash;
use crate::domain::account::Address;
use crate::domain::product::{ProductAttributes, ProductRecord, ScanLogEntry, UserType};
use crate::domain::scan_payload::ScanPayload;
use crate::errors::LedgerError;
use crate::infra::config::{LedgerConfig, WalletMode};
use crate::infra::evm::{
    ContractError, ContractSettings, HttpWalletProvider, ProductRegistry, ProviderError, SigningApprover,
    WalletProvider,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

/// Result of resolving and verifying a scanned label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedScan {
    #[schema(value_type = String)]
    pub hash: ProductHash,
    pub product: ProductRecord,
    /// Absent when the history could not be read; the verification itself still stands.
    pub logs: Option<Vec<ScanLogEntry>>,
}

pub struct LedgerClient {
    session: SessionManager,
    registry: Option<ProductRegistry>,
}

impl LedgerClient {
    pub fn new(session: SessionManager, contract: ContractSettings) -> Self {
        let registry = session
            .wallet()
            .cloned()
            .map(|wallet| ProductRegistry::new(wallet, contract));
        Self { session, registry }
    }

    /// Builds the client described by `config`, wiring a node-managed wallet unless
    /// the configuration says no wallet is installed.
    pub fn from_config(
        config: &LedgerConfig,
        approver: Arc<dyn SigningApprover>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ProviderError> {
        let wallet: Option<Arc<dyn WalletProvider>> = match config.wallet_mode {
            WalletMode::NodeManaged => Some(Arc::new(HttpWalletProvider::new(config.rpc_timeout, approver)?)),
            WalletMode::None => None,
        };
        let session = SessionManager::new(wallet, config.network.clone(), notifier);
        Ok(Self::new(session, config.contract.clone()))
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn registry(&self) -> Option<&ProductRegistry> {
        self.registry.as_ref()
    }

    async fn connected(&self) -> Result<(Address, &ProductRegistry), LedgerError> {
        let session = self.session.ensure_session().await.map_err(|e| {
            warn!(error = %e, "no ledger session");
            LedgerError::WalletNotConnected
        })?;
        match (session.account, self.registry.as_ref()) {
            (Some(account), Some(registry)) => Ok((account, registry)),
            _ => Err(LedgerError::WalletNotConnected),
        }
    }

    pub async fn connect_wallet(&self) -> bool {
        self.session.ensure_session().await.is_ok()
    }

    /// The connected account, without prompting.
    pub async fn get_account_address(&self) -> Option<Address> {
        self.session.current_session().await.and_then(|s| s.account)
    }

    /// Registers a product and returns its hash.
    ///
    /// The hash is derived before submission, so a caller that loses the
    /// confirmation can re-derive it from the same attributes.
    pub async fn register_product(&self, attrs: &ProductAttributes) -> Result<ProductHash, LedgerError> {
        let (account, registry) = self.connected().await?;

        let hash = attrs.product_hash();
        info!(hash = %hash, name = %attrs.name, batch = %attrs.batch_number, "registering product");

        match registry.register_product(account, attrs, &hash).await {
            Ok(receipt) => {
                info!(hash = %hash, tx_hash = %receipt.transaction_hash, "product registered");
                Ok(hash)
            }
            Err(e) => Err(classify_write("Failed to register product on blockchain", e)),
        }
    }

    pub async fn verify_product(&self, hash: &ProductHash) -> Result<ProductRecord, LedgerError> {
        let (_, registry) = self.connected().await?;

        let registered = registry
            .verify_product(hash)
            .await
            .map_err(|e| call_failed("Failed to verify product on blockchain", e))?;
        if !registered {
            return Err(LedgerError::NotRegistered);
        }

        registry
            .get_product(hash)
            .await
            .map_err(|e| call_failed("Failed to verify product on blockchain", e))
    }

    pub async fn log_scan(
        &self,
        hash: &ProductHash,
        location: &str,
        user_type: UserType,
    ) -> Result<(), LedgerError> {
        let (account, registry) = self.connected().await?;

        match registry.log_scan(account, hash, location, user_type).await {
            Ok(receipt) => {
                info!(hash = %hash, %user_type, tx_hash = %receipt.transaction_hash, "scan logged");
                Ok(())
            }
            Err(e) => Err(classify_write("Failed to log scan on blockchain", e)),
        }
    }

    pub async fn get_scan_logs(&self, hash: &ProductHash) -> Result<Vec<ScanLogEntry>, LedgerError> {
        let (_, registry) = self.connected().await?;

        ScanLogPager::new(registry)
            .fetch_all(hash)
            .await
            .map_err(|e| call_failed("Failed to retrieve scan logs", e))
    }

    /// Resolves a scanned label to a hash, verifies it and loads its scan history.
    pub async fn verify_scanned_payload(&self, raw: &str) -> Result<VerifiedScan, LedgerError> {
        let payload = ScanPayload::parse(raw).map_err(|e| LedgerError::InvalidScanPayload(e.to_string()))?;
        let hash = payload.hash();

        let product = self.verify_product(&hash).await?;
        let logs = match self.get_scan_logs(&hash).await {
            Ok(logs) => Some(logs),
            Err(e) => {
                warn!(hash = %hash, error = %e, "verified product but could not load its scan history");
                None
            }
        };

        Ok(VerifiedScan { hash, product, logs })
    }
}

fn call_failed(context: &str, e: ContractError) -> LedgerError {
    error!(error = %e, "{}", context);
    LedgerError::LedgerCallFailed(format!("{}: {}", context, e))
}

fn classify_write(context: &str, e: ContractError) -> LedgerError {
    if e.is_user_rejection() {
        info!("{}: user rejected the signing request", context);
        return LedgerError::UserRejected;
    }
    call_failed(context, e)
}
