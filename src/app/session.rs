//! Ledger session negotiation.
//!
//! A session is one authorized account on the expected network. It is negotiated on
//! demand, cached for the life of the process, and re-validated (without prompting)
//! every time it is handed out.

use crate::domain::account::Address;
use crate::errors::SessionError;
use crate::infra::evm::rpc::{codes, ProviderError};
use crate::infra::evm::{NetworkParams, WalletProvider};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub connected: bool,
    #[schema(value_type = Option<String>)]
    pub account: Option<Address>,
    pub chain_id: u64,
}

/// Something the user should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Connected { account: Address, chain_id: u64 },
    Error(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::Connected { account, .. } => format!("Connected wallet: {}", account.redacted()),
            Notice::Error(message) => message.clone(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Routes notices into the log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::Connected { chain_id, .. } => info!(chain_id, "{}", notice.message()),
            Notice::Error(_) => error!("{}", notice.message()),
        }
    }
}

#[derive(Debug)]
enum NetworkState {
    Unselected,
    Selecting { after_registration: bool },
    NeedsRegistration,
    Registering,
    Selected,
    Failed(SessionError),
}

pub struct SessionManager {
    wallet: Option<Arc<dyn WalletProvider>>,
    network: NetworkParams,
    notifier: Arc<dyn Notifier>,
    /// Held across negotiation, so concurrent callers wait for one outcome.
    negotiation: Mutex<()>,
    /// Readers never wait on a pending prompt.
    session: RwLock<Option<Session>>,
}

impl SessionManager {
    pub fn new(
        wallet: Option<Arc<dyn WalletProvider>>,
        network: NetworkParams,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            wallet,
            network,
            notifier,
            negotiation: Mutex::new(()),
            session: RwLock::new(None),
        }
    }

    pub fn wallet(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.wallet.as_ref()
    }

    pub fn network(&self) -> &NetworkParams {
        &self.network
    }

    /// The cached session, if any. Never negotiates or prompts.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Forgets the cached session; the next operation negotiates again.
    pub async fn disconnect(&self) {
        *self.session.write().await = None;
    }

    pub async fn ensure_session(&self) -> Result<Session, SessionError> {
        let Some(wallet) = self.wallet.as_ref() else {
            let err = SessionError::NoWalletAvailable;
            self.notifier.notify(Notice::Error(err.to_string()));
            return Err(err);
        };

        let _negotiating = self.negotiation.lock().await;
        let cached = self.session.read().await.clone();
        if let Some(session) = cached {
            if self.still_valid(wallet.as_ref(), &session).await {
                return Ok(session);
            }
            warn!("cached ledger session is no longer valid, negotiating a new one");
            *self.session.write().await = None;
        }

        match self.negotiate(wallet.as_ref()).await {
            Ok(session) => {
                if let Some(account) = session.account {
                    self.notifier.notify(Notice::Connected {
                        account,
                        chain_id: session.chain_id,
                    });
                }
                *self.session.write().await = Some(session.clone());
                Ok(session)
            }
            Err(err) => {
                self.notifier.notify(Notice::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// False only when the wallet definitely contradicts the session; an unreachable
    /// node leaves it in place.
    async fn still_valid(&self, wallet: &dyn WalletProvider, session: &Session) -> bool {
        let Some(account) = session.account else {
            return false;
        };
        match wallet.chain_id().await {
            Ok(id) if id == self.network.chain_id => {}
            Ok(id) => {
                debug!(chain_id = id, "wallet moved to another network");
                return false;
            }
            Err(e) if is_definite(&e) => {
                debug!(error = %e, "wallet reports no network");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "wallet liveness check inconclusive, keeping session");
                return true;
            }
        }
        match wallet.accounts().await {
            Ok(accounts) => accounts.contains(&account),
            Err(e) if is_definite(&e) => false,
            Err(e) => {
                debug!(error = %e, "account check inconclusive, keeping session");
                true
            }
        }
    }

    async fn negotiate(&self, wallet: &dyn WalletProvider) -> Result<Session, SessionError> {
        self.select_network(wallet).await?;

        let accounts = wallet.request_accounts().await.map_err(|e| {
            if e.is_user_rejection() {
                SessionError::AuthorizationFailed("the connection request was rejected by user".to_string())
            } else {
                SessionError::AuthorizationFailed(e.message)
            }
        })?;
        let account = accounts.first().copied().ok_or_else(|| {
            SessionError::AuthorizationFailed("the wallet returned no accounts".to_string())
        })?;

        info!(chain_id = self.network.chain_id, account = %account, "ledger session established");
        Ok(Session {
            connected: true,
            account: Some(account),
            chain_id: self.network.chain_id,
        })
    }

    async fn select_network(&self, wallet: &dyn WalletProvider) -> Result<(), SessionError> {
        let chain_id = self.network.chain_id;
        let mut state = NetworkState::Unselected;

        loop {
            state = match state {
                NetworkState::Unselected => NetworkState::Selecting {
                    after_registration: false,
                },
                NetworkState::Selecting { after_registration } => match wallet.switch_chain(chain_id).await {
                    Ok(()) => NetworkState::Selected,
                    Err(e) if after_registration => NetworkState::Failed(self.setup_failed(e)),
                    Err(e) if e.code == codes::UNRECOGNIZED_CHAIN => NetworkState::NeedsRegistration,
                    Err(e) => NetworkState::Failed(SessionError::NetworkMismatch {
                        network: self.network.chain_name.clone(),
                        detail: e.message,
                    }),
                },
                NetworkState::NeedsRegistration => {
                    info!(chain_id, name = %self.network.chain_name, "network unknown to wallet, registering it");
                    NetworkState::Registering
                }
                NetworkState::Registering => match wallet.add_chain(&self.network).await {
                    Ok(()) => NetworkState::Selecting {
                        after_registration: true,
                    },
                    Err(e) => NetworkState::Failed(self.setup_failed(e)),
                },
                NetworkState::Selected => return Ok(()),
                NetworkState::Failed(err) => return Err(err),
            };
            debug!(?state, "network selection");
        }
    }

    fn setup_failed(&self, e: ProviderError) -> SessionError {
        SessionError::NetworkSetupFailed {
            network: self.network.chain_name.clone(),
            detail: e.message,
        }
    }
}

fn is_definite(e: &ProviderError) -> bool {
    e.code == codes::DISCONNECTED || e.code == codes::UNAUTHORIZED
}
