pub mod app;
pub mod crypto;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{LedgerClient, Notice, Notifier, Session, SessionManager, TracingNotifier, VerifiedScan};
pub use crypto::hashing::{derive_product_hash, ProductHash};
pub use domain::{Address, ProductAttributes, ProductRecord, ScanLogEntry, ScanPayload, UserType};
pub use errors::{LedgerError, SessionError};
pub use infra::config::LedgerConfig;
pub use infra::evm;
