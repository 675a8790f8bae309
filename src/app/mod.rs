pub mod ledger_client;
pub mod outcome;
pub mod scan_log_pager;
pub mod session;

pub use ledger_client::{LedgerClient, VerifiedScan};
pub use scan_log_pager::ScanLogPager;
pub use session::{Notice, Notifier, Session, SessionManager, TracingNotifier};
