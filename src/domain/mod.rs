//! Ledger-facing domain types: accounts, product records, scan history and labels.

pub mod account;
pub mod product;
pub mod scan_payload;

pub use account::{redact_account, Address};
pub use product::{ProductAttributes, ProductRecord, ScanLogEntry, UserType};
pub use scan_payload::{ScanPayload, ScanPayloadError};
