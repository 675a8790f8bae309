//! Flat `{ success, <payload>?, error? }` result shapes for presentation layers.

use crate::crypto::hashing::ProductHash;
use crate::domain::product::{ProductRecord, ScanLogEntry};
use crate::errors::LedgerError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegisterOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub hash: Option<ProductHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerifyOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LogScanOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScanLogsOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<ScanLogEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<ProductHash, LedgerError>> for RegisterOutcome {
    fn from(result: Result<ProductHash, LedgerError>) -> Self {
        match result {
            Ok(hash) => Self { success: true, hash: Some(hash), error: None },
            Err(e) => Self { success: false, hash: None, error: Some(e.to_string()) },
        }
    }
}

impl From<Result<ProductRecord, LedgerError>> for VerifyOutcome {
    fn from(result: Result<ProductRecord, LedgerError>) -> Self {
        match result {
            Ok(product) => Self { success: true, product: Some(product), error: None },
            Err(e) => Self { success: false, product: None, error: Some(e.to_string()) },
        }
    }
}

impl From<Result<(), LedgerError>> for LogScanOutcome {
    fn from(result: Result<(), LedgerError>) -> Self {
        match result {
            Ok(()) => Self { success: true, error: None },
            Err(e) => Self { success: false, error: Some(e.to_string()) },
        }
    }
}

impl From<Result<Vec<ScanLogEntry>, LedgerError>> for ScanLogsOutcome {
    fn from(result: Result<Vec<ScanLogEntry>, LedgerError>) -> Self {
        match result {
            Ok(logs) => Self { success: true, logs: Some(logs), error: None },
            Err(e) => Self { success: false, logs: None, error: Some(e.to_string()) },
        }
    }
}
