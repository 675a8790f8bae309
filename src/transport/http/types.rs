use crate::app::ledger_client::VerifiedScan;
use crate::app::outcome::RegisterOutcome;
use crate::app::LedgerClient;
use crate::crypto::hashing::ProductHash;
use crate::domain::product::{ProductRecord, ScanLogEntry, UserType};
use crate::errors::LedgerError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerClient>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogScanRequest {
    pub location: String,
    pub user_type: UserType,
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct ResolveScanRequest {
    /// Raw text decoded from the product label.
    pub payload: String,
}

/// Registration result plus the label text to print for the product.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub hash: Option<ProductHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegisterResponse {
    pub fn new(outcome: RegisterOutcome, qr_payload: Option<String>) -> Self {
        Self {
            success: outcome.success,
            hash: outcome.hash,
            qr_payload,
            error: outcome.error,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ResolveScanResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub hash: Option<ProductHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<ScanLogEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<VerifiedScan, LedgerError>> for ResolveScanResponse {
    fn from(result: Result<VerifiedScan, LedgerError>) -> Self {
        match result {
            Ok(scan) => Self {
                success: true,
                hash: Some(scan.hash),
                product: Some(scan.product),
                logs: scan.logs,
                error: None,
            },
            Err(e) => Self {
                success: false,
                hash: None,
                product: None,
                logs: None,
                error: Some(e.to_string()),
            },
        }
    }
}

pub fn json_422(err: JsonRejection, expected: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(format!("Invalid JSON body: {} (expected: {})", err, expected)),
        }),
    )
}
